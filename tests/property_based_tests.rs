//! Property-based tests for class reference handling, cache keys and synthesis

use hookcheck::cache::{CacheKey, ClassCache, MemoryCache};
use hookcheck::hooks::{extract_class_name, SyntheticClassName};
use hookcheck::reflect::{DefaultLiteral, MethodSignature, ParameterSpec, TypeHint};
use hookcheck::synth::{GeneratedSource, ProxySynthesizer};
use proptest::prelude::*;

fn class_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Z][a-zA-Z0-9]{0,8}", 1..4).prop_map(|parts| parts.join("\\"))
}

fn parameter() -> impl Strategy<Value = ParameterSpec> {
    (
        "[a-z][a-zA-Z0-9]{0,8}",
        prop_oneof![
            Just(TypeHint::None),
            Just(TypeHint::Array),
            class_name().prop_map(TypeHint::Class),
        ],
        any::<bool>(),
        prop_oneof![
            Just(None),
            Just(Some(DefaultLiteral::Null)),
            Just(Some(DefaultLiteral::EmptyArray)),
            (0i64..1000).prop_map(|n| Some(DefaultLiteral::Scalar(n.to_string()))),
        ],
    )
        .prop_map(|(name, type_hint, by_reference, default)| ParameterSpec {
            name,
            type_hint,
            by_reference,
            default,
        })
}

fn method() -> impl Strategy<Value = MethodSignature> {
    (
        "[a-z][a-zA-Z0-9_]{0,12}",
        prop::collection::vec(parameter(), 0..5),
    )
        .prop_map(|(name, parameters)| MethodSignature::new(name, parameters))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_extraction_ignores_path_prefix_and_method_suffix(
        class in class_name(),
        path in "[a-z/_]{1,20}",
        method in "[a-z]{1,10}",
    ) {
        prop_assert_eq!(extract_class_name(&class), class.clone());
        prop_assert_eq!(extract_class_name(&format!("{}:{}", path, class)), class.clone());
        prop_assert_eq!(extract_class_name(&format!("{}->{}", class, method)), class.clone());
        prop_assert_eq!(extract_class_name(&format!("&{}", class)), class.clone());
        prop_assert_eq!(extract_class_name(&format!("{}.php", path)), "");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_synthetic_name_is_identifier(slot in "\\PC{0,20}", key in "\\PC{0,20}") {
        let name = SyntheticClassName::derive(&slot, &key);
        let text = name.as_str();
        prop_assert!(!text.is_empty());
        prop_assert!(!text.starts_with(|c: char| c.is_ascii_digit()));
        prop_assert!(text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));

        // Always a usable cache key
        prop_assert!(CacheKey::derive(text, "Hookcheck\\Proxy", "hookcheck").is_ok()
            || text.len() > 240);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_cache_key_is_stable(
        slot in "[a-zA-Z][a-zA-Z0-9_]{0,20}",
        key in "[a-zA-Z0-9_]{0,10}",
    ) {
        let name = SyntheticClassName::derive(&slot, &key);
        let short = CacheKey::derive(name.as_str(), "Hookcheck\\Proxy", "hookcheck").unwrap();
        let qualified = CacheKey::derive(
            &name.qualified("Hookcheck\\Proxy"),
            "Hookcheck\\Proxy",
            "hookcheck",
        )
        .unwrap();
        let again = CacheKey::derive(name.as_str(), "Hookcheck\\Proxy", "hookcheck").unwrap();

        prop_assert_eq!(&short, &qualified);
        prop_assert_eq!(&short, &again);
        prop_assert_eq!(short.as_str(), short.as_str().to_lowercase());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_synthesis_is_deterministic(
        target in class_name(),
        methods in prop::collection::vec(method(), 0..4),
    ) {
        let synth = ProxySynthesizer::default();
        let first = synth.render_class(&target, "proxy", &methods);
        let second = synth.render_class(&target, "proxy", &methods);
        prop_assert_eq!(first.as_str(), second.as_str());
    }

    #[test]
    fn prop_reference_parameters_stay_by_reference(
        target in class_name(),
        methods in prop::collection::vec(method(), 1..4),
    ) {
        let source = ProxySynthesizer::default().render_class(&target, "proxy", &methods);
        for method in &methods {
            for param in &method.parameters {
                let marker = format!("&${}", param.name);
                if param.by_reference {
                    prop_assert!(source.as_str().contains(&marker));
                }
            }
            let signature = format!("public function {}(", method.name);
            prop_assert!(source.as_str().contains(&signature));
        }
    }

    #[test]
    fn prop_set_then_has_and_require(
        name in "[a-zA-Z][a-zA-Z0-9_]{0,30}",
        body in "\\PC{0,200}",
    ) {
        let mut cache = MemoryCache::new();
        let key = CacheKey::derive(&name, "Hookcheck\\Proxy", "hookcheck").unwrap();
        cache.set(&key, &GeneratedSource::new(body)).unwrap();
        prop_assert!(cache.has(&key));
        prop_assert!(cache.require_once(&key).is_ok());
        prop_assert!(cache.require_once(&key).is_ok());
    }
}
