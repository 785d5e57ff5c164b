#![no_main]

use hookcheck::cache::CacheKey;
use hookcheck::hooks::{extract_class_name, SyntheticClassName};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must not panic on any registration string
        let class = extract_class_name(input);
        assert!(!class.starts_with('\\'));

        let (slot, key) = input.split_at(input.len() / 2);
        let name = SyntheticClassName::derive(slot, key);
        let _ = CacheKey::derive(name.as_str(), "Hookcheck\\Proxy", "hookcheck");
    }
});
