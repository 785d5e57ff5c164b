use serde::Serialize;
use std::fmt;

/// Extract the class name from a hook registration's class reference
///
/// Handles the reference forms hosts accept:
/// - `Foo`
/// - `path/to/File:Foo` (resource path before the last `:`)
/// - `Foo->method` (method suffix)
/// - `&Foo` (reference marker)
/// - `File.php` (bare file include, yields an empty name)
///
/// An empty result means the entry cannot be instrumented and is skipped.
pub fn extract_class_name(class_ref: &str) -> String {
    let mut class = match class_ref.rsplit_once(':') {
        Some((_, class)) => class,
        None => class_ref,
    };

    let parts: Vec<&str> = class.split("->").collect();
    if parts.len() == 2 {
        class = parts[0];
    }

    let class = class.trim();
    if class.ends_with(".php") {
        return String::new();
    }

    let class = if class.starts_with('&') {
        class.replace('&', "")
    } else {
        class.to_string()
    };

    class.trim_start_matches('\\').to_string()
}

/// Name of the proxy class generated for one hook entry
///
/// `slot + key` with `::` separators removed from both. Remaining characters
/// outside `[A-Za-z0-9_]` become `_`, and a leading digit gets a `_` prefix.
/// Different entries can collide; the later one wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SyntheticClassName(String);

impl SyntheticClassName {
    pub fn derive(slot: &str, key: &str) -> Self {
        let raw = format!("{}{}", slot.replace("::", ""), key.replace("::", ""));

        let mut name: String = raw
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert(0, '_');
        }
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<namespace>\<name>`
    pub fn qualified(&self, namespace: &str) -> String {
        let namespace = namespace.trim_matches('\\');
        if namespace.is_empty() {
            self.0.clone()
        } else {
            format!("{}\\{}", namespace, self.0)
        }
    }
}

impl fmt::Display for SyntheticClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
