use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One registration in the host's hook table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEntry {
    /// Host section owning the slot, e.g. `t3lib/class.t3lib_tcemain.php`
    pub group: String,

    /// Hook slot name, e.g. `processDatamapClass`
    pub slot: String,

    /// Registration key inside the slot (extension key or list index)
    #[serde(deserialize_with = "string_or_integer")]
    pub key: String,

    /// Class reference as registered, see [`super::extract_class_name`]
    #[serde(rename = "class")]
    pub class_ref: String,
}

impl HookEntry {
    pub fn new(
        group: impl Into<String>,
        slot: impl Into<String>,
        key: impl Into<String>,
        class_ref: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            slot: slot.into(),
            key: key.into(),
            class_ref: class_ref.into(),
        }
    }
}

/// Hosts register list-style hooks under integer keys
fn string_or_integer<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Key {
        Text(String),
        Index(i64),
    }

    Ok(match Key::deserialize(deserializer)? {
        Key::Text(text) => text,
        Key::Index(index) => index.to_string(),
    })
}

/// The host's hook registration table, in registration order
///
/// Inserting an existing `(group, slot, key)` replaces the class reference in
/// place, matching how the host's own nested tables behave.
///
/// # Example TOML
/// ```toml
/// [[hook]]
/// group = "t3lib/class.t3lib_tcemain.php"
/// slot = "processDatamapClass"
/// key = "my_ext"
/// class = "Vendor\\MyExt\\Hook\\DataHandlerHook"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HookTable {
    entries: Vec<HookEntry>,
}

#[derive(Deserialize)]
struct HookFile {
    #[serde(default)]
    hook: Vec<HookEntry>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: HookFile =
            toml::from_str(content).context("Failed to parse TOML hook table")?;

        let mut table = Self::new();
        for entry in file.hook {
            table.insert(entry);
        }
        Ok(table)
    }

    /// Load a hook table from a TOML file of `[[hook]]` entries
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read hook table: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load {}", path.as_ref().display()))
    }

    pub fn insert(&mut self, entry: HookEntry) {
        let existing = self.entries.iter_mut().find(|e| {
            e.group == entry.group && e.slot == entry.slot && e.key == entry.key
        });
        match existing {
            Some(e) => e.class_ref = entry.class_ref,
            None => self.entries.push(entry),
        }
    }

    pub fn register(
        &mut self,
        group: &str,
        slot: &str,
        key: &str,
        class_ref: &str,
    ) -> &mut Self {
        self.insert(HookEntry::new(group, slot, key, class_ref));
        self
    }

    pub fn entries(&self) -> &[HookEntry] {
        &self.entries
    }

    /// Entries of one group, in registration order
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a HookEntry> + 'a {
        self.entries.iter().filter(move |e| e.group == group)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Host class-resolution overrides: original class → replacement class
///
/// When the host instantiates a class listed here it builds the replacement
/// instead. The rewrite pass is the only writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassOverrides {
    map: BTreeMap<String, String>,
}

impl ClassOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `original` at `replacement`; returns the previous replacement
    pub fn set(&mut self, original: &str, replacement: &str) -> Option<String> {
        self.map
            .insert(original.to_string(), replacement.to_string())
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.map.get(original).map(String::as_str)
    }

    /// The class the host should instantiate for `class`
    pub fn resolve<'a>(&'a self, class: &'a str) -> &'a str {
        self.get(class).unwrap_or(class)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The slice of host configuration the rewrite pass reads and writes
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostState {
    pub hooks: HookTable,
    pub overrides: ClassOverrides,
}

impl HostState {
    pub fn new(hooks: HookTable) -> Self {
        Self {
            hooks,
            overrides: ClassOverrides::new(),
        }
    }
}
