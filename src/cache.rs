//! Generation cache for proxy class sources
//!
//! Entries are keyed by a [`CacheKey`] derived from the proxy's class name
//! and hold the complete class source. The core only needs `has`, `set` and
//! `require_once`; the file backend adds `get`, `remove` and `flush` for
//! cache maintenance.

use crate::error::StorageError;
use crate::synth::GeneratedSource;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default cache identifier, also the key prefix
pub const DEFAULT_CACHE_IDENTIFIER: &str = "hookcheck";

const ENTRY_HEADER: &str = "<?php\n";
const ENTRY_TRAILER: &str = "\n#";
const ENTRY_EXTENSION: &str = "php";

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_%\-&]{1,250}$").expect("identifier pattern is valid")
    })
}

/// Whether `identifier` may be used as a cache entry identifier
pub fn is_valid_identifier(identifier: &str) -> bool {
    identifier_pattern().is_match(identifier)
}

/// Stable identifier of one cached proxy source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an identifier that already has cache-key form
    pub fn new(identifier: impl Into<String>) -> Result<Self, StorageError> {
        let identifier = identifier.into();
        if !is_valid_identifier(&identifier) {
            return Err(StorageError::InvalidIdentifier(identifier));
        }
        Ok(Self(identifier))
    }

    /// Derive the key for a proxy class name
    ///
    /// Accepts the short synthetic name or its fully-qualified form; both map
    /// to the same key: `<prefix>_` + the class path below `namespace`, with
    /// namespace separators turned into `_`, lowercased.
    pub fn derive(class_name: &str, namespace: &str, prefix: &str) -> Result<Self, StorageError> {
        let class_name = class_name.trim_start_matches('\\');
        let namespace = namespace.trim_matches('\\');

        let relative = if namespace.is_empty() {
            class_name
        } else {
            class_name
                .strip_prefix(namespace)
                .and_then(|rest| rest.strip_prefix('\\'))
                .unwrap_or(class_name)
        };

        let path = relative.replace('\\', "/").replace('/', "_").to_lowercase();
        Self::new(format!("{}_{}", prefix, path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a `set` call did to the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetOutcome {
    Written,
    /// Stored source already had the same fingerprint
    Unchanged,
}

/// Receives cached sources when they are required
///
/// This is the host's "load and execute" step; the cache guarantees each key
/// reaches the loader at most once per process.
pub trait SourceLoader {
    fn load(&mut self, key: &CacheKey, source: &str);
}

/// Loader for processes that only generate (build-time runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLoader;

impl SourceLoader for NoopLoader {
    fn load(&mut self, key: &CacheKey, _source: &str) {
        tracing::trace!("Skipping load of {} (no runtime attached)", key);
    }
}

/// Key-value store of generated proxy sources
pub trait ClassCache {
    fn has(&self, key: &CacheKey) -> bool;

    fn set(&mut self, key: &CacheKey, source: &GeneratedSource) -> Result<SetOutcome, StorageError>;

    /// Load the stored source once; later calls for the same key do nothing
    fn require_once(&mut self, key: &CacheKey) -> Result<(), StorageError>;
}

impl<C: ClassCache + ?Sized> ClassCache for &mut C {
    fn has(&self, key: &CacheKey) -> bool {
        (**self).has(key)
    }

    fn set(
        &mut self,
        key: &CacheKey,
        source: &GeneratedSource,
    ) -> Result<SetOutcome, StorageError> {
        (**self).set(key, source)
    }

    fn require_once(&mut self, key: &CacheKey) -> Result<(), StorageError> {
        (**self).require_once(key)
    }
}

/// File-backed cache: one `<key>.php` file per entry, no expiry
///
/// Writes go through a temporary file and a rename, so a concurrent reader
/// sees either the old or the new entry, never a torn one.
#[derive(Debug)]
pub struct FileCache<L = NoopLoader> {
    directory: PathBuf,
    loader: L,
    required: HashSet<CacheKey>,
}

impl FileCache<NoopLoader> {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_loader(directory, NoopLoader)
    }
}

impl<L: SourceLoader> FileCache<L> {
    pub fn with_loader(directory: impl Into<PathBuf>, loader: L) -> Self {
        Self {
            directory: directory.into(),
            loader,
            required: HashSet::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.directory
            .join(format!("{}.{}", key.as_str(), ENTRY_EXTENSION))
    }

    fn io_error(key: &CacheKey, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }

    /// Stored source for `key`, `None` when absent
    pub fn get(&self, key: &CacheKey) -> Result<Option<GeneratedSource>, StorageError> {
        let raw = match fs::read_to_string(self.entry_path(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(key, e)),
        };

        let body = raw
            .strip_prefix(ENTRY_HEADER)
            .and_then(|rest| rest.strip_suffix(ENTRY_TRAILER))
            .ok_or_else(|| StorageError::Corrupt(key.to_string()))?;
        Ok(Some(GeneratedSource::new(body)))
    }

    /// Delete one entry; returns whether it existed
    pub fn remove(&mut self, key: &CacheKey) -> Result<bool, StorageError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    /// Delete every entry in the cache directory; returns how many were removed
    pub fn flush(&mut self) -> Result<usize, StorageError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StorageError::Io {
                    key: self.directory.display().to_string(),
                    source: e,
                })
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            fs::remove_file(&path).map_err(|e| StorageError::Io {
                key: path.display().to_string(),
                source: e,
            })?;
            removed += 1;
        }

        tracing::debug!("Flushed {} entries from {}", removed, self.directory.display());
        Ok(removed)
    }
}

impl<L: SourceLoader> ClassCache for FileCache<L> {
    fn has(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_file()
    }

    fn set(
        &mut self,
        key: &CacheKey,
        source: &GeneratedSource,
    ) -> Result<SetOutcome, StorageError> {
        // Corrupt or unreadable entries are simply overwritten
        if let Ok(Some(existing)) = self.get(key) {
            if existing.fingerprint() == source.fingerprint() {
                return Ok(SetOutcome::Unchanged);
            }
        }

        fs::create_dir_all(&self.directory).map_err(|e| Self::io_error(key, e))?;

        let target = self.entry_path(key);
        let temp = self.directory.join(format!(
            "{}.{}.tmp",
            key.as_str(),
            std::process::id()
        ));
        let contents = format!("{}{}{}", ENTRY_HEADER, source.as_str(), ENTRY_TRAILER);

        fs::write(&temp, contents).map_err(|e| Self::io_error(key, e))?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(Self::io_error(key, e));
        }

        tracing::debug!("Stored {} ({})", key, target.display());
        Ok(SetOutcome::Written)
    }

    fn require_once(&mut self, key: &CacheKey) -> Result<(), StorageError> {
        if self.required.contains(key) {
            return Ok(());
        }

        let source = self
            .get(key)?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        self.loader.load(key, source.as_str());
        self.required.insert(key.clone());
        Ok(())
    }
}

/// In-process cache with the same semantics as [`FileCache`]
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: HashMap<CacheKey, GeneratedSource>,
    loaded: Vec<CacheKey>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&GeneratedSource> {
        self.entries.get(key)
    }

    /// Keys passed to `require_once` that were actually loaded, in order
    pub fn loaded(&self) -> &[CacheKey] {
        &self.loaded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ClassCache for MemoryCache {
    fn has(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    fn set(
        &mut self,
        key: &CacheKey,
        source: &GeneratedSource,
    ) -> Result<SetOutcome, StorageError> {
        if self.entries.get(key) == Some(source) {
            return Ok(SetOutcome::Unchanged);
        }
        self.entries.insert(key.clone(), source.clone());
        Ok(SetOutcome::Written)
    }

    fn require_once(&mut self, key: &CacheKey) -> Result<(), StorageError> {
        if self.loaded.contains(key) {
            return Ok(());
        }
        if !self.entries.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        self.loaded.push(key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Default, Clone)]
    struct RecordingLoader {
        loads: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl SourceLoader for RecordingLoader {
        fn load(&mut self, key: &CacheKey, source: &str) {
            self.loads
                .borrow_mut()
                .push((key.to_string(), source.to_string()));
        }
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::derive(name, "Hookcheck\\Proxy", DEFAULT_CACHE_IDENTIFIER).unwrap()
    }

    #[test]
    fn test_derive_short_and_qualified_names_agree() {
        let short = key("processDatamapClassMyExt");
        let qualified = key("\\Hookcheck\\Proxy\\processDatamapClassMyExt");
        assert_eq!(short, qualified);
        assert_eq!(short.as_str(), "hookcheck_processdatamapclassmyext");
    }

    #[test]
    fn test_derive_converts_path_separators() {
        assert_eq!(
            key("Hookcheck\\Proxy\\Sub\\Name").as_str(),
            "hookcheck_sub_name"
        );
        assert_eq!(key("a/b").as_str(), "hookcheck_a_b");
    }

    #[test]
    fn test_derive_is_idempotent() {
        let first = key("Hookcheck\\Proxy\\FooBar");
        let second = key("Hookcheck\\Proxy\\FooBar");
        assert_eq!(first, second);
    }

    #[test]
    fn test_derive_rejects_invalid_identifier() {
        let err = CacheKey::derive("foo bar", "Hookcheck\\Proxy", "hookcheck").unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier(_)));
        assert!(CacheKey::new("").is_err());
        assert!(CacheKey::new("a".repeat(251)).is_err());
        assert!(CacheKey::new("a%b-c&d_e").is_ok());
    }

    #[test]
    fn test_memory_cache_set_has_require() {
        let mut cache = MemoryCache::new();
        let k = key("Foo");
        assert!(!cache.has(&k));
        assert!(matches!(cache.require_once(&k), Err(StorageError::NotFound(_))));

        let source = GeneratedSource::new("class Foo {}");
        assert_eq!(cache.set(&k, &source).unwrap(), SetOutcome::Written);
        assert_eq!(cache.set(&k, &source).unwrap(), SetOutcome::Unchanged);
        assert!(cache.has(&k));

        cache.require_once(&k).unwrap();
        cache.require_once(&k).unwrap();
        assert_eq!(cache.loaded(), &[k]);
    }

    #[test]
    fn test_file_cache_round_trip_and_layout() {
        let dir = TempDir::new().unwrap();
        let mut cache = FileCache::new(dir.path().join("hookcheck"));
        let k = key("Foo");
        let source = GeneratedSource::new("namespace A;\n\nclass Foo extends \\Bar\n{\n}");

        assert!(!cache.has(&k));
        assert_eq!(cache.set(&k, &source).unwrap(), SetOutcome::Written);
        assert!(cache.has(&k));

        let on_disk = fs::read_to_string(cache.entry_path(&k)).unwrap();
        assert!(on_disk.starts_with("<?php\nnamespace A;"));
        assert!(on_disk.ends_with("}\n#"));
        assert_eq!(cache.get(&k).unwrap(), Some(source));
    }

    #[test]
    fn test_file_cache_unchanged_keeps_file() {
        let dir = TempDir::new().unwrap();
        let mut cache = FileCache::new(dir.path());
        let k = key("Foo");
        let source = GeneratedSource::new("class Foo {}");

        cache.set(&k, &source).unwrap();
        let before = fs::metadata(cache.entry_path(&k)).unwrap().modified().unwrap();
        assert_eq!(cache.set(&k, &source).unwrap(), SetOutcome::Unchanged);
        let after = fs::metadata(cache.entry_path(&k)).unwrap().modified().unwrap();
        assert_eq!(before, after);

        let changed = GeneratedSource::new("class Foo { }");
        assert_eq!(cache.set(&k, &changed).unwrap(), SetOutcome::Written);
        assert_eq!(cache.get(&k).unwrap(), Some(changed));
    }

    #[test]
    fn test_file_cache_require_once_loads_once() {
        let dir = TempDir::new().unwrap();
        let loader = RecordingLoader::default();
        let loads = loader.loads.clone();
        let mut cache = FileCache::with_loader(dir.path(), loader);
        let k = key("Foo");

        assert!(matches!(cache.require_once(&k), Err(StorageError::NotFound(_))));

        cache.set(&k, &GeneratedSource::new("class Foo {}")).unwrap();
        cache.require_once(&k).unwrap();
        cache.require_once(&k).unwrap();

        let loads = loads.borrow();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].0, "hookcheck_foo");
        assert_eq!(loads[0].1, "class Foo {}");
    }

    #[test]
    fn test_file_cache_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        let k = key("Foo");
        fs::write(cache.entry_path(&k), "garbage").unwrap();
        assert!(matches!(cache.get(&k), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_file_cache_remove_and_flush() {
        let dir = TempDir::new().unwrap();
        let mut cache = FileCache::new(dir.path());
        for name in ["Foo", "Bar", "Baz"] {
            cache.set(&key(name), &GeneratedSource::new(name)).unwrap();
        }
        fs::write(dir.path().join("README"), "not an entry").unwrap();

        assert!(cache.remove(&key("Foo")).unwrap());
        assert!(!cache.remove(&key("Foo")).unwrap());
        assert_eq!(cache.flush().unwrap(), 2);
        assert!(!cache.has(&key("Bar")));
        assert!(dir.path().join("README").exists());
    }

    #[test]
    fn test_file_cache_flush_missing_directory() {
        let dir = TempDir::new().unwrap();
        let mut cache = FileCache::new(dir.path().join("never-created"));
        assert_eq!(cache.flush().unwrap(), 0);
    }

    #[test]
    fn test_file_cache_write_failure_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let mut cache = FileCache::new(blocker.join("hookcheck"));
        let err = cache
            .set(&key("Foo"), &GeneratedSource::new("x"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
