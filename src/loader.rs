//! Dynamic loading of proxy classes by name
//!
//! [`DynamicLoader`] sits in the host's chained class-resolution pipeline.
//! It claims every class name below the proxy namespace, makes sure the
//! generation cache holds an entry for it (running a full generation pass
//! when it does not), and requires that entry. Names outside the namespace
//! are passed on untouched so the loader composes with other resolvers.

use crate::cache::ClassCache;
use crate::error::{Result, StorageError};
use crate::hooks::{HookTable, Rewriter};
use crate::reflect::Reflector;

/// A resolver in the host's class-resolution chain
pub trait ClassResolver {
    /// Try to make `class_name` available; `Ok(true)` stops the chain
    fn resolve(&mut self, class_name: &str) -> Result<bool>;
}

/// Loader state while handling a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    Resolving,
}

/// Resolves proxy class names through the generation cache
#[derive(Debug)]
pub struct DynamicLoader<R, C> {
    rewriter: Rewriter<R>,
    hooks: HookTable,
    cache: C,
    state: LoaderState,
    regenerations: usize,
}

impl<R: Reflector, C: ClassCache> DynamicLoader<R, C> {
    /// `hooks` is the table the lazy generation pass runs over
    pub fn new(rewriter: Rewriter<R>, hooks: HookTable, cache: C) -> Self {
        Self {
            rewriter,
            hooks,
            cache,
            state: LoaderState::Idle,
            regenerations: 0,
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn into_cache(self) -> C {
        self.cache
    }

    /// Number of full generation passes triggered by cache misses
    pub fn regenerations(&self) -> usize {
        self.regenerations
    }

    /// Whether `class_name` lies below the proxy namespace
    pub fn owns(&self, class_name: &str) -> bool {
        let class_name = class_name.trim_start_matches('\\');
        let namespace = self.rewriter.namespace();
        !namespace.is_empty()
            && class_name
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('\\') && rest.len() > 1)
    }

    /// Load a proxy class by name
    ///
    /// Returns `Ok(false)` for names outside the namespace without touching
    /// the cache. Inside it, returns `Ok(true)` even when no entry could be
    /// produced: the namespace belongs to this loader and no other resolver
    /// should try it.
    pub fn try_load(&mut self, class_name: &str) -> Result<bool> {
        if !self.owns(class_name) {
            return Ok(false);
        }

        self.state = LoaderState::Resolving;
        let result = self.load_owned(class_name);
        self.state = LoaderState::Idle;
        result.map(|()| true)
    }

    fn load_owned(&mut self, class_name: &str) -> Result<()> {
        let key = match self.rewriter.cache_key(class_name) {
            Ok(key) => key,
            Err(StorageError::InvalidIdentifier(identifier)) => {
                tracing::warn!("No cache entry possible for {} ({})", class_name, identifier);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if !self.cache.has(&key) {
            tracing::debug!("Cache miss for {}, regenerating all proxies", key);
            self.rewriter.generate_all(&self.hooks, &mut self.cache)?;
            self.regenerations += 1;
        }

        if self.cache.has(&key) {
            self.cache.require_once(&key)?;
            tracing::trace!("Loaded {} from {}", class_name, key);
        } else {
            tracing::debug!("{} has no registered hook, nothing to load", class_name);
        }
        Ok(())
    }
}

impl<R: Reflector, C: ClassCache> ClassResolver for DynamicLoader<R, C> {
    fn resolve(&mut self, class_name: &str) -> Result<bool> {
        self.try_load(class_name)
    }
}

/// Ordered chain of class resolvers
///
/// The first resolver returning `Ok(true)` ends the lookup; an error ends it
/// as well and is returned to the caller.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ClassResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolver at the front (`prepend`) or the back of the chain
    pub fn register(&mut self, resolver: Box<dyn ClassResolver>, prepend: bool) {
        if prepend {
            self.resolvers.insert(0, resolver);
        } else {
            self.resolvers.push(resolver);
        }
    }

    pub fn resolve(&mut self, class_name: &str) -> Result<bool> {
        for resolver in &mut self.resolvers {
            if resolver.resolve(class_name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
