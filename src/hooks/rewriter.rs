use crate::cache::{CacheKey, ClassCache, SetOutcome, DEFAULT_CACHE_IDENTIFIER};
use crate::config::HookcheckConfig;
use crate::error::{Result, StorageError};
use crate::hooks::class_ref::{extract_class_name, SyntheticClassName};
use crate::hooks::table::{HookEntry, HookTable, HostState};
use crate::reflect::Reflector;
use crate::synth::ProxySynthesizer;
use serde::Serialize;

/// Host sections whose hooks are instrumented
///
/// The set is closed: hooks registered under any other section are left alone.
pub const INSTRUMENTED_GROUPS: &[&str] = &[
    "t3lib/class.t3lib_befunc.php",
    "t3lib/class.t3lib_db.php",
    "t3lib/class.t3lib_tceforms.php",
    "t3lib/class.t3lib_tceforms_inline.php",
    "t3lib/class.t3lib_tcemain.php",
    "t3lib/class.t3lib_tsfebeuserauth.php",
    "t3lib/class.t3lib_tstemplate.php",
    "t3lib/class.t3lib_userauth.php",
    "t3lib/class.t3lib_userauthgroup.php",
];

/// A hook entry that will receive a proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedProxy<'a> {
    pub entry: &'a HookEntry,
    pub target_class: String,
    pub proxy_name: SyntheticClassName,
}

/// One proxy produced by a generation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedEntry {
    pub group: String,
    pub slot: String,
    pub key: String,
    pub target_class: String,
    pub proxy_class: String,
    pub cache_key: CacheKey,
    pub fingerprint: String,
    pub outcome: SetOutcome,
}

/// Summary of a generation or rewrite pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub entries: Vec<GeneratedEntry>,

    /// Entries in instrumented groups whose class reference was unusable
    pub skipped: usize,
}

impl RewriteReport {
    pub fn written(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome == SetOutcome::Written)
            .count()
    }
}

/// Generates proxies for registered hooks and points the host at them
#[derive(Debug, Clone)]
pub struct Rewriter<R> {
    reflector: R,
    synthesizer: ProxySynthesizer,
    cache_prefix: String,
}

impl<R: Reflector> Rewriter<R> {
    pub fn new(reflector: R, synthesizer: ProxySynthesizer) -> Self {
        Self {
            reflector,
            synthesizer,
            cache_prefix: DEFAULT_CACHE_IDENTIFIER.to_string(),
        }
    }

    pub fn from_config(reflector: R, config: &HookcheckConfig) -> Self {
        Self::new(reflector, config.synthesizer()).with_cache_prefix(&config.cache.identifier)
    }

    pub fn with_cache_prefix(mut self, prefix: &str) -> Self {
        self.cache_prefix = prefix.to_string();
        self
    }

    pub fn namespace(&self) -> &str {
        self.synthesizer.namespace()
    }

    pub fn synthesizer(&self) -> &ProxySynthesizer {
        &self.synthesizer
    }

    /// Cache key for a proxy class, short or fully-qualified
    pub fn cache_key(&self, class_name: &str) -> std::result::Result<CacheKey, StorageError> {
        CacheKey::derive(class_name, self.namespace(), &self.cache_prefix)
    }

    /// Instrumentable entries in processing order, plus the number skipped
    pub fn plan<'a>(&self, hooks: &'a HookTable) -> (Vec<PlannedProxy<'a>>, usize) {
        let mut planned = Vec::new();
        let mut skipped = 0;

        for group in INSTRUMENTED_GROUPS {
            for entry in hooks.group(group) {
                let target_class = extract_class_name(&entry.class_ref);
                if target_class.is_empty() {
                    tracing::debug!(
                        "Skipping {}/{}: no class in reference '{}'",
                        entry.slot,
                        entry.key,
                        entry.class_ref
                    );
                    skipped += 1;
                    continue;
                }

                planned.push(PlannedProxy {
                    entry,
                    proxy_name: SyntheticClassName::derive(&entry.slot, &entry.key),
                    target_class,
                });
            }
        }

        (planned, skipped)
    }

    fn generate_one<C: ClassCache + ?Sized>(
        &self,
        plan: &PlannedProxy<'_>,
        cache: &mut C,
    ) -> Result<GeneratedEntry> {
        let source = self.synthesizer.synthesize(
            &self.reflector,
            &plan.target_class,
            plan.proxy_name.as_str(),
        );
        let cache_key = self.cache_key(plan.proxy_name.as_str())?;
        let outcome = cache.set(&cache_key, &source)?;

        Ok(GeneratedEntry {
            group: plan.entry.group.clone(),
            slot: plan.entry.slot.clone(),
            key: plan.entry.key.clone(),
            target_class: plan.target_class.clone(),
            proxy_class: plan.proxy_name.qualified(self.namespace()),
            cache_key,
            fingerprint: source.fingerprint(),
            outcome,
        })
    }

    /// Generate and store a proxy for every instrumentable hook
    ///
    /// Does not touch host state. The first storage failure aborts the pass.
    pub fn generate_all<C: ClassCache + ?Sized>(
        &self,
        hooks: &HookTable,
        cache: &mut C,
    ) -> Result<RewriteReport> {
        let (planned, skipped) = self.plan(hooks);
        let mut report = RewriteReport {
            entries: Vec::with_capacity(planned.len()),
            skipped,
        };

        for plan in &planned {
            report.entries.push(self.generate_one(plan, cache)?);
        }

        tracing::debug!(
            "Generated {} proxies ({} written, {} skipped)",
            report.entries.len(),
            report.written(),
            report.skipped
        );
        Ok(report)
    }

    /// Generate every proxy and redirect the host's class resolution to it
    ///
    /// Each entry is stored before its override is written, so a storage
    /// failure leaves earlier entries rewritten and aborts the rest.
    /// Colliding proxy names resolve last-write-wins.
    pub fn rewrite<C: ClassCache + ?Sized>(
        &self,
        host: &mut HostState,
        cache: &mut C,
    ) -> Result<RewriteReport> {
        let (planned, skipped) = self.plan(&host.hooks);
        let mut report = RewriteReport {
            entries: Vec::with_capacity(planned.len()),
            skipped,
        };

        let mut overrides = Vec::with_capacity(planned.len());
        let mut failure = None;
        for plan in &planned {
            match self.generate_one(plan, cache) {
                Ok(generated) => {
                    overrides.push((generated.target_class.clone(), generated.proxy_class.clone()));
                    report.entries.push(generated);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        for (original, proxy) in overrides {
            if let Some(previous) = host.overrides.set(&original, &proxy) {
                if previous != proxy {
                    tracing::debug!("{} now resolves to {} (was {})", original, proxy, previous);
                }
            }
        }

        if let Some(e) = failure {
            tracing::warn!("Rewrite pass aborted: {}", e);
            return Err(e);
        }

        tracing::info!(
            "Rewrote {} hook classes ({} written, {} skipped)",
            report.entries.len(),
            report.written(),
            report.skipped
        );
        Ok(report)
    }
}
