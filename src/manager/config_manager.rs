//! Application-side configuration holder.
//!
//! # Responsibilities
//! - Serve module configuration from an active generation
//! - Build a staged generation on reload without disturbing readers
//! - Swap staged → active atomically on flip
//! - Remember which configuration hash is being served

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::cache::{CacheStats, LruCache};
use crate::observability::metrics;
use crate::reconcile::RemoteError;
use crate::source::{ConfigDocument, FileSource, SHARED_APPLICATION};

/// Emitted once per module when a reload stages it, or once with no
/// module when a reload could not read the configuration at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub application: String,
    pub module: Option<String>,
    pub success: bool,
}

/// One loaded configuration: the document it came from and a bounded cache
/// of resolved module fragments.
struct Generation {
    document: Option<Arc<ConfigDocument>>,
    modules: LruCache<String, Arc<Value>>,
}

impl Generation {
    fn empty(max_modules: usize) -> Self {
        Self {
            document: None,
            modules: LruCache::new(max_modules),
        }
    }

    /// Application modules override shared ones of the same name.
    fn resolve(&self, application: &str, module: &str) -> Option<Arc<Value>> {
        if let Some(hit) = self.modules.get(module) {
            return Some(hit);
        }

        let document = self.document.as_ref()?;
        let data = document
            .module(application, module)
            .or_else(|| document.module(SHARED_APPLICATION, module))?;
        let data = Arc::new(data.clone());
        self.modules.put(module.to_string(), data.clone());
        Some(data)
    }
}

/// Holds the configuration an application serves and accepts reload,
/// flip and hash-record commands from the reconciler.
pub struct ConfigManager {
    application: String,
    source: Arc<FileSource>,
    max_modules: AtomicUsize,
    active: ArcSwap<Generation>,
    staged: Mutex<Option<Arc<Generation>>>,
    /// Zero until a hash has been recorded.
    applied_hash: AtomicU64,
    events: broadcast::Sender<LoadEvent>,
}

impl ConfigManager {
    pub fn new(application: impl Into<String>, source: Arc<FileSource>, max_modules: usize) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            application: application.into(),
            source,
            max_modules: AtomicUsize::new(max_modules),
            active: ArcSwap::from_pointee(Generation::empty(max_modules)),
            staged: Mutex::new(None),
            applied_hash: AtomicU64::new(0),
            events,
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    /// Configuration of `module` from the active generation.
    pub fn module(&self, module: &str) -> Option<Arc<Value>> {
        self.active.load().resolve(&self.application, module)
    }

    /// Stage a fresh generation built from the current source document.
    ///
    /// Shared modules are loaded first so the application's own modules
    /// are the most recently used entries in the new generation.
    pub fn reload(&self, identity: &str) -> Result<(), RemoteError> {
        if identity != self.application {
            return Err(RemoteError::Rejected {
                operation: "reload",
                reason: format!("identity {identity} does not match {}", self.application),
            });
        }

        let document = match self.source.get_conf() {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(application = %self.application, error = %e, "Reload failed, keeping current generation");
                self.emit(None, false);
                return Err(RemoteError::Rejected {
                    operation: "reload",
                    reason: e.to_string(),
                });
            }
        };

        let generation = Generation {
            modules: LruCache::new(self.max_modules.load(Ordering::Acquire)),
            document: Some(document.clone()),
        };
        let mut loaded = 0;
        for app in [SHARED_APPLICATION, self.application.as_str()] {
            for (name, data) in document.modules(app) {
                generation
                    .modules
                    .put(name.to_string(), Arc::new(data.clone()));
                loaded += 1;
                self.emit(Some(name), true);
            }
        }

        *self.lock_staged() = Some(Arc::new(generation));
        tracing::info!(application = %self.application, modules = loaded, "Configuration generation staged");
        Ok(())
    }

    /// Make the staged generation active. Readers switch atomically.
    pub fn flip(&self) -> Result<(), RemoteError> {
        let staged = self.lock_staged().take().ok_or_else(|| RemoteError::Rejected {
            operation: "flip",
            reason: "no staged generation".to_string(),
        })?;

        let size = staged.modules.size();
        self.active.store(staged);
        metrics::record_generation_flip(&self.application, size);
        tracing::info!(application = %self.application, modules = size, "Configuration generation flipped");
        Ok(())
    }

    pub fn applied_hash(&self) -> u64 {
        self.applied_hash.load(Ordering::Acquire)
    }

    /// Record the hash of the configuration being served.
    ///
    /// The active generation may come from a newer document than the one
    /// `hash` was computed from. In that case the active document's own
    /// hash is recorded so the next cycle compares against what is served.
    pub fn record_applied_hash(&self, hash: u64) {
        let served = self
            .active
            .load()
            .document
            .as_ref()
            .map(|document| document.application_hash(&self.application));

        let hash = match served {
            Some(served) if served != hash => {
                tracing::debug!(
                    application = %self.application,
                    reported = hash,
                    served,
                    "Active generation is newer than the reported hash"
                );
                served
            }
            _ => hash,
        };
        self.applied_hash.store(hash, Ordering::Release);
        tracing::debug!(application = %self.application, hash, "Applied configuration hash recorded");
    }

    /// Change how many module fragments a generation keeps. Active and
    /// staged generations shrink immediately; later reloads use the new
    /// limit.
    pub fn set_max_modules(&self, max_modules: usize) {
        self.max_modules.store(max_modules, Ordering::Release);
        if let Some(staged) = self.lock_staged().as_ref() {
            staged.modules.set_max_size(max_modules);
        }
        self.active.load().modules.set_max_size(max_modules);
    }

    /// Usage counters of the active generation's module cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.active.load().modules.stats()
    }

    /// Receive a [`LoadEvent`] for every module staged from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.events.subscribe()
    }

    fn emit(&self, module: Option<&str>, success: bool) {
        // No subscribers is fine.
        let _ = self.events.send(LoadEvent {
            application: self.application.clone(),
            module: module.map(str::to_string),
            success,
        });
    }

    fn lock_staged(&self) -> std::sync::MutexGuard<'_, Option<Arc<Generation>>> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("application", &self.application)
            .field("applied_hash", &self.applied_hash())
            .finish()
    }
}
