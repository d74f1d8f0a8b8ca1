//! File-backed configuration source with a staleness gate.
//!
//! # Responsibilities
//! - Serve the last parsed document without locks or file I/O
//! - Re-stat the file at most once per recheck interval
//! - Re-parse only when the modification time changed
//! - Keep the previous document when the new content is broken

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use serde_json::Value;

use crate::observability::metrics;
use crate::source::document::{ConfigDocument, DocumentFormat};
use crate::source::error::SourceError;

/// Configuration document loaded from a file and refreshed on demand.
pub struct FileSource {
    path: PathBuf,
    format: DocumentFormat,
    recheck_interval: Duration,
    /// Origin for `next_check`.
    epoch: Instant,
    /// Held while deciding whether to refresh and while refreshing.
    refresh_lock: Mutex<()>,
    /// Last successfully parsed document.
    document: ArcSwapOption<ConfigDocument>,
    /// Nanoseconds after `epoch` when the file should be checked again.
    /// Zero means check at the next opportunity.
    next_check: AtomicU64,
    /// Modification time (nanoseconds since the Unix epoch) of the file
    /// version behind `document`. Only meaningful once `document` is set.
    last_modified: AtomicU64,
}

impl FileSource {
    /// Create a source for `path`. Nothing is read until the first access.
    pub fn new(path: impl Into<PathBuf>, recheck_interval: Duration) -> Self {
        let path = path.into();
        Self {
            format: DocumentFormat::from_path(&path),
            path,
            recheck_interval,
            epoch: Instant::now(),
            refresh_lock: Mutex::new(()),
            document: ArcSwapOption::empty(),
            next_check: AtomicU64::new(0),
            last_modified: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn recheck_interval(&self) -> Duration {
        self.recheck_interval
    }

    /// Whether any module is configured for `app`.
    pub fn has_application(&self, app: &str) -> Result<bool, SourceError> {
        Ok(self.get_application(app)?.is_some())
    }

    /// Whether `module` is configured for `app`.
    pub fn has_module(&self, app: &str, module: &str) -> Result<bool, SourceError> {
        Ok(self.get_module(app, module)?.is_some())
    }

    /// The configuration subtree of `app`, if present.
    pub fn get_application(&self, app: &str) -> Result<Option<Value>, SourceError> {
        Ok(self.get_conf()?.application(app).cloned())
    }

    /// The configuration of `module` under `app`, if both exist.
    pub fn get_module(&self, app: &str, module: &str) -> Result<Option<Value>, SourceError> {
        Ok(self.get_conf()?.module(app, module).cloned())
    }

    /// Content hash of what `app` sees in the current document.
    pub fn config_hash(&self, app: &str) -> Result<u64, SourceError> {
        Ok(self.get_conf()?.application_hash(app))
    }

    /// The current document, refreshing it first if a check is due.
    ///
    /// Readers holding a previously returned `Arc` keep a consistent
    /// snapshot across refreshes.
    pub fn get_conf(&self) -> Result<Arc<ConfigDocument>, SourceError> {
        let now = self.now();
        if now >= self.next_check.load(Ordering::Acquire) {
            let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);
            // Someone else may have refreshed while we waited.
            if now >= self.next_check.load(Ordering::Acquire) {
                self.refresh(now)?;
            }
        }

        self.document.load_full().ok_or_else(|| SourceError::NotLoaded {
            path: self.path.clone(),
        })
    }

    /// The last loaded document, without a refresh check.
    pub fn snapshot(&self) -> Option<Arc<ConfigDocument>> {
        self.document.load_full()
    }

    /// Make the next access check the file regardless of the interval.
    pub fn expire(&self) {
        self.next_check.store(0, Ordering::Release);
    }

    /// Caller holds `refresh_lock`.
    fn refresh(&self, now: u64) -> Result<(), SourceError> {
        metrics::record_source_check();

        let Some(modified) = modified_nanos(&self.path) else {
            tracing::warn!(path = %self.path.display(), "Configuration file not found");
            return Err(SourceError::NotFound {
                path: self.path.clone(),
            });
        };

        let loaded = self.document.load().is_some();
        if !loaded || modified != self.last_modified.load(Ordering::Acquire) {
            // On failure the gate stays open so every caller sees the error
            // until the file is fixed.
            self.reload(modified)?;
        }

        let interval = u64::try_from(self.recheck_interval.as_nanos()).unwrap_or(u64::MAX);
        self.next_check
            .store(now.saturating_add(interval), Ordering::Release);
        Ok(())
    }

    fn reload(&self, modified: u64) -> Result<(), SourceError> {
        let parsed = std::fs::read(&self.path)
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })
            .and_then(|bytes| {
                ConfigDocument::parse(&bytes, self.format).map_err(|source| SourceError::Parse {
                    path: self.path.clone(),
                    source,
                })
            });

        match parsed {
            Ok(document) => {
                self.document.store(Some(Arc::new(document)));
                self.last_modified.store(modified, Ordering::Release);
                metrics::record_source_reload("ok");
                tracing::info!(path = %self.path.display(), "Configuration file loaded");
                Ok(())
            }
            Err(e) => {
                // last_modified stays put so this file version is retried.
                metrics::record_source_reload(e.kind());
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load configuration file. Keeping current document."
                );
                Err(e)
            }
        }
    }

    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("path", &self.path)
            .field("recheck_interval", &self.recheck_interval)
            .field("loaded", &self.document.load().is_some())
            .finish()
    }
}

/// Modification time of `path` in nanoseconds since the Unix epoch, or
/// `None` if the file is missing.
///
/// Timestamps before the epoch or unavailable on this platform read as 0.
fn modified_nanos(path: &Path) -> Option<u64> {
    let metadata = std::fs::metadata(path).ok()?;
    let nanos = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |since| since.as_nanos());
    Some(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    /// Write `content` and pin the file's mtime so tests do not depend on
    /// filesystem timestamp granularity.
    fn write_at(path: &Path, content: &str, secs: u64) {
        std::fs::write(path, content).unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn setup() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoconf.json");
        (dir, path)
    }

    #[test]
    fn test_lookups() {
        let (_dir, path) = setup();
        write_at(
            &path,
            r#"{"Imap": {"FilerGateConfig": {"retries": 3}}, "Modules": {"Logging": {}}}"#,
            1_000,
        );
        let source = FileSource::new(&path, Duration::from_secs(60));

        assert!(source.has_application("Imap").unwrap());
        assert!(!source.has_application("Pop").unwrap());
        assert!(source.has_module("Imap", "FilerGateConfig").unwrap());
        assert!(!source.has_module("Imap", "Nope").unwrap());
        assert!(!source.has_module("Pop", "FilerGateConfig").unwrap());
        assert_eq!(
            source.get_module("Imap", "FilerGateConfig").unwrap(),
            Some(serde_json::json!({"retries": 3}))
        );
    }

    #[test]
    fn test_missing_file() {
        let (_dir, path) = setup();
        let source = FileSource::new(&path, Duration::from_secs(60));

        assert!(matches!(source.get_conf(), Err(SourceError::NotFound { .. })));
        assert!(source.snapshot().is_none());

        // NotFound leaves the gate open, so the file is picked up as soon as it appears.
        write_at(&path, r#"{"A": {}}"#, 1_000);
        assert!(source.get_conf().is_ok());
    }

    #[test]
    fn test_same_document_within_interval() {
        let (_dir, path) = setup();
        write_at(&path, r#"{"A": {"m": 1}}"#, 1_000);
        let source = FileSource::new(&path, Duration::from_secs(3600));

        let first = source.get_conf().unwrap();
        write_at(&path, r#"{"A": {"m": 2}}"#, 2_000);
        let second = source.get_conf().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        source.expire();
        let third = source.get_conf().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.module("A", "m"), Some(&serde_json::json!(2)));
        // The old snapshot is untouched.
        assert_eq!(first.module("A", "m"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_unchanged_mtime_is_not_reparsed() {
        let (_dir, path) = setup();
        write_at(&path, r#"{"A": {"m": 1}}"#, 1_000);
        let source = FileSource::new(&path, Duration::ZERO);

        let first = source.get_conf().unwrap();
        write_at(&path, r#"{"A": {"m": 2}}"#, 1_000);
        let second = source.get_conf().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_parse_failure_keeps_previous_document() {
        let (_dir, path) = setup();
        write_at(&path, r#"{"A": {"m": 1}}"#, 1_000);
        let source = FileSource::new(&path, Duration::ZERO);
        let good = source.get_conf().unwrap();

        write_at(&path, "{ broken", 2_000);
        assert!(matches!(source.get_conf(), Err(SourceError::Parse { .. })));
        let kept = source.snapshot().unwrap();
        assert!(Arc::ptr_eq(&good, &kept));

        // The broken version is retried, not marked as synced.
        assert!(matches!(source.get_conf(), Err(SourceError::Parse { .. })));

        write_at(&path, r#"{"A": {"m": 3}}"#, 2_000);
        let fixed = source.get_conf().unwrap();
        assert_eq!(fixed.module("A", "m"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_parse_failure_reported_until_fixed() {
        let (_dir, path) = setup();
        write_at(&path, r#"{"A": {}}"#, 1_000);
        let source = FileSource::new(&path, Duration::from_secs(3600));
        let good = source.get_conf().unwrap();

        write_at(&path, "{ broken", 2_000);
        source.expire();
        assert!(matches!(source.get_conf(), Err(SourceError::Parse { .. })));

        // The gate stays open: a long interval does not hide the error.
        assert!(matches!(source.get_conf(), Err(SourceError::Parse { .. })));
        assert!(Arc::ptr_eq(&good, &source.snapshot().unwrap()));

        write_at(&path, r#"{"A": {"m": 1}}"#, 3_000);
        let fixed = source.get_conf().unwrap();
        assert_eq!(fixed.module("A", "m"), Some(&serde_json::json!(1)));

        // Loaded successfully, so the interval applies again.
        write_at(&path, "{ broken", 4_000);
        assert!(Arc::ptr_eq(&fixed, &source.get_conf().unwrap()));
    }

    #[test]
    fn test_never_loaded() {
        let (_dir, path) = setup();
        write_at(&path, "not json at all", 1_000);
        let source = FileSource::new(&path, Duration::from_secs(3600));

        assert!(matches!(source.get_conf(), Err(SourceError::Parse { .. })));
        assert!(matches!(source.get_conf(), Err(SourceError::Parse { .. })));
        assert!(source.snapshot().is_none());
    }

    #[test]
    fn test_epoch_mtime_is_a_present_file() {
        let (_dir, path) = setup();
        write_at(&path, r#"{"A": {"m": 1}}"#, 0);
        assert_eq!(modified_nanos(&path), Some(0));

        let source = FileSource::new(&path, Duration::from_secs(3600));
        let doc = source.get_conf().unwrap();
        assert_eq!(doc.module("A", "m"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_config_hash_tracks_content() {
        let (_dir, path) = setup();
        write_at(&path, r#"{"A": {"m": 1}}"#, 1_000);
        let source = FileSource::new(&path, Duration::ZERO);
        let before = source.config_hash("A").unwrap();

        write_at(&path, r#"{"A": {"m": 1}, "B": {"x": 0}}"#, 2_000);
        assert_eq!(source.config_hash("A").unwrap(), before);

        write_at(&path, r#"{"A": {"m": 2}}"#, 3_000);
        assert_ne!(source.config_hash("A").unwrap(), before);
    }

    #[test]
    fn test_concurrent_readers_share_one_load() {
        let (_dir, path) = setup();
        write_at(&path, r#"{"A": {}}"#, 1_000);
        let source = Arc::new(FileSource::new(&path, Duration::from_secs(3600)));

        let docs: Vec<Arc<ConfigDocument>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let source = source.clone();
                    scope.spawn(move || source.get_conf().unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for doc in &docs {
            assert!(Arc::ptr_eq(doc, &docs[0]));
        }
    }
}
