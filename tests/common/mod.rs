//! Shared utilities for integration tests.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use config_sync::source::FileSource;
use tempfile::TempDir;

/// A scratch configuration file whose modification time is set explicitly,
/// so change detection does not depend on filesystem timestamp granularity.
pub struct ConfFile {
    _dir: TempDir,
    path: PathBuf,
    version: u64,
}

impl ConfFile {
    pub fn new(content: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoconf.json");
        let mut file = Self {
            _dir: dir,
            path,
            version: 0,
        };
        file.write(content);
        file
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the content and bump the modification time by one second.
    pub fn write(&mut self, content: &str) {
        self.version += 1;
        std::fs::write(&self.path, content).unwrap();
        let file = File::options().write(true).open(&self.path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + self.version))
            .unwrap();
    }

    /// A source that re-checks the file on every access.
    pub fn eager_source(&self) -> Arc<FileSource> {
        Arc::new(FileSource::new(&self.path, Duration::ZERO))
    }
}
