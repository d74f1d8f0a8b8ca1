//! File watcher that shortens the staleness window.
//!
//! The recheck interval still bounds how long a change can go unseen;
//! the watcher only expires the gate early when the OS reports an edit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::source::file::FileSource;

/// Watches the directory holding a [`FileSource`]'s file.
pub struct SourceWatcher {
    source: Arc<FileSource>,
}

impl SourceWatcher {
    pub fn new(source: Arc<FileSource>) -> Self {
        Self { source }
    }

    /// Start watching. Dropping the returned watcher stops it.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// editors which replace the file by rename are still noticed.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.source.path().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|name| name.to_os_string());
        let source = self.source.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify()
                        || event.kind.is_create()
                        || event.kind.is_remove();
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if relevant && ours {
                        tracing::debug!(path = %source.path().display(), "Configuration file event, expiring check gate");
                        source.expire();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Configuration watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_missing_directory_fails() {
        let source = Arc::new(FileSource::new(
            "/definitely/not/here/autoconf.json",
            Duration::from_secs(60),
        ));
        assert!(SourceWatcher::new(source).run().is_err());
    }
}
