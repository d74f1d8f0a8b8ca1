//! In-process transport for [`RemoteProcess`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::manager::config_manager::ConfigManager;
use crate::reconcile::{RemoteError, RemoteProcess, TargetProvider};

/// A handle to a [`ConfigManager`] living in the same process.
#[derive(Debug)]
pub struct LocalHandle {
    manager: Arc<ConfigManager>,
    closed: bool,
}

impl LocalHandle {
    pub fn new(manager: Arc<ConfigManager>) -> Self {
        Self {
            manager,
            closed: false,
        }
    }

    fn open(&self) -> Result<&ConfigManager, RemoteError> {
        if self.closed {
            return Err(RemoteError::Closed);
        }
        Ok(&self.manager)
    }
}

#[async_trait]
impl RemoteProcess for LocalHandle {
    async fn identity(&mut self) -> Result<String, RemoteError> {
        Ok(self.open()?.application().to_string())
    }

    async fn applied_hash(&mut self) -> Result<u64, RemoteError> {
        Ok(self.open()?.applied_hash())
    }

    async fn force_reload(&mut self, identity: &str) -> Result<(), RemoteError> {
        self.open()?.reload(identity)
    }

    async fn flip_active_generation(&mut self) -> Result<(), RemoteError> {
        self.open()?.flip()
    }

    async fn record_applied_hash(&mut self, hash: u64) -> Result<(), RemoteError> {
        self.open()?.record_applied_hash(hash);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        if self.closed {
            return Err(RemoteError::Closed);
        }
        self.closed = true;
        Ok(())
    }
}

/// Yields a fresh [`LocalHandle`] for each registered manager.
#[derive(Debug, Default, Clone)]
pub struct LocalTargets {
    managers: Vec<Arc<ConfigManager>>,
}

impl LocalTargets {
    pub fn new(managers: Vec<Arc<ConfigManager>>) -> Self {
        Self { managers }
    }

    pub fn register(&mut self, manager: Arc<ConfigManager>) {
        self.managers.push(manager);
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

#[async_trait]
impl TargetProvider for LocalTargets {
    type Remote = LocalHandle;

    async fn targets(&self) -> Result<Vec<LocalHandle>, RemoteError> {
        Ok(self.managers.iter().cloned().map(LocalHandle::new).collect())
    }
}
