//! Parsed configuration document.
//!
//! The document is a two-level tree: application name → module name →
//! module data. The reserved application [`SHARED_APPLICATION`] holds
//! modules shared by every application.

use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Application name whose modules apply to every application.
pub const SHARED_APPLICATION: &str = "Modules";

/// On-disk syntax of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// Pick the format from the file extension; anything but `.toml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Malformed document content.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("document root must be a table of applications")]
    NotATable,

    #[error("document is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
}

/// An immutable parsed configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    root: Value,
}

impl ConfigDocument {
    /// Wrap an already-built tree. The root must be an object.
    pub fn from_value(root: Value) -> Result<Self, DocumentError> {
        if !root.is_object() {
            return Err(DocumentError::NotATable);
        }
        Ok(Self { root })
    }

    /// Parse raw file content.
    ///
    /// The tree is untyped, so fields nobody reads are simply carried along.
    pub fn parse(bytes: &[u8], format: DocumentFormat) -> Result<Self, DocumentError> {
        let root: Value = match format {
            DocumentFormat::Json => serde_json::from_slice(bytes)?,
            DocumentFormat::Toml => toml::from_str(std::str::from_utf8(bytes)?)?,
        };
        Self::from_value(root)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// All modules configured for `app`, or `None` if the application is missing.
    pub fn application(&self, app: &str) -> Option<&Value> {
        self.root.get(app)
    }

    /// A single module of `app`.
    pub fn module(&self, app: &str, module: &str) -> Option<&Value> {
        self.application(app).and_then(|node| node.get(module))
    }

    /// Names of every application in the document, shared section included.
    pub fn applications(&self) -> Vec<&str> {
        self.root
            .as_object()
            .map(|apps| apps.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// `(module, data)` pairs for `app`; empty if the application is missing
    /// or is not a table.
    pub fn modules(&self, app: &str) -> Vec<(&str, &Value)> {
        self.application(app)
            .and_then(Value::as_object)
            .map(|modules| modules.iter().map(|(name, data)| (name.as_str(), data)).collect())
            .unwrap_or_default()
    }

    /// Content version of everything `app` can see: its own modules plus the
    /// shared ones.
    ///
    /// First eight bytes of a SHA-256 over the compact JSON rendering.
    /// Object keys serialise in sorted order, so equal trees hash equally.
    pub fn application_hash(&self, app: &str) -> u64 {
        let own = self.application(app).unwrap_or(&Value::Null);
        let shared = self.application(SHARED_APPLICATION).unwrap_or(&Value::Null);

        let mut hasher = Sha256::new();
        hasher.update(own.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(shared.to_string().as_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }
}
