//! Firmware catalog - hardware revision to latest firmware
//!
//! The catalog is a JSON object published next to the binaries:
//!
//! ```json
//! {
//!   "ABCD": { "version": "2.0", "file": "fw_2_0.bin" },
//!   "HW02": { "version": "1.4", "file": "hw02/fw_1_4.bin" }
//! }
//! ```
//!
//! It is owned by the release process and re-read on every request.

use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors loading the catalog file
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog root is not a JSON object")]
    NotAnObject,
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Latest firmware published for one hardware revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub version: String,
    /// File name relative to the binary store
    pub file: String,
}

impl CatalogEntry {
    /// Location of the binary inside `store_dir`
    ///
    /// Returns `None` for names that would leave the store (absolute paths,
    /// `..`) or that name nothing.
    pub fn path_in(&self, store_dir: &Path) -> Option<PathBuf> {
        let relative = Path::new(&self.file);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_))) {
            Some(store_dir.join(relative))
        } else {
            None
        }
    }
}

/// Parsed catalog file
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Map<String, Value>,
}

impl Catalog {
    /// Parse catalog JSON
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        match serde_json::from_str(json)? {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(CatalogError::NotAnObject),
        }
    }

    /// Read and parse the catalog file
    pub async fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Entry for a hardware revision
    ///
    /// Entries that are not objects, or whose `version`/`file` is missing or
    /// not a scalar, are treated as absent.
    pub fn entry(&self, hardware_revision: &str) -> Option<CatalogEntry> {
        let entry = self.entries.get(hardware_revision)?.as_object()?;
        Some(CatalogEntry {
            version: scalar_text(entry.get("version")?)?,
            file: scalar_text(entry.get("file")?)?,
        })
    }

    #[cfg(test)]
    fn hardware_revisions(&self) -> Vec<&String> {
        self.entries.keys().collect()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Strings as-is, numbers in their JSON text form
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
