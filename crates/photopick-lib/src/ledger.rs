mod lock;

pub use lock::LedgerLock;

use crate::error::PhotoPickError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Persisted mapping from remote item id to the digest of its last verified download.
///
/// Stored as a flat JSON object (`{"<item id>": "<hex digest>"}`) and always
/// rewritten as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, item_id: &str) -> Option<&str> {
        self.entries.get(item_id).map(String::as_str)
    }

    /// Records `digest` for `item_id`, replacing any previous digest. Does not persist.
    #[must_use]
    pub fn update(mut self, item_id: impl Into<String>, digest: impl Into<String>) -> Self {
        self.entries.insert(item_id.into(), digest.into());
        self
    }

    /// Reads the ledger, falling back to an empty one when the file is missing or unreadable.
    pub fn load_from_file(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No ledger file yet, starting empty");
                return Self::new();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ledger file unreadable. Starting with an empty ledger.");
                return Self::new();
            }
        };

        match serde_json::from_str::<Ledger>(&content) {
            Ok(ledger) => {
                tracing::debug!(path = %path.display(), entries = ledger.len(), "Ledger loaded");
                ledger
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupted ledger file. Starting with an empty ledger.");
                Self::new()
            }
        }
    }

    /// Replaces the ledger file atomically: the JSON goes to a temporary file
    /// in the same directory which is then renamed over `path`.
    pub fn save_to_file(&self, path: &Path) -> Result<(), PhotoPickError> {
        let save_error = |reason: String| PhotoPickError::LedgerSave {
            path: path.to_path_buf(),
            reason,
        };

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| save_error(format!("JSON serialization failed: {}", e)))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| save_error(e.to_string()))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| save_error(e.to_string()))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| save_error(e.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| save_error(e.to_string()))?;
        temp.persist(path)
            .map_err(|e| save_error(e.error.to_string()))?;

        tracing::debug!(path = %path.display(), entries = self.len(), "Ledger saved");
        Ok(())
    }
}
