use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::PREFERENCES_FILE;
use crate::models::Conversation;

/// Cross-session continuity state: per-category watermarks and which
/// conversation was open when the session ended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub watermarks: HashMap<String, u64>,
    #[serde(default)]
    pub last_conversation: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("failed to write preferences: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Disk-backed continuity storage under the data directory.
///
/// Missing file means "fresh session" (everything unread, no conversation to
/// restore). Malformed JSON is treated the same way: logged and reset, never
/// surfaced as a fault. Setters write through on every call; advances are
/// focus-driven and rare, so durability wins over batching.
pub struct PreferencesStorage {
    path: PathBuf,
    prefs: Preferences,
}

impl PreferencesStorage {
    pub fn new(data_dir: &Path) -> Self {
        let path = data_dir.join(PREFERENCES_FILE);
        let prefs = Self::load_from_file(&path).unwrap_or_default();
        Self { path, prefs }
    }

    fn load_from_file(path: &Path) -> Option<Preferences> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!("preferences: failed to read {}: {}", path.display(), err);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(prefs) => Some(prefs),
            Err(err) => {
                tracing::warn!(
                    "preferences: malformed JSON in {} ({}), resetting to defaults",
                    path.display(),
                    err
                );
                None
            }
        }
    }

    fn save_to_file(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.prefs)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn save(&self) {
        if let Err(err) = self.save_to_file() {
            // Continuity is best-effort: a failed write costs a stale badge
            // on the next launch, never a broken session.
            tracing::warn!("preferences: {}", err);
        }
    }

    // ===== Watermarks =====

    /// Stored watermark for a category; absent means epoch ("everything is
    /// unread").
    pub fn watermark(&self, category: &str) -> u64 {
        self.prefs.watermarks.get(category).copied().unwrap_or(0)
    }

    pub fn watermarks(&self) -> &HashMap<String, u64> {
        &self.prefs.watermarks
    }

    pub fn set_watermark(&mut self, category: &str, timestamp: u64) {
        self.prefs
            .watermarks
            .insert(category.to_string(), timestamp);
        self.save();
    }

    // ===== Last open conversation =====

    pub fn last_conversation(&self) -> Option<Conversation> {
        let key = self.prefs.last_conversation.as_deref()?;
        let parsed = Conversation::parse_key(key);
        if parsed.is_none() {
            tracing::debug!("preferences: unparseable last_conversation key {key:?}");
        }
        parsed
    }

    pub fn set_last_conversation(&mut self, conversation: Option<&Conversation>) {
        self.prefs.last_conversation = conversation.map(Conversation::key);
        self.save();
    }
}
