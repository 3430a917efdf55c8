// Small JSON-file stores for state that outlives a session: the last mapping
// used for each source name and the feedback log.
use crate::error::{ReportError, Result};
use crate::output::write_json;
use crate::types::ColumnRoleMapping;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Newest feedback entries kept on disk.
pub const FEEDBACK_LIMIT: usize = 50;

// A missing or unreadable file is treated as empty state.
fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            T::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn get(&self, source_name: &str) -> Option<ColumnRoleMapping> {
        let all: BTreeMap<String, ColumnRoleMapping> = read_or_default(&self.path);
        all.get(source_name).cloned()
    }

    pub fn save(&self, source_name: &str, mapping: &ColumnRoleMapping) -> Result<()> {
        let mut all: BTreeMap<String, ColumnRoleMapping> = read_or_default(&self.path);
        all.insert(source_name.to_string(), mapping.clone());
        write_json(&self.path, &all)?;
        debug!("Saved mapping for {}", source_name);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Helpful,
    #[serde(rename = "Needs improvement")]
    NeedsImprovement,
    #[serde(rename = "Would pay")]
    WouldPay,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Vote::Helpful => "Helpful",
            Vote::NeedsImprovement => "Needs improvement",
            Vote::WouldPay => "Would pay",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub id: Uuid,
    pub vote: Vote,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedbackStats {
    pub total: usize,
    pub helpful: usize,
    pub needs_improvement: usize,
    pub would_pay: usize,
}

#[derive(Debug, Clone)]
pub struct FeedbackStore {
    path: PathBuf,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Entries, newest first.
    pub fn list(&self) -> Vec<FeedbackItem> {
        read_or_default(&self.path)
    }

    pub fn submit(&self, vote: Vote, comment: &str) -> Result<FeedbackItem> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ReportError::EmptyFeedback);
        }
        let item = FeedbackItem {
            id: Uuid::new_v4(),
            vote,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };

        let mut items = self.list();
        items.insert(0, item.clone());
        items.truncate(FEEDBACK_LIMIT);
        write_json(&self.path, &items)?;
        Ok(item)
    }

    pub fn stats(&self) -> FeedbackStats {
        let items = self.list();
        let count = |v: Vote| items.iter().filter(|i| i.vote == v).count();
        FeedbackStats {
            total: items.len(),
            helpful: count(Vote::Helpful),
            needs_improvement: count(Vote::NeedsImprovement),
            would_pay: count(Vote::WouldPay),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
