use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp format used by the human-readable mirror fields
pub const HUMAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identity of a gated subject: one user following one topic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectKey {
    pub user_id: String,
    pub topic_id: u32,
}

impl SubjectKey {
    pub fn new(user_id: impl Into<String>, topic_id: u32) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            anyhow::bail!("Subject user id must not be empty");
        }
        Ok(Self { user_id, topic_id })
    }

    /// Key under which this subject is stored: `{user_id}_{topic_id}`
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.user_id, self.topic_id)
    }

    /// Parse a storage key back into a subject
    ///
    /// User ids may themselves contain underscores, so the topic id is
    /// taken from the segment after the last one.
    pub fn parse(key: &str) -> Result<Self> {
        let (user_id, topic) = key
            .rsplit_once('_')
            .with_context(|| format!("Malformed subject key: {key:?}"))?;
        let topic_id = topic
            .parse()
            .with_context(|| format!("Malformed topic id in subject key: {key:?}"))?;
        Self::new(user_id, topic_id)
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.user_id, self.topic_id)
    }
}

/// Persisted last-grant metadata for one subject
///
/// Field names match the on-disk JSON contract. `next_reset_at` and the
/// two human-readable strings are caches derived from `last_access`;
/// recomputed values win whenever they disagree.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GrantRecord {
    /// Epoch seconds of the last successful grant; 0 means never granted
    #[serde(default)]
    pub last_access: i64,
    /// Content-sequence position delivered by the last grant
    #[serde(default)]
    pub last_day: u32,
    /// Cached next-window instant, epoch seconds; not authoritative
    #[serde(default)]
    pub next_reset_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_access_human: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_reset_human: Option<String>,
}

impl GrantRecord {
    pub fn has_grant(&self) -> bool {
        self.last_access > 0
    }

    /// The last-grant instant, if one is recorded and representable
    pub fn last_access_instant(&self) -> Option<DateTime<Local>> {
        if self.last_access <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.last_access, 0).map(|dt| dt.with_timezone(&Local))
    }
}

/// Full subject-to-record mapping; the unit of persistence
pub type AccessMap = BTreeMap<String, GrantRecord>;
