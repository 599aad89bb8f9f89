//! Core statification data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a statification.
///
/// Stored as its ordinal: CREATED = 0 up to VISUALIZED = 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatificationStatus {
    /// Crawl started, content not complete yet.
    Created,
    /// Crawl finished, content not archived yet.
    Statified,
    /// Archived under its content hash.
    Saved,
    /// Currently deployed. At most one holder.
    Production,
    /// Currently extracted for preview. At most one holder.
    Visualized,
}

impl StatificationStatus {
    pub fn ordinal(&self) -> i64 {
        match self {
            StatificationStatus::Created => 0,
            StatificationStatus::Statified => 1,
            StatificationStatus::Saved => 2,
            StatificationStatus::Production => 3,
            StatificationStatus::Visualized => 4,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(StatificationStatus::Created),
            1 => Some(StatificationStatus::Statified),
            2 => Some(StatificationStatus::Saved),
            3 => Some(StatificationStatus::Production),
            4 => Some(StatificationStatus::Visualized),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatificationStatus::Created => "created",
            StatificationStatus::Statified => "statified",
            StatificationStatus::Saved => "saved",
            StatificationStatus::Production => "production",
            StatificationStatus::Visualized => "visualized",
        }
    }
}

impl fmt::Display for StatificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One crawled snapshot of the website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statification {
    pub id: i64,
    /// Archive hash, empty while the snapshot is not archived yet.
    pub content_hash: String,
    pub designation: String,
    pub description: String,
    pub status: StatificationStatus,
    /// Number of pages captured by the crawl.
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Statification {
    /// Whether this is the in-progress (not yet archived) statification.
    pub fn is_in_progress(&self) -> bool {
        self.content_hash.is_empty()
    }
}

/// Action recorded in the lifecycle history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    CreateStatification,
    CrawlCompleted,
    CrawlStopped,
    SaveStatification,
    PushToProduction,
    VisualizeStatification,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::CreateStatification => "create_statification",
            LifecycleAction::CrawlCompleted => "crawl_completed",
            LifecycleAction::CrawlStopped => "crawl_stopped",
            LifecycleAction::SaveStatification => "save_statification",
            LifecycleAction::PushToProduction => "push_to_production",
            LifecycleAction::VisualizeStatification => "visualize_statification",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create_statification" => Some(LifecycleAction::CreateStatification),
            "crawl_completed" => Some(LifecycleAction::CrawlCompleted),
            "crawl_stopped" => Some(LifecycleAction::CrawlStopped),
            "save_statification" => Some(LifecycleAction::SaveStatification),
            "push_to_production" => Some(LifecycleAction::PushToProduction),
            "visualize_statification" => Some(LifecycleAction::VisualizeStatification),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only history entry. Audit only, never read back into decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: i64,
    pub statification_id: i64,
    /// Hash of the statification when the event was recorded.
    pub content_hash: String,
    pub actor: String,
    pub action: LifecycleAction,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordinals_roundtrip() {
        for ordinal in 0..5 {
            let status = StatificationStatus::from_ordinal(ordinal).unwrap();
            assert_eq!(status.ordinal(), ordinal);
        }
        assert_eq!(StatificationStatus::from_ordinal(5), None);
        assert_eq!(StatificationStatus::Production.ordinal(), 3);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&StatificationStatus::Visualized).unwrap();
        assert_eq!(json, "\"visualized\"");
    }

    #[test]
    fn test_action_names() {
        let action = LifecycleAction::PushToProduction;
        assert_eq!(LifecycleAction::parse(action.as_str()), Some(action));
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            "\"push_to_production\""
        );
        assert_eq!(LifecycleAction::parse("delete"), None);
    }
}
