use serde::{Serialize, Serializer};

use crate::statification::{LifecycleEvent, Statification, StatificationStatus};
use crate::status::StatusRecord;

/// Snapshot of the orchestrator state polled by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    /// Hash of the latest statification, empty while it is in progress.
    pub sha: String,
    /// Set only while the latest statification is in progress.
    pub designation: String,
    pub description: String,
    /// Status of the latest statification, PRODUCTION when there is none.
    pub status: StatificationStatus,
    /// Pages captured by the previous crawl, the expected total for this one.
    pub item_count_to_crawl: i64,
    pub crawling: bool,
    pub locked: bool,
    pub items_crawled: i64,
    /// Outcome of the latest background operation, `{}` when none.
    #[serde(serialize_with = "serialize_background")]
    pub background: Option<StatusRecord>,
}

fn serialize_background<S: Serializer>(
    background: &Option<StatusRecord>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match background {
        Some(record) => record.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

/// A statification with its lifecycle history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatificationInfo {
    pub statification: Statification,
    pub events: Vec<LifecycleEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Operation;

    fn view(background: Option<StatusRecord>) -> StatusView {
        StatusView {
            sha: String::new(),
            designation: String::new(),
            description: String::new(),
            status: StatificationStatus::Production,
            item_count_to_crawl: 0,
            crawling: false,
            locked: false,
            items_crawled: 0,
            background,
        }
    }

    #[test]
    fn test_empty_background_serializes_as_object() {
        let json = serde_json::to_value(view(None)).unwrap();
        assert_eq!(json["background"], serde_json::json!({}));
        assert_eq!(json["status"], "production");
    }

    #[test]
    fn test_background_record_is_inlined() {
        let json =
            serde_json::to_value(view(Some(StatusRecord::succeeded(Operation::Deploy, "h1"))))
                .unwrap();
        assert_eq!(json["background"]["operation"], "deploy");
        assert_eq!(json["background"]["sha"], "h1");
    }
}
