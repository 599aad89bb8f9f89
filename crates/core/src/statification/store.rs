//! Lifecycle store trait and query types.

use std::str::FromStr;

use thiserror::Error;

use super::{LifecycleAction, LifecycleEvent, Statification, StatificationStatus};

/// Error type for lifecycle store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No statification matched.
    #[error("statification not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Request to create a new in-progress statification.
#[derive(Debug, Clone)]
pub struct CreateStatificationRequest {
    pub designation: String,
    pub description: String,
}

/// Column the history is ordered by (always descending).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryOrder {
    #[default]
    Id,
    CreatedAt,
    UpdatedAt,
    Designation,
    Status,
}

impl HistoryOrder {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            HistoryOrder::Id => "id",
            HistoryOrder::CreatedAt => "created_at",
            HistoryOrder::UpdatedAt => "updated_at",
            HistoryOrder::Designation => "designation",
            HistoryOrder::Status => "status",
        }
    }
}

impl FromStr for HistoryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(HistoryOrder::Id),
            "created_at" | "cre_date" => Ok(HistoryOrder::CreatedAt),
            "updated_at" | "upd_date" => Ok(HistoryOrder::UpdatedAt),
            "designation" => Ok(HistoryOrder::Designation),
            "status" => Ok(HistoryOrder::Status),
            other => Err(format!("unknown order column: {}", other)),
        }
    }
}

/// Page of the statification history.
#[derive(Debug, Clone)]
pub struct StatificationFilter {
    pub order: HistoryOrder,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl StatificationFilter {
    pub const MAX_LIMIT: i64 = 1000;

    pub fn new() -> Self {
        Self {
            order: HistoryOrder::Id,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_order(mut self, order: HistoryOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the page size, clamped to `1..=MAX_LIMIT`.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset.max(0);
        self
    }
}

impl Default for StatificationFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for statification storage backends.
pub trait StatificationStore: Send + Sync {
    /// Create a CREATED statification with an empty hash.
    fn create(&self, request: CreateStatificationRequest) -> Result<Statification, StoreError>;

    /// Statification with the given hash. The empty hash names the in-progress one.
    fn get_by_hash(&self, content_hash: &str) -> Result<Option<Statification>, StoreError>;

    /// The `n` most recently created statifications, newest first.
    fn latest(&self, n: i64) -> Result<Vec<Statification>, StoreError>;

    /// Page of statifications.
    fn list(&self, filter: &StatificationFilter) -> Result<Vec<Statification>, StoreError>;

    fn count(&self) -> Result<i64, StoreError>;

    /// Move every statification in `from` to `to`. Returns how many moved.
    fn switch_status(
        &self,
        from: StatificationStatus,
        to: StatificationStatus,
    ) -> Result<usize, StoreError>;

    /// Replace a content hash. Fails with `NotFound` when no record has `old_hash`.
    fn update_hash(&self, old_hash: &str, new_hash: &str) -> Result<(), StoreError>;

    /// Set the status of the newest record with `content_hash`.
    fn update_status(
        &self,
        content_hash: &str,
        status: StatificationStatus,
    ) -> Result<(), StoreError>;

    /// Finish the crawl of a CREATED record. Returns `false` if it was not CREATED.
    fn complete_crawl(&self, id: i64, item_count: i64) -> Result<bool, StoreError>;

    fn append_event(
        &self,
        statification_id: i64,
        actor: &str,
        action: LifecycleAction,
    ) -> Result<LifecycleEvent, StoreError>;

    /// History of one statification, oldest first.
    fn events_for(&self, statification_id: i64) -> Result<Vec<LifecycleEvent>, StoreError>;
}

/// Opens independent store connections.
///
/// Background jobs open their own connection instead of borrowing the
/// request's one.
pub trait StoreConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn StatificationStore>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_clamps_limit() {
        assert_eq!(StatificationFilter::new().with_limit(0).limit, 1);
        assert_eq!(StatificationFilter::new().with_limit(-5).limit, 1);
        assert_eq!(StatificationFilter::new().with_limit(5000).limit, 1000);
        assert_eq!(StatificationFilter::new().with_offset(-1).offset, 0);
    }

    #[test]
    fn test_order_parsing() {
        assert_eq!("cre_date".parse::<HistoryOrder>(), Ok(HistoryOrder::CreatedAt));
        assert_eq!("updated_at".parse::<HistoryOrder>(), Ok(HistoryOrder::UpdatedAt));
        assert_eq!("status".parse::<HistoryOrder>(), Ok(HistoryOrder::Status));
        assert!("id; DROP TABLE".parse::<HistoryOrder>().is_err());
    }
}
