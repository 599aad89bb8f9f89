//! Statification records, their lifecycle history and storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::{SqliteConnector, SqliteStatificationStore};
pub use store::{
    CreateStatificationRequest, HistoryOrder, StatificationFilter, StatificationStore,
    StoreConnector, StoreError,
};
pub use types::{LifecycleAction, LifecycleEvent, Statification, StatificationStatus};
