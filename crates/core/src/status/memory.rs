use std::sync::RwLock;

use super::{StatusError, StatusRecord, StatusStore};

/// Status artifact kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    record: RwLock<Option<StatusRecord>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for InMemoryStatusStore {
    fn clear(&self) -> Result<(), StatusError> {
        *self.record.write().unwrap() = None;
        Ok(())
    }

    fn write(&self, record: &StatusRecord) -> Result<(), StatusError> {
        *self.record.write().unwrap() = Some(record.clone());
        Ok(())
    }

    fn read(&self) -> Result<Option<StatusRecord>, StatusError> {
        Ok(self.record.read().unwrap().clone())
    }
}
