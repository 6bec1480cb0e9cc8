//! In-memory capacity ledger.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use coursebook_core::result::AppResult;
use coursebook_core::types::CourseId;
use coursebook_entity::course::CapacityEntry;

use crate::store::{CapacityLedger, StoreError};

/// Capacity ledger held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCapacityLedger {
    entries: DashMap<CourseId, CapacityEntry>,
}

impl MemoryCapacityLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the entry for a newly published course.
    pub fn open(&self, course_id: CourseId, capacity: i32) {
        self.entries
            .insert(course_id, CapacityEntry::opened(course_id, capacity));
    }

    /// Remove every entry.
    pub fn clear(&self) -> u64 {
        let count = self.entries.len() as u64;
        self.entries.clear();
        count
    }
}

#[async_trait]
impl CapacityLedger for MemoryCapacityLedger {
    async fn get(&self, course_id: CourseId) -> AppResult<Option<CapacityEntry>> {
        Ok(self.entries.get(&course_id).map(|e| *e.value()))
    }

    async fn conditional_adjust(
        &self,
        course_id: CourseId,
        delta: i32,
        expected_version: i64,
    ) -> Result<CapacityEntry, StoreError> {
        let mut entry = self
            .entries
            .get_mut(&course_id)
            .ok_or(StoreError::Vanished)?;

        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: entry.version,
            });
        }
        let reserved = entry.adjusted(delta).ok_or(StoreError::CapacityViolation {
            capacity: entry.capacity,
            reserved: entry.reserved,
            delta,
        })?;

        entry.reserved = reserved;
        entry.version += 1;
        debug!(%course_id, delta, reserved, version = entry.version, "Ledger adjusted");
        Ok(*entry)
    }

    async fn entries(&self) -> AppResult<Vec<CapacityEntry>> {
        Ok(self.entries.iter().map(|e| *e.value()).collect())
    }
}
