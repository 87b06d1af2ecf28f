//! In-memory activity store for tests and local runs.

use crate::db::ActivityStore;
use crate::error::AppError;
use crate::models::{ActivityRecord, ActivityStatus, ProcessedSummary};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct MemoryDb {
    records: Arc<Mutex<HashMap<String, ActivityRecord>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, ActivityRecord>>, AppError> {
        self.records
            .lock()
            .map_err(|_| AppError::Database("memory store poisoned".to_string()))
    }

    /// Insert or replace a record, keyed by its ID.
    pub fn insert(&self, record: ActivityRecord) -> Result<(), AppError> {
        self.lock()?.insert(record.id.clone(), record);
        Ok(())
    }

    /// Updates applied through [`ActivityStore`] (seeding is not counted).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ActivityStore for MemoryDb {
    async fn get_activity(&self, activity_id: &str) -> Result<Option<ActivityRecord>, AppError> {
        Ok(self.lock()?.get(activity_id).cloned())
    }

    async fn mark_processed(
        &self,
        activity_id: &str,
        summary: &ProcessedSummary,
    ) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.lock()?;
        let record = records
            .entry(activity_id.to_string())
            .or_insert_with(|| ActivityRecord {
                id: activity_id.to_string(),
                ..Default::default()
            });
        summary.apply_to(record);
        Ok(())
    }

    async fn mark_failed(
        &self,
        activity_id: &str,
        message: &str,
        failed_at: &str,
    ) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.lock()?;
        let record = records
            .entry(activity_id.to_string())
            .or_insert_with(|| ActivityRecord {
                id: activity_id.to_string(),
                ..Default::default()
            });
        record.status = Some(ActivityStatus::Error);
        record.error_message = Some(message.to_string());
        record.processed_at = Some(failed_at.to_string());
        Ok(())
    }

    async fn list_stuck(&self, cutoff: &str) -> Result<Vec<ActivityRecord>, AppError> {
        let mut stuck: Vec<ActivityRecord> = self
            .lock()?
            .values()
            .filter(|r| r.status() == ActivityStatus::Uploaded)
            .filter(|r| r.uploaded_at.as_deref().is_some_and(|at| at < cutoff))
            .cloned()
            .collect();
        stuck.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stuck)
    }
}
