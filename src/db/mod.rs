//! Database layer (Firestore).
//!
//! The pipeline talks to the document store through [`ActivityStore`];
//! [`FirestoreDb`] is the production implementation and [`MemoryDb`]
//! backs tests and local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{ActivityRecord, ProcessedSummary};
use std::future::Future;

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
}

/// Document-store operations on activity records.
///
/// Updates are partial merges: only the fields named by the operation are
/// written, everything else the client stored is left untouched.
pub trait ActivityStore: Send + Sync + 'static {
    /// Point read by activity ID.
    fn get_activity(
        &self,
        activity_id: &str,
    ) -> impl Future<Output = Result<Option<ActivityRecord>, AppError>> + Send;

    fn activity_exists(&self, activity_id: &str) -> impl Future<Output = Result<bool, AppError>> + Send {
        async move { Ok(self.get_activity(activity_id).await?.is_some()) }
    }

    /// Commit a successful ingestion (`status = Processed`).
    fn mark_processed(
        &self,
        activity_id: &str,
        summary: &ProcessedSummary,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Record a failed ingestion (`status = Error`).
    fn mark_failed(
        &self,
        activity_id: &str,
        message: &str,
        failed_at: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Records still `Uploaded` (a missing status counts) whose `uploadedAt`
    /// is before `cutoff` (RFC 3339).
    fn list_stuck(
        &self,
        cutoff: &str,
    ) -> impl Future<Output = Result<Vec<ActivityRecord>, AppError>> + Send;
}
