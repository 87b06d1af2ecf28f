// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dead-letter sweep for uploads that never finished processing.

use crate::db::ActivityStore;
use crate::error::Result;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};

/// Max concurrent status writes during a sweep.
const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Mark records still `Uploaded` after `stuck_after` as `Error`.
///
/// Returns the IDs that were moved, sorted. Individual write failures are
/// logged and skipped so one bad record does not block the rest.
pub async fn reconcile_stuck<D: ActivityStore>(
    db: &D,
    now: DateTime<Utc>,
    stuck_after: Duration,
) -> Result<Vec<String>> {
    let cutoff = format_utc_rfc3339(now - stuck_after);
    let stuck = db.list_stuck(&cutoff).await?;

    if stuck.is_empty() {
        tracing::debug!(cutoff = %cutoff, "No stuck activities");
        return Ok(Vec::new());
    }

    tracing::info!(
        count = stuck.len(),
        cutoff = %cutoff,
        "Marking stuck activities as failed"
    );

    let message = format!(
        "Processing did not finish within {} minutes; upload the file again",
        stuck_after.num_minutes()
    );
    let failed_at = format_utc_rfc3339(now);

    let results: Vec<(String, Result<()>)> = stream::iter(stuck)
        .map(|record| {
            let message = message.as_str();
            let failed_at = failed_at.as_str();
            async move {
                let result = db.mark_failed(&record.id, message, failed_at).await;
                (record.id, result)
            }
        })
        .buffer_unordered(MAX_CONCURRENT_DB_OPS)
        .collect()
        .await;

    let mut moved = Vec::with_capacity(results.len());
    for (activity_id, result) in results {
        match result {
            Ok(()) => moved.push(activity_id),
            Err(e) => {
                tracing::error!(activity_id, error = %e, "Failed to mark stuck activity");
            }
        }
    }
    moved.sort();

    Ok(moved)
}
