// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity series query: load a processed artifact and flatten it.

use crate::db::ActivityStore;
use crate::error::{AppError, Result};
use crate::models::{ActivitySeries, DecodedFile, SeriesPoint};
use crate::services::artifact::{self, ARTIFACT_SUFFIX};
use crate::storage::BlobStore;
use serde::Deserialize;
use std::path::Path;
use validator::Validate;

/// Arguments of the series query.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SeriesRequest {
    /// Activity document ID. Document IDs cannot contain `/`.
    #[validate(
        required(message = "activity is required"),
        length(min = 1, max = 1500, message = "activity must be a non-empty identifier")
    )]
    pub activity: Option<String>,
}

impl SeriesRequest {
    /// Validate and return the activity ID.
    pub fn activity_id(&self) -> Result<&str> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        match self.activity.as_deref() {
            Some(id) if !id.trim().is_empty() && !id.contains('/') => Ok(id),
            Some(_) => Err(AppError::BadRequest(
                "activity must be a non-empty identifier".to_string(),
            )),
            None => Err(AppError::BadRequest("activity is required".to_string())),
        }
    }
}

/// Reads artifacts for processed activities.
pub struct SeriesQuery<'a, D, B> {
    db: &'a D,
    blobs: &'a B,
    bucket: &'a str,
    scratch_root: &'a Path,
}

impl<'a, D: ActivityStore, B: BlobStore> SeriesQuery<'a, D, B> {
    pub fn new(db: &'a D, blobs: &'a B, bucket: &'a str, scratch_root: &'a Path) -> Self {
        Self {
            db,
            blobs,
            bucket,
            scratch_root,
        }
    }

    /// Load the flattened series for one activity.
    ///
    /// Checks run in order: argument, caller, record, processing state.
    /// No document is read for an anonymous caller.
    pub async fn fetch(
        &self,
        caller: Option<&str>,
        request: &SeriesRequest,
    ) -> Result<ActivitySeries> {
        let activity_id = request.activity_id()?;
        let caller = caller.ok_or(AppError::Unauthorized)?;

        let record = self
            .db
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;

        let artifact_path = record.processed_artifact().ok_or_else(|| {
            AppError::Precondition(format!(
                "Activity {} is not processed (status {})",
                activity_id,
                record.status().as_str()
            ))
        })?;

        tracing::debug!(
            activity_id,
            caller,
            artifact = artifact_path,
            "Loading activity series"
        );

        let decoded = self.load_artifact(activity_id, artifact_path).await?;
        let series = project_series(&decoded)?;

        tracing::info!(
            activity_id,
            laps = series.lap_count,
            points = series.points.len(),
            "Activity series served"
        );

        Ok(series)
    }

    async fn load_artifact(&self, activity_id: &str, artifact_path: &str) -> Result<DecodedFile> {
        tokio::fs::create_dir_all(self.scratch_root).await?;
        let scratch = tempfile::Builder::new()
            .prefix("query-")
            .tempdir_in(self.scratch_root)?;
        let local = scratch
            .path()
            .join(format!("{}{}", activity_id, ARTIFACT_SUFFIX));

        let bytes = match self.blobs.download_to(self.bucket, artifact_path, &local).await {
            Ok(()) => tokio::fs::read(&local).await.map_err(AppError::from),
            Err(e) => Err(e),
        };

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                path = %scratch_path.display(),
                error = %e,
                "Failed to remove scratch directory"
            );
        }

        Ok(artifact::decode(&bytes?)?)
    }
}

/// Flatten the first session's laps into one ordered point sequence.
///
/// Lap numbers are assigned by position, starting at 1.
pub fn project_series(decoded: &DecodedFile) -> Result<ActivitySeries> {
    let session = decoded
        .primary_session()
        .ok_or_else(|| anyhow::anyhow!("artifact contains no sessions"))?;

    let points = session
        .laps
        .iter()
        .enumerate()
        .flat_map(|(index, lap)| {
            lap.records.iter().map(move |record| SeriesPoint {
                lap: index + 1,
                timestamp: record.timestamp,
                elapsed_time: record.elapsed_time,
                distance: record.distance,
                power: record.power,
                altitude: record.altitude,
                speed: record.speed,
                cadence: record.cadence,
                heart_rate: record.heart_rate,
                temperature: record.temperature,
            })
        })
        .collect();

    Ok(ActivitySeries {
        start_time: session.start_time,
        total_elapsed_time: session.total_elapsed_time,
        avg_speed: session.avg_speed,
        avg_cadence: session.avg_cadence,
        avg_power: session.avg_power,
        total_distance: session.total_distance,
        total_ascent: session.total_ascent,
        total_descent: session.total_descent,
        lap_count: session.laps.len(),
        session_count: decoded.activity.sessions.len(),
        points,
    })
}
