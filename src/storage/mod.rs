// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Blob storage (Cloud Storage).
//!
//! Objects are moved between the bucket and local scratch files; callers
//! own the local paths and their cleanup.

pub mod gcs;
pub mod memory;

pub use gcs::GcsStorage;
pub use memory::MemoryStorage;

use crate::error::AppError;
use std::future::Future;
use std::path::Path;

/// Path-addressed object storage.
pub trait BlobStore: Send + Sync + 'static {
    /// Download `bucket/object` into the file at `dest`, replacing it.
    fn download_to(
        &self,
        bucket: &str,
        object: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Upload the file at `src` to `bucket/object`, replacing any existing object.
    fn upload_from(
        &self,
        bucket: &str,
        object: &str,
        src: &Path,
        content_type: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
