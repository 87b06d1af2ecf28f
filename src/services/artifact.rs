// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Converted artifact naming and encoding.
//!
//! Raw uploads live at `<dir>/<activity_id>.fit`; the converted artifact is
//! written next to them as `<dir>/<activity_id>.json.gz`, a gzip of the
//! decoded file's JSON text.

use crate::models::DecodedFile;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Extension recognized as a raw activity upload.
pub const FIT_EXTENSION: &str = "fit";

/// Suffix of converted artifacts.
pub const ARTIFACT_SUFFIX: &str = ".json.gz";

/// Content type used when storing artifacts.
pub const ARTIFACT_CONTENT_TYPE: &str = "application/gzip";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to compress artifact: {0}")]
    Compress(#[source] std::io::Error),

    #[error("failed to decompress artifact: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("invalid artifact JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Split an object path into (directory including trailing '/', base name).
fn split_path(object_path: &str) -> (&str, &str) {
    match object_path.rfind('/') {
        Some(idx) => object_path.split_at(idx + 1),
        None => ("", object_path),
    }
}

/// Base name with its final extension removed.
fn stem(base: &str) -> &str {
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}

/// Whether the object is a raw FIT upload (`.fit`, any case).
pub fn is_fit_file(object_path: &str) -> bool {
    let (_, base) = split_path(object_path);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx + 1..].eq_ignore_ascii_case(FIT_EXTENSION),
        _ => false,
    }
}

/// Activity ID encoded in the object's base name.
pub fn activity_id_from_path(object_path: &str) -> &str {
    let (_, base) = split_path(object_path);
    stem(base)
}

/// Artifact path for a raw upload: same directory, `.json.gz` suffix.
pub fn artifact_path(object_path: &str) -> String {
    let (dir, base) = split_path(object_path);
    format!("{}{}{}", dir, stem(base), ARTIFACT_SUFFIX)
}

/// Serialize the decoded file as JSON text.
pub fn to_json(decoded: &DecodedFile) -> Result<Vec<u8>, ArtifactError> {
    Ok(serde_json::to_vec(decoded)?)
}

pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, ArtifactError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).map_err(ArtifactError::Compress)?;
    encoder.finish().map_err(ArtifactError::Compress)
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, ArtifactError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(ArtifactError::Decompress)?;
    Ok(out)
}

/// JSON-encode and gzip a decoded file.
pub fn encode(decoded: &DecodedFile) -> Result<Vec<u8>, ArtifactError> {
    compress(&to_json(decoded)?)
}

/// Gunzip and parse an artifact.
pub fn decode(bytes: &[u8]) -> Result<DecodedFile, ArtifactError> {
    let json = decompress(bytes)?;
    Ok(serde_json::from_slice(&json)?)
}
