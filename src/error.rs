//! Error types for the ingestion pipeline.
//!
//! Most failure modes are recovered close to where they happen (a failed
//! page fetch degrades to an empty page, an unsupported image passes
//! through untouched). The types here cover what still crosses a module
//! boundary: transport/decode failures surfaced by the fetch client and
//! repository failures surfaced to the item loop.

use thiserror::Error;

/// Errors produced by the fetch client and scrapers.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by a record or media repository implementation.
///
/// The repository is an external collaborator; implementations map their
/// backend failures into `Backend`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
