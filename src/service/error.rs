//! Service error types
//!
//! Reads never surface these: `fetch` degrades instead. They come back
//! from construction and from mutations, which cannot degrade.

use crate::backend::BackendError;
use crate::cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// No physical table could be found for a logical resource
    #[error("No table found for {resource}: {reason}")]
    Unresolved { resource: String, reason: String },
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
