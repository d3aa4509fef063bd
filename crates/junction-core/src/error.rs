//! Error types for junction-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    #[error("stale matrix entry (generation {entry}, matrix at {matrix})")]
    StaleMatrixEntry { entry: u32, matrix: u32 },

    #[error("integration order {order} not supported by {method}")]
    UnsupportedIntegrationOrder { method: &'static str, order: usize },

    #[error("invalid dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
