//! The strict interface to the system that turns a tokenized filter into
//! real parameterized SQL.
//!
//! The compiler leans on a full query engine purely to discover correct
//! join/subquery SQL, then patches the result. Keeping the seam this narrow
//! means the oracle can later be replaced by a real query-plan generator
//! without touching the tokenizer or patcher.

use async_trait::async_trait;
use model::{core::value::Value, filter::tokenized::TokenizedTree};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle rejected the tokenized filter, e.g. a malformed relation
    /// traversal.
    #[error("capture rejected: {0}")]
    Rejected(String),

    /// The capture itself failed (connection loss, engine error, ...).
    #[error("capture failed: {0}")]
    Failed(String),
}

/// A single-row probe against `model` with every filter leaf tokenized.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub model: String,
    pub filter: TokenizedTree,
}

/// The exact SQL text and positional parameter values the underlying query
/// engine would send to the database for the probe.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Executes (or dry-runs) exactly one read per compilation and reports the
/// SQL it would issue. Must support equality filters, `IN` lists, and nested
/// relation traversal to arbitrary depth — the compiler never generates join
/// SQL itself.
#[async_trait]
pub trait CaptureOracle: Send + Sync {
    async fn capture(&self, request: CaptureRequest) -> Result<CapturedQuery, OracleError>;
}
