pub mod compile;
pub mod error;
pub mod expression;
pub mod fragments;
pub mod oracle;
pub mod patch;
pub mod policy;
pub mod registry;
pub mod tokenize;

pub use compile::compile_expression;
pub use error::{CompileError, Result};
pub use expression::{Expression, Scope, SubQuerySpec};
pub use oracle::{CaptureOracle, CaptureRequest, CapturedQuery, OracleError};
pub use policy::{Ability, Operation};
pub use registry::TokenRegistry;
