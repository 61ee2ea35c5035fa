//! Codegen error types for callers that load, compile and emit boards.

use nodecode_core::CoreError;

use crate::diagnostics::Diagnostic;

/// Errors surfaced at the boundary between a board file and emitted source.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// One or more functions failed to compile.
    #[error("compile failed with {} diagnostic(s)", .0.len())]
    CompileFailed(Vec<Diagnostic>),

    /// The node table itself is malformed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No function with the requested name exists on the board.
    #[error("no function named {0:?}")]
    UnknownFunction(String),

    /// Filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Board or AST (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Vec<Diagnostic>> for CodegenError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        CodegenError::CompileFailed(diagnostics)
    }
}
