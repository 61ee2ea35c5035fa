//! Compilation of node boards into TypeScript.
//!
//! This crate lowers the function containers of a
//! [`NodeTable`](nodecode_core::NodeTable) into a small TypeScript syntax
//! tree and prints it as source text.
//!
//! # Modules
//!
//! - [`ast`] -- Target syntax tree (functions, statements, expressions)
//! - [`types`] -- Mapping from node type tokens to type annotations
//! - [`diagnostics`] -- Reasons a function cannot be compiled
//! - [`compiler`] -- Graph-to-AST lowering with binding hoisting
//! - [`writer`] -- TypeScript source emitter
//! - [`error`] -- Errors at the board-file boundary

pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod types;
pub mod writer;

pub use compiler::{compile, compile_function};
pub use diagnostics::Diagnostic;
pub use error::CodegenError;
pub use writer::TsWriter;

use serde::{Deserialize, Serialize};

/// Options controlling how source text is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Spaces per indentation level.
    pub indent_width: usize,

    /// Whether to print the return type annotation of each function.
    /// Parameter and `const` annotations are always printed.
    pub return_types: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            indent_width: 4,
            return_types: true,
        }
    }
}

/// Compile every function on `table` and emit it as TypeScript.
pub fn compile_to_source(
    table: &nodecode_core::NodeTable,
    options: &EmitOptions,
) -> Result<String, CodegenError> {
    let program = compile(table)?;
    Ok(TsWriter::emit_with(&program, options))
}
