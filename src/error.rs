//! Error types for gridasm

use thiserror::Error;

use crate::vm::CompileError;

/// Gridasm error type
#[derive(Debug, Error)]
pub enum GridasmError {
    /// A node program failed to compile
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// The code did not carry one program per grid node
    #[error("wrong node count: expected {expected}, got {actual}")]
    NodeCount { expected: usize, actual: usize },

    /// A stream referenced a column outside the grid
    #[error("stream position {0} out of range")]
    StreamPosition(u8),

    /// A node with an empty instruction list was ticked
    #[error("node {index} has no instructions to execute")]
    NoInstructions { index: u8 },

    /// A node tried to write a value to the NIL port
    #[error("node {index}: unable to write to NIL")]
    NilWrite { index: u8 },

    /// Program text format error
    #[error("program format error: {0}")]
    Format(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridasmError>;
