//! Puzzle-facing data model: programs, streams, and shared limits.
//!
//! These types are what the surrounding harness hands to
//! [`Engine::new`](crate::Engine::new): a [`Code`] carrying one source-line
//! vector per grid node, and a list of [`Stream`] descriptors declaring
//! where values enter and leave the grid.

use serde::{Deserialize, Serialize};

/// Upper bound for the accumulator register.
pub const MAX_ACC: i16 = 999;

/// Lower bound for the accumulator register.
pub const MIN_ACC: i16 = -999;

/// Number of compute nodes in the grid.
pub const NODE_COUNT: usize = 12;

/// Number of columns streams can attach to.
pub const IO_POSITIONS: u8 = 4;

/// Maximum number of values a stream carries.
pub const MAX_STREAM_VALUES: usize = 30;

/// A program for the whole grid: a title plus one source-line vector per
/// node, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub title: String,
    pub nodes: Vec<Vec<String>>,
}

impl Code {
    /// Create an empty program (all twelve nodes blank).
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            nodes: vec![Vec::new(); NODE_COUNT],
        }
    }
}

/// Whether a stream feeds values into the grid or collects them from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Input,
    Output,
}

/// An input or output stream attached above or below the grid.
///
/// For inputs, `values` is the sequence injected at `position`. For
/// outputs, `values` is informational: typically the sequence the harness
/// expects to see, compared via
/// [`OutputBuffer::matches`](crate::OutputBuffer::matches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub kind: StreamKind,
    pub name: String,
    pub position: u8,
    pub values: Vec<i16>,
}

impl Stream {
    pub fn new(kind: StreamKind, name: impl Into<String>, position: u8, values: Vec<i16>) -> Self {
        Self {
            kind,
            name: name.into(),
            position,
            values,
        }
    }

    /// Number of values the stream carries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
