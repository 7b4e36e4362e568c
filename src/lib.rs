//! # Gridasm - Node-Grid Virtual Machine
//!
//! A TIS-100-style machine: a fixed 3×4 grid of tiny assembly-programmed
//! compute nodes that exchange values over directional ports, driven one
//! synchronous tick at a time.
//!
//! ## Core Components
//!
//! - **Instruction model**: tagged operations (`MOV`, `ADD`, jumps, ...)
//!   with typed operands - immediates or port/register references
//! - **Assembler**: per-node two-pass compile, labels resolved to absolute
//!   instruction indices
//! - **Port rendezvous**: single-slot outbound mailboxes with a
//!   suspend/resume handshake; `ANY`/`LAST` resolve at runtime
//! - **Engine**: grid wiring, ephemeral input/output nodes at the edges,
//!   tick scheduler with global-quiescence detection
//!
//! ## Design Principles
//!
//! - **Deterministic**: nodes step in a fixed order each tick; identical
//!   inputs replay bit-for-bit
//! - **Arena-owned**: nodes reference each other by stable index; all
//!   cross-node writes happen inside engine-level step functions
//! - **Blocked is not an error**: back-pressure is state, not failure;
//!   compile and runtime faults are the only error paths
//!
//! ## Example
//!
//! ```ignore
//! use gridasm::{Code, Engine, Stream, StreamKind};
//!
//! let code = gridasm::loader::parse_code(source_text, "DIAGNOSTIC")?;
//! let streams = vec![
//!     Stream::new(StreamKind::Input, "IN.A", 0, vec![1, 2, 3]),
//!     Stream::new(StreamKind::Output, "OUT.A", 0, vec![2, 4, 6]),
//! ];
//!
//! let mut engine = Engine::new(&streams, &code)?;
//! while !engine.tick()? {}
//! println!("produced: {:?}", engine.outputs()[0].values());
//! ```

// Puzzle-facing data model
pub mod model;
pub use model::{Code, Stream, StreamKind, MAX_ACC, MIN_ACC, NODE_COUNT};

// Execution core
pub mod vm;
pub use vm::{
    compile, CompileError, Engine, Instruction, Node, NodeId, Operand, OutputBuffer, Port,
};

// Program text format
pub mod loader;
pub use loader::{format_code, load_code, parse_code, save_code};

// Error types
mod error;
pub use error::{GridasmError, Result};
