//! The execution core: instruction model, per-node assembler, port
//! rendezvous, and the tick scheduler.
//!
//! ## Layers
//!
//! ```text
//! instruction  tagged operations with typed operands
//! assembler    source lines + labels -> resolved instruction sequences
//! node         registers, program memory, neighbor wiring (arena ids)
//! exec         one instruction cycle: dispatch + port handshake
//! engine       3x4 grid, ephemeral I/O nodes, tick scheduler
//! ```
//!
//! ## Port rendezvous
//!
//! A sender's `MOV x, <DIR>` posts `(target, value)` into its single-slot
//! outbound mailbox and parks; the matching reader consumes the mailbox,
//! takes the value, and advances the sender past its `MOV`. A node is
//! always in exactly one of three states per tick: executing locally,
//! waiting to send, or waiting to receive.
//!
//! ## Example
//!
//! ```ignore
//! use gridasm::{Code, Engine, Stream, StreamKind};
//!
//! let mut code = Code::empty("PASS-THROUGH");
//! code.nodes[0] = vec!["MOV UP DOWN".into()];
//! code.nodes[4] = vec!["MOV UP DOWN".into()];
//! code.nodes[8] = vec!["MOV UP DOWN".into()];
//!
//! let streams = vec![
//!     Stream::new(StreamKind::Input, "IN.A", 0, vec![42]),
//!     Stream::new(StreamKind::Output, "OUT.A", 0, vec![42]),
//! ];
//!
//! let mut engine = Engine::new(&streams, &code)?;
//! while !engine.tick()? {}
//! assert!(engine.outputs()[0].matches(&streams[1]));
//! ```

mod assembler;
mod engine;
mod exec;
mod instruction;
mod node;
mod output;

pub use assembler::{compile, CompileError};
pub use engine::Engine;
pub use instruction::{Instruction, Operand, Port};
pub use node::{Node, NodeId, Pending};
pub use output::OutputBuffer;
