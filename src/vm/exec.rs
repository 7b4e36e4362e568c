//! Single-node execution: instruction dispatch and the port rendezvous.
//!
//! A step marks the node blocked up front and only clears the flag once
//! the fetched instruction completes. Reads that cannot complete leave the
//! program counter parked; a direction write posts to the node's outbound
//! mailbox and completes later, when the receiver consumes it and advances
//! this node's program counter. That consume is the only cross-node write
//! in the machine, and it happens here, under the engine's `&mut self`.

use crate::error::{GridasmError, Result};

use super::engine::Engine;
use super::instruction::{Instruction, Operand, Port};
use super::node::{NodeId, Pending};

impl Engine {
    /// Execute one instruction cycle on a node.
    ///
    /// Errors if the node has no instructions (such a node is never
    /// scheduled) or if the instruction writes to `NIL`.
    pub(crate) fn step_node(&mut self, id: NodeId) -> Result<()> {
        let node = &mut self.nodes[id.0];
        if node.instructions.is_empty() {
            return Err(GridasmError::NoInstructions { index: node.index });
        }

        node.is_blocked = true;
        node.reset_pc_if_out_of_bounds();
        let ins = node.instructions[node.pc];

        match ins {
            Instruction::Mov { src, dst } => {
                let Some(value) = self.read(id, src) else {
                    return Ok(());
                };
                if !self.write(id, dst, value)? {
                    return Ok(());
                }
            }
            Instruction::Add(op) => {
                let Some(value) = self.read(id, op) else {
                    return Ok(());
                };
                let node = &mut self.nodes[id.0];
                node.acc = node.acc.saturating_add(value);
                node.clamp_acc();
            }
            Instruction::Sub(op) => {
                let Some(value) = self.read(id, op) else {
                    return Ok(());
                };
                let node = &mut self.nodes[id.0];
                node.acc = node.acc.saturating_sub(value);
                node.clamp_acc();
            }
            Instruction::Neg => {
                let node = &mut self.nodes[id.0];
                node.acc = node.acc.saturating_neg();
            }
            Instruction::Sav => {
                let node = &mut self.nodes[id.0];
                node.bak = node.acc;
            }
            Instruction::Swp => {
                let node = &mut self.nodes[id.0];
                std::mem::swap(&mut node.acc, &mut node.bak);
            }
            Instruction::Nop => {}
            Instruction::Out => {
                let value = self.nodes[id.0].acc;
                if let Some(slot) = self.nodes[id.0].output {
                    self.outputs[slot].push(value);
                }
            }
            Instruction::Jmp(target) => {
                self.nodes[id.0].jump_to(target as i32);
                return Ok(());
            }
            Instruction::Jro(offset) => {
                let node = &mut self.nodes[id.0];
                node.jump_to(node.pc as i32 + offset as i32);
                return Ok(());
            }
            Instruction::Jez(target) => {
                if self.nodes[id.0].acc == 0 {
                    self.nodes[id.0].jump_to(target as i32);
                    return Ok(());
                }
            }
            Instruction::Jnz(target) => {
                if self.nodes[id.0].acc != 0 {
                    self.nodes[id.0].jump_to(target as i32);
                    return Ok(());
                }
            }
            Instruction::Jlz(target) => {
                if self.nodes[id.0].acc < 0 {
                    self.nodes[id.0].jump_to(target as i32);
                    return Ok(());
                }
            }
            Instruction::Jgz(target) => {
                if self.nodes[id.0].acc > 0 {
                    self.nodes[id.0].jump_to(target as i32);
                    return Ok(());
                }
            }
        }

        let node = &mut self.nodes[id.0];
        node.is_blocked = false;
        node.advance_pc();
        Ok(())
    }

    /// Read a value through an operand. `None` means the read blocked.
    ///
    /// On a successful port read this consumes the sender's mailbox and
    /// advances the sender's program counter, completing its `MOV`.
    fn read(&mut self, id: NodeId, op: Operand) -> Option<i16> {
        if self.nodes[id.0].outbound.is_some() {
            // a node with a pending send spends no cycles reading
            return Some(0);
        }

        let port = match op {
            Operand::Immediate(value) => return Some(value),
            Operand::Port(port) => port,
        };

        match port {
            Port::Nil => Some(0),
            Port::Acc => Some(self.nodes[id.0].acc),
            Port::Up | Port::Down | Port::Left | Port::Right | Port::Any | Port::Last => {
                let Some(peer) = self.input_peer(id, port) else {
                    // LAST before any ANY handshake reads zero, non-blocking
                    return (port == Port::Last).then_some(0);
                };
                let pending = self.nodes[peer.0].outbound;
                match pending {
                    Some(pending) if pending.target == id => {
                        let sender = &mut self.nodes[peer.0];
                        sender.outbound = None;
                        sender.advance_pc();
                        if port == Port::Any {
                            self.nodes[id.0].last = Some(peer);
                        }
                        Some(pending.value)
                    }
                    _ if port == Port::Last => Some(0),
                    _ => None,
                }
            }
        }
    }

    /// Write a value to a destination port. `Ok(true)` means the write
    /// completed this step; `Ok(false)` means it is pending (direction
    /// sends finish when the receiver drains the mailbox).
    fn write(&mut self, id: NodeId, port: Port, value: i16) -> Result<bool> {
        match port {
            Port::Acc => {
                self.nodes[id.0].acc = value;
                Ok(true)
            }
            Port::Nil => Err(GridasmError::NilWrite {
                index: self.nodes[id.0].index,
            }),
            Port::Up | Port::Down | Port::Left | Port::Right | Port::Any | Port::Last => {
                if self.nodes[id.0].outbound.is_none() {
                    if let Some(target) = self.output_peer(id, port) {
                        self.nodes[id.0].outbound = Some(Pending { target, value });
                        if port == Port::Any {
                            self.nodes[id.0].last = Some(target);
                        }
                    }
                }
                Ok(false)
            }
        }
    }

    /// Resolve the peer a read should consume from.
    ///
    /// `ANY` probes `LEFT, RIGHT, UP, DOWN` for the first neighbor sending
    /// to this node; `LAST` reuses the recorded peer.
    fn input_peer(&self, id: NodeId, port: Port) -> Option<NodeId> {
        match port {
            Port::Any => Port::PROBE_ORDER.iter().find_map(|&dir| {
                let peer = self.nodes[id.0].neighbor(dir)?;
                match self.nodes[peer.0].outbound {
                    Some(pending) if pending.target == id => Some(peer),
                    _ => None,
                }
            }),
            Port::Last => self.nodes[id.0].last,
            _ => self.nodes[id.0].neighbor(port),
        }
    }

    /// Resolve the peer a write should target.
    ///
    /// `ANY` probes `LEFT, RIGHT, UP, DOWN` for the first neighbor whose
    /// current instruction is a `MOV` reading from `ANY` or from the
    /// direction pointing back at this node.
    fn output_peer(&self, id: NodeId, port: Port) -> Option<NodeId> {
        match port {
            Port::Any => Port::PROBE_ORDER.iter().find_map(|&dir| {
                let peer = self.nodes[id.0].neighbor(dir)?;
                match self.nodes[peer.0].current_instruction() {
                    Some(&Instruction::Mov {
                        src: Operand::Port(src),
                        ..
                    }) if src == Port::Any || self.nodes[peer.0].neighbor(src) == Some(id) => {
                        Some(peer)
                    }
                    _ => None,
                }
            }),
            Port::Last => self.nodes[id.0].last,
            _ => self.nodes[id.0].neighbor(port),
        }
    }
}
