//! Engine - grid construction, stream wiring, and the tick scheduler.
//!
//! Construction wires a 3×4 grid of compute nodes, compiles each node's
//! program, and attaches ephemeral I/O nodes per stream descriptor: input
//! nodes above the top row drive seed values in through `MOV` chains,
//! output nodes below the bottom row capture values into per-position
//! buffers.
//!
//! The active list is three segments in a fixed order: input ephemerals in
//! stream-declaration order, compute nodes row-major, output ephemerals in
//! declaration order. [`Engine::tick`] steps the list once, in order, and
//! reports whether every active node ended the tick blocked.

use log::debug;

use crate::error::{GridasmError, Result};
use crate::model::{Code, Stream, StreamKind, IO_POSITIONS, NODE_COUNT};

use super::assembler;
use super::instruction::{Instruction, Operand, Port};
use super::node::{Node, NodeId};
use super::output::OutputBuffer;

const ROWS: usize = 3;
const COLS: usize = 4;

/// Compute nodes are numbered from here; input ephemerals sit at 0..3.
const POSITION_OFFSET: u8 = 4;
/// Output ephemerals are numbered from here.
const OUTPUT_OFFSET: u8 = 16;

/// The node-grid virtual machine.
#[derive(Debug)]
pub struct Engine {
    /// Node arena: the twelve compute nodes first, then ephemerals in
    /// creation order.
    pub(crate) nodes: Vec<Node>,
    /// Nodes stepped each tick, in order.
    pub(crate) active: Vec<NodeId>,
    /// One buffer per output stream, in declaration order.
    pub(crate) outputs: Vec<OutputBuffer>,
}

impl Engine {
    /// Build an engine from stream descriptors and a grid program.
    ///
    /// Fails on a wrong node count, a stream position outside the grid, or
    /// any per-node compile error; no partial engine is produced.
    pub fn new(streams: &[Stream], code: &Code) -> Result<Self> {
        let mut nodes = Vec::with_capacity(NODE_COUNT);
        for i in 0..NODE_COUNT {
            nodes.push(Node::new(i as u8 + POSITION_OFFSET));
        }

        let mut engine = Self {
            nodes,
            active: Vec::new(),
            outputs: Vec::new(),
        };

        for i in 0..NODE_COUNT {
            let row = i / COLS;
            let col = i % COLS;
            if row + 1 < ROWS {
                engine.nodes[i].wire(Port::Down, NodeId(i + COLS));
            }
            if row > 0 {
                engine.nodes[i].wire(Port::Up, NodeId(i - COLS));
            }
            if col + 1 < COLS {
                engine.nodes[i].wire(Port::Right, NodeId(i + 1));
            }
            if col > 0 {
                engine.nodes[i].wire(Port::Left, NodeId(i - 1));
            }
        }

        let compute = engine.load_instructions(code)?;
        let (inputs, outputs) = engine.init_streams(streams)?;

        engine.active = inputs.into_iter().chain(compute).chain(outputs).collect();
        debug!(
            "engine built for {:?}: {} active nodes, {} output buffers",
            code.title,
            engine.active.len(),
            engine.outputs.len()
        );
        Ok(engine)
    }

    /// Step every active node once, in order.
    ///
    /// Returns `true` when every active node ended the tick blocked:
    /// global quiescence, meaning either completion or deadlock. The
    /// caller tells them apart by inspecting the output buffers.
    pub fn tick(&mut self) -> Result<bool> {
        let mut all_blocked = true;
        for i in 0..self.active.len() {
            let id = self.active[i];
            self.step_node(id)?;
            all_blocked &= self.nodes[id.0].is_blocked;
        }
        Ok(all_blocked)
    }

    /// Output buffers, in output-stream declaration order.
    pub fn outputs(&self) -> &[OutputBuffer] {
        &self.outputs
    }

    /// Mutable output buffers (e.g. to clear between runs).
    pub fn outputs_mut(&mut self) -> &mut [OutputBuffer] {
        &mut self.outputs
    }

    /// All nodes: the compute grid first, then ephemerals. For telemetry
    /// and inspection; execution state is owned by the engine.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Compile each node's program; returns the ids of nodes that ended up
    /// with instructions, in row-major order.
    fn load_instructions(&mut self, code: &Code) -> Result<Vec<NodeId>> {
        if code.nodes.len() != NODE_COUNT {
            return Err(GridasmError::NodeCount {
                expected: NODE_COUNT,
                actual: code.nodes.len(),
            });
        }

        let mut compute = Vec::new();
        for (i, lines) in code.nodes.iter().enumerate() {
            let formatted: Vec<String> = lines
                .iter()
                .map(|line| line.trim().to_uppercase())
                .filter(|line| !line.is_empty())
                .collect();

            let instructions = assembler::compile(&formatted)?;
            if !instructions.is_empty() {
                compute.push(NodeId(i));
            }
            self.nodes[i].instructions = instructions;
        }
        Ok(compute)
    }

    /// Create the ephemeral I/O nodes, returning (inputs, outputs) in
    /// stream-declaration order.
    fn init_streams(&mut self, streams: &[Stream]) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for stream in streams {
            if stream.position >= IO_POSITIONS {
                return Err(GridasmError::StreamPosition(stream.position));
            }
            match stream.kind {
                StreamKind::Input => inputs.push(self.create_input_node(stream)),
                StreamKind::Output => outputs.push(self.create_output_node(stream)),
            }
        }
        Ok((inputs, outputs))
    }

    /// Input node above the top row: one `MOV value, DOWN` per seed value,
    /// then a `JRO 0` self-loop that parks the node once drained.
    fn create_input_node(&mut self, stream: &Stream) -> NodeId {
        let id = NodeId(self.nodes.len());
        let below = NodeId(stream.position as usize);

        let mut node = Node::new(stream.position);
        node.wire(Port::Down, below);
        for &value in &stream.values {
            node.instructions.push(Instruction::Mov {
                src: Operand::Immediate(value),
                dst: Port::Down,
            });
        }
        node.instructions.push(Instruction::Jro(0));

        self.nodes.push(node);
        self.nodes[below.0].wire(Port::Up, id);
        id
    }

    /// Output node below the bottom row: pull from UP into ACC, then OUT
    /// into this stream's buffer.
    fn create_output_node(&mut self, stream: &Stream) -> NodeId {
        let id = NodeId(self.nodes.len());
        let above = NodeId(stream.position as usize + NODE_COUNT - COLS);

        let mut node = Node::new(stream.position + OUTPUT_OFFSET);
        node.wire(Port::Up, above);
        node.instructions.push(Instruction::Mov {
            src: Operand::Port(Port::Up),
            dst: Port::Acc,
        });
        node.instructions.push(Instruction::Out);
        node.output = Some(self.outputs.len());
        self.outputs.push(OutputBuffer::new(stream.position));

        self.nodes.push(node);
        self.nodes[above.0].wire(Port::Down, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_with(programs: &[(usize, &[&str])]) -> Code {
        let mut code = Code::empty("TEST");
        for &(node, lines) in programs {
            code.nodes[node] = lines.iter().map(|s| s.to_string()).collect();
        }
        code
    }

    fn input(position: u8, values: &[i16]) -> Stream {
        Stream::new(StreamKind::Input, "IN.TEST", position, values.to_vec())
    }

    fn output(position: u8, values: &[i16]) -> Stream {
        Stream::new(StreamKind::Output, "OUT.TEST", position, values.to_vec())
    }

    #[test]
    fn test_construction_wires_grid_and_streams() {
        let code = code_with(&[(0, &["MOV UP DOWN"])]);
        let streams = [input(0, &[1]), output(0, &[1])];

        let engine = Engine::new(&streams, &code).unwrap();
        assert_eq!(engine.nodes().len(), NODE_COUNT + 2);
        assert_eq!(engine.outputs().len(), 1);
        assert_eq!(engine.outputs()[0].position(), 0);

        // compute nodes are numbered from 4, ephemerals by position
        assert_eq!(engine.nodes()[0].index, 4);
        assert_eq!(engine.nodes()[11].index, 15);
        assert_eq!(engine.nodes()[12].index, 0);
        assert_eq!(engine.nodes()[13].index, 16);
    }

    #[test]
    fn test_wrong_node_count_fails() {
        let code = Code {
            title: "SHORT".into(),
            nodes: vec![vec!["MOV UP DOWN".into()]],
        };

        let err = Engine::new(&[], &code).unwrap_err();
        assert!(matches!(
            err,
            GridasmError::NodeCount {
                expected: NODE_COUNT,
                actual: 1,
            }
        ));
    }

    #[test]
    fn test_invalid_mnemonic_fails_construction() {
        let code = code_with(&[(3, &["FOO"])]);
        let err = Engine::new(&[], &code).unwrap_err();
        assert!(err.to_string().contains("invalid instruction"));
    }

    #[test]
    fn test_stream_position_out_of_range_fails() {
        let err = Engine::new(&[input(4, &[1])], &Code::empty("TEST")).unwrap_err();
        assert!(matches!(err, GridasmError::StreamPosition(4)));
    }

    #[test]
    fn test_pass_through_column() {
        let code = code_with(&[
            (0, &["MOV UP DOWN"]),
            (4, &["MOV UP DOWN"]),
            (8, &["MOV UP DOWN"]),
        ]);
        let expected = output(0, &[42]);
        let streams = [input(0, &[42]), expected.clone()];

        let mut engine = Engine::new(&streams, &code).unwrap();
        for _ in 0..3 {
            engine.tick().unwrap();
        }

        assert!(engine.outputs()[0].matches(&expected));
    }

    #[test]
    fn test_quiescence_without_input() {
        let code = code_with(&[(0, &["MOV UP DOWN"])]);
        let mut engine = Engine::new(&[], &code).unwrap();

        assert!(engine.tick().unwrap());
    }

    #[test]
    fn test_tick_is_idempotent_at_quiescence() {
        let code = code_with(&[
            (0, &["MOV UP DOWN"]),
            (4, &["MOV UP DOWN"]),
            (8, &["MOV UP DOWN"]),
        ]);
        let streams = [input(0, &[42]), output(0, &[42])];

        let mut engine = Engine::new(&streams, &code).unwrap();
        let mut blocked = false;
        for _ in 0..3 {
            blocked = engine.tick().unwrap();
        }
        assert!(blocked);

        let pcs: Vec<usize> = engine.nodes().iter().map(|n| n.pc).collect();
        assert!(engine.tick().unwrap());
        assert_eq!(
            pcs,
            engine.nodes().iter().map(|n| n.pc).collect::<Vec<_>>()
        );
        assert_eq!(engine.outputs()[0].values(), &[42]);
    }

    #[test]
    fn test_acc_clamps_in_program() {
        let code = code_with(&[(0, &["MOV 999 ACC", "ADD 5"])]);
        let mut engine = Engine::new(&[], &code).unwrap();

        engine.tick().unwrap();
        engine.tick().unwrap();
        assert_eq!(engine.nodes()[0].acc, 999);
    }

    #[test]
    fn test_sav_swp_round_trip() {
        let code = code_with(&[(0, &["SAV", "SWP"])]);
        let mut engine = Engine::new(&[], &code).unwrap();
        engine.nodes[0].acc = 9;

        engine.tick().unwrap();
        assert_eq!(engine.nodes()[0].bak, 9);

        engine.tick().unwrap();
        assert_eq!(engine.nodes()[0].acc, 9);
        assert_eq!(engine.nodes()[0].bak, 9);
    }

    #[test]
    fn test_jump_skips_over_neg() {
        let code = code_with(&[(0, &["JMP END", "NEG", "END: NOP"])]);
        let mut engine = Engine::new(&[], &code).unwrap();
        engine.nodes[0].acc = 5;

        engine.tick().unwrap();
        engine.tick().unwrap();
        assert_eq!(engine.nodes()[0].pc, 2);
        assert_eq!(engine.nodes()[0].acc, 5);
    }

    #[test]
    fn test_any_source_records_last() {
        let code = code_with(&[(0, &["MOV ANY ACC", "MOV LAST ACC"])]);
        let streams = [input(0, &[7, 9])];
        let mut engine = Engine::new(&streams, &code).unwrap();

        engine.tick().unwrap();
        assert_eq!(engine.nodes()[0].acc, 7);
        assert_eq!(engine.nodes()[0].last, Some(NodeId(NODE_COUNT)));

        engine.tick().unwrap();
        assert_eq!(engine.nodes()[0].acc, 9);
    }

    #[test]
    fn test_any_destination_finds_willing_reader() {
        let code = code_with(&[(0, &["MOV 5 ANY"]), (1, &["MOV LEFT ACC"])]);
        let mut engine = Engine::new(&[], &code).unwrap();

        engine.tick().unwrap();
        assert_eq!(engine.nodes()[1].acc, 5);
        assert_eq!(engine.nodes()[0].last, Some(NodeId(1)));
    }

    #[test]
    fn test_outputs_in_declaration_order() {
        let streams = [output(1, &[]), output(0, &[])];
        let engine = Engine::new(&streams, &Code::empty("TEST")).unwrap();

        assert_eq!(engine.outputs()[0].position(), 1);
        assert_eq!(engine.outputs()[1].position(), 0);
    }

    #[test]
    fn test_two_inputs_feed_independent_columns() {
        let code = code_with(&[
            (0, &["MOV UP DOWN"]),
            (1, &["MOV UP DOWN"]),
            (4, &["MOV UP DOWN"]),
            (5, &["MOV UP DOWN"]),
            (8, &["MOV UP DOWN"]),
            (9, &["MOV UP DOWN"]),
        ]);
        let left = output(0, &[3]);
        let right = output(1, &[8]);
        let streams = [
            input(0, &[3]),
            input(1, &[8]),
            left.clone(),
            right.clone(),
        ];

        let mut engine = Engine::new(&streams, &code).unwrap();
        for _ in 0..3 {
            engine.tick().unwrap();
        }

        assert!(engine.outputs()[0].matches(&left));
        assert!(engine.outputs()[1].matches(&right));
    }
}
