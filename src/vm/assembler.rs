//! Assembler - lowers per-node source lines into executable instructions.
//!
//! Compilation is two passes over one node's lines:
//!
//! 1. **Label extraction.** A line containing `:` registers its prefix as a
//!    label for that line index (first declaration wins) and keeps the
//!    suffix as the instruction; an empty suffix becomes `NOP`.
//! 2. **Parse.** Each line is dispatched on its three-letter mnemonic and
//!    lowered to an [`Instruction`], with jump labels resolved to absolute
//!    instruction indices.
//!
//! Callers are expected to hand in uppercased, trimmed, non-empty lines
//! (the engine normalizes before compiling); mnemonics and port names are
//! still matched case-insensitively.

use std::collections::HashMap;

use thiserror::Error;

use super::instruction::{Instruction, Operand};

/// Compile failure for a single node program, carrying the 1-based line
/// number within that program.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl CompileError {
    fn at(index: usize, message: impl Into<String>) -> Self {
        Self {
            line: index + 1,
            message: message.into(),
        }
    }
}

/// Compile one node's source lines into a flat instruction sequence.
///
/// Labels are not retained: jumps come out carrying the absolute index of
/// the line their label named.
pub fn compile<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Instruction>, CompileError> {
    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut stripped: Vec<String> = Vec::with_capacity(lines.len());

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.as_ref();
        if let Some(pos) = line.find(':') {
            let label = line[..pos].trim();
            if label.is_empty() {
                return Err(CompileError::at(i, "empty label"));
            }
            labels.entry(label.to_string()).or_insert(i);

            let rest = line[pos + 1..].trim();
            stripped.push(if rest.is_empty() { "NOP" } else { rest }.to_string());
        } else {
            stripped.push(line.to_string());
        }
    }

    stripped
        .iter()
        .enumerate()
        .map(|(i, line)| parse_line(i, line, &labels))
        .collect()
}

/// Parse a single label-free line.
fn parse_line(
    index: usize,
    line: &str,
    labels: &HashMap<String, usize>,
) -> Result<Instruction, CompileError> {
    let Some(mnemonic) = line.get(..3) else {
        return Err(CompileError::at(index, format!("invalid instruction: {line:?}")));
    };
    let mnemonic = mnemonic.to_uppercase();

    let args = line.get(3..).unwrap_or("");
    if !args.is_empty() && !args.starts_with([' ', '\t']) {
        return Err(CompileError::at(index, format!("invalid instruction: {line:?}")));
    }
    let args = args.trim();

    match mnemonic.as_str() {
        "MOV" => parse_mov(index, args),
        "ADD" => Ok(Instruction::Add(parse_operand(index, args)?)),
        "SUB" => Ok(Instruction::Sub(parse_operand(index, args)?)),
        "JRO" => {
            let offset = args
                .parse::<i16>()
                .map_err(|_| CompileError::at(index, format!("invalid offset: {args:?}")))?;
            Ok(Instruction::Jro(offset))
        }
        "JMP" | "JEZ" | "JNZ" | "JLZ" | "JGZ" => {
            let target = labels
                .get(args)
                .map(|&pos| pos as i16)
                .ok_or_else(|| CompileError::at(index, format!("label not found: {args}")))?;
            Ok(match mnemonic.as_str() {
                "JMP" => Instruction::Jmp(target),
                "JEZ" => Instruction::Jez(target),
                "JNZ" => Instruction::Jnz(target),
                "JLZ" => Instruction::Jlz(target),
                _ => Instruction::Jgz(target),
            })
        }
        "SAV" | "SWP" | "NOP" | "NEG" | "OUT" => {
            if !args.is_empty() {
                return Err(CompileError::at(
                    index,
                    format!("{mnemonic} takes no operand"),
                ));
            }
            Ok(match mnemonic.as_str() {
                "SAV" => Instruction::Sav,
                "SWP" => Instruction::Swp,
                "NOP" => Instruction::Nop,
                "NEG" => Instruction::Neg,
                _ => Instruction::Out,
            })
        }
        _ => Err(CompileError::at(
            index,
            format!("invalid instruction: {mnemonic}"),
        )),
    }
}

fn parse_mov(index: usize, args: &str) -> Result<Instruction, CompileError> {
    let tokens: Vec<&str> = args
        .split([' ', '\t', ','])
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() != 2 {
        return Err(CompileError::at(
            index,
            format!("MOV expects 2 operands, got {}", tokens.len()),
        ));
    }

    let src = parse_operand(index, tokens[0])?;
    match parse_operand(index, tokens[1])? {
        Operand::Port(dst) => Ok(Instruction::Mov { src, dst }),
        Operand::Immediate(_) => Err(CompileError::at(index, "MOV destination must be a port")),
    }
}

fn parse_operand(index: usize, token: &str) -> Result<Operand, CompileError> {
    if token.is_empty() {
        return Err(CompileError::at(index, "missing operand"));
    }
    Operand::parse(token)
        .ok_or_else(|| CompileError::at(index, format!("invalid operand: {token:?}")))
}
