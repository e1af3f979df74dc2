//! Register Machine Interpreter: a standalone evaluator for the AQA-style
//! assembly dialect. Pure function from (program text, seeded memory) to
//! (updated memory, terminal status) — no I/O of its own.

use std::collections::HashMap;
use std::fmt;

pub const NUM_REGISTERS: usize = 13;
pub const NUM_MEM: usize = 1000;

/// Why execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Halt,
}

/// Execution errors, each carrying the 1-indexed source line it occurred at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    /// A conditional branch was reached with no preceding `CMP`.
    CmpNotSet { line: usize },
    /// Unknown opcode, out-of-range register/address, malformed operand, or
    /// unknown label.
    MalformedProgram { line: usize },
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterError::CmpNotSet { line } => {
                write!(f, "CMP not set before branch at line {line}")
            }
            InterpreterError::MalformedProgram { line } => {
                write!(f, "malformed program at line {line}")
            }
        }
    }
}

impl std::error::Error for InterpreterError {}

type InterpResult<T> = Result<T, InterpreterError>;

/// The (left, right) pair set by `CMP` and consumed by the next conditional
/// branch; `None` until the first `CMP`.
#[derive(Debug, Clone, Copy, Default)]
struct Latch(Option<(u8, u8)>);

impl Latch {
    fn set(&mut self, left: u8, right: u8) {
        self.0 = Some((left, right));
    }

    fn require(&self, line: usize) -> InterpResult<(u8, u8)> {
        self.0.ok_or(InterpreterError::CmpNotSet { line })
    }
}

/// State of the register machine: 13 registers and 1000 memory cells, each
/// an unsigned byte wrapping mod 256 after every arithmetic update.
#[derive(Debug, Clone)]
pub struct Machine {
    pub registers: [u8; NUM_REGISTERS],
    pub memory: [u8; NUM_MEM],
    latch: Latch,
    line: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            registers: [0; NUM_REGISTERS],
            memory: [0; NUM_MEM],
            latch: Latch::default(),
            line: 0,
        }
    }
}

/// A decoded source line: a label definition, an instruction, or blank.
enum Line<'a> {
    Label,
    Blank,
    Instruction { opcode: &'a str, args: Option<&'a str> },
}

fn classify_line(raw: &str) -> Line<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if trimmed.ends_with(':') {
        return Line::Label;
    }
    match trimmed.split_once(' ') {
        Some((opcode, args)) => Line::Instruction {
            opcode,
            args: Some(args),
        },
        None => Line::Instruction {
            opcode: trimmed,
            args: None,
        },
    }
}

/// An operand: a register or an immediate.
enum Operand {
    Register(usize),
    Immediate(u8),
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_register(token: &str, line: usize) -> InterpResult<usize> {
        let n: usize = token
            .strip_prefix('R')
            .and_then(|rest| rest.parse().ok())
            .ok_or(InterpreterError::MalformedProgram { line })?;
        if n >= NUM_REGISTERS {
            return Err(InterpreterError::MalformedProgram { line });
        }
        Ok(n)
    }

    fn parse_address(token: &str, line: usize) -> InterpResult<usize> {
        let n: usize = token
            .parse()
            .map_err(|_| InterpreterError::MalformedProgram { line })?;
        if n >= NUM_MEM {
            return Err(InterpreterError::MalformedProgram { line });
        }
        Ok(n)
    }

    fn parse_operand(token: &str, line: usize) -> InterpResult<Operand> {
        let mut chars = token.chars();
        match chars.next() {
            Some('R') => Ok(Operand::Register(Self::parse_register(token, line)?)),
            Some('#') => {
                let value: i64 = token[1..]
                    .parse()
                    .map_err(|_| InterpreterError::MalformedProgram { line })?;
                Ok(Operand::Immediate((value.rem_euclid(256)) as u8))
            }
            _ => Err(InterpreterError::MalformedProgram { line }),
        }
    }

    fn operand_value(&self, operand: &Operand) -> u8 {
        match operand {
            Operand::Register(r) => self.registers[*r],
            Operand::Immediate(v) => *v,
        }
    }

    fn split_args(args: &str, expected: usize, line: usize) -> InterpResult<Vec<&str>> {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != expected {
            return Err(InterpreterError::MalformedProgram { line });
        }
        Ok(parts)
    }

    /// Runs `code` to completion, mutating `self.memory`/`self.registers` in
    /// place. Returns the reason execution stopped, or the line an error
    /// occurred at.
    pub fn run(&mut self, code: &str) -> InterpResult<StopReason> {
        let lines: Vec<&str> = code.lines().map(str::trim).collect();
        if lines.is_empty() {
            return Err(InterpreterError::MalformedProgram { line: 1 });
        }

        let mut labels: HashMap<&str, usize> = HashMap::new();
        for (idx, raw) in lines.iter().enumerate() {
            if let Line::Label = classify_line(raw) {
                labels.insert(&raw.trim()[..raw.trim().len() - 1], idx + 1);
            }
        }

        self.line = 0;
        loop {
            if self.line >= lines.len() {
                return Err(InterpreterError::MalformedProgram { line: lines.len() });
            }
            let line_no = self.line + 1;
            match classify_line(lines[self.line]) {
                Line::Blank | Line::Label => {
                    self.line += 1;
                    continue;
                }
                Line::Instruction { opcode, args } => {
                    if opcode == "HALT" {
                        return Ok(StopReason::Halt);
                    }
                    if let Some(jumped) =
                        self.try_branch(opcode, args, &labels, line_no)?
                    {
                        self.line = jumped;
                        continue;
                    }
                    self.execute(opcode, args, line_no)?;
                    self.line += 1;
                }
            }
        }
    }

    /// Handles `B`/`BEQ`/`BNE`/`BGT`/`BLT`. Returns `Some(target_line_idx)`
    /// if a branch was taken, `None` if `opcode` isn't a branch at all.
    fn try_branch(
        &self,
        opcode: &str,
        args: Option<&str>,
        labels: &HashMap<&str, usize>,
        line: usize,
    ) -> InterpResult<Option<usize>> {
        let taken = match opcode {
            "B" => true,
            "BEQ" => {
                let (l, r) = self.latch.require(line)?;
                l == r
            }
            "BNE" => {
                let (l, r) = self.latch.require(line)?;
                l != r
            }
            "BGT" => {
                let (l, r) = self.latch.require(line)?;
                l > r
            }
            "BLT" => {
                let (l, r) = self.latch.require(line)?;
                l < r
            }
            _ => return Ok(None),
        };
        if !taken {
            // Branch not taken: fall through like any other instruction.
            return Ok(Some(self.line + 1));
        }
        let label = args.ok_or(InterpreterError::MalformedProgram { line })?.trim();
        labels
            .get(label)
            .copied()
            .map(Some)
            .ok_or(InterpreterError::MalformedProgram { line })
    }

    fn execute(&mut self, opcode: &str, args: Option<&str>, line: usize) -> InterpResult<()> {
        let args = args.ok_or(InterpreterError::MalformedProgram { line })?;
        match opcode {
            "LDR" => {
                let parts = Self::split_args(args, 2, line)?;
                let rd = Self::parse_register(parts[0], line)?;
                let addr = Self::parse_address(parts[1], line)?;
                self.registers[rd] = self.memory[addr];
            }
            "STR" => {
                let parts = Self::split_args(args, 2, line)?;
                let rs = Self::parse_register(parts[0], line)?;
                let addr = Self::parse_address(parts[1], line)?;
                self.memory[addr] = self.registers[rs];
            }
            "ADD" => {
                let (rd, a, b) = self.binary_operands(args, line)?;
                self.registers[rd] = a.wrapping_add(b);
            }
            "SUB" => {
                let (rd, a, b) = self.binary_operands(args, line)?;
                self.registers[rd] = a.wrapping_sub(b);
            }
            "AND" => {
                let (rd, a, b) = self.binary_operands(args, line)?;
                self.registers[rd] = a & b;
            }
            "ORR" => {
                let (rd, a, b) = self.binary_operands(args, line)?;
                self.registers[rd] = a | b;
            }
            "EOR" => {
                let (rd, a, b) = self.binary_operands(args, line)?;
                self.registers[rd] = a ^ b;
            }
            "LSL" => {
                let (rd, a, b) = self.binary_operands(args, line)?;
                // `wrapping_shl` masks the shift amount mod 8, so a shift of
                // 8 would wrongly behave as a shift of 0. A shift of 8 or
                // more on an 8-bit value always empties it, same as Python's
                // `(a << b) % 256`.
                self.registers[rd] = if b >= 8 { 0 } else { a << b };
            }
            "LSR" => {
                let (rd, a, b) = self.binary_operands(args, line)?;
                self.registers[rd] = if b >= 8 { 0 } else { a >> b };
            }
            "MOV" => {
                let parts = Self::split_args(args, 2, line)?;
                let rd = Self::parse_register(parts[0], line)?;
                let op = Self::parse_operand(parts[1], line)?;
                self.registers[rd] = self.operand_value(&op);
            }
            "MVN" => {
                let parts = Self::split_args(args, 2, line)?;
                let rd = Self::parse_register(parts[0], line)?;
                let op = Self::parse_operand(parts[1], line)?;
                self.registers[rd] = !self.operand_value(&op);
            }
            "CMP" => {
                let parts = Self::split_args(args, 2, line)?;
                let rs = Self::parse_register(parts[0], line)?;
                let op = Self::parse_operand(parts[1], line)?;
                let left = self.registers[rs];
                let right = self.operand_value(&op);
                self.latch.set(left, right);
            }
            _ => return Err(InterpreterError::MalformedProgram { line }),
        }
        Ok(())
    }

    /// Parses `Rd, Rs, op` and returns `(rd_index, value_of(Rs), value_of(op))`.
    fn binary_operands(&self, args: &str, line: usize) -> InterpResult<(usize, u8, u8)> {
        let parts = Self::split_args(args, 3, line)?;
        let rd = Self::parse_register(parts[0], line)?;
        let rs = Self::parse_register(parts[1], line)?;
        let op = Self::parse_operand(parts[2], line)?;
        Ok((rd, self.registers[rs], self.operand_value(&op)))
    }
}
