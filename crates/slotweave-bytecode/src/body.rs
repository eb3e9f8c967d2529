//! Method bodies and in-place instruction editing
//!
//! A body is an ordered list of [`Instruction`]s. Branch targets and
//! exception-handler bounds are instruction indices, so any edit that moves
//! instructions must move those indices along with them. [`BodyEditor`] is
//! the only mutation path that keeps them consistent.

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::opcode::Opcode;
use crate::types::{FieldRef, MethodRef, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single instruction with its operand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "lowercase")]
pub enum Instruction {
    /// No operation
    Nop,
    /// Pop top value
    Pop,
    /// Duplicate top value
    Dup,
    /// Push null
    LdNull,
    /// Push integer constant
    LdcI4(i32),
    /// Push string literal
    LdStr(String),
    /// Load argument (0 is the receiver on instance methods)
    LdArg(u16),
    /// Load local
    LdLoc(u16),
    /// Store local
    StLoc(u16),
    /// Unconditional branch to instruction index
    Br(u32),
    /// Branch to instruction index if true
    BrTrue(u32),
    /// Branch to instruction index if false
    BrFalse(u32),
    /// Call a method
    Call(MethodRef),
    /// Return
    Ret,
    /// Load instance field
    LdFld(FieldRef),
    /// Store instance field
    StFld(FieldRef),
    /// Load static field
    LdSFld(FieldRef),
    /// Store static field
    StSFld(FieldRef),
    /// Throw
    Throw,
}

impl Instruction {
    /// Opcode of this instruction
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Nop => Opcode::Nop,
            Self::Pop => Opcode::Pop,
            Self::Dup => Opcode::Dup,
            Self::LdNull => Opcode::LdNull,
            Self::LdcI4(_) => Opcode::LdcI4,
            Self::LdStr(_) => Opcode::LdStr,
            Self::LdArg(_) => Opcode::LdArg,
            Self::LdLoc(_) => Opcode::LdLoc,
            Self::StLoc(_) => Opcode::StLoc,
            Self::Br(_) => Opcode::Br,
            Self::BrTrue(_) => Opcode::BrTrue,
            Self::BrFalse(_) => Opcode::BrFalse,
            Self::Call(_) => Opcode::Call,
            Self::Ret => Opcode::Ret,
            Self::LdFld(_) => Opcode::LdFld,
            Self::StFld(_) => Opcode::StFld,
            Self::LdSFld(_) => Opcode::LdSFld,
            Self::StSFld(_) => Opcode::StSFld,
            Self::Throw => Opcode::Throw,
        }
    }

    /// Branch target, if this is a branch
    pub fn branch_target(&self) -> Option<u32> {
        match self {
            Self::Br(t) | Self::BrTrue(t) | Self::BrFalse(t) => Some(*t),
            _ => None,
        }
    }

    fn branch_target_mut(&mut self) -> Option<&mut u32> {
        match self {
            Self::Br(t) | Self::BrTrue(t) | Self::BrFalse(t) => Some(t),
            _ => None,
        }
    }

    /// Field operand, if this instruction accesses a field
    pub fn field(&self) -> Option<&FieldRef> {
        match self {
            Self::LdFld(f) | Self::StFld(f) | Self::LdSFld(f) | Self::StSFld(f) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_opcode(self.opcode());
        match self {
            Self::LdcI4(v) => writer.emit_i32(*v),
            Self::LdStr(s) => writer.emit_string(s),
            Self::LdArg(i) | Self::LdLoc(i) | Self::StLoc(i) => writer.emit_u16(*i),
            Self::Br(t) | Self::BrTrue(t) | Self::BrFalse(t) => writer.emit_u32(*t),
            Self::Call(m) => m.encode(writer),
            Self::LdFld(f) | Self::StFld(f) | Self::LdSFld(f) | Self::StSFld(f) => f.encode(writer),
            Self::Nop | Self::Pop | Self::Dup | Self::LdNull | Self::Ret | Self::Throw => {}
        }
    }

    pub(crate) fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let instr = match reader.read_opcode()? {
            Opcode::Nop => Self::Nop,
            Opcode::Pop => Self::Pop,
            Opcode::Dup => Self::Dup,
            Opcode::LdNull => Self::LdNull,
            Opcode::LdcI4 => Self::LdcI4(reader.read_i32()?),
            Opcode::LdStr => Self::LdStr(reader.read_string()?),
            Opcode::LdArg => Self::LdArg(reader.read_u16()?),
            Opcode::LdLoc => Self::LdLoc(reader.read_u16()?),
            Opcode::StLoc => Self::StLoc(reader.read_u16()?),
            Opcode::Br => Self::Br(reader.read_u32()?),
            Opcode::BrTrue => Self::BrTrue(reader.read_u32()?),
            Opcode::BrFalse => Self::BrFalse(reader.read_u32()?),
            Opcode::Call => Self::Call(MethodRef::decode(reader)?),
            Opcode::Ret => Self::Ret,
            Opcode::LdFld => Self::LdFld(FieldRef::decode(reader)?),
            Opcode::StFld => Self::StFld(FieldRef::decode(reader)?),
            Opcode::LdSFld => Self::LdSFld(FieldRef::decode(reader)?),
            Opcode::StSFld => Self::StSFld(FieldRef::decode(reader)?),
            Opcode::Throw => Self::Throw,
        };
        Ok(instr)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.opcode().name();
        match self {
            Self::LdcI4(v) => write!(f, "{} {}", name, v),
            Self::LdStr(s) => write!(f, "{} {:?}", name, s),
            Self::LdArg(i) | Self::LdLoc(i) | Self::StLoc(i) => write!(f, "{} {}", name, i),
            Self::Br(t) | Self::BrTrue(t) | Self::BrFalse(t) => write!(f, "{} IL_{:04}", name, t),
            Self::Call(m) => write!(f, "{} {}", name, m),
            Self::LdFld(fr) | Self::StFld(fr) | Self::LdSFld(fr) | Self::StSFld(fr) => {
                write!(f, "{} {}", name, fr)
            }
            _ => f.write_str(name),
        }
    }
}

/// Protected region and its handler, as half-open instruction index ranges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionHandler {
    /// First protected instruction
    pub try_start: u32,
    /// One past the last protected instruction
    pub try_end: u32,
    /// First handler instruction
    pub handler_start: u32,
    /// One past the last handler instruction
    pub handler_end: u32,
    /// Caught exception type; `None` for a finally block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch_type: Option<TypeRef>,
}

impl ExceptionHandler {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.try_start);
        writer.emit_u32(self.try_end);
        writer.emit_u32(self.handler_start);
        writer.emit_u32(self.handler_end);
        match &self.catch_type {
            Some(ty) => {
                writer.emit_u8(1);
                ty.encode(writer);
            }
            None => writer.emit_u8(0),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let try_start = reader.read_u32()?;
        let try_end = reader.read_u32()?;
        let handler_start = reader.read_u32()?;
        let handler_end = reader.read_u32()?;
        let catch_type = if reader.read_bool()? {
            Some(TypeRef::decode(reader)?)
        } else {
            None
        };
        Ok(Self {
            try_start,
            try_end,
            handler_start,
            handler_end,
            catch_type,
        })
    }

    fn bounds_mut(&mut self) -> [&mut u32; 4] {
        [
            &mut self.try_start,
            &mut self.try_end,
            &mut self.handler_start,
            &mut self.handler_end,
        ]
    }
}

/// Method body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBody {
    /// Maximum evaluation stack depth
    pub max_stack: u16,
    /// Local variable types
    #[serde(default)]
    pub locals: Vec<TypeRef>,
    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
    /// Exception handlers
    #[serde(default)]
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Create a body from instructions with a default stack size
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            max_stack: 8,
            locals: Vec::new(),
            instructions,
            exception_handlers: Vec::new(),
        }
    }

    /// Length of the leading run of slot transfers: `ldarg; stsfld` stores
    /// and `ldarg 0; ldsfld; stfld` reads.
    pub fn injected_prefix_len(&self) -> usize {
        let mut len = 0;
        loop {
            match self.instructions.get(len..) {
                Some([Instruction::LdArg(0), Instruction::LdSFld(_), Instruction::StFld(_), ..]) => {
                    len += 3
                }
                Some([Instruction::LdArg(_), Instruction::StSFld(_), ..]) => len += 2,
                _ => return len,
            }
        }
    }

    /// Whether `sequence` already occurs inside the leading slot transfers
    pub fn has_injected(&self, sequence: &[Instruction]) -> bool {
        if sequence.is_empty() {
            return true;
        }
        self.instructions[..self.injected_prefix_len()]
            .windows(sequence.len())
            .any(|window| window == sequence)
    }

    /// Open an editor over this body
    pub fn editor(&mut self) -> BodyEditor<'_> {
        BodyEditor { body: self }
    }

    pub(crate) fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u16(self.max_stack);

        writer.emit_u32(self.locals.len() as u32);
        for local in &self.locals {
            local.encode(writer);
        }

        writer.emit_u32(self.instructions.len() as u32);
        for instr in &self.instructions {
            instr.encode(writer);
        }

        writer.emit_u32(self.exception_handlers.len() as u32);
        for handler in &self.exception_handlers {
            handler.encode(writer);
        }
    }

    pub(crate) fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let max_stack = reader.read_u16()?;

        let local_count = reader.read_u32()? as usize;
        let mut locals = Vec::with_capacity(reader.capacity_for(local_count));
        for _ in 0..local_count {
            locals.push(TypeRef::decode(reader)?);
        }

        let instr_count = reader.read_u32()? as usize;
        let mut instructions = Vec::with_capacity(reader.capacity_for(instr_count));
        for _ in 0..instr_count {
            instructions.push(Instruction::decode(reader)?);
        }

        let handler_count = reader.read_u32()? as usize;
        let mut exception_handlers = Vec::with_capacity(reader.capacity_for(handler_count));
        for _ in 0..handler_count {
            exception_handlers.push(ExceptionHandler::decode(reader)?);
        }

        Ok(Self {
            max_stack,
            locals,
            instructions,
            exception_handlers,
        })
    }
}

/// Mutable view over a method body that keeps branch targets and
/// exception-handler bounds attached to the instructions they name.
///
/// Every stored index at or after an insertion point moves by the number of
/// inserted instructions. Inserting before instruction 0 therefore leaves a
/// branch to the original first instruction pointing at it (not at the new
/// code), and a protected region starting at 0 does not cover the new code.
pub struct BodyEditor<'a> {
    body: &'a mut MethodBody,
}

impl<'a> BodyEditor<'a> {
    /// Number of instructions in the body
    pub fn len(&self) -> usize {
        self.body.instructions.len()
    }

    /// Whether the body has no instructions
    pub fn is_empty(&self) -> bool {
        self.body.instructions.is_empty()
    }

    /// Insert `instrs` so that the first of them lands at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_before(&mut self, index: usize, instrs: Vec<Instruction>) {
        assert!(
            index <= self.body.instructions.len(),
            "insertion index {} out of bounds (len {})",
            index,
            self.body.instructions.len()
        );
        let count = instrs.len() as u32;
        if count == 0 {
            return;
        }
        let at = index as u32;

        for instr in self.body.instructions.iter_mut() {
            if let Some(target) = instr.branch_target_mut() {
                if *target >= at {
                    *target += count;
                }
            }
        }
        for handler in self.body.exception_handlers.iter_mut() {
            for bound in handler.bounds_mut() {
                if *bound >= at {
                    *bound += count;
                }
            }
        }

        // Inserted code never branches, so its own operands need no fix-up.
        self.body.instructions.splice(index..index, instrs);
    }

    /// Insert `instrs` before the first instruction
    pub fn prepend(&mut self, instrs: Vec<Instruction>) {
        self.insert_before(0, instrs);
    }

    /// Append one instruction at the end
    pub fn append(&mut self, instr: Instruction) {
        let len = self.body.instructions.len();
        self.insert_before(len, vec![instr]);
    }
}

/// Builder for the restricted instruction subset the weaver emits
#[derive(Debug, Default)]
pub struct InstructionBuilder {
    instrs: Vec<Instruction>,
}

impl InstructionBuilder {
    /// Start an empty sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// `ldarg index`
    pub fn load_arg(mut self, index: u16) -> Self {
        self.instrs.push(Instruction::LdArg(index));
        self
    }

    /// `ldarg 0` on an instance method
    pub fn load_this(self) -> Self {
        self.load_arg(0)
    }

    /// `ldsfld field`
    pub fn load_static(mut self, field: FieldRef) -> Self {
        self.instrs.push(Instruction::LdSFld(field));
        self
    }

    /// `stsfld field`
    pub fn store_static(mut self, field: FieldRef) -> Self {
        self.instrs.push(Instruction::StSFld(field));
        self
    }

    /// `stfld field`
    pub fn store_field(mut self, field: FieldRef) -> Self {
        self.instrs.push(Instruction::StFld(field));
        self
    }

    /// Number of instructions built so far
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Whether nothing has been built
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Finish the sequence
    pub fn build(self) -> Vec<Instruction> {
        self.instrs
    }
}
