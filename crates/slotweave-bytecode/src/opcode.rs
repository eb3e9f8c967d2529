//! Instruction opcodes
//!
//! This module defines the instruction set understood by the module codec.
//! It is deliberately small: method bodies only need enough instructions to
//! be carried through a weave pass intact, and the weaver itself only ever
//! emits argument loads and field loads/stores.

/// Opcode enumeration
///
/// All opcodes are single-byte instructions. Some opcodes take additional operands
/// that follow the opcode byte in the encoded stream.
///
/// Opcodes are organized into categories:
/// - 0x00-0x0F: Stack manipulation & constants
/// - 0x10-0x1F: Arguments & local variables
/// - 0x90-0x9F: Control flow
/// - 0xA0-0xAF: Calls & returns
/// - 0xB0-0xBF: Field access
/// - 0xE0-0xEF: Error handling
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack Manipulation & Constants (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// Pop top value from stack
    Pop = 0x01,
    /// Duplicate top stack value
    Dup = 0x02,
    /// Push null reference
    LdNull = 0x04,
    /// Push 32-bit integer constant (operand: i32)
    LdcI4 = 0x07,
    /// Push string literal (operand: length-prefixed UTF-8)
    LdStr = 0x09,

    // ===== Arguments & Locals (0x10-0x1F) =====
    /// Load argument onto stack (operand: u16 index, 0 is the receiver on instance methods)
    LdArg = 0x10,
    /// Load local variable onto stack (operand: u16 index)
    LdLoc = 0x11,
    /// Store top of stack to local variable (operand: u16 index)
    StLoc = 0x12,

    // ===== Control Flow (0x90-0x9F) =====
    /// Unconditional branch (operand: u32 target instruction index)
    Br = 0x90,
    /// Branch if true (operand: u32 target instruction index)
    BrTrue = 0x91,
    /// Branch if false (operand: u32 target instruction index)
    BrFalse = 0x92,

    // ===== Calls (0xA0-0xAF) =====
    /// Call a method (operand: method reference)
    Call = 0xA0,
    /// Return from the current method
    Ret = 0xA8,

    // ===== Field Access (0xB0-0xBF) =====
    /// Load instance field: pop object, push field value (operand: field reference)
    LdFld = 0xB0,
    /// Store instance field: pop value, pop object (operand: field reference)
    StFld = 0xB1,
    /// Load static field (operand: field reference)
    LdSFld = 0xB2,
    /// Store static field: pop value (operand: field reference)
    StSFld = 0xB3,

    // ===== Error Handling (0xE0-0xEF) =====
    /// Throw the exception on top of the stack
    Throw = 0xE0,
}

impl Opcode {
    /// Convert a byte to an opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Pop),
            0x02 => Some(Self::Dup),
            0x04 => Some(Self::LdNull),
            0x07 => Some(Self::LdcI4),
            0x09 => Some(Self::LdStr),

            0x10 => Some(Self::LdArg),
            0x11 => Some(Self::LdLoc),
            0x12 => Some(Self::StLoc),

            0x90 => Some(Self::Br),
            0x91 => Some(Self::BrTrue),
            0x92 => Some(Self::BrFalse),

            0xA0 => Some(Self::Call),
            0xA8 => Some(Self::Ret),

            0xB0 => Some(Self::LdFld),
            0xB1 => Some(Self::StFld),
            0xB2 => Some(Self::LdSFld),
            0xB3 => Some(Self::StSFld),

            0xE0 => Some(Self::Throw),

            _ => None,
        }
    }

    /// Convert opcode to byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the human-readable name of the opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Pop => "pop",
            Self::Dup => "dup",
            Self::LdNull => "ldnull",
            Self::LdcI4 => "ldc.i4",
            Self::LdStr => "ldstr",
            Self::LdArg => "ldarg",
            Self::LdLoc => "ldloc",
            Self::StLoc => "stloc",
            Self::Br => "br",
            Self::BrTrue => "brtrue",
            Self::BrFalse => "brfalse",
            Self::Call => "call",
            Self::Ret => "ret",
            Self::LdFld => "ldfld",
            Self::StFld => "stfld",
            Self::LdSFld => "ldsfld",
            Self::StSFld => "stsfld",
            Self::Throw => "throw",
        }
    }

    /// Check if this opcode is a branch
    pub fn is_branch(self) -> bool {
        matches!(self, Self::Br | Self::BrTrue | Self::BrFalse)
    }

    /// Check if this opcode accesses a field
    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            Self::LdFld | Self::StFld | Self::LdSFld | Self::StSFld
        )
    }

    /// Check if control can never fall through to the next instruction
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Br | Self::Ret | Self::Throw)
    }
}
