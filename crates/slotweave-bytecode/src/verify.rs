//! Structural verification of method bodies
//!
//! Checks that every body is self-consistent: branch targets and handler
//! ranges are in bounds, argument and local indices exist, field operands
//! resolve, and control never falls off the end. There is no type checking.

use crate::body::{Instruction, MethodBody};
use crate::module::{MethodDef, Module, TypeDef};
use crate::opcode::Opcode;
use crate::types::FieldRef;

/// Verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Module validation error
    #[error("Module validation error: {0}")]
    ModuleValidation(String),

    /// Branch to a non-existent instruction
    #[error("{method}: invalid branch target {target} at IL_{offset:04}")]
    InvalidBranchTarget {
        /// Qualified method name
        method: String,
        /// Instruction index of the branch
        offset: usize,
        /// Target index
        target: u32,
    },

    /// Exception handler range is empty, reversed or out of bounds
    #[error("{method}: malformed exception handler #{index}")]
    InvalidHandlerRange {
        /// Qualified method name
        method: String,
        /// Handler index
        index: usize,
    },

    /// Argument index beyond the method's arguments
    #[error("{method}: invalid argument {index} (max {max}) at IL_{offset:04}")]
    InvalidArgument {
        /// Qualified method name
        method: String,
        /// Instruction index
        offset: usize,
        /// Referenced argument
        index: u16,
        /// Number of arguments
        max: usize,
    },

    /// Local index beyond the declared locals
    #[error("{method}: invalid local {index} (max {max}) at IL_{offset:04}")]
    InvalidLocal {
        /// Qualified method name
        method: String,
        /// Instruction index
        offset: usize,
        /// Referenced local
        index: u16,
        /// Number of locals
        max: usize,
    },

    /// Field operand does not resolve
    #[error("{method}: unresolved field {field} at IL_{offset:04}")]
    UnresolvedField {
        /// Qualified method name
        method: String,
        /// Instruction index
        offset: usize,
        /// The field reference
        field: String,
    },

    /// Static access to an instance field or vice versa
    #[error("{method}: {opcode} used on {field} at IL_{offset:04}, which has the wrong storage kind")]
    StorageMismatch {
        /// Qualified method name
        method: String,
        /// Instruction index
        offset: usize,
        /// Opcode name
        opcode: &'static str,
        /// The field reference
        field: String,
    },

    /// Execution falls off end
    #[error("{method}: execution falls off the end of the body")]
    FallOffEnd {
        /// Qualified method name
        method: String,
    },
}

/// Verify every method body in a module
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    module.validate().map_err(VerifyError::ModuleValidation)?;

    for ty in &module.types {
        for method in &ty.methods {
            if let Some(body) = &method.body {
                let name = format!("{}::{}", ty.full_name(), method.name);
                verify_body(&name, method, body, module)?;
            }
        }
    }

    Ok(())
}

fn verify_body(
    name: &str,
    method: &MethodDef,
    body: &MethodBody,
    module: &Module,
) -> Result<(), VerifyError> {
    // Empty bodies are allowed
    if body.instructions.is_empty() {
        return Ok(());
    }

    let len = body.instructions.len();

    for (offset, instr) in body.instructions.iter().enumerate() {
        if let Some(target) = instr.branch_target() {
            if target as usize >= len {
                return Err(VerifyError::InvalidBranchTarget {
                    method: name.to_string(),
                    offset,
                    target,
                });
            }
        }

        match instr {
            Instruction::LdArg(index) if *index as usize >= method.arg_count() => {
                return Err(VerifyError::InvalidArgument {
                    method: name.to_string(),
                    offset,
                    index: *index,
                    max: method.arg_count(),
                });
            }
            Instruction::LdLoc(index) | Instruction::StLoc(index)
                if *index as usize >= body.locals.len() =>
            {
                return Err(VerifyError::InvalidLocal {
                    method: name.to_string(),
                    offset,
                    index: *index,
                    max: body.locals.len(),
                });
            }
            _ => {}
        }

        if let Some(field) = instr.field() {
            verify_field(name, offset, instr.opcode(), field, module)?;
        }
    }

    for (index, handler) in body.exception_handlers.iter().enumerate() {
        let well_formed = handler.try_start < handler.try_end
            && handler.handler_start < handler.handler_end
            && handler.try_end as usize <= len
            && handler.handler_end as usize <= len;
        if !well_formed {
            return Err(VerifyError::InvalidHandlerRange {
                method: name.to_string(),
                index,
            });
        }
    }

    if let Some(last) = body.instructions.last() {
        if !last.opcode().is_terminator() {
            return Err(VerifyError::FallOffEnd {
                method: name.to_string(),
            });
        }
    }

    Ok(())
}

fn verify_field(
    name: &str,
    offset: usize,
    opcode: Opcode,
    field: &FieldRef,
    module: &Module,
) -> Result<(), VerifyError> {
    let owner: Option<&TypeDef> = module.find_type(&field.declaring_type.full_name());

    match owner {
        Some(ty) => {
            let def = ty.field(&field.name).ok_or_else(|| VerifyError::UnresolvedField {
                method: name.to_string(),
                offset,
                field: field.to_string(),
            })?;
            let wants_static = matches!(opcode, Opcode::LdSFld | Opcode::StSFld);
            if def.is_static() != wants_static {
                return Err(VerifyError::StorageMismatch {
                    method: name.to_string(),
                    offset,
                    opcode: opcode.name(),
                    field: field.to_string(),
                });
            }
            Ok(())
        }
        // Fields of external types cannot be checked beyond their owner being imported.
        None if module.knows(&field.declaring_type) => Ok(()),
        None => Err(VerifyError::UnresolvedField {
            method: name.to_string(),
            offset,
            field: field.to_string(),
        }),
    }
}
