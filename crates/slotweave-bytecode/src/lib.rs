//! Slotweave Module Definitions
//!
//! This crate provides the compiled-module object model the weaver rewrites:
//! types, fields, methods, custom attributes and instruction bodies, plus the
//! binary encoding used to read and write modules and a structural verifier.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod body;
pub mod encoder;
pub mod module;
pub mod opcode;
pub mod types;
pub mod verify;

pub use body::{BodyEditor, ExceptionHandler, Instruction, InstructionBuilder, MethodBody};
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use module::{
    AttributeArg, CustomAttribute, FieldDef, Metadata, MethodDef, Module, ModuleError, ParamDef,
    TypeDef,
};
pub use opcode::Opcode;
pub use types::{FieldRef, MethodRef, TypeRef};
pub use verify::{verify_module, VerifyError};
