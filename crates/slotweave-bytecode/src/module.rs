//! Module object model and binary format

use crate::body::MethodBody;
use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::types::{FieldRef, TypeRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic number for slotweave module files: "SWMD"
pub const MAGIC: [u8; 4] = *b"SWMD";

/// Current module format version
pub const VERSION: u32 = 1;

/// Size of the fixed header: magic + version + flags + checksum
const HEADER_SIZE: usize = 16;

/// Module encoding/decoding errors
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected SWMD, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Checksum stored in the header
        expected: u32,
        /// Checksum of the payload as read
        actual: u32,
    },
}

/// Module flags
pub mod flags {
    /// Module was produced by a weave pass
    pub const WOVEN: u32 = 1 << 0;
}

/// Type attribute flags
pub mod type_attrs {
    /// Visible outside the module
    pub const PUBLIC: u32 = 1 << 0;
    /// Cannot be instantiated
    pub const ABSTRACT: u32 = 1 << 1;
    /// Cannot be derived from
    pub const SEALED: u32 = 1 << 2;
}

/// Field attribute flags
pub mod field_attrs {
    /// Visible outside the declaring type
    pub const PUBLIC: u32 = 1 << 0;
    /// Static (per-type) storage
    pub const STATIC: u32 = 1 << 1;
}

/// Method attribute flags
pub mod method_attrs {
    /// Visible outside the declaring type
    pub const PUBLIC: u32 = 1 << 0;
    /// No receiver argument
    pub const STATIC: u32 = 1 << 1;
    /// No body
    pub const ABSTRACT: u32 = 1 << 2;
}

/// A compiled module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Magic number (must be "SWMD")
    pub magic: [u8; 4],
    /// Format version
    pub version: u32,
    /// Module flags
    pub flags: u32,
    /// Module metadata
    pub metadata: Metadata,
    /// Types referenced by this module but defined elsewhere
    #[serde(default)]
    pub type_refs: Vec<TypeRef>,
    /// Type definitions, in declaration order
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

/// Module metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Module name
    pub name: String,
    /// Source file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

/// A declarative marker attached to a type, field or method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttribute {
    /// The attribute's type
    pub attribute_type: TypeRef,
    /// Positional constructor arguments
    #[serde(default)]
    pub args: Vec<AttributeArg>,
}

/// Constructor argument of a custom attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AttributeArg {
    /// A type reference (`typeof(T)`)
    Type(TypeRef),
    /// A 32-bit integer
    Int(i32),
    /// A string
    Str(String),
    /// A boolean
    Bool(bool),
}

/// Type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Namespace
    pub namespace: String,
    /// Short name
    pub name: String,
    /// Type attribute flags
    pub attributes: u32,
    /// Base type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<TypeRef>,
    /// Custom attributes
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
    /// Fields, in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Methods, in declaration order
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field attribute flags
    pub attributes: u32,
    /// Value type
    pub field_type: TypeRef,
    /// Custom attributes
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
}

/// Method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub param_type: TypeRef,
}

/// Method definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Method attribute flags
    pub attributes: u32,
    /// Return type
    pub return_type: TypeRef,
    /// Parameters, excluding the receiver
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
    /// Custom attributes
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
    /// Body, absent for abstract and external methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MethodBody>,
}

fn encode_attributes(attrs: &[CustomAttribute], writer: &mut BytecodeWriter) {
    writer.emit_u32(attrs.len() as u32);
    for attr in attrs {
        attr.encode(writer);
    }
}

fn decode_attributes(reader: &mut BytecodeReader<'_>) -> Result<Vec<CustomAttribute>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut attrs = Vec::with_capacity(reader.capacity_for(count));
    for _ in 0..count {
        attrs.push(CustomAttribute::decode(reader)?);
    }
    Ok(attrs)
}

fn find_attribute<'a>(attrs: &'a [CustomAttribute], full_name: &str) -> Option<&'a CustomAttribute> {
    attrs
        .iter()
        .find(|a| a.attribute_type.full_name() == full_name)
}

impl CustomAttribute {
    /// Create an attribute with no arguments
    pub fn new(attribute_type: TypeRef) -> Self {
        Self {
            attribute_type,
            args: Vec::new(),
        }
    }

    /// Add a positional argument
    pub fn with_arg(mut self, arg: AttributeArg) -> Self {
        self.args.push(arg);
        self
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        self.attribute_type.encode(writer);
        writer.emit_u32(self.args.len() as u32);
        for arg in &self.args {
            arg.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let attribute_type = TypeRef::decode(reader)?;
        let count = reader.read_u32()? as usize;
        let mut args = Vec::with_capacity(reader.capacity_for(count));
        for _ in 0..count {
            args.push(AttributeArg::decode(reader)?);
        }
        Ok(Self {
            attribute_type,
            args,
        })
    }
}

impl AttributeArg {
    fn encode(&self, writer: &mut BytecodeWriter) {
        match self {
            Self::Type(ty) => {
                writer.emit_u8(0);
                ty.encode(writer);
            }
            Self::Int(v) => {
                writer.emit_u8(1);
                writer.emit_i32(*v);
            }
            Self::Str(s) => {
                writer.emit_u8(2);
                writer.emit_string(s);
            }
            Self::Bool(b) => {
                writer.emit_u8(3);
                writer.emit_bool(*b);
            }
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let offset = reader.position();
        match reader.read_u8()? {
            0 => Ok(Self::Type(TypeRef::decode(reader)?)),
            1 => Ok(Self::Int(reader.read_i32()?)),
            2 => Ok(Self::Str(reader.read_string()?)),
            3 => Ok(Self::Bool(reader.read_bool()?)),
            tag => Err(DecodeError::InvalidTag {
                kind: "attribute argument",
                tag,
                offset,
            }),
        }
    }
}

impl FieldDef {
    /// Create a private instance field
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            attributes: 0,
            field_type,
            custom_attributes: Vec::new(),
        }
    }

    /// Whether the field is static
    pub fn is_static(&self) -> bool {
        self.attributes & field_attrs::STATIC != 0
    }

    /// First custom attribute whose type has the given full name
    pub fn attribute(&self, full_name: &str) -> Option<&CustomAttribute> {
        find_attribute(&self.custom_attributes, full_name)
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u32(self.attributes);
        self.field_type.encode(writer);
        encode_attributes(&self.custom_attributes, writer);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: reader.read_string()?,
            attributes: reader.read_u32()?,
            field_type: TypeRef::decode(reader)?,
            custom_attributes: decode_attributes(reader)?,
        })
    }
}

impl ParamDef {
    /// Create a parameter
    pub fn new(name: impl Into<String>, param_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

impl MethodDef {
    /// Create a private instance method with an empty body
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            attributes: 0,
            return_type,
            parameters: Vec::new(),
            custom_attributes: Vec::new(),
            body: Some(MethodBody::default()),
        }
    }

    /// Whether the method has no receiver
    pub fn is_static(&self) -> bool {
        self.attributes & method_attrs::STATIC != 0
    }

    /// Argument index of parameter `param_index`, accounting for the receiver.
    ///
    /// `None` when the index does not fit an `ldarg` operand.
    pub fn arg_index(&self, param_index: usize) -> Option<u16> {
        let offset = if self.is_static() { 0 } else { 1 };
        u16::try_from(param_index.checked_add(offset)?).ok()
    }

    /// Total number of arguments including the receiver
    pub fn arg_count(&self) -> usize {
        self.parameters.len() + if self.is_static() { 0 } else { 1 }
    }

    /// First custom attribute whose type has the given full name
    pub fn attribute(&self, full_name: &str) -> Option<&CustomAttribute> {
        find_attribute(&self.custom_attributes, full_name)
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u32(self.attributes);
        self.return_type.encode(writer);

        writer.emit_u32(self.parameters.len() as u32);
        for param in &self.parameters {
            writer.emit_string(&param.name);
            param.param_type.encode(writer);
        }

        encode_attributes(&self.custom_attributes, writer);

        match &self.body {
            Some(body) => {
                writer.emit_u8(1);
                body.encode(writer);
            }
            None => writer.emit_u8(0),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let attributes = reader.read_u32()?;
        let return_type = TypeRef::decode(reader)?;

        let param_count = reader.read_u32()? as usize;
        let mut parameters = Vec::with_capacity(reader.capacity_for(param_count));
        for _ in 0..param_count {
            let name = reader.read_string()?;
            let param_type = TypeRef::decode(reader)?;
            parameters.push(ParamDef { name, param_type });
        }

        let custom_attributes = decode_attributes(reader)?;

        let body = if reader.read_bool()? {
            Some(MethodBody::decode(reader)?)
        } else {
            None
        };

        Ok(Self {
            name,
            attributes,
            return_type,
            parameters,
            custom_attributes,
            body,
        })
    }
}

impl TypeDef {
    /// Create an empty non-public class deriving from `std.Object`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            attributes: 0,
            base_type: Some(TypeRef::object()),
            custom_attributes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Reference to this type
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.namespace.clone(), self.name.clone())
    }

    /// Fully qualified name
    pub fn full_name(&self) -> String {
        self.type_ref().full_name()
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find the first method with the given name
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Reference to the field at `index`
    pub fn field_ref(&self, index: usize) -> FieldRef {
        let field = &self.fields[index];
        FieldRef::new(self.type_ref(), field.name.clone(), field.field_type.clone())
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.namespace);
        writer.emit_string(&self.name);
        writer.emit_u32(self.attributes);
        match &self.base_type {
            Some(base) => {
                writer.emit_u8(1);
                base.encode(writer);
            }
            None => writer.emit_u8(0),
        }
        encode_attributes(&self.custom_attributes, writer);

        writer.emit_u32(self.fields.len() as u32);
        for field in &self.fields {
            field.encode(writer);
        }

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let namespace = reader.read_string()?;
        let name = reader.read_string()?;
        let attributes = reader.read_u32()?;
        let base_type = if reader.read_bool()? {
            Some(TypeRef::decode(reader)?)
        } else {
            None
        };
        let custom_attributes = decode_attributes(reader)?;

        let field_count = reader.read_u32()? as usize;
        let mut fields = Vec::with_capacity(reader.capacity_for(field_count));
        for _ in 0..field_count {
            fields.push(FieldDef::decode(reader)?);
        }

        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(reader.capacity_for(method_count));
        for _ in 0..method_count {
            methods.push(MethodDef::decode(reader)?);
        }

        Ok(Self {
            namespace,
            name,
            attributes,
            base_type,
            custom_attributes,
            fields,
            methods,
        })
    }
}

impl Metadata {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        match &self.source_file {
            Some(path) => {
                writer.emit_u8(1);
                writer.emit_string(path);
            }
            None => writer.emit_u8(0),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let source_file = if reader.read_bool()? {
            Some(reader.read_string()?)
        } else {
            None
        };
        Ok(Self { name, source_file })
    }
}

impl Module {
    /// Create a new empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            metadata: Metadata {
                name: name.into(),
                source_file: None,
            },
            type_refs: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Index of the type defined in this module with the given full name
    pub fn type_index(&self, full_name: &str) -> Option<usize> {
        self.types.iter().position(|t| t.full_name() == full_name)
    }

    /// Find a type defined in this module by full name
    pub fn find_type(&self, full_name: &str) -> Option<&TypeDef> {
        self.type_index(full_name).map(|i| &self.types[i])
    }

    /// Whether `ty` (ignoring generic arguments) is defined in this module
    pub fn defines(&self, ty: &TypeRef) -> bool {
        self.type_index(&ty.definition().full_name()).is_some()
    }

    /// Whether `ty` is known to this module: defined, imported or built in
    pub fn knows(&self, ty: &TypeRef) -> bool {
        ty.is_core() || self.defines(ty) || self.type_refs.iter().any(|r| r == ty)
    }

    /// Make `ty` referenceable from this module.
    ///
    /// Types defined in the module and built-in types are returned as is.
    /// Anything else is recorded in the module's type reference table (once),
    /// together with its generic arguments and enclosing types.
    pub fn import_type(&mut self, ty: &TypeRef) -> TypeRef {
        for arg in &ty.generic_args {
            self.import_type(arg);
        }
        if let Some(outer) = &ty.declaring_type {
            self.import_type(outer);
        }
        if !self.knows(ty) {
            self.type_refs.push(ty.clone());
        }
        ty.clone()
    }

    /// Validate module structure
    pub fn validate(&self) -> Result<(), String> {
        if self.magic != MAGIC {
            return Err("Invalid magic number".to_string());
        }
        if self.version != VERSION {
            return Err(format!("Unsupported version: {}", self.version));
        }
        Ok(())
    }

    /// Pretty-printed JSON dump of the whole module
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Encode the module to binary format
    ///
    /// Format:
    /// - Header: magic (4 bytes) + version (u32) + flags (u32) + checksum (u32)
    /// - Metadata
    /// - Type reference table
    /// - Type definitions
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();

        writer.buffer.extend_from_slice(&self.magic);
        writer.emit_u32(self.version);
        writer.emit_u32(self.flags);
        let checksum_offset = writer.offset();
        writer.emit_u32(0); // Placeholder for checksum

        self.metadata.encode(&mut writer);

        writer.emit_u32(self.type_refs.len() as u32);
        for ty in &self.type_refs {
            ty.encode(&mut writer);
        }

        writer.emit_u32(self.types.len() as u32);
        for ty in &self.types {
            ty.encode(&mut writer);
        }

        // CRC32 of everything after the header
        let checksum = crc32fast::hash(&writer.buffer[HEADER_SIZE..]);
        writer.patch_u32(checksum_offset, checksum);

        writer.into_bytes()
    }

    /// Decode a module from binary format
    pub fn decode(data: &[u8]) -> Result<Self, ModuleError> {
        let mut reader = BytecodeReader::new(data);

        let magic_bytes = reader.read_bytes(4)?;
        let magic = [magic_bytes[0], magic_bytes[1], magic_bytes[2], magic_bytes[3]];
        if magic != MAGIC {
            return Err(ModuleError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ModuleError::UnsupportedVersion(version));
        }

        let flags = reader.read_u32()?;
        let stored_checksum = reader.read_u32()?;

        let calculated_checksum = crc32fast::hash(&data[HEADER_SIZE..]);
        if stored_checksum != calculated_checksum {
            return Err(ModuleError::ChecksumMismatch {
                expected: stored_checksum,
                actual: calculated_checksum,
            });
        }

        let metadata = Metadata::decode(&mut reader)?;

        let ref_count = reader.read_u32()? as usize;
        let mut type_refs = Vec::with_capacity(reader.capacity_for(ref_count));
        for _ in 0..ref_count {
            type_refs.push(TypeRef::decode(&mut reader)?);
        }

        let type_count = reader.read_u32()? as usize;
        let mut types = Vec::with_capacity(reader.capacity_for(type_count));
        for _ in 0..type_count {
            types.push(TypeDef::decode(&mut reader)?);
        }

        Ok(Self {
            magic,
            version,
            flags,
            metadata,
            type_refs,
            types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{ExceptionHandler, Instruction};

    fn service_attr() -> TypeRef {
        TypeRef::new("SlotWeave", "ServiceAttribute")
    }

    #[test]
    fn test_module_creation() {
        let module = Module::new("test");
        assert_eq!(module.magic, MAGIC);
        assert_eq!(module.version, VERSION);
        assert_eq!(module.flags, 0);
        assert_eq!(module.name(), "test");
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_empty_module_encoding() {
        let module = Module::new("test_module");
        let bytes = module.encode();

        let decoded = Module::decode(&bytes).unwrap();
        assert_eq!(decoded.metadata.name, "test_module");
        assert!(decoded.types.is_empty());
        assert!(decoded.type_refs.is_empty());
    }

    #[test]
    fn test_module_with_types() {
        let mut module = Module::new("App");
        module.metadata.source_file = Some("src/app.cs".to_string());
        module.flags = flags::WOVEN;

        let mut bootstrap = TypeDef::new("App", "Bootstrap");
        bootstrap.attributes = type_attrs::PUBLIC;
        let mut supply = MethodDef::new("Supply", TypeRef::void());
        supply.attributes = method_attrs::PUBLIC | method_attrs::STATIC;
        supply.parameters.push(ParamDef::new("name", TypeRef::string()));
        supply.custom_attributes.push(
            CustomAttribute::new(service_attr())
                .with_arg(AttributeArg::Type(TypeRef::new("App", "ConfigScope"))),
        );
        supply.body = Some(MethodBody::new(vec![Instruction::Ret]));
        bootstrap.methods.push(supply);

        let mut client = TypeDef::new("App", "Client");
        let mut field = FieldDef::new("name", TypeRef::string());
        field
            .custom_attributes
            .push(CustomAttribute::new(TypeRef::new("SlotWeave", "WiredAttribute")));
        client.fields.push(field);
        let mut abstract_method = MethodDef::new("Run", TypeRef::void());
        abstract_method.attributes = method_attrs::ABSTRACT;
        abstract_method.body = None;
        client.methods.push(abstract_method);

        module.types.push(bootstrap);
        module.types.push(client);
        module.import_type(&TypeRef::new("Lib", "Logger"));

        let decoded = Module::decode(&module.encode()).unwrap();
        assert_eq!(decoded, module);
    }

    #[test]
    fn test_module_with_handlers() {
        let mut module = Module::new("handlers");
        let mut ty = TypeDef::new("", "Worker");
        let mut method = MethodDef::new("Work", TypeRef::void());
        let mut body = MethodBody::new(vec![
            Instruction::LdArg(0),
            Instruction::Pop,
            Instruction::Ret,
        ]);
        body.exception_handlers.push(ExceptionHandler {
            try_start: 0,
            try_end: 2,
            handler_start: 2,
            handler_end: 3,
            catch_type: Some(TypeRef::new("std", "Exception")),
        });
        method.body = Some(body);
        ty.methods.push(method);
        module.types.push(ty);

        let decoded = Module::decode(&module.encode()).unwrap();
        let body = decoded.types[0].methods[0].body.as_ref().unwrap();
        assert_eq!(body.exception_handlers.len(), 1);
        assert_eq!(body.instructions.len(), 3);
    }

    #[test]
    fn test_module_checksum_validation() {
        let module = Module::new("test");
        let mut bytes = module.encode();

        bytes[HEADER_SIZE + 4] ^= 0xFF;
        let result = Module::decode(&bytes);
        assert!(matches!(result, Err(ModuleError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_invalid_magic_number() {
        let mut bytes = vec![b'X', b'X', b'X', b'X'];
        bytes.extend_from_slice(&1u32.to_le_bytes()); // version
        bytes.extend_from_slice(&0u32.to_le_bytes()); // flags
        bytes.extend_from_slice(&0u32.to_le_bytes()); // checksum

        let result = Module::decode(&bytes);
        assert!(matches!(result, Err(ModuleError::InvalidMagic(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"SWMD");
        bytes.extend_from_slice(&999u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let result = Module::decode(&bytes);
        assert!(matches!(result, Err(ModuleError::UnsupportedVersion(999))));
    }

    #[test]
    fn test_oversized_count_is_decode_error() {
        let mut bytes = Module::new("test").encode();
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&u32::MAX.to_le_bytes());
        let checksum = crc32fast::hash(&bytes[HEADER_SIZE..]);
        bytes[12..HEADER_SIZE].copy_from_slice(&checksum.to_le_bytes());

        let result = Module::decode(&bytes);
        assert!(matches!(result, Err(ModuleError::DecodeError(_))));
    }

    #[test]
    fn test_truncated_header() {
        let result = Module::decode(b"SWMD");
        assert!(matches!(result, Err(ModuleError::DecodeError(_))));
    }

    #[test]
    fn test_import_type_records_once() {
        let mut module = Module::new("app");
        module.types.push(TypeDef::new("App", "Local"));

        let external = TypeRef::new("Lib", "Service")
            .with_generic_args(vec![TypeRef::new("Lib", "Arg"), TypeRef::int32()]);
        module.import_type(&external);
        module.import_type(&external);
        module.import_type(&TypeRef::new("App", "Local"));
        module.import_type(&TypeRef::string());

        let names: Vec<String> = module.type_refs.iter().map(|t| t.full_name()).collect();
        assert_eq!(names, vec!["Lib.Arg", "Lib.Service<Lib.Arg,std.Int32>"]);
    }

    #[test]
    fn test_method_arg_indices() {
        let mut method = MethodDef::new("Supply", TypeRef::void());
        method.parameters.push(ParamDef::new("a", TypeRef::string()));
        method.parameters.push(ParamDef::new("b", TypeRef::int32()));
        assert_eq!(method.arg_index(0), Some(1));
        assert_eq!(method.arg_count(), 3);
        assert_eq!(method.arg_index(u16::MAX as usize - 1), Some(u16::MAX));
        assert_eq!(method.arg_index(u16::MAX as usize), None);

        method.attributes |= method_attrs::STATIC;
        assert_eq!(method.arg_index(0), Some(0));
        assert_eq!(method.arg_index(1), Some(1));
        assert_eq!(method.arg_index(u16::MAX as usize), Some(u16::MAX));
        assert_eq!(method.arg_count(), 2);
    }

    #[test]
    fn test_attribute_lookup() {
        let mut field = FieldDef::new("x", TypeRef::int32());
        field.custom_attributes.push(CustomAttribute::new(service_attr()));
        assert!(field.attribute("SlotWeave.ServiceAttribute").is_some());
        assert!(field.attribute("SlotWeave.WiredAttribute").is_none());
    }
}
