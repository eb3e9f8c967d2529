//! Type, field and method references
//!
//! References identify declarations by name. A reference may point at a
//! declaration inside the module or at one imported from elsewhere; the
//! module keeps a table of the latter (see [`Module::import_type`]).
//!
//! [`Module::import_type`]: crate::module::Module::import_type

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace of the built-in primitive types
pub const CORE_NAMESPACE: &str = "std";

/// Reference to a type by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Namespace (for nested types, the namespace of the outermost type)
    pub namespace: String,
    /// Short name
    pub name: String,
    /// Enclosing type for nested types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<Box<TypeRef>>,
    /// Generic arguments of a constructed generic type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_args: Vec<TypeRef>,
}

impl TypeRef {
    /// Create a reference to a top-level, non-generic type
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            declaring_type: None,
            generic_args: Vec::new(),
        }
    }

    /// Create a reference to a type nested inside `outer`
    pub fn nested(outer: TypeRef, name: impl Into<String>) -> Self {
        Self {
            namespace: outer.namespace.clone(),
            name: name.into(),
            declaring_type: Some(Box::new(outer)),
            generic_args: Vec::new(),
        }
    }

    /// Construct a generic instance of this type
    pub fn with_generic_args(mut self, args: Vec<TypeRef>) -> Self {
        self.generic_args = args;
        self
    }

    /// `std.Void`
    pub fn void() -> Self {
        Self::new(CORE_NAMESPACE, "Void")
    }

    /// `std.Object`
    pub fn object() -> Self {
        Self::new(CORE_NAMESPACE, "Object")
    }

    /// `std.String`
    pub fn string() -> Self {
        Self::new(CORE_NAMESPACE, "String")
    }

    /// `std.Int32`
    pub fn int32() -> Self {
        Self::new(CORE_NAMESPACE, "Int32")
    }

    /// `std.Boolean`
    pub fn boolean() -> Self {
        Self::new(CORE_NAMESPACE, "Boolean")
    }

    /// Short name without namespace or enclosing types
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// Whether this is a built-in primitive type
    pub fn is_core(&self) -> bool {
        self.declaring_type.is_none() && self.namespace == CORE_NAMESPACE
    }

    /// Fully qualified name.
    ///
    /// `ns.Name` for top-level types, `ns.Outer/Inner` for nested types and
    /// `ns.Name<ns.A,ns.B>` for generic instances.
    pub fn full_name(&self) -> String {
        let mut out = match &self.declaring_type {
            Some(outer) => format!("{}/{}", outer.full_name(), self.name),
            None if self.namespace.is_empty() => self.name.clone(),
            None => format!("{}.{}", self.namespace, self.name),
        };
        if !self.generic_args.is_empty() {
            let args: Vec<String> = self.generic_args.iter().map(|a| a.full_name()).collect();
            out.push('<');
            out.push_str(&args.join(","));
            out.push('>');
        }
        out
    }

    /// Reference without generic arguments (the type definition's name)
    pub fn definition(&self) -> TypeRef {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            declaring_type: self.declaring_type.clone(),
            generic_args: Vec::new(),
        }
    }

    pub(crate) fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.namespace);
        writer.emit_string(&self.name);
        match &self.declaring_type {
            Some(outer) => {
                writer.emit_u8(1);
                outer.encode(writer);
            }
            None => writer.emit_u8(0),
        }
        writer.emit_u32(self.generic_args.len() as u32);
        for arg in &self.generic_args {
            arg.encode(writer);
        }
    }

    pub(crate) fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let namespace = reader.read_string()?;
        let name = reader.read_string()?;
        let declaring_type = if reader.read_u8()? != 0 {
            Some(Box::new(TypeRef::decode(reader)?))
        } else {
            None
        };
        let count = reader.read_u32()? as usize;
        let mut generic_args = Vec::with_capacity(reader.capacity_for(count));
        for _ in 0..count {
            generic_args.push(TypeRef::decode(reader)?);
        }
        Ok(Self {
            namespace,
            name,
            declaring_type,
            generic_args,
        })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Reference to a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Type declaring the field
    pub declaring_type: TypeRef,
    /// Field name
    pub name: String,
    /// Field value type
    pub field_type: TypeRef,
}

impl FieldRef {
    /// Create a field reference
    pub fn new(declaring_type: TypeRef, name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            field_type,
        }
    }

    pub(crate) fn encode(&self, writer: &mut BytecodeWriter) {
        self.declaring_type.encode(writer);
        writer.emit_string(&self.name);
        self.field_type.encode(writer);
    }

    pub(crate) fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            declaring_type: TypeRef::decode(reader)?,
            name: reader.read_string()?,
            field_type: TypeRef::decode(reader)?,
        })
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Reference to a method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    /// Type declaring the method
    pub declaring_type: TypeRef,
    /// Method name
    pub name: String,
    /// Parameter types
    pub param_types: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
}

impl MethodRef {
    pub(crate) fn encode(&self, writer: &mut BytecodeWriter) {
        self.declaring_type.encode(writer);
        writer.emit_string(&self.name);
        writer.emit_u32(self.param_types.len() as u32);
        for ty in &self.param_types {
            ty.encode(writer);
        }
        self.return_type.encode(writer);
    }

    pub(crate) fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let declaring_type = TypeRef::decode(reader)?;
        let name = reader.read_string()?;
        let count = reader.read_u32()? as usize;
        let mut param_types = Vec::with_capacity(reader.capacity_for(count));
        for _ in 0..count {
            param_types.push(TypeRef::decode(reader)?);
        }
        let return_type = TypeRef::decode(reader)?;
        Ok(Self {
            declaring_type,
            name,
            param_types,
            return_type,
        })
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}
