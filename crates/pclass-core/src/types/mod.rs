//! Type descriptions.
//!
//! Every category of data the system can reflect over is described by a
//! [`Type`]: a name, a stable [`TypeHash`], a [`Kind`], and the operations
//! that move a [`Value`] of that type in and out of a [`BitStream`].
//!
//! ## Kinds
//!
//! - [`PrimitiveType`] - fixed-width scalars and strings
//! - [`EnumType`] - named `u32` constants
//! - [`ClassType`] - reflectable objects with properties and a single base
//! - [`OpaqueType`] - a named type with no data operations

mod class_type;
mod enum_type;
mod primitive;

pub use class_type::{
    ClassBuilder, ClassProperty, ClassType, element_count_u32, read_element_count,
};
pub use enum_type::{EnumBuilder, EnumType, ReflectEnum};
pub use primitive::{Primitive, PrimitiveType};

use std::any::TypeId;
use std::fmt;

use crate::{BitStream, Error, PropertyClass, Result, TypeHash, TypeSystem, Value};

/// The category of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    None,
    Primitive,
    Class,
    Enum,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::None => "none",
            Kind::Primitive => "primitive",
            Kind::Class => "class",
            Kind::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// Name and hash shared by every type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub hash: TypeHash,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, hash: TypeHash) -> Self {
        Self {
            name: name.into(),
            hash,
        }
    }
}

/// A registered description of a data category.
///
/// The data operations have default implementations that fail with
/// [`Error::Unimplemented`]; each kind overrides the ones it supports.
pub trait Type: Send + Sync + fmt::Debug {
    /// Registered name.
    fn name(&self) -> &str;

    /// Stable identity derived from the name.
    fn hash(&self) -> TypeHash;

    /// Category of the type.
    fn kind(&self) -> Kind;

    /// Rust type of the values this type reads and writes, if any.
    fn value_type_id(&self) -> Option<TypeId> {
        None
    }

    /// Rust name of the values this type reads and writes.
    fn value_type_name(&self) -> &'static str {
        "()"
    }

    /// Write a value of this type to the stream.
    fn write_to(&self, types: &TypeSystem, stream: &mut BitStream, value: &Value<'_>) -> Result<()> {
        let _ = (types, stream, value);
        Err(Error::unimplemented(self.name(), "write_to"))
    }

    /// Read a value of this type from the stream.
    fn read_from(&self, types: &TypeSystem, stream: &mut BitStream) -> Result<Value<'static>> {
        let _ = (types, stream);
        Err(Error::unimplemented(self.name(), "read_from"))
    }

    /// Create a blank instance of this type.
    fn instantiate(&self) -> Result<Box<dyn PropertyClass>> {
        Err(Error::unimplemented(self.name(), "instantiate"))
    }

    /// Downcast to a class type.
    fn as_class(&self) -> Option<&ClassType> {
        None
    }

    /// Downcast to an enum type.
    fn as_enum(&self) -> Option<&EnumType> {
        None
    }

    /// Check if this type is `other` or derives from it.
    fn inherits(&self, other: &dyn Type) -> bool {
        self.hash() == other.hash()
    }
}

/// A named type with no data operations.
#[derive(Debug, Clone)]
pub struct OpaqueType {
    info: TypeInfo,
}

impl OpaqueType {
    pub fn new(info: TypeInfo) -> Self {
        Self { info }
    }
}

impl Type for OpaqueType {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn hash(&self) -> TypeHash {
        self.info.hash
    }

    fn kind(&self) -> Kind {
        Kind::None
    }
}

/// Fail unless `actual` is `expected`, or, when `allow_inheritance` is set
/// and `expected` is a class, a class deriving from it.
pub fn assert_type_match(
    expected: &dyn Type,
    actual: &dyn Type,
    allow_inheritance: bool,
) -> Result<()> {
    if expected.hash() == actual.hash() {
        return Ok(());
    }
    if allow_inheritance && expected.kind() == Kind::Class && actual.inherits(expected) {
        return Ok(());
    }
    Err(Error::TypeMismatch {
        expected: expected.name().to_string(),
        actual: actual.name().to_string(),
        allow_inheritance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_type_operations_are_unimplemented() {
        let types = TypeSystem::new();
        let opaque = OpaqueType::new(TypeInfo::new("Handle", TypeHash(7)));
        let mut stream = BitStream::new();

        let err = opaque.read_from(&types, &mut stream).unwrap_err();
        assert_eq!(err.to_string(), "type 'Handle' does not implement read_from");
        assert!(opaque.write_to(&types, &mut stream, &Value::new(1i32)).is_err());
        assert!(matches!(opaque.instantiate(), Err(Error::Unimplemented { .. })));
        assert_eq!(opaque.kind(), Kind::None);
    }

    #[test]
    fn opaque_type_match() {
        let a = OpaqueType::new(TypeInfo::new("A", TypeHash(1)));
        let b = OpaqueType::new(TypeInfo::new("B", TypeHash(2)));
        assert!(assert_type_match(&a, &a, false).is_ok());
        let err = assert_type_match(&a, &b, true).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn kind_display() {
        assert_eq!(Kind::Class.to_string(), "class");
        assert_eq!(Kind::None.to_string(), "none");
    }
}
