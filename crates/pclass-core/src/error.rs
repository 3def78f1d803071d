//! Unified error types for pclass.
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (top-level wrapper)
//! ├── RegistrationError - Invalid type/class/enum/property registration
//! ├── ValueError        - Type mismatch and ownership misuse on a Value
//! ├── CastError         - No caster for a (source, destination) pair
//! └── StreamError       - Truncated or malformed bit streams
//! ```
//!
//! Registration errors are raised while a [`TypeSystem`](crate::TypeSystem)
//! is being populated and are always fatal configuration mistakes. Everything
//! else surfaces from value access, casting, or a save/load call.

use thiserror::Error;

use crate::TypeHash;

/// Convenience alias used throughout pclass.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while populating a type system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// Two different names produced the same hash.
    #[error("hash collision: '{name}' and '{existing}' both hash to {hash}")]
    HashCollision {
        /// The name being registered.
        name: String,
        /// The name already registered under the hash.
        existing: String,
        /// The colliding hash.
        hash: TypeHash,
    },

    /// The name hashes to the reserved null sentinel.
    #[error("type '{0}' hashes to the reserved null hash")]
    ReservedHash(String),

    /// A base class is missing or is not a class type.
    #[error("invalid base class '{base}' for '{name}': {reason}")]
    InvalidBaseClass {
        /// The class being defined.
        name: String,
        /// The requested base.
        base: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An enum element name was declared twice.
    #[error("duplicate enum element: '{element}' in enum '{enum_name}'")]
    DuplicateEnumElement {
        /// The enum name.
        enum_name: String,
        /// The duplicate element name.
        element: String,
    },

    /// A property name was declared twice on one class.
    #[error("duplicate property: '{property}' in class '{class}'")]
    DuplicateProperty {
        /// The class name.
        class: String,
        /// The duplicate property name.
        property: String,
    },

    /// The class name reported by instances differs from the registered name.
    #[error("class '{name}' creates instances named '{class_name}'")]
    ClassNameMismatch {
        /// The name being registered.
        name: String,
        /// The name reported by `PropertyClass::class_name`.
        class_name: &'static str,
    },

    /// A property refers to a type that has not been registered.
    #[error("property '{class}::{property}' refers to unknown type '{type_name}'")]
    UnknownPropertyType {
        /// The class name.
        class: String,
        /// The property name.
        property: String,
        /// The unresolved type name.
        type_name: String,
    },

    /// A property accessor is bound to a slot of the wrong Rust type.
    #[error(
        "property '{class}::{property}' is bound to '{actual}' but its type stores '{expected}'"
    )]
    PropertyTypeMismatch {
        /// The class name.
        class: String,
        /// The property name.
        property: String,
        /// Value type of the property's registered Type.
        expected: &'static str,
        /// Value type of the accessor slot.
        actual: &'static str,
    },
}

// ============================================================================
// Value Errors
// ============================================================================

/// Errors raised by [`Value`](crate::Value) accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The requested type does not match the stored type.
    #[error("type mismatch: expected '{expected}', value holds '{actual}'")]
    TypeMismatch {
        /// The requested type.
        expected: &'static str,
        /// The stored type.
        actual: &'static str,
    },

    /// Ownership was requested from a Value that does not own its payload.
    #[error("cannot release ownership from a reference value of '{type_name}'")]
    NotOwned {
        /// The stored type.
        type_name: &'static str,
    },

    /// The payload has been released and is no longer reachable.
    #[error("value of '{type_name}' has been released")]
    Released {
        /// The stored type.
        type_name: &'static str,
    },
}

// ============================================================================
// Cast Errors
// ============================================================================

/// Errors raised by the cast dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// Nothing at all is declared for the source type.
    #[error("no casters declared for '{from}' (requested cast to '{to}')")]
    NoCasterTable {
        /// Source type name.
        from: &'static str,
        /// Destination type name.
        to: &'static str,
    },

    /// The source type has casters, but none for this destination.
    #[error("cannot cast '{from}' to '{to}'")]
    NoCaster {
        /// Source type name.
        from: &'static str,
        /// Destination type name.
        to: &'static str,
    },

    /// A caster exists but rejected this particular value.
    #[error("failed to cast '{from}' to '{to}': {reason}")]
    Failed {
        /// Source type name.
        from: &'static str,
        /// Destination type name.
        to: &'static str,
        /// Why the value could not be converted.
        reason: String,
    },
}

// ============================================================================
// Stream Errors
// ============================================================================

/// Errors raised by [`BitStream`](crate::BitStream) reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The stream ended before the requested bits could be read.
    #[error("unexpected end of stream: needed {needed} bits, {remaining} remaining")]
    UnexpectedEof {
        /// Bits requested.
        needed: usize,
        /// Bits left in the stream.
        remaining: usize,
    },

    /// A bit width outside 1..=64 was requested.
    #[error("invalid bit width: {0}")]
    InvalidWidth(u32),

    /// A seek target lies beyond the end of the stream.
    #[error("seek to bit {target} beyond end of stream ({len} bits)")]
    SeekOutOfRange {
        /// Requested position.
        target: usize,
        /// Stream length in bits.
        len: usize,
    },

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 string data")]
    InvalidUtf8,

    /// A string was too long for its 16-bit length prefix.
    #[error("string of {0} units exceeds the 16-bit length prefix")]
    StringTooLong(usize),
}

// ============================================================================
// Top-level Error
// ============================================================================

/// The error type returned by every fallible pclass operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error while populating the type system.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Misuse of a Value.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A cast could not be performed.
    #[error(transparent)]
    Cast(#[from] CastError),

    /// The bit stream was truncated or malformed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The type does not implement the requested operation.
    #[error("type '{type_name}' does not implement {operation}")]
    Unimplemented {
        /// The type name.
        type_name: String,
        /// The missing operation.
        operation: &'static str,
    },

    /// No type is registered under this hash.
    #[error("unknown type hash {0}")]
    UnknownType(TypeHash),

    /// No type is registered under this name.
    #[error("unknown type '{0}'")]
    UnknownTypeName(String),

    /// A registered type was used where a class type is required.
    #[error("type '{0}' is not a class type")]
    NotAClass(String),

    /// An integral value is not a declared member of the enum.
    #[error("{value} is not a valid element of enum '{enum_name}'")]
    InvalidEnumValue {
        /// The enum name.
        enum_name: String,
        /// The rejected value.
        value: u32,
    },

    /// Two types that must be compatible are not.
    #[error("type mismatch: expected '{expected}', got '{actual}' (allow_inheritance={allow_inheritance})")]
    TypeMismatch {
        /// The expected type name.
        expected: String,
        /// The actual type name.
        actual: String,
        /// Whether subclasses were acceptable.
        allow_inheritance: bool,
    },

    /// A class has no property with this name.
    #[error("class '{class}' has no property '{property}'")]
    UnknownProperty {
        /// The class name.
        class: String,
        /// The requested property.
        property: String,
    },

    /// A property element index is out of range.
    #[error("index {index} out of range for property '{property}' with {count} elements")]
    IndexOutOfRange {
        /// The property name.
        property: String,
        /// The requested index.
        index: usize,
        /// The element count.
        count: usize,
    },

    /// A property cannot be resized because it is not list-like.
    #[error("property '{0}' is not dynamic")]
    NotDynamic(String),

    /// A JSON object lacks a declared property.
    #[error("missing property '{property}' while loading '{class}'")]
    MissingProperty {
        /// The class name.
        class: String,
        /// The property name.
        property: String,
    },

    /// A JSON document does not have the expected shape.
    #[error("malformed document: {0}")]
    Format(String),

    /// The size recorded in a file-mode object header disagrees with the data.
    #[error("object '{type_name}' declared {declared} bits but {actual} were read")]
    SizeMismatch {
        /// The class name.
        type_name: String,
        /// Size from the header.
        declared: u32,
        /// Bits actually consumed.
        actual: usize,
    },

    /// The stream requests a feature this build does not provide.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// JSON parsing or printing failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an [`Error::Unimplemented`] for a type.
    pub fn unimplemented(type_name: impl Into<String>, operation: &'static str) -> Self {
        Error::Unimplemented {
            type_name: type_name.into(),
            operation,
        }
    }

    /// Check if this is a configuration error.
    pub fn is_registration(&self) -> bool {
        matches!(self, Error::Registration(_))
    }

    /// Check if this is an ownership error.
    pub fn is_ownership(&self) -> bool {
        matches!(
            self,
            Error::Value(ValueError::NotOwned { .. } | ValueError::Released { .. })
        )
    }

    /// Check if this is a cast error.
    pub fn is_cast(&self) -> bool {
        matches!(self, Error::Cast(_))
    }

    /// Check if this is a resolution error (unknown type).
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::UnknownType(_) | Error::UnknownTypeName(_))
    }
}
