//! Core of the pclass runtime type system.
//!
//! A [`TypeSystem`] owns every registered [`Type`](types::Type): primitives,
//! enums and reflectable classes. Classes implement [`PropertyClass`] and
//! expose their fields through [`PropertyDef`] accessors, which lets a
//! serializer walk any object by name and hash alone.
//!
//! Type-erased data moves around as a [`Value`]. Values convert between
//! Rust types through the [`CastTable`] owned by the type system.

pub mod bit_integer;
pub mod bit_stream;
pub mod caster;
pub mod error;
pub mod property;
pub mod property_class;
pub mod type_hash;
pub mod type_system;
pub mod types;
pub mod value;
pub mod wide_string;

pub use bit_integer::{Bi, BitInteger, Bui};
pub use bit_stream::{BitStream, MAX_BITS};
pub use caster::{
    CastTable, Caster, FromScalar, Scalar, ScalarSource, ScalarTarget, ToScalar, ValueCaster,
};
pub use error::{CastError, Error, RegistrationError, Result, StreamError, ValueError};
pub use property::{Property, PropertyAccess, PropertyDef, PropertyFlags, PropertyMut};
pub use property_class::{ObjectSlot, PropertyClass};
pub use type_hash::{
    HashCalculator, LegacyHashCalculator, TYPE_HASH_SEED, TypeHash, XxHashCalculator,
};
pub use type_system::TypeSystem;
pub use types::{
    ClassBuilder, ClassProperty, ClassType, EnumBuilder, EnumType, Kind, OpaqueType, Primitive,
    PrimitiveType, ReflectEnum, Type, TypeInfo, assert_type_match,
};
pub use value::{Reflect, Value};
pub use wide_string::WideString;
