//! Binary and JSON serializers for pclass object graphs.
//!
//! Both serializers walk an object through the [`ClassType`] registered for
//! it in a [`TypeSystem`], writing properties in declaration order and
//! recursing into class-typed properties.
//!
//! [`ClassType`]: pclass_core::ClassType
//! [`TypeSystem`]: pclass_core::TypeSystem

pub mod binary;
pub mod flags;
pub mod json;

#[cfg(test)]
mod test_support;

pub use binary::BinarySerializer;
pub use flags::{SerializerFlags, UnknownTypePolicy};
pub use json::{JsonSerializer, META_KEY, TYPE_HASH_KEY};
