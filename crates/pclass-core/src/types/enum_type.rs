//! Enum types.
//!
//! An [`EnumType`] pairs a registered name with an ordered list of
//! `(name, value)` elements and a Rust enum implementing [`ReflectEnum`].
//! Values are validated against the element list whenever they are read or
//! written; on the wire an enum is its 32-bit value.

use std::any::TypeId;
use std::fmt;

use super::{Kind, Type, TypeInfo};
use crate::{BitStream, Error, Reflect, RegistrationError, Result, TypeHash, TypeSystem, Value};

/// A Rust enum usable as the value type of an [`EnumType`].
///
/// Enums deriving `num_enum`'s `IntoPrimitive` and `TryFromPrimitive` with
/// `#[repr(u32)]` can use [`impl_reflect_enum!`](crate::impl_reflect_enum).
pub trait ReflectEnum: Reflect + Copy {
    /// The integral value of this member.
    fn to_u32(self) -> u32;

    /// The member with this value, if any.
    fn from_u32(value: u32) -> Option<Self>;
}

/// Implement [`ReflectEnum`] through `From<E> for u32` and `TryFrom<u32>`.
#[macro_export]
macro_rules! impl_reflect_enum {
    ($ty:ty) => {
        impl $crate::ReflectEnum for $ty {
            fn to_u32(self) -> u32 {
                u32::from(self)
            }

            fn from_u32(value: u32) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }
        }
    };
}

/// Builder for an [`EnumType`] over the Rust enum `E`.
pub struct EnumBuilder<E> {
    name: String,
    elements: Vec<(String, u32)>,
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E: ReflectEnum> EnumBuilder<E> {
    /// Start describing the enum `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Add an element.
    pub fn with_element(mut self, name: impl Into<String>, value: E) -> Self {
        self.elements.push((name.into(), value.to_u32()));
        self
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finish the type. Element names must be unique; values may repeat.
    pub fn build(self, hash: TypeHash) -> std::result::Result<EnumType, RegistrationError> {
        for (i, (element, _)) in self.elements.iter().enumerate() {
            if self.elements[..i].iter().any(|(seen, _)| seen == element) {
                return Err(RegistrationError::DuplicateEnumElement {
                    enum_name: self.name,
                    element: element.clone(),
                });
            }
        }

        Ok(EnumType {
            info: TypeInfo::new(self.name, hash),
            elements: self.elements,
            value_type_id: TypeId::of::<E>(),
            value_type_name: std::any::type_name::<E>(),
            to_u32: |value| value.as_any().downcast_ref::<E>().map(|e| e.to_u32()),
            from_u32: |value| E::from_u32(value).map(|e| Box::new(e) as Box<dyn Reflect>),
        })
    }
}

/// The [`Type`] of a reflected enum.
pub struct EnumType {
    info: TypeInfo,
    elements: Vec<(String, u32)>,
    value_type_id: TypeId,
    value_type_name: &'static str,
    to_u32: fn(&dyn Reflect) -> Option<u32>,
    from_u32: fn(u32) -> Option<Box<dyn Reflect>>,
}

impl EnumType {
    /// Start describing an enum over `E`.
    pub fn builder<E: ReflectEnum>(name: impl Into<String>) -> EnumBuilder<E> {
        EnumBuilder::new(name)
    }

    /// Elements in declaration order.
    pub fn elements(&self) -> impl Iterator<Item = (&str, u32)> {
        self.elements.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Value of the element called `name`.
    pub fn value_of(&self, name: &str) -> Option<u32> {
        self.elements
            .iter()
            .find(|(element, _)| element == name)
            .map(|(_, value)| *value)
    }

    /// Name of the first element with `value`.
    pub fn name_of(&self, value: u32) -> Option<&str> {
        self.elements
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }

    /// Check if `value` is a declared element.
    pub fn is_member(&self, value: u32) -> bool {
        self.elements.iter().any(|(_, v)| *v == value)
    }

    fn validate(&self, value: u32) -> Result<u32> {
        if self.is_member(value) {
            Ok(value)
        } else {
            Err(Error::InvalidEnumValue {
                enum_name: self.info.name.clone(),
                value,
            })
        }
    }

    /// The integral value of an enum Value, casting foreign values first.
    pub fn to_value(&self, types: &TypeSystem, value: &Value<'_>) -> Result<u32> {
        let raw = if value.type_id() == self.value_type_id {
            (self.to_u32)(value.payload()?)
        } else {
            let casted = value.cast_to(types.casts(), self.value_type_id, self.value_type_name)?;
            (self.to_u32)(casted.payload()?)
        };
        let raw = raw.ok_or_else(|| Error::TypeMismatch {
            expected: self.info.name.clone(),
            actual: value.type_name().to_string(),
            allow_inheritance: false,
        })?;
        self.validate(raw)
    }

    /// Build an enum Value from its integral value.
    pub fn from_value(&self, value: u32) -> Result<Value<'static>> {
        let value = self.validate(value)?;
        let boxed = (self.from_u32)(value).ok_or_else(|| Error::InvalidEnumValue {
            enum_name: self.info.name.clone(),
            value,
        })?;
        Ok(Value::from_boxed(boxed))
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumType")
            .field("name", &self.info.name)
            .field("hash", &self.info.hash)
            .field("elements", &self.elements)
            .finish()
    }
}

impl Type for EnumType {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn hash(&self) -> TypeHash {
        self.info.hash
    }

    fn kind(&self) -> Kind {
        Kind::Enum
    }

    fn value_type_id(&self) -> Option<TypeId> {
        Some(self.value_type_id)
    }

    fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    fn write_to(&self, types: &TypeSystem, stream: &mut BitStream, value: &Value<'_>) -> Result<()> {
        let raw = self.to_value(types, value)?;
        stream.write_u32(raw)?;
        Ok(())
    }

    fn read_from(&self, _types: &TypeSystem, stream: &mut BitStream) -> Result<Value<'static>> {
        let raw = stream.read_u32()?;
        self.from_value(raw)
    }

    fn as_enum(&self) -> Option<&EnumType> {
        Some(self)
    }
}
