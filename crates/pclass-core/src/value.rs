//! Type-erased value container.
//!
//! [`Value`] holds exactly one logical value of any [`Reflect`] type, either
//! owning it or borrowing it from somewhere else. It remembers the identity
//! of the stored type so that it can be checked ([`Value::is`]), accessed
//! ([`Value::get`]), or converted through the cast table ([`Value::cast`])
//! without static knowledge of what it holds.
//!
//! # Example
//!
//! ```
//! use pclass_core::Value;
//!
//! let owned = Value::new(42i32);
//! assert!(owned.is::<i32>());
//! assert!(!owned.is_reference());
//!
//! let x = 7u8;
//! let borrowed = Value::reference(&x);
//! assert!(borrowed.is_reference());
//! assert_eq!(*borrowed.get::<u8>().unwrap(), 7);
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use crate::{CastTable, Result, ValueError};

/// Object-safe view of any value a [`Value`] can hold.
///
/// Implemented for every `'static` type that is `Clone + Debug + Send + Sync`.
pub trait Reflect: Any + Send + Sync + fmt::Debug {
    /// Upcast to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcast to mutable `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcast a box to `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Deep-copy into a new box.
    fn clone_reflect(&self) -> Box<dyn Reflect>;

    /// The Rust name of the concrete type.
    fn reflect_type_name(&self) -> &'static str;

    /// Replace `self` with the boxed value, which must be of the same type.
    fn assign(&mut self, value: Box<dyn Reflect>) -> std::result::Result<(), ValueError>;
}

impl<T: Any + Clone + Send + Sync + fmt::Debug> Reflect for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_reflect(&self) -> Box<dyn Reflect> {
        Box::new(self.clone())
    }

    fn reflect_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn assign(&mut self, value: Box<dyn Reflect>) -> std::result::Result<(), ValueError> {
        let actual = value.reflect_type_name();
        match value.into_any().downcast::<T>() {
            Ok(value) => {
                *self = *value;
                Ok(())
            }
            Err(_) => Err(ValueError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual,
            }),
        }
    }
}

enum Payload<'a> {
    Owned(Box<dyn Reflect>),
    Borrowed(&'a dyn Reflect),
    /// Ownership was handed to the caller of [`Value::release`].
    Released,
}

/// A type-erased container for exactly one value.
///
/// Owned payloads are dropped with the Value; borrowed payloads are never
/// touched. Cloning deep-copies an owned payload and shares a borrowed one.
pub struct Value<'a> {
    payload: Payload<'a>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Value<'static> {
    /// Create a Value that owns `value`.
    pub fn new<T: Reflect>(value: T) -> Self {
        Self {
            payload: Payload::Owned(Box::new(value)),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a Value that owns an already-boxed payload.
    pub fn from_boxed(value: Box<dyn Reflect>) -> Self {
        Self {
            type_id: value.as_any().type_id(),
            type_name: value.reflect_type_name(),
            payload: Payload::Owned(value),
        }
    }
}

impl<'a> Value<'a> {
    /// Create a Value that borrows `value`.
    pub fn reference<T: Reflect>(value: &'a T) -> Self {
        Self {
            payload: Payload::Borrowed(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a Value that borrows a type-erased payload.
    pub fn from_dyn(value: &'a dyn Reflect) -> Self {
        Self {
            type_id: value.as_any().type_id(),
            type_name: value.reflect_type_name(),
            payload: Payload::Borrowed(value),
        }
    }

    /// Check if the stored value is a `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Identity of the stored type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust name of the stored type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check if this Value does not own its payload.
    ///
    /// A released Value is a reference: its payload now belongs elsewhere.
    pub fn is_reference(&self) -> bool {
        !matches!(self.payload, Payload::Owned(_))
    }

    /// Check if ownership has been released.
    pub fn is_released(&self) -> bool {
        matches!(self.payload, Payload::Released)
    }

    /// The stored payload.
    pub fn payload(&self) -> std::result::Result<&dyn Reflect, ValueError> {
        match &self.payload {
            Payload::Owned(value) => Ok(value.as_ref()),
            Payload::Borrowed(value) => Ok(*value),
            Payload::Released => Err(ValueError::Released {
                type_name: self.type_name,
            }),
        }
    }

    fn mismatch<T>(&self) -> ValueError {
        ValueError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: self.type_name,
        }
    }

    /// Borrow the stored value as a `T`.
    pub fn get<T: Any>(&self) -> std::result::Result<&T, ValueError> {
        if !self.is::<T>() {
            return Err(self.mismatch::<T>());
        }
        self.payload()?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Mutably borrow the stored value as a `T`. Requires ownership.
    pub fn get_mut<T: Any>(&mut self) -> std::result::Result<&mut T, ValueError> {
        if !self.is::<T>() {
            return Err(self.mismatch::<T>());
        }
        let expected = std::any::type_name::<T>();
        let actual = self.type_name;
        match &mut self.payload {
            Payload::Owned(value) => value
                .as_any_mut()
                .downcast_mut::<T>()
                .ok_or(ValueError::TypeMismatch { expected, actual }),
            Payload::Borrowed(_) => Err(ValueError::NotOwned { type_name: actual }),
            Payload::Released => Err(ValueError::Released { type_name: actual }),
        }
    }

    /// Convert to a `T`, producing a new owned Value.
    ///
    /// A Value that already holds a `T` is copied; anything else goes through
    /// the caster declared for (stored type, `T`).
    pub fn cast<T: Reflect>(&self, casts: &CastTable) -> Result<Value<'static>> {
        self.cast_to(casts, TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Convert to the type identified by `dest`, producing a new owned Value.
    pub fn cast_to(
        &self,
        casts: &CastTable,
        dest: TypeId,
        dest_name: &'static str,
    ) -> Result<Value<'static>> {
        if self.type_id == dest {
            return Ok(Value::from_boxed(self.payload()?.clone_reflect()));
        }
        let casted = casts.cast(self, dest, dest_name)?;
        Ok(Value::from_boxed(casted))
    }

    /// Produce an owned copy of the referenced `T`.
    pub fn dereference<T: Reflect>(&self) -> std::result::Result<Value<'static>, ValueError> {
        let value = self.get::<T>()?;
        Ok(Value::from_boxed(value.clone_reflect()))
    }

    /// Move the payload out, leaving this Value as a released reference.
    ///
    /// Fails if this Value does not own its payload (including a second
    /// release), or if the stored type is not `T`.
    pub fn release<T: Any>(&mut self) -> std::result::Result<Box<T>, ValueError> {
        if self.is_reference() {
            return Err(ValueError::NotOwned {
                type_name: self.type_name,
            });
        }
        if !self.is::<T>() {
            return Err(self.mismatch::<T>());
        }
        let mismatch = self.mismatch::<T>();
        match std::mem::replace(&mut self.payload, Payload::Released) {
            Payload::Owned(value) => value.into_any().downcast::<T>().map_err(|_| mismatch),
            other => {
                self.payload = other;
                Err(ValueError::NotOwned {
                    type_name: self.type_name,
                })
            }
        }
    }

    /// Convert into an owned box, copying a borrowed payload.
    pub fn into_boxed(self) -> std::result::Result<Box<dyn Reflect>, ValueError> {
        match self.payload {
            Payload::Owned(value) => Ok(value),
            Payload::Borrowed(value) => Ok(value.clone_reflect()),
            Payload::Released => Err(ValueError::Released {
                type_name: self.type_name,
            }),
        }
    }
}

impl Clone for Value<'_> {
    fn clone(&self) -> Self {
        let payload = match &self.payload {
            Payload::Owned(value) => Payload::Owned((**value).clone_reflect()),
            Payload::Borrowed(value) => Payload::Borrowed(*value),
            Payload::Released => Payload::Released,
        };
        Self {
            payload,
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Value");
        s.field("type", &self.type_name);
        match &self.payload {
            Payload::Owned(value) => s.field("owned", value),
            Payload::Borrowed(value) => s.field("borrowed", value),
            Payload::Released => s.field("released", &true),
        };
        s.finish()
    }
}
