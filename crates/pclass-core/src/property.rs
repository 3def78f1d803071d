//! Properties: named, flagged bindings between an object field and a Type.
//!
//! A [`PropertyDef`] is declared once per class and shared by every
//! instance. It knows the property's name, flags, registered type name, and
//! how to reach the field inside an object through a [`PropertyAccess`].
//!
//! Binding a definition to an object produces a view: [`Property`] for
//! reading and [`PropertyMut`] for writing. Views expose the field as
//! [`Value`]s, so generic code (the serializers in particular) can move data
//! in and out without knowing the Rust type of the field.
//!
//! # Example
//!
//! ```
//! use pclass_core::{ClassType, PropertyDef, PropertyFlags, TypeSystem, Value, impl_property_class};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Point { x: i32, tags: Vec<String> }
//! impl_property_class!(Point, "class Point");
//!
//! let mut types = TypeSystem::with_primitives().unwrap();
//! types
//!     .define_class(
//!         ClassType::builder::<Point>("class Point")
//!             .with_property(
//!                 PropertyDef::field("x", "int", |p: &Point| &p.x, |p: &mut Point| &mut p.x)
//!                     .with_flags(PropertyFlags::PUBLIC),
//!             )
//!             .with_property(PropertyDef::list(
//!                 "tags",
//!                 "std::string",
//!                 |p: &Point| &p.tags,
//!                 |p: &mut Point| &mut p.tags,
//!             )),
//!     )
//!     .unwrap();
//!
//! let class = types.get_class("class Point").unwrap();
//! let mut point = Point::default();
//! class.property_mut(&types, &mut point, "x").unwrap().set_value(0, Value::new(5u8)).unwrap();
//! assert_eq!(point.x, 5);
//! ```

use std::any::TypeId;
use std::fmt;

use bitflags::bitflags;

use crate::types::{Kind, Type, assert_type_match};
use crate::{
    BitStream, Error, ObjectSlot, PropertyClass, Reflect, Result, TypeSystem, Value, ValueError,
};

bitflags! {
    /// Flags describing how a property participates in copying,
    /// serialization, and scripting.
    ///
    /// Only [`PUBLIC`](Self::PUBLIC) changes serializer behavior, when the
    /// serializer is asked to write public properties only. The remaining
    /// flags are carried for callers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        /// Saved to persistent storage.
        const SAVE = 1 << 0;
        /// Copied when the object is cloned.
        const COPY = 1 << 1;
        /// Visible to untrusted consumers.
        const PUBLIC = 1 << 2;
        /// Replicated over the network.
        const TRANSMIT = 1 << 3;
        /// Replicated to privileged clients only.
        const PRIVILEGED_TRANSMIT = 1 << 5;
        /// Persisted in the database.
        const PERSIST = 1 << 8;
        /// Kept only for reading old data.
        const DEPRECATED = 1 << 9;
        /// Hidden from scripts.
        const NOSCRIPT = 1 << 10;
        /// Sent as a delta against the previous state.
        const DELTA_ENCODE = 1 << 11;
        /// Opaque binary data.
        const BLOB = 1 << 12;
    }
}

// ============================================================================
// Access strategies
// ============================================================================

/// Type-erased access to a field inside an object.
///
/// `element` and `element_mut` return `None` when the object is not of the
/// class the accessor was built for, or when the index is out of range.
pub trait PropertyAccess: Send + Sync {
    /// Rust type of the class that owns the field.
    fn class_type_id(&self) -> TypeId;

    /// Rust name of the class that owns the field.
    fn class_type_name(&self) -> &'static str;

    /// Rust type of a single element.
    fn value_type_id(&self) -> TypeId;

    /// Rust name of a single element.
    fn value_type_name(&self) -> &'static str;

    /// Check if the field holds a sequence rather than a single value.
    fn is_array(&self) -> bool {
        false
    }

    /// Check if the element count can change.
    fn is_dynamic(&self) -> bool {
        false
    }

    /// Number of elements, or `None` for a foreign object.
    fn element_count(&self, object: &dyn PropertyClass) -> Option<usize>;

    /// Resize a dynamic property. Returns `false` for a foreign object.
    fn set_element_count(&self, object: &mut dyn PropertyClass, count: usize) -> bool {
        let _ = (object, count);
        false
    }

    /// Borrow one element.
    fn element<'a>(&self, object: &'a dyn PropertyClass, index: usize) -> Option<&'a dyn Reflect>;

    /// Mutably borrow one element.
    fn element_mut<'a>(
        &self,
        object: &'a mut dyn PropertyClass,
        index: usize,
    ) -> Option<&'a mut dyn Reflect>;
}

struct FieldAccess<C, T> {
    get: fn(&C) -> &T,
    get_mut: fn(&mut C) -> &mut T,
}

impl<C: PropertyClass, T: Reflect> PropertyAccess for FieldAccess<C, T> {
    fn class_type_id(&self) -> TypeId {
        TypeId::of::<C>()
    }

    fn class_type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn element_count(&self, object: &dyn PropertyClass) -> Option<usize> {
        object.downcast_ref::<C>().map(|_| 1)
    }

    fn element<'a>(&self, object: &'a dyn PropertyClass, index: usize) -> Option<&'a dyn Reflect> {
        if index != 0 {
            return None;
        }
        let object = object.downcast_ref::<C>()?;
        Some((self.get)(object) as &dyn Reflect)
    }

    fn element_mut<'a>(
        &self,
        object: &'a mut dyn PropertyClass,
        index: usize,
    ) -> Option<&'a mut dyn Reflect> {
        if index != 0 {
            return None;
        }
        let object = object.downcast_mut::<C>()?;
        Some((self.get_mut)(object) as &mut dyn Reflect)
    }
}

struct ArrayAccess<C, T, const N: usize> {
    get: fn(&C) -> &[T; N],
    get_mut: fn(&mut C) -> &mut [T; N],
}

impl<C: PropertyClass, T: Reflect, const N: usize> PropertyAccess for ArrayAccess<C, T, N> {
    fn class_type_id(&self) -> TypeId {
        TypeId::of::<C>()
    }

    fn class_type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn is_array(&self) -> bool {
        true
    }

    fn element_count(&self, object: &dyn PropertyClass) -> Option<usize> {
        object.downcast_ref::<C>().map(|_| N)
    }

    fn element<'a>(&self, object: &'a dyn PropertyClass, index: usize) -> Option<&'a dyn Reflect> {
        let object = object.downcast_ref::<C>()?;
        (self.get)(object).get(index).map(|v| v as &dyn Reflect)
    }

    fn element_mut<'a>(
        &self,
        object: &'a mut dyn PropertyClass,
        index: usize,
    ) -> Option<&'a mut dyn Reflect> {
        let object = object.downcast_mut::<C>()?;
        (self.get_mut)(object)
            .get_mut(index)
            .map(|v| v as &mut dyn Reflect)
    }
}

struct ListAccess<C, T> {
    get: fn(&C) -> &Vec<T>,
    get_mut: fn(&mut C) -> &mut Vec<T>,
}

impl<C: PropertyClass, T: Reflect + Default> PropertyAccess for ListAccess<C, T> {
    fn class_type_id(&self) -> TypeId {
        TypeId::of::<C>()
    }

    fn class_type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn is_array(&self) -> bool {
        true
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn element_count(&self, object: &dyn PropertyClass) -> Option<usize> {
        object.downcast_ref::<C>().map(|o| (self.get)(o).len())
    }

    fn set_element_count(&self, object: &mut dyn PropertyClass, count: usize) -> bool {
        match object.downcast_mut::<C>() {
            Some(object) => {
                (self.get_mut)(object).resize_with(count, T::default);
                true
            }
            None => false,
        }
    }

    fn element<'a>(&self, object: &'a dyn PropertyClass, index: usize) -> Option<&'a dyn Reflect> {
        let object = object.downcast_ref::<C>()?;
        (self.get)(object).get(index).map(|v| v as &dyn Reflect)
    }

    fn element_mut<'a>(
        &self,
        object: &'a mut dyn PropertyClass,
        index: usize,
    ) -> Option<&'a mut dyn Reflect> {
        let object = object.downcast_mut::<C>()?;
        (self.get_mut)(object)
            .get_mut(index)
            .map(|v| v as &mut dyn Reflect)
    }
}

// ============================================================================
// PropertyDef
// ============================================================================

/// Declaration of a property on a class.
pub struct PropertyDef {
    name: String,
    type_name: String,
    flags: PropertyFlags,
    access: Box<dyn PropertyAccess>,
}

impl PropertyDef {
    /// A single-valued field of type `T` on class `C`.
    ///
    /// `type_name` is the registered name of the field's type. Class-typed
    /// fields are [`ObjectSlot`]s.
    pub fn field<C: PropertyClass, T: Reflect>(
        name: impl Into<String>,
        type_name: impl Into<String>,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> Self {
        Self::custom(name, type_name, Box::new(FieldAccess { get, get_mut }))
    }

    /// A fixed-size array field.
    pub fn array<C: PropertyClass, T: Reflect, const N: usize>(
        name: impl Into<String>,
        type_name: impl Into<String>,
        get: fn(&C) -> &[T; N],
        get_mut: fn(&mut C) -> &mut [T; N],
    ) -> Self {
        Self::custom(name, type_name, Box::new(ArrayAccess { get, get_mut }))
    }

    /// A dynamic list field.
    pub fn list<C: PropertyClass, T: Reflect + Default>(
        name: impl Into<String>,
        type_name: impl Into<String>,
        get: fn(&C) -> &Vec<T>,
        get_mut: fn(&mut C) -> &mut Vec<T>,
    ) -> Self {
        Self::custom(name, type_name, Box::new(ListAccess { get, get_mut }))
    }

    /// A property with a caller-supplied access strategy.
    pub fn custom(
        name: impl Into<String>,
        type_name: impl Into<String>,
        access: Box<dyn PropertyAccess>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            flags: PropertyFlags::empty(),
            access,
        }
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered name of the property's type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Check if the property holds a fixed array or a list.
    pub fn is_array(&self) -> bool {
        self.access.is_array()
    }

    pub fn is_dynamic(&self) -> bool {
        self.access.is_dynamic()
    }

    pub fn access(&self) -> &dyn PropertyAccess {
        self.access.as_ref()
    }
}

impl fmt::Debug for PropertyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDef")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("flags", &self.flags)
            .field("value", &self.access.value_type_name())
            .finish()
    }
}

// ============================================================================
// Views
// ============================================================================

fn foreign_object(def: &PropertyDef, object: &dyn PropertyClass) -> Error {
    Error::TypeMismatch {
        expected: def.access.class_type_name().to_string(),
        actual: object.class_name().to_string(),
        allow_inheritance: true,
    }
}

fn out_of_range(def: &PropertyDef, index: usize, count: usize) -> Error {
    Error::IndexOutOfRange {
        property: def.name.clone(),
        index,
        count,
    }
}

/// A property bound to an object for reading.
pub struct Property<'a> {
    types: &'a TypeSystem,
    def: &'a PropertyDef,
    ty: &'a dyn Type,
    object: &'a dyn PropertyClass,
}

impl<'a> Property<'a> {
    pub(crate) fn new(
        types: &'a TypeSystem,
        def: &'a PropertyDef,
        ty: &'a dyn Type,
        object: &'a dyn PropertyClass,
    ) -> Self {
        Self {
            types,
            def,
            ty,
            object,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.def.name
    }

    pub fn flags(&self) -> PropertyFlags {
        self.def.flags
    }

    pub fn def(&self) -> &'a PropertyDef {
        self.def
    }

    /// The property's registered type.
    pub fn property_type(&self) -> &'a dyn Type {
        self.ty
    }

    /// Check if the property holds objects.
    pub fn is_object(&self) -> bool {
        self.ty.kind() == Kind::Class
    }

    pub fn is_array(&self) -> bool {
        self.def.is_array()
    }

    pub fn is_dynamic(&self) -> bool {
        self.def.is_dynamic()
    }

    pub fn element_count(&self) -> Result<usize> {
        self.def
            .access
            .element_count(self.object)
            .ok_or_else(|| foreign_object(self.def, self.object))
    }

    fn element(&self, index: usize) -> Result<&'a dyn Reflect> {
        let count = self.element_count()?;
        self.def
            .access
            .element(self.object, index)
            .ok_or_else(|| out_of_range(self.def, index, count))
    }

    /// A reference Value for one element.
    pub fn get_value(&self, index: usize) -> Result<Value<'a>> {
        Ok(Value::from_dyn(self.element(index)?))
    }

    /// The object held by a class-typed element.
    pub fn get_object(&self, index: usize) -> Result<Option<&'a dyn PropertyClass>> {
        let element = self.element(index)?;
        let slot = element
            .as_any()
            .downcast_ref::<ObjectSlot>()
            .ok_or_else(|| ValueError::TypeMismatch {
                expected: std::any::type_name::<ObjectSlot>(),
                actual: element.reflect_type_name(),
            })?;
        Ok(slot.as_deref())
    }

    /// Write one element through the property's type.
    pub fn write_value_to(&self, stream: &mut BitStream, index: usize) -> Result<()> {
        let value = self.get_value(index)?;
        self.ty.write_to(self.types, stream, &value)
    }

    /// One element as JSON. Enum values are checked against the declared
    /// elements.
    pub fn save_json(&self, index: usize) -> Result<serde_json::Value> {
        if let Some(enum_type) = self.ty.as_enum() {
            let raw = enum_type.to_value(self.types, &self.get_value(index)?)?;
            return Ok(serde_json::Value::from(raw));
        }
        let mut json = self.get_value(index)?.cast::<serde_json::Value>(self.types.casts())?;
        Ok(*json.release::<serde_json::Value>()?)
    }
}

impl fmt::Debug for Property<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.def.name)
            .field("type", &self.ty.name())
            .finish()
    }
}

/// A property bound to an object for writing.
pub struct PropertyMut<'a> {
    types: &'a TypeSystem,
    def: &'a PropertyDef,
    ty: &'a dyn Type,
    object: &'a mut dyn PropertyClass,
}

impl<'a> PropertyMut<'a> {
    pub(crate) fn new(
        types: &'a TypeSystem,
        def: &'a PropertyDef,
        ty: &'a dyn Type,
        object: &'a mut dyn PropertyClass,
    ) -> Self {
        Self {
            types,
            def,
            ty,
            object,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.def.name
    }

    pub fn flags(&self) -> PropertyFlags {
        self.def.flags
    }

    /// The property's registered type.
    pub fn property_type(&self) -> &'a dyn Type {
        self.ty
    }

    /// Check if the property holds objects.
    pub fn is_object(&self) -> bool {
        self.ty.kind() == Kind::Class
    }

    pub fn is_array(&self) -> bool {
        self.def.is_array()
    }

    pub fn is_dynamic(&self) -> bool {
        self.def.is_dynamic()
    }

    /// A read-only view of the same property.
    pub fn as_property(&self) -> Property<'_> {
        Property::new(self.types, self.def, self.ty, &*self.object)
    }

    pub fn element_count(&self) -> Result<usize> {
        self.as_property().element_count()
    }

    /// Resize a dynamic property, filling new slots with defaults.
    pub fn set_element_count(&mut self, count: usize) -> Result<()> {
        if !self.def.is_dynamic() {
            return Err(Error::NotDynamic(self.def.name.clone()));
        }
        if self.def.access.set_element_count(&mut *self.object, count) {
            Ok(())
        } else {
            Err(foreign_object(self.def, &*self.object))
        }
    }

    fn element_mut(&mut self, index: usize) -> Result<&mut dyn Reflect> {
        let count = self.element_count()?;
        self.def
            .access
            .element_mut(&mut *self.object, index)
            .ok_or_else(|| out_of_range(self.def, index, count))
    }

    /// Store a Value into one element, casting it to the element type.
    ///
    /// Object values are checked against the declared class and enum values
    /// against the declared elements.
    pub fn set_value(&mut self, index: usize, value: Value<'_>) -> Result<()> {
        if self.is_object() {
            let object = value
                .into_boxed()?
                .into_any()
                .downcast::<ObjectSlot>()
                .map_err(|_| ValueError::TypeMismatch {
                    expected: std::any::type_name::<ObjectSlot>(),
                    actual: "non-object value",
                })?;
            return self.set_object(index, *object);
        }

        if let Some(enum_type) = self.ty.as_enum() {
            let raw = enum_type.to_value(self.types, &value)?;
            let member = enum_type.from_value(raw)?.into_boxed()?;
            self.element_mut(index)?.assign(member)?;
            return Ok(());
        }

        let target = self.def.access.value_type_id();
        let boxed = if value.type_id() == target {
            value.into_boxed()?
        } else {
            value
                .cast_to(self.types.casts(), target, self.def.access.value_type_name())?
                .into_boxed()?
        };
        self.element_mut(index)?.assign(boxed)?;
        Ok(())
    }

    /// Store an object into a class-typed element.
    ///
    /// The object's class must be the declared class or derive from it.
    pub fn set_object(&mut self, index: usize, object: ObjectSlot) -> Result<()> {
        if let Some(object) = object.as_deref() {
            let actual = self.types.class_of(object)?;
            assert_type_match(self.ty, actual, true)?;
        }
        let element = self.element_mut(index)?;
        let actual = element.reflect_type_name();
        let slot = element
            .as_any_mut()
            .downcast_mut::<ObjectSlot>()
            .ok_or(ValueError::TypeMismatch {
                expected: std::any::type_name::<ObjectSlot>(),
                actual,
            })?;
        *slot = object;
        Ok(())
    }

    /// Read one element through the property's type.
    pub fn read_value_from(&mut self, stream: &mut BitStream, index: usize) -> Result<()> {
        let value = self.ty.read_from(self.types, stream)?;
        self.set_value(index, value)
    }

    /// Load one element from JSON.
    pub fn load_json(&mut self, index: usize, json: &serde_json::Value) -> Result<()> {
        self.set_value(index, Value::reference(json))
    }
}

impl fmt::Debug for PropertyMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMut")
            .field("name", &self.def.name)
            .field("type", &self.ty.name())
            .finish()
    }
}
