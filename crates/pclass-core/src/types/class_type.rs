//! Class types.
//!
//! A [`ClassType`] describes a reflectable object: its optional base class,
//! its ordered properties (inherited first, then declared), and a factory
//! for blank instances.
//!
//! Inheritance is resolved once, when the class is registered: the base
//! chain is flattened into an ancestor table so `inherits` never walks the
//! registry, and the base's properties are copied in front of the declared
//! ones together with how many `base()` steps reach their owner.
//!
//! On the wire a class value is an object reference: a 32-bit type hash
//! (0 for null) followed by every property in order. List-like properties
//! carry a 32-bit element count.
//!
//! [`Type::write_to`] and [`Type::read_from`] on a class always use this
//! plain layout: every property, no size field, no flags word. It matches a
//! wire-mode `BinarySerializer` with no flags, and nothing else. File mode,
//! public-only filtering and unknown-type skipping belong to the serializer.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use super::{Kind, Type, TypeInfo, assert_type_match};
use crate::{
    BitStream, Error, ObjectSlot, Property, PropertyClass, PropertyDef, PropertyMut,
    RegistrationError, Result, StreamError, TypeHash, TypeSystem, Value,
};

/// A property as seen from one class, inherited or declared.
#[derive(Debug, Clone)]
pub struct ClassProperty {
    def: Arc<PropertyDef>,
    type_hash: TypeHash,
    depth: usize,
}

impl ClassProperty {
    pub fn def(&self) -> &PropertyDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Hash of the property's registered type.
    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    /// Number of `base()` steps from an instance to the field's owner.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

fn make_instance<C: PropertyClass + Default>() -> Box<dyn PropertyClass> {
    Box::new(C::default())
}

/// Builder for a [`ClassType`].
pub struct ClassBuilder {
    name: String,
    base: Option<String>,
    properties: Vec<PropertyDef>,
    factory: fn() -> Box<dyn PropertyClass>,
    object_type_id: TypeId,
    object_type_name: &'static str,
}

impl ClassBuilder {
    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derive from a registered class.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Declare a property.
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    fn invalid_base(&self, base: &str, reason: &'static str) -> RegistrationError {
        RegistrationError::InvalidBaseClass {
            name: self.name.clone(),
            base: base.to_string(),
            reason,
        }
    }

    /// Resolve the base and the property types against `types`.
    pub fn build(
        self,
        hash: TypeHash,
        types: &TypeSystem,
    ) -> std::result::Result<ClassType, RegistrationError> {
        let sample = (self.factory)();
        if sample.class_name() != self.name {
            return Err(RegistrationError::ClassNameMismatch {
                name: self.name,
                class_name: sample.class_name(),
            });
        }

        let mut ancestors = Vec::new();
        let mut properties = Vec::new();
        let base = match &self.base {
            None => None,
            Some(base_name) => {
                let base = types
                    .get_type(base_name)
                    .map_err(|_| self.invalid_base(base_name, "not registered"))?;
                if base.kind() != Kind::Class {
                    return Err(self.invalid_base(base_name, "not a class"));
                }
                let base = base
                    .as_class()
                    .ok_or_else(|| self.invalid_base(base_name, "not a ClassType"))?;
                let embedded = sample
                    .base()
                    .is_some_and(|b| b.object_any().type_id() == base.object_type_id);
                if !embedded {
                    return Err(self.invalid_base(base_name, "instance does not embed the base"));
                }

                ancestors.extend_from_slice(&base.ancestors);
                ancestors.push(base.hash());
                properties.extend(base.properties.iter().map(|p| ClassProperty {
                    def: Arc::clone(&p.def),
                    type_hash: p.type_hash,
                    depth: p.depth + 1,
                }));
                Some(base.hash())
            }
        };

        for def in self.properties {
            if properties.iter().any(|p: &ClassProperty| p.name() == def.name()) {
                return Err(RegistrationError::DuplicateProperty {
                    class: self.name,
                    property: def.name().to_string(),
                });
            }
            if def.access().class_type_id() != self.object_type_id {
                return Err(RegistrationError::PropertyTypeMismatch {
                    class: self.name,
                    property: def.name().to_string(),
                    expected: self.object_type_name,
                    actual: def.access().class_type_name(),
                });
            }

            let (type_hash, value_type_id, value_type_name) = if def.type_name() == self.name {
                (
                    hash,
                    TypeId::of::<ObjectSlot>(),
                    std::any::type_name::<ObjectSlot>(),
                )
            } else {
                let ty = types.get_type(def.type_name()).map_err(|_| {
                    RegistrationError::UnknownPropertyType {
                        class: self.name.clone(),
                        property: def.name().to_string(),
                        type_name: def.type_name().to_string(),
                    }
                })?;
                (ty.hash(), ty.value_type_id().unwrap_or(TypeId::of::<()>()), ty.value_type_name())
            };
            if value_type_id != def.access().value_type_id() {
                return Err(RegistrationError::PropertyTypeMismatch {
                    class: self.name,
                    property: def.name().to_string(),
                    expected: value_type_name,
                    actual: def.access().value_type_name(),
                });
            }

            properties.push(ClassProperty {
                def: Arc::new(def),
                type_hash,
                depth: 0,
            });
        }

        Ok(ClassType {
            info: TypeInfo::new(self.name, hash),
            base,
            ancestors,
            properties,
            factory: self.factory,
            object_type_id: self.object_type_id,
        })
    }
}

/// The [`Type`] of a reflectable object.
pub struct ClassType {
    info: TypeInfo,
    base: Option<TypeHash>,
    /// Every ancestor hash, root first.
    ancestors: Vec<TypeHash>,
    properties: Vec<ClassProperty>,
    factory: fn() -> Box<dyn PropertyClass>,
    object_type_id: TypeId,
}

impl ClassType {
    /// Start describing the class `name`, instantiated as `C::default()`.
    pub fn builder<C: PropertyClass + Default>(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            base: None,
            properties: Vec::new(),
            factory: make_instance::<C>,
            object_type_id: TypeId::of::<C>(),
            object_type_name: std::any::type_name::<C>(),
        }
    }

    /// Hash of the direct base class.
    pub fn base_hash(&self) -> Option<TypeHash> {
        self.base
    }

    /// Every ancestor hash, root first.
    pub fn ancestors(&self) -> &[TypeHash] {
        &self.ancestors
    }

    /// Properties in serialization order.
    pub fn properties(&self) -> &[ClassProperty] {
        &self.properties
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Index of the property called `name`.
    pub fn find_property(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }

    fn class_property(&self, index: usize) -> Result<&ClassProperty> {
        self.properties.get(index).ok_or_else(|| Error::IndexOutOfRange {
            property: self.info.name.clone(),
            index,
            count: self.properties.len(),
        })
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.find_property(name).ok_or_else(|| Error::UnknownProperty {
            class: self.info.name.clone(),
            property: name.to_string(),
        })
    }

    fn detached(&self, class_name: &str) -> Error {
        Error::TypeMismatch {
            expected: self.info.name.clone(),
            actual: class_name.to_string(),
            allow_inheritance: true,
        }
    }

    /// Bind the property at `index` to `object` for reading.
    pub fn property_at<'a>(
        &'a self,
        types: &'a TypeSystem,
        object: &'a dyn PropertyClass,
        index: usize,
    ) -> Result<Property<'a>> {
        let property = self.class_property(index)?;
        let ty = types.get_type_by_hash(property.type_hash)?;
        let owner = object
            .ancestor(property.depth)
            .ok_or_else(|| self.detached(object.class_name()))?;
        Ok(Property::new(types, &property.def, ty, owner))
    }

    /// Bind the property at `index` to `object` for writing.
    pub fn property_at_mut<'a>(
        &'a self,
        types: &'a TypeSystem,
        object: &'a mut dyn PropertyClass,
        index: usize,
    ) -> Result<PropertyMut<'a>> {
        let property = self.class_property(index)?;
        let ty = types.get_type_by_hash(property.type_hash)?;
        let class_name = object.class_name();
        let owner = object
            .ancestor_mut(property.depth)
            .ok_or_else(|| self.detached(class_name))?;
        Ok(PropertyMut::new(types, &property.def, ty, owner))
    }

    /// Bind the property called `name` to `object` for reading.
    pub fn property<'a>(
        &'a self,
        types: &'a TypeSystem,
        object: &'a dyn PropertyClass,
        name: &str,
    ) -> Result<Property<'a>> {
        self.property_at(types, object, self.index_of(name)?)
    }

    /// Bind the property called `name` to `object` for writing.
    pub fn property_mut<'a>(
        &'a self,
        types: &'a TypeSystem,
        object: &'a mut dyn PropertyClass,
        name: &str,
    ) -> Result<PropertyMut<'a>> {
        let index = self.index_of(name)?;
        self.property_at_mut(types, object, index)
    }

    /// Write an object reference: its concrete type hash, then all of its
    /// properties. `None` writes the null hash. This is the wire layout only.
    /// Nested objects carry no size field.
    pub fn write_object(
        &self,
        types: &TypeSystem,
        stream: &mut BitStream,
        object: Option<&dyn PropertyClass>,
    ) -> Result<()> {
        let Some(object) = object else {
            stream.write_u32(TypeHash::NULL.as_u32())?;
            return Ok(());
        };
        let class = types.class_of(object)?;
        assert_type_match(self, class, true)?;
        stream.write_u32(class.hash().as_u32())?;
        class.write_properties(types, stream, object)
    }

    /// Write every property of `object`, which must be an instance of this
    /// exact class.
    pub fn write_properties(
        &self,
        types: &TypeSystem,
        stream: &mut BitStream,
        object: &dyn PropertyClass,
    ) -> Result<()> {
        for index in 0..self.properties.len() {
            let property = self.property_at(types, object, index)?;
            let count = property.element_count()?;
            if property.is_dynamic() {
                stream.write_u32(element_count_u32(property.name(), count)?)?;
            }
            for element in 0..count {
                property.write_value_to(stream, element)?;
            }
        }
        Ok(())
    }

    /// Read an object reference written by [`write_object`](Self::write_object).
    pub fn read_object(&self, types: &TypeSystem, stream: &mut BitStream) -> Result<ObjectSlot> {
        let hash = TypeHash(stream.read_u32()?);
        if hash.is_null() {
            return Ok(None);
        }
        let class = types.get_class_by_hash(hash)?;
        assert_type_match(self, class, true)?;
        let mut object = class.instantiate()?;
        class.read_properties(types, stream, &mut *object)?;
        Ok(Some(object))
    }

    /// Read every property of `object` in order.
    pub fn read_properties(
        &self,
        types: &TypeSystem,
        stream: &mut BitStream,
        object: &mut dyn PropertyClass,
    ) -> Result<()> {
        for index in 0..self.properties.len() {
            let mut property = self.property_at_mut(types, object, index)?;
            let count = if property.is_dynamic() {
                let count = read_element_count(stream)?;
                property.set_element_count(count)?;
                count
            } else {
                property.element_count()?
            };
            for element in 0..count {
                property.read_value_from(stream, element)?;
            }
        }
        Ok(())
    }
}

/// Convert an element count to its 32-bit wire form.
pub fn element_count_u32(property: &str, count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::IndexOutOfRange {
        property: property.to_string(),
        index: count,
        count: u32::MAX as usize,
    })
}

/// Read a 32-bit element count, rejecting counts the rest of the stream
/// cannot hold. Every element occupies at least one bit.
pub fn read_element_count(stream: &mut BitStream) -> Result<usize> {
    let count = stream.read_u32()? as usize;
    let remaining = stream.remaining_bits();
    if count > remaining {
        return Err(StreamError::UnexpectedEof {
            needed: count,
            remaining,
        }
        .into());
    }
    Ok(count)
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassType")
            .field("name", &self.info.name)
            .field("hash", &self.info.hash)
            .field("base", &self.base)
            .field(
                "properties",
                &self.properties.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Type for ClassType {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn hash(&self) -> TypeHash {
        self.info.hash
    }

    fn kind(&self) -> Kind {
        Kind::Class
    }

    fn value_type_id(&self) -> Option<TypeId> {
        Some(TypeId::of::<ObjectSlot>())
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<ObjectSlot>()
    }

    fn write_to(&self, types: &TypeSystem, stream: &mut BitStream, value: &Value<'_>) -> Result<()> {
        let slot = value.get::<ObjectSlot>()?;
        self.write_object(types, stream, slot.as_deref())
    }

    fn read_from(&self, types: &TypeSystem, stream: &mut BitStream) -> Result<Value<'static>> {
        Ok(Value::new(self.read_object(types, stream)?))
    }

    fn instantiate(&self) -> Result<Box<dyn PropertyClass>> {
        Ok((self.factory)())
    }

    fn as_class(&self) -> Option<&ClassType> {
        Some(self)
    }

    fn inherits(&self, other: &dyn Type) -> bool {
        let hash = other.hash();
        self.info.hash == hash || self.ancestors.contains(&hash)
    }
}
