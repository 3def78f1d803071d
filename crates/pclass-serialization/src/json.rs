//! JSON serialization of object graphs.
//!
//! Each object becomes a JSON object holding its type hash under
//! `_pclass_meta.type_hash` and one key per property. Arrays and lists become
//! JSON arrays, class-typed values nest as objects, and null references are
//! `null`.

use pclass_core::{
    Error, ObjectSlot, Property, PropertyClass, PropertyMut, Result, Type, TypeHash, TypeSystem,
    assert_type_match,
};
use serde_json::{Map, Value as Json, json};

use crate::flags::{SerializerFlags, is_visible};

/// Key of the metadata object stored in every serialized object.
pub const META_KEY: &str = "_pclass_meta";

/// Key of the type hash inside the metadata object.
pub const TYPE_HASH_KEY: &str = "type_hash";

/// Reads and writes objects as JSON documents.
#[derive(Debug, Clone, Copy)]
pub struct JsonSerializer<'a> {
    types: &'a TypeSystem,
    is_file: bool,
    flags: SerializerFlags,
}

impl<'a> JsonSerializer<'a> {
    /// Create a serializer over `types`. File mode pretty-prints.
    pub fn new(types: &'a TypeSystem, is_file: bool) -> Self {
        Self {
            types,
            is_file,
            flags: SerializerFlags::empty(),
        }
    }

    /// Set the serializer flags. Only `WRITE_PUBLIC_ONLY` applies to JSON.
    pub fn with_flags(mut self, flags: SerializerFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn types(&self) -> &'a TypeSystem {
        self.types
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    pub fn flags(&self) -> SerializerFlags {
        self.flags
    }

    /// Render `object` as a JSON document.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn save(&self, object: Option<&dyn PropertyClass>) -> Result<String> {
        let json = self.save_object(object)?;
        let text = if self.is_file {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        Ok(text)
    }

    /// Build an object from a document written by [`save`](Self::save).
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn load(&self, text: &str) -> Result<ObjectSlot> {
        let json: Json = serde_json::from_str(text)?;
        self.load_object(&json)
    }

    /// Convert `object` to a JSON value.
    pub fn save_object(&self, object: Option<&dyn PropertyClass>) -> Result<Json> {
        let Some(object) = object else {
            return Ok(Json::Null);
        };

        let class = self.types.class_of(object)?;
        log::trace!("saving object '{}' as json", class.name());

        let mut map = Map::new();
        map.insert(
            META_KEY.to_string(),
            json!({ TYPE_HASH_KEY: class.hash().as_u32() }),
        );
        for index in 0..class.property_count() {
            let property = class.property_at(self.types, object, index)?;
            if is_visible(self.flags, property.flags()) {
                map.insert(property.name().to_string(), self.save_property(&property)?);
            }
        }
        Ok(Json::Object(map))
    }

    fn save_property(&self, property: &Property<'_>) -> Result<Json> {
        if !property.is_array() {
            return self.save_element(property, 0);
        }
        let elements = (0..property.element_count()?)
            .map(|element| self.save_element(property, element))
            .collect::<Result<Vec<_>>>()?;
        Ok(Json::Array(elements))
    }

    fn save_element(&self, property: &Property<'_>, element: usize) -> Result<Json> {
        if !property.is_object() {
            return property.save_json(element);
        }
        let object = property.get_object(element)?;
        if let Some(object) = object {
            assert_type_match(property.property_type(), self.types.class_of(object)?, true)?;
        }
        self.save_object(object)
    }

    /// Build an object from a JSON value.
    pub fn load_object(&self, json: &Json) -> Result<ObjectSlot> {
        let map = match json {
            Json::Null => return Ok(None),
            Json::Object(map) => map,
            other => {
                return Err(Error::Format(format!(
                    "expected an object or null, found {other}"
                )));
            }
        };

        let hash = map
            .get(META_KEY)
            .and_then(|meta| meta.get(TYPE_HASH_KEY))
            .and_then(Json::as_u64)
            .and_then(|hash| u32::try_from(hash).ok())
            .ok_or_else(|| Error::Format(format!("object has no {META_KEY}.{TYPE_HASH_KEY}")))?;
        let class = self.types.get_class_by_hash(TypeHash(hash))?;
        log::trace!("loading object '{}' from json", class.name());

        let mut object = class.instantiate()?;
        for index in 0..class.property_count() {
            let mut property = class.property_at_mut(self.types, &mut *object, index)?;
            if !is_visible(self.flags, property.flags()) {
                continue;
            }
            let value = map
                .get(property.name())
                .ok_or_else(|| Error::MissingProperty {
                    class: class.name().to_string(),
                    property: property.name().to_string(),
                })?;
            self.load_property(&mut property, value)?;
        }
        Ok(Some(object))
    }

    fn load_property(&self, property: &mut PropertyMut<'_>, json: &Json) -> Result<()> {
        if !property.is_array() {
            return self.load_element(property, 0, json);
        }

        let items = json.as_array().ok_or_else(|| {
            Error::Format(format!("property '{}' expects an array", property.name()))
        })?;
        if property.is_dynamic() {
            property.set_element_count(items.len())?;
        } else {
            let count = property.element_count()?;
            if items.len() != count {
                return Err(Error::Format(format!(
                    "property '{}' holds {count} elements, found {}",
                    property.name(),
                    items.len()
                )));
            }
        }
        for (element, item) in items.iter().enumerate() {
            self.load_element(property, element, item)?;
        }
        Ok(())
    }

    fn load_element(&self, property: &mut PropertyMut<'_>, element: usize, json: &Json) -> Result<()> {
        if property.is_object() {
            let object = self.load_object(json)?;
            property.set_object(element, object)
        } else {
            property.load_json(element, json)
        }
    }
}
