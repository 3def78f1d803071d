//! Runtime reflection and serialization for property classes.
//!
//! `pclass` describes Rust types to a [`TypeSystem`] at startup, then walks
//! objects generically: reading and writing their properties as type-erased
//! [`Value`]s, converting between value types through a [`CastTable`], and
//! serializing whole object graphs to a packed [`BitStream`] or to JSON.
//!
//! # Example
//!
//! ```
//! use pclass::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Item {
//!     id: u32,
//!     name: String,
//! }
//! impl_property_class!(Item, "class Item");
//!
//! let mut types = TypeSystem::with_primitives().unwrap();
//! types
//!     .define_class(
//!         ClassType::builder::<Item>("class Item")
//!             .with_property(PropertyDef::field(
//!                 "id",
//!                 "unsigned int",
//!                 |i: &Item| &i.id,
//!                 |i: &mut Item| &mut i.id,
//!             ))
//!             .with_property(PropertyDef::field(
//!                 "name",
//!                 "std::string",
//!                 |i: &Item| &i.name,
//!                 |i: &mut Item| &mut i.name,
//!             )),
//!     )
//!     .unwrap();
//!
//! let item = Item { id: 7, name: "Wand".into() };
//! let serializer = BinarySerializer::new(&types, true, SerializerFlags::empty());
//! let mut stream = BitStream::new();
//! serializer.save(Some(&item), &mut stream).unwrap();
//!
//! stream.seek(0).unwrap();
//! let loaded = serializer.load(&mut stream).unwrap().unwrap();
//! assert_eq!(loaded.downcast_ref::<Item>(), Some(&item));
//! ```

pub use pclass_core::*;
pub use pclass_serialization::{
    BinarySerializer, JsonSerializer, SerializerFlags, UnknownTypePolicy, binary, flags, json,
};

pub mod prelude {
    pub use pclass_core::{
        Bi, BitStream, Bui, CastTable, ClassType, EnumType, Error, Kind, ObjectSlot,
        PropertyClass, PropertyDef, PropertyFlags, Reflect, ReflectEnum, Type,
        TypeHash, TypeSystem, Value, WideString, impl_property_class, impl_reflect_enum,
    };
    pub use pclass_serialization::{
        BinarySerializer, JsonSerializer, SerializerFlags, UnknownTypePolicy,
    };
}
