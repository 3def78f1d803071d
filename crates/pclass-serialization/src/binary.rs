//! Binary serialization of object graphs.
//!
//! Objects are written as a 32-bit type hash followed by their properties in
//! declaration order. A null object is the hash `0` and nothing else. In file
//! mode every object header also carries a 32-bit size, counted in bits from
//! the start of the size field to the end of the object, so a reader can
//! validate what it read or jump over types it does not know.
//!
//! ```text
//! [flags: u32]?                      WRITE_SERIALIZER_FLAGS
//! [compression marker: u8]?          COMPRESSED
//! object := hash: u32                0 = null
//!           [size: u32]?             file mode
//!           property*
//! property := [count: u32]? element*
//! ```

use pclass_core::types::{element_count_u32, read_element_count};
use pclass_core::{
    BitStream, Error, ObjectSlot, Property, PropertyClass, PropertyMut, Result, Type, TypeHash,
    TypeSystem, assert_type_match,
};

use crate::flags::{SerializerFlags, UnknownTypePolicy, is_visible};

/// Reads and writes objects as packed bits.
#[derive(Debug, Clone, Copy)]
pub struct BinarySerializer<'a> {
    types: &'a TypeSystem,
    is_file: bool,
    flags: SerializerFlags,
    unknown_types: UnknownTypePolicy,
}

impl<'a> BinarySerializer<'a> {
    /// Create a serializer over `types`.
    ///
    /// `is_file` adds a size field to every object header.
    pub fn new(types: &'a TypeSystem, is_file: bool, flags: SerializerFlags) -> Self {
        Self {
            types,
            is_file,
            flags,
            unknown_types: UnknownTypePolicy::default(),
        }
    }

    /// Set what a file-mode load does with unregistered type hashes.
    pub fn with_unknown_types(mut self, policy: UnknownTypePolicy) -> Self {
        self.unknown_types = policy;
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

    pub fn unknown_types(&self) -> UnknownTypePolicy {
        self.unknown_types
    }

    /// Write `object` at the stream cursor.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn save(&self, object: Option<&dyn PropertyClass>, stream: &mut BitStream) -> Result<()> {
        if self.flags.contains(SerializerFlags::WRITE_SERIALIZER_FLAGS) {
            stream.write_u32(self.flags.bits())?;
        }
        if self.flags.contains(SerializerFlags::COMPRESSED) {
            // Data is always stored uncompressed.
            stream.write_u8(0)?;
        }
        self.save_object(object, stream, self.flags)
    }

    /// Read an object written by [`save`](Self::save).
    ///
    /// When the flags word is present, the stored flags govern the rest of
    /// the load.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn load(&self, stream: &mut BitStream) -> Result<ObjectSlot> {
        let flags = if self.flags.contains(SerializerFlags::WRITE_SERIALIZER_FLAGS) {
            SerializerFlags::from_bits_retain(stream.read_u32()?)
        } else {
            self.flags
        };
        if flags.contains(SerializerFlags::COMPRESSED) && stream.read_u8()? != 0 {
            return Err(Error::Unsupported("compressed serializer data"));
        }
        self.load_object(stream, flags)
    }

    fn save_object(
        &self,
        object: Option<&dyn PropertyClass>,
        stream: &mut BitStream,
        flags: SerializerFlags,
    ) -> Result<()> {
        let Some(object) = object else {
            stream.write_u32(TypeHash::NULL.as_u32())?;
            return Ok(());
        };

        let class = self.types.class_of(object)?;
        log::trace!("saving object '{}'", class.name());
        stream.write_u32(class.hash().as_u32())?;

        let size_pos = stream.tell();
        if self.is_file {
            stream.write_u32(0)?;
        }

        for index in 0..class.property_count() {
            let property = class.property_at(self.types, object, index)?;
            if is_visible(flags, property.flags()) {
                self.save_property(&property, stream, flags)?;
            }
        }

        if self.is_file {
            let end = stream.tell();
            let size = u32::try_from(end - size_pos).map_err(|_| {
                Error::Format(format!("object '{}' is too large for a file header", class.name()))
            })?;
            stream.seek(size_pos)?;
            stream.write_u32(size)?;
            stream.seek(end)?;
        }
        Ok(())
    }

    fn save_property(
        &self,
        property: &Property<'_>,
        stream: &mut BitStream,
        flags: SerializerFlags,
    ) -> Result<()> {
        let count = property.element_count()?;
        if property.is_dynamic() {
            stream.write_u32(element_count_u32(property.name(), count)?)?;
        }

        for element in 0..count {
            if property.is_object() {
                let object = property.get_object(element)?;
                if let Some(object) = object {
                    assert_type_match(property.property_type(), self.types.class_of(object)?, true)?;
                }
                self.save_object(object, stream, flags)?;
            } else {
                property.write_value_to(stream, element)?;
            }
        }
        Ok(())
    }

    fn load_object(&self, stream: &mut BitStream, flags: SerializerFlags) -> Result<ObjectSlot> {
        let hash = TypeHash(stream.read_u32()?);
        if hash.is_null() {
            return Ok(None);
        }

        let size_pos = stream.tell();
        let declared = if self.is_file {
            Some(stream.read_u32()?)
        } else {
            None
        };

        let class = match self.types.get_class_by_hash(hash) {
            Ok(class) => class,
            Err(err) if err.is_resolution() => match (declared, self.unknown_types) {
                (Some(size), UnknownTypePolicy::Skip) => {
                    log::warn!("skipping {size} bits of object with unknown type hash {hash}");
                    stream.seek(size_pos + size as usize)?;
                    return Ok(None);
                }
                _ => return Err(err),
            },
            Err(err) => return Err(err),
        };
        log::trace!("loading object '{}'", class.name());

        let mut object = class.instantiate()?;
        for index in 0..class.property_count() {
            let mut property = class.property_at_mut(self.types, &mut *object, index)?;
            if is_visible(flags, property.flags()) {
                self.load_property(&mut property, stream, flags)?;
            }
        }

        if let Some(declared) = declared {
            let actual = stream.tell() - size_pos;
            if actual != declared as usize {
                return Err(Error::SizeMismatch {
                    type_name: class.name().to_string(),
                    declared,
                    actual,
                });
            }
        }
        Ok(Some(object))
    }

    fn load_property(
        &self,
        property: &mut PropertyMut<'_>,
        stream: &mut BitStream,
        flags: SerializerFlags,
    ) -> Result<()> {
        let count = if property.is_dynamic() {
            let count = read_element_count(stream)?;
            property.set_element_count(count)?;
            count
        } else {
            property.element_count()?
        };

        for element in 0..count {
            if property.is_object() {
                let object = self.load_object(stream, flags)?;
                property.set_object(element, object)?;
            } else {
                property.read_value_from(stream, element)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, Foo, Leaf, Node, School, sample_tree};
    use pclass_core::{Bui, StreamError};

    fn round_trip(types: &TypeSystem, is_file: bool, flags: SerializerFlags, object: &Node) -> Node {
        let serializer = BinarySerializer::new(types, is_file, flags);
        let mut stream = BitStream::new();
        serializer.save(Some(object), &mut stream).unwrap();
        stream.seek(0).unwrap();
        let loaded = serializer.load(&mut stream).unwrap().unwrap();
        assert_eq!(stream.remaining_bits(), 0);
        loaded.downcast_ref::<Node>().unwrap().clone()
    }

    #[test]
    fn wire_round_trip() {
        let types = test_support::types();
        let tree = sample_tree();
        assert_eq!(round_trip(&types, false, SerializerFlags::empty(), &tree), tree);
    }

    #[test]
    fn file_round_trip_with_flags() {
        let types = test_support::types();
        let tree = sample_tree();
        let flags = SerializerFlags::WRITE_SERIALIZER_FLAGS | SerializerFlags::COMPRESSED;
        assert_eq!(round_trip(&types, true, flags, &tree), tree);
    }

    #[test]
    fn derived_child_keeps_its_class() {
        let types = test_support::types();
        let loaded = round_trip(&types, true, SerializerFlags::empty(), &sample_tree());
        let child: &dyn PropertyClass = loaded.child.as_deref().unwrap();
        let leaf = child.downcast_ref::<Leaf>().unwrap();
        assert_eq!(leaf.level, Bui::<24>::from_u64(16_777_215));
        assert_eq!(leaf.node.label, "leaf");
    }

    #[test]
    fn wire_mode_matches_class_layout() {
        let types = test_support::types();
        let tree = sample_tree();
        let mut serialized = BitStream::new();
        BinarySerializer::new(&types, false, SerializerFlags::empty())
            .save(Some(&tree), &mut serialized)
            .unwrap();

        let mut direct = BitStream::new();
        types
            .get_class("class Node")
            .unwrap()
            .write_object(&types, &mut direct, Some(&tree))
            .unwrap();
        assert_eq!(serialized.as_bytes(), direct.as_bytes());
    }

    #[test]
    fn null_root() {
        let types = test_support::types();
        let serializer = BinarySerializer::new(&types, true, SerializerFlags::empty());
        let mut stream = BitStream::new();
        serializer.save(None, &mut stream).unwrap();
        assert_eq!(stream.len_bits(), 32);

        stream.seek(0).unwrap();
        assert!(serializer.load(&mut stream).unwrap().is_none());
    }

    #[test]
    fn wire_layout() {
        let types = test_support::types();
        let foo = Foo {
            x: -2,
            secret: "hi".to_string(),
        };
        let mut stream = BitStream::new();
        BinarySerializer::new(&types, false, SerializerFlags::WRITE_SERIALIZER_FLAGS)
            .save(Some(&foo), &mut stream)
            .unwrap();

        stream.seek(0).unwrap();
        assert_eq!(stream.read_u32().unwrap(), 0x01);
        assert_eq!(stream.read_u32().unwrap(), types.hash_of("class Foo").as_u32());
        assert_eq!(stream.read_u32().unwrap() as i32, -2);
        assert_eq!(stream.read_u16().unwrap(), 2);
        assert_eq!(stream.read_bytes(2).unwrap(), b"hi");
        assert_eq!(stream.remaining_bits(), 0);
    }

    #[test]
    fn file_header_records_object_size() {
        let types = test_support::types();
        let mut stream = BitStream::new();
        BinarySerializer::new(&types, true, SerializerFlags::empty())
            .save(Some(&Foo::default()), &mut stream)
            .unwrap();

        stream.seek(32).unwrap();
        // size field + int + empty string length
        assert_eq!(stream.read_u32().unwrap(), 32 + 32 + 16);
    }

    #[test]
    fn public_only_omits_private_properties() {
        let types = test_support::types();
        let foo = Foo {
            x: 5,
            secret: "hidden".to_string(),
        };
        let serializer = BinarySerializer::new(&types, false, SerializerFlags::WRITE_PUBLIC_ONLY);
        let mut stream = BitStream::new();
        serializer.save(Some(&foo), &mut stream).unwrap();
        assert_eq!(stream.len_bits(), 64);

        stream.seek(0).unwrap();
        let loaded = serializer.load(&mut stream).unwrap().unwrap();
        let loaded = loaded.downcast_ref::<Foo>().unwrap();
        assert_eq!(loaded.x, 5);
        assert_eq!(loaded.secret, "");
    }

    #[test]
    fn stored_flags_govern_the_load() {
        let types = test_support::types();
        let foo = Foo {
            x: 9,
            secret: "hidden".to_string(),
        };
        let mut stream = BitStream::new();
        BinarySerializer::new(
            &types,
            false,
            SerializerFlags::WRITE_SERIALIZER_FLAGS | SerializerFlags::WRITE_PUBLIC_ONLY,
        )
        .save(Some(&foo), &mut stream)
        .unwrap();

        stream.seek(0).unwrap();
        let loaded = BinarySerializer::new(&types, false, SerializerFlags::WRITE_SERIALIZER_FLAGS)
            .load(&mut stream)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.downcast_ref::<Foo>().unwrap().x, 9);
    }

    #[test]
    fn compressed_data_is_unsupported() {
        let types = test_support::types();
        let mut stream = BitStream::new();
        stream.write_u8(1).unwrap();
        stream.seek(0).unwrap();
        let err = BinarySerializer::new(&types, false, SerializerFlags::COMPRESSED)
            .load(&mut stream)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    fn unknown_child_stream(types: &TypeSystem) -> BitStream {
        let mut stream = BitStream::new();
        BinarySerializer::new(types, true, SerializerFlags::empty())
            .save(Some(&sample_tree()), &mut stream)
            .unwrap();

        // The child header follows: root hash, root size, id, label, school,
        // weight count and two weights.
        let child_hash = 32 + 32 + 32 + (16 + 4 * 8) + 32 + 32 + 2 * 32;
        stream.seek(child_hash).unwrap();
        assert_eq!(stream.read_u32().unwrap(), types.hash_of("class Leaf").as_u32());
        stream.seek(child_hash).unwrap();
        stream.write_u32(0xDEAD_BEEF).unwrap();
        stream.seek(0).unwrap();
        stream
    }

    #[test]
    fn unknown_type_aborts_by_default() {
        let types = test_support::types();
        let mut stream = unknown_child_stream(&types);
        let err = BinarySerializer::new(&types, true, SerializerFlags::empty())
            .load(&mut stream)
            .unwrap_err();
        assert!(err.is_resolution());
    }

    #[test]
    fn unknown_type_can_be_skipped() {
        let types = test_support::types();
        let mut stream = unknown_child_stream(&types);
        let loaded = BinarySerializer::new(&types, true, SerializerFlags::empty())
            .with_unknown_types(UnknownTypePolicy::Skip)
            .load(&mut stream)
            .unwrap()
            .unwrap();
        let node = loaded.downcast_ref::<Node>().unwrap();
        assert!(node.child.is_none());
        assert_eq!(node.extra, sample_tree().extra);
    }

    #[test]
    fn size_mismatch_is_detected() {
        let types = test_support::types();
        let mut stream = BitStream::new();
        BinarySerializer::new(&types, true, SerializerFlags::empty())
            .save(Some(&Foo::default()), &mut stream)
            .unwrap();
        stream.seek(32).unwrap();
        stream.write_u32(90).unwrap();

        stream.seek(0).unwrap();
        let err = BinarySerializer::new(&types, true, SerializerFlags::empty())
            .load(&mut stream)
            .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { declared: 90, actual: 80, .. }));
    }

    #[test]
    fn oversized_list_count_is_rejected() {
        let types = test_support::types();
        let mut stream = BitStream::new();
        BinarySerializer::new(&types, false, SerializerFlags::empty())
            .save(Some(&Node::default()), &mut stream)
            .unwrap();
        assert_eq!(stream.len_bits(), 208);
        // hash, id, label, school, weights count, child hash
        stream.seek(176).unwrap();
        stream.write_u32(u32::MAX).unwrap();

        stream.seek(0).unwrap();
        let err = BinarySerializer::new(&types, false, SerializerFlags::empty())
            .load(&mut stream)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::UnexpectedEof { remaining: 0, .. })
        ));
    }

    #[test]
    fn truncated_list_body_fails() {
        let types = test_support::types();
        let node = Node {
            weights: vec![1.0, 2.0],
            ..Node::default()
        };
        let mut stream = BitStream::new();
        BinarySerializer::new(&types, false, SerializerFlags::empty())
            .save(Some(&node), &mut stream)
            .unwrap();

        // Cut inside the first weight.
        let mut truncated = BitStream::from_bytes(stream.as_bytes()[..20].to_vec());
        let err = BinarySerializer::new(&types, false, SerializerFlags::empty())
            .load(&mut truncated)
            .unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::UnexpectedEof { .. })));
    }

    #[test]
    fn truncated_string_body_fails() {
        let types = test_support::types();
        let foo = Foo {
            x: 1,
            secret: "hello".to_string(),
        };
        let mut stream = BitStream::new();
        BinarySerializer::new(&types, false, SerializerFlags::empty())
            .save(Some(&foo), &mut stream)
            .unwrap();

        let mut truncated = BitStream::from_bytes(stream.as_bytes()[..12].to_vec());
        let err = BinarySerializer::new(&types, false, SerializerFlags::empty())
            .load(&mut truncated)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::UnexpectedEof { needed: 40, remaining: 16 })
        ));
    }

    #[test]
    fn undeclared_enum_value_is_rejected() {
        let full = test_support::types();
        let partial = test_support::types_with_schools(&[School::Fire, School::Ice]);
        let node = Node {
            school: School::Storm,
            ..Node::default()
        };

        let mut stream = BitStream::new();
        BinarySerializer::new(&full, false, SerializerFlags::empty())
            .save(Some(&node), &mut stream)
            .unwrap();
        stream.seek(0).unwrap();
        let err = BinarySerializer::new(&partial, false, SerializerFlags::empty())
            .load(&mut stream)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEnumValue { value: 7, .. }));

        let err = BinarySerializer::new(&partial, false, SerializerFlags::empty())
            .save(Some(&node), &mut BitStream::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEnumValue { value: 7, .. }));
    }

    #[test]
    fn truncated_input_fails() {
        let types = test_support::types();
        let mut stream = BitStream::new();
        stream.write_u32(types.hash_of("class Foo").as_u32()).unwrap();
        stream.seek(0).unwrap();
        let err = BinarySerializer::new(&types, false, SerializerFlags::empty())
            .load(&mut stream)
            .unwrap_err();
        assert!(matches!(err, Error::Stream(_)));
    }
}
