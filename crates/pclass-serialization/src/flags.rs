//! Serializer configuration.

use bitflags::bitflags;

bitflags! {
    /// Controls how a serializer formats its output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SerializerFlags: u32 {
        /// Write the flags as a 32-bit word before any data.
        const WRITE_SERIALIZER_FLAGS = 0x01;
        /// Only properties flagged `PUBLIC` are written or read.
        const WRITE_PUBLIC_ONLY = 0x04;
        /// Data after the flags word starts with a compression marker.
        const COMPRESSED = 0x08;
    }
}

/// What a file-mode load does with an object whose type hash is not
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypePolicy {
    /// Fail with a resolution error.
    #[default]
    Abort,
    /// Skip the object's bits and leave its slot null.
    Skip,
}

/// Check if a property is written under `flags`.
pub(crate) fn is_visible(flags: SerializerFlags, property: pclass_core::PropertyFlags) -> bool {
    !flags.contains(SerializerFlags::WRITE_PUBLIC_ONLY)
        || property.contains(pclass_core::PropertyFlags::PUBLIC)
}
