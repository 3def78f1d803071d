//! Primitive types: fixed-width scalars and strings.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use super::{Kind, Type, TypeInfo};
use crate::{
    BitInteger, BitStream, CastTable, Reflect, Result, StreamError, TypeHash, TypeSystem, Value,
    WideString,
};

/// A Rust type with a fixed wire encoding.
pub trait Primitive: Reflect + Clone + Default {
    /// Write the value at the stream cursor.
    fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError>;

    /// Read a value at the stream cursor.
    fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError>;

    /// Declare the casts this type supports.
    fn declare_casts(casts: &mut CastTable);
}

impl Primitive for bool {
    fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError> {
        stream.write_bool(*self)
    }

    fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError> {
        stream.read_bool()
    }

    fn declare_casts(casts: &mut CastTable) {
        casts.declare_numeric::<Self>();
    }
}

macro_rules! impl_primitive_int {
    ($($ty:ty => $raw:ty, $bits:literal);* $(;)?) => {$(
        impl Primitive for $ty {
            fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError> {
                stream.write_bits(u64::from(*self as $raw), $bits)
            }

            fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError> {
                Ok(stream.read_bits($bits)? as $raw as $ty)
            }

            fn declare_casts(casts: &mut CastTable) {
                casts.declare_numeric::<Self>();
            }
        }
    )*};
}

impl_primitive_int! {
    i8 => u8, 8;
    u8 => u8, 8;
    i16 => u16, 16;
    u16 => u16, 16;
    i32 => u32, 32;
    u32 => u32, 32;
    i64 => u64, 64;
    u64 => u64, 64;
}

impl Primitive for f32 {
    fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError> {
        stream.write_u32(self.to_bits())
    }

    fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError> {
        Ok(f32::from_bits(stream.read_u32()?))
    }

    fn declare_casts(casts: &mut CastTable) {
        casts.declare_numeric::<Self>();
    }
}

impl Primitive for f64 {
    fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError> {
        stream.write_u64(self.to_bits())
    }

    fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError> {
        Ok(f64::from_bits(stream.read_u64()?))
    }

    fn declare_casts(casts: &mut CastTable) {
        casts.declare_numeric::<Self>();
    }
}

impl<const N: u32, const SIGNED: bool> Primitive for BitInteger<N, SIGNED> {
    fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError> {
        stream.write_bits(self.to_bits(), N)
    }

    fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError> {
        Ok(Self::from_bits(stream.read_bits(N)?))
    }

    fn declare_casts(casts: &mut CastTable) {
        casts.declare_numeric::<Self>();
    }
}

fn write_length(stream: &mut BitStream, len: usize) -> std::result::Result<(), StreamError> {
    let len = u16::try_from(len).map_err(|_| StreamError::StringTooLong(len))?;
    stream.write_u16(len)
}

impl Primitive for String {
    fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError> {
        write_length(stream, self.len())?;
        stream.write_bytes(self.as_bytes())
    }

    fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError> {
        let len = stream.read_u16()?;
        let bytes = stream.read_bytes(usize::from(len))?;
        String::from_utf8(bytes).map_err(|_| StreamError::InvalidUtf8)
    }

    fn declare_casts(casts: &mut CastTable) {
        casts.declare_strings();
    }
}

impl Primitive for WideString {
    fn write_to(&self, stream: &mut BitStream) -> std::result::Result<(), StreamError> {
        write_length(stream, self.len())?;
        self.units().iter().try_for_each(|unit| stream.write_u16(*unit))
    }

    fn read_from(stream: &mut BitStream) -> std::result::Result<Self, StreamError> {
        let len = stream.read_u16()?;
        let units = (0..len)
            .map(|_| stream.read_u16())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(WideString(units))
    }

    fn declare_casts(casts: &mut CastTable) {
        casts.declare_strings();
    }
}

/// The [`Type`] of a [`Primitive`].
pub struct PrimitiveType<T> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Primitive> PrimitiveType<T> {
    pub fn new(info: TypeInfo) -> Self {
        Self {
            info,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PrimitiveType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveType")
            .field("name", &self.info.name)
            .field("hash", &self.info.hash)
            .field("value", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Primitive> Type for PrimitiveType<T> {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn hash(&self) -> TypeHash {
        self.info.hash
    }

    fn kind(&self) -> Kind {
        Kind::Primitive
    }

    fn value_type_id(&self) -> Option<TypeId> {
        Some(TypeId::of::<T>())
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn write_to(&self, types: &TypeSystem, stream: &mut BitStream, value: &Value<'_>) -> Result<()> {
        if value.is::<T>() {
            Primitive::write_to(value.get::<T>()?, stream)?;
        } else {
            let casted = value.cast::<T>(types.casts())?;
            Primitive::write_to(casted.get::<T>()?, stream)?;
        }
        Ok(())
    }

    fn read_from(&self, _types: &TypeSystem, stream: &mut BitStream) -> Result<Value<'static>> {
        Ok(Value::new(T::read_from(stream)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bui;

    #[test]
    fn int_round_trip() {
        let types = TypeSystem::with_primitives().unwrap();
        let int = types.get_type("int").unwrap();
        let mut stream = BitStream::new();
        int.write_to(&types, &mut stream, &Value::new(-42i32)).unwrap();
        assert_eq!(stream.len_bits(), 32);

        stream.seek(0).unwrap();
        let value = int.read_from(&types, &mut stream).unwrap();
        assert_eq!(*value.get::<i32>().unwrap(), -42);
    }

    #[test]
    fn write_casts_foreign_values() {
        let types = TypeSystem::with_primitives().unwrap();
        let short = types.get_type("short").unwrap();
        let mut stream = BitStream::new();
        short.write_to(&types, &mut stream, &Value::new(7u8)).unwrap();

        stream.seek(0).unwrap();
        assert_eq!(stream.read_u16().unwrap(), 7);
    }

    #[test]
    fn bit_integer_width() {
        let types = TypeSystem::with_primitives().unwrap();
        let u24 = types.get_type("u24").unwrap();
        let mut stream = BitStream::new();
        let value = Value::new(Bui::<24>::from_u64(16_777_215));
        u24.write_to(&types, &mut stream, &value).unwrap();
        assert_eq!(stream.len_bits(), 24);

        stream.seek(0).unwrap();
        let back = u24.read_from(&types, &mut stream).unwrap();
        assert_eq!(back.get::<Bui<24>>().unwrap().to_u64(), 16_777_215);
    }

    #[test]
    fn string_layout() {
        let mut stream = BitStream::new();
        String::from("ab").write_to(&mut stream).unwrap();
        assert_eq!(stream.as_bytes(), &[2, 0, b'a', b'b']);

        stream.seek(0).unwrap();
        assert_eq!(String::read_from(&mut stream).unwrap(), "ab");
    }

    #[test]
    fn wide_string_layout() {
        let mut stream = BitStream::new();
        WideString::from("hi").write_to(&mut stream).unwrap();
        assert_eq!(stream.len_bits(), 16 * 3);

        stream.seek(0).unwrap();
        assert_eq!(WideString::read_from(&mut stream).unwrap(), WideString::from("hi"));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut stream = BitStream::from_bytes(vec![1, 0, 0xFF]);
        assert_eq!(String::read_from(&mut stream), Err(StreamError::InvalidUtf8));
    }

    #[test]
    fn overlong_string_is_rejected() {
        let mut stream = BitStream::new();
        let long = "x".repeat(70_000);
        assert_eq!(long.write_to(&mut stream), Err(StreamError::StringTooLong(70_000)));
    }

    #[test]
    fn floats_keep_their_bits() {
        let mut stream = BitStream::new();
        1.25f32.write_to(&mut stream).unwrap();
        (-0.5f64).write_to(&mut stream).unwrap();
        stream.seek(0).unwrap();
        assert_eq!(f32::read_from(&mut stream).unwrap(), 1.25);
        assert_eq!(f64::read_from(&mut stream).unwrap(), -0.5);
    }
}
