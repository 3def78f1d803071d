//! Runtime cast dispatch between reflected types.
//!
//! A [`CastTable`] holds one [`ValueCaster`] per source type. Each
//! `ValueCaster` maps a destination type to the strategy that converts a
//! source payload into a freshly boxed destination payload. Lookup is keyed
//! by [`TypeId`], so a [`Value`] can be converted knowing only the runtime
//! identity of what it holds.
//!
//! Numeric conversions go through [`Scalar`], a small intermediate that
//! carries any bool, integer, bit integer, or float. This keeps the number of
//! distinct strategies linear in the number of types rather than quadratic.

use std::any::{Any, TypeId};
use std::fmt;

use rustc_hash::FxHashMap;

use crate::types::ReflectEnum;
use crate::{Bi, BitInteger, Bui, CastError, Reflect, Result, Value, WideString};

/// A conversion strategy from one reflected type to another.
pub type Caster =
    Box<dyn Fn(&dyn Reflect) -> std::result::Result<Box<dyn Reflect>, CastError> + Send + Sync>;

// ============================================================================
// Scalar
// ============================================================================

/// Intermediate representation for numeric casts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Scalar {
    /// Convert with `as` semantics.
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Bool(b) => i64::from(b),
            Scalar::Signed(v) => v,
            Scalar::Unsigned(v) => v as i64,
            Scalar::Float(v) => v as i64,
        }
    }

    /// Convert with `as` semantics.
    pub fn as_u64(self) -> u64 {
        match self {
            Scalar::Bool(b) => u64::from(b),
            Scalar::Signed(v) => v as u64,
            Scalar::Unsigned(v) => v,
            Scalar::Float(v) => v as u64,
        }
    }

    /// Convert with `as` semantics.
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => f64::from(u8::from(b)),
            Scalar::Signed(v) => v as f64,
            Scalar::Unsigned(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }

    /// Non-zero is true.
    pub fn as_bool(self) -> bool {
        match self {
            Scalar::Bool(b) => b,
            Scalar::Signed(v) => v != 0,
            Scalar::Unsigned(v) => v != 0,
            Scalar::Float(v) => v != 0.0,
        }
    }

    /// Convert to a JSON value. Non-finite floats have no JSON form.
    pub fn to_json(self) -> Option<serde_json::Value> {
        Some(match self {
            Scalar::Bool(b) => serde_json::Value::Bool(b),
            Scalar::Signed(v) => serde_json::Value::from(v),
            Scalar::Unsigned(v) => serde_json::Value::from(v),
            Scalar::Float(v) => serde_json::Value::Number(serde_json::Number::from_f64(v)?),
        })
    }

    /// Read a JSON bool or number.
    pub fn from_json(json: &serde_json::Value) -> Option<Scalar> {
        match json {
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(Scalar::Unsigned)
                .or_else(|| n.as_i64().map(Scalar::Signed))
                .or_else(|| n.as_f64().map(Scalar::Float)),
            _ => None,
        }
    }
}

/// Types that can be read as a [`Scalar`].
pub trait ToScalar {
    fn to_scalar(&self) -> Scalar;
}

/// Types that can be built from a [`Scalar`].
pub trait FromScalar: Sized {
    fn from_scalar(scalar: Scalar) -> Self;
}

impl ToScalar for bool {
    fn to_scalar(&self) -> Scalar {
        Scalar::Bool(*self)
    }
}

impl FromScalar for bool {
    fn from_scalar(scalar: Scalar) -> Self {
        scalar.as_bool()
    }
}

macro_rules! impl_scalar_int {
    ($variant:ident, $wide:ty; $($ty:ty),*) => {$(
        impl ToScalar for $ty {
            fn to_scalar(&self) -> Scalar {
                Scalar::$variant(*self as $wide)
            }
        }

        impl FromScalar for $ty {
            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::Float(v) => v as $ty,
                    Scalar::Unsigned(v) => v as $ty,
                    other => other.as_i64() as $ty,
                }
            }
        }
    )*};
}

impl_scalar_int!(Signed, i64; i8, i16, i32, i64);
impl_scalar_int!(Unsigned, u64; u8, u16, u32, u64);

macro_rules! impl_scalar_float {
    ($($ty:ty),*) => {$(
        impl ToScalar for $ty {
            fn to_scalar(&self) -> Scalar {
                Scalar::Float(f64::from(*self))
            }
        }

        impl FromScalar for $ty {
            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::Signed(v) => v as $ty,
                    Scalar::Unsigned(v) => v as $ty,
                    other => other.as_f64() as $ty,
                }
            }
        }
    )*};
}

impl_scalar_float!(f32, f64);

impl<const N: u32, const SIGNED: bool> ToScalar for BitInteger<N, SIGNED> {
    fn to_scalar(&self) -> Scalar {
        if SIGNED {
            Scalar::Signed(self.to_i64())
        } else {
            Scalar::Unsigned(self.to_bits())
        }
    }
}

impl<const N: u32, const SIGNED: bool> FromScalar for BitInteger<N, SIGNED> {
    fn from_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Unsigned(v) => Self::from_u64(v),
            other => Self::from_i64(other.as_i64()),
        }
    }
}

// ============================================================================
// Source / target descriptors
// ============================================================================

/// A type that numeric casts can read from.
#[derive(Clone, Copy)]
pub struct ScalarSource {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub extract: fn(&dyn Reflect) -> Option<Scalar>,
}

impl ScalarSource {
    pub fn of<S: ToScalar + Reflect>() -> Self {
        fn extract<S: ToScalar + Any>(value: &dyn Reflect) -> Option<Scalar> {
            value.as_any().downcast_ref::<S>().map(ToScalar::to_scalar)
        }
        Self {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            extract: extract::<S>,
        }
    }
}

/// A type that numeric casts can produce.
#[derive(Clone, Copy)]
pub struct ScalarTarget {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub build: fn(Scalar) -> Box<dyn Reflect>,
    pub is_float: bool,
}

impl ScalarTarget {
    pub fn of<D: FromScalar + Reflect>() -> Self {
        fn build<D: FromScalar + Reflect>(scalar: Scalar) -> Box<dyn Reflect> {
            Box::new(D::from_scalar(scalar))
        }
        let type_id = TypeId::of::<D>();
        Self {
            type_id,
            type_name: std::any::type_name::<D>(),
            build: build::<D>,
            is_float: type_id == TypeId::of::<f32>() || type_id == TypeId::of::<f64>(),
        }
    }
}

macro_rules! bit_widths {
    ($callback:ident) => {
        $callback!(
            1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28
            29 30 31 32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49 50 51 52 53 54 55 56
        )
    };
}

/// Every numeric destination: bool, the byte-aligned integers, every signed
/// and unsigned bit width from 1 to 56, and both float widths.
pub fn numeric_targets() -> Vec<ScalarTarget> {
    let mut targets = vec![
        ScalarTarget::of::<bool>(),
        ScalarTarget::of::<i8>(),
        ScalarTarget::of::<i16>(),
        ScalarTarget::of::<i32>(),
        ScalarTarget::of::<i64>(),
        ScalarTarget::of::<u8>(),
        ScalarTarget::of::<u16>(),
        ScalarTarget::of::<u32>(),
        ScalarTarget::of::<u64>(),
        ScalarTarget::of::<f32>(),
        ScalarTarget::of::<f64>(),
    ];
    macro_rules! push_bit_targets {
        ($($n:literal)*) => {
            $(
                targets.push(ScalarTarget::of::<Bi<$n>>());
                targets.push(ScalarTarget::of::<Bui<$n>>());
            )*
        };
    }
    bit_widths!(push_bit_targets);
    targets
}

/// Every integral source an enum may be built from.
pub fn integral_sources() -> Vec<ScalarSource> {
    let mut sources = vec![
        ScalarSource::of::<i8>(),
        ScalarSource::of::<i16>(),
        ScalarSource::of::<i32>(),
        ScalarSource::of::<i64>(),
        ScalarSource::of::<u8>(),
        ScalarSource::of::<u16>(),
        ScalarSource::of::<u32>(),
        ScalarSource::of::<u64>(),
    ];
    macro_rules! push_bit_sources {
        ($($n:literal)*) => {
            $(
                sources.push(ScalarSource::of::<Bi<$n>>());
                sources.push(ScalarSource::of::<Bui<$n>>());
            )*
        };
    }
    bit_widths!(push_bit_sources);
    sources
}

// ============================================================================
// ValueCaster / CastTable
// ============================================================================

/// All casters declared for one source type.
pub struct ValueCaster {
    source_name: &'static str,
    casters: FxHashMap<TypeId, (&'static str, Caster)>,
}

impl ValueCaster {
    fn new(source_name: &'static str) -> Self {
        Self {
            source_name,
            casters: FxHashMap::default(),
        }
    }

    /// Rust name of the source type.
    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    /// The caster for a destination, if declared.
    pub fn get(&self, dest: TypeId) -> Option<&Caster> {
        self.casters.get(&dest).map(|(_, caster)| caster)
    }

    /// Check if a destination is declared.
    pub fn contains(&self, dest: TypeId) -> bool {
        self.casters.contains_key(&dest)
    }

    /// Names of every declared destination.
    pub fn destinations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.casters.values().map(|(name, _)| *name)
    }

    /// Number of declared destinations.
    pub fn len(&self) -> usize {
        self.casters.len()
    }

    /// Check if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.casters.is_empty()
    }
}

impl fmt::Debug for ValueCaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCaster")
            .field("source", &self.source_name)
            .field("destinations", &self.casters.len())
            .finish()
    }
}

/// Registry of [`ValueCaster`]s keyed by source type.
#[derive(Debug, Default)]
pub struct CastTable {
    casters: FxHashMap<TypeId, ValueCaster>,
}

impl CastTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a caster, replacing any previous one for the same pair.
    pub fn insert(
        &mut self,
        source: (TypeId, &'static str),
        dest: (TypeId, &'static str),
        caster: Caster,
    ) {
        self.casters
            .entry(source.0)
            .or_insert_with(|| ValueCaster::new(source.1))
            .casters
            .insert(dest.0, (dest.1, caster));
    }

    /// The casters declared for a source type.
    pub fn get(&self, source: TypeId) -> Option<&ValueCaster> {
        self.casters.get(&source)
    }

    /// Check if a (source, destination) pair is declared.
    pub fn contains<S: Any, D: Any>(&self) -> bool {
        self.get(TypeId::of::<S>())
            .is_some_and(|caster| caster.contains(TypeId::of::<D>()))
    }

    /// Install a custom strategy for `(S, D)`.
    ///
    /// The strategy may reject a value by returning a reason.
    pub fn declare_with<S, D, F>(&mut self, f: F)
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&S) -> std::result::Result<D, String> + Send + Sync + 'static,
    {
        let from = std::any::type_name::<S>();
        let to = std::any::type_name::<D>();
        let caster: Caster = Box::new(move |value| {
            let source = value
                .as_any()
                .downcast_ref::<S>()
                .ok_or_else(|| CastError::Failed {
                    from,
                    to,
                    reason: format!("payload is '{}'", value.reflect_type_name()),
                })?;
            f(source)
                .map(|d| Box::new(d) as Box<dyn Reflect>)
                .map_err(|reason| CastError::Failed { from, to, reason })
        });
        self.insert((TypeId::of::<S>(), from), (TypeId::of::<D>(), to), caster);
        log::debug!("declared cast {} -> {}", from, to);
    }

    /// Install the default numeric strategy for `(S, D)`.
    pub fn declare<S, D>(&mut self)
    where
        S: ToScalar + Reflect,
        D: FromScalar + Reflect,
    {
        self.declare_scalar(ScalarSource::of::<S>(), ScalarTarget::of::<D>());
        log::debug!(
            "declared cast {} -> {}",
            std::any::type_name::<S>(),
            std::any::type_name::<D>()
        );
    }

    /// Install the numeric strategy for a described pair.
    pub fn declare_scalar(&mut self, source: ScalarSource, target: ScalarTarget) {
        if source.type_id == target.type_id {
            return;
        }
        let (from, to) = (source.type_name, target.type_name);
        let (extract, build) = (source.extract, target.build);
        let caster: Caster = Box::new(move |value| {
            extract(value).map(build).ok_or_else(|| CastError::Failed {
                from,
                to,
                reason: format!("payload is '{}'", value.reflect_type_name()),
            })
        });
        self.insert((source.type_id, from), (target.type_id, to), caster);
    }

    /// Declare the full numeric cast set for `S`: every numeric target,
    /// display string, JSON, and JSON back to `S`.
    pub fn declare_numeric<S>(&mut self)
    where
        S: ToScalar + FromScalar + fmt::Display + Reflect,
    {
        let source = ScalarSource::of::<S>();
        for target in numeric_targets() {
            self.declare_scalar(source, target);
        }
        self.declare_with::<S, String, _>(|value| Ok(value.to_string()));
        self.declare_with::<S, serde_json::Value, _>(|value| {
            value
                .to_scalar()
                .to_json()
                .ok_or_else(|| "value has no JSON representation".to_string())
        });
        self.declare_with::<serde_json::Value, S, _>(|json| {
            Scalar::from_json(json)
                .map(S::from_scalar)
                .ok_or_else(|| format!("expected a JSON number or bool, found {json}"))
        });
        log::debug!("declared numeric casts for {}", std::any::type_name::<S>());
    }

    /// Declare the casts for narrow and wide strings: JSON in both
    /// directions, nothing else.
    pub fn declare_strings(&mut self) {
        self.declare_with::<String, serde_json::Value, _>(|s| {
            Ok(serde_json::Value::String(s.clone()))
        });
        self.declare_with::<serde_json::Value, String, _>(|json| {
            json.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("expected a JSON string, found {json}"))
        });
        self.declare_with::<WideString, serde_json::Value, _>(|s| {
            Ok(serde_json::Value::String(s.to_string_lossy()))
        });
        self.declare_with::<serde_json::Value, WideString, _>(|json| {
            json.as_str()
                .map(WideString::from)
                .ok_or_else(|| format!("expected a JSON string, found {json}"))
        });
    }

    /// Declare the casts for an enum: to every non-float numeric target,
    /// display string, and JSON; from every integral type and JSON, checked
    /// against the enum's members.
    pub fn declare_enum<E: ReflectEnum>(&mut self) {
        let source = ScalarSource {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            extract: |value| {
                value
                    .as_any()
                    .downcast_ref::<E>()
                    .map(|e| Scalar::Unsigned(u64::from(e.to_u32())))
            },
        };
        for target in numeric_targets().into_iter().filter(|t| !t.is_float) {
            self.declare_scalar(source, target);
        }
        self.declare_with::<E, String, _>(|e| Ok(e.to_u32().to_string()));
        self.declare_with::<E, serde_json::Value, _>(|e| Ok(serde_json::Value::from(e.to_u32())));

        let enum_id = (TypeId::of::<E>(), std::any::type_name::<E>());
        for integral in integral_sources() {
            let extract = integral.extract;
            let from = integral.type_name;
            let caster: Caster = Box::new(move |value| {
                let scalar = extract(value).ok_or_else(|| CastError::Failed {
                    from,
                    to: enum_id.1,
                    reason: format!("payload is '{}'", value.reflect_type_name()),
                })?;
                enum_from_scalar::<E>(scalar)
                    .map(|e| Box::new(e) as Box<dyn Reflect>)
                    .map_err(|reason| CastError::Failed {
                        from,
                        to: enum_id.1,
                        reason,
                    })
            });
            self.insert((integral.type_id, from), enum_id, caster);
        }
        self.declare_with::<serde_json::Value, E, _>(|json| {
            let scalar = Scalar::from_json(json)
                .ok_or_else(|| format!("expected a JSON number, found {json}"))?;
            enum_from_scalar::<E>(scalar)
        });
        log::debug!("declared enum casts for {}", enum_id.1);
    }

    /// Convert a value's payload to the destination type.
    ///
    /// Fails with [`CastError::NoCasterTable`] when nothing is declared for
    /// the stored type, and [`CastError::NoCaster`] when the pair is missing.
    pub fn cast(
        &self,
        value: &Value<'_>,
        dest: TypeId,
        dest_name: &'static str,
    ) -> Result<Box<dyn Reflect>> {
        let from = value.type_name();
        let caster = self
            .casters
            .get(&value.type_id())
            .ok_or(CastError::NoCasterTable { from, to: dest_name })?
            .get(dest)
            .ok_or(CastError::NoCaster { from, to: dest_name })?;
        Ok(caster(value.payload()?)?)
    }
}

fn enum_from_scalar<E: ReflectEnum>(scalar: Scalar) -> std::result::Result<E, String> {
    let raw = scalar.as_i64();
    let value = u32::try_from(raw).map_err(|_| format!("{raw} is out of range for an enum"))?;
    E::from_u32(value).ok_or_else(|| format!("{value} is not a member"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Color {
        Red = 1,
        Blue = 4,
    }

    impl ReflectEnum for Color {
        fn to_u32(self) -> u32 {
            self as u32
        }

        fn from_u32(value: u32) -> Option<Self> {
            match value {
                1 => Some(Color::Red),
                4 => Some(Color::Blue),
                _ => None,
            }
        }
    }

    fn numeric_table() -> CastTable {
        let mut casts = CastTable::new();
        casts.declare_numeric::<i8>();
        casts.declare_numeric::<i32>();
        casts.declare_numeric::<u16>();
        casts.declare_numeric::<f32>();
        casts.declare_numeric::<bool>();
        casts.declare_numeric::<Bui<24>>();
        casts
    }

    #[test]
    fn narrowing_wraps() {
        let casts = numeric_table();
        let v = Value::new(300i32).cast::<u8>(&casts).unwrap();
        assert_eq!(*v.get::<u8>().unwrap(), 44);
        let v = Value::new(-1i32).cast::<u16>(&casts).unwrap();
        assert_eq!(*v.get::<u16>().unwrap(), u16::MAX);
    }

    #[test]
    fn round_trip_within_range() {
        let casts = numeric_table();
        for x in [-128i32, -1, 0, 1, 127] {
            let narrow = Value::new(x).cast::<i8>(&casts).unwrap();
            let wide = narrow.cast::<i32>(&casts).unwrap();
            assert_eq!(*wide.get::<i32>().unwrap(), x);
        }
    }

    #[test]
    fn i8_displays_as_number() {
        let casts = numeric_table();
        let s = Value::new(-1i8).cast::<String>(&casts).unwrap();
        assert_eq!(s.get::<String>().unwrap(), "-1");
    }

    #[test]
    fn bit_integer_casts() {
        let casts = numeric_table();
        let v = Value::new(Bui::<24>::from_u64(16_777_215));
        let wide = v.cast::<u32>(&casts).unwrap();
        assert_eq!(*wide.get::<u32>().unwrap(), 16_777_215);

        let narrow = Value::new(-3i32).cast::<Bi<4>>(&casts).unwrap();
        assert_eq!(narrow.get::<Bi<4>>().unwrap().to_i64(), -3);
    }

    #[test]
    fn json_round_trip() {
        let casts = numeric_table();
        let json = Value::new(1.5f32).cast::<serde_json::Value>(&casts).unwrap();
        assert_eq!(json.get::<serde_json::Value>().unwrap(), &serde_json::json!(1.5));
        let back = json.cast::<f32>(&casts).unwrap();
        assert_eq!(*back.get::<f32>().unwrap(), 1.5);

        let json = Value::new(serde_json::json!(-7));
        assert_eq!(*json.cast::<i32>(&casts).unwrap().get::<i32>().unwrap(), -7);
    }

    #[test]
    fn json_rejects_wrong_shape() {
        let casts = numeric_table();
        let err = Value::new(serde_json::json!("nope"))
            .cast::<i32>(&casts)
            .unwrap_err();
        assert!(err.is_cast());
    }

    #[test]
    fn missing_pair_names_both_types() {
        let mut casts = CastTable::new();
        let err = Value::new(5i32).cast::<String>(&casts).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Cast(CastError::NoCasterTable { from: "i32", .. })
        ));

        casts.declare::<i32, i64>();
        let err = Value::new(5i32).cast::<String>(&casts).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("i32") && msg.contains("String"), "{msg}");

        casts.declare_with::<i32, String, _>(|v| Ok(format!("#{v}")));
        let s = Value::new(5i32).cast::<String>(&casts).unwrap();
        assert_eq!(s.get::<String>().unwrap(), "#5");
    }

    #[test]
    fn redeclare_replaces() {
        let mut casts = CastTable::new();
        casts.declare_with::<u8, u8, _>(|v| Ok(*v));
        casts.declare_with::<i32, u8, _>(|_| Ok(1));
        casts.declare_with::<i32, u8, _>(|_| Ok(2));
        let v = Value::new(0i32).cast::<u8>(&casts).unwrap();
        assert_eq!(*v.get::<u8>().unwrap(), 2);
        assert_eq!(casts.get(TypeId::of::<i32>()).unwrap().len(), 1);
    }

    #[test]
    fn strings_only_cast_to_json() {
        let mut casts = numeric_table();
        casts.declare_strings();
        let json = Value::new(String::from("hi"))
            .cast::<serde_json::Value>(&casts)
            .unwrap();
        assert_eq!(json.get::<serde_json::Value>().unwrap(), "hi");
        assert!(Value::new(String::from("5")).cast::<i32>(&casts).is_err());

        let wide = Value::new(serde_json::json!("wide"))
            .cast::<WideString>(&casts)
            .unwrap();
        assert_eq!(wide.get::<WideString>().unwrap().to_string_lossy(), "wide");
    }

    #[test]
    fn enum_casts() {
        let mut casts = numeric_table();
        casts.declare_enum::<Color>();

        let raw = Value::new(Color::Blue).cast::<u32>(&casts).unwrap();
        assert_eq!(*raw.get::<u32>().unwrap(), 4);
        let s = Value::new(Color::Blue).cast::<String>(&casts).unwrap();
        assert_eq!(s.get::<String>().unwrap(), "4");
        assert!(Value::new(Color::Red).cast::<f32>(&casts).is_err());

        let color = Value::new(1i32).cast::<Color>(&casts).unwrap();
        assert_eq!(*color.get::<Color>().unwrap(), Color::Red);
        assert!(Value::new(2i32).cast::<Color>(&casts).is_err());
        assert!(Value::new(-1i32).cast::<Color>(&casts).is_err());

        let color = Value::new(serde_json::json!(4)).cast::<Color>(&casts).unwrap();
        assert_eq!(*color.get::<Color>().unwrap(), Color::Blue);
    }

    #[test]
    fn same_type_cast_copies() {
        let casts = CastTable::new();
        let x = 9u64;
        let v = Value::reference(&x).cast::<u64>(&casts).unwrap();
        assert!(!v.is_reference());
        assert_eq!(*v.get::<u64>().unwrap(), 9);
    }
}
