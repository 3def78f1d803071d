//! TypeSystem - registry of every type, indexed by name and by hash.
//!
//! A [`TypeSystem`] is populated once during startup through `&mut` access:
//! primitives, enums, and classes are defined in dependency order (a base
//! class before its subclasses, a property's type before the class that uses
//! it). Afterwards it is only read, and can be shared across threads.
//!
//! The TypeSystem also owns the [`HashCalculator`] used to derive every type
//! hash and the [`CastTable`] consulted whenever a [`Value`](crate::Value)
//! must be converted.
//!
//! # Example
//!
//! ```
//! use pclass_core::{Kind, TypeSystem};
//!
//! let types = TypeSystem::with_primitives().unwrap();
//! let int = types.get_type("int").unwrap();
//! assert_eq!(int.kind(), Kind::Primitive);
//! assert_eq!(types.get_type_by_hash(int.hash()).unwrap().name(), "int");
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use crate::types::{
    ClassBuilder, ClassType, EnumBuilder, OpaqueType, Primitive, PrimitiveType, ReflectEnum,
    Type, TypeInfo,
};
use crate::{
    Bi, Bui, CastTable, Error, HashCalculator, PropertyClass, RegistrationError, Result,
    TypeHash, WideString, XxHashCalculator,
};

/// Registry of every [`Type`] known to the program.
pub struct TypeSystem {
    types: Vec<Box<dyn Type>>,
    by_name: FxHashMap<String, usize>,
    by_hash: FxHashMap<TypeHash, usize>,
    hash_calculator: Box<dyn HashCalculator>,
    casts: CastTable,
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSystem {
    /// Create an empty registry hashing with [`XxHashCalculator`].
    pub fn new() -> Self {
        Self::with_hash_calculator(XxHashCalculator)
    }

    /// Create an empty registry with a specific hash strategy.
    pub fn with_hash_calculator(hash_calculator: impl HashCalculator + 'static) -> Self {
        Self {
            types: Vec::new(),
            by_name: FxHashMap::default(),
            by_hash: FxHashMap::default(),
            hash_calculator: Box::new(hash_calculator),
            casts: CastTable::new(),
        }
    }

    /// Create a registry with every built-in primitive defined.
    pub fn with_primitives() -> Result<Self> {
        let mut types = Self::new();
        types.define_primitives()?;
        Ok(types)
    }

    /// Define the built-in primitive catalogue and its casts.
    pub fn define_primitives(&mut self) -> Result<()> {
        self.define_primitive::<bool>("bool")?;
        self.define_primitive::<i8>("char")?;
        self.define_primitive::<u8>("unsigned char")?;
        self.define_primitive::<i16>("short")?;
        self.define_primitive::<u16>("unsigned short")?;
        self.define_primitive::<i32>("int")?;
        self.define_primitive::<u32>("unsigned int")?;
        self.define_primitive::<i64>("long")?;
        self.define_primitive::<u64>("unsigned long")?;
        self.define_primitive::<f32>("float")?;
        self.define_primitive::<f64>("double")?;
        self.define_primitive::<String>("std::string")?;
        self.define_primitive::<WideString>("std::wstring")?;

        self.define_primitive::<Bi<1>>("bi1")?;
        self.define_primitive::<Bi<2>>("bi2")?;
        self.define_primitive::<Bi<3>>("bi3")?;
        self.define_primitive::<Bi<4>>("bi4")?;
        self.define_primitive::<Bi<5>>("bi5")?;
        self.define_primitive::<Bi<6>>("bi6")?;
        self.define_primitive::<Bi<7>>("bi7")?;
        self.define_primitive::<Bui<1>>("bui1")?;
        self.define_primitive::<Bui<2>>("bui2")?;
        self.define_primitive::<Bui<3>>("bui3")?;
        self.define_primitive::<Bui<4>>("bui4")?;
        self.define_primitive::<Bui<5>>("bui5")?;
        self.define_primitive::<Bui<6>>("bui6")?;
        self.define_primitive::<Bui<7>>("bui7")?;
        self.define_primitive::<Bi<24>>("s24")?;
        self.define_primitive::<Bui<24>>("u24")?;
        Ok(())
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Hash a type name with this registry's calculator.
    pub fn hash_of(&self, name: &str) -> TypeHash {
        self.hash_calculator.calculate_type_hash(name)
    }

    /// The hash strategy.
    pub fn hash_calculator(&self) -> &dyn HashCalculator {
        self.hash_calculator.as_ref()
    }

    /// Add a type.
    ///
    /// Fails on a duplicate name, on the reserved null hash, and on a hash
    /// already taken by a differently named type.
    pub fn register(&mut self, ty: Box<dyn Type>) -> Result<TypeHash> {
        let name = ty.name().to_string();
        let hash = ty.hash();

        if self.by_name.contains_key(&name) {
            return Err(RegistrationError::DuplicateType(name).into());
        }
        if hash.is_null() {
            return Err(RegistrationError::ReservedHash(name).into());
        }
        if let Some(&existing) = self.by_hash.get(&hash) {
            return Err(RegistrationError::HashCollision {
                name,
                existing: self.types[existing].name().to_string(),
                hash,
            }
            .into());
        }

        log::debug!("registered {} type '{}' as {}", ty.kind(), name, hash);
        let index = self.types.len();
        self.types.push(ty);
        self.by_name.insert(name, index);
        self.by_hash.insert(hash, index);
        Ok(hash)
    }

    fn info(&self, name: &str) -> TypeInfo {
        TypeInfo::new(name, self.hash_of(name))
    }

    /// Define a type with no data operations.
    pub fn define_opaque(&mut self, name: &str) -> Result<TypeHash> {
        let info = self.info(name);
        self.register(Box::new(OpaqueType::new(info)))
    }

    /// Define a primitive type and declare its casts.
    pub fn define_primitive<T: Primitive>(&mut self, name: &str) -> Result<TypeHash> {
        let info = self.info(name);
        let hash = self.register(Box::new(PrimitiveType::<T>::new(info)))?;
        T::declare_casts(&mut self.casts);
        Ok(hash)
    }

    /// Define an enum type and declare its casts.
    pub fn define_enum<E: ReflectEnum>(&mut self, builder: EnumBuilder<E>) -> Result<TypeHash> {
        let hash = self.hash_of(builder.name());
        let ty = builder.build(hash)?;
        let hash = self.register(Box::new(ty))?;
        self.casts.declare_enum::<E>();
        Ok(hash)
    }

    /// Define a class type. Its base and property types must already exist.
    pub fn define_class(&mut self, builder: ClassBuilder) -> Result<TypeHash> {
        let hash = self.hash_of(builder.name());
        let class = builder.build(hash, self)?;
        self.register(Box::new(class))
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Check if a type name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Look up a type by name.
    pub fn get_type(&self, name: &str) -> Result<&dyn Type> {
        self.by_name
            .get(name)
            .map(|&index| self.types[index].as_ref())
            .ok_or_else(|| Error::UnknownTypeName(name.to_string()))
    }

    /// Look up a type by hash.
    pub fn get_type_by_hash(&self, hash: TypeHash) -> Result<&dyn Type> {
        self.by_hash
            .get(&hash)
            .map(|&index| self.types[index].as_ref())
            .ok_or(Error::UnknownType(hash))
    }

    /// Look up a class type by name.
    pub fn get_class(&self, name: &str) -> Result<&ClassType> {
        self.get_type(name)?
            .as_class()
            .ok_or_else(|| Error::NotAClass(name.to_string()))
    }

    /// Look up a class type by hash.
    pub fn get_class_by_hash(&self, hash: TypeHash) -> Result<&ClassType> {
        let ty = self.get_type_by_hash(hash)?;
        ty.as_class()
            .ok_or_else(|| Error::NotAClass(ty.name().to_string()))
    }

    /// The class type of an object.
    pub fn class_of(&self, object: &dyn PropertyClass) -> Result<&ClassType> {
        self.get_class(object.class_name())
    }

    /// Create a blank instance of a class by name.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn PropertyClass>> {
        self.get_class(name)?.instantiate()
    }

    /// Every registered type, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &dyn Type> {
        self.types.iter().map(|ty| ty.as_ref())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ==========================================================================
    // Casts
    // ==========================================================================

    /// The cast table.
    pub fn casts(&self) -> &CastTable {
        &self.casts
    }

    /// The cast table, for declaring custom casts.
    pub fn casts_mut(&mut self) -> &mut CastTable {
        &mut self.casts
    }
}

impl fmt::Debug for TypeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSystem")
            .field("types", &self.types.len())
            .field("casts", &self.casts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Kind, LegacyHashCalculator, Value};

    /// Maps every name to the same hash.
    struct ConstantHash(u32);

    impl HashCalculator for ConstantHash {
        fn calculate_type_hash(&self, _name: &str) -> TypeHash {
            TypeHash(self.0)
        }
    }

    #[test]
    fn primitives_are_registered() {
        let types = TypeSystem::with_primitives().unwrap();
        assert_eq!(types.len(), 29);
        for ty in types.types() {
            assert_eq!(ty.kind(), Kind::Primitive);
            assert_eq!(types.get_type_by_hash(ty.hash()).unwrap().name(), ty.name());
        }
        assert_eq!(types.get_type("unsigned long").unwrap().value_type_name(), "u64");
    }

    #[test]
    fn legacy_calculator_primitives() {
        let mut types = TypeSystem::with_hash_calculator(LegacyHashCalculator);
        types.define_primitives().unwrap();
        let hash = LegacyHashCalculator.calculate_type_hash("int");
        assert_eq!(types.get_type("int").unwrap().hash(), hash);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut types = TypeSystem::new();
        types.define_opaque("Thing").unwrap();
        let err = types.define_opaque("Thing").unwrap_err();
        assert!(matches!(
            err,
            Error::Registration(RegistrationError::DuplicateType(_))
        ));
    }

    #[test]
    fn hash_collisions_are_rejected() {
        let mut types = TypeSystem::with_hash_calculator(ConstantHash(5));
        types.define_opaque("A").unwrap();
        let err = types.define_opaque("B").unwrap_err();
        match err {
            Error::Registration(RegistrationError::HashCollision { name, existing, hash }) => {
                assert_eq!(name, "B");
                assert_eq!(existing, "A");
                assert_eq!(hash, TypeHash(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn null_hash_is_reserved() {
        let mut types = TypeSystem::with_hash_calculator(ConstantHash(0));
        let err = types.define_opaque("Nothing").unwrap_err();
        assert!(matches!(
            err,
            Error::Registration(RegistrationError::ReservedHash(_))
        ));
        assert!(types.is_empty());
    }

    #[test]
    fn unknown_lookups() {
        let types = TypeSystem::with_primitives().unwrap();
        assert!(types.get_type("quad").unwrap_err().is_resolution());
        assert!(types.get_type_by_hash(TypeHash(1)).unwrap_err().is_resolution());
        assert!(matches!(types.get_class("int"), Err(Error::NotAClass(_))));
    }

    #[test]
    fn custom_casts() {
        let mut types = TypeSystem::with_primitives().unwrap();
        let value = Value::new(String::from("12"));
        assert!(value.cast::<i32>(types.casts()).is_err());

        types
            .casts_mut()
            .declare_with::<String, i32, _>(|s| s.parse().map_err(|e| format!("{e}")));
        let parsed = value.cast::<i32>(types.casts()).unwrap();
        assert_eq!(*parsed.get::<i32>().unwrap(), 12);
    }
}
