//! Reflectable objects.
//!
//! Every object described by a [`ClassType`](crate::ClassType) implements
//! [`PropertyClass`]. Derived classes embed their base as a field and expose
//! it through [`PropertyClass::base`], which is how inherited properties are
//! reached.

use std::any::Any;
use std::fmt;

/// A reflectable object.
///
/// Usually implemented with [`impl_property_class!`](crate::impl_property_class).
pub trait PropertyClass: Any + Send + Sync + fmt::Debug {
    /// Name of the registered class this object is an instance of.
    fn class_name(&self) -> &'static str;

    fn object_any(&self) -> &dyn Any;

    fn object_any_mut(&mut self) -> &mut dyn Any;

    /// Deep copy.
    fn clone_object(&self) -> Box<dyn PropertyClass>;

    /// Structural equality with another object of the same concrete type.
    fn object_eq(&self, other: &dyn PropertyClass) -> bool;

    /// The embedded base class instance.
    fn base(&self) -> Option<&dyn PropertyClass> {
        None
    }

    /// The embedded base class instance.
    fn base_mut(&mut self) -> Option<&mut dyn PropertyClass> {
        None
    }
}

/// A nullable, owned, polymorphic object slot.
pub type ObjectSlot = Option<Box<dyn PropertyClass>>;

impl<'a> dyn PropertyClass + 'a {
    /// Downcast to a concrete class.
    pub fn downcast_ref<T: PropertyClass>(&self) -> Option<&T> {
        self.object_any().downcast_ref::<T>()
    }

    /// Downcast to a concrete class.
    pub fn downcast_mut<T: PropertyClass>(&mut self) -> Option<&mut T> {
        self.object_any_mut().downcast_mut::<T>()
    }

    /// Walk `depth` steps up the base chain.
    pub fn ancestor(&self, depth: usize) -> Option<&dyn PropertyClass> {
        let mut object: &dyn PropertyClass = self;
        for _ in 0..depth {
            object = object.base()?;
        }
        Some(object)
    }

    /// Walk `depth` steps up the base chain.
    pub fn ancestor_mut(&mut self, depth: usize) -> Option<&mut dyn PropertyClass> {
        let mut object: &mut dyn PropertyClass = self;
        for _ in 0..depth {
            object = object.base_mut()?;
        }
        Some(object)
    }
}

impl Clone for Box<dyn PropertyClass> {
    fn clone(&self) -> Self {
        (**self).clone_object()
    }
}

impl PartialEq for dyn PropertyClass {
    fn eq(&self, other: &Self) -> bool {
        self.object_eq(other)
    }
}

/// Implement [`PropertyClass`] for a `Clone + PartialEq + Debug` struct.
///
/// ```
/// use pclass_core::impl_property_class;
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Base { id: u32 }
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Derived { base: Base, name: String }
///
/// impl_property_class!(Base, "class Base");
/// impl_property_class!(Derived, "class Derived", base);
/// ```
#[macro_export]
macro_rules! impl_property_class {
    ($ty:ty, $name:expr) => {
        $crate::impl_property_class!(@impl $ty, $name, {});
    };
    ($ty:ty, $name:expr, $base:ident) => {
        $crate::impl_property_class!(@impl $ty, $name, {
            fn base(&self) -> Option<&dyn $crate::PropertyClass> {
                Some(&self.$base)
            }

            fn base_mut(&mut self) -> Option<&mut dyn $crate::PropertyClass> {
                Some(&mut self.$base)
            }
        });
    };
    (@impl $ty:ty, $name:expr, { $($extra:tt)* }) => {
        impl $crate::PropertyClass for $ty {
            fn class_name(&self) -> &'static str {
                $name
            }

            fn object_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn object_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn clone_object(&self) -> Box<dyn $crate::PropertyClass> {
                Box::new(::std::clone::Clone::clone(self))
            }

            fn object_eq(&self, other: &dyn $crate::PropertyClass) -> bool {
                other
                    .object_any()
                    .downcast_ref::<Self>()
                    .is_some_and(|other| self == other)
            }

            $($extra)*
        }
    };
}
