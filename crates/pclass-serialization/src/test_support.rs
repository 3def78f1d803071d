//! Classes shared by the serializer tests.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use pclass_core::{
    Bui, ClassType, EnumType, ObjectSlot, PropertyDef, PropertyFlags, TypeSystem,
    impl_property_class, impl_reflect_enum,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum School {
    #[default]
    Fire = 2,
    Ice = 3,
    Storm = 7,
}

impl_reflect_enum!(School);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Foo {
    pub x: i32,
    pub secret: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub id: u32,
    pub label: String,
    pub school: School,
    pub weights: Vec<f32>,
    pub child: ObjectSlot,
    pub extra: Vec<ObjectSlot>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaf {
    pub node: Node,
    pub level: Bui<24>,
    pub flag: bool,
}

impl_property_class!(Foo, "class Foo");
impl_property_class!(Node, "class Node");
impl_property_class!(Leaf, "class Leaf", node);

pub fn types() -> TypeSystem {
    types_with_schools(&[School::Fire, School::Ice, School::Storm])
}

/// The same classes, with only `schools` declared as elements of `enum School`.
pub fn types_with_schools(schools: &[School]) -> TypeSystem {
    let mut types = TypeSystem::with_primitives().unwrap();
    let school = schools.iter().fold(
        EnumType::builder::<School>("enum School"),
        |builder, school| builder.with_element(format!("{school:?}"), *school),
    );
    types.define_enum(school).unwrap();
    types
        .define_class(
            ClassType::builder::<Foo>("class Foo")
                .with_property(
                    PropertyDef::field("x", "int", |f: &Foo| &f.x, |f: &mut Foo| &mut f.x)
                        .with_flags(PropertyFlags::PUBLIC),
                )
                .with_property(PropertyDef::field(
                    "secret",
                    "std::string",
                    |f: &Foo| &f.secret,
                    |f: &mut Foo| &mut f.secret,
                )),
        )
        .unwrap();
    types
        .define_class(
            ClassType::builder::<Node>("class Node")
                .with_property(
                    PropertyDef::field("id", "unsigned int", |n: &Node| &n.id, |n: &mut Node| {
                        &mut n.id
                    })
                    .with_flags(PropertyFlags::PUBLIC),
                )
                .with_property(PropertyDef::field(
                    "label",
                    "std::string",
                    |n: &Node| &n.label,
                    |n: &mut Node| &mut n.label,
                ))
                .with_property(PropertyDef::field(
                    "school",
                    "enum School",
                    |n: &Node| &n.school,
                    |n: &mut Node| &mut n.school,
                ))
                .with_property(PropertyDef::list(
                    "weights",
                    "float",
                    |n: &Node| &n.weights,
                    |n: &mut Node| &mut n.weights,
                ))
                .with_property(
                    PropertyDef::field(
                        "child",
                        "class Node",
                        |n: &Node| &n.child,
                        |n: &mut Node| &mut n.child,
                    )
                    .with_flags(PropertyFlags::PUBLIC),
                )
                .with_property(PropertyDef::list(
                    "extra",
                    "class Node",
                    |n: &Node| &n.extra,
                    |n: &mut Node| &mut n.extra,
                )),
        )
        .unwrap();
    types
        .define_class(
            ClassType::builder::<Leaf>("class Leaf")
                .with_base("class Node")
                .with_property(PropertyDef::field(
                    "level",
                    "u24",
                    |l: &Leaf| &l.level,
                    |l: &mut Leaf| &mut l.level,
                ))
                .with_property(PropertyDef::field(
                    "flag",
                    "bool",
                    |l: &Leaf| &l.flag,
                    |l: &mut Leaf| &mut l.flag,
                )),
        )
        .unwrap();
    types
}

/// A node with a derived child, a null slot and a populated list.
pub fn sample_tree() -> Node {
    let leaf = Leaf {
        node: Node {
            id: 2,
            label: "leaf".to_string(),
            school: School::Storm,
            ..Node::default()
        },
        level: Bui::<24>::from_u64(16_777_215),
        flag: true,
    };
    Node {
        id: 1,
        label: "root".to_string(),
        school: School::Ice,
        weights: vec![0.5, -1.25],
        child: Some(Box::new(leaf)),
        extra: vec![
            None,
            Some(Box::new(Node {
                id: 3,
                ..Node::default()
            })),
        ],
    }
}
