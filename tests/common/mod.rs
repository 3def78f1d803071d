//! Shared object model for the integration tests: a small inventory of
//! items held by a character, with derived item classes.

#![allow(dead_code)]

use num_enum::{IntoPrimitive, TryFromPrimitive};
use pclass::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Rarity {
    #[default]
    Common = 0,
    Rare = 1,
    Epic = 4,
}

impl_reflect_enum!(Rarity);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Foo {
    pub x: i32,
    pub secret: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub id: u64,
    pub name: WideString,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weapon {
    pub item: Item,
    pub damage: Bi<12>,
    pub speed: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Character {
    pub name: String,
    pub level: u8,
    pub stats: [i16; 3],
    pub gold: Bui<24>,
    pub alive: bool,
    pub main_hand: ObjectSlot,
    pub bag: Vec<ObjectSlot>,
}

impl_property_class!(Foo, "class Foo");
impl_property_class!(Item, "class Item");
impl_property_class!(Weapon, "class Weapon", item);
impl_property_class!(Character, "class Character");

pub fn types() -> TypeSystem {
    let mut types = TypeSystem::with_primitives().unwrap();
    register(&mut types);
    types
}

pub fn register(types: &mut TypeSystem) {
    types
        .define_enum(
            EnumType::builder::<Rarity>("enum Rarity")
                .with_element("Common", Rarity::Common)
                .with_element("Rare", Rarity::Rare)
                .with_element("Epic", Rarity::Epic),
        )
        .unwrap();
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
            ClassType::builder::<Item>("class Item")
                .with_property(PropertyDef::field(
                    "id",
                    "unsigned long",
                    |i: &Item| &i.id,
                    |i: &mut Item| &mut i.id,
                ))
                .with_property(PropertyDef::field(
                    "name",
                    "std::wstring",
                    |i: &Item| &i.name,
                    |i: &mut Item| &mut i.name,
                ))
                .with_property(PropertyDef::field(
                    "rarity",
                    "enum Rarity",
                    |i: &Item| &i.rarity,
                    |i: &mut Item| &mut i.rarity,
                )),
        )
        .unwrap();
    types.define_primitive::<Bi<12>>("bi12").unwrap();
    types
        .define_class(
            ClassType::builder::<Weapon>("class Weapon")
                .with_base("class Item")
                .with_property(PropertyDef::field(
                    "damage",
                    "bi12",
                    |w: &Weapon| &w.damage,
                    |w: &mut Weapon| &mut w.damage,
                ))
                .with_property(PropertyDef::field(
                    "speed",
                    "double",
                    |w: &Weapon| &w.speed,
                    |w: &mut Weapon| &mut w.speed,
                )),
        )
        .unwrap();
    types
        .define_class(
            ClassType::builder::<Character>("class Character")
                .with_property(
                    PropertyDef::field(
                        "name",
                        "std::string",
                        |c: &Character| &c.name,
                        |c: &mut Character| &mut c.name,
                    )
                    .with_flags(PropertyFlags::PUBLIC | PropertyFlags::SAVE),
                )
                .with_property(PropertyDef::field(
                    "level",
                    "unsigned char",
                    |c: &Character| &c.level,
                    |c: &mut Character| &mut c.level,
                ))
                .with_property(PropertyDef::array(
                    "stats",
                    "short",
                    |c: &Character| &c.stats,
                    |c: &mut Character| &mut c.stats,
                ))
                .with_property(PropertyDef::field(
                    "gold",
                    "u24",
                    |c: &Character| &c.gold,
                    |c: &mut Character| &mut c.gold,
                ))
                .with_property(PropertyDef::field(
                    "alive",
                    "bool",
                    |c: &Character| &c.alive,
                    |c: &mut Character| &mut c.alive,
                ))
                .with_property(
                    PropertyDef::field(
                        "main_hand",
                        "class Weapon",
                        |c: &Character| &c.main_hand,
                        |c: &mut Character| &mut c.main_hand,
                    )
                    .with_flags(PropertyFlags::PUBLIC),
                )
                .with_property(PropertyDef::list(
                    "bag",
                    "class Item",
                    |c: &Character| &c.bag,
                    |c: &mut Character| &mut c.bag,
                )),
        )
        .unwrap();
}

pub fn hero() -> Character {
    Character {
        name: "Aurora".to_string(),
        level: 42,
        stats: [10, -3, 250],
        gold: Bui::<24>::from_u64(16_777_215),
        alive: true,
        main_hand: Some(Box::new(Weapon {
            item: Item {
                id: u64::MAX,
                name: WideString::from("Staff of Storms"),
                rarity: Rarity::Epic,
            },
            damage: Bi::<12>::from_i64(-2048),
            speed: 1.5,
        })),
        bag: vec![
            Some(Box::new(Item {
                id: 7,
                name: WideString::from("Mana Potion"),
                rarity: Rarity::Common,
            })),
            None,
            Some(Box::new(Weapon {
                item: Item {
                    id: 8,
                    name: WideString::from("Dagger"),
                    rarity: Rarity::Rare,
                },
                damage: Bi::<12>::from_i64(2047),
                speed: 0.25,
            })),
        ],
    }
}
