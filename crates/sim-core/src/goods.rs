//! Good tags and quantified goods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Closed set of goods known to the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoodTag {
    /// Live game, hunted at an animal source.
    Animal,
    /// Raw meat butchered from an animal.
    Meat,
    /// Prepared food eaten to satisfy the monthly food need.
    Meal,
    /// Raw skin of an animal.
    Skin,
    /// Tanned hide.
    Hide,
    /// Clothing made of hides.
    Cloth,
    /// Felled tree.
    Tree,
    /// Shelter built from trees.
    House,
    /// Spear: shaft plus binding.
    Weapon,
}

impl GoodTag {
    /// Every tag, in declaration order.
    pub const ALL: [GoodTag; 9] = [
        GoodTag::Animal,
        GoodTag::Meat,
        GoodTag::Meal,
        GoodTag::Skin,
        GoodTag::Hide,
        GoodTag::Cloth,
        GoodTag::Tree,
        GoodTag::House,
        GoodTag::Weapon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GoodTag::Animal => "ANIMAL",
            GoodTag::Meat => "MEAT",
            GoodTag::Meal => "MEAL",
            GoodTag::Skin => "SKIN",
            GoodTag::Hide => "HIDE",
            GoodTag::Cloth => "CLOTH",
            GoodTag::Tree => "TREE",
            GoodTag::House => "HOUSE",
            GoodTag::Weapon => "WEAPON",
        }
    }
}

impl fmt::Display for GoodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoodTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        GoodTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == upper)
            .ok_or_else(|| ValidationError::UnknownGood(s.to_string()))
    }
}

/// A quantity of one good. Immutable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Good {
    pub tag: GoodTag,
    pub amount: u32,
}

impl Good {
    pub const fn new(tag: GoodTag, amount: u32) -> Self {
        Self { tag, amount }
    }
}

impl fmt::Display for Good {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.amount, self.tag)
    }
}
