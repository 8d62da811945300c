#![deny(warnings)]

//! Core domain models for the agent economy.
//!
//! Goods and ledgers, the recipe catalog, requirement trees and the small
//! vocabulary shared with the world clock. Everything here is plain data
//! with validation helpers guarding the basic invariants.

mod clock;
mod config;
mod goods;
mod ledger;
mod projects;
mod recipe;
mod requirements;

pub use clock::{ClockEvent, Point, SubscriptionId};
pub use config::{SimConfig, SourceSite};
pub use goods::{Good, GoodTag};
pub use ledger::{GoodsLedger, LedgerError, Shortage};
pub use projects::Projects;
pub use recipe::{standard_recipes, RecipeCatalog, RecipeModel};
pub use requirements::RequirementTreeNode;

use thiserror::Error;

/// Validation errors for catalog and configuration invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A component or request names a good without a recipe.
    #[error("no recipe for {0}")]
    MissingRecipe(GoodTag),
    /// Two recipes share a tag.
    #[error("duplicate recipe for {0}")]
    DuplicateRecipe(GoodTag),
    /// Manhours must be strictly positive.
    #[error("recipe {0} must take > 0 manhours")]
    NonPositiveManhours(GoodTag),
    /// Yield must be at least one.
    #[error("recipe {0} must yield >= 1")]
    NonPositiveYield(GoodTag),
    /// A component slot lists no alternatives.
    #[error("recipe {0} has an empty component slot")]
    EmptyComponentSlot(GoodTag),
    /// A component alternative asks for zero goods.
    #[error("recipe {recipe} lists {component} with zero amount")]
    ZeroComponentAmount {
        recipe: GoodTag,
        component: GoodTag,
    },
    /// A recipe transitively requires itself.
    #[error("recipe {0} requires itself")]
    CyclicRecipe(GoodTag),
    /// Ratio outside [0, 1].
    #[error("{0} must be within [0,1]")]
    InvalidRatio(&'static str),
    /// Other configuration problem.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Text that names no good.
    #[error("unknown good: {0}")]
    UnknownGood(String),
}
