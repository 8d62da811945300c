//! Simulation configuration, loadable from a scenario file.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ClockEvent, GoodTag, Point, RecipeCatalog, RecipeModel, ValidationError};

/// A world object agents walk to when producing `tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSite {
    pub tag: GoodTag,
    pub at: Point,
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Hour notifications per day.
    pub hours_per_day: u32,
    /// Day notifications per month.
    pub days_per_month: u32,
    /// Meals each agent must eat per month.
    pub monthly_food: u32,
    /// Share of the monthly food still owed at reset that means starvation.
    pub starvation_ratio: f64,
    /// Market price floor as a share of the baseline production cost.
    pub price_floor_ratio: Decimal,
    /// Clock event at which markets reprice.
    pub price_period: ClockEvent,
    /// Agents spawned at start.
    pub agents: u32,
    /// Whether agents can see a market.
    pub with_market: bool,
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// Hours a dead agent lingers before removal.
    pub dissipation_hours: u32,
    /// Resource sites in the world.
    pub sources: Vec<SourceSite>,
    /// Replaces the standard recipe table when present.
    pub recipes: Option<Vec<RecipeModel>>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 24,
            days_per_month: 30,
            monthly_food: 10,
            starvation_ratio: 0.8,
            price_floor_ratio: Decimal::new(3, 1),
            price_period: ClockEvent::Day,
            agents: 3,
            with_market: false,
            rng_seed: 42,
            dissipation_hours: 10,
            sources: vec![
                SourceSite {
                    tag: GoodTag::Animal,
                    at: Point::new(120, -40),
                },
                SourceSite {
                    tag: GoodTag::Tree,
                    at: Point::new(-80, 60),
                },
            ],
            recipes: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hours_per_day == 0 || self.days_per_month == 0 {
            return Err(ValidationError::InvalidConfig(
                "hours_per_day and days_per_month must be > 0".to_string(),
            ));
        }
        if self.monthly_food == 0 {
            return Err(ValidationError::InvalidConfig(
                "monthly_food must be > 0".to_string(),
            ));
        }
        // A zero ratio would starve every agent at the first reset.
        if !(self.starvation_ratio.is_finite()
            && self.starvation_ratio > 0.0
            && self.starvation_ratio <= 1.0)
        {
            return Err(ValidationError::InvalidRatio("starvation_ratio"));
        }
        if self.price_floor_ratio < Decimal::ZERO || self.price_floor_ratio > Decimal::ONE {
            return Err(ValidationError::InvalidRatio("price_floor_ratio"));
        }
        if self.price_period == ClockEvent::Hour {
            return Err(ValidationError::InvalidConfig(
                "price_period must be day or month".to_string(),
            ));
        }
        Ok(())
    }

    /// Recipe catalog for this configuration.
    pub fn catalog(&self) -> Result<RecipeCatalog, ValidationError> {
        match &self.recipes {
            Some(recipes) => RecipeCatalog::new(recipes.clone()),
            None => RecipeCatalog::standard(),
        }
    }
}
