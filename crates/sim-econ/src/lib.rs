#![deny(warnings)]

//! Economic models: acquisition costing and market price discovery.
//!
//! This crate provides:
//! - Produce-versus-buy cost estimation over requirement trees
//! - Baseline (unskilled, market-free) production cost
//! - Per-good supply/demand price trackers with a floor

mod estimate;
mod market;

pub use estimate::{
    choose_action, estimate_baseline_production_cost, estimate_best_cost, estimate_buy,
    estimate_produce, eval_best_action, manhours_term, Action, EstimationContext, Skills,
};
pub use market::{GoodTracker, Market};

use rust_decimal::Decimal;
use sim_core::GoodTag;
use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// The market was asked about a good with no recipe.
    #[error("no recipe to price {0}")]
    UnknownGood(GoodTag),
    /// Floor ratio must be within [0, 1].
    #[error("invalid price floor ratio: {0}")]
    InvalidFloorRatio(Decimal),
}
