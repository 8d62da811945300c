//! Per-good supply/demand price tracking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{Good, GoodTag, RecipeCatalog};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{estimate_baseline_production_cost, EconError};

/// Price state of one traded good.
///
/// Supply and demand accumulate over a pricing period; `update_price`
/// rescales the price by their ratio and clamps it to the floor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodTracker {
    price: Decimal,
    base_price: Decimal,
    floor: Decimal,
    supply: u64,
    demand: u64,
}

impl GoodTracker {
    pub fn new(base_price: Decimal, floor_ratio: Decimal) -> Self {
        let floor = (base_price * floor_ratio).max(Decimal::ZERO);
        Self {
            price: base_price.max(floor),
            base_price,
            floor,
            supply: 0,
            demand: 0,
        }
    }

    /// Goods offered this period.
    pub fn supply(&mut self, amount: u32) {
        self.supply = self.supply.saturating_add(u64::from(amount));
    }

    /// Goods requested this period.
    pub fn demand(&mut self, amount: u32) {
        self.demand = self.demand.saturating_add(u64::from(amount));
    }

    /// Close the period: `price *= demand / supply` when both were seen,
    /// otherwise the price collapses to the floor. Counters reset.
    pub fn update_price(&mut self) {
        let next = if self.supply > 0 && self.demand > 0 {
            let ratio = Decimal::from(self.demand) / Decimal::from(self.supply);
            self.price
                .checked_mul(ratio)
                .unwrap_or(Decimal::MAX)
                .round_dp(6)
        } else {
            Decimal::ZERO
        };
        self.price = next.max(self.floor);
        self.supply = 0;
        self.demand = 0;
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn floor(&self) -> Decimal {
        self.floor
    }

    /// Counters accumulated so far this period, as `(supply, demand)`.
    pub fn pending(&self) -> (u64, u64) {
        (self.supply, self.demand)
    }
}

/// Collection of trackers, one per good, created on first reference.
#[derive(Clone, Debug)]
pub struct Market {
    catalog: Arc<RecipeCatalog>,
    floor_ratio: Decimal,
    trackers: BTreeMap<GoodTag, GoodTracker>,
}

impl Market {
    pub fn new(catalog: Arc<RecipeCatalog>, floor_ratio: Decimal) -> Result<Self, EconError> {
        if floor_ratio < Decimal::ZERO || floor_ratio > Decimal::ONE {
            return Err(EconError::InvalidFloorRatio(floor_ratio));
        }
        Ok(Self {
            catalog,
            floor_ratio,
            trackers: BTreeMap::new(),
        })
    }

    /// Tracker for `tag`, created with the baseline production cost as base
    /// price when first referenced.
    pub fn tracker(&mut self, tag: GoodTag) -> Result<&mut GoodTracker, EconError> {
        let catalog = &self.catalog;
        let floor_ratio = self.floor_ratio;
        match self.trackers.entry(tag) {
            std::collections::btree_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            std::collections::btree_map::Entry::Vacant(entry) => {
                let tree = catalog
                    .requirements(tag)
                    .ok_or(EconError::UnknownGood(tag))?;
                let base = Decimal::from(estimate_baseline_production_cost(tree, catalog));
                tracing::debug!(%tag, %base, "opening market tracker");
                Ok(entry.insert(GoodTracker::new(base, floor_ratio)))
            }
        }
    }

    pub fn supply(&mut self, good: Good) -> Result<(), EconError> {
        self.tracker(good.tag)?.supply(good.amount);
        Ok(())
    }

    pub fn demand(&mut self, good: Good) -> Result<(), EconError> {
        self.tracker(good.tag)?.demand(good.amount);
        Ok(())
    }

    /// Close the pricing period for every tracked good.
    pub fn update_prices(&mut self) {
        for (tag, tracker) in &mut self.trackers {
            let (supply, demand) = tracker.pending();
            tracker.update_price();
            tracing::trace!(%tag, supply, demand, price = %tracker.price(), "repriced");
        }
    }

    /// Current price, if the good has been traded.
    pub fn price(&self, tag: GoodTag) -> Option<Decimal> {
        self.trackers.get(&tag).map(GoodTracker::price)
    }

    pub fn prices(&self) -> impl Iterator<Item = (GoodTag, Decimal)> + '_ {
        self.trackers.iter().map(|(&tag, t)| (tag, t.price()))
    }
}
