//! Per-owner goods ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{Good, GoodTag};

/// What `unstore` does when the held quantity is below the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortage {
    /// Refuse the whole request. Used when bookkeeping must balance exactly.
    Fail,
    /// Hand out whatever is held. Used by consumption flows.
    Clamp,
}

/// Ledger errors.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Strict unstore asked for more than is held.
    #[error("insufficient {tag}: held {held}, requested {requested}")]
    Insufficient {
        tag: GoodTag,
        held: u32,
        requested: u32,
    },
    /// The held quantity would not fit in a `u32`.
    #[error("{tag} overflows: held {held}, adding {added}")]
    Overflow { tag: GoodTag, held: u32, added: u32 },
}

/// Mapping of good tag to held quantity. Quantities never go below zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsLedger {
    goods: BTreeMap<GoodTag, u32>,
}

impl GoodsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `good.amount` to the held quantity of `good.tag`. On overflow the
    /// ledger is left untouched.
    pub fn store(&mut self, good: Good) -> Result<(), LedgerError> {
        if good.amount == 0 {
            return Ok(());
        }
        let held = self.quantity(good.tag);
        let total = held.checked_add(good.amount).ok_or(LedgerError::Overflow {
            tag: good.tag,
            held,
            added: good.amount,
        })?;
        self.goods.insert(good.tag, total);
        Ok(())
    }

    /// Remove up to `request.amount` of `request.tag`.
    ///
    /// With [`Shortage::Fail`] a shortfall leaves the ledger untouched and
    /// returns [`LedgerError::Insufficient`]. With [`Shortage::Clamp`] the
    /// held quantity is handed out instead and the call never fails.
    pub fn unstore(&mut self, request: Good, policy: Shortage) -> Result<Good, LedgerError> {
        let held = self.quantity(request.tag);
        let taken = if held >= request.amount {
            request.amount
        } else {
            match policy {
                Shortage::Fail => {
                    return Err(LedgerError::Insufficient {
                        tag: request.tag,
                        held,
                        requested: request.amount,
                    })
                }
                Shortage::Clamp => held,
            }
        };
        let left = held - taken;
        if left == 0 {
            self.goods.remove(&request.tag);
        } else {
            self.goods.insert(request.tag, left);
        }
        Ok(Good::new(request.tag, taken))
    }

    pub fn has(&self, tag: GoodTag, amount: u32) -> bool {
        self.quantity(tag) >= amount
    }

    pub fn quantity(&self, tag: GoodTag) -> u32 {
        self.goods.get(&tag).copied().unwrap_or(0)
    }

    /// Non-empty holdings in tag order.
    pub fn iter(&self) -> impl Iterator<Item = Good> + '_ {
        self.goods
            .iter()
            .map(|(&tag, &amount)| Good::new(tag, amount))
    }

    pub fn is_empty(&self) -> bool {
        self.goods.is_empty()
    }

    /// Move every holding into `other`, leaving this ledger empty. A holding
    /// that would overflow `other` stays here, as do the ones after it.
    pub fn drain_into(&mut self, other: &mut GoodsLedger) -> Result<(), LedgerError> {
        while let Some((&tag, &amount)) = self.goods.iter().next() {
            other.store(Good::new(tag, amount))?;
            self.goods.remove(&tag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strict_unstore_refuses_shortfall() {
        let mut ledger = GoodsLedger::new();
        ledger.store(Good::new(GoodTag::Meat, 3)).unwrap();
        let err = ledger
            .unstore(Good::new(GoodTag::Meat, 5), Shortage::Fail)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Insufficient {
                tag: GoodTag::Meat,
                held: 3,
                requested: 5
            }
        );
        assert_eq!(ledger.quantity(GoodTag::Meat), 3);
    }

    #[test]
    fn lenient_unstore_hands_out_what_is_held() {
        let mut ledger = GoodsLedger::new();
        ledger.store(Good::new(GoodTag::Meal, 4)).unwrap();
        let got = ledger
            .unstore(Good::new(GoodTag::Meal, 10), Shortage::Clamp)
            .unwrap();
        assert_eq!(got, Good::new(GoodTag::Meal, 4));
        assert_eq!(ledger.quantity(GoodTag::Meal), 0);
        let none = ledger
            .unstore(Good::new(GoodTag::House, 1), Shortage::Clamp)
            .unwrap();
        assert_eq!(none.amount, 0);
    }

    #[test]
    fn drain_moves_everything() {
        let mut escrow = GoodsLedger::new();
        escrow.store(Good::new(GoodTag::Hide, 2)).unwrap();
        let mut assets = GoodsLedger::new();
        assets.store(Good::new(GoodTag::Hide, 1)).unwrap();
        escrow.drain_into(&mut assets).unwrap();
        assert!(escrow.is_empty());
        assert_eq!(assets.quantity(GoodTag::Hide), 3);
    }

    #[test]
    fn overflowing_store_is_refused() {
        let mut ledger = GoodsLedger::new();
        ledger.store(Good::new(GoodTag::Tree, u32::MAX)).unwrap();
        assert_eq!(
            ledger.store(Good::new(GoodTag::Tree, 1)).unwrap_err(),
            LedgerError::Overflow {
                tag: GoodTag::Tree,
                held: u32::MAX,
                added: 1
            }
        );
        assert_eq!(ledger.quantity(GoodTag::Tree), u32::MAX);

        let mut escrow = GoodsLedger::new();
        escrow.store(Good::new(GoodTag::Tree, 2)).unwrap();
        assert!(escrow.drain_into(&mut ledger).is_err());
        assert_eq!(escrow.quantity(GoodTag::Tree), 2);
    }

    fn tag() -> impl Strategy<Value = GoodTag> {
        prop::sample::select(GoodTag::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn store_then_strict_unstore_restores(initial in 0u32..1_000, amount in 0u32..1_000, t in tag()) {
            let mut ledger = GoodsLedger::new();
            ledger.store(Good::new(t, initial)).unwrap();
            ledger.store(Good::new(t, amount)).unwrap();
            ledger.unstore(Good::new(t, amount), Shortage::Fail).unwrap();
            prop_assert_eq!(ledger.quantity(t), initial);
        }

        #[test]
        fn lenient_never_hands_out_more_than_held(ops in prop::collection::vec((tag(), 0u32..50, any::<bool>()), 0..64)) {
            let mut ledger = GoodsLedger::new();
            for (t, amount, store) in ops {
                let before = ledger.quantity(t);
                if store {
                    ledger.store(Good::new(t, amount)).unwrap();
                    prop_assert_eq!(ledger.quantity(t), before + amount);
                } else {
                    let got = ledger.unstore(Good::new(t, amount), Shortage::Clamp).unwrap();
                    prop_assert!(got.amount <= before);
                    prop_assert_eq!(ledger.quantity(t), before - got.amount);
                }
            }
        }
    }
}
