//! In-progress production runs, tracked by remaining hours.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::GoodTag;

/// Remaining hours per good currently being produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projects {
    hours_left: BTreeMap<GoodTag, u32>,
}

impl Projects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a project. Returns `false` if one is already open for `tag`.
    pub fn open(&mut self, tag: GoodTag, hours: u32) -> bool {
        if self.hours_left.contains_key(&tag) {
            return false;
        }
        self.hours_left.insert(tag, hours);
        true
    }

    pub fn remaining(&self, tag: GoodTag) -> Option<u32> {
        self.hours_left.get(&tag).copied()
    }

    /// Spend one hour on `tag` and return the hours still left.
    pub fn work(&mut self, tag: GoodTag) -> Option<u32> {
        let left = self.hours_left.get_mut(&tag)?;
        *left = left.saturating_sub(1);
        Some(*left)
    }

    pub fn close(&mut self, tag: GoodTag) -> Option<u32> {
        self.hours_left.remove(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.hours_left.is_empty()
    }
}
