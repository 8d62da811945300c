//! Resource sites agents walk to while producing.

use sim_core::{GoodTag, Point, SourceSite};

/// Read-only view of the world's resource sources.
#[derive(Clone, Debug, Default)]
pub struct WorldContext {
    sites: Vec<SourceSite>,
}

impl WorldContext {
    pub fn new(sites: Vec<SourceSite>) -> Self {
        Self { sites }
    }

    pub fn sites(&self) -> &[SourceSite] {
        &self.sites
    }

    /// Closest site producing `tag`. Ties go to the first listed.
    pub fn nearest(&self, tag: GoodTag, from: Point) -> Option<Point> {
        self.sites
            .iter()
            .filter(|site| site.tag == tag)
            .min_by_key(|site| site.at.distance(from))
            .map(|site| site.at)
    }
}
