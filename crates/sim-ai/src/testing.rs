//! In-memory worker used by unit tests.

use rust_decimal::Decimal;
use sim_core::{Good, GoodTag, GoodsLedger, Point, Projects, RecipeCatalog, SubscriptionId};
use sim_econ::{EstimationContext, Market, Skills};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{NeedsSubject, WorkerController};

#[derive(Debug, Default)]
pub(crate) struct TestWorker {
    pub assets: GoodsLedger,
    pub projects: Projects,
    pub skill: Skills,
    pub market: Option<Market>,
    pub sites: Vec<(GoodTag, Point)>,
    pub moved_to: Vec<Point>,
    pub finished: Vec<Good>,
    pub starved: u32,
    /// Drop this good from assets right after a run stores it.
    pub steal_on_finish: Option<GoodTag>,
    subscriptions: BTreeSet<SubscriptionId>,
    next_id: u64,
}

impl TestWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market() -> Self {
        let market = Market::new(Arc::new(RecipeCatalog::standard().unwrap()), Decimal::new(3, 1))
            .expect("valid floor ratio");
        Self {
            market: Some(market),
            ..Self::default()
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn context<'a>(&'a self, catalog: &'a RecipeCatalog) -> EstimationContext<'a> {
        EstimationContext {
            catalog,
            skill: &self.skill,
            projects: &self.projects,
            assets: &self.assets,
            market: self.market.as_ref(),
        }
    }
}

impl NeedsSubject for TestWorker {
    fn assets(&self) -> &GoodsLedger {
        &self.assets
    }

    fn assets_mut(&mut self) -> &mut GoodsLedger {
        &mut self.assets
    }

    fn on_starve(&mut self) {
        self.starved += 1;
    }
}

impl WorkerController for TestWorker {
    fn projects(&self) -> &Projects {
        &self.projects
    }

    fn projects_mut(&mut self) -> &mut Projects {
        &mut self.projects
    }

    fn skill(&self) -> &Skills {
        &self.skill
    }

    fn market(&self) -> Option<&Market> {
        self.market.as_ref()
    }

    fn market_mut(&mut self) -> Option<&mut Market> {
        self.market.as_mut()
    }

    fn subscribe_hour(&mut self) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.insert(id);
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.remove(&id);
    }

    fn resource_site(&self, tag: GoodTag) -> Option<Point> {
        self.sites.iter().find(|(t, _)| *t == tag).map(|&(_, p)| p)
    }

    fn move_to(&mut self, point: Point) {
        self.moved_to.push(point);
    }

    fn hold(&mut self, _point: Point) {}

    fn stop(&mut self) {}

    fn on_finished(&mut self, reward: Good) {
        if self.steal_on_finish == Some(reward.tag) {
            let _ = self
                .assets
                .unstore(reward, sim_core::Shortage::Clamp);
        }
        self.finished.push(reward);
    }
}
