//! Capabilities the owning agent lends to its needs and tasks.

use sim_core::{Good, GoodTag, GoodsLedger, Point, Projects, SubscriptionId};
use sim_econ::{Market, Skills};

/// Whoever eats and can starve.
pub trait NeedsSubject {
    fn assets(&self) -> &GoodsLedger;
    fn assets_mut(&mut self) -> &mut GoodsLedger;
    /// The monthly food check failed. The agent decides the consequence.
    fn on_starve(&mut self);
}

/// Everything a task may touch while executing on behalf of a worker.
pub trait WorkerController: NeedsSubject {
    fn projects(&self) -> &Projects;
    fn projects_mut(&mut self) -> &mut Projects;
    fn skill(&self) -> &Skills;
    fn market(&self) -> Option<&Market>;
    fn market_mut(&mut self) -> Option<&mut Market>;

    /// Register for hour notifications. The returned handle is delivered
    /// back with every notification.
    fn subscribe_hour(&mut self) -> SubscriptionId;
    /// Deregister; no notification reaches `id` afterwards.
    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Nearest world object producing `tag`, if any.
    fn resource_site(&self, tag: GoodTag) -> Option<Point>;
    fn move_to(&mut self, point: Point);
    fn hold(&mut self, point: Point);
    fn stop(&mut self);

    /// A production run just stored `reward` into assets.
    fn on_finished(&mut self, _reward: Good) {}
}
