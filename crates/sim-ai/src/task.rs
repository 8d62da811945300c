//! Leaf units of work. A task knows nothing about its place in a tree.

use sim_core::{Good, GoodsLedger, RecipeModel, Shortage, SubscriptionId};
use tracing::{debug, trace, warn};

use crate::{SchedulerError, WorkerController};

/// Outcome of driving a task one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Consuming clock hours.
    Running,
    /// Parked on something outside the worker's control.
    Waiting,
    /// Done; the good sits in the worker's assets.
    Finished(Good),
}

/// Go to the workplace and work until the project is done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductionTask {
    reward: Good,
    manhours: u32,
    components: Vec<Good>,
    subscription: Option<SubscriptionId>,
}

impl ProductionTask {
    pub fn new(recipe: &RecipeModel) -> Self {
        Self {
            reward: recipe.reward(),
            manhours: recipe.manhours,
            components: recipe.first_choices().collect(),
            subscription: None,
        }
    }

    pub fn reward(&self) -> Good {
        self.reward
    }

    pub fn components(&self) -> &[Good] {
        &self.components
    }

    fn execute<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
        escrow: Option<&mut GoodsLedger>,
    ) -> Result<TaskStatus, SchedulerError> {
        let tag = self.reward.tag;
        if ctrl.projects().remaining(tag).is_none() {
            match escrow {
                Some(escrow) => pay(escrow, &self.components)?,
                None => pay(ctrl.assets_mut(), &self.components)?,
            }
            ctrl.projects_mut().open(tag, self.manhours);
            debug!(%tag, hours = self.manhours, "project opened");
        }
        if self.subscription.is_none() {
            self.subscription = Some(ctrl.subscribe_hour());
        }
        Ok(TaskStatus::Running)
    }

    fn on_hour<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<TaskStatus, SchedulerError> {
        let tag = self.reward.tag;
        if let Some(site) = ctrl.resource_site(tag) {
            ctrl.move_to(site);
        }
        let hours_left = ctrl
            .projects_mut()
            .work(tag)
            .ok_or(SchedulerError::MissingProject(tag))?;
        trace!(%tag, hours_left, "worked an hour");
        if hours_left > 0 {
            return Ok(TaskStatus::Running);
        }
        ctrl.projects_mut().close(tag);
        ctrl.assets_mut().store(self.reward)?;
        self.pause(ctrl);
        ctrl.stop();
        ctrl.on_finished(self.reward);
        debug!(reward = %self.reward, "production finished");
        Ok(TaskStatus::Finished(self.reward))
    }

    fn pause<W: WorkerController + ?Sized>(&mut self, ctrl: &mut W) {
        if let Some(id) = self.subscription.take() {
            ctrl.unsubscribe(id);
        }
    }
}

/// Pay every component out of `source`, or nothing at all.
fn pay(source: &mut GoodsLedger, components: &[Good]) -> Result<(), SchedulerError> {
    let mut bill = GoodsLedger::new();
    for &good in components {
        bill.store(good)?;
    }
    if let Some(short) = bill.iter().find(|g| !source.has(g.tag, g.amount)) {
        return Err(SchedulerError::ComponentsMissing {
            tag: short.tag,
            needed: short.amount,
            held: source.quantity(short.tag),
        });
    }
    for good in bill.iter() {
        source.unstore(good, Shortage::Fail)?;
    }
    Ok(())
}

/// Acquire a good from the market.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuyTask {
    good: Good,
    requested: bool,
}

impl BuyTask {
    pub fn good(&self) -> Good {
        self.good
    }

    fn execute<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<TaskStatus, SchedulerError> {
        let market = ctrl
            .market_mut()
            .ok_or(SchedulerError::MissingMarket(self.good.tag))?;
        if !self.requested {
            market.demand(self.good)?;
            self.requested = true;
        }
        // Purchases are not settled against inventory yet; the order stays open.
        warn!(good = %self.good, "buy order placed without settlement");
        Ok(TaskStatus::Waiting)
    }
}

/// Claim goods already held; completes without clock time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveTask {
    good: Good,
}

impl ReserveTask {
    pub fn good(&self) -> Good {
        self.good
    }

    fn execute<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<TaskStatus, SchedulerError> {
        let held = ctrl.assets().quantity(self.good.tag);
        if held < self.good.amount {
            return Err(SchedulerError::ReserveShort {
                tag: self.good.tag,
                needed: self.good.amount,
                held,
            });
        }
        trace!(good = %self.good, "reserved from stock");
        Ok(TaskStatus::Finished(self.good))
    }
}

/// A leaf unit of work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    GenericProduction(ProductionTask),
    Buy(BuyTask),
    Reserve(ReserveTask),
}

impl Task {
    pub fn production(recipe: &RecipeModel) -> Self {
        Task::GenericProduction(ProductionTask::new(recipe))
    }

    pub fn buy(good: Good) -> Self {
        Task::Buy(BuyTask {
            good,
            requested: false,
        })
    }

    pub fn reserve(good: Good) -> Self {
        Task::Reserve(ReserveTask { good })
    }

    /// The good this task ends up providing.
    pub fn good(&self) -> Good {
        match self {
            Task::GenericProduction(t) => t.reward(),
            Task::Buy(t) => t.good(),
            Task::Reserve(t) => t.good(),
        }
    }

    /// Start or resume the task.
    ///
    /// Production pays its components from `escrow` when given, otherwise
    /// from the worker's assets. A resumed project pays nothing.
    pub fn execute<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
        escrow: Option<&mut GoodsLedger>,
    ) -> Result<TaskStatus, SchedulerError> {
        match self {
            Task::GenericProduction(t) => t.execute(ctrl, escrow),
            Task::Buy(t) => t.execute(ctrl),
            Task::Reserve(t) => t.execute(ctrl),
        }
    }

    /// Hour notification for the task's subscription.
    pub fn on_hour<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<TaskStatus, SchedulerError> {
        match self {
            Task::GenericProduction(t) => t.on_hour(ctrl),
            Task::Buy(_) | Task::Reserve(_) => Ok(TaskStatus::Waiting),
        }
    }

    /// Detach from the clock. Project hours stay in the worker's projects,
    /// so a later `execute` resumes where this left off.
    pub fn pause<W: WorkerController + ?Sized>(&mut self, ctrl: &mut W) {
        match self {
            Task::GenericProduction(t) => t.pause(ctrl),
            Task::Buy(_) | Task::Reserve(_) => {}
        }
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        match self {
            Task::GenericProduction(t) => t.subscription,
            Task::Buy(_) | Task::Reserve(_) => None,
        }
    }
}
