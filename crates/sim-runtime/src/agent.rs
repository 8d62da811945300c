//! Agents: ECS component, body state and the controller lent to tasks.

use bevy_ecs::prelude::*;
use serde::Serialize;
use sim_ai::{NeedsSubject, TaskManager, WorkerController};
use sim_core::{ClockEvent, Good, GoodTag, GoodsLedger, Point, Projects, SubscriptionId};
use sim_econ::{Market, Skills};
use tracing::{error, info, warn};

use crate::{EventBus, WorldContext};

const HOURS_PER_YEAR: u64 = 8_760;

/// What the agent's legs are doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "target", rename_all = "lowercase")]
pub enum Motion {
    #[default]
    Idle,
    Moving(Point),
    Holding(Point),
}

/// Everything an agent owns apart from its plans.
#[derive(Clone, Debug)]
pub struct AgentBody {
    pub assets: GoodsLedger,
    pub projects: Projects,
    pub skill: Skills,
    pub position: Point,
    /// Max distance per axis per hour.
    pub speed: u32,
    pub motion: Motion,
    pub alive: bool,
    pub hours_lived: u64,
    /// Clock hour of death.
    pub died_at: Option<u64>,
}

impl AgentBody {
    pub fn new(position: Point, speed: u32) -> Self {
        Self {
            assets: GoodsLedger::new(),
            projects: Projects::new(),
            skill: Skills::new(),
            position,
            speed,
            motion: Motion::Idle,
            alive: true,
            hours_lived: 0,
            died_at: None,
        }
    }

    pub fn age_years(&self) -> u64 {
        self.hours_lived / HOURS_PER_YEAR
    }

    /// One hour of movement toward the current target.
    pub fn step(&mut self) {
        if !self.alive {
            return;
        }
        self.hours_lived += 1;
        let Motion::Moving(target) = self.motion else {
            return;
        };
        let speed = i32::try_from(self.speed).unwrap_or(i32::MAX);
        self.position.x += (target.x - self.position.x).clamp(-speed, speed);
        self.position.y += (target.y - self.position.y).clamp(-speed, speed);
        if self.position == target {
            self.motion = Motion::Idle;
        }
    }
}

/// An agent living in the ECS world.
#[derive(Component, Debug)]
pub struct Agent {
    pub body: AgentBody,
    pub manager: TaskManager,
    month_sub: Option<SubscriptionId>,
}

/// Shared state an agent needs while handling a clock event.
pub(crate) struct Surroundings<'a> {
    pub bus: &'a mut EventBus<Entity>,
    pub sites: &'a WorldContext,
    pub market: Option<&'a mut Market>,
    pub now: u64,
}

/// What happened to an agent during one notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub died: bool,
    pub scheduler_error: bool,
}

impl Agent {
    pub fn new(body: AgentBody, manager: TaskManager) -> Self {
        Self {
            body,
            manager,
            month_sub: None,
        }
    }

    /// Subscribe to month resets and take on the first need.
    pub(crate) fn mount(&mut self, entity: Entity, env: Surroundings<'_>) -> Outcome {
        let Surroundings {
            bus, sites, market, ..
        } = env;
        self.month_sub = Some(bus.on(ClockEvent::Month, entity));
        let mut ctrl = AgentController {
            entity,
            body: &mut self.body,
            bus,
            sites,
            market,
        };
        let mut outcome = Outcome::default();
        if let Err(err) = self.manager.fulfill_next_need(&mut ctrl) {
            error!(agent = ?entity, %err, "task tree dropped");
            outcome.scheduler_error = true;
        }
        outcome
    }

    pub(crate) fn handle(
        &mut self,
        entity: Entity,
        event: ClockEvent,
        subscription: SubscriptionId,
        env: Surroundings<'_>,
    ) -> Outcome {
        let Surroundings {
            bus,
            sites,
            market,
            now,
        } = env;
        let mut ctrl = AgentController {
            entity,
            body: &mut self.body,
            bus,
            sites,
            market,
        };
        let mut outcome = Outcome::default();
        let result = match event {
            ClockEvent::Hour => self.manager.on_hour(&mut ctrl, subscription),
            ClockEvent::Month => match self.manager.reset(&mut ctrl) {
                Ok(true) => {
                    if let Some(id) = self.month_sub.take() {
                        ctrl.bus.off(id);
                    }
                    ctrl.body.died_at = Some(now);
                    ctrl.body.motion = Motion::Idle;
                    info!(agent = ?entity, "died of starvation");
                    outcome.died = true;
                    Ok(())
                }
                Ok(false) => Ok(()),
                Err(err) => Err(err),
            },
            ClockEvent::Day => Ok(()),
        };
        if let Err(err) = result {
            error!(agent = ?entity, %err, "task tree dropped");
            outcome.scheduler_error = true;
        }
        outcome
    }

    pub fn is_alive(&self) -> bool {
        self.body.alive
    }
}

/// [`WorkerController`] backed by an agent body and the world around it.
pub struct AgentController<'a> {
    entity: Entity,
    body: &'a mut AgentBody,
    bus: &'a mut EventBus<Entity>,
    sites: &'a WorldContext,
    market: Option<&'a mut Market>,
}

impl NeedsSubject for AgentController<'_> {
    fn assets(&self) -> &GoodsLedger {
        &self.body.assets
    }

    fn assets_mut(&mut self) -> &mut GoodsLedger {
        &mut self.body.assets
    }

    fn on_starve(&mut self) {
        self.body.alive = false;
    }
}

impl WorkerController for AgentController<'_> {
    fn projects(&self) -> &Projects {
        &self.body.projects
    }

    fn projects_mut(&mut self) -> &mut Projects {
        &mut self.body.projects
    }

    fn skill(&self) -> &Skills {
        &self.body.skill
    }

    fn market(&self) -> Option<&Market> {
        self.market.as_deref()
    }

    fn market_mut(&mut self) -> Option<&mut Market> {
        self.market.as_deref_mut()
    }

    fn subscribe_hour(&mut self) -> SubscriptionId {
        self.bus.on(ClockEvent::Hour, self.entity)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.bus.off(id);
    }

    fn resource_site(&self, tag: GoodTag) -> Option<Point> {
        self.sites.nearest(tag, self.body.position)
    }

    fn move_to(&mut self, point: Point) {
        if self.body.position != point {
            self.body.motion = Motion::Moving(point);
        }
    }

    fn hold(&mut self, point: Point) {
        self.body.motion = Motion::Holding(point);
    }

    fn stop(&mut self) {
        self.body.motion = Motion::Idle;
    }

    fn on_finished(&mut self, reward: Good) {
        if let Some(market) = self.market.as_deref_mut() {
            if let Err(err) = market.supply(reward) {
                warn!(agent = ?self.entity, %err, "supply not recorded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_moves_at_most_speed_per_axis() {
        let mut body = AgentBody::new(Point::new(0, 0), 5);
        body.motion = Motion::Moving(Point::new(12, -3));
        body.step();
        assert_eq!(body.position, Point::new(5, -3));
        body.step();
        body.step();
        assert_eq!(body.position, Point::new(12, -3));
        assert_eq!(body.motion, Motion::Idle);
        assert_eq!(body.hours_lived, 3);
    }

    #[test]
    fn dead_bodies_stay_put() {
        let mut body = AgentBody::new(Point::new(0, 0), 5);
        body.motion = Motion::Moving(Point::new(10, 10));
        body.alive = false;
        body.step();
        assert_eq!(body.position, Point::new(0, 0));
        assert_eq!(body.hours_lived, 0);
    }

    #[test]
    fn age_counts_whole_years() {
        let mut body = AgentBody::new(Point::default(), 1);
        body.hours_lived = HOURS_PER_YEAR * 2 + 5;
        assert_eq!(body.age_years(), 2);
    }
}
