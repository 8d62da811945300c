//! Serializable summary of a run.

use bevy_ecs::world::World;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{GoodTag, GoodsLedger, Point};
use std::collections::BTreeMap;

use crate::{Agent, Motion, Simulation};

/// One agent as seen from outside.
#[derive(Clone, Debug, Serialize)]
pub struct AgentSummary {
    pub id: u32,
    pub alive: bool,
    pub position: Point,
    pub motion: Motion,
    pub need: Option<GoodTag>,
    pub food_to_eat: u32,
    pub age_years: u64,
    pub assets: GoodsLedger,
}

/// State of the world after a run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SimSnapshot {
    pub months_run: u32,
    pub hours_run: u64,
    pub living: u32,
    /// Dead agents whose bodies are still around.
    pub dead: u32,
    pub removed: u32,
    pub scheduler_errors: u32,
    /// Goods held by all agents, living or dead, including goods parked in
    /// the escrow of a running task tree.
    pub goods: BTreeMap<GoodTag, u32>,
    pub prices: BTreeMap<GoodTag, Decimal>,
    pub agents: Vec<AgentSummary>,
}

impl SimSnapshot {
    pub fn capture(world: &World) -> Self {
        let mut snap = SimSnapshot::default();
        if let Some(sim) = world.get_resource::<Simulation>() {
            snap.months_run = sim.clock.months();
            snap.hours_run = sim.clock.hours();
            snap.removed = sim.stats.removed;
            snap.scheduler_errors = sim.stats.scheduler_errors;
            if let Some(market) = &sim.market {
                snap.prices = market.prices().collect();
            }
        }
        for entity in world.iter_entities() {
            let Some(agent) = entity.get::<Agent>() else {
                continue;
            };
            let body = &agent.body;
            if body.alive {
                snap.living += 1;
            } else {
                snap.dead += 1;
            }
            let escrowed = agent
                .manager
                .current_tree()
                .into_iter()
                .flat_map(|tree| tree.escrowed());
            for good in body.assets.iter().chain(escrowed) {
                *snap.goods.entry(good.tag).or_default() += good.amount;
            }
            snap.agents.push(AgentSummary {
                id: entity.id().index(),
                alive: body.alive,
                position: body.position,
                motion: body.motion,
                need: agent.manager.current_need(),
                food_to_eat: agent.manager.needs().food_to_eat(),
                age_years: body.age_years(),
                assets: body.assets.clone(),
            });
        }
        snap
    }

    /// Total units held across all agents.
    pub fn total_goods(&self) -> u64 {
        self.goods.values().map(|&n| u64::from(n)).sum()
    }
}
