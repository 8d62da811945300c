//! The ECS world: simulation resource, hourly systems and the run loop.

use anyhow::Context;
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::Schedule;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sim_ai::{NeedsChain, TaskManager};
use sim_core::{ClockEvent, Point, RecipeCatalog, SimConfig};
use sim_econ::Market;
use std::sync::Arc;
use tracing::{debug, info};

use crate::agent::{Outcome, Surroundings};
use crate::{Agent, AgentBody, Clock, EventBus, Motion, SimSnapshot, WorldContext};

/// Max distance per axis an agent covers in an hour.
pub const AGENT_SPEED: u32 = 5;
/// Chance per hour that an idle agent starts wandering.
const WANDER_CHANCE: f64 = 0.05;
/// Side of the box a wandering agent picks its target from.
const WANDER_BOX: i32 = 300;
/// Agents spawn within this distance of the origin.
const SPAWN_RADIUS: i32 = 100;

/// Counters kept across the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub deaths: u32,
    pub removed: u32,
    pub scheduler_errors: u32,
}

impl RunStats {
    fn record(&mut self, outcome: Outcome) {
        if outcome.died {
            self.deaths += 1;
        }
        if outcome.scheduler_error {
            self.scheduler_errors += 1;
        }
    }
}

/// World-wide simulation state.
#[derive(Resource)]
pub struct Simulation {
    pub config: SimConfig,
    pub catalog: Arc<RecipeCatalog>,
    pub clock: Clock,
    pub bus: EventBus<Entity>,
    pub sites: WorldContext,
    pub market: Option<Market>,
    pub rng: ChaCha8Rng,
    pub stats: RunStats,
}

impl Simulation {
    pub fn new(config: SimConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid simulation config")?;
        let catalog = Arc::new(config.catalog().context("invalid recipe table")?);
        let market = if config.with_market {
            Some(Market::new(catalog.clone(), config.price_floor_ratio)?)
        } else {
            None
        };
        Ok(Self {
            clock: Clock::from_config(&config),
            bus: EventBus::new(),
            sites: WorldContext::new(config.sources.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            stats: RunStats::default(),
            catalog,
            market,
            config,
        })
    }

    fn surroundings(&mut self) -> Surroundings<'_> {
        Surroundings {
            bus: &mut self.bus,
            sites: &self.sites,
            market: self.market.as_mut(),
            now: self.clock.hours(),
        }
    }
}

/// Build the ECS world with the simulation resource and the initial agents.
pub fn init_world(config: SimConfig) -> anyhow::Result<World> {
    let mut world = World::new();
    let agents = config.agents;
    world.insert_resource(Simulation::new(config)?);
    for _ in 0..agents {
        spawn_agent(&mut world);
    }
    info!(agents, "world initialized");
    Ok(world)
}

/// Spawn one agent at a seeded position and let it take on its first need.
pub fn spawn_agent(world: &mut World) -> Entity {
    let entity = world.spawn_empty().id();
    world.resource_scope(|world, mut sim: Mut<Simulation>| {
        let sim = &mut *sim;
        let position = Point::new(
            sim.rng.gen_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
            sim.rng.gen_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
        );
        let manager = TaskManager::new(sim.catalog.clone(), NeedsChain::from_config(&sim.config));
        let mut agent = Agent::new(AgentBody::new(position, AGENT_SPEED), manager);
        let outcome = agent.mount(entity, sim.surroundings());
        sim.stats.record(outcome);
        world.entity_mut(entity).insert(agent);
        debug!(agent = ?entity, ?position, "agent spawned");
    });
    entity
}

/// Deliver one clock event to its listeners, in registration order.
fn dispatch(world: &mut World, event: ClockEvent) {
    world.resource_scope(|world, mut sim: Mut<Simulation>| {
        let sim = &mut *sim;
        for (id, entity) in sim.bus.listeners(event) {
            if !sim.bus.is_registered(id) {
                continue;
            }
            let Some(mut agent) = world.get_mut::<Agent>(entity) else {
                sim.bus.off(id);
                continue;
            };
            let outcome = agent.handle(entity, event, id, sim.surroundings());
            sim.stats.record(outcome);
        }
        if event == ClockEvent::Month {
            info!(month = sim.clock.months(), "month reset");
        }
        if event == sim.config.price_period {
            if let Some(market) = sim.market.as_mut() {
                market.update_prices();
                debug!(?event, "market repriced");
            }
        }
    });
}

fn movement_system(mut agents: Query<&mut Agent>) {
    for mut agent in &mut agents {
        agent.body.step();
    }
}

fn wander_system(mut sim: ResMut<Simulation>, mut agents: Query<&mut Agent>) {
    for mut agent in &mut agents {
        let body = &agent.body;
        if !body.alive || body.motion != Motion::Idle || agent.manager.current_need().is_some() {
            continue;
        }
        if !sim.rng.gen_bool(WANDER_CHANCE) {
            continue;
        }
        let half = WANDER_BOX / 2;
        let target = Point::new(
            body.position.x + sim.rng.gen_range(-half..half),
            body.position.y + sim.rng.gen_range(-half..half),
        );
        agent.body.motion = Motion::Moving(target);
    }
}

fn dissipation_system(
    mut commands: Commands,
    mut sim: ResMut<Simulation>,
    agents: Query<(Entity, &Agent)>,
) {
    let now = sim.clock.hours();
    let linger = u64::from(sim.config.dissipation_hours);
    for (entity, agent) in &agents {
        let Some(died_at) = agent.body.died_at else {
            continue;
        };
        if now.saturating_sub(died_at) >= linger {
            commands.entity(entity).despawn();
            sim.stats.removed += 1;
            debug!(agent = ?entity, "body removed");
        }
    }
}

/// Owns the ECS world and advances it hour by hour.
pub struct SimRuntime {
    world: World,
    hourly: Schedule,
}

impl SimRuntime {
    pub fn new(config: SimConfig) -> anyhow::Result<Self> {
        let world = init_world(config)?;
        let mut hourly = Schedule::default();
        hourly.add_systems((movement_system, wander_system, dissipation_system).chain());
        Ok(Self { world, hourly })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn simulation(&self) -> &Simulation {
        self.world.resource::<Simulation>()
    }

    /// One clock hour: clock events first, then the hourly systems.
    pub fn step_hour(&mut self) {
        let events = self.world.resource_mut::<Simulation>().clock.tick();
        for event in events {
            dispatch(&mut self.world, event);
        }
        self.hourly.run(&mut self.world);
    }

    pub fn run_hours(&mut self, hours: u64) {
        for _ in 0..hours {
            self.step_hour();
        }
    }

    pub fn run_months(&mut self, months: u32) -> SimSnapshot {
        let hours = self.simulation().clock.hours_per_month() * u64::from(months);
        self.run_hours(hours);
        let snap = self.snapshot();
        info!(
            months = snap.months_run,
            living = snap.living,
            dead = snap.dead,
            "run finished"
        );
        snap
    }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot::capture(&self.world)
    }
}

/// Build a world from `config` and run it for `months`.
pub fn run_months(config: SimConfig, months: u32) -> anyhow::Result<SimSnapshot> {
    let mut runtime = SimRuntime::new(config)?;
    Ok(runtime.run_months(months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use sim_core::GoodTag;

    fn agents(runtime: &SimRuntime) -> Vec<&Agent> {
        runtime
            .world()
            .iter_entities()
            .filter_map(|e| e.get::<Agent>())
            .collect()
    }

    #[test]
    fn fed_agents_build_a_house_and_cloth_in_a_month() {
        let mut runtime = SimRuntime::new(SimConfig::default()).unwrap();
        let snap = runtime.run_months(1);
        assert_eq!(snap.months_run, 1);
        assert_eq!(snap.hours_run, 720);
        assert_eq!(snap.living, 3);
        assert_eq!(snap.dead, 0);
        assert_eq!(snap.scheduler_errors, 0);
        assert_eq!(snap.goods.get(&GoodTag::House), Some(&3));
        for agent in agents(&runtime) {
            assert!(agent.body.assets.has(GoodTag::House, 1));
            assert!(agent.body.assets.has(GoodTag::Cloth, 1));
            // A fresh month starts with food again.
            assert_eq!(agent.manager.current_need(), Some(GoodTag::Meal));
        }
    }

    #[test]
    fn snapshot_counts_goods_parked_in_trees() {
        let mut runtime = SimRuntime::new(SimConfig::default()).unwrap();
        let escrowed = |runtime: &SimRuntime| -> u32 {
            agents(runtime)
                .iter()
                .filter_map(|a| a.manager.current_tree())
                .flat_map(|tree| tree.escrowed())
                .filter(|good| good.tag == GoodTag::Tree)
                .map(|good| good.amount)
                .sum()
        };
        let mut hours = 0;
        while escrowed(&runtime) == 0 {
            runtime.step_hour();
            hours += 1;
            assert!(hours < 720, "no house tree collected wood");
        }
        let held: u32 = agents(&runtime)
            .iter()
            .map(|a| a.body.assets.quantity(GoodTag::Tree))
            .sum();
        let snap = runtime.snapshot();
        assert_eq!(
            snap.goods.get(&GoodTag::Tree).copied(),
            Some(held + escrowed(&runtime))
        );
    }

    #[test]
    fn starving_agents_die_and_dissipate() {
        let config = SimConfig {
            hours_per_day: 1,
            days_per_month: 2,
            agents: 2,
            ..SimConfig::default()
        };
        let mut runtime = SimRuntime::new(config).unwrap();
        let snap = runtime.run_months(1);
        assert_eq!(snap.living, 0);
        assert_eq!(snap.dead, 2);
        assert_eq!(runtime.simulation().bus.len(ClockEvent::Hour), 0);
        assert_eq!(runtime.simulation().bus.len(ClockEvent::Month), 0);

        runtime.run_hours(9);
        assert_eq!(runtime.snapshot().dead, 2);
        runtime.run_hours(1);
        let snap = runtime.snapshot();
        assert_eq!(snap.dead, 0);
        assert_eq!(snap.removed, 2);
        assert!(agents(&runtime).is_empty());
    }

    #[test]
    fn market_prices_respect_the_floor() {
        let config = SimConfig {
            with_market: true,
            ..SimConfig::default()
        };
        let snap = run_months(config, 1).unwrap();
        // MEAL baseline is 7 manhours; the floor is 30% of it.
        let meal = snap.prices.get(&GoodTag::Meal).copied().unwrap();
        assert!(meal >= Decimal::new(21, 1));
        assert_eq!(snap.living, 3);
    }

    #[test]
    fn runs_are_deterministic_per_seed() {
        let a = run_months(SimConfig::default(), 1).unwrap();
        let b = run_months(SimConfig::default(), 1).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimConfig {
            starvation_ratio: 1.5,
            ..SimConfig::default()
        };
        assert!(SimRuntime::new(config).is_err());
    }
}
