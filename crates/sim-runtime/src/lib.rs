#![deny(warnings)]

//! ECS runtime for the agent economy.
//!
//! A bevy_ecs [`World`](bevy_ecs::world::World) holds agents as entities and
//! a single [`Simulation`] resource with the clock, the listener bus, resource
//! sites and the optional market. [`SimRuntime`] advances it hour by hour:
//! clock events are dispatched to their listeners in registration order,
//! then the hourly systems move, wander and remove agents.

mod agent;
mod bus;
mod clock;
mod runtime;
mod sites;
mod snapshot;

pub use agent::{Agent, AgentBody, AgentController, Motion};
pub use bus::EventBus;
pub use clock::Clock;
pub use runtime::{init_world, run_months, spawn_agent, RunStats, SimRuntime, Simulation, AGENT_SPEED};
pub use sites::WorldContext;
pub use snapshot::{AgentSummary, SimSnapshot};
