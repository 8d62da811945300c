#![deny(warnings)]

//! Agent behaviour: tasks, task trees with debt settlement, needs and the
//! task manager tying them to a worker.

mod acquisition;
mod controller;
mod manager;
mod needs;
mod task;
#[cfg(test)]
mod testing;
mod tree;

pub use acquisition::eval_best_task;
pub use controller::{NeedsSubject, WorkerController};
pub use manager::TaskManager;
pub use needs::NeedsChain;
pub use task::{BuyTask, ProductionTask, ReserveTask, Task, TaskStatus};
pub use tree::{NodeId, NodeState, TaskNode, TaskTree, Transfer, TreeProgress};

use sim_core::{Good, GoodTag, LedgerError};
use sim_econ::EconError;
use thiserror::Error;

/// A good cannot be acquired under the current context.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("{0} can be neither produced nor bought")]
    Unavailable(GoodTag),
    #[error("buying {0} was chosen without a market")]
    MissingMarket(GoodTag),
    #[error("no recipe for {0}")]
    UnknownGood(GoodTag),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Broken task-tree bookkeeping. Fatal for the tree that raised it.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("node {node:?} could not pay its debt")]
    DebtUnpaid {
        node: NodeId,
        #[source]
        source: LedgerError,
    },
    #[error("node {0:?} settled without a declared debt")]
    MissingDebt(NodeId),
    #[error("node {node:?} was supplied {good} with nothing outstanding")]
    UnexpectedSupply { node: NodeId, good: Good },
    #[error("no node {0:?} in this tree")]
    UnknownNode(NodeId),
    #[error("setup of {tag} is short: needs {needed}, holds {held}")]
    ComponentsMissing { tag: GoodTag, needed: u32, held: u32 },
    #[error("cannot reserve {needed} {tag}: holds {held}")]
    ReserveShort { tag: GoodTag, needed: u32, held: u32 },
    #[error("no open project for {0}")]
    MissingProject(GoodTag),
    #[error("buy of {0} requires a market")]
    MissingMarket(GoodTag),
    #[error("no task is ready to run")]
    Stalled,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Econ(#[from] EconError),
}
