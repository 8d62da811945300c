//! Needs-driven task management for one worker.

use sim_core::{Good, GoodTag, RecipeCatalog, SubscriptionId};
use sim_econ::EstimationContext;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{NeedsChain, SchedulerError, TaskTree, TreeProgress, WorkerController};

#[derive(Clone, Debug)]
struct Pursuit {
    need: GoodTag,
    tree: TaskTree,
}

/// Turns needs into task trees and drives them on the worker's clock hours.
#[derive(Clone, Debug)]
pub struct TaskManager {
    catalog: Arc<RecipeCatalog>,
    needs: NeedsChain,
    current: Option<Pursuit>,
}

impl TaskManager {
    pub fn new(catalog: Arc<RecipeCatalog>, needs: NeedsChain) -> Self {
        Self {
            catalog,
            needs,
            current: None,
        }
    }

    pub fn needs(&self) -> &NeedsChain {
        &self.needs
    }

    /// The need currently being worked on.
    pub fn current_need(&self) -> Option<GoodTag> {
        self.current.as_ref().map(|p| p.need)
    }

    pub fn current_tree(&self) -> Option<&TaskTree> {
        self.current.as_ref().map(|p| &p.tree)
    }

    /// Pull needs until one yields a running task tree. Needs that cannot be
    /// acquired right now are skipped. Returns the need taken on, if any.
    pub fn fulfill_next_need<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<Option<GoodTag>, SchedulerError> {
        self.abandon(ctrl)?;
        while let Some(need) = self.needs.get_need(ctrl) {
            if let Some(market) = ctrl.market_mut() {
                market.demand(Good::new(need, 1))?;
            }
            let ctx = EstimationContext {
                catalog: &self.catalog,
                skill: ctrl.skill(),
                projects: ctrl.projects(),
                assets: ctrl.assets(),
                market: ctrl.market(),
            };
            let mut tree = match TaskTree::load(need, &ctx) {
                Ok(tree) => tree,
                Err(err) => {
                    warn!(%need, %err, "need cannot be acquired");
                    self.needs.skip();
                    continue;
                }
            };
            match tree.start(ctrl) {
                Ok(TreeProgress::Finished(good)) => {
                    info!(%need, %good, "need met");
                }
                Ok(_) => {
                    info!(%need, nodes = tree.len(), "pursuing need");
                    self.current = Some(Pursuit { need, tree });
                    return Ok(Some(need));
                }
                Err(err) => {
                    if let Err(cancel) = tree.cancel(ctrl) {
                        warn!(%need, %cancel, "cancel after failure");
                    }
                    return Err(err);
                }
            }
        }
        Ok(None)
    }

    /// Forward an hour notification to the current tree. A finished tree
    /// moves on to the next need. On error the tree is dropped.
    pub fn on_hour<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
        subscription: SubscriptionId,
    ) -> Result<(), SchedulerError> {
        let Some(pursuit) = self.current.as_mut() else {
            return Ok(());
        };
        match pursuit.tree.on_hour(ctrl, subscription) {
            Ok(TreeProgress::Finished(good)) => {
                info!(need = %pursuit.need, %good, "need met");
                self.current = None;
                self.fulfill_next_need(ctrl).map(|_| ())
            }
            Ok(_) => Ok(()),
            Err(err) => {
                if let Err(cancel) = self.abandon(ctrl) {
                    warn!(%cancel, "cancel after failure");
                }
                Err(err)
            }
        }
    }

    /// Month boundary: cancel the current tree, run the starvation check and
    /// restart the needs. A starved worker takes on no new work. Returns
    /// whether the worker starved.
    pub fn reset<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<bool, SchedulerError> {
        self.abandon(ctrl)?;
        if self.needs.reset(ctrl) {
            return Ok(true);
        }
        self.fulfill_next_need(ctrl)?;
        Ok(false)
    }

    /// Cancel the current tree, if any, keeping project progress.
    pub fn abandon<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<(), SchedulerError> {
        match self.current.take() {
            Some(mut pursuit) => pursuit.tree.cancel(ctrl),
            None => Ok(()),
        }
    }
}
