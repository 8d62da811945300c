//! Task trees: an arena of task nodes with parent/child debt settlement.
//!
//! A node with children waits until every child has settled its debt, i.e.
//! moved the good it owes from the worker's assets into the parent's
//! escrow. Only then is the parent queued. Nodes without children are
//! queued straight away. One node executes at a time, depth first: a parent
//! that becomes ready runs before the next sibling subtree starts.
//!
//! Before an untouched run starts, free stock is checked again. Surplus
//! left by earlier runs can cover it, in which case the run turns into a
//! reserve and its subtree is pruned.

use sim_core::{Good, GoodTag, GoodsLedger, RequirementTreeNode, Shortage, SubscriptionId};
use sim_econ::{eval_best_action, Action, EstimationContext};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, trace};

use crate::{AcquisitionError, SchedulerError, Task, TaskStatus, WorkerController};

/// Handle of a node inside its [`TaskTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Lifecycle of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Idle,
    Scheduled,
    Executing,
    Settled,
    Cancelled,
    /// Dropped before starting because stock covered an ancestor's debt.
    Pruned,
}

/// One task plus its bookkeeping inside a tree.
#[derive(Clone, Debug)]
pub struct TaskNode {
    task: Task,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    debt: Option<Good>,
    outstanding: usize,
    escrow: GoodsLedger,
    state: NodeState,
}

impl TaskNode {
    fn new(task: Task, parent: Option<NodeId>, debt: Option<Good>) -> Self {
        Self {
            task,
            parent,
            children: Vec::new(),
            debt,
            outstanding: 0,
            escrow: GoodsLedger::new(),
            state: NodeState::Idle,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// What this node owes its parent once done.
    pub fn debt(&self) -> Option<Good> {
        self.debt
    }

    /// Children that have not settled yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Goods supplied by settled children, not yet spent.
    pub fn escrow(&self) -> &GoodsLedger {
        &self.escrow
    }

    pub fn state(&self) -> NodeState {
        self.state
    }
}

/// Where a tree stands after being driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeProgress {
    /// A task is consuming clock hours.
    Working,
    /// Nothing can progress on clock time alone.
    Waiting,
    /// The root finished; its good sits in the worker's assets.
    Finished(Good),
}

/// A settled debt, as recorded by the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: NodeId,
    pub to: NodeId,
    pub good: Good,
}

/// Executable dependency graph of tasks for one acquisition.
#[derive(Clone, Debug)]
pub struct TaskTree {
    nodes: Vec<TaskNode>,
    root: NodeId,
    queue: VecDeque<NodeId>,
    active: Option<NodeId>,
    transfers: Vec<Transfer>,
    /// Stock promised to reserve nodes that have not settled yet.
    claims: GoodsLedger,
}

impl TaskTree {
    /// Build the tree acquiring one `tag` under the given context.
    ///
    /// Each component of a produce node becomes `ceil(amount / yield)` runs
    /// whose debts add up to the component amount. Runs covered by stock
    /// become reserve nodes; a run resuming an open project has no children.
    pub fn load(tag: GoodTag, ctx: &EstimationContext<'_>) -> Result<Self, AcquisitionError> {
        let requirements = ctx
            .catalog
            .requirements(tag)
            .ok_or(AcquisitionError::UnknownGood(tag))?;
        let mut loader = Loader {
            ctx: *ctx,
            nodes: Vec::new(),
            reserved: GoodsLedger::new(),
            claimed: BTreeSet::new(),
        };
        let root = loader.run(requirements, None, None)?;
        debug!(%tag, nodes = loader.nodes.len(), "task tree loaded");
        Ok(Self::from_nodes(loader.nodes, root, loader.reserved))
    }

    /// Wrap a standalone task.
    pub fn single(task: Task) -> Self {
        Self::from_nodes(
            vec![TaskNode::new(task, None, None)],
            NodeId(0),
            GoodsLedger::new(),
        )
    }

    fn from_nodes(nodes: Vec<TaskNode>, root: NodeId, claims: GoodsLedger) -> Self {
        Self {
            nodes,
            root,
            queue: VecDeque::new(),
            active: None,
            transfers: Vec::new(),
            claims,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&TaskNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TaskNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn active_subscription(&self) -> Option<SubscriptionId> {
        self.active
            .and_then(|id| self.nodes[id.0].task.subscription())
    }

    pub fn is_finished(&self) -> bool {
        self.nodes[self.root.0].state == NodeState::Settled
    }

    /// Every settlement so far, in order.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Goods parked in node escrows, one entry per node and tag.
    pub fn escrowed(&self) -> impl Iterator<Item = Good> + '_ {
        self.nodes.iter().flat_map(|n| n.escrow.iter())
    }

    /// Queue the leaves in depth-first order. Parents follow as their
    /// children settle.
    pub fn schedule(&mut self) {
        self.schedule_node(self.root);
    }

    fn schedule_node(&mut self, id: NodeId) {
        if self.nodes[id.0].state != NodeState::Idle {
            return;
        }
        if self.nodes[id.0].children.is_empty() {
            self.nodes[id.0].state = NodeState::Scheduled;
            self.queue.push_back(id);
            return;
        }
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.schedule_node(child);
        }
    }

    /// Queue a node whose children all settled, ahead of pending leaves.
    fn enqueue(&mut self, id: NodeId) {
        self.nodes[id.0].state = NodeState::Scheduled;
        self.queue.push_front(id);
        trace!(node = id.0, good = %self.nodes[id.0].task.good(), "scheduled");
    }

    /// Nothing in the subtree under `id` has run or received goods yet.
    fn untouched(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        matches!(node.state, NodeState::Idle | NodeState::Scheduled)
            && node.escrow.is_empty()
            && node.children.iter().all(|&c| self.untouched(c))
    }

    /// Highest untouched ancestor of `id` (itself included) whose debt is
    /// now covered by unclaimed stock.
    fn covered_by_stock(&self, id: NodeId, assets: &GoodsLedger) -> Option<NodeId> {
        let mut best = None;
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            if !self.untouched(cur) {
                break;
            }
            let node = &self.nodes[cur.0];
            let reserved = matches!(node.task, Task::Reserve(_));
            if let Some(debt) = node.debt.filter(|_| !reserved) {
                let free = assets
                    .quantity(debt.tag)
                    .saturating_sub(self.claims.quantity(debt.tag));
                if free >= debt.amount {
                    best = Some(cur);
                }
            }
            cursor = node.parent;
        }
        best
    }

    /// Turn `id` into a reserve of its debt and drop its subtree.
    fn reserve_from_stock(&mut self, id: NodeId) -> Result<(), SchedulerError> {
        let debt = self.nodes[id.0].debt.ok_or(SchedulerError::MissingDebt(id))?;
        let mut pruned = std::mem::take(&mut self.nodes[id.0].children);
        while let Some(child) = pruned.pop() {
            let node = &mut self.nodes[child.0];
            node.state = NodeState::Pruned;
            pruned.append(&mut node.children.clone());
            self.queue.retain(|&queued| queued != child);
        }
        let node = &mut self.nodes[id.0];
        node.task = Task::reserve(debt);
        node.outstanding = 0;
        self.queue.retain(|&queued| queued != id);
        self.claims.store(debt)?;
        debug!(node = id.0, good = %debt, "run covered by stock");
        Ok(())
    }

    /// Schedule and run until the first task needs clock time.
    pub fn start<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<TreeProgress, SchedulerError> {
        self.schedule();
        self.poll(ctrl)
    }

    /// Child `node` has delivered `good`. Queues the node once nothing is
    /// outstanding.
    pub fn supply(&mut self, node: NodeId, good: Good) -> Result<(), SchedulerError> {
        let target = self
            .nodes
            .get_mut(node.0)
            .ok_or(SchedulerError::UnknownNode(node))?;
        if target.outstanding == 0 {
            return Err(SchedulerError::UnexpectedSupply { node, good });
        }
        target.escrow.store(good)?;
        target.outstanding -= 1;
        if target.outstanding == 0 {
            self.enqueue(node);
        }
        Ok(())
    }

    /// Hour notification delivered to `subscription`. Notifications for
    /// anything but the active task are ignored.
    pub fn on_hour<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
        subscription: SubscriptionId,
    ) -> Result<TreeProgress, SchedulerError> {
        let Some(id) = self.active else {
            return Ok(TreeProgress::Waiting);
        };
        let node = &mut self.nodes[id.0];
        if node.task.subscription() != Some(subscription) {
            trace!(?subscription, "stale hour notification");
            return Ok(TreeProgress::Working);
        }
        match node.task.on_hour(ctrl)? {
            TaskStatus::Running => Ok(TreeProgress::Working),
            TaskStatus::Waiting => Ok(TreeProgress::Waiting),
            TaskStatus::Finished(good) => match self.complete(id, good, ctrl)? {
                Some(done) => Ok(TreeProgress::Finished(done)),
                None => self.poll(ctrl),
            },
        }
    }

    /// Detach the active task from the clock, keeping all progress.
    pub fn pause<W: WorkerController + ?Sized>(&mut self, ctrl: &mut W) {
        if let Some(id) = self.active {
            self.nodes[id.0].task.pause(ctrl);
        }
    }

    /// Re-attach the active task after [`TaskTree::pause`].
    pub fn resume<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<TreeProgress, SchedulerError> {
        let Some(id) = self.active.take() else {
            return self.poll(ctrl);
        };
        self.queue.push_front(id);
        self.poll(ctrl)
    }

    /// Abandon the tree. Escrowed goods go back to the worker's assets;
    /// open projects keep their hours.
    pub fn cancel<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<(), SchedulerError> {
        self.pause(ctrl);
        self.active = None;
        self.queue.clear();
        for node in &mut self.nodes {
            if !matches!(node.state, NodeState::Settled | NodeState::Pruned) {
                node.state = NodeState::Cancelled;
            }
            node.escrow.drain_into(ctrl.assets_mut())?;
        }
        debug!(root = %self.nodes[self.root.0].task.good(), "task tree cancelled");
        Ok(())
    }

    fn poll<W: WorkerController + ?Sized>(
        &mut self,
        ctrl: &mut W,
    ) -> Result<TreeProgress, SchedulerError> {
        loop {
            let Some(mut id) = self.queue.pop_front() else {
                return Err(SchedulerError::Stalled);
            };
            if let Some(covered) = self.covered_by_stock(id, ctrl.assets()) {
                self.reserve_from_stock(covered)?;
                id = covered;
            }
            let node = &mut self.nodes[id.0];
            let escrow = if node.children.is_empty() {
                None
            } else {
                Some(&mut node.escrow)
            };
            let status = node.task.execute(ctrl, escrow)?;
            match status {
                TaskStatus::Running | TaskStatus::Waiting => {
                    node.state = NodeState::Executing;
                    self.active = Some(id);
                    return Ok(if status == TaskStatus::Running {
                        TreeProgress::Working
                    } else {
                        TreeProgress::Waiting
                    });
                }
                TaskStatus::Finished(good) => {
                    if let Some(done) = self.complete(id, good, ctrl)? {
                        return Ok(TreeProgress::Finished(done));
                    }
                }
            }
        }
    }

    /// Settle `id`: pay its debt to the parent, or report the root done.
    fn complete<W: WorkerController + ?Sized>(
        &mut self,
        id: NodeId,
        good: Good,
        ctrl: &mut W,
    ) -> Result<Option<Good>, SchedulerError> {
        let node = &mut self.nodes[id.0];
        node.state = NodeState::Settled;
        let parent = node.parent;
        let debt = node.debt;
        if self.active == Some(id) {
            self.active = None;
        }
        let Some(parent) = parent else {
            debug!(%good, "task tree finished");
            return Ok(Some(good));
        };
        let debt = debt.ok_or(SchedulerError::MissingDebt(id))?;
        if matches!(self.nodes[id.0].task, Task::Reserve(_)) {
            self.claims.unstore(debt, Shortage::Clamp)?;
        }
        let paid = ctrl
            .assets_mut()
            .unstore(debt, Shortage::Fail)
            .map_err(|source| SchedulerError::DebtUnpaid { node: id, source })?;
        self.transfers.push(Transfer {
            from: id,
            to: parent,
            good: paid,
        });
        trace!(from = id.0, to = parent.0, good = %paid, "debt settled");
        self.supply(parent, paid)
            .map(|()| None)
    }
}

struct Loader<'a> {
    ctx: EstimationContext<'a>,
    nodes: Vec<TaskNode>,
    reserved: GoodsLedger,
    claimed: BTreeSet<GoodTag>,
}

impl Loader<'_> {
    fn push(&mut self, task: Task, parent: Option<NodeId>, debt: Option<Good>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TaskNode::new(task, parent, debt));
        id
    }

    fn run(
        &mut self,
        req: &RequirementTreeNode,
        parent: Option<NodeId>,
        debt: Option<Good>,
    ) -> Result<NodeId, AcquisitionError> {
        let ctx = self.ctx;
        let recipe = ctx
            .catalog
            .recipe(req.tag)
            .ok_or(AcquisitionError::UnknownGood(req.tag))?;

        if let Some(debt) = debt {
            let free = ctx
                .assets
                .quantity(debt.tag)
                .saturating_sub(self.reserved.quantity(debt.tag));
            if free >= debt.amount {
                self.reserved.store(debt)?;
                return Ok(self.push(Task::reserve(debt), parent, Some(debt)));
            }
        }

        match eval_best_action(req, &ctx) {
            Action::Unavailable => Err(AcquisitionError::Unavailable(req.tag)),
            Action::Buy => {
                if ctx.market.is_none() {
                    return Err(AcquisitionError::MissingMarket(req.tag));
                }
                let good = debt.unwrap_or_else(|| recipe.reward());
                Ok(self.push(Task::buy(good), parent, debt))
            }
            Action::Produce => {
                let id = self.push(Task::production(recipe), parent, debt);
                if ctx.projects.remaining(req.tag).is_some() && self.claimed.insert(req.tag) {
                    // Components were paid when the project opened.
                    return Ok(id);
                }
                let mut children = Vec::new();
                for component in &req.children {
                    let per_run = ctx
                        .catalog
                        .recipe(component.tag)
                        .ok_or(AcquisitionError::UnknownGood(component.tag))?
                        .yield_amount;
                    let mut remaining = component.amount;
                    while remaining > 0 {
                        let share = remaining.min(per_run);
                        remaining -= share;
                        let debt = Good::new(component.tag, share);
                        children.push(self.run(component, Some(id), Some(debt))?);
                    }
                }
                let node = &mut self.nodes[id.0];
                node.outstanding = children.len();
                node.children = children;
                Ok(id)
            }
        }
    }
}
