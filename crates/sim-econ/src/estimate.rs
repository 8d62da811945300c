//! Produce-versus-buy costing over requirement trees.
//!
//! Costs are in labor hours. `None` means the route is unattainable.

use serde::{Deserialize, Serialize};
use sim_core::{GoodTag, GoodsLedger, Projects, RecipeCatalog, RequirementTreeNode};
use std::collections::BTreeMap;

use crate::Market;

/// Per-good productivity modifiers. Missing entries count as 1.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    modifiers: BTreeMap<GoodTag, f64>,
}

impl Skills {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: GoodTag, modifier: f64) -> Self {
        self.modifiers.insert(tag, modifier);
        self
    }

    /// Multiplier applied to manhours. Non-positive or non-finite values
    /// fall back to 1.
    pub fn modifier(&self, tag: GoodTag) -> f64 {
        match self.modifiers.get(&tag) {
            Some(&m) if m.is_finite() && m > 0.0 => m,
            _ => 1.0,
        }
    }
}

/// An agent's view of the world, used only for costing.
#[derive(Clone, Copy, Debug)]
pub struct EstimationContext<'a> {
    pub catalog: &'a RecipeCatalog,
    pub skill: &'a Skills,
    pub projects: &'a Projects,
    pub assets: &'a GoodsLedger,
    pub market: Option<&'a Market>,
}

/// Cheapest way to acquire a good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Produce,
    Buy,
    Unavailable,
}

/// Pick an action from the two route costs. Producing wins ties.
pub fn choose_action(produce: Option<u32>, buy: Option<u32>) -> Action {
    match (produce, buy) {
        (None, None) => Action::Unavailable,
        (None, Some(_)) => Action::Buy,
        (Some(_), None) => Action::Produce,
        (Some(p), Some(b)) if p <= b => Action::Produce,
        (Some(_), Some(_)) => Action::Buy,
    }
}

pub fn eval_best_action(node: &RequirementTreeNode, ctx: &EstimationContext<'_>) -> Action {
    choose_action(estimate_produce(node, ctx), estimate_buy(node, ctx))
}

/// `min(produce, buy)`, or `None` when neither route is open.
pub fn estimate_best_cost(node: &RequirementTreeNode, ctx: &EstimationContext<'_>) -> Option<u32> {
    match (estimate_produce(node, ctx), estimate_buy(node, ctx)) {
        (Some(p), Some(b)) => Some(p.min(b)),
        (p, b) => p.or(b),
    }
}

/// Hours this node's own recipe costs, excluding children.
pub fn manhours_term(node: &RequirementTreeNode, ctx: &EstimationContext<'_>) -> Option<u32> {
    let recipe = ctx.catalog.recipe(node.tag)?;
    let hours = f64::from(recipe.manhours) / f64::from(recipe.yield_amount)
        * f64::from(node.amount)
        * ctx.skill.modifier(node.tag);
    Some(hours.ceil().min(f64::from(u32::MAX)) as u32)
}

/// Cost of producing the node ourselves.
///
/// An open project costs exactly its remaining hours, since its components
/// are already paid. Otherwise the node's own hours plus the best cost of
/// every child; one unattainable child makes the whole node unattainable.
pub fn estimate_produce(node: &RequirementTreeNode, ctx: &EstimationContext<'_>) -> Option<u32> {
    if let Some(hours_left) = ctx.projects.remaining(node.tag) {
        return Some(hours_left);
    }
    let mut cost = manhours_term(node, ctx)?;
    for child in &node.children {
        cost = cost.saturating_add(estimate_best_cost(child, ctx)?);
    }
    Some(cost)
}

/// Cost of buying the node.
///
/// Without a market there is nothing to buy from. With one, there is no
/// price feed that settles against agent inventory yet, so buying is still
/// reported as unavailable rather than free.
pub fn estimate_buy(node: &RequirementTreeNode, ctx: &EstimationContext<'_>) -> Option<u32> {
    let market = ctx.market?;
    tracing::trace!(
        tag = %node.tag,
        listed = market.price(node.tag).is_some(),
        "no buy quote available"
    );
    None
}

/// Unskilled, market-free worst case: raw manhours of every node summed.
/// Anchors market price floors; never consults buy costs.
pub fn estimate_baseline_production_cost(
    node: &RequirementTreeNode,
    catalog: &RecipeCatalog,
) -> u32 {
    let own = catalog.recipe(node.tag).map_or(0, |r| r.manhours);
    node.children
        .iter()
        .fold(own, |cost, child| {
            cost.saturating_add(estimate_baseline_production_cost(child, catalog))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{Good, RecipeModel};

    fn meat_catalog() -> RecipeCatalog {
        RecipeCatalog::new(vec![
            RecipeModel::leaf(GoodTag::Animal, 4, 1),
            RecipeModel::leaf(GoodTag::Meat, 2, 4)
                .with_component(vec![Good::new(GoodTag::Animal, 1)]),
        ])
        .unwrap()
    }

    struct Fixture {
        catalog: RecipeCatalog,
        skill: Skills,
        projects: Projects,
        assets: GoodsLedger,
    }

    impl Fixture {
        fn new(catalog: RecipeCatalog) -> Self {
            Self {
                catalog,
                skill: Skills::new(),
                projects: Projects::new(),
                assets: GoodsLedger::new(),
            }
        }

        fn ctx(&self) -> EstimationContext<'_> {
            EstimationContext {
                catalog: &self.catalog,
                skill: &self.skill,
                projects: &self.projects,
                assets: &self.assets,
                market: None,
            }
        }
    }

    #[test]
    fn meat_is_produced_without_market() {
        let fx = Fixture::new(meat_catalog());
        let tree = fx.catalog.requirements(GoodTag::Meat).unwrap();
        let ctx = fx.ctx();
        assert_eq!(eval_best_action(tree, &ctx), Action::Produce);
        assert_eq!(eval_best_action(&tree.children[0], &ctx), Action::Produce);
        // ceil(2/4 * 1) + ceil(4/1 * 1)
        assert_eq!(estimate_produce(tree, &ctx), Some(5));
        assert_eq!(estimate_buy(tree, &ctx), None);
    }

    #[test]
    fn open_project_costs_remaining_hours() {
        let mut fx = Fixture::new(meat_catalog());
        fx.projects.open(GoodTag::Meat, 1);
        let tree = fx.catalog.requirements(GoodTag::Meat).unwrap();
        assert_eq!(estimate_produce(tree, &fx.ctx()), Some(1));
    }

    #[test]
    fn skill_scales_own_hours() {
        let mut fx = Fixture::new(meat_catalog());
        fx.skill = Skills::new().with(GoodTag::Animal, 0.5).with(GoodTag::Meat, -3.0);
        let tree = fx.catalog.requirements(GoodTag::Animal).unwrap();
        assert_eq!(estimate_produce(tree, &fx.ctx()), Some(2));
        assert_eq!(fx.skill.modifier(GoodTag::Meat), 1.0);
    }

    #[test]
    fn unknown_child_is_unattainable() {
        let fx = Fixture::new(meat_catalog());
        let orphan = RequirementTreeNode {
            tag: GoodTag::Meat,
            amount: 1,
            children: vec![RequirementTreeNode {
                tag: GoodTag::House,
                amount: 1,
                children: vec![],
            }],
        };
        assert_eq!(estimate_produce(&orphan, &fx.ctx()), None);
        assert_eq!(eval_best_action(&orphan, &fx.ctx()), Action::Unavailable);
    }

    #[test]
    fn action_choice_table() {
        assert_eq!(choose_action(None, None), Action::Unavailable);
        assert_eq!(choose_action(None, Some(3)), Action::Buy);
        assert_eq!(choose_action(Some(3), None), Action::Produce);
        assert_eq!(choose_action(Some(3), Some(3)), Action::Produce);
        assert_eq!(choose_action(Some(4), Some(3)), Action::Buy);
    }

    #[test]
    fn baseline_ignores_yield_and_amount() {
        let catalog = RecipeCatalog::standard().unwrap();
        let house = catalog.requirements(GoodTag::House).unwrap();
        // 40 for the house plus 4 for one TREE node.
        assert_eq!(estimate_baseline_production_cost(house, &catalog), 44);
        let cloth = catalog.requirements(GoodTag::Cloth).unwrap();
        assert_eq!(estimate_baseline_production_cost(cloth, &catalog), 8 + 4 + 4 + 4);
    }

    proptest! {
        #[test]
        fn produce_cost_covers_own_hours(
            meat_hours in 1u32..50,
            meat_yield in 1u32..10,
            animal_hours in 1u32..50,
            need in 1u32..20,
        ) {
            let catalog = RecipeCatalog::new(vec![
                RecipeModel::leaf(GoodTag::Animal, animal_hours, 1),
                RecipeModel::leaf(GoodTag::Meat, meat_hours, meat_yield)
                    .with_component(vec![Good::new(GoodTag::Animal, need)]),
            ]).unwrap();
            let fx = Fixture::new(catalog);
            let ctx = fx.ctx();
            let tree = fx.catalog.requirements(GoodTag::Meat).unwrap();
            let own = manhours_term(tree, &ctx).unwrap();
            let total = estimate_produce(tree, &ctx).unwrap();
            let child = estimate_produce(&tree.children[0], &ctx).unwrap();
            prop_assert!(total >= own);
            prop_assert_eq!(total, own + child);
        }
    }
}
