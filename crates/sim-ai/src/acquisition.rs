//! Picking the next single task for a requirement tree.

use sim_core::RequirementTreeNode;
use sim_econ::{eval_best_action, Action, EstimationContext};

use crate::{AcquisitionError, Task};

/// The task to run next for `node`.
///
/// Producing descends depth-first into the first child not yet covered by
/// assets, so the returned task is always immediately executable. An open
/// project for the node's tag is resumed as is.
pub fn eval_best_task(
    node: &RequirementTreeNode,
    ctx: &EstimationContext<'_>,
) -> Result<Task, AcquisitionError> {
    let recipe = ctx
        .catalog
        .recipe(node.tag)
        .ok_or(AcquisitionError::UnknownGood(node.tag))?;
    match eval_best_action(node, ctx) {
        Action::Unavailable => Err(AcquisitionError::Unavailable(node.tag)),
        Action::Buy => match ctx.market {
            Some(_) => Ok(Task::buy(recipe.reward())),
            None => Err(AcquisitionError::MissingMarket(node.tag)),
        },
        Action::Produce => {
            if ctx.projects.remaining(node.tag).is_some() {
                return Ok(Task::production(recipe));
            }
            match node
                .children
                .iter()
                .find(|child| !ctx.assets.has(child.tag, child.amount))
            {
                Some(child) => eval_best_task(child, ctx),
                None => Ok(Task::production(recipe)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorker;
    use sim_core::{Good, GoodTag, RecipeCatalog};

    fn next_task(worker: &TestWorker, catalog: &RecipeCatalog, tag: GoodTag) -> Task {
        let node = catalog.requirements(tag).unwrap();
        eval_best_task(node, &worker.context(catalog)).unwrap()
    }

    #[test]
    fn descends_to_first_missing_component() {
        let catalog = RecipeCatalog::standard().unwrap();
        let mut worker = TestWorker::new();
        assert_eq!(
            next_task(&worker, &catalog, GoodTag::Cloth).good(),
            Good::new(GoodTag::Animal, 1)
        );
        worker.assets.store(Good::new(GoodTag::Skin, 1)).unwrap();
        assert_eq!(
            next_task(&worker, &catalog, GoodTag::Cloth).good(),
            Good::new(GoodTag::Hide, 1)
        );
        worker.assets.store(Good::new(GoodTag::Hide, 2)).unwrap();
        assert_eq!(
            next_task(&worker, &catalog, GoodTag::Cloth).good(),
            Good::new(GoodTag::Cloth, 1)
        );
    }

    #[test]
    fn open_project_is_continued() {
        let catalog = RecipeCatalog::standard().unwrap();
        let mut worker = TestWorker::new();
        worker.projects.open(GoodTag::House, 12);
        assert_eq!(
            next_task(&worker, &catalog, GoodTag::House).good(),
            Good::new(GoodTag::House, 1)
        );
    }

    #[test]
    fn market_without_quotes_still_produces() {
        let catalog = RecipeCatalog::standard().unwrap();
        let worker = TestWorker::with_market();
        assert!(matches!(
            next_task(&worker, &catalog, GoodTag::Meal),
            Task::GenericProduction(_)
        ));
    }

    #[test]
    fn unknown_tag_is_reported() {
        let catalog = RecipeCatalog::new(vec![sim_core::RecipeModel::leaf(GoodTag::Tree, 4, 1)])
            .unwrap();
        let worker = TestWorker::new();
        let node = sim_core::RequirementTreeNode {
            tag: GoodTag::House,
            amount: 1,
            children: Vec::new(),
        };
        assert_eq!(
            eval_best_task(&node, &worker.context(&catalog)).unwrap_err(),
            AcquisitionError::UnknownGood(GoodTag::House)
        );
    }
}
