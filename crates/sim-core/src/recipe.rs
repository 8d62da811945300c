//! Production recipes and the static recipe catalog.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Good, GoodTag, RequirementTreeNode, ValidationError};

/// Rule for turning component goods plus labor hours into a yield of `tag`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeModel {
    pub tag: GoodTag,
    /// Labor hours for one production run (> 0).
    pub manhours: u32,
    /// Goods produced by one run (>= 1).
    #[serde(rename = "yield")]
    pub yield_amount: u32,
    /// Component slots. Each slot lists alternative goods, any one of which
    /// satisfies it. No slots means a raw resource.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Vec<Good>>,
}

impl RecipeModel {
    /// A raw resource recipe.
    pub fn leaf(tag: GoodTag, manhours: u32, yield_amount: u32) -> Self {
        Self {
            tag,
            manhours,
            yield_amount,
            components: Vec::new(),
        }
    }

    /// Append a component slot.
    pub fn with_component(mut self, alternatives: Vec<Good>) -> Self {
        self.components.push(alternatives);
        self
    }

    pub fn is_raw(&self) -> bool {
        self.components.is_empty()
    }

    /// What one run puts into the producer's assets.
    pub fn reward(&self) -> Good {
        Good::new(self.tag, self.yield_amount)
    }

    /// First listed alternative of each slot.
    pub fn first_choices(&self) -> impl Iterator<Item = Good> + '_ {
        self.components.iter().filter_map(|slot| slot.first().copied())
    }
}

/// Read-only recipe table with prebuilt requirement trees.
///
/// Validation runs at construction; afterwards the catalog is never mutated
/// and can be shared freely.
#[derive(Clone, Debug)]
pub struct RecipeCatalog {
    recipes: BTreeMap<GoodTag, RecipeModel>,
    trees: BTreeMap<GoodTag, RequirementTreeNode>,
}

impl RecipeCatalog {
    pub fn new(recipes: Vec<RecipeModel>) -> Result<Self, ValidationError> {
        let mut table = BTreeMap::new();
        for recipe in recipes {
            validate_recipe(&recipe)?;
            let tag = recipe.tag;
            if table.insert(tag, recipe).is_some() {
                return Err(ValidationError::DuplicateRecipe(tag));
            }
        }
        let mut catalog = Self {
            recipes: table,
            trees: BTreeMap::new(),
        };
        catalog.validate()?;
        let trees = catalog
            .recipes
            .keys()
            .map(|&tag| catalog.build_requirements_tree(tag).map(|tree| (tag, tree)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        catalog.trees = trees;
        tracing::debug!(recipes = catalog.recipes.len(), "recipe catalog ready");
        Ok(catalog)
    }

    /// Catalog over [`standard_recipes`].
    pub fn standard() -> Result<Self, ValidationError> {
        Self::new(standard_recipes())
    }

    pub fn recipe(&self, tag: GoodTag) -> Option<&RecipeModel> {
        self.recipes.get(&tag)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &RecipeModel> + '_ {
        self.recipes.values()
    }

    /// Cached requirement tree for one unit of `tag`.
    pub fn requirements(&self, tag: GoodTag) -> Option<&RequirementTreeNode> {
        self.trees.get(&tag)
    }

    /// Expand `tag` into its tree of first-choice sub-requirements.
    pub fn build_requirements_tree(
        &self,
        tag: GoodTag,
    ) -> Result<RequirementTreeNode, ValidationError> {
        self.expand(Good::new(tag, 1))
    }

    fn expand(&self, good: Good) -> Result<RequirementTreeNode, ValidationError> {
        let recipe = self
            .recipe(good.tag)
            .ok_or(ValidationError::MissingRecipe(good.tag))?;
        let children = recipe
            .first_choices()
            .map(|choice| self.expand(choice))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RequirementTreeNode {
            tag: good.tag,
            amount: good.amount,
            children,
        })
    }

    /// Every component resolves to a recipe and no recipe needs itself.
    fn validate(&self) -> Result<(), ValidationError> {
        for recipe in self.recipes.values() {
            for good in recipe.components.iter().flatten() {
                if !self.recipes.contains_key(&good.tag) {
                    return Err(ValidationError::MissingRecipe(good.tag));
                }
            }
        }
        let mut done = BTreeSet::new();
        for &tag in self.recipes.keys() {
            self.check_acyclic(tag, &mut BTreeSet::new(), &mut done)?;
        }
        Ok(())
    }

    fn check_acyclic(
        &self,
        tag: GoodTag,
        path: &mut BTreeSet<GoodTag>,
        done: &mut BTreeSet<GoodTag>,
    ) -> Result<(), ValidationError> {
        if done.contains(&tag) {
            return Ok(());
        }
        if !path.insert(tag) {
            return Err(ValidationError::CyclicRecipe(tag));
        }
        if let Some(recipe) = self.recipes.get(&tag) {
            for good in recipe.components.iter().flatten() {
                self.check_acyclic(good.tag, path, done)?;
            }
        }
        path.remove(&tag);
        done.insert(tag);
        Ok(())
    }
}

/// The default survival economy.
pub fn standard_recipes() -> Vec<RecipeModel> {
    use GoodTag::*;
    vec![
        RecipeModel::leaf(Animal, 4, 1),
        RecipeModel::leaf(Tree, 4, 1),
        RecipeModel::leaf(Meat, 2, 4).with_component(vec![Good::new(Animal, 1)]),
        RecipeModel::leaf(Meal, 1, 1).with_component(vec![Good::new(Meat, 1)]),
        RecipeModel::leaf(Skin, 4, 2).with_component(vec![Good::new(Animal, 1)]),
        RecipeModel::leaf(Hide, 4, 1).with_component(vec![Good::new(Skin, 1)]),
        RecipeModel::leaf(Cloth, 8, 1).with_component(vec![Good::new(Hide, 2)]),
        RecipeModel::leaf(House, 40, 1).with_component(vec![Good::new(Tree, 16)]),
        RecipeModel::leaf(Weapon, 1, 1)
            .with_component(vec![Good::new(Tree, 1)])
            .with_component(vec![Good::new(Skin, 1), Good::new(Hide, 1)]),
    ]
}

fn validate_recipe(recipe: &RecipeModel) -> Result<(), ValidationError> {
    if recipe.manhours == 0 {
        return Err(ValidationError::NonPositiveManhours(recipe.tag));
    }
    if recipe.yield_amount == 0 {
        return Err(ValidationError::NonPositiveYield(recipe.tag));
    }
    for slot in &recipe.components {
        if slot.is_empty() {
            return Err(ValidationError::EmptyComponentSlot(recipe.tag));
        }
        if let Some(good) = slot.iter().find(|good| good.amount == 0) {
            return Err(ValidationError::ZeroComponentAmount {
                recipe: recipe.tag,
                component: good.tag,
            });
        }
    }
    Ok(())
}
