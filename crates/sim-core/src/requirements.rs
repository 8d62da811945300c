//! Requirement trees: a recipe expanded down to raw resources.

use serde::{Deserialize, Serialize};

use crate::{Good, GoodTag};

/// One good to acquire, with the first-choice components needed for a
/// single production run of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementTreeNode {
    pub tag: GoodTag,
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RequirementTreeNode>,
}

impl RequirementTreeNode {
    pub fn good(&self) -> Good {
        Good::new(self.tag, self.amount)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in the subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Self::size).sum::<usize>()
    }

    /// Pre-order walk with depth.
    pub fn walk<F: FnMut(&RequirementTreeNode, usize)>(&self, f: &mut F) {
        self.walk_at(0, f);
    }

    fn walk_at<F: FnMut(&RequirementTreeNode, usize)>(&self, depth: usize, f: &mut F) {
        f(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::RecipeCatalog;

    use super::*;

    #[test]
    fn cloth_tree_walks_down_to_animal() {
        let catalog = RecipeCatalog::standard().unwrap();
        let tree = catalog.requirements(GoodTag::Cloth).unwrap();
        let mut seen = Vec::new();
        tree.walk(&mut |node, depth| seen.push((node.tag, node.amount, depth)));
        assert_eq!(
            seen,
            vec![
                (GoodTag::Cloth, 1, 0),
                (GoodTag::Hide, 2, 1),
                (GoodTag::Skin, 1, 2),
                (GoodTag::Animal, 1, 3),
            ]
        );
        assert_eq!(tree.size(), 4);
        assert!(!tree.is_leaf());
    }
}
