//! Part category entity - a tree of classification nodes

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::identity::CategoryId;

/// Part category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    /// Parent category, `None` for a root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryId>,
}

impl Category {
    pub fn new(id: u64, name: impl Into<String>, parent: Option<u64>) -> Self {
        Self {
            id: CategoryId(id),
            name: name.into(),
            parent: parent.map(CategoryId),
        }
    }
}

/// Collect `root` and every category below it, in ascending id order.
///
/// Returns `None` when `root` is not a known category. Parent links that loop
/// back are visited once.
pub fn descendants_of(
    categories: &BTreeMap<CategoryId, Category>,
    root: CategoryId,
) -> Option<Vec<CategoryId>> {
    if !categories.contains_key(&root) {
        return None;
    }

    let mut children: BTreeMap<CategoryId, Vec<CategoryId>> = BTreeMap::new();
    for category in categories.values() {
        if let Some(parent) = category.parent {
            children.entry(parent).or_default().push(category.id);
        }
    }

    let mut found = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !found.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().copied());
        }
    }

    Some(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> BTreeMap<CategoryId, Category> {
        [
            Category::new(5, "Fabrication", None),
            Category::new(12, "Sheet metal", Some(5)),
            Category::new(13, "Machined", Some(5)),
            Category::new(14, "Turned", Some(13)),
            Category::new(8, "Commercial", None),
        ]
        .into_iter()
        .map(|c| (c.id, c))
        .collect()
    }

    #[test]
    fn test_descendants_include_self_and_grandchildren() {
        let ids = descendants_of(&tree(), CategoryId(5)).unwrap();
        assert_eq!(
            ids,
            vec![CategoryId(5), CategoryId(12), CategoryId(13), CategoryId(14)]
        );
    }

    #[test]
    fn test_leaf_category_is_only_itself() {
        let ids = descendants_of(&tree(), CategoryId(8)).unwrap();
        assert_eq!(ids, vec![CategoryId(8)]);
    }

    #[test]
    fn test_unknown_category() {
        assert!(descendants_of(&tree(), CategoryId(99)).is_none());
    }

    #[test]
    fn test_parent_loop_terminates() {
        let mut categories = tree();
        categories.insert(CategoryId(5), Category::new(5, "Fabrication", Some(14)));
        let ids = descendants_of(&categories, CategoryId(13)).unwrap();
        assert!(ids.contains(&CategoryId(5)));
        assert!(ids.contains(&CategoryId(13)));
    }
}
