//! Bridges search hits back onto the live tree.

use super::error::CoreError;
use super::search::IndexEntry;
use super::tree::{NodeId, TreeModel};

/// Maps an [`IndexEntry`] to its tree node and highlights it.
///
/// The index is built independently of the tree, so a hit may point at a path
/// the tree no longer contains (excluded or deleted since). That comes back as
/// `CoreError::NotInTree` for the caller to show as a warning.
pub struct Navigator;

impl Navigator {
    pub fn select(tree: &mut TreeModel, entry: &IndexEntry) -> Result<NodeId, CoreError> {
        if !tree.navigate(&entry.path) {
            return Err(CoreError::NotInTree(entry.path.clone()));
        }
        tree.highlighted()
            .ok_or_else(|| CoreError::NotInTree(entry.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExclusionSet, IgnoreRules, SearchIndex, DEFAULT_RESULT_LIMIT};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_select_highlights_matching_node() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg/inner")).unwrap();
        fs::write(dir.path().join("pkg/inner/target.rs"), "").unwrap();
        let rules = IgnoreRules::default();
        let exclusions = ExclusionSet::default();

        let mut tree = TreeModel::new();
        tree.build(dir.path(), &exclusions, &rules).unwrap();
        let index = SearchIndex::build(dir.path(), &exclusions, &rules).unwrap();
        let hit = index.query("target", DEFAULT_RESULT_LIMIT)[0].clone();

        let id = Navigator::select(&mut tree, &hit).unwrap();

        assert_eq!(tree.node(id).unwrap().path, hit.path);
        assert!(tree.node(tree.find(&tree.root_path().join("pkg/inner")).unwrap()).unwrap().open);
    }

    #[test]
    fn test_stale_hit_after_rebuild_is_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/x.txt"), "").unwrap();
        let rules = IgnoreRules::default();

        let index = SearchIndex::build(dir.path(), &ExclusionSet::default(), &rules).unwrap();
        let hit = index.query("x.txt", DEFAULT_RESULT_LIMIT)[0].clone();

        // The tree is rebuilt with the directory excluded after the index was built.
        let excluded = index.root().join("a").to_string_lossy().into_owned();
        let mut tree = TreeModel::new();
        tree.build(dir.path(), &ExclusionSet::from_paths([excluded]), &rules)
            .unwrap();

        let result = Navigator::select(&mut tree, &hit);
        assert!(matches!(result, Err(CoreError::NotInTree(path)) if path == hit.path));
        assert_eq!(tree.highlighted(), None);
    }
}
