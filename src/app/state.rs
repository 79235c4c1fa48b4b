//! Defines the central, mutable state of the application.

use std::path::Path;

use crate::config::{settings, AppConfig};
use crate::core::{ExclusionRegistry, GeneratedContent, IgnoreRules, IndexEntry, SearchIndex, TreeModel};

/// Holds the complete, mutable state of the application.
///
/// Owned by the interactive loop and only ever touched from there. Background
/// workers receive snapshots and report back through `UserEvent`s.
pub struct AppState {
    /// The application's configuration settings.
    pub config: AppConfig,
    pub exclusions: ExclusionRegistry,
    pub tree: TreeModel,
    /// The most recently applied search index.
    pub index: SearchIndex,
    /// Id of the most recently requested index build.
    pub index_generation: u64,
    /// Id of the build `index` came from.
    pub applied_index_generation: u64,
    pub search_query: String,
    pub search_results: Vec<IndexEntry>,
    /// `true` while a content generation runs in the background.
    pub is_generating: bool,
    pub last_generated: Option<GeneratedContent>,
    pub status_message: String,
}

impl Default for AppState {
    /// Default configuration with an in-memory exclusion list; nothing touches disk.
    fn default() -> Self {
        Self::new(AppConfig::default(), ExclusionRegistry::in_memory())
    }
}

impl AppState {
    pub fn new(config: AppConfig, exclusions: ExclusionRegistry) -> Self {
        Self {
            config,
            exclusions,
            tree: TreeModel::new(),
            index: SearchIndex::default(),
            index_generation: 0,
            applied_index_generation: 0,
            search_query: String::new(),
            search_results: Vec::new(),
            is_generating: false,
            last_generated: None,
            status_message: "Ready.".to_string(),
        }
    }

    /// Loads the configuration and the persisted exclusions from `config_dir`,
    /// or from the platform configuration directory.
    ///
    /// A configuration that cannot be read or created falls back to the defaults.
    pub fn load(config_dir: Option<&Path>) -> Self {
        let config_file = config_dir.map(|dir| dir.join("config.json"));
        let config = settings::load_config(config_file.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Could not load config ({}); using defaults", e);
            AppConfig::default()
        });
        let exclusions = match settings::get_exclusion_store_path(config_dir) {
            Some(store) => ExclusionRegistry::load(store),
            None => {
                tracing::warn!("Could not determine config directory; exclusions are not persisted");
                ExclusionRegistry::in_memory()
            }
        };
        Self::new(config, exclusions)
    }

    /// The loaded root, if a tree has been built.
    pub fn root(&self) -> Option<&Path> {
        self.tree.root().map(|_| self.tree.root_path())
    }

    pub fn ignore_rules(&self) -> IgnoreRules {
        self.config.ignore_rules()
    }

    /// Issues the id for a new index build. Older builds become stale.
    pub fn next_index_generation(&mut self) -> u64 {
        self.index_generation += 1;
        self.index_generation
    }

    pub fn is_indexing(&self) -> bool {
        self.applied_index_generation != self.index_generation
    }

    /// Re-runs the current query against the current index.
    ///
    /// Hits excluded since the index was built are dropped.
    pub fn refresh_search_results(&mut self) {
        self.search_results = self
            .index
            .query(&self.search_query, self.config.result_limit())
            .into_iter()
            .filter(|entry| !self.exclusions.is_excluded(&entry.path))
            .cloned()
            .collect();
    }

    /// Drops everything tied to the loaded root.
    pub fn reset_root_state(&mut self) {
        self.tree = TreeModel::new();
        self.index = SearchIndex::default();
        self.applied_index_generation = self.index_generation;
        self.search_query.clear();
        self.search_results.clear();
        self.last_generated = None;
    }
}
