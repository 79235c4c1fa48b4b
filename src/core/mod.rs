pub mod aggregator;
pub mod error;
pub mod exclusions;
pub mod ignore;
pub mod navigator;
pub mod search;
pub mod shell_script;
pub mod tree;
pub mod walk;

pub use aggregator::{
    ContentAggregator, GeneratedContent, GenerationProgress, GenerationStats, FILE_MARKER,
};
pub use error::CoreError;
pub use exclusions::{ExclusionRegistry, ExclusionSet};
pub use ignore::{build_globset_from_patterns, IgnoreRules};
pub use navigator::Navigator;
pub use search::{IndexEntry, SearchIndex, DEFAULT_RESULT_LIMIT, MAX_RESULT_LIMIT};
pub use shell_script::shell_script;
pub use tree::{Node, NodeId, TreeChange, TreeModel};
