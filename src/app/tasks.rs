//! Background work: index builds and content generation.
//!
//! Both run the blocking traversal on `spawn_blocking` against snapshots taken
//! at launch, and hand the result back as a `UserEvent`.

use std::fs;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::state::AppState;
use crate::core::{ContentAggregator, CoreError, GeneratedContent, SearchIndex};

/// Where a generation ends up besides the in-memory preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write `<output_directory>/<output_name>.txt`.
    File,
    /// Keep the content in memory only (clipboard, stdout).
    Memory,
}

/// Starts an index build for the loaded root and returns its generation id.
///
/// Returns `None` when no root is loaded.
pub fn start_index_build<P: EventProxy>(
    state: &mut AppState,
    proxy: P,
) -> Option<(u64, JoinHandle<()>)> {
    let root = state.root()?.to_path_buf();
    let exclusions = state.exclusions.snapshot();
    let rules = state.ignore_rules();
    let generation = state.next_index_generation();

    tracing::debug!("Starting index build #{} for {:?}", generation, root);
    let handle = tokio::spawn(async move {
        let result =
            tokio::task::spawn_blocking(move || SearchIndex::build(&root, &exclusions, &rules))
                .await
                .map_err(CoreError::from)
                .and_then(|built| built);

        match result {
            Ok(index) => proxy.send_event(UserEvent::IndexReady {
                generation,
                index: Box::new(index),
            }),
            Err(e) => {
                tracing::error!("Index build #{} failed: {}", generation, e);
                proxy.send_event(UserEvent::IndexFailed {
                    generation,
                    message: e.to_string(),
                });
            }
        }
    });
    Some((generation, handle))
}

/// Starts generating content for the current selection.
///
/// An empty selection is rejected before anything is spawned.
pub fn start_content_generation<P: EventProxy>(
    state: &mut AppState,
    proxy: P,
    target: OutputTarget,
) -> Result<JoinHandle<()>, CoreError> {
    let roots = state.tree.get_selected();
    if roots.is_empty() {
        return Err(CoreError::EmptySelection);
    }

    let exclusions = state.exclusions.snapshot();
    let rules = state.ignore_rules();
    let output_file = match target {
        OutputTarget::File => Some(state.config.output_file()),
        OutputTarget::Memory => None,
    };
    state.is_generating = true;

    let handle = tokio::spawn(async move {
        let progress_proxy = proxy.clone();
        let result = tokio::task::spawn_blocking(move || {
            let content =
                ContentAggregator::generate_with_progress(&roots, &exclusions, &rules, |p| {
                    progress_proxy.send_event(UserEvent::GenerationProgress(p))
                })?;
            if let Some(path) = &output_file {
                write_output(path, &content)?;
            }
            Ok::<(GeneratedContent, Option<PathBuf>), CoreError>((content, output_file))
        })
        .await
        .map_err(CoreError::from)
        .and_then(|generated| generated);

        match result {
            Ok((content, written_to)) => proxy.send_event(UserEvent::ContentGenerated {
                content: Box::new(content),
                written_to,
            }),
            Err(e) => {
                tracing::error!("Content generation failed: {}", e);
                proxy.send_event(UserEvent::GenerationFailed(e.to_string()));
            }
        }
    });
    Ok(handle)
}

fn write_output(path: &Path, content: &GeneratedContent) -> Result<(), CoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| CoreError::io(e, dir))?;
    }
    fs::write(path, &content.content).map_err(|e| CoreError::io(e, path))?;
    tracing::info!("Wrote {} bytes to {:?}", content.stats.bytes, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExclusionRegistry;
    use crate::config::AppConfig;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn state_for(root: &Path, output_dir: &Path) -> AppState {
        let config = AppConfig {
            output_directory: output_dir.to_path_buf(),
            output_name: "bundle".to_string(),
            ..AppConfig::default()
        };
        let mut state = AppState::new(config, ExclusionRegistry::in_memory());
        let rules = state.ignore_rules();
        state
            .tree
            .build(root, &state.exclusions.snapshot(), &rules)
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_index_build_reports_its_generation() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let mut state = state_for(dir.path(), dir.path());
        let (tx, mut rx) = mpsc::unbounded_channel::<UserEvent>();

        let (generation, handle) = start_index_build(&mut state, tx).unwrap();
        handle.await.unwrap();

        assert_eq!(generation, state.index_generation);
        assert!(state.is_indexing());
        match rx.recv().await {
            Some(UserEvent::IndexReady { generation: g, index }) => {
                assert_eq!(g, generation);
                assert_eq!(index.len(), 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_index_build_needs_a_root() {
        let mut state = AppState::default();
        let (tx, _rx) = mpsc::unbounded_channel::<UserEvent>();
        assert!(start_index_build(&mut state, tx).is_none());
        assert_eq!(state.index_generation, 0);
    }

    #[tokio::test]
    async fn test_generation_rejects_empty_selection() {
        let dir = tempdir().unwrap();
        let mut state = state_for(dir.path(), dir.path());
        let (tx, _rx) = mpsc::unbounded_channel::<UserEvent>();

        let result = start_content_generation(&mut state, tx, OutputTarget::File);

        assert!(matches!(result, Err(CoreError::EmptySelection)));
        assert!(!state.is_generating);
    }

    #[tokio::test]
    async fn test_generation_writes_output_file() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("b.txt"), "hello").unwrap();
        let output_dir = dir.path().join("out/nested");
        let mut state = state_for(&project, &output_dir);
        let id = state.tree.find(&state.tree.root_path().join("b.txt")).unwrap();
        state.tree.toggle(id, Some(true)).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel::<UserEvent>();

        start_content_generation(&mut state, tx, OutputTarget::File)
            .unwrap()
            .await
            .unwrap();

        assert!(state.is_generating);
        let mut generated = None;
        while let Ok(event) = rx.try_recv() {
            if let UserEvent::ContentGenerated { content, written_to } = event {
                generated = Some((content, written_to));
            }
        }
        let (content, written_to) = generated.expect("no ContentGenerated event");
        let expected_file = output_dir.join("bundle.txt");
        assert_eq!(written_to, Some(expected_file.clone()));
        assert_eq!(fs::read_to_string(expected_file).unwrap(), content.content);
        assert!(content.content.ends_with("hello\n\n"));
    }
}
