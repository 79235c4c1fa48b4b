//! Turns a selection into the concatenated content artifact.
//!
//! `collect` expands the selected roots into an ordered file list, `dedup` drops
//! files already seen under another root, and `render` writes one block per file:
//!
//! ```text
//! ==>> ARCHIVO: /abs/path
//! ────────────────────────────────────────────────────────────
//! <content>
//!
//! ```

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::CoreError;
use super::exclusions::ExclusionSet;
use super::ignore::IgnoreRules;
use super::walk::{is_file_like, visible_entries};

pub const FILE_MARKER: &str = "==>> ARCHIVO:";
pub const SEPARATOR_CHAR: char = '─';
pub const SEPARATOR_WIDTH: usize = 60;
const PREVIEW_CHARS: usize = 10_000;

pub fn separator_line() -> String {
    std::iter::repeat(SEPARATOR_CHAR).take(SEPARATOR_WIDTH).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStats {
    pub files: usize,
    pub lines: usize,
    pub bytes: usize,
    pub estimated_tokens: usize,
}

impl GenerationStats {
    fn from_content(content: &str, files: usize) -> Self {
        Self {
            files,
            lines: content.matches('\n').count(),
            bytes: content.len(),
            estimated_tokens: estimate_tokens(content),
        }
    }

    pub fn kilobytes(&self) -> f64 {
        self.bytes as f64 / 1024.0
    }

    /// One-line summary for status bars.
    pub fn summary(&self) -> String {
        format!(
            "~{} tokens  .  {} files  .  {} lines  .  {:.1} KB",
            self.estimated_tokens,
            self.files,
            self.lines,
            self.kilobytes()
        )
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub content: String,
    /// The deduplicated files, in output order.
    pub files: Vec<PathBuf>,
    pub stats: GenerationStats,
}

impl GeneratedContent {
    /// The first characters of the content, with a notice when truncated.
    pub fn preview(&self) -> String {
        match self.content.char_indices().nth(PREVIEW_CHARS) {
            Some((cut, _)) => format!(
                "{}\n\n[... preview truncated -- full content kept ...]",
                &self.content[..cut]
            ),
            None => self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationProgress {
    pub current_file: PathBuf,
    pub processed: usize,
    pub total: usize,
}

/// A utility struct for building the content artifact.
///
/// This struct is stateless and provides methods as associated functions.
pub struct ContentAggregator;

impl ContentAggregator {
    /// Expands `roots` (input order kept) into files.
    ///
    /// Excluded roots contribute nothing. A directory root contributes its
    /// visible descendants, subdirectories before files at each level, names
    /// compared case-insensitively.
    pub fn collect(
        roots: &[PathBuf],
        exclusions: &ExclusionSet,
        rules: &IgnoreRules,
    ) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in roots {
            if exclusions.is_excluded(root) {
                continue;
            }
            if root.is_file() {
                files.push(root.clone());
            } else if root.is_dir() {
                files.extend(
                    visible_entries(root, exclusions, rules)
                        .filter(|entry| entry.depth() > 0 && is_file_like(entry))
                        .map(|entry| entry.into_path()),
                );
            } else {
                tracing::warn!("Selected path no longer exists: {:?}", root);
            }
        }
        files
    }

    /// Keeps the first occurrence of every file, identified by its canonical path.
    pub fn dedup(files: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        files
            .into_iter()
            .filter(|file| {
                let identity = fs::canonicalize(file).unwrap_or_else(|_| file.clone());
                seen.insert(identity)
            })
            .collect()
    }

    pub fn render(files: &[PathBuf]) -> String {
        Self::render_with_progress(files, |_| {})
    }

    /// Like [`render`](Self::render), reporting each file before it is read.
    ///
    /// Never fails: unreadable files get an inline error block and invalid UTF-8
    /// is replaced.
    pub fn render_with_progress<F>(files: &[PathBuf], mut progress: F) -> String
    where
        F: FnMut(GenerationProgress),
    {
        let separator = separator_line();
        let mut content = String::new();

        for (i, file) in files.iter().enumerate() {
            progress(GenerationProgress {
                current_file: file.clone(),
                processed: i,
                total: files.len(),
            });

            content.push_str(&format!("{FILE_MARKER} {}\n", file.display()));
            match Self::read_file_content(file) {
                Ok(file_content) => {
                    content.push_str(&separator);
                    content.push('\n');
                    content.push_str(&file_content);
                    content.push('\n');
                }
                Err(e) => {
                    tracing::debug!("Could not read {:?}: {}", file, e);
                    content.push_str(&format!("[ERROR: {e}]\n"));
                }
            }
            content.push('\n');
        }

        content
    }

    /// `collect` + `dedup` + `render`, with statistics.
    pub fn generate(
        roots: &[PathBuf],
        exclusions: &ExclusionSet,
        rules: &IgnoreRules,
    ) -> Result<GeneratedContent, CoreError> {
        Self::generate_with_progress(roots, exclusions, rules, |_| {})
    }

    pub fn generate_with_progress<F>(
        roots: &[PathBuf],
        exclusions: &ExclusionSet,
        rules: &IgnoreRules,
        progress: F,
    ) -> Result<GeneratedContent, CoreError>
    where
        F: FnMut(GenerationProgress),
    {
        if roots.is_empty() {
            return Err(CoreError::EmptySelection);
        }

        let files = Self::dedup(Self::collect(roots, exclusions, rules));
        let content = Self::render_with_progress(&files, progress);
        let stats = GenerationStats::from_content(&content, files.len());

        tracing::info!(
            "Generated content for {} root(s): {}",
            roots.len(),
            stats.summary()
        );
        Ok(GeneratedContent {
            content,
            files,
            stats,
        })
    }

    fn read_file_content(file: &Path) -> std::io::Result<String> {
        let bytes = fs::read(file)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

fn estimate_tokens(content: &str) -> usize {
    match tiktoken_rs::cl100k_base() {
        Ok(bpe) => bpe.encode_with_special_tokens(content).len(),
        Err(e) => {
            tracing::debug!("Tokenizer unavailable ({}), using length estimate", e);
            content.len() / 4
        }
    }
}
