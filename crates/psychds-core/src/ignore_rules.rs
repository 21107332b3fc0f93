//! Gitignore-style ignore rules with the Psych-DS defaults.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Paths never checked by the validator, regardless of user rules.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git**",
    ".datalad/",
    "sourcedata/",
    "code/",
    "stimuli/",
    "materials/",
    "results/",
    "products/",
    "documentation/",
    "CHANGES*",
    "log/",
    "**/meg/*.ds/**",
    "**/micr/*.zarr/**",
];

/// Ordered gitignore matcher: defaults first, then every pattern picked up
/// from `.psychdsignore` files during traversal.
#[derive(Debug)]
pub struct FileIgnoreRules {
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl Default for FileIgnoreRules {
    fn default() -> Self {
        Self::new()
    }
}

impl FileIgnoreRules {
    pub fn new() -> Self {
        let mut rules = Self {
            patterns: Vec::new(),
            matcher: Gitignore::empty(),
        };
        for pattern in DEFAULT_IGNORES {
            rules.patterns.push((*pattern).to_string());
        }
        rules.rebuild();
        rules
    }

    /// Append one pattern. Invalid patterns are skipped with a warning.
    pub fn add(&mut self, pattern: &str) {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }
        self.patterns.push(trimmed.to_string());
        self.rebuild();
    }

    /// Append every pattern line of a `.psychdsignore` file.
    pub fn add_ignore_file(&mut self, content: &str) {
        let mut changed = false;
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            self.patterns.push(trimmed.to_string());
            changed = true;
        }
        if changed {
            self.rebuild();
        }
    }

    /// Whether the dataset-relative path (leading `/`) is ignored.
    pub fn test(&self, path: &str) -> bool {
        let rel = path.trim_start_matches('/');
        self.matcher
            .matched_path_or_any_parents(Path::new(rel), false)
            .is_ignore()
    }

    fn rebuild(&mut self) {
        let mut builder = GitignoreBuilder::new("");
        for pattern in &self.patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                tracing::warn!(pattern = %pattern, %err, "skipping invalid ignore pattern");
            }
        }
        match builder.build() {
            Ok(matcher) => self.matcher = matcher,
            Err(err) => {
                tracing::warn!(%err, "failed to build ignore matcher, keeping previous");
            }
        }
    }
}
