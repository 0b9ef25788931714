//! Ancestor walk that turns ignore files into an allow/deny decision.
//!
//! Nothing is cached: every decision stats and re-reads the ignore files
//! between the path's parent directory and `/`, so edits take effect on
//! the very next call.

use std::fs;
use std::path::{Path, PathBuf};

use super::loader::load_patterns;
use super::matcher::matches;
use crate::paths;

/// Ignore file names checked in every directory, highest priority first.
pub const IGNORE_FILE_NAMES: [&str; 2] = [".claudeignore", ".copilotignore"];

/// One pattern and the directory of the ignore file that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    pub pattern: String,
    /// Matches are evaluated relative to this directory.
    pub base_dir: PathBuf,
}

impl IgnoreRule {
    pub fn matches(&self, path: &Path) -> bool {
        matches(path, &self.pattern, &self.base_dir)
    }
}

/// The rules loaded from one ignore file, in declaration order.
#[derive(Debug, Clone)]
pub struct IgnoreFile {
    pub path: PathBuf,
    pub rules: Vec<IgnoreRule>,
}

impl IgnoreFile {
    /// Load `dir/name` if it is a regular file (symlinks are followed).
    pub fn load(dir: &Path, name: &str) -> Option<Self> {
        let path = dir.join(name);
        let is_file = fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return None;
        }

        let rules = load_patterns(&path)
            .into_iter()
            .map(|pattern| IgnoreRule {
                pattern,
                base_dir: dir.to_path_buf(),
            })
            .collect();

        Some(Self { path, rules })
    }

    /// First rule that matches `path`, if any.
    pub fn first_match(&self, path: &Path) -> Option<&IgnoreRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }
}

/// Why a path was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreMatch {
    pub rule: IgnoreRule,
    /// The ignore file that declared `rule`.
    pub source: PathBuf,
}

/// Hierarchical ignore policy.
///
/// A path is ignored when any pattern in any recognized ignore file of any
/// ancestor directory matches it. Evaluation is a plain disjunction and
/// stops at the first hit.
#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    file_names: Vec<String>,
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self::with_file_names(IGNORE_FILE_NAMES)
    }
}

impl IgnorePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `names` (checked in the given order) instead of [`IGNORE_FILE_NAMES`].
    pub fn with_file_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// Whether access to `path` should be denied.
    ///
    /// Relative paths are resolved against the current working directory
    /// at call time. An empty path, or a relative path when the working
    /// directory is unavailable, is never ignored.
    pub fn should_ignore(&self, path: &Path) -> bool {
        self.explain(path).is_some()
    }

    /// Like [`should_ignore`](Self::should_ignore), but returns the rule
    /// that matched.
    pub fn explain(&self, path: &Path) -> Option<IgnoreMatch> {
        let absolute = paths::absolutize(path)?;
        self.explain_absolute(&absolute)
    }

    fn explain_absolute(&self, path: &Path) -> Option<IgnoreMatch> {
        let mut dir = path.parent();

        while let Some(current) = dir {
            for name in &self.file_names {
                let Some(file) = IgnoreFile::load(current, name) else {
                    continue;
                };
                if let Some(rule) = file.first_match(path) {
                    return Some(IgnoreMatch {
                        rule: rule.clone(),
                        source: file.path.clone(),
                    });
                }
            }
            dir = current.parent();
        }

        None
    }
}

/// [`IgnorePolicy::should_ignore`] with the default ignore file names.
pub fn should_ignore(path: &Path) -> bool {
    IgnorePolicy::default().should_ignore(path)
}
