//! Repository tree listing via `git ls-tree -r -l`.
//!
//! Lists every entry at a ref with its object size, computes per-directory
//! totals, and detects submodules (entries of type `commit`).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::invoker::{GitInvoker, SHORT_TIMEOUT};

static LS_TREE_RE: OnceLock<Regex> = OnceLock::new();

/// `ls-tree -r -l` line: `mode<SP>type<SP>sha<SP>size<TAB>path`; size is
/// `-` for trees and submodules.
fn ls_tree_re() -> &'static Regex {
    LS_TREE_RE.get_or_init(|| {
        Regex::new(r"^(\d{6})\s+(blob|tree|commit)\s+([0-9a-f]{40})\s+(-|\d+)\t(.+)$")
            .expect("valid regex")
    })
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    /// Regular file content.
    Blob,
    /// Directory.
    Tree,
    /// Submodule (a commit object embedded in the tree).
    Commit,
}

/// A single entry from the repository tree.
///
/// # Examples
///
/// ```
/// use repopulse_git::tree::{TreeEntry, TreeEntryKind};
///
/// let entry = TreeEntry {
///     mode: "100644".into(),
///     kind: TreeEntryKind::Blob,
///     sha: "a".repeat(40),
///     path: "src/main.rs".into(),
///     size: 1204,
/// };
/// assert_eq!(entry.kind, TreeEntryKind::Blob);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    /// Octal file mode, e.g. `"100644"`.
    pub mode: String,
    /// Object kind.
    pub kind: TreeEntryKind,
    /// Object SHA.
    pub sha: String,
    /// Repository-relative path.
    pub path: String,
    /// Object size in bytes; `-1` when unknown (non-file entries).
    pub size: i64,
}

/// Walks the git object tree to list files, sizes, and submodules.
///
/// # Examples
///
/// ```no_run
/// use repopulse_git::tree::TreeWalker;
///
/// let walker = TreeWalker::new(".");
/// for entry in walker.walk("HEAD") {
///     println!("{} {}", entry.size, entry.path);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TreeWalker {
    invoker: GitInvoker,
}

impl TreeWalker {
    /// Create a tree walker rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            invoker: GitInvoker::new(repo_path),
        }
    }

    /// List all entries at `git_ref`, empty on failure.
    pub fn walk(&self, git_ref: &str) -> Vec<TreeEntry> {
        match self
            .invoker
            .run(&["ls-tree", "-r", "-l", git_ref], SHORT_TIMEOUT)
        {
            Ok(raw) => parse_ls_tree(&raw),
            Err(err) => {
                debug!("could not list tree at {git_ref}: {err}");
                Vec::new()
            }
        }
    }

    /// Total blob size per directory, in bytes.
    ///
    /// Entries at the repository root are grouped under `"(root)"`;
    /// entries of unknown size are skipped.
    pub fn directory_sizes(&self, git_ref: &str) -> HashMap<String, u64> {
        let mut sizes: HashMap<String, u64> = HashMap::new();
        for entry in self.walk(git_ref) {
            if entry.size < 0 {
                continue;
            }
            let directory = match entry.path.rsplit_once('/') {
                Some((dir, _)) => dir.to_string(),
                None => "(root)".to_string(),
            };
            *sizes.entry(directory).or_default() += entry.size as u64;
        }
        sizes
    }

    /// Submodule entries (type `commit`) at `git_ref`.
    pub fn submodules(&self, git_ref: &str) -> Vec<TreeEntry> {
        self.walk(git_ref)
            .into_iter()
            .filter(|e| e.kind == TreeEntryKind::Commit)
            .collect()
    }
}

/// Parse `git ls-tree -r -l` output; malformed lines are dropped.
///
/// # Examples
///
/// ```
/// use repopulse_git::tree::parse_ls_tree;
///
/// let raw = format!("100644 blob {}     120\tsrc/main.rs\n", "a".repeat(40));
/// let entries = parse_ls_tree(&raw);
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].size, 120);
/// ```
pub fn parse_ls_tree(raw: &str) -> Vec<TreeEntry> {
    let mut entries = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = ls_tree_re().captures(line) else {
            continue;
        };

        let kind = match &caps[2] {
            "blob" => TreeEntryKind::Blob,
            "tree" => TreeEntryKind::Tree,
            _ => TreeEntryKind::Commit,
        };
        let size_str = &caps[4];
        let size = if size_str == "-" {
            -1
        } else {
            size_str.parse().unwrap_or(-1)
        };

        entries.push(TreeEntry {
            mode: caps[1].to_string(),
            kind,
            sha: caps[3].to_string(),
            path: caps[5].to_string(),
            size,
        });
    }
    entries
}
