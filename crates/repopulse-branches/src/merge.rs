//! Merge detection: ancestor checks and the squash-merge heuristic.
//!
//! `merged_into_*` uses `git merge-base --is-ancestor` (exit code 0 means
//! merged). Squash detection compares the tree that merging the branch
//! onto its merge-base would produce against the trees of recent commits
//! on the target; a match means the branch's content landed without its
//! history. Both are signals from the installed git binary, not proofs,
//! and every subprocess failure maps to "not merged".

use repopulse_core::MergeStatus;
use repopulse_git::invoker::{GitInvoker, SHORT_TIMEOUT};
use tracing::debug;

/// How many recent target commits to scan for a squashed tree match.
const SQUASH_SCAN_DEPTH: usize = 20;

/// Detects whether branches have been merged into a target branch.
///
/// # Examples
///
/// ```no_run
/// use repopulse_branches::merge::MergeDetector;
///
/// let detector = MergeDetector::new(".");
/// let status = detector.detect("feature/login", "main", "main");
/// println!("merged: {}", status.is_merged());
/// ```
#[derive(Debug, Clone)]
pub struct MergeDetector {
    invoker: GitInvoker,
}

impl MergeDetector {
    /// Create a merge detector rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            invoker: GitInvoker::new(repo_path),
        }
    }

    /// Detect the merge status of `branch`.
    ///
    /// The target check runs only when `target_branch` differs from
    /// `default_branch`; otherwise it would duplicate the default check.
    pub fn detect(&self, branch: &str, default_branch: &str, target_branch: &str) -> MergeStatus {
        let merged_into_default = self.is_ancestor(branch, default_branch);
        let merged_into_target = if target_branch != default_branch {
            self.is_ancestor(branch, target_branch)
        } else {
            false
        };

        MergeStatus {
            merged_into_default,
            merged_into_target,
            has_pull_request: false,
        }
    }

    /// Whether `branch` appears to have been squash-merged into `target`.
    ///
    /// Returns `false` when the refs share no merge base or any git call
    /// fails.
    pub fn is_squash_merged(&self, branch: &str, target: &str) -> bool {
        let Some(merge_base) = self.merge_base(branch, target) else {
            return false;
        };

        let branch_tree = match self
            .invoker
            .run(&["merge-tree", &merge_base, &merge_base, branch], SHORT_TIMEOUT)
        {
            Ok(out) => out.trim().to_string(),
            Err(err) => {
                debug!("merge-tree failed for {branch}: {err}");
                return false;
            }
        };
        if branch_tree.is_empty() {
            return false;
        }

        let depth = format!("-n{SQUASH_SCAN_DEPTH}");
        let target_trees = match self
            .invoker
            .run(&["log", "--format=%T", &depth, target], SHORT_TIMEOUT)
        {
            Ok(out) => out,
            Err(err) => {
                debug!("could not read target trees for {target}: {err}");
                return false;
            }
        };

        target_trees.lines().any(|tree| tree.trim() == branch_tree)
    }

    /// `true` if `branch` is an ancestor of `target` (exit code 0).
    fn is_ancestor(&self, branch: &str, target: &str) -> bool {
        self.invoker
            .run(&["merge-base", "--is-ancestor", branch, target], SHORT_TIMEOUT)
            .is_ok()
    }

    /// The merge-base SHA of two refs, or `None` when unrelated.
    fn merge_base(&self, branch: &str, target: &str) -> Option<String> {
        match self
            .invoker
            .run(&["merge-base", branch, target], SHORT_TIMEOUT)
        {
            Ok(out) => {
                let sha = out.trim();
                if sha.is_empty() {
                    None
                } else {
                    Some(sha.to_string())
                }
            }
            Err(err) => {
                debug!("no merge base for {branch}..{target}: {err}");
                None
            }
        }
    }
}
