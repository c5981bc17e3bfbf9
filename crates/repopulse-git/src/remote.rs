//! Branch tracking status and ahead/behind divergence.
//!
//! Only reads local config and refs; never touches the network.

use tracing::debug;

use crate::invoker::{GitInvoker, SHORT_TIMEOUT};

/// Checks branch tracking status and ahead/behind counts.
///
/// # Examples
///
/// ```no_run
/// use repopulse_git::remote::RemoteSync;
///
/// let remote = RemoteSync::new(".");
/// let (ahead, behind) = remote.ahead_behind("feature/login", "main");
/// println!("{ahead} ahead, {behind} behind");
/// ```
#[derive(Debug, Clone)]
pub struct RemoteSync {
    invoker: GitInvoker,
}

impl RemoteSync {
    /// Create a remote-sync checker rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            invoker: GitInvoker::new(repo_path),
        }
    }

    /// Commits ahead of and behind `target`, via
    /// `rev-list --left-right --count branch...target`.
    ///
    /// Any failure (unknown ref, unrelated histories, malformed output)
    /// yields `(0, 0)`.
    pub fn ahead_behind(&self, branch: &str, target: &str) -> (u32, u32) {
        let range = format!("{branch}...{target}");
        match self
            .invoker
            .run(&["rev-list", "--left-right", "--count", &range], SHORT_TIMEOUT)
        {
            Ok(raw) => {
                let parts: Vec<&str> = raw.split_whitespace().collect();
                if parts.len() == 2 {
                    if let (Ok(ahead), Ok(behind)) = (parts[0].parse(), parts[1].parse()) {
                        return (ahead, behind);
                    }
                }
                debug!("unexpected rev-list output for {range}: {raw:?}");
                (0, 0)
            }
            Err(err) => {
                debug!("could not compute ahead/behind for {range}: {err}");
                (0, 0)
            }
        }
    }

    /// Whether `branch` has a remote configured (`branch.<name>.remote`).
    pub fn has_remote(&self, branch: &str) -> bool {
        let key = format!("branch.{branch}.remote");
        match self.invoker.run(&["config", &key], SHORT_TIMEOUT) {
            Ok(out) => !out.trim().is_empty(),
            Err(_) => false,
        }
    }

    /// The upstream tracking ref (e.g. `origin/main`), or `None`.
    pub fn tracking_branch(&self, branch: &str) -> Option<String> {
        let upstream = format!("{branch}@{{upstream}}");
        match self
            .invoker
            .run(&["rev-parse", "--abbrev-ref", &upstream], SHORT_TIMEOUT)
        {
            Ok(out) => {
                let name = out.trim();
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                }
            }
            Err(_) => None,
        }
    }
}
