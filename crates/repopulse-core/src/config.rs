use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PulseError;

/// Top-level configuration loaded from `.repopulse.toml`.
///
/// Every field has a sensible default, so an absent or partial file is
/// never an error — only malformed TOML is.
///
/// # Examples
///
/// ```
/// use repopulse_core::RepopulseConfig;
///
/// let config = RepopulseConfig::default();
/// assert_eq!(config.branches.default_target, "main");
/// assert_eq!(config.git.blame_top_files, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepopulseConfig {
    /// Commit-harvesting settings.
    #[serde(default)]
    pub git: GitConfig,
    /// Branch-analysis settings.
    #[serde(default)]
    pub branches: BranchConfig,
}

impl RepopulseConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Io`] if the file cannot be read, or
    /// [`PulseError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use repopulse_core::RepopulseConfig;
    /// use std::path::Path;
    ///
    /// let config = RepopulseConfig::from_file(Path::new(".repopulse.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, PulseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use repopulse_core::RepopulseConfig;
    ///
    /// let toml = r#"
    /// [branches]
    /// stale_days = 14
    /// "#;
    /// let config = RepopulseConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.branches.stale_days, 14);
    /// assert_eq!(config.branches.abandoned_days, 90);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, PulseError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Commit-harvesting configuration.
///
/// # Examples
///
/// ```
/// use repopulse_core::GitConfig;
///
/// let config = GitConfig::default();
/// assert_eq!(config.max_commits, 0);
/// assert!(config.include_diffs);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Maximum commits to harvest (0 = unlimited).
    #[serde(default)]
    pub max_commits: usize,
    /// Number of top-churn files to run `git blame` on.
    #[serde(default = "default_blame_top_files")]
    pub blame_top_files: usize,
    /// Include per-commit diff statistics.
    #[serde(default = "default_true")]
    pub include_diffs: bool,
    /// Follow file renames in `git log`.
    #[serde(default = "default_true")]
    pub follow_renames: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            max_commits: 0,
            blame_top_files: default_blame_top_files(),
            include_diffs: true,
            follow_renames: true,
        }
    }
}

/// Branch-analysis configuration.
///
/// # Examples
///
/// ```
/// use repopulse_core::BranchConfig;
///
/// let config = BranchConfig::default();
/// assert_eq!(config.stale_days, 30);
/// assert_eq!(config.abandoned_days, 90);
/// assert!(config.protected_patterns.contains(&"release/*".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Name of the main integration branch.
    #[serde(default = "default_target")]
    pub default_target: String,
    /// Glob patterns for branches that must never be deleted.
    #[serde(default = "default_protected_patterns")]
    pub protected_patterns: Vec<String>,
    /// Days of inactivity after which a branch is considered stale.
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,
    /// Days of inactivity after which a branch is considered abandoned.
    #[serde(default = "default_abandoned_days")]
    pub abandoned_days: i64,
    /// Minimum score (0-100) to recommend deletion.
    #[serde(default = "default_min_deletability_score")]
    pub min_deletability_score: f64,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            default_target: default_target(),
            protected_patterns: default_protected_patterns(),
            stale_days: default_stale_days(),
            abandoned_days: default_abandoned_days(),
            min_deletability_score: default_min_deletability_score(),
        }
    }
}

fn default_blame_top_files() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_target() -> String {
    "main".into()
}

fn default_protected_patterns() -> Vec<String> {
    vec![
        "main".into(),
        "master".into(),
        "develop".into(),
        "release/*".into(),
    ]
}

fn default_stale_days() -> i64 {
    30
}

fn default_abandoned_days() -> i64 {
    90
}

fn default_min_deletability_score() -> f64 {
    70.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = RepopulseConfig::from_toml("").unwrap();
        assert_eq!(config.git.max_commits, 0);
        assert_eq!(config.git.blame_top_files, 10);
        assert_eq!(config.branches.default_target, "main");
        assert_eq!(config.branches.min_deletability_score, 70.0);
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let toml = r#"
[git]
max_commits = 500

[branches]
default_target = "trunk"
"#;
        let config = RepopulseConfig::from_toml(toml).unwrap();
        assert_eq!(config.git.max_commits, 500);
        assert!(config.git.follow_renames);
        assert_eq!(config.branches.default_target, "trunk");
        assert_eq!(config.branches.abandoned_days, 90);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(RepopulseConfig::from_toml("[branches").is_err());
    }

    #[test]
    fn protected_patterns_override() {
        let toml = r#"
[branches]
protected_patterns = ["trunk", "hotfix/*"]
"#;
        let config = RepopulseConfig::from_toml(toml).unwrap();
        assert_eq!(config.branches.protected_patterns.len(), 2);
    }
}
