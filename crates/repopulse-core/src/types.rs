use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// The Unix epoch with a zero UTC offset.
///
/// Used as the documented fallback whenever a date from git output cannot
/// be parsed: harvesting degrades instead of aborting.
///
/// # Examples
///
/// ```
/// use repopulse_core::unix_epoch;
///
/// assert_eq!(unix_epoch().timestamp(), 0);
/// ```
pub fn unix_epoch() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

/// Type of change applied to a file in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// New file.
    Added,
    /// Existing file modified in place.
    Modified,
    /// File removed.
    Deleted,
    /// File moved to a new path.
    Renamed,
    /// File copied from another path.
    Copied,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Deleted => write!(f, "deleted"),
            ChangeType::Renamed => write!(f, "renamed"),
            ChangeType::Copied => write!(f, "copied"),
        }
    }
}

/// A single file change within a commit.
///
/// # Examples
///
/// ```
/// use repopulse_core::{ChangeType, FileChange};
///
/// let change = FileChange {
///     path: "src/main.rs".into(),
///     change_type: ChangeType::Modified,
///     insertions: 10,
///     deletions: 3,
///     old_path: None,
/// };
/// assert_eq!(change.insertions, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// File path after the change.
    pub path: String,
    /// Type of change.
    pub change_type: ChangeType,
    /// Lines added.
    pub insertions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// Previous path (renames/copies), or `None`.
    pub old_path: Option<String>,
}

/// Raw commit metadata harvested from the git log.
///
/// Immutable once built; every analytics component consumes the same
/// record stream without mutating it.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use repopulse_core::CommitRecord;
///
/// let date = DateTime::parse_from_rfc3339("2024-06-15T10:30:00+00:00").unwrap();
/// let commit = CommitRecord {
///     sha: "a".repeat(40),
///     author_name: "Alice".into(),
///     author_email: "alice@example.com".into(),
///     authored_date: date,
///     committer_name: "Alice".into(),
///     committer_email: "alice@example.com".into(),
///     committed_date: date,
///     message: "feat: login\n\nAdded OAuth support".into(),
///     files: vec![],
///     insertions: 13,
///     deletions: 2,
/// };
/// assert_eq!(commit.net_lines(), 11);
/// assert_eq!(commit.churn_score(), 15);
/// assert_eq!(commit.subject(), "feat: login");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Full 40-hex commit SHA.
    pub sha: String,
    /// Author display name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Author timestamp, preserving the author's UTC offset.
    pub authored_date: DateTime<FixedOffset>,
    /// Committer display name.
    pub committer_name: String,
    /// Committer email.
    pub committer_email: String,
    /// Committer timestamp.
    pub committed_date: DateTime<FixedOffset>,
    /// Full commit message (subject, blank line, body).
    pub message: String,
    /// Per-file change details, in git's output order.
    pub files: Vec<FileChange>,
    /// Total lines inserted.
    pub insertions: u64,
    /// Total lines deleted.
    pub deletions: u64,
}

impl CommitRecord {
    /// Net line change: insertions minus deletions.
    pub fn net_lines(&self) -> i64 {
        self.insertions as i64 - self.deletions as i64
    }

    /// Churn score: insertions plus deletions.
    pub fn churn_score(&self) -> u64 {
        self.insertions + self.deletions
    }

    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// T-shirt size classification of a commit, by churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitSizeCategory {
    /// Churn of at most 50 lines.
    Small,
    /// Churn of at most 200 lines.
    Medium,
    /// Churn of at most 500 lines.
    Large,
    /// Churn above 500 lines.
    Enormous,
}

impl fmt::Display for CommitSizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitSizeCategory::Small => write!(f, "small"),
            CommitSizeCategory::Medium => write!(f, "medium"),
            CommitSizeCategory::Large => write!(f, "large"),
            CommitSizeCategory::Enormous => write!(f, "enormous"),
        }
    }
}

/// A commit record enriched with classification metadata.
///
/// Produced 1:1 from [`CommitRecord`]s by the enricher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCommit {
    /// The underlying raw commit record.
    pub commit: CommitRecord,
    /// Whether this looks like a merge commit.
    pub is_merge: bool,
    /// Whether this is a `fixup!`/`squash!` commit.
    pub is_fixup: bool,
    /// Whether this is a revert commit.
    pub is_revert: bool,
    /// T-shirt size classification.
    pub size_category: CommitSizeCategory,
    /// Conventional-commit type prefix (e.g. `"feat"`), or `None`.
    pub conventional_type: Option<String>,
}

/// How a branch was merged into its target.
///
/// `Squash` and `FastForward` are reserved: merge detection only ever
/// reports `MergeCommit` or `NotMerged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
    /// Squash merge (reserved, never independently detected).
    Squash,
    /// Regular merge commit.
    MergeCommit,
    /// Fast-forward merge (reserved, never independently detected).
    FastForward,
    /// Not merged.
    NotMerged,
}

impl fmt::Display for MergeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeType::Squash => write!(f, "squash"),
            MergeType::MergeCommit => write!(f, "merge_commit"),
            MergeType::FastForward => write!(f, "fast_forward"),
            MergeType::NotMerged => write!(f, "not_merged"),
        }
    }
}

/// Merge status of a branch.
///
/// # Examples
///
/// ```
/// use repopulse_core::{MergeStatus, MergeType};
///
/// let status = MergeStatus {
///     merged_into_default: true,
///     merged_into_target: false,
///     has_pull_request: false,
/// };
/// assert!(status.is_merged());
/// assert_eq!(status.merge_type(), MergeType::MergeCommit);
/// assert_eq!(MergeStatus::default().merge_type(), MergeType::NotMerged);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatus {
    /// Merged into the default branch (e.g. `main`).
    pub merged_into_default: bool,
    /// Merged into the configured target branch.
    pub merged_into_target: bool,
    /// Associated with a pull request.
    pub has_pull_request: bool,
}

impl MergeStatus {
    /// `true` if merged via any path.
    pub fn is_merged(&self) -> bool {
        self.merged_into_default || self.merged_into_target || self.has_pull_request
    }

    /// The detected merge type.
    ///
    /// Any merged status collapses to [`MergeType::MergeCommit`];
    /// fast-forward merges are not distinguished.
    pub fn merge_type(&self) -> MergeType {
        if self.is_merged() {
            MergeType::MergeCommit
        } else {
            MergeType::NotMerged
        }
    }
}

/// Activity status of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchStatus {
    /// Commits within the stale threshold.
    Active,
    /// No commits for at least `stale_days`.
    Stale,
    /// No commits for at least `abandoned_days`.
    Abandoned,
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchStatus::Active => write!(f, "active"),
            BranchStatus::Stale => write!(f, "stale"),
            BranchStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Recommendation strength for branch deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletabilityCategory {
    /// Safe to delete (score >= 70).
    Safe,
    /// Review before deleting (score >= 40).
    Caution,
    /// Keep the branch.
    Keep,
}

impl fmt::Display for DeletabilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletabilityCategory::Safe => write!(f, "safe"),
            DeletabilityCategory::Caution => write!(f, "caution"),
            DeletabilityCategory::Keep => write!(f, "keep"),
        }
    }
}

/// Analysis report for a single git branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchReport {
    /// Branch name.
    pub name: String,
    /// Whether this is a remote-tracking branch.
    pub is_remote: bool,
    /// Timestamp of the latest commit.
    pub last_commit_date: DateTime<FixedOffset>,
    /// Short SHA of the latest commit.
    pub last_commit_sha: String,
    /// Commits ahead of the target branch.
    pub commits_ahead: u32,
    /// Commits behind the target branch.
    pub commits_behind: u32,
    /// Author of the latest commit.
    pub author_name: String,
    /// Author email of the latest commit.
    pub author_email: String,
    /// Activity status.
    pub status: BranchStatus,
    /// Merge detection result.
    pub merge_status: MergeStatus,
    /// Deletability score (0-100, one decimal).
    pub deletability_score: f64,
    /// Recommendation category.
    pub deletability_category: DeletabilityCategory,
}

/// Aggregated report for all non-default branches in a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchesReport {
    /// Individual branch reports, sorted by name.
    pub branches: Vec<BranchReport>,
    /// Name of the default branch.
    pub default_branch: String,
    /// Name of the configured target branch.
    pub target_branch: String,
    /// Total branch count (excluding the default branch).
    pub total_branches: usize,
    /// Number of stale branches.
    pub stale_count: usize,
    /// Number of abandoned branches.
    pub abandoned_count: usize,
    /// Number of branches categorised as safe to delete.
    pub deletable_count: usize,
}

/// Aggregated contribution statistics for a single author.
///
/// Aliases are other emails resolved to this author's canonical email;
/// all counts aggregate across them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorProfile {
    /// Author display name (from their most recent commit).
    pub name: String,
    /// Canonical author email.
    pub email: String,
    /// Alias emails resolved to the canonical email.
    pub aliases: Vec<String>,
    /// Total commits.
    pub commit_count: usize,
    /// Earliest commit timestamp.
    pub first_commit_date: DateTime<FixedOffset>,
    /// Latest commit timestamp.
    pub last_commit_date: DateTime<FixedOffset>,
    /// Total lines inserted.
    pub insertions: u64,
    /// Total lines deleted.
    pub deletions: u64,
    /// Number of distinct files modified.
    pub files_touched: usize,
    /// Number of distinct calendar days with at least one commit.
    pub active_days: usize,
}

/// Temporal work pattern for a single author.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPattern {
    /// Author email (unaliased).
    pub author_email: String,
    /// Commits per hour of day (author-local time).
    pub hour_distribution: [u32; 24],
    /// Commits per weekday, Monday first.
    pub weekday_distribution: [u32; 7],
    /// Most frequently observed UTC offset, e.g. `"+0200"`.
    pub timezone: String,
}

/// Severity level for detected patterns and anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    /// Informational.
    Low,
    /// Worth investigating.
    Medium,
    /// Likely a process problem.
    High,
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySeverity::Low => write!(f, "low"),
            AnomalySeverity::Medium => write!(f, "medium"),
            AnomalySeverity::High => write!(f, "high"),
        }
    }
}

/// An anomaly or pattern detected in the commit stream.
///
/// # Examples
///
/// ```
/// use repopulse_core::{AnomalySeverity, DetectedPattern};
///
/// let pattern = DetectedPattern {
///     name: "large_commits".into(),
///     description: "Commits with >500 lines changed detected".into(),
///     severity: AnomalySeverity::Low,
///     affected_files: vec![],
///     evidence: "3 large commit(s), largest: 1200 lines".into(),
/// };
/// assert_eq!(pattern.severity, AnomalySeverity::Low);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPattern {
    /// Short pattern identifier, e.g. `"weekend_warrior"`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Severity level.
    pub severity: AnomalySeverity,
    /// Paths of affected files, if the pattern is file-scoped.
    pub affected_files: Vec<String>,
    /// Supporting evidence text.
    pub evidence: String,
}

/// A single point in a timeline series.
///
/// Series are always sorted ascending by date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// Timestamp of the point.
    pub date: DateTime<FixedOffset>,
    /// Series value at this point.
    pub value: i64,
    /// Series label, e.g. `"loc"` or a file extension.
    pub label: String,
}
