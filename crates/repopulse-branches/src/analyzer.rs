//! Branch analysis orchestration.
//!
//! Lists local branches, then composes merge detection, ahead/behind
//! counts, activity classification, and deletability scoring into one
//! [`BranchesReport`]. Branches are analysed independently on a worker
//! pool and re-sorted by name, so the report never depends on completion
//! timing.

use chrono::{DateTime, FixedOffset, Utc};
use rayon::prelude::*;
use repopulse_core::{
    unix_epoch, BranchConfig, BranchReport, BranchStatus, BranchesReport, DeletabilityCategory,
};
use repopulse_git::invoker::{GitInvoker, SHORT_TIMEOUT};
use repopulse_git::remote::RemoteSync;
use tracing::{debug, warn};

use crate::merge::MergeDetector;
use crate::score;

/// Orchestrates all branch analysis modules.
///
/// # Examples
///
/// ```no_run
/// use repopulse_branches::analyzer::BranchAnalyzer;
/// use repopulse_core::BranchConfig;
///
/// let analyzer = BranchAnalyzer::new(".", BranchConfig::default());
/// let report = analyzer.analyse();
/// println!("{} branches, {} deletable", report.total_branches, report.deletable_count);
/// ```
#[derive(Debug, Clone)]
pub struct BranchAnalyzer {
    invoker: GitInvoker,
    config: BranchConfig,
    merge_detector: MergeDetector,
    remote_sync: RemoteSync,
}

impl BranchAnalyzer {
    /// Create a branch analyzer rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>, config: BranchConfig) -> Self {
        let repo_path = repo_path.into();
        Self {
            invoker: GitInvoker::new(repo_path.clone()),
            merge_detector: MergeDetector::new(repo_path.clone()),
            remote_sync: RemoteSync::new(repo_path),
            config,
        }
    }

    /// Analyse all non-default branches in the repository.
    ///
    /// A repository with no branches beyond the default yields an empty
    /// report rather than an error.
    pub fn analyse(&self) -> BranchesReport {
        let default_branch = self.config.default_target.clone();
        let target_branch = self.config.default_target.clone();
        let now = Utc::now().fixed_offset();

        let branches_raw: Vec<(String, bool, String)> = self
            .list_branches()
            .into_iter()
            .filter(|(name, _, _)| name != &default_branch)
            .collect();

        let mut reports: Vec<BranchReport> = branches_raw
            .par_iter()
            .map(|(name, is_remote, sha)| {
                self.analyse_branch(name, *is_remote, sha, &default_branch, &target_branch, now)
            })
            .collect();
        reports.sort_by(|a, b| a.name.cmp(&b.name));

        let stale_count = reports
            .iter()
            .filter(|r| r.status == BranchStatus::Stale)
            .count();
        let abandoned_count = reports
            .iter()
            .filter(|r| r.status == BranchStatus::Abandoned)
            .count();
        let deletable_count = reports
            .iter()
            .filter(|r| r.deletability_category == DeletabilityCategory::Safe)
            .count();

        BranchesReport {
            total_branches: reports.len(),
            branches: reports,
            default_branch,
            target_branch,
            stale_count,
            abandoned_count,
            deletable_count,
        }
    }

    fn analyse_branch(
        &self,
        name: &str,
        is_remote: bool,
        sha: &str,
        default_branch: &str,
        target_branch: &str,
        now: DateTime<FixedOffset>,
    ) -> BranchReport {
        let (author_name, author_email, last_commit_date) = self.commit_info(sha);

        let merge_status = self.merge_detector.detect(name, default_branch, target_branch);
        let (ahead, behind) = self.remote_sync.ahead_behind(name, target_branch);

        let status = score::classify_status(
            last_commit_date,
            now,
            self.config.stale_days,
            self.config.abandoned_days,
        );

        let is_protected = score::is_protected(name, &self.config.protected_patterns);
        let value = score::score(&merge_status, status, last_commit_date, now, ahead, is_protected);
        let category = score::categorise(value, is_protected);

        BranchReport {
            name: name.to_string(),
            is_remote,
            last_commit_date,
            last_commit_sha: sha.to_string(),
            commits_ahead: ahead,
            commits_behind: behind,
            author_name,
            author_email,
            status,
            merge_status,
            deletability_score: (value * 10.0).round() / 10.0,
            deletability_category: category,
        }
    }

    /// List local branches as `(name, is_remote, short_sha)` tuples.
    fn list_branches(&self) -> Vec<(String, bool, String)> {
        let raw = match self.invoker.run(
            &[
                "for-each-ref",
                "--format=%(refname:short) %(objectname:short)",
                "refs/heads/",
            ],
            SHORT_TIMEOUT,
        ) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("could not list local branches: {err}");
                return Vec::new();
            }
        };

        raw.lines()
            .filter_map(|line| {
                let line = line.trim();
                let (name, sha) = line.split_once(' ')?;
                Some((name.to_string(), false, sha.trim().to_string()))
            })
            .collect()
    }

    /// Author name, email, and authored date for a commit.
    ///
    /// Falls back to `"Unknown"`/epoch when the lookup fails.
    fn commit_info(&self, sha: &str) -> (String, String, DateTime<FixedOffset>) {
        match self
            .invoker
            .run(&["log", "-1", "--format=%an%x00%ae%x00%aI", sha], SHORT_TIMEOUT)
        {
            Ok(raw) => {
                let trimmed = raw.trim();
                let parts: Vec<&str> = trimmed.split('\0').collect();
                if parts.len() >= 3 {
                    if let Ok(date) = DateTime::parse_from_rfc3339(parts[2].trim()) {
                        return (parts[0].to_string(), parts[1].to_string(), date);
                    }
                }
                debug!("unexpected commit info for {sha}: {trimmed:?}");
            }
            Err(err) => {
                debug!("could not get commit info for {sha}: {err}");
            }
        }
        ("Unknown".to_string(), "unknown@unknown".to_string(), unix_epoch())
    }
}
