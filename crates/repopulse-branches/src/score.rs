//! Branch activity classification and deletability scoring.
//!
//! Pure functions, no I/O: given merge status, age, and divergence they
//! produce a 0-100 deletability score and a recommendation category.
//! Higher scores indicate stronger deletion candidates.

use chrono::{DateTime, FixedOffset};
use glob::Pattern;
use repopulse_core::{BranchStatus, DeletabilityCategory, MergeStatus};
use tracing::debug;

/// Classify a branch's activity status from the age of its last commit.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use repopulse_branches::score::classify_status;
/// use repopulse_core::BranchStatus;
///
/// let last = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
/// let now = DateTime::parse_from_rfc3339("2024-03-01T00:00:00+00:00").unwrap();
/// assert_eq!(classify_status(last, now, 30, 90), BranchStatus::Stale);
/// ```
pub fn classify_status(
    last_commit_date: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
    stale_days: i64,
    abandoned_days: i64,
) -> BranchStatus {
    let age_days = (now - last_commit_date).num_days();
    if age_days >= abandoned_days {
        BranchStatus::Abandoned
    } else if age_days >= stale_days {
        BranchStatus::Stale
    } else {
        BranchStatus::Active
    }
}

/// Compute a deletability score from 0.0 (keep) to 100.0 (safe to delete).
///
/// Protected branches score 0 unconditionally. Otherwise: merged status
/// contributes 50 points, age up to 30 (linear over 90 days), abandoned
/// status 15 (stale 10), and having no unique commits 5.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use repopulse_branches::score::score;
/// use repopulse_core::{BranchStatus, MergeStatus};
///
/// let last = DateTime::parse_from_rfc3339("2023-01-01T00:00:00+00:00").unwrap();
/// let now = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
/// let merged = MergeStatus {
///     merged_into_default: true,
///     ..MergeStatus::default()
/// };
/// let value = score(&merged, BranchStatus::Abandoned, last, now, 0, false);
/// assert_eq!(value, 100.0);
/// ```
pub fn score(
    merge_status: &MergeStatus,
    status: BranchStatus,
    last_commit_date: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
    commits_ahead: u32,
    is_protected: bool,
) -> f64 {
    if is_protected {
        return 0.0;
    }

    let mut score = 0.0;

    // Merge status is the strongest signal.
    if merge_status.is_merged() {
        score += 50.0;
    }

    // Age contributes up to 30 points, saturating at 90 days.
    let age_days = (now - last_commit_date).num_days() as f64;
    score += (age_days / 90.0).min(1.0) * 30.0;

    match status {
        BranchStatus::Abandoned => score += 15.0,
        BranchStatus::Stale => score += 10.0,
        BranchStatus::Active => {}
    }

    // No unique commits means nothing to lose.
    if commits_ahead == 0 {
        score += 5.0;
    }

    score.min(100.0)
}

/// Map a score to a recommendation category.
///
/// Protected branches are always `Keep`; otherwise `Safe` at 70+,
/// `Caution` at 40+, `Keep` below.
pub fn categorise(score: f64, is_protected: bool) -> DeletabilityCategory {
    if is_protected {
        return DeletabilityCategory::Keep;
    }
    if score >= 70.0 {
        DeletabilityCategory::Safe
    } else if score >= 40.0 {
        DeletabilityCategory::Caution
    } else {
        DeletabilityCategory::Keep
    }
}

/// Whether a branch name matches any protected glob pattern.
///
/// Invalid patterns are skipped rather than treated as matches.
///
/// # Examples
///
/// ```
/// use repopulse_branches::score::is_protected;
///
/// let patterns = vec!["main".to_string(), "release/*".to_string()];
/// assert!(is_protected("release/2.1", &patterns));
/// assert!(!is_protected("feature/login", &patterns));
/// ```
pub fn is_protected(branch_name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|raw| match Pattern::new(raw) {
        Ok(pattern) => pattern.matches(branch_name),
        Err(err) => {
            debug!("invalid protected pattern {raw:?}: {err}");
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn merged() -> MergeStatus {
        MergeStatus {
            merged_into_default: true,
            ..MergeStatus::default()
        }
    }

    #[test]
    fn status_thresholds() {
        let now = date("2024-06-15T00:00:00+00:00");
        assert_eq!(
            classify_status(date("2024-06-10T00:00:00+00:00"), now, 30, 90),
            BranchStatus::Active
        );
        assert_eq!(
            classify_status(date("2024-05-01T00:00:00+00:00"), now, 30, 90),
            BranchStatus::Stale
        );
        assert_eq!(
            classify_status(date("2024-01-01T00:00:00+00:00"), now, 30, 90),
            BranchStatus::Abandoned
        );
    }

    #[test]
    fn status_boundary_is_inclusive() {
        let now = date("2024-06-15T00:00:00+00:00");
        // Exactly 30 days is stale, exactly 90 days is abandoned.
        assert_eq!(
            classify_status(date("2024-05-16T00:00:00+00:00"), now, 30, 90),
            BranchStatus::Stale
        );
        assert_eq!(
            classify_status(date("2024-03-17T00:00:00+00:00"), now, 30, 90),
            BranchStatus::Abandoned
        );
    }

    #[test]
    fn protected_branch_scores_zero() {
        let now = date("2024-06-15T00:00:00+00:00");
        let last = date("2020-01-01T00:00:00+00:00");
        let value = score(&merged(), BranchStatus::Abandoned, last, now, 0, true);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn merged_old_abandoned_branch_maxes_out() {
        let now = date("2024-06-15T00:00:00+00:00");
        let last = date("2023-06-15T00:00:00+00:00");
        // 50 merged + 30 age + 15 abandoned + 5 nothing ahead = 100.
        let value = score(&merged(), BranchStatus::Abandoned, last, now, 0, false);
        assert_eq!(value, 100.0);
    }

    #[test]
    fn fresh_active_branch_scores_only_ahead_bonus() {
        let now = date("2024-06-15T00:00:00+00:00");
        let value = score(&MergeStatus::default(), BranchStatus::Active, now, now, 0, false);
        assert_eq!(value, 5.0);
    }

    #[test]
    fn age_scales_linearly_to_ninety_days() {
        let now = date("2024-06-15T00:00:00+00:00");
        let last_45 = date("2024-05-01T00:00:00+00:00");
        let value = score(&MergeStatus::default(), BranchStatus::Active, last_45, now, 3, false);
        assert!((value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn score_is_monotonic_in_age() {
        let now = date("2024-06-15T00:00:00+00:00");
        let mut previous = -1.0;
        for days in [0i64, 10, 30, 60, 90, 180, 400] {
            let last = now - chrono::Duration::days(days);
            let value = score(&MergeStatus::default(), BranchStatus::Active, last, now, 1, false);
            assert!(value >= previous, "score decreased at {days} days");
            assert!((0.0..=100.0).contains(&value));
            previous = value;
        }
    }

    #[test]
    fn categorise_thresholds() {
        assert_eq!(categorise(85.0, false), DeletabilityCategory::Safe);
        assert_eq!(categorise(70.0, false), DeletabilityCategory::Safe);
        assert_eq!(categorise(55.0, false), DeletabilityCategory::Caution);
        assert_eq!(categorise(40.0, false), DeletabilityCategory::Caution);
        assert_eq!(categorise(39.9, false), DeletabilityCategory::Keep);
        assert_eq!(categorise(99.0, true), DeletabilityCategory::Keep);
    }

    #[test]
    fn protected_patterns_glob_match() {
        let patterns = vec![
            "main".to_string(),
            "master".to_string(),
            "release/*".to_string(),
        ];
        assert!(is_protected("main", &patterns));
        assert!(is_protected("release/2024.06", &patterns));
        assert!(!is_protected("feature/release-notes", &patterns));
        assert!(!is_protected("maintenance", &patterns));
    }

    #[test]
    fn empty_patterns_protect_nothing() {
        assert!(!is_protected("main", &[]));
    }
}
