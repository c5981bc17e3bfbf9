//! Anomaly detection over the commit stream.
//!
//! A fixed, ordered chain of independent detectors, each a pure function
//! from the commit stream to at most one [`DetectedPattern`]. No detector
//! sees another's output and the chain order never changes, so
//! [`detect_all`] is fully deterministic.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use chrono::{Datelike, Timelike};
use regex::Regex;
use repopulse_core::{AnomalySeverity, CommitRecord, DetectedPattern, EnrichedCommit};

/// A single detector in the chain.
pub type Detector = fn(&[CommitRecord], &[EnrichedCommit]) -> Option<DetectedPattern>;

/// The full detector chain, in fixed order.
pub const DETECTORS: [Detector; 14] = [
    detect_wip_commits,
    detect_large_commits,
    detect_possible_rebase,
    detect_empty_commits,
    detect_unsquashed_fixups,
    detect_revert_chains,
    detect_weekend_warrior,
    detect_night_owl,
    detect_single_file_commits,
    detect_binary_files,
    detect_merge_heavy,
    detect_short_messages,
    detect_inconsistent_conventional,
    detect_hotspot_files,
];

/// File extensions treated as binary artifacts.
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "zip", "tar", "gz", "jar", "war", "png", "jpg", "jpeg",
    "gif", "bmp", "ico", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];

static WIP_RE: OnceLock<Regex> = OnceLock::new();

fn wip_re() -> &'static Regex {
    WIP_RE.get_or_init(|| Regex::new(r"(?i)^(?:wip|work.in.progress)\b").expect("valid regex"))
}

static CONVENTIONAL_RE: OnceLock<Regex> = OnceLock::new();

fn conventional_re() -> &'static Regex {
    CONVENTIONAL_RE
        .get_or_init(|| Regex::new(r"^(\w+)(?:\([^)]*\))?!?:\s").expect("valid regex"))
}

/// Run every detector and collect the results in chain order.
///
/// # Examples
///
/// ```
/// use repopulse_insight::patterns::detect_all;
///
/// assert!(detect_all(&[], &[]).is_empty());
/// ```
pub fn detect_all(commits: &[CommitRecord], enriched: &[EnrichedCommit]) -> Vec<DetectedPattern> {
    DETECTORS
        .iter()
        .filter_map(|detector| detector(commits, enriched))
        .collect()
}

fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// WIP commits in the stream (work on a protected branch left visible).
pub fn detect_wip_commits(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    let wip: Vec<&CommitRecord> = commits
        .iter()
        .filter(|c| wip_re().is_match(c.subject()))
        .collect();
    let first = wip.first()?;

    Some(DetectedPattern {
        name: "wip_in_main".into(),
        description: "WIP commits found on protected branch".into(),
        severity: AnomalySeverity::Medium,
        affected_files: vec![],
        evidence: format!("{} WIP commit(s): {}...", wip.len(), &first.sha[..first.sha.len().min(8)]),
    })
}

/// Commits with more than 500 lines of churn.
pub fn detect_large_commits(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    let large: Vec<&CommitRecord> = commits.iter().filter(|c| c.churn_score() > 500).collect();
    if large.is_empty() {
        return None;
    }
    let largest = large.iter().map(|c| c.churn_score()).max().unwrap_or(0);

    Some(DetectedPattern {
        name: "large_commits".into(),
        description: "Commits with >500 lines changed detected".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!("{} large commit(s), largest: {largest} lines", large.len()),
    })
}

/// Author/committer date gaps over a day, suggesting history rewrites.
pub fn detect_possible_rebase(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    let suspicious = commits
        .iter()
        .filter(|c| (c.authored_date - c.committed_date).num_seconds().abs() > 86_400)
        .count();
    if suspicious == 0 {
        return None;
    }

    Some(DetectedPattern {
        name: "possible_rebase".into(),
        description: "Commits with large author/committer date gaps (possible rebase)".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!("{suspicious} commit(s) with >1 day author/committer date gap"),
    })
}

/// Commits that change no files at all.
pub fn detect_empty_commits(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    let empty = commits.iter().filter(|c| c.files.is_empty()).count();
    if empty == 0 {
        return None;
    }

    Some(DetectedPattern {
        name: "empty_commits".into(),
        description: "Commits with no file changes".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!("{empty} empty commit(s)"),
    })
}

/// `fixup!`/`squash!` commits that were never autosquashed.
pub fn detect_unsquashed_fixups(
    _commits: &[CommitRecord],
    enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    let fixups = enriched.iter().filter(|ec| ec.is_fixup).count();
    if fixups == 0 {
        return None;
    }

    Some(DetectedPattern {
        name: "unsquashed_fixups".into(),
        description: "Fixup/squash commits that were not rebased".into(),
        severity: AnomalySeverity::Medium,
        affected_files: vec![],
        evidence: format!("{fixups} unsquashed fixup commit(s)"),
    })
}

/// Reverts of reverts: churn going back and forth.
pub fn detect_revert_chains(
    _commits: &[CommitRecord],
    enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    let reverts: Vec<&EnrichedCommit> = enriched.iter().filter(|ec| ec.is_revert).collect();
    if reverts.len() < 2 {
        return None;
    }

    let double_reverts = reverts
        .iter()
        .filter(|ec| ec.commit.message.to_lowercase().starts_with("revert \"revert"))
        .count();
    if double_reverts == 0 {
        return None;
    }

    Some(DetectedPattern {
        name: "revert_chains".into(),
        description: "Revert-of-revert commits detected".into(),
        severity: AnomalySeverity::High,
        affected_files: vec![],
        evidence: format!("{double_reverts} revert-of-revert commit(s)"),
    })
}

/// At least 30% of commits land on weekends.
pub fn detect_weekend_warrior(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    if commits.len() < 10 {
        return None;
    }

    let weekend = commits
        .iter()
        .filter(|c| c.authored_date.weekday().num_days_from_monday() >= 5)
        .count();
    let ratio = weekend as f64 / commits.len() as f64;
    if ratio < 0.3 {
        return None;
    }

    Some(DetectedPattern {
        name: "weekend_warrior".into(),
        description: "High proportion of weekend commits".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!(
            "{weekend}/{} commits ({}) on weekends",
            commits.len(),
            percent(ratio)
        ),
    })
}

/// At least 20% of commits land between midnight and 5am.
pub fn detect_night_owl(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    if commits.len() < 10 {
        return None;
    }

    let late_night = commits
        .iter()
        .filter(|c| c.authored_date.hour() < 5)
        .count();
    let ratio = late_night as f64 / commits.len() as f64;
    if ratio < 0.2 {
        return None;
    }

    Some(DetectedPattern {
        name: "night_owl".into(),
        description: "Significant late-night commit activity (midnight-5am)".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!(
            "{late_night}/{} commits ({}) late at night",
            commits.len(),
            percent(ratio)
        ),
    })
}

/// At least 70% of commits touch exactly one file.
pub fn detect_single_file_commits(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    if commits.len() < 10 {
        return None;
    }

    let single_file = commits.iter().filter(|c| c.files.len() == 1).count();
    let ratio = single_file as f64 / commits.len() as f64;
    if ratio < 0.7 {
        return None;
    }

    Some(DetectedPattern {
        name: "single_file_commits".into(),
        description: "Most commits touch only one file".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!(
            "{single_file}/{} commits ({}) touch one file",
            commits.len(),
            percent(ratio)
        ),
    })
}

/// Binary artifacts tracked in the repository.
pub fn detect_binary_files(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    let mut binary_files: BTreeSet<&str> = BTreeSet::new();
    for commit in commits {
        for change in &commit.files {
            let Some((_, extension)) = change.path.rsplit_once('.') else {
                continue;
            };
            if BINARY_EXTENSIONS.contains(&extension.to_lowercase().as_str()) {
                binary_files.insert(change.path.as_str());
            }
        }
    }
    if binary_files.is_empty() {
        return None;
    }

    Some(DetectedPattern {
        name: "binary_files".into(),
        description: "Binary files tracked in repository".into(),
        severity: AnomalySeverity::Medium,
        evidence: format!("{} binary file(s) committed", binary_files.len()),
        affected_files: binary_files.into_iter().map(str::to_string).collect(),
    })
}

/// At least 30% of enriched commits are merges.
pub fn detect_merge_heavy(
    _commits: &[CommitRecord],
    enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    if enriched.len() < 10 {
        return None;
    }

    let merges = enriched.iter().filter(|ec| ec.is_merge).count();
    let ratio = merges as f64 / enriched.len() as f64;
    if ratio < 0.3 {
        return None;
    }

    Some(DetectedPattern {
        name: "merge_heavy".into(),
        description: "High proportion of merge commits".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!(
            "{merges}/{} commits ({}) are merges",
            enriched.len(),
            percent(ratio)
        ),
    })
}

/// At least 20% of subjects are shorter than 10 characters.
pub fn detect_short_messages(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    if commits.len() < 5 {
        return None;
    }

    let short = commits
        .iter()
        .filter(|c| c.subject().trim().chars().count() < 10)
        .count();
    let ratio = short as f64 / commits.len() as f64;
    if ratio < 0.2 {
        return None;
    }

    Some(DetectedPattern {
        name: "short_messages".into(),
        description: "Many commits have very short messages (<10 chars)".into(),
        severity: AnomalySeverity::Medium,
        affected_files: vec![],
        evidence: format!(
            "{short}/{} commits ({}) have short subjects",
            commits.len(),
            percent(ratio)
        ),
    })
}

/// Conventional commits adopted only partially (20-80% of subjects).
pub fn detect_inconsistent_conventional(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    if commits.len() < 10 {
        return None;
    }

    let conventional = commits
        .iter()
        .filter(|c| conventional_re().is_match(c.subject()))
        .count();
    let ratio = conventional as f64 / commits.len() as f64;
    if !(0.2..=0.8).contains(&ratio) {
        return None;
    }

    Some(DetectedPattern {
        name: "inconsistent_conventional".into(),
        description: "Conventional commit format used inconsistently".into(),
        severity: AnomalySeverity::Low,
        affected_files: vec![],
        evidence: format!(
            "{conventional}/{} commits ({}) use conventional format",
            commits.len(),
            percent(ratio)
        ),
    })
}

/// Files changed in more than 30% of commits (top 5 reported).
pub fn detect_hotspot_files(
    commits: &[CommitRecord],
    _enriched: &[EnrichedCommit],
) -> Option<DetectedPattern> {
    if commits.len() < 10 {
        return None;
    }

    let mut file_counts: HashMap<&str, usize> = HashMap::new();
    for commit in commits {
        for change in &commit.files {
            *file_counts.entry(change.path.as_str()).or_default() += 1;
        }
    }

    let threshold = commits.len() as f64 * 0.3;
    let mut hotspots: Vec<(&str, usize)> = file_counts
        .into_iter()
        .filter(|(_, count)| *count as f64 > threshold)
        .collect();
    if hotspots.is_empty() {
        return None;
    }

    hotspots.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    hotspots.truncate(5);

    Some(DetectedPattern {
        name: "hotspot_files".into(),
        description: "Files changed in >30% of commits".into(),
        severity: AnomalySeverity::Low,
        evidence: hotspots
            .iter()
            .map(|(path, count)| format!("{path} ({count}x)"))
            .collect::<Vec<_>>()
            .join("; "),
        affected_files: hotspots.iter().map(|(path, _)| (*path).to_string()).collect(),
    })
}
