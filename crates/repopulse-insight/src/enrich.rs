//! Commit enrichment: classification flags, size categories, streaks,
//! and churn percentiles.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use repopulse_core::{CommitRecord, CommitSizeCategory, EnrichedCommit};

static CONVENTIONAL_RE: OnceLock<Regex> = OnceLock::new();
static FIXUP_RE: OnceLock<Regex> = OnceLock::new();
static REVERT_RE: OnceLock<Regex> = OnceLock::new();

/// Conventional commit prefix: `type(scope): message` or `type: message`.
fn conventional_re() -> &'static Regex {
    CONVENTIONAL_RE
        .get_or_init(|| Regex::new(r"^(\w+)(?:\([^)]*\))?!?:\s").expect("valid regex"))
}

fn fixup_re() -> &'static Regex {
    FIXUP_RE.get_or_init(|| Regex::new(r"^(?:fixup|squash)!\s").expect("valid regex"))
}

fn revert_re() -> &'static Regex {
    REVERT_RE.get_or_init(|| Regex::new(r#"(?i)^Revert\s+"?"#).expect("valid regex"))
}

/// Enrich commit records with classification metadata, 1:1.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use repopulse_core::{CommitRecord, CommitSizeCategory};
/// use repopulse_insight::enrich::enrich;
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
///     message: "feat(auth): add login".into(),
///     files: vec![],
///     insertions: 30,
///     deletions: 10,
/// };
/// let enriched = enrich(&[commit]);
/// assert_eq!(enriched[0].conventional_type.as_deref(), Some("feat"));
/// assert_eq!(enriched[0].size_category, CommitSizeCategory::Small);
/// ```
pub fn enrich(commits: &[CommitRecord]) -> Vec<EnrichedCommit> {
    commits.iter().map(enrich_single).collect()
}

fn enrich_single(commit: &CommitRecord) -> EnrichedCommit {
    let subject = commit.subject();

    EnrichedCommit {
        is_merge: subject.to_lowercase().starts_with("merge "),
        is_fixup: fixup_re().is_match(subject),
        is_revert: revert_re().is_match(subject),
        size_category: classify_size(commit),
        conventional_type: conventional_type(subject),
        commit: commit.clone(),
    }
}

/// Classify a commit by churn into a t-shirt size.
fn classify_size(commit: &CommitRecord) -> CommitSizeCategory {
    match commit.churn_score() {
        0..=50 => CommitSizeCategory::Small,
        51..=200 => CommitSizeCategory::Medium,
        201..=500 => CommitSizeCategory::Large,
        _ => CommitSizeCategory::Enormous,
    }
}

/// Extract the conventional-commit type prefix, if any.
fn conventional_type(subject: &str) -> Option<String> {
    conventional_re()
        .captures(subject)
        .map(|caps| caps[1].to_string())
}

/// Longest run of consecutive calendar days with commits, per author.
///
/// Dates are the author-local calendar dates of the commits; an author
/// with any commits has a streak of at least 1.
///
/// # Examples
///
/// ```no_run
/// use repopulse_insight::enrich::{compute_streaks, enrich};
///
/// let enriched = enrich(&[]);
/// let streaks = compute_streaks(&enriched);
/// assert!(streaks.is_empty());
/// ```
pub fn compute_streaks(enriched: &[EnrichedCommit]) -> HashMap<String, u32> {
    let mut by_author: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
    for ec in enriched {
        by_author
            .entry(ec.commit.author_email.as_str())
            .or_default()
            .push(ec.commit.authored_date.date_naive());
    }

    let mut streaks = HashMap::new();
    for (email, mut dates) in by_author {
        dates.sort();
        dates.dedup();

        let mut max_streak = 1u32;
        let mut current_streak = 1u32;
        for window in dates.windows(2) {
            if (window[1] - window[0]).num_days() == 1 {
                current_streak += 1;
                max_streak = max_streak.max(current_streak);
            } else {
                current_streak = 1;
            }
        }
        let streak = if dates.is_empty() { 0 } else { max_streak };
        streaks.insert(email.to_string(), streak);
    }
    streaks
}

/// Rank commits by churn ascending and return each SHA's percentile.
///
/// The smallest commit maps to 0.0; percentiles approach 1.0 for the
/// largest. An empty input yields an empty map.
pub fn churn_percentiles(enriched: &[EnrichedCommit]) -> HashMap<String, f64> {
    if enriched.is_empty() {
        return HashMap::new();
    }

    let mut sorted: Vec<&EnrichedCommit> = enriched.iter().collect();
    sorted.sort_by_key(|ec| ec.commit.churn_score());

    let n = sorted.len() as f64;
    sorted
        .iter()
        .enumerate()
        .map(|(i, ec)| (ec.commit.sha.clone(), i as f64 / n))
        .collect()
}
