//! Timeline series: LOC evolution, per-language breakdown, team growth.
//!
//! Commits are sorted by authored date once per call; every returned
//! series is ascending in date.

use std::collections::{HashMap, HashSet};

use repopulse_core::{CommitRecord, TimelinePoint};

/// Cumulative net-line-count timeline.
///
/// Each point is the running sum of `net_lines` at a commit date.
///
/// # Examples
///
/// ```
/// use repopulse_insight::timeline::loc_timeline;
///
/// assert!(loc_timeline(&[]).is_empty());
/// ```
pub fn loc_timeline(commits: &[CommitRecord]) -> Vec<TimelinePoint> {
    let sorted = sorted_by_date(commits);

    let mut cumulative = 0i64;
    sorted
        .into_iter()
        .map(|commit| {
            cumulative += commit.net_lines();
            TimelinePoint {
                date: commit.authored_date,
                value: cumulative,
                label: "loc".into(),
            }
        })
        .collect()
}

/// Per-language cumulative line timelines, keyed by file extension.
///
/// Each commit contributes one point per extension it touches, carrying
/// that extension's running `insertions - deletions` total.
pub fn language_timeline(commits: &[CommitRecord]) -> HashMap<String, Vec<TimelinePoint>> {
    let sorted = sorted_by_date(commits);

    let mut cumulative: HashMap<String, i64> = HashMap::new();
    let mut series: HashMap<String, Vec<TimelinePoint>> = HashMap::new();

    for commit in sorted {
        let mut deltas: HashMap<&str, i64> = HashMap::new();
        for change in &commit.files {
            let Some(extension) = file_extension(&change.path) else {
                continue;
            };
            *deltas.entry(extension).or_default() +=
                change.insertions as i64 - change.deletions as i64;
        }

        // Sorted so point order within a commit is stable.
        let mut touched: Vec<(&str, i64)> = deltas.into_iter().collect();
        touched.sort_by(|a, b| a.0.cmp(b.0));

        for (extension, delta) in touched {
            let total = cumulative.entry(extension.to_string()).or_default();
            *total += delta;
            series
                .entry(extension.to_string())
                .or_default()
                .push(TimelinePoint {
                    date: commit.authored_date,
                    value: *total,
                    label: extension.to_string(),
                });
        }
    }

    series
}

/// Team growth: running count of distinct author emails.
///
/// One point per commit; values are non-decreasing and the series length
/// equals the input commit count.
pub fn team_growth(commits: &[CommitRecord]) -> Vec<TimelinePoint> {
    let sorted = sorted_by_date(commits);

    let mut seen: HashSet<&str> = HashSet::new();
    sorted
        .into_iter()
        .map(|commit| {
            seen.insert(commit.author_email.as_str());
            TimelinePoint {
                date: commit.authored_date,
                value: seen.len() as i64,
                label: "contributors".into(),
            }
        })
        .collect()
}

fn sorted_by_date(commits: &[CommitRecord]) -> Vec<&CommitRecord> {
    let mut sorted: Vec<&CommitRecord> = commits.iter().collect();
    sorted.sort_by_key(|c| c.authored_date);
    sorted
}

/// File extension as a language proxy, lowercased, without the dot.
fn file_extension(path: &str) -> Option<&str> {
    let (_, extension) = path.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension)
    }
}
