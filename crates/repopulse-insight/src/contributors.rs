//! Contributor profiles with alias merging and temporal work patterns.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Timelike};
use repopulse_core::{CommitRecord, ContributorProfile, WorkPattern};

/// Build contributor profiles from commit records.
///
/// When no explicit `alias_map` (email → canonical email) is supplied,
/// aliases are auto-detected by display name — see [`detect_aliases`].
/// Profiles are sorted by commit count descending.
pub fn analyse(
    commits: &[CommitRecord],
    alias_map: Option<&HashMap<String, String>>,
) -> Vec<ContributorProfile> {
    if commits.is_empty() {
        return Vec::new();
    }

    let detected;
    let resolved_map = match alias_map {
        Some(map) => map,
        None => {
            detected = detect_aliases(commits);
            &detected
        }
    };

    let mut grouped: HashMap<&str, Vec<&CommitRecord>> = HashMap::new();
    for commit in commits {
        let canonical = resolved_map
            .get(&commit.author_email)
            .map(String::as_str)
            .unwrap_or(commit.author_email.as_str());
        grouped.entry(canonical).or_default().push(commit);
    }

    let mut profiles: Vec<ContributorProfile> = grouped
        .into_iter()
        .map(|(canonical, commits)| build_profile(canonical, &commits, resolved_map))
        .collect();

    profiles.sort_by(|a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then_with(|| a.email.cmp(&b.email))
    });
    profiles
}

/// Detect aliases by matching author display names across emails.
///
/// Authors with the same (case-insensitive) display name but different
/// emails are considered one person; the email with the most commits
/// becomes canonical, ties breaking on the lexicographically smallest
/// email. This is a heuristic: two unrelated people sharing a display
/// name will be merged.
///
/// # Examples
///
/// ```no_run
/// use repopulse_insight::contributors::detect_aliases;
///
/// let aliases = detect_aliases(&[]);
/// assert!(aliases.is_empty());
/// ```
pub fn detect_aliases(commits: &[CommitRecord]) -> HashMap<String, String> {
    let mut name_to_emails: HashMap<String, HashMap<&str, usize>> = HashMap::new();
    for commit in commits {
        *name_to_emails
            .entry(commit.author_name.to_lowercase())
            .or_default()
            .entry(commit.author_email.as_str())
            .or_default() += 1;
    }

    let mut alias_map = HashMap::new();
    for email_counts in name_to_emails.values() {
        if email_counts.len() <= 1 {
            continue;
        }
        let canonical = email_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(email, _)| *email)
            .unwrap_or_default();
        for email in email_counts.keys() {
            alias_map.insert((*email).to_string(), canonical.to_string());
        }
    }
    alias_map
}

fn build_profile(
    canonical_email: &str,
    commits: &[&CommitRecord],
    alias_map: &HashMap<String, String>,
) -> ContributorProfile {
    let mut aliases: Vec<String> = alias_map
        .iter()
        .filter(|(email, canon)| canon.as_str() == canonical_email && email.as_str() != canonical_email)
        .map(|(email, _)| email.clone())
        .collect();
    aliases.sort();

    // The display name from the most recent commit wins.
    let name = commits
        .iter()
        .max_by_key(|c| c.authored_date)
        .map(|c| c.author_name.clone())
        .unwrap_or_default();

    let first_commit_date = commits.iter().map(|c| c.authored_date).min().unwrap_or_else(repopulse_core::unix_epoch);
    let last_commit_date = commits.iter().map(|c| c.authored_date).max().unwrap_or_else(repopulse_core::unix_epoch);

    let mut files: HashSet<&str> = HashSet::new();
    for commit in commits {
        for change in &commit.files {
            files.insert(change.path.as_str());
        }
    }

    let active_days: HashSet<_> = commits.iter().map(|c| c.authored_date.date_naive()).collect();

    ContributorProfile {
        name,
        email: canonical_email.to_string(),
        aliases,
        commit_count: commits.len(),
        first_commit_date,
        last_commit_date,
        insertions: commits.iter().map(|c| c.insertions).sum(),
        deletions: commits.iter().map(|c| c.deletions).sum(),
        files_touched: files.len(),
        active_days: active_days.len(),
    }
}

/// Compute temporal work patterns per author email (unaliased).
///
/// Hours and weekdays are taken in the author's local time; the recorded
/// timezone is the most frequently observed UTC offset, ties breaking on
/// the lexicographically smallest offset string. Patterns are sorted by
/// email.
pub fn work_patterns(commits: &[CommitRecord]) -> Vec<WorkPattern> {
    if commits.is_empty() {
        return Vec::new();
    }

    let mut by_email: HashMap<&str, Vec<&CommitRecord>> = HashMap::new();
    for commit in commits {
        by_email
            .entry(commit.author_email.as_str())
            .or_default()
            .push(commit);
    }

    let mut patterns: Vec<WorkPattern> = by_email
        .into_iter()
        .map(|(email, commits)| {
            let mut hours = [0u32; 24];
            let mut weekdays = [0u32; 7];
            let mut tz_counts: HashMap<String, usize> = HashMap::new();

            for commit in commits {
                hours[commit.authored_date.hour() as usize] += 1;
                let weekday = commit.authored_date.weekday().num_days_from_monday() as usize;
                weekdays[weekday] += 1;
                let tz = commit.authored_date.format("%z").to_string();
                *tz_counts.entry(tz).or_default() += 1;
            }

            let timezone = tz_counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(tz, _)| tz)
                .unwrap_or_else(|| "+0000".to_string());

            WorkPattern {
                author_email: email.to_string(),
                hour_distribution: hours,
                weekday_distribution: weekdays,
                timezone,
            }
        })
        .collect();

    patterns.sort_by(|a, b| a.author_email.cmp(&b.author_email));
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use repopulse_core::{ChangeType, FileChange};

    fn commit(name: &str, email: &str, date: &str, files: &[&str]) -> CommitRecord {
        let date = DateTime::parse_from_rfc3339(date).unwrap();
        CommitRecord {
            sha: format!("{name}-{}", date.timestamp()),
            author_name: name.to_string(),
            author_email: email.to_string(),
            authored_date: date,
            committer_name: name.to_string(),
            committer_email: email.to_string(),
            committed_date: date,
            message: "change".into(),
            files: files
                .iter()
                .map(|path| FileChange {
                    path: (*path).to_string(),
                    change_type: ChangeType::Modified,
                    insertions: 5,
                    deletions: 2,
                    old_path: None,
                })
                .collect(),
            insertions: 5,
            deletions: 2,
        }
    }

    #[test]
    fn profiles_sorted_by_commit_count() {
        let commits = vec![
            commit("Alice", "alice@example.com", "2024-06-01T10:00:00+00:00", &["a.rs"]),
            commit("Alice", "alice@example.com", "2024-06-02T10:00:00+00:00", &["b.rs"]),
            commit("Bob", "bob@example.com", "2024-06-03T10:00:00+00:00", &["c.rs"]),
        ];
        let profiles = analyse(&commits, None);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].email, "alice@example.com");
        assert_eq!(profiles[0].commit_count, 2);
        assert_eq!(profiles[1].commit_count, 1);
    }

    #[test]
    fn same_name_different_emails_are_merged() {
        let commits = vec![
            commit("Alice", "alice@work.com", "2024-06-01T10:00:00+00:00", &["a.rs"]),
            commit("Alice", "alice@work.com", "2024-06-02T10:00:00+00:00", &["b.rs"]),
            commit("alice", "alice@home.net", "2024-06-03T10:00:00+00:00", &["c.rs"]),
        ];
        let profiles = analyse(&commits, None);
        assert_eq!(profiles.len(), 1);
        // The email with the most commits wins.
        assert_eq!(profiles[0].email, "alice@work.com");
        assert_eq!(profiles[0].aliases, vec!["alice@home.net".to_string()]);
        assert_eq!(profiles[0].commit_count, 3);
    }

    #[test]
    fn explicit_alias_map_overrides_detection() {
        let commits = vec![
            commit("Alice", "alice@work.com", "2024-06-01T10:00:00+00:00", &["a.rs"]),
            commit("Totally Different", "alice@home.net", "2024-06-02T10:00:00+00:00", &["b.rs"]),
        ];
        let mut alias_map = HashMap::new();
        alias_map.insert("alice@home.net".to_string(), "alice@work.com".to_string());
        let profiles = analyse(&commits, Some(&alias_map));
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].commit_count, 2);
    }

    #[test]
    fn profile_aggregates_stats() {
        let commits = vec![
            commit("Alice", "alice@example.com", "2024-06-01T10:00:00+00:00", &["a.rs", "b.rs"]),
            commit("Alice", "alice@example.com", "2024-06-01T20:00:00+00:00", &["a.rs"]),
            commit("Alice", "alice@example.com", "2024-06-05T10:00:00+00:00", &["c.rs"]),
        ];
        let profiles = analyse(&commits, None);
        let profile = &profiles[0];
        assert_eq!(profile.insertions, 15);
        assert_eq!(profile.deletions, 6);
        assert_eq!(profile.files_touched, 3);
        assert_eq!(profile.active_days, 2);
        assert_eq!(
            profile.first_commit_date,
            DateTime::parse_from_rfc3339("2024-06-01T10:00:00+00:00").unwrap()
        );
        assert_eq!(
            profile.last_commit_date,
            DateTime::parse_from_rfc3339("2024-06-05T10:00:00+00:00").unwrap()
        );
    }

    #[test]
    fn most_recent_name_wins() {
        let commits = vec![
            commit("Alice Old", "alice@example.com", "2023-01-01T10:00:00+00:00", &["a.rs"]),
            commit("Alice New", "alice@example.com", "2024-06-01T10:00:00+00:00", &["b.rs"]),
        ];
        let profiles = analyse(&commits, None);
        assert_eq!(profiles[0].name, "Alice New");
    }

    #[test]
    fn empty_commits_yield_no_profiles() {
        assert!(analyse(&[], None).is_empty());
        assert!(work_patterns(&[]).is_empty());
    }

    #[test]
    fn work_pattern_buckets_hours_and_weekdays() {
        let commits = vec![
            // 2024-06-10 is a Monday.
            commit("Alice", "alice@example.com", "2024-06-10T09:00:00+00:00", &["a.rs"]),
            commit("Alice", "alice@example.com", "2024-06-10T22:00:00+00:00", &["b.rs"]),
            // 2024-06-15 is a Saturday.
            commit("Alice", "alice@example.com", "2024-06-15T09:00:00+00:00", &["c.rs"]),
        ];
        let patterns = work_patterns(&commits);
        assert_eq!(patterns.len(), 1);
        let pattern = &patterns[0];
        assert_eq!(pattern.hour_distribution[9], 2);
        assert_eq!(pattern.hour_distribution[22], 1);
        assert_eq!(pattern.weekday_distribution[0], 2);
        assert_eq!(pattern.weekday_distribution[5], 1);
    }

    #[test]
    fn work_pattern_records_dominant_offset() {
        let commits = vec![
            commit("Alice", "alice@example.com", "2024-06-10T09:00:00+02:00", &["a.rs"]),
            commit("Alice", "alice@example.com", "2024-06-11T09:00:00+02:00", &["b.rs"]),
            commit("Alice", "alice@example.com", "2024-06-12T09:00:00+00:00", &["c.rs"]),
        ];
        let patterns = work_patterns(&commits);
        assert_eq!(patterns[0].timezone, "+0200");
    }

    #[test]
    fn local_hour_respects_offset() {
        let commits = vec![commit(
            "Alice",
            "alice@example.com",
            "2024-06-10T23:30:00+05:30",
            &["a.rs"],
        )];
        let patterns = work_patterns(&commits);
        assert_eq!(patterns[0].hour_distribution[23], 1);
    }
}
