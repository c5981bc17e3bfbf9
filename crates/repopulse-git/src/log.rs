//! Commit harvesting from `git log`.
//!
//! Uses a record-separator-prefixed, null-byte-delimited `--format`
//! combined with `--numstat` so one subprocess call yields full commit
//! metadata plus per-file change statistics. Parsing never aborts the
//! whole harvest: malformed chunks are skipped and unparseable dates
//! degrade to the Unix epoch.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use repopulse_core::{unix_epoch, ChangeType, CommitRecord, FileChange};
use tracing::warn;

use crate::invoker::{GitInvoker, LONG_TIMEOUT, SHORT_TIMEOUT};

/// Record separator emitted before each commit's field tuple.
const RECORD_SEP: char = '\u{0001}';

/// Field separator within a commit's field tuple (expanded by git from
/// `%x00`).
const FIELD_SEP: char = '\0';

/// Fields: sha, author name/email/date, committer name/email/date,
/// parent hashes, subject, body.
const LOG_FORMAT: &str = "%H%x00%an%x00%ae%x00%aI%x00%cn%x00%ce%x00%cI%x00%P%x00%s%x00%b";

static NUMSTAT_RE: OnceLock<Regex> = OnceLock::new();
static RENAME_RE: OnceLock<Regex> = OnceLock::new();

/// `--numstat` line: `added<TAB>deleted<TAB>path`, `-` for binary files.
fn numstat_re() -> &'static Regex {
    NUMSTAT_RE.get_or_init(|| Regex::new(r"^(\d+|-)\t(\d+|-)\t(.+)$").expect("valid regex"))
}

/// Rename path: `prefix{old => new}suffix`.
fn rename_re() -> &'static Regex {
    RENAME_RE.get_or_init(|| Regex::new(r"^(.*)\{(.+) => (.+)\}(.*)$").expect("valid regex"))
}

/// Harvests structured commit records from a git repository.
///
/// # Examples
///
/// ```no_run
/// use repopulse_git::log::LogHarvester;
///
/// let harvester = LogHarvester::new(".");
/// let commits = harvester.harvest(100, None);
/// for c in &commits {
///     println!("{} {}", &c.sha[..7], c.subject());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LogHarvester {
    invoker: GitInvoker,
}

impl LogHarvester {
    /// Create a harvester rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            invoker: GitInvoker::new(repo_path),
        }
    }

    /// Harvest commit records in reverse chronological order.
    ///
    /// `max_commits` of 0 means unlimited; `since` is passed through as
    /// `--since`. A failed `git log` call yields an empty list, never an
    /// error.
    pub fn harvest(&self, max_commits: usize, since: Option<&str>) -> Vec<CommitRecord> {
        let format_arg = format!("--format={RECORD_SEP}{LOG_FORMAT}");
        let mut args = vec!["log".to_string(), format_arg, "--numstat".to_string()];
        if max_commits > 0 {
            args.push(format!("-n{max_commits}"));
        }
        if let Some(since) = since {
            args.push(format!("--since={since}"));
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        match self.invoker.run(&arg_refs, LONG_TIMEOUT) {
            Ok(raw) => parse_log(&raw),
            Err(err) => {
                warn!("commit harvest failed: {err}");
                Vec::new()
            }
        }
    }

    /// The HEAD commit record, or `None` if the repository is empty.
    pub fn head_info(&self) -> Option<CommitRecord> {
        self.harvest(1, None).into_iter().next()
    }

    /// Name of the currently checked-out branch, or `"HEAD"` if detached
    /// or unavailable.
    pub fn current_branch(&self) -> String {
        match self
            .invoker
            .run(&["rev-parse", "--abbrev-ref", "HEAD"], SHORT_TIMEOUT)
        {
            Ok(out) => {
                let name = out.trim();
                if name.is_empty() {
                    "HEAD".to_string()
                } else {
                    name.to_string()
                }
            }
            Err(_) => "HEAD".to_string(),
        }
    }
}

/// Parse raw `git log` output into commit records.
///
/// # Examples
///
/// ```
/// use repopulse_git::log::parse_log;
///
/// let raw = "\u{1}aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\u{0}Alice\u{0}alice@example.com\
///            \u{0}2024-06-15T10:30:00+00:00\u{0}Alice\u{0}alice@example.com\
///            \u{0}2024-06-15T10:30:00+00:00\u{0}\u{0}feat: login\u{0}Added OAuth support\n\n\
///            10\t2\tsrc/main.py\n";
/// let records = parse_log(raw);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].message, "feat: login\n\nAdded OAuth support");
/// assert_eq!(records[0].files[0].insertions, 10);
/// ```
pub fn parse_log(raw: &str) -> Vec<CommitRecord> {
    raw.split(RECORD_SEP)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(parse_chunk)
        .collect()
}

/// Parse a single commit chunk: one field line plus any numstat lines.
fn parse_chunk(chunk: &str) -> Option<CommitRecord> {
    let mut field_line = "";
    let mut numstat_lines: Vec<&str> = Vec::new();

    for line in chunk.lines() {
        if field_line.is_empty() && line.contains(FIELD_SEP) {
            field_line = line;
        } else if numstat_re().is_match(line) {
            numstat_lines.push(line);
        }
    }

    if field_line.is_empty() {
        return None;
    }

    let parts: Vec<&str> = field_line.split(FIELD_SEP).collect();
    if parts.len() < 10 {
        warn!("incomplete commit record: {} fields", parts.len());
        return None;
    }

    let sha = parts[0].trim().to_string();
    let subject = parts[8];
    let body = parts[9];

    let message = if body.trim().is_empty() {
        subject.to_string()
    } else {
        format!("{subject}\n\n{}", body.trim())
    };

    let mut files = Vec::new();
    let mut total_insertions = 0u64;
    let mut total_deletions = 0u64;
    for line in numstat_lines {
        if let Some(change) = parse_numstat_line(line) {
            total_insertions += change.insertions;
            total_deletions += change.deletions;
            files.push(change);
        }
    }

    Some(CommitRecord {
        sha,
        author_name: parts[1].to_string(),
        author_email: parts[2].to_string(),
        authored_date: parse_iso_date(parts[3]),
        committer_name: parts[4].to_string(),
        committer_email: parts[5].to_string(),
        committed_date: parse_iso_date(parts[6]),
        message,
        files,
        insertions: total_insertions,
        deletions: total_deletions,
    })
}

/// Parse one `--numstat` line into a [`FileChange`].
///
/// Binary files report `-` for both counts and map to 0/0; rename lines
/// of the form `src/{old.py => new.py}` split into old and new paths.
///
/// # Examples
///
/// ```
/// use repopulse_core::ChangeType;
/// use repopulse_git::log::parse_numstat_line;
///
/// let change = parse_numstat_line("5\t3\tsrc/{old.py => new.py}").unwrap();
/// assert_eq!(change.path, "src/new.py");
/// assert_eq!(change.old_path.as_deref(), Some("src/old.py"));
/// assert_eq!(change.change_type, ChangeType::Renamed);
/// ```
pub fn parse_numstat_line(line: &str) -> Option<FileChange> {
    let caps = numstat_re().captures(line)?;

    let added_str = caps.get(1)?.as_str();
    let deleted_str = caps.get(2)?.as_str();
    let raw_path = caps.get(3)?.as_str();

    // Binary files show "-" for both counts.
    let insertions = if added_str == "-" {
        0
    } else {
        added_str.parse().unwrap_or(0)
    };
    let deletions = if deleted_str == "-" {
        0
    } else {
        deleted_str.parse().unwrap_or(0)
    };

    let (path, old_path, change_type) = if let Some(rename) = rename_re().captures(raw_path) {
        let prefix = &rename[1];
        let old_part = &rename[2];
        let new_part = &rename[3];
        let suffix = &rename[4];
        (
            format!("{prefix}{new_part}{suffix}"),
            Some(format!("{prefix}{old_part}{suffix}")),
            ChangeType::Renamed,
        )
    } else {
        let change_type = if insertions > 0 && deletions == 0 {
            ChangeType::Added
        } else if insertions == 0 && deletions > 0 {
            ChangeType::Deleted
        } else {
            ChangeType::Modified
        };
        (raw_path.to_string(), None, change_type)
    };

    Some(FileChange {
        path,
        change_type,
        insertions,
        deletions,
        old_path,
    })
}

/// Parse an ISO 8601 date from git, falling back to the Unix epoch.
fn parse_iso_date(raw: &str) -> DateTime<FixedOffset> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw).unwrap_or_else(|_| {
        warn!("could not parse date '{raw}', using epoch");
        unix_epoch()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log_output(subject: &str, body: &str, numstat: &str) -> String {
        let field_line = [
            "abc123def456abc123def456abc123def456abc1",
            "Alice",
            "alice@example.com",
            "2024-06-15T10:30:00+00:00",
            "Alice",
            "alice@example.com",
            "2024-06-15T10:30:00+00:00",
            "abc000",
            subject,
            body,
        ]
        .join("\0");
        if numstat.is_empty() {
            format!("{RECORD_SEP}{field_line}")
        } else {
            format!("{RECORD_SEP}{field_line}\n\n{numstat}")
        }
    }

    #[test]
    fn single_commit_is_parsed() {
        let raw = make_log_output("feat: add login", "", "");
        let records = parse_log(&raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sha, "abc123def456abc123def456abc123def456abc1");
        assert_eq!(records[0].author_name, "Alice");
        assert_eq!(records[0].author_email, "alice@example.com");
    }

    #[test]
    fn dates_keep_their_offset() {
        let field_line = [
            "abc123def456abc123def456abc123def456abc1",
            "Alice",
            "alice@example.com",
            "2024-06-15T10:30:00+00:00",
            "Alice",
            "alice@example.com",
            "2024-06-15T11:00:00+02:00",
            "",
            "fix",
            "",
        ]
        .join("\0");
        let records = parse_log(&format!("{RECORD_SEP}{field_line}"));
        assert_eq!(records[0].authored_date.offset().local_minus_utc(), 0);
        assert_eq!(records[0].committed_date.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn subject_and_body_combine_into_message() {
        let raw = make_log_output("feat: login", "Added OAuth support", "");
        let records = parse_log(&raw);
        assert_eq!(records[0].message, "feat: login\n\nAdded OAuth support");
    }

    #[test]
    fn subject_only_message_has_no_body() {
        let raw = make_log_output("fix typo", "", "");
        let records = parse_log(&raw);
        assert_eq!(records[0].message, "fix typo");
    }

    #[test]
    fn numstat_lines_become_file_changes() {
        let raw = make_log_output("fix", "", "10\t2\tsrc/main.py\n3\t0\tREADME.md");
        let records = parse_log(&raw);
        assert_eq!(records[0].insertions, 13);
        assert_eq!(records[0].deletions, 2);
        assert_eq!(records[0].files.len(), 2);
        assert_eq!(records[0].files[0].path, "src/main.py");
        assert_eq!(records[0].files[0].insertions, 10);
        assert_eq!(records[0].files[0].change_type, ChangeType::Modified);
    }

    #[test]
    fn binary_numstat_maps_to_zero_counts() {
        let raw = make_log_output("add image", "", "-\t-\timage.png");
        let records = parse_log(&raw);
        assert_eq!(records[0].files.len(), 1);
        assert_eq!(records[0].files[0].insertions, 0);
        assert_eq!(records[0].files[0].deletions, 0);
    }

    #[test]
    fn rename_paths_are_split() {
        let change = parse_numstat_line("5\t3\tsrc/{old.py => new.py}").unwrap();
        assert_eq!(change.path, "src/new.py");
        assert_eq!(change.old_path.as_deref(), Some("src/old.py"));
        assert_eq!(change.change_type, ChangeType::Renamed);
        assert_eq!(change.insertions, 5);
        assert_eq!(change.deletions, 3);
    }

    #[test]
    fn pure_addition_and_deletion_classification() {
        let added = parse_numstat_line("12\t0\tnew.rs").unwrap();
        assert_eq!(added.change_type, ChangeType::Added);
        let deleted = parse_numstat_line("0\t12\tgone.rs").unwrap();
        assert_eq!(deleted.change_type, ChangeType::Deleted);
    }

    #[test]
    fn unparseable_date_falls_back_to_epoch() {
        let field_line = [
            "abc123def456abc123def456abc123def456abc1",
            "Alice",
            "alice@example.com",
            "not-a-date",
            "Alice",
            "alice@example.com",
            "2024-06-15T10:30:00+00:00",
            "",
            "fix",
            "",
        ]
        .join("\0");
        let records = parse_log(&format!("{RECORD_SEP}{field_line}"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].authored_date.timestamp(), 0);
    }

    #[test]
    fn incomplete_field_line_is_skipped() {
        let records = parse_log(&format!("{RECORD_SEP}abc\0Alice\0alice@example.com"));
        assert!(records.is_empty());
    }

    #[test]
    fn multiple_commits_stay_in_order() {
        let first = make_log_output("first", "", "1\t0\ta.rs");
        let second = make_log_output("second", "", "2\t0\tb.rs");
        let records = parse_log(&format!("{first}{second}"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject(), "first");
        assert_eq!(records[1].subject(), "second");
    }

    #[test]
    fn empty_input_yields_no_records() {
        assert!(parse_log("").is_empty());
    }
}
