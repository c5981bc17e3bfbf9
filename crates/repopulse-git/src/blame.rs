//! Per-file authorship extraction from `git blame --line-porcelain`.
//!
//! The porcelain stream is parsed by a small state machine: a commit
//! header line updates the working sha/line number, `author*` fields
//! update the working author, and a tab-prefixed content line closes out
//! one attributed line.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::invoker::{GitInvoker, LONG_TIMEOUT};

static HEADER_RE: OnceLock<Regex> = OnceLock::new();

/// Porcelain commit header: `sha original-line final-line [group-size]`.
fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| Regex::new(r"^([0-9a-f]{40})\s+(\d+)\s+(\d+)").expect("valid regex"))
}

/// A single attributed line from `git blame`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameLine {
    /// 1-based line number in the current file.
    pub line_number: u32,
    /// Author display name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Author time of the commit that last touched this line.
    pub date: DateTime<Utc>,
    /// SHA of the commit that last touched this line.
    pub commit_sha: String,
}

/// Aggregated blame statistics for one author on one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBlameStat {
    /// Author display name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Number of lines attributed to this author.
    pub line_count: usize,
    /// Percentage of total file lines, rounded to 2 decimals.
    pub percentage: f64,
}

/// Blame report for a single file.
///
/// `authors` is sorted by line count descending; percentages sum to
/// 100 within rounding error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBlameReport {
    /// Repository-relative file path.
    pub path: String,
    /// Total attributed lines.
    pub total_lines: usize,
    /// Per-author statistics, descending by line count.
    pub authors: Vec<AuthorBlameStat>,
    /// Per-line attribution.
    pub lines: Vec<BlameLine>,
}

impl FileBlameReport {
    fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            total_lines: 0,
            authors: Vec::new(),
            lines: Vec::new(),
        }
    }
}

/// Extracts per-file authorship data using `git blame --line-porcelain`.
///
/// # Examples
///
/// ```no_run
/// use repopulse_git::blame::{bus_factor, BlameEngine};
///
/// let engine = BlameEngine::new(".");
/// let report = engine.blame_file("src/lib.rs");
/// println!("{} lines, bus factor {}", report.total_lines, bus_factor(&report));
/// ```
#[derive(Debug, Clone)]
pub struct BlameEngine {
    invoker: GitInvoker,
}

impl BlameEngine {
    /// Create a blame engine rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            invoker: GitInvoker::new(repo_path),
        }
    }

    /// Blame a single file.
    ///
    /// Returns an empty report (zero lines, no authors) if the file
    /// cannot be blamed.
    pub fn blame_file(&self, file_path: &str) -> FileBlameReport {
        let raw = match self
            .invoker
            .run(&["blame", "--line-porcelain", file_path], LONG_TIMEOUT)
        {
            Ok(raw) => raw,
            Err(err) => {
                debug!("could not blame {file_path}: {err}");
                return FileBlameReport::empty(file_path);
            }
        };

        let lines = parse_porcelain(&raw);
        let authors = aggregate_authors(&lines);

        FileBlameReport {
            path: file_path.to_string(),
            total_lines: lines.len(),
            authors,
            lines,
        }
    }

    /// Blame many files on a bounded worker pool.
    ///
    /// Results come back in the same order as `file_paths`, regardless of
    /// which blame finished first.
    pub fn blame_files(&self, file_paths: &[String]) -> Vec<FileBlameReport> {
        file_paths
            .par_iter()
            .map(|path| self.blame_file(path))
            .collect()
    }
}

/// Minimum number of authors whose cumulative ownership strictly exceeds
/// 50% of the file.
///
/// # Examples
///
/// ```
/// use repopulse_git::blame::{bus_factor, AuthorBlameStat, FileBlameReport};
///
/// let report = FileBlameReport {
///     path: "main.py".into(),
///     total_lines: 10,
///     authors: vec![
///         AuthorBlameStat {
///             author_name: "Alice".into(),
///             author_email: "alice@example.com".into(),
///             line_count: 5,
///             percentage: 50.0,
///         },
///         AuthorBlameStat {
///             author_name: "Bob".into(),
///             author_email: "bob@example.com".into(),
///             line_count: 5,
///             percentage: 50.0,
///         },
///     ],
///     lines: vec![],
/// };
/// // Neither author alone exceeds 50%, so both are needed.
/// assert_eq!(bus_factor(&report), 2);
/// ```
pub fn bus_factor(report: &FileBlameReport) -> usize {
    if report.authors.is_empty() {
        return 0;
    }

    let mut sorted: Vec<&AuthorBlameStat> = report.authors.iter().collect();
    sorted.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut cumulative = 0.0;
    let mut count = 0;
    for author in sorted {
        cumulative += author.percentage;
        count += 1;
        if cumulative > 50.0 {
            break;
        }
    }
    count
}

/// Parse `git blame --line-porcelain` output into attributed lines.
pub fn parse_porcelain(raw: &str) -> Vec<BlameLine> {
    let mut lines = Vec::new();
    let mut current_sha = String::new();
    let mut current_lineno = 0u32;
    let mut current_author = String::new();
    let mut current_email = String::new();
    let mut current_time = 0i64;

    for line in raw.lines() {
        if let Some(caps) = header_re().captures(line) {
            current_sha = caps[1].to_string();
            current_lineno = caps[3].parse().unwrap_or(0);
            continue;
        }

        if let Some(rest) = line.strip_prefix("author ") {
            current_author = rest.to_string();
            continue;
        }

        if let Some(rest) = line.strip_prefix("author-mail ") {
            current_email = rest
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string();
            continue;
        }

        if let Some(rest) = line.strip_prefix("author-time ") {
            current_time = rest.parse().unwrap_or(0);
            continue;
        }

        // The content line starts with a tab and closes out one record.
        if line.starts_with('\t') {
            lines.push(BlameLine {
                line_number: current_lineno,
                author_name: current_author.clone(),
                author_email: current_email.clone(),
                date: DateTime::from_timestamp(current_time, 0).unwrap_or(DateTime::UNIX_EPOCH),
                commit_sha: current_sha.clone(),
            });
        }
    }

    lines
}

/// Aggregate per-author statistics, grouped by email.
pub fn aggregate_authors(lines: &[BlameLine]) -> Vec<AuthorBlameStat> {
    if lines.is_empty() {
        return Vec::new();
    }

    let total = lines.len();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut names: HashMap<&str, &str> = HashMap::new();
    for line in lines {
        *counts.entry(line.author_email.as_str()).or_default() += 1;
        names.insert(line.author_email.as_str(), line.author_name.as_str());
    }

    let mut stats: Vec<AuthorBlameStat> = counts
        .into_iter()
        .map(|(email, count)| AuthorBlameStat {
            author_name: names.get(email).copied().unwrap_or("").to_string(),
            author_email: email.to_string(),
            line_count: count,
            percentage: round2(count as f64 / total as f64 * 100.0),
        })
        .collect();

    // Email as tie-break keeps the order independent of map iteration.
    stats.sort_by(|a, b| {
        b.line_count
            .cmp(&a.line_count)
            .then_with(|| a.author_email.cmp(&b.author_email))
    });
    stats
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
