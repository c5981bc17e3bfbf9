//! Ref exploration: tags, stashes, worktrees, and notes.
//!
//! Tags distinguish annotated from lightweight via the object type;
//! worktree porcelain is parsed by a line-oriented state machine where a
//! `worktree` line opens a record and `HEAD`/`branch` lines fill it in.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use repopulse_core::unix_epoch;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::invoker::{GitInvoker, SHORT_TIMEOUT};

/// Tag listing format: name, object type, peeled-or-direct sha, date,
/// subject — null-byte separated.
const TAG_FORMAT: &str = "%(refname:short)%00%(objecttype)%00%(*objectname)%(objectname)%00%(creatordate:iso-strict)%00%(contents:subject)";

/// Stash listing format: reflog selector, subject, committer date.
const STASH_FORMAT: &str = "%gd%x00%gs%x00%ci";

static SEMVER_RE: OnceLock<Regex> = OnceLock::new();
static STASH_INDEX_RE: OnceLock<Regex> = OnceLock::new();

/// `v?MAJOR.MINOR.PATCH[-prerelease]`.
fn semver_re() -> &'static Regex {
    SEMVER_RE
        .get_or_init(|| Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)(?:-(.+))?$").expect("valid regex"))
}

fn stash_index_re() -> &'static Regex {
    STASH_INDEX_RE.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("valid regex"))
}

/// A git tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    /// Tag name.
    pub name: String,
    /// Commit SHA the tag points to (peeled for annotated tags).
    pub sha: String,
    /// Tag creation date.
    pub date: DateTime<FixedOffset>,
    /// Tag message subject, or `None` for lightweight tags.
    pub message: Option<String>,
    /// Whether the tag is an annotated tag object.
    pub is_annotated: bool,
}

/// A tag whose name parses as a semantic version.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use repopulse_git::refs::{parse_semver_tags, TagRecord};
///
/// let date = DateTime::parse_from_rfc3339("2024-06-15T10:30:00+00:00").unwrap();
/// let tags = vec![
///     TagRecord {
///         name: "v1.2.3".into(),
///         sha: "a".repeat(40),
///         date,
///         message: None,
///         is_annotated: false,
///     },
///     TagRecord {
///         name: "nightly".into(),
///         sha: "b".repeat(40),
///         date,
///         message: None,
///         is_annotated: false,
///     },
/// ];
/// let semver = parse_semver_tags(&tags);
/// assert_eq!(semver.len(), 1);
/// assert_eq!((semver[0].major, semver[0].minor, semver[0].patch), (1, 2, 3));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemverTag {
    /// The underlying tag record.
    pub tag: TagRecord,
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Patch version.
    pub patch: u64,
    /// Prerelease suffix (after `-`), if present.
    pub prerelease: Option<String>,
}

/// A stash entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StashRecord {
    /// Stash index (`N` in `stash@{N}`).
    pub index: usize,
    /// Stash message.
    pub message: String,
    /// Stash creation date.
    pub date: DateTime<FixedOffset>,
}

/// A worktree attached to the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeRecord {
    /// Absolute worktree path.
    pub path: String,
    /// SHA at the worktree HEAD.
    pub head_sha: String,
    /// Checked-out branch, or `None` when detached.
    pub branch: Option<String>,
}

/// A git note attached to a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    /// SHA of the annotated commit.
    pub commit_sha: String,
    /// Note content.
    pub message: String,
}

/// Explores git refs: tags, stashes, worktrees, and notes.
///
/// Every listing degrades to an empty vector when the underlying git
/// call fails.
#[derive(Debug, Clone)]
pub struct RefExplorer {
    invoker: GitInvoker,
}

impl RefExplorer {
    /// Create a ref explorer rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            invoker: GitInvoker::new(repo_path),
        }
    }

    /// List all tags, sorted by date descending.
    pub fn list_tags(&self) -> Vec<TagRecord> {
        let format_arg = format!("--format={TAG_FORMAT}");
        let raw = match self
            .invoker
            .run(&["tag", "-l", &format_arg], SHORT_TIMEOUT)
        {
            Ok(raw) => raw,
            Err(err) => {
                debug!("could not list tags: {err}");
                return Vec::new();
            }
        };

        let mut tags: Vec<TagRecord> = raw.lines().filter_map(parse_tag_line).collect();
        tags.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.name.cmp(&b.name)));
        tags
    }

    /// List all stash entries in stash order.
    pub fn list_stashes(&self) -> Vec<StashRecord> {
        let format_arg = format!("--format={STASH_FORMAT}");
        let raw = match self
            .invoker
            .run(&["stash", "list", &format_arg], SHORT_TIMEOUT)
        {
            Ok(raw) => raw,
            Err(err) => {
                debug!("could not list stashes: {err}");
                return Vec::new();
            }
        };

        let mut stashes = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\0').collect();
            if parts.len() < 3 {
                continue;
            }

            let index = stash_index_re()
                .captures(parts[0])
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(stashes.len());

            stashes.push(StashRecord {
                index,
                message: parts[1].trim().to_string(),
                date: parse_ref_date(parts[2]),
            });
        }
        stashes
    }

    /// List all worktrees via `git worktree list --porcelain`.
    pub fn list_worktrees(&self) -> Vec<WorktreeRecord> {
        match self
            .invoker
            .run(&["worktree", "list", "--porcelain"], SHORT_TIMEOUT)
        {
            Ok(raw) => parse_worktree_porcelain(&raw),
            Err(err) => {
                debug!("could not list worktrees: {err}");
                Vec::new()
            }
        }
    }

    /// List all git notes, fetching each note's content.
    pub fn list_notes(&self) -> Vec<NoteRecord> {
        let raw = match self.invoker.run(&["notes", "list"], SHORT_TIMEOUT) {
            Ok(raw) => raw,
            Err(err) => {
                debug!("could not list notes: {err}");
                return Vec::new();
            }
        };

        let mut notes = Vec::new();
        for line in raw.lines() {
            let mut parts = line.split_whitespace();
            let _note_sha = parts.next();
            let Some(commit_sha) = parts.next() else {
                continue;
            };

            let message = self
                .invoker
                .run(&["notes", "show", commit_sha], SHORT_TIMEOUT)
                .map(|out| out.trim().to_string())
                .unwrap_or_default();

            notes.push(NoteRecord {
                commit_sha: commit_sha.to_string(),
                message,
            });
        }
        notes
    }
}

/// Parse one null-delimited tag listing line.
fn parse_tag_line(line: &str) -> Option<TagRecord> {
    if line.trim().is_empty() {
        return None;
    }
    let parts: Vec<&str> = line.split('\0').collect();
    if parts.len() < 4 {
        return None;
    }

    let name = parts[0].trim().to_string();
    let object_type = parts[1].trim();
    // Annotated tags emit peeled + direct sha concatenated; the first 40
    // chars are the commit.
    let sha: String = parts[2].trim().chars().take(40).collect();
    let date = parse_ref_date(parts[3]);
    let message = parts
        .get(4)
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    Some(TagRecord {
        name,
        sha,
        date,
        message,
        is_annotated: object_type == "tag",
    })
}

/// Parse tags as semantic versions, sorted by version descending.
///
/// Only tags whose names match `v?MAJOR.MINOR.PATCH[-prerelease]` are
/// included.
pub fn parse_semver_tags(tags: &[TagRecord]) -> Vec<SemverTag> {
    let mut semver_tags: Vec<SemverTag> = tags
        .iter()
        .filter_map(|tag| {
            let caps = semver_re().captures(&tag.name)?;
            Some(SemverTag {
                tag: tag.clone(),
                major: caps[1].parse().ok()?,
                minor: caps[2].parse().ok()?,
                patch: caps[3].parse().ok()?,
                prerelease: caps.get(4).map(|m| m.as_str().to_string()),
            })
        })
        .collect();

    semver_tags.sort_by(|a, b| {
        (b.major, b.minor, b.patch).cmp(&(a.major, a.minor, a.patch))
    });
    semver_tags
}

/// Parse `git worktree list --porcelain` output.
///
/// # Examples
///
/// ```
/// use repopulse_git::refs::parse_worktree_porcelain;
///
/// let raw = "\
/// worktree /repo
/// HEAD aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa
/// branch refs/heads/main
///
/// worktree /repo-hotfix
/// HEAD bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb
/// detached
/// ";
/// let worktrees = parse_worktree_porcelain(raw);
/// assert_eq!(worktrees.len(), 2);
/// assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
/// assert_eq!(worktrees[1].branch, None);
/// ```
pub fn parse_worktree_porcelain(raw: &str) -> Vec<WorktreeRecord> {
    let mut worktrees = Vec::new();
    let mut current_path = String::new();
    let mut current_sha = String::new();
    let mut current_branch: Option<String> = None;

    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("worktree ") {
            if !current_path.is_empty() {
                worktrees.push(WorktreeRecord {
                    path: std::mem::take(&mut current_path),
                    head_sha: std::mem::take(&mut current_sha),
                    branch: current_branch.take(),
                });
            }
            current_path = rest.trim().to_string();
            current_sha.clear();
            current_branch = None;
        } else if let Some(rest) = line.strip_prefix("HEAD ") {
            current_sha = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("branch ") {
            let branch = rest.trim();
            let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
            current_branch = Some(branch.to_string());
        }
    }

    if !current_path.is_empty() {
        worktrees.push(WorktreeRecord {
            path: current_path,
            head_sha: current_sha,
            branch: current_branch,
        });
    }

    worktrees
}

/// Parse a date from ref output: strict ISO first, then git's
/// `%ci` form (`2024-06-15 10:30:00 +0200`), then the epoch fallback.
fn parse_ref_date(raw: &str) -> DateTime<FixedOffset> {
    let raw = raw.trim();
    if raw.is_empty() {
        return unix_epoch();
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return date;
    }
    if let Ok(date) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return date;
    }
    debug!("could not parse ref date '{raw}'");
    unix_epoch()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> TagRecord {
        TagRecord {
            name: name.to_string(),
            sha: "a".repeat(40),
            date: DateTime::parse_from_rfc3339("2024-06-15T10:30:00+00:00").unwrap(),
            message: None,
            is_annotated: false,
        }
    }

    #[test]
    fn annotated_tag_line_is_parsed() {
        let line = format!(
            "v1.2.3\0tag\0{}{}\02024-06-15T10:30:00+00:00\0Release 1.2.3",
            "a".repeat(40),
            "b".repeat(40),
        );
        let record = parse_tag_line(&line).unwrap();
        assert_eq!(record.name, "v1.2.3");
        assert!(record.is_annotated);
        assert_eq!(record.sha, "a".repeat(40));
        assert_eq!(record.message.as_deref(), Some("Release 1.2.3"));
    }

    #[test]
    fn lightweight_tag_has_no_message() {
        let line = format!("nightly\0commit\0{}\02024-06-15T10:30:00+00:00\0", "c".repeat(40));
        let record = parse_tag_line(&line).unwrap();
        assert!(!record.is_annotated);
        assert_eq!(record.message, None);
    }

    #[test]
    fn malformed_tag_line_is_dropped() {
        assert!(parse_tag_line("just-a-name").is_none());
        assert!(parse_tag_line("").is_none());
    }

    #[test]
    fn semver_tags_are_filtered_and_sorted() {
        let tags = vec![tag("v1.2.3"), tag("2.0.0"), tag("nightly"), tag("v1.10.0")];
        let semver = parse_semver_tags(&tags);
        assert_eq!(semver.len(), 3);
        assert_eq!(semver[0].tag.name, "2.0.0");
        assert_eq!(semver[1].tag.name, "v1.10.0");
        assert_eq!(semver[2].tag.name, "v1.2.3");
    }

    #[test]
    fn semver_prerelease_is_captured() {
        let tags = vec![tag("v1.0.0-rc.1")];
        let semver = parse_semver_tags(&tags);
        assert_eq!(semver[0].prerelease.as_deref(), Some("rc.1"));
        assert_eq!(parse_semver_tags(&[tag("v1.0.0")])[0].prerelease, None);
    }

    #[test]
    fn worktree_state_machine_handles_detached() {
        let raw = "\
worktree /repo
HEAD aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa
branch refs/heads/main

worktree /repo-detached
HEAD bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb
detached
";
        let worktrees = parse_worktree_porcelain(raw);
        assert_eq!(worktrees.len(), 2);
        assert_eq!(worktrees[0].path, "/repo");
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
        assert_eq!(
            worktrees[1].head_sha,
            "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
        );
        assert_eq!(worktrees[1].branch, None);
    }

    #[test]
    fn empty_worktree_porcelain_yields_nothing() {
        assert!(parse_worktree_porcelain("").is_empty());
    }

    #[test]
    fn ref_date_accepts_ci_format() {
        let date = parse_ref_date("2024-06-15 10:30:00 +0200");
        assert_eq!(date.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn bad_ref_date_falls_back_to_epoch() {
        assert_eq!(parse_ref_date("sometime last week").timestamp(), 0);
        assert_eq!(parse_ref_date("").timestamp(), 0);
    }
}
