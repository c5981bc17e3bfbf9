//! Unified diff parsing into typed hunks and lines.
//!
//! Old and new line counters start at the hunk header's start values and
//! advance independently: an added line consumes only the new counter, a
//! deleted line only the old counter, a context line both.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::invoker::{GitInvoker, LONG_TIMEOUT};

static HUNK_RE: OnceLock<Regex> = OnceLock::new();

/// `@@ -old_start,old_count +new_start,new_count @@ optional context`.
fn hunk_re() -> &'static Regex {
    HUNK_RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$").expect("valid regex")
    })
}

/// Classification of a single diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    /// Unchanged line present in both versions.
    Context,
    /// Line added in the new version.
    Add,
    /// Line removed from the old version.
    Delete,
}

/// A single line within a diff hunk.
///
/// Added lines have no old line number and deleted lines have no new
/// line number; context lines carry both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    /// Line content without the `+`/`-`/space prefix.
    pub content: String,
    /// Line classification.
    pub kind: DiffLineKind,
    /// Line number in the old version, if present there.
    pub old_lineno: Option<u32>,
    /// Line number in the new version, if present there.
    pub new_lineno: Option<u32>,
}

/// A single hunk from a unified diff.
///
/// # Examples
///
/// ```
/// use repopulse_git::diff::parse_diff;
///
/// let hunks = parse_diff("@@ -10,5 +10,8 @@ fn greet() {\n hello\n+world\n");
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].old_start, 10);
/// assert_eq!(hunks[0].function_context, "fn greet() {");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Line count in the old version.
    pub old_count: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Line count in the new version.
    pub new_count: u32,
    /// The full raw `@@` header line.
    pub header: String,
    /// Function context following the closing `@@`, trimmed.
    pub function_context: String,
    /// Parsed lines in order.
    pub lines: Vec<DiffLine>,
}

/// Fetches and parses diffs from a git repository.
///
/// # Examples
///
/// ```no_run
/// use repopulse_git::diff::DiffEngine;
///
/// let engine = DiffEngine::new(".");
/// let hunks = engine.diff_range("main", "feature/login");
/// println!("{} hunks", hunks.len());
/// ```
#[derive(Debug, Clone)]
pub struct DiffEngine {
    invoker: GitInvoker,
}

impl DiffEngine {
    /// Create a diff engine rooted at `repo_path`.
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            invoker: GitInvoker::new(repo_path),
        }
    }

    /// Diff hunks introduced by a single commit (`<sha>~1..<sha>`).
    ///
    /// Returns an empty list if the diff cannot be produced (e.g. a root
    /// commit with no parent).
    pub fn diff_commit(&self, sha: &str) -> Vec<DiffHunk> {
        let range = format!("{sha}~1..{sha}");
        self.run_diff(&range)
    }

    /// Diff hunks between two refs (`base..head`).
    pub fn diff_range(&self, base: &str, head: &str) -> Vec<DiffHunk> {
        let range = format!("{base}..{head}");
        self.run_diff(&range)
    }

    fn run_diff(&self, range: &str) -> Vec<DiffHunk> {
        match self
            .invoker
            .run(&["diff", range, "--unified=3"], LONG_TIMEOUT)
        {
            Ok(raw) => parse_diff(&raw),
            Err(err) => {
                debug!("could not diff {range}: {err}");
                Vec::new()
            }
        }
    }
}

/// Parse raw unified diff text into hunks.
///
/// Meta lines (`---`, `+++`, `diff `, `index `) and the
/// `\ No newline at end of file` marker are skipped.
///
/// # Examples
///
/// ```
/// use repopulse_git::diff::{parse_diff, DiffLineKind};
///
/// let raw = "\
/// --- a/src/main.py
/// +++ b/src/main.py
/// @@ -1,2 +1,3 @@
///  def greet():
/// +    print(\"hi\")
///      return None
/// ";
/// let hunks = parse_diff(raw);
/// assert_eq!(hunks[0].lines.len(), 3);
/// assert_eq!(hunks[0].lines[1].kind, DiffLineKind::Add);
/// assert_eq!(hunks[0].lines[1].old_lineno, None);
/// assert_eq!(hunks[0].lines[1].new_lineno, Some(2));
/// ```
pub fn parse_diff(raw: &str) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    let mut current: Option<HunkBuilder> = None;

    for line in raw.lines() {
        if let Some(caps) = hunk_re().captures(line) {
            if let Some(builder) = current.take() {
                hunks.push(builder.build());
            }

            let old_start = caps[1].parse().unwrap_or(1);
            // Missing counts denote single-line hunks.
            let old_count = caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1));
            let new_start = caps[3].parse().unwrap_or(1);
            let new_count = caps.get(4).map_or(1, |m| m.as_str().parse().unwrap_or(1));
            let function_context = caps[5].trim().to_string();

            current = Some(HunkBuilder::new(
                old_start,
                old_count,
                new_start,
                new_count,
                line.to_string(),
                function_context,
            ));
            continue;
        }

        if let Some(builder) = current.as_mut() {
            if line.starts_with("---")
                || line.starts_with("+++")
                || line.starts_with("diff ")
                || line.starts_with("index ")
            {
                continue;
            }
            builder.add_line(line);
        }
    }

    if let Some(builder) = current.take() {
        hunks.push(builder.build());
    }

    hunks
}

/// Accumulates diff lines and builds a [`DiffHunk`].
struct HunkBuilder {
    old_start: u32,
    old_count: u32,
    new_start: u32,
    new_count: u32,
    header: String,
    function_context: String,
    lines: Vec<DiffLine>,
    old_lineno: u32,
    new_lineno: u32,
}

impl HunkBuilder {
    fn new(
        old_start: u32,
        old_count: u32,
        new_start: u32,
        new_count: u32,
        header: String,
        function_context: String,
    ) -> Self {
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
            header,
            function_context,
            lines: Vec::new(),
            old_lineno: old_start,
            new_lineno: new_start,
        }
    }

    fn add_line(&mut self, raw: &str) {
        if let Some(content) = raw.strip_prefix('+') {
            self.lines.push(DiffLine {
                content: content.to_string(),
                kind: DiffLineKind::Add,
                old_lineno: None,
                new_lineno: Some(self.new_lineno),
            });
            self.new_lineno += 1;
        } else if let Some(content) = raw.strip_prefix('-') {
            self.lines.push(DiffLine {
                content: content.to_string(),
                kind: DiffLineKind::Delete,
                old_lineno: Some(self.old_lineno),
                new_lineno: None,
            });
            self.old_lineno += 1;
        } else if let Some(content) = raw.strip_prefix(' ') {
            self.lines.push(DiffLine {
                content: content.to_string(),
                kind: DiffLineKind::Context,
                old_lineno: Some(self.old_lineno),
                new_lineno: Some(self.new_lineno),
            });
            self.old_lineno += 1;
            self.new_lineno += 1;
        }
        // Anything else ("\ No newline at end of file", ...) is ignored.
    }

    fn build(self) -> DiffHunk {
        DiffHunk {
            old_start: self.old_start,
            old_count: self.old_count,
            new_start: self.new_start,
            new_count: self.new_count,
            header: self.header,
            function_context: self.function_context,
            lines: self.lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diff_yields_no_hunks() {
        assert!(parse_diff("").is_empty());
    }

    #[test]
    fn header_fields_are_extracted() {
        let raw = "@@ -10,5 +10,8 @@ def greet():\n context\n";
        let hunks = parse_diff(raw);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_start, 10);
        assert_eq!(hunks[0].old_count, 5);
        assert_eq!(hunks[0].new_start, 10);
        assert_eq!(hunks[0].new_count, 8);
        assert_eq!(hunks[0].header, "@@ -10,5 +10,8 @@ def greet():");
        assert_eq!(hunks[0].function_context, "def greet():");
    }

    #[test]
    fn missing_counts_default_to_one() {
        let raw = "@@ -3 +4 @@\n-old\n+new\n";
        let hunks = parse_diff(raw);
        assert_eq!(hunks[0].old_count, 1);
        assert_eq!(hunks[0].new_count, 1);
    }

    #[test]
    fn counters_advance_independently() {
        let raw = "\
@@ -10,5 +10,8 @@ def greet():
 first context
-removed line
+added one
+added two
+added three
 second context
";
        let hunks = parse_diff(raw);
        let lines = &hunks[0].lines;
        assert_eq!(lines.len(), 6);

        let adds: Vec<&DiffLine> = lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Add)
            .collect();
        let deletes: Vec<&DiffLine> = lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Delete)
            .collect();
        let contexts: Vec<&DiffLine> = lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Context)
            .collect();
        assert_eq!(adds.len(), 3);
        assert_eq!(deletes.len(), 1);
        assert_eq!(contexts.len(), 2);

        // Added lines never carry an old line number, and vice versa.
        assert!(adds.iter().all(|l| l.old_lineno.is_none()));
        assert!(deletes.iter().all(|l| l.new_lineno.is_none()));

        // Context at old 10/new 10, delete at old 11, adds at new 11-13,
        // trailing context at old 12/new 14.
        assert_eq!(contexts[0].old_lineno, Some(10));
        assert_eq!(contexts[0].new_lineno, Some(10));
        assert_eq!(deletes[0].old_lineno, Some(11));
        assert_eq!(adds[0].new_lineno, Some(11));
        assert_eq!(adds[2].new_lineno, Some(13));
        assert_eq!(contexts[1].old_lineno, Some(12));
        assert_eq!(contexts[1].new_lineno, Some(14));
    }

    #[test]
    fn meta_lines_are_skipped() {
        let raw = "\
diff --git a/f.rs b/f.rs
index abc1234..def5678 100644
--- a/f.rs
+++ b/f.rs
@@ -1 +1,2 @@
 line1
+line2
";
        let hunks = parse_diff(raw);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines.len(), 2);
    }

    #[test]
    fn multiple_hunks_are_separated() {
        let raw = "\
@@ -1,2 +1,3 @@
 a
+b
 c
@@ -10,2 +11,2 @@
-x
+y
 z
";
        let hunks = parse_diff(raw);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].lines.len(), 3);
        assert_eq!(hunks[1].old_start, 10);
        assert_eq!(hunks[1].new_start, 11);
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let raw = "\
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let hunks = parse_diff(raw);
        assert_eq!(hunks[0].lines.len(), 2);
        assert_eq!(hunks[0].lines[0].kind, DiffLineKind::Delete);
        assert_eq!(hunks[0].lines[1].kind, DiffLineKind::Add);
    }

    #[test]
    fn content_keeps_leading_whitespace() {
        let raw = "@@ -1 +1,2 @@\n def f():\n+    return 1\n";
        let hunks = parse_diff(raw);
        assert_eq!(hunks[0].lines[0].content, "def f():");
        assert_eq!(hunks[0].lines[1].content, "    return 1");
    }
}
