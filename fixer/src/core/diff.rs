//! Unified-diff text handling: fence stripping, structural checks, and
//! changed-file extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AgentError;

static FILE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^---[ \t]+\S.*\n\+\+\+[ \t]+\S.*$").unwrap());
static HUNK_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^@@[ \t]+-\d+(,\d+)?[ \t]+\+\d+(,\d+)?[ \t]+@@").unwrap());
static CHANGED_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^---[ \t]+a/(.+?)[ \t]*$").unwrap());
static OPENING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[\w+-]*\s*$").unwrap());
static CLOSING_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^```\s*$").unwrap());

/// Remove a markdown fence wrapper and surrounding blank lines.
///
/// Only the first non-blank line (```` ``` ```` with an optional language tag)
/// and the last non-blank line (a bare ```` ``` ````) are candidates. Fence
/// lines inside the body are content, e.g. diff context from a markdown file.
pub fn strip_code_fences(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    if let Some(first) = lines.iter().position(|l| !l.trim().is_empty())
        && OPENING_FENCE_RE.is_match(lines[first])
    {
        lines.remove(first);
    }
    if let Some(last) = lines.iter().rposition(|l| !l.trim().is_empty())
        && CLOSING_FENCE_RE.is_match(lines[last])
    {
        lines.remove(last);
    }
    let joined = lines.join("\n");
    joined.trim_matches(|c| c == '\n' || c == '\r').to_string()
}

/// Normalize model output into patch text: fence wrapper removed, exactly one trailing newline.
///
/// Trailing spaces are kept: a lone ` ` line is context for an empty source line.
pub fn normalize_diff(raw: &str) -> String {
    let mut out = strip_code_fences(raw);
    out.push('\n');
    out
}

/// Require at least one `---`/`+++` header pair and one `@@ -a[,b] +c[,d] @@` hunk header.
pub fn validate_structure(diff: &str) -> Result<(), AgentError> {
    if !FILE_HEADER_RE.is_match(diff) {
        return Err(AgentError::InvalidDiffFormat(
            "missing '---'/'+++' file header pair".to_string(),
        ));
    }
    if !HUNK_HEADER_RE.is_match(diff) {
        return Err(AgentError::InvalidDiffFormat(
            "missing '@@ -start[,count] +start[,count] @@' hunk header".to_string(),
        ));
    }
    Ok(())
}

/// Paths named by `--- a/<path>` headers, in order of appearance, duplicates kept.
pub fn changed_files(diff: &str) -> Vec<String> {
    CHANGED_FILE_RE
        .captures_iter(diff)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const README_DIFF: &str = "--- a/README.md\n+++ b/README.md\n@@ -1,1 +1,1 @@\n-Old\n+New\n";

    #[test]
    fn accepts_minimal_diff() {
        validate_structure("--- a/x\n+++ b/x\n@@ -1,1 +1,1 @@\n-old\n+new\n").expect("valid");
        validate_structure("--- a/x\n+++ b/x\n@@ -3 +3 @@\n-old\n+new\n").expect("valid");
    }

    #[test]
    fn rejects_headers_without_hunk() {
        let err = validate_structure("--- a/x\n+++ b/x\n-old\n+new\n").expect_err("no hunk");
        assert!(matches!(err, AgentError::InvalidDiffFormat(_)));
    }

    #[test]
    fn rejects_hunk_without_headers() {
        let err = validate_structure("@@ -1,1 +1,1 @@\n-old\n+new\n").expect_err("no header");
        assert!(matches!(err, AgentError::InvalidDiffFormat(_)));
    }

    #[test]
    fn strips_fences_with_language_tag() {
        let fenced = format!("```diff\n{README_DIFF}```\n");
        assert_eq!(normalize_diff(&fenced), README_DIFF);
        assert_eq!(normalize_diff(README_DIFF), README_DIFF);
    }

    #[test]
    fn fence_lines_inside_the_body_are_kept() {
        let diff = "--- a/README.md\n+++ b/README.md\n@@ -1,5 +1,5 @@\n Usage:\n ```\n run\n ```\n-Old\n+New\n";
        assert_eq!(normalize_diff(diff), diff);

        let fenced = format!("```diff\n{diff}```");
        assert_eq!(normalize_diff(&fenced), diff);
    }

    #[test]
    fn only_a_wrapping_fence_is_stripped() {
        assert_eq!(strip_code_fences("\n```json\n{}\n```\n\n"), "{}");
        assert_eq!(strip_code_fences("{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n```"), "");
        // A fence with trailing text is not a closing fence.
        assert_eq!(strip_code_fences("x\n``` end"), "x\n``` end");
    }

    #[test]
    fn changed_files_keep_order_and_duplicates() {
        let diff = "--- a/b.txt\n+++ b/b.txt\n@@ -1 +1 @@\n-x\n+y\n\
                    --- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+y\n\
                    --- a/b.txt\n+++ b/b.txt\n@@ -5 +5 @@\n-x\n+y\n";
        assert_eq!(changed_files(diff), vec!["b.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn new_files_from_dev_null_are_not_reported() {
        let diff = "--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1 @@\n+hi\n";
        assert!(changed_files(diff).is_empty());
    }
}
