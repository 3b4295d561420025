//! Cleanup pipeline for generated article text.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on generated Markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = normalize_line_endings(md);

    result = strip_wrapping_fence(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

fn normalize_line_endings(md: &str) -> String {
    md.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Strip a code fence wrapping the whole response
// ---------------------------------------------------------------------------

/// Models sometimes answer with the whole article inside a
/// ```` ```markdown ```` block. Only a fence that opens the text and closes
/// it is removed; inner code blocks are left alone.
fn strip_wrapping_fence(md: &str) -> String {
    static WRAPPED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\A\s*```[A-Za-z]*[ \t]*\n(.*?)\n?```\s*\z").expect("valid regex")
    });

    match WRAPPED_RE.captures(md) {
        Some(caps) if !caps[1].contains("```") => caps[1].to_string(),
        _ => md.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Pass 3: Normalize whitespace
// ---------------------------------------------------------------------------

/// Clean up trailing whitespace on lines.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 4: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single blank line and drop leading ones.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE
        .replace_all(md, "\n\n")
        .trim_start_matches('\n')
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Ensure trailing newline
// ---------------------------------------------------------------------------

/// Ensure the text ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_wrapping_fence_removes_outer_block() {
        let input = "```markdown\n## Intro\n\nText\n```";
        assert_eq!(strip_wrapping_fence(input), "## Intro\n\nText");
    }

    #[test]
    fn strip_wrapping_fence_keeps_inner_code() {
        let input = "## Setup\n\n```bash\nmake\n```\n\nDone";
        assert_eq!(strip_wrapping_fence(input), input);
    }

    #[test]
    fn strip_wrapping_fence_ignores_two_blocks() {
        let input = "```\na\n```\n\n```\nb\n```";
        assert_eq!(strip_wrapping_fence(input), input);
    }

    #[test]
    fn clean_blank_lines_collapses_runs() {
        let input = "\n\nLine 1\n\n\n\n\nLine 2";
        assert_eq!(clean_blank_lines(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn clean_blank_lines_keeps_double() {
        let input = "Line 1\n\nLine 2";
        assert_eq!(clean_blank_lines(input), input);
    }

    #[test]
    fn normalize_whitespace_trims_trailing() {
        let input = "Line 1   \nLine 2\t\nLine 3";
        assert_eq!(normalize_whitespace(input), "Line 1\nLine 2\nLine 3");
    }

    #[test]
    fn ensure_trailing_newline_normalizes_multiple() {
        assert_eq!(ensure_trailing_newline("Content"), "Content\n");
        assert_eq!(ensure_trailing_newline("Content\n\n\n"), "Content\n");
    }

    #[test]
    fn full_pipeline_tidies_model_output() {
        let input = "```md\r\n## Section  \r\n\r\n\r\n\r\nBody [IMAGE_1]\r\n```\r\n";
        let result = run_pipeline(input);
        assert_eq!(result, "## Section\n\nBody [IMAGE_1]\n");
    }
}
