//! Text handling for generated articles.
//!
//! - [`word_count`] / [`reading_time`]: text metrics for the assembled body
//! - [`image_embed`] / [`feature_embed`]: block-level image fragments
//! - [`tidy_generated`]: cleanup passes for model-written article parts
//! - [`build_frontmatter`]: YAML frontmatter for exported documents

mod cleanup;
mod embed;
mod metrics;

use tracing::debug;

pub use embed::{feature_embed, image_embed, placeholder};
pub use metrics::{reading_time, strip_markup, word_count};

/// Tidy a generated article part before it becomes an editable draft.
///
/// Removes a code fence wrapping the whole response, normalizes line endings
/// and trailing whitespace, collapses blank-line runs and ends with exactly
/// one newline.
pub fn tidy_generated(text: &str) -> String {
    let tidied = cleanup::run_pipeline(text);
    debug!(before = text.len(), after = tidied.len(), "tidied generated text");
    tidied
}

/// Build a YAML frontmatter block from ordered key/value pairs.
pub fn build_frontmatter(fields: &[(&str, String)]) -> String {
    let mut fm = String::from("---\n");
    for (key, value) in fields {
        fm.push_str(&format!("{key}: \"{}\"\n", escape_yaml_string(value)));
    }
    fm.push_str("---\n");
    fm
}

/// Escape special characters in a YAML string value.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
