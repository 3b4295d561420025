//! Markdown export of a saved document.

use chrono::{DateTime, Utc};
use draftwright_markdown::build_frontmatter;
use draftwright_shared::Document;

/// Render a document body behind a frontmatter block.
pub fn document_markdown(document: &Document, created_at: DateTime<Utc>) -> String {
    let fm = build_frontmatter(&[
        ("title", document.title.clone()),
        ("meta_description", document.meta_description.clone()),
        ("created_at", created_at.to_rfc3339()),
        ("word_count", document.word_count.to_string()),
        ("reading_minutes", document.reading_minutes.to_string()),
    ]);

    let body = document.body.trim_end_matches('\n');
    format!("{fm}\n{body}\n")
}

/// File name for an exported document: a slug of the title, or `document`.
pub fn document_filename(document: &Document) -> String {
    let slug: String = document
        .title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "document.md".to_string()
    } else {
        format!("{slug}.md")
    }
}
