//! Keyword CSV export.

use draftwright_shared::Keyword;

/// Fixed column order of the keyword export.
pub const KEYWORD_CSV_HEADER: [&str; 6] =
    ["Term", "LSI Keywords", "Intent", "Search Volume", "KEI", "KGR"];

/// Escape one CSV field: wrap in quotes when it contains a comma, quote or
/// newline, doubling any embedded quotes.
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render keywords as CSV with a header row. Rows are `\n`-terminated.
pub fn keywords_csv(keywords: &[Keyword]) -> String {
    let mut out = String::new();
    push_row(&mut out, KEYWORD_CSV_HEADER.iter().map(|h| h.to_string()));

    for kw in keywords {
        push_row(
            &mut out,
            [
                kw.term.clone(),
                kw.lsi_keywords.join(", "),
                kw.intent.to_string(),
                kw.search_volume.to_string(),
                kw.kei.to_string(),
                kw.kgr.to_string(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row: Vec<String> = fields.into_iter().map(|f| csv_escape(&f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}
