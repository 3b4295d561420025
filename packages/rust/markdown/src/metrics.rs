//! Word count and reading-time estimation for article text.

use std::sync::LazyLock;

use regex::Regex;

/// Strip markup that should not count as prose: image placeholders and embed
/// tags, Markdown images, link syntax (link text is kept), heading markers,
/// and emphasis/strike/code markers. Whitespace is collapsed to single spaces.
///
/// Removing one marker can expose another (`#* Title`, `[a]*(x)`), so the
/// passes repeat until the text stops changing.
pub fn strip_markup(text: &str) -> String {
    let mut current = strip_pass(text);
    loop {
        let next = strip_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_pass(text: &str) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\[IMAGE_\d+\]").expect("valid regex"));
    static IMG_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex"));
    static HTML_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid regex"));
    static MD_IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[.*?\]\(.*?\)").expect("valid regex"));
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("valid regex"));
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"#{1,6}\s+").expect("valid regex"));
    static EMPHASIS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*\*|__|\*|_|~~|`{1,3}").expect("valid regex"));
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let text = PLACEHOLDER_RE.replace_all(text, " ");
    let text = IMG_TAG_RE.replace_all(&text, " ");
    let text = HTML_TAG_RE.replace_all(&text, " ");
    let text = MD_IMAGE_RE.replace_all(&text, " ");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = HEADING_RE.replace_all(&text, "");
    let text = EMPHASIS_RE.replace_all(&text, "");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Count `\b\w+\b` tokens in the text after [`strip_markup`].
pub fn word_count(text: &str) -> usize {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

    WORD_RE.find_iter(&strip_markup(text)).count()
}

/// Minutes needed to read `words` at `words_per_minute`, rounded up.
///
/// Zero words is zero minutes. A zero reading speed also yields zero rather
/// than dividing by it.
pub fn reading_time(words: usize, words_per_minute: u32) -> u32 {
    if words == 0 || words_per_minute == 0 {
        return 0;
    }
    let minutes = words.div_ceil(words_per_minute as usize);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
