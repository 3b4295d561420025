//! Block-level image embed fragments for the merged article body.

const INLINE_STYLE: &str = "width: 100%; max-width: 800px; height: auto; border-radius: 8px; \
                            margin: 20px 0; display: block;";

const FEATURE_STYLE: &str = "width: 100%; max-width: 800px; height: auto; border-radius: 8px; \
                             margin-bottom: 24px; display: block;";

/// Embed fragment for the `index`-th (1-based) in-body image of a part.
///
/// The fragment is padded with blank lines so it renders as its own block
/// wherever it replaces a placeholder.
pub fn image_embed(url: &str, index: usize) -> String {
    format!(
        "\n\n<img src=\"{}\" alt=\"Article Image {index}\" style=\"{INLINE_STYLE}\" />\n\n",
        escape_attr(url)
    )
}

/// Embed fragment prepended to the body for the feature image.
pub fn feature_embed(url: &str) -> String {
    format!(
        "<img src=\"{}\" alt=\"Feature Image\" style=\"{FEATURE_STYLE}\" />\n\n",
        escape_attr(url)
    )
}

/// Placeholder token the generator is asked to emit for image `index`.
pub fn placeholder(index: usize) -> String {
    format!("[IMAGE_{index}]")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_embed_is_block_level() {
        let frag = image_embed("https://img.example.com/a.png", 2);
        assert!(frag.starts_with("\n\n<img src=\"https://img.example.com/a.png\""));
        assert!(frag.contains("alt=\"Article Image 2\""));
        assert!(frag.contains("max-width: 800px"));
        assert!(frag.contains("border-radius: 8px"));
        assert!(frag.ends_with("/>\n\n"));
    }

    #[test]
    fn feature_embed_uses_bottom_margin() {
        let frag = feature_embed("data:image/png;base64,AAAA");
        assert!(frag.starts_with("<img src=\"data:image/png;base64,AAAA\""));
        assert!(frag.contains("margin-bottom: 24px"));
        assert!(frag.ends_with("\n\n"));
    }

    #[test]
    fn embed_escapes_quotes_in_url() {
        let frag = feature_embed("https://x/\"onerror=\"a");
        assert!(!frag.contains("\"onerror=\""));
        assert!(frag.contains("&quot;onerror=&quot;"));
    }

    #[test]
    fn placeholder_format() {
        assert_eq!(placeholder(3), "[IMAGE_3]");
    }
}
