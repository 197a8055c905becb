//! Rich text fields.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static EMBED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(img|iframe|video|audio|object|embed)\b").unwrap());
static BLANK_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)&(nbsp|#160|#xa0|#8203|zwsp);").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Editors leave markup such as `<p><br></p>` behind when cleared. Markup
/// with no visible text and no embedded media normalizes to `""`; anything
/// else is returned trimmed.
pub fn normalize_html(raw: &str) -> String {
    let trimmed = raw.trim();
    if EMBED.is_match(trimmed) {
        return trimmed.to_string();
    }
    let text = TAG.replace_all(trimmed, "");
    let text = BLANK_ENTITY.replace_all(&text, "");
    if text.trim().is_empty() {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Plain text preview for table cells, collapsed to single spaces and cut
/// to `max_chars`.
pub fn text_preview(html: &str, max_chars: usize) -> String {
    let text = TAG.replace_all(html, " ");
    let text = BLANK_ENTITY.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(text.trim(), " ");
    if text.chars().count() <= max_chars {
        return text.into_owned();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_markup_normalizes() {
        for empty in [
            "",
            "   ",
            "<p></p>",
            "<p><br></p>",
            "<p><br/></p>\n",
            "<div>&nbsp;</div>",
            "<p> </p><p><br></p>",
        ] {
            assert_eq!(normalize_html(empty), "", "{:?}", empty);
        }
    }

    #[test]
    fn test_content_kept() {
        assert_eq!(normalize_html("  <p>Emma</p> "), "<p>Emma</p>");
        assert_eq!(
            normalize_html(r#"<p><img src="x.png"></p>"#),
            r#"<p><img src="x.png"></p>"#
        );
    }

    #[test]
    fn test_text_preview() {
        assert_eq!(
            text_preview("<p>Emma   Woodhouse,</p><p>handsome</p>", 100),
            "Emma Woodhouse, handsome"
        );
        assert_eq!(text_preview("<b>Pride and Prejudice</b>", 5), "Pride…");
    }
}
