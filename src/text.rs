//! Text reshaping helpers: HTML stripping and title casing.

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

fn see_also_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.Zie ook").expect("static regex"))
}

fn mojibake_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("â\u{80}\u{99}|â").expect("static regex"))
}

fn glued_sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\.\b").expect("static regex"))
}

/// Strip all HTML tags from a fragment, keeping block-ish separation.
///
/// Text nodes are trimmed and joined with blank lines, then a couple of
/// recurring artifacts from the upstream CMS export are cleaned up.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let text = see_also_re().replace_all(&text, ". Zie ook: ");
    let text = mojibake_re().replace_all(&text, "'");
    glued_sentence_re().replace_all(&text, ". ").into_owned()
}

/// Capitalize the first character, leaving the rest of the text as-is.
pub fn sentence_case(text: &str, strip_spaces: bool) -> String {
    let text = if strip_spaces { text.trim() } else { text };
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Split an upstream title of the shape `Title: subtitle` into its parts.
///
/// Everything after the first `:` becomes the sentence-cased subtitle;
/// a title without `:` has no subtitle.
pub fn split_title(raw: &str) -> (String, Option<String>) {
    match raw.split_once(':') {
        Some((title, rest)) => (title.to_string(), Some(sentence_case(rest, true))),
        None => (raw.to_string(), None),
    }
}
