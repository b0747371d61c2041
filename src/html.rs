use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

// Only things that look like real tags; a bare "<" in prose survives.
static RE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)</?[A-Za-z][A-Za-z0-9:-]*(?:\s+[^<>]*?)?/?>|<![A-Za-z][^>]*>|<\?[^>]*\?>"#).unwrap()
});

// Legacy entities browsers accept without the closing semicolon, e.g. "&amp x".
static RE_LEGACY_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?P<name>amp|lt|gt|quot|nbsp|copy|reg)(?P<rest>[^;A-Za-z0-9]|$)").unwrap()
});

/// Resolves named (full HTML5 table) and numeric character references to their
/// text. Unknown names are left untouched.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    match RE_LEGACY_ENTITY.replace_all(input, "&${name};${rest}") {
        Cow::Borrowed(s) => html_escape::decode_html_entities(s),
        Cow::Owned(s) => Cow::Owned(html_escape::decode_html_entities(&s).into_owned()),
    }
}

/// Plain text of an HTML fragment: comments and tags dropped, entities resolved.
pub fn strip_html(input: &str) -> String {
    if !input.contains('<') && !input.contains('&') {
        return input.to_string();
    }
    let s = RE_COMMENT.replace_all(input, "");
    let s = RE_TAG.replace_all(&s, "");
    decode_entities(&s).into_owned()
}
