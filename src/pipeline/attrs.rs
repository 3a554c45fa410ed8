//! Attribute editing on a single captured opening tag.
//!
//! Every function here takes the text of one opening tag (`<div id="x">`,
//! with or without its closing `>`) and returns new text. Nothing outside
//! that fragment is ever looked at, which is what lets the patcher rewrite a
//! document without re-serialising it.
//!
//! Attribute names must be preceded by whitespace, so `alt` never matches
//! inside `data-alt`. Values may be double-quoted, single-quoted, or bare.

use regex::Regex;

/// Build the matcher for `name=value`, capturing the prefix (whitespace,
/// name as written, `=`) and the raw value including its quotes.
fn attribute_regex(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?i)(\s{}\s*=\s*)("[^"]*"|'[^']*'|[^\s"'>]+)"#,
        regex::escape(name)
    ))
    .expect("escaped attribute name is a valid pattern")
}

/// Strip one layer of matching quotes from a raw attribute value.
fn unquote(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// Quote `value` for an attribute, escaping the delimiter if it occurs.
fn quote(value: &str, delim: char) -> String {
    let escaped = match delim {
        '\'' => value.replace('\'', "&#39;"),
        _ => value.replace('"', "&quot;"),
    };
    format!("{delim}{escaped}{delim}")
}

/// Byte offset where a new attribute should be inserted: before the closing
/// `>` or `/>` and any whitespace preceding it, or at the very end.
fn insertion_point(tag: &str) -> usize {
    let mut end = tag.len();
    if tag.ends_with("/>") {
        end -= 2;
    } else if tag.ends_with('>') {
        end -= 1;
    }
    tag[..end].trim_end().len()
}

/// Read an attribute's value, without its quotes.
///
/// Returns `None` when the attribute is absent. A present-but-empty
/// attribute (`alt=""`) returns `Some("")`.
pub fn read_attribute(tag: &str, name: &str) -> Option<String> {
    attribute_regex(name)
        .captures(tag)
        .map(|caps| unquote(&caps[2]).to_string())
}

/// Set `name` to `value`.
///
/// An existing attribute is replaced where it stands, keeping the spelling
/// of its name and its quote style (bare values become double-quoted).
/// Otherwise ` name="value"` is appended before the tag's end.
pub fn upsert_attribute(tag: &str, name: &str, value: &str) -> String {
    let re = attribute_regex(name);
    if let Some(caps) = re.captures(tag) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let delim = match caps[2].chars().next() {
            Some('\'') => '\'',
            _ => '"',
        };
        let mut out = String::with_capacity(tag.len() + value.len());
        out.push_str(&tag[..whole.start]);
        out.push_str(&caps[1]);
        out.push_str(&quote(value, delim));
        out.push_str(&tag[whole.end..]);
        return out;
    }

    let at = insertion_point(tag);
    let mut out = String::with_capacity(tag.len() + name.len() + value.len() + 4);
    out.push_str(&tag[..at]);
    out.push(' ');
    out.push_str(name);
    out.push('=');
    out.push_str(&quote(value, '"'));
    out.push_str(&tag[at..]);
    out
}

/// Remove every occurrence of `name` (with its leading whitespace).
pub fn remove_attribute(tag: &str, name: &str) -> String {
    attribute_regex(name).replace_all(tag, "").into_owned()
}

/// Split a style attribute into its `prop: value` declarations.
///
/// Semicolons inside parentheses or quotes (e.g. a data URI inside `url()`)
/// do not split. Empty declarations are dropped and each one is trimmed.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        match (in_quote, c) {
            (Some(q), c) if c == q => in_quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => in_quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Replace `property` in an inline style declaration list.
///
/// Any existing declaration of `property` (case-insensitive) is dropped, the
/// new `property: value` is appended, and the list is re-serialised as
/// `a: b; c: d;`. The result always ends with a semicolon.
pub fn set_style_property(style: &str, property: &str, value: &str) -> String {
    let wanted = property.trim();
    let mut kept: Vec<String> = split_declarations(style)
        .into_iter()
        .filter(|decl| {
            let name = decl.split(':').next().unwrap_or("").trim();
            !name.eq_ignore_ascii_case(wanted)
        })
        .map(str::to_string)
        .collect();
    kept.push(format!("{wanted}: {value}"));
    format!("{};", kept.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_appends_missing_attribute() {
        assert_eq!(
            upsert_attribute(r#"<img class="x">"#, "src", "a.jpg"),
            r#"<img class="x" src="a.jpg">"#
        );
    }

    #[test]
    fn upsert_replaces_in_place() {
        assert_eq!(
            upsert_attribute(r#"<img src="old.jpg">"#, "src", "new.jpg"),
            r#"<img src="new.jpg">"#
        );
        assert_eq!(
            upsert_attribute(r#"<img src='old.jpg' alt="a">"#, "SRC", "new.jpg"),
            r#"<img src='new.jpg' alt="a">"#
        );
        assert_eq!(
            upsert_attribute(r#"<img width=10 alt="a">"#, "width", "20"),
            r#"<img width="20" alt="a">"#
        );
    }

    #[test]
    fn upsert_keeps_self_closing_slash_last() {
        assert_eq!(
            upsert_attribute(r#"<img class="x" />"#, "loading", "lazy"),
            r#"<img class="x" loading="lazy" />"#
        );
    }

    #[test]
    fn upsert_works_on_fragment_without_closing_bracket() {
        assert_eq!(
            upsert_attribute(r#"<div id="a""#, "data-x", "1"),
            r#"<div id="a" data-x="1""#
        );
    }

    #[test]
    fn upsert_requires_whitespace_boundary() {
        let tag = r#"<img data-src="lazy.jpg">"#;
        assert_eq!(
            upsert_attribute(tag, "src", "a.jpg"),
            r#"<img data-src="lazy.jpg" src="a.jpg">"#
        );
    }

    #[test]
    fn upsert_escapes_delimiter() {
        assert_eq!(
            upsert_attribute("<img>", "alt", r#"a "quoted" desk"#),
            r#"<img alt="a &quot;quoted&quot; desk">"#
        );
    }

    #[test]
    fn read_accepts_every_quote_style() {
        let tag = r#"<img a="one" b='two' c=three>"#;
        assert_eq!(read_attribute(tag, "a").as_deref(), Some("one"));
        assert_eq!(read_attribute(tag, "b").as_deref(), Some("two"));
        assert_eq!(read_attribute(tag, "c").as_deref(), Some("three"));
        assert_eq!(read_attribute(tag, "d"), None);
    }

    #[test]
    fn read_distinguishes_empty_from_absent() {
        assert_eq!(read_attribute(r#"<img alt="">"#, "alt").as_deref(), Some(""));
        assert_eq!(read_attribute(r#"<img data-alt="x">"#, "alt"), None);
    }

    #[test]
    fn remove_drops_attribute_and_leading_space() {
        assert_eq!(
            remove_attribute(r#"<div style="color: red" id="a">"#, "style"),
            r#"<div id="a">"#
        );
    }

    #[test]
    fn style_property_replaces_existing_declaration() {
        let out = set_style_property(
            "color: red; background-image: url(old.jpg);",
            "background-image",
            "url('new.jpg')",
        );
        assert_eq!(out, "color: red; background-image: url('new.jpg');");
        assert_eq!(out.matches("background-image").count(), 1);
    }

    #[test]
    fn style_property_on_empty_style() {
        assert_eq!(
            set_style_property("", "background-size", "cover"),
            "background-size: cover;"
        );
    }

    #[test]
    fn style_property_matches_case_insensitively_with_spaces() {
        assert_eq!(
            set_style_property("Background-Size : contain;color:red", "background-size", "cover"),
            "color:red; background-size: cover;"
        );
    }

    #[test]
    fn style_split_ignores_semicolons_inside_url() {
        let out = set_style_property(
            "mask: url('data:image/svg+xml;utf8,<svg/>'); color: red",
            "color",
            "blue",
        );
        assert_eq!(out, "mask: url('data:image/svg+xml;utf8,<svg/>'); color: blue;");
    }
}
