//! Lightweight markup queries over HTML pages and fragments.
//!
//! Not a full HTML parser: just enough tag and attribute matching to answer
//! "is there an element with id X" and to pull text out of known elements.

use std::sync::LazyLock;

use regex::{Captures, Regex};

// Quoted attribute values may contain `>`, e.g. `data-action="click->menu#toggle"`.
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<([a-z][a-z0-9-]*)\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("open tag regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:][a-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("attribute regex")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("tag regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity regex")
});

/// An opening tag found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name.
    pub name: String,
    /// Attributes in source order, names lowercased, values entity-decoded.
    pub attributes: Vec<(String, String)>,
    /// Byte offset just past the closing `>` of the opening tag.
    pub end: usize,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// True if the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// All opening tags named `name` (case-insensitive), in document order.
pub fn tags<'a>(html: &'a str, name: &'a str) -> impl Iterator<Item = Tag> + 'a {
    OPEN_TAG.captures_iter(html).filter_map(move |caps| {
        let tag_name = caps.get(1)?.as_str();
        if !tag_name.eq_ignore_ascii_case(name) {
            return None;
        }
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        Some(Tag {
            name: tag_name.to_ascii_lowercase(),
            attributes: parse_attributes(attrs),
            end: caps.get(0)?.end(),
        })
    })
}

/// Whether any element in `html` carries `id="<id>"`.
pub fn has_element_with_id(html: &str, id: &str) -> bool {
    OPEN_TAG.captures_iter(html).any(|caps| {
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        parse_attributes(attrs)
            .iter()
            .any(|(k, v)| k == "id" && v == id)
    })
}

/// Inner markup of the element whose opening tag ends at `tag.end`, up to
/// the first matching close tag. Nested elements of the same name are not
/// balanced.
pub fn inner_html<'a>(html: &'a str, tag: &Tag) -> &'a str {
    let rest = &html[tag.end..];
    let close = format!("</{}", tag.name);
    let lower = rest.to_ascii_lowercase();
    match lower.find(&close) {
        Some(idx) => &rest[..idx],
        None => rest,
    }
}

/// Text content of a markup fragment: tags removed, entities decoded.
pub fn text(fragment: &str) -> String {
    decode_entities(&ANY_TAG.replace_all(fragment, ""))
}

/// Decode named and numeric character references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some((name, decode_entities(value)))
        })
        .collect()
}
