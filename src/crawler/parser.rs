//! Selector-driven HTML parser
//!
//! Matching works on class tokens rather than CSS selectors:
//! - a single token matches an element carrying that token among its classes
//! - a token containing whitespace matches an element whose whole class
//!   attribute (whitespace-normalized) equals it
//! - an empty token matches nothing
//!
//! Everything here is pure: no network, no shared state.

use scraper::{ElementRef, Html};
use url::Url;

/// A parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses page content; malformed markup is recovered, never rejected
    pub fn parse(content: &str) -> Self {
        Self {
            html: Html::parse_document(content),
        }
    }

    /// All elements matching the class token, in document order
    pub fn find_all(&self, token: &str) -> Vec<ElementRef<'_>> {
        find_in(self.html.root_element(), None, token)
    }

    /// The first element matching the class token
    pub fn find_first(&self, token: &str) -> Option<ElementRef<'_>> {
        find_in(self.html.root_element(), None, token)
            .into_iter()
            .next()
    }

    /// All `tag` elements matching the class token, in document order
    pub fn find_all_tagged(&self, tag: &str, token: &str) -> Vec<ElementRef<'_>> {
        find_in(self.html.root_element(), Some(tag), token)
    }

    /// The first `tag` element matching the class token
    pub fn find_first_tagged(&self, tag: &str, token: &str) -> Option<ElementRef<'_>> {
        self.find_all_tagged(tag, token).into_iter().next()
    }
}

fn find_in<'a>(
    scope: ElementRef<'a>,
    tag: Option<&str>,
    token: &str,
) -> Vec<ElementRef<'a>> {
    if token.trim().is_empty() {
        return Vec::new();
    }

    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| tag.map_or(true, |t| element.value().name() == t))
        .filter(|element| matches_class_token(element.value().attr("class"), token))
        .collect()
}

/// Returns true if a class attribute value matches the token
pub fn matches_class_token(class_attr: Option<&str>, token: &str) -> bool {
    let Some(class_attr) = class_attr else {
        return false;
    };

    let token = token.trim();
    if token.is_empty() {
        return false;
    }

    if token.contains(char::is_whitespace) {
        class_attr.split_whitespace().eq(token.split_whitespace())
    } else {
        class_attr.split_whitespace().any(|class| class == token)
    }
}

/// Descendant elements (excluding `scope` itself) with one of the tag names
pub fn descendants_named<'a>(scope: ElementRef<'a>, names: &[&str]) -> Vec<ElementRef<'a>> {
    scope
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|element| names.contains(&element.value().name()))
        .collect()
}

/// Normalized text of an element
///
/// All descendant text joined, whitespace runs collapsed to a single space,
/// leading and trailing whitespace removed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Raw attribute value of an element
pub fn element_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Resolves an href against the page it was found on
///
/// Returns None for empty values, fragment-only links, non-HTTP(S) schemes
/// and values that do not form a URL.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
