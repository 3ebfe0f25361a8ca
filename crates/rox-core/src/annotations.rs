//! `@rox(...)` annotation markers embedded in test names.
//!
//! A marker carries whitespace-separated `key=value` tokens, e.g.
//! `it works @rox(key=abc category=api tag=slow tag=db ticket=JIRA-12)`.
//! A name may contain any number of markers; all of them are parsed and
//! stripped from the display name.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Leading whitespace is part of the marker so stripping does not leave
    // double spaces behind.
    static ref MARKER: Regex = Regex::new(r"\s*@rox\(([^()]*)\)").unwrap();
}

/// Structured metadata extracted from a test name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub key: Option<String>,
    pub category: Option<String>,
    /// Ordered, deduplicated.
    pub tags: Vec<String>,
    /// Ordered, deduplicated.
    pub tickets: Vec<String>,
}

/// Parses all annotation markers out of `name`.
///
/// Returns the accumulated annotation and the name with every marker (and
/// the whitespace immediately before it) removed. Pure: no state is shared
/// between calls. When several markers set `key=` or `category=`, the last
/// marker that provides a value wins.
pub fn parse_annotations(name: &str) -> (Annotation, String) {
    let mut annotation = Annotation::default();

    for caps in MARKER.captures_iter(name) {
        for token in caps[1].split_whitespace() {
            if let Some(value) = token_value(token, "key=") {
                annotation.key = Some(value.to_owned());
            } else if let Some(value) = token_value(token, "category=") {
                annotation.category = Some(value.to_owned());
            } else if let Some(value) = token_value(token, "tag=") {
                push_unique(&mut annotation.tags, value);
            } else if let Some(value) = token_value(token, "ticket=") {
                push_unique(&mut annotation.tickets, value);
            }
            // Unknown tokens are ignored.
        }
    }

    let stripped = MARKER.replace_all(name, "").into_owned();
    (annotation, stripped)
}

/// Strips the prefix and any surrounding quotes; empty values are dropped.
fn token_value<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let value = token
        .strip_prefix(prefix)?
        .trim_matches(|c| c == '"' || c == '\'');
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_owned());
    }
}
