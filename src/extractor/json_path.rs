//! Dotted paths into JSON documents.
//!
//! Supported syntax:
//! - `a.b.c` walks object keys
//! - `items.0` indexes arrays
//! - `items.#` is the length of an array
//! - `items.#.title` collects `title` from every element
//! - `@this` is the current value, so a top-level array is selected with `@this`
//! - `\.` escapes a literal dot inside a key

use std::borrow::Cow;

use serde_json::Value;

/// Look up `path` in `root`. An empty path matches nothing.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<Cow<'a, Value>> {
    if path.is_empty() {
        return None;
    }
    walk(root, &split_path(path))
}

/// Scalar text of a value: strings verbatim, numbers and booleans
/// stringified, null empty, containers as compact JSON.
pub fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn walk<'a>(value: &'a Value, segments: &[String]) -> Option<Cow<'a, Value>> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(Cow::Borrowed(value));
    };

    if head == "@this" {
        return walk(value, rest);
    }

    match value {
        Value::Array(elements) if head == "#" => {
            if rest.is_empty() {
                return Some(Cow::Owned(Value::from(elements.len())));
            }
            let collected = elements
                .iter()
                .filter_map(|element| walk(element, rest))
                .map(Cow::into_owned)
                .collect();
            Some(Cow::Owned(Value::Array(collected)))
        }
        Value::Array(elements) => head
            .parse::<usize>()
            .ok()
            .and_then(|index| elements.get(index))
            .and_then(|element| walk(element, rest)),
        Value::Object(map) => map.get(head.as_str()).and_then(|v| walk(v, rest)),
        _ => None,
    }
}

fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}
