//! Path queries over JSON documents.
//!
//! A path is a list of segments separated by `.`; a literal dot inside a key
//! is escaped as `\.`. Numeric segments index arrays, `#` as the final segment
//! yields an array's length, `-1` appends on write, and `@this` addresses the
//! whole document.

use serde_json::{Map, Value as Json};

use crate::error::{FlowError, Result};

/// Token addressing the whole document.
pub const THIS: &str = "@this";

const LENGTH: &str = "#";
const APPEND: &str = "-1";

/// Most `null` slots a single write may pad an array with.
pub(crate) const MAX_PADDING: usize = 1024;

/// Splits a path into its segments. `@this` and the empty path yield no segments.
pub(crate) fn segments(path: &str) -> Vec<String> {
    let path = path.trim();
    if path.is_empty() || path == THIS {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

fn is_index(segment: &str) -> bool {
    segment == APPEND || (!segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
}

/// Looks up `segments` in `root`, cloning the addressed value.
pub(crate) fn get(root: &Json, segments: &[String]) -> Option<Json> {
    let mut current = root;
    for (i, segment) in segments.iter().enumerate() {
        match current {
            Json::Object(map) => current = map.get(segment)?,
            Json::Array(items) => {
                if segment == LENGTH && i + 1 == segments.len() {
                    return Some(Json::from(items.len()));
                }
                let index: usize = segment.parse().ok()?;
                current = items.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current.clone())
}

/// Writes `value` at `segments`, creating intermediate containers as needed.
pub(crate) fn set(root: &mut Json, segments: &[String], value: Json) -> Result<()> {
    let Some((segment, rest)) = segments.split_first() else {
        *root = value;
        return Ok(());
    };

    if !root.is_object() && !root.is_array() {
        *root = if is_index(segment) {
            Json::Array(Vec::new())
        } else {
            Json::Object(Map::new())
        };
    }

    match root {
        Json::Object(map) => {
            let child = map.entry(segment.clone()).or_insert(Json::Null);
            set(child, rest, value)
        }
        Json::Array(items) => {
            let index = if segment == APPEND {
                items.len()
            } else {
                segment.parse::<usize>().map_err(|_| {
                    FlowError::Message(format!("cannot set key {segment:?} on an array"))
                })?
            };
            if index.saturating_sub(items.len()) > MAX_PADDING {
                return Err(FlowError::Message(format!(
                    "index {index} is too far past the end of an array of {}",
                    items.len()
                )));
            }
            if index >= items.len() {
                items.resize(index + 1, Json::Null);
            }
            set(&mut items[index], rest, value)
        }
        _ => Err(FlowError::Message(format!(
            "cannot set key {segment:?} on a scalar"
        ))),
    }
}

/// Removes the value at `segments`. Returns false if nothing was there.
pub(crate) fn delete(root: &mut Json, segments: &[String]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        let next = match current {
            Json::Object(map) => map.get_mut(segment),
            Json::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return false,
        }
    }

    match current {
        Json::Object(map) => map.shift_remove(last).is_some(),
        Json::Array(items) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items.remove(i);
                true
            }
            _ => false,
        },
        _ => false,
    }
}
