//! Dotted-path lookup into [`serde_json::Value`] trees.
//!
//! Shared by the template interpolation engine and by node dispatch (for
//! resolving `${node.path}` style references against stored node outputs).
//! A path is a sequence of `.`-separated segments; a segment that parses as
//! a `usize` indexes into a JSON array, otherwise it indexes into a JSON
//! object by key.

use serde_json::Value;

/// Look up a dotted path (e.g. `"llm-1.text"`, `"parse.parsed[0].id"`)
/// inside a JSON value, returning `None` if any segment is missing.
///
/// Bracketed numeric indices (`foo[0]`) and plain dotted segments are both
/// supported; a bare numeric segment (`foo.0`) is equivalent to `foo[0]`.
#[must_use]
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_path(path) {
        current = match segment {
            PathSegment::Key(key) => current.as_object()?.get(key)?,
            PathSegment::Index(index) => current.as_array()?.get(index)?,
        };
    }
    Some(current)
}

enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Split a dotted/bracketed path into its segments, in order.
fn split_path(path: &str) -> Vec<PathSegment<'_>> {
    let mut segments = Vec::new();
    for dotted in path.split('.') {
        if dotted.is_empty() {
            continue;
        }
        let mut rest = dotted;
        // Pull a leading `key` off before any `[..]` groups.
        if let Some(bracket_pos) = rest.find('[') {
            let (key, tail) = rest.split_at(bracket_pos);
            if !key.is_empty() {
                segments.push(PathSegment::Key(key));
            }
            rest = tail;
            while let Some(end) = rest.find(']') {
                let inside = &rest[1..end];
                if let Ok(index) = inside.parse::<usize>() {
                    segments.push(PathSegment::Index(index));
                } else if !inside.is_empty() {
                    segments.push(PathSegment::Key(inside));
                }
                rest = &rest[end + 1..];
            }
        } else if let Ok(index) = rest.parse::<usize>() {
            segments.push(PathSegment::Index(index));
        } else {
            segments.push(PathSegment::Key(rest));
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn looks_up_nested_object_path() {
        let value = json!({"llm-1": {"text": "hello"}});
        assert_eq!(lookup_path(&value, "llm-1.text"), Some(&json!("hello")));
    }

    #[test]
    fn looks_up_array_index_with_brackets() {
        let value = json!({"parse": {"parsed": [{"id": 1}, {"id": 2}]}});
        assert_eq!(
            lookup_path(&value, "parse.parsed[0].id"),
            Some(&json!(1))
        );
    }

    #[test]
    fn looks_up_array_index_with_dot() {
        let value = json!({"items": ["a", "b"]});
        assert_eq!(lookup_path(&value, "items.1"), Some(&json!("b")));
    }

    #[test]
    fn missing_path_returns_none() {
        let value = json!({"a": 1});
        assert_eq!(lookup_path(&value, "a.b.c"), None);
        assert_eq!(lookup_path(&value, "missing"), None);
    }

    #[test]
    fn empty_path_returns_root() {
        let value = json!({"a": 1});
        assert_eq!(lookup_path(&value, ""), Some(&value));
    }

    #[test]
    fn out_of_bounds_index_returns_none() {
        let value = json!({"items": ["a"]});
        assert_eq!(lookup_path(&value, "items[5]"), None);
    }
}
