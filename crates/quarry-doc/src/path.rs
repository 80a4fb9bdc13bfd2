use bson::{Bson, Document};
use indexmap::IndexSet;

use crate::error::PathError;
use crate::node::Node;

/// Deepest container nesting the flattener will descend into.
///
/// MongoDB itself rejects documents nested deeper than 100 levels, so this
/// only trips on documents that did not come from a server.
pub const MAX_DEPTH: usize = 128;

/// Collect the dotted path of every leaf in `doc`.
///
/// A leaf is a scalar, or an array whose elements are all scalars (the
/// array is addressed as a whole, never per index). Nested documents
/// contribute their leaves under `parent.key`; array elements that are
/// containers contribute theirs under `parent.key.<index>`.
///
/// Paths come back in depth-first document order with duplicates removed.
///
/// ```text
/// { a: { b: 1, c: 2 } }   -> a.b, a.c
/// { a: [1, 2, 3] }        -> a
/// { a: [{ x: 1 }, 2] }    -> a.0.x
/// ```
///
/// In the last case one container element anywhere in an array suppresses
/// the whole-array path, and its scalar siblings are not addressed at all.
pub fn leaf_paths(doc: &Document) -> Result<IndexSet<String>, PathError> {
    let mut paths = IndexSet::new();
    collect_mapping(doc, None, 0, &mut paths)?;
    Ok(paths)
}

fn collect_mapping(
    doc: &Document,
    parent: Option<&str>,
    depth: usize,
    out: &mut IndexSet<String>,
) -> Result<(), PathError> {
    for (key, value) in doc {
        let path = match parent {
            Some(parent) => format!("{parent}.{key}"),
            None => key.clone(),
        };
        match Node::of(value) {
            Node::Mapping(sub) => {
                let depth = descend(&path, depth)?;
                collect_mapping(sub, Some(&path), depth, out)?;
            }
            Node::Sequence(items) => collect_sequence(items, path, depth, out)?,
            Node::Scalar(_) => {
                out.insert(path);
            }
        }
    }
    Ok(())
}

fn collect_sequence(
    items: &[Bson],
    path: String,
    depth: usize,
    out: &mut IndexSet<String>,
) -> Result<(), PathError> {
    if !items.iter().any(|item| Node::of(item).is_container()) {
        out.insert(path);
        return Ok(());
    }

    let depth = descend(&path, depth)?;
    for (index, item) in items.iter().enumerate() {
        let item_path = format!("{path}.{index}");
        match Node::of(item) {
            Node::Mapping(sub) => collect_mapping(sub, Some(&item_path), depth, out)?,
            Node::Sequence(inner) => collect_sequence(inner, item_path, depth, out)?,
            // Scalars sharing an array with containers get no path.
            Node::Scalar(_) => {}
        }
    }
    Ok(())
}

fn descend(path: &str, depth: usize) -> Result<usize, PathError> {
    if depth >= MAX_DEPTH {
        return Err(PathError::TooDeep {
            path: path.to_string(),
            limit: MAX_DEPTH,
        });
    }
    Ok(depth + 1)
}

/// Resolve a dotted path against `doc`.
///
/// Segments are applied left to right from the root: a key lookup while
/// the current value is a document, a decimal index while it is an array.
/// Walking stops early when the current value is neither, and that value
/// is returned as-is.
///
/// A missing key resolves to `Ok(None)` rather than an error. An index
/// past the end of an array, or a segment that is not a number where an
/// index is expected, is an error.
pub fn resolve<'a>(doc: &'a Document, path: &str) -> Result<Option<&'a Bson>, PathError> {
    let mut segments = path.split('.');
    let mut current = match segments.next().and_then(|key| doc.get(key)) {
        Some(value) => value,
        None => return Ok(None),
    };

    for segment in segments {
        current = match current {
            Bson::Document(sub) => match sub.get(segment) {
                Some(value) => value,
                None => return Ok(None),
            },
            Bson::Array(items) => {
                let index: usize = segment.parse().map_err(|_| PathError::InvalidIndex {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?;
                items.get(index).ok_or_else(|| PathError::IndexOutOfRange {
                    path: path.to_string(),
                    index,
                    len: items.len(),
                })?
            }
            _ => break,
        };
    }
    Ok(Some(current))
}
