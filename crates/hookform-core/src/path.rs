#![forbid(unsafe_code)]

//! Field-name paths.
//!
//! A field name such as `users[0].email` or `users.0.email` addresses a slot
//! inside the form's value tree. Both spellings split into the same segments:
//! `["users", "0", "email"]`.

use crate::value::{FieldValue, MAX_ARRAY_INDEX};

/// Whether `name` is a plain key (`\w*`) rather than a path.
#[must_use]
pub fn is_key(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Whether a segment addresses an array slot.
#[inline]
#[must_use]
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Split a field name into its segments. Separators are `.`, `[`, `]` and
/// `,`; quotes around bracketed keys are dropped and empty segments skipped.
#[must_use]
pub fn split_path(name: &str) -> Vec<&str> {
    name.split(['.', '[', ']', ','])
        .map(|segment| segment.trim_matches(['"', '\'']))
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Read the value at `name`.
///
/// Walks the segments from `root`. A `Null` met on the way ends the walk with
/// `Null`. When the walk finds nothing, `name` is retried as a literal key of
/// `root`, so flat stores keyed by full names still resolve.
#[must_use]
pub fn get(root: &FieldValue, name: &str) -> Option<FieldValue> {
    if name.is_empty() {
        return None;
    }
    let mut current = root.clone();
    let mut resolved = true;
    for segment in split_path(name) {
        if current.is_null() {
            break;
        }
        match current.child(segment) {
            Some(next) => current = next,
            None => {
                resolved = false;
                break;
            }
        }
    }
    if resolved && !current.is_same(root) {
        return Some(current);
    }
    root.child(name)
}

/// Write `value` at `name`, creating intermediate containers as needed.
///
/// Existing object and array intermediates are kept. A missing or scalar
/// intermediate becomes an array when the next segment is an index and an
/// object otherwise. Returns `false`, leaving the store unchanged, when the
/// value could not be stored: empty name, `root` not a container, a non-index
/// segment into an existing array, or an index above [`MAX_ARRAY_INDEX`].
pub fn set_path(root: &FieldValue, name: &str, value: FieldValue) -> bool {
    if name.is_empty() {
        return false;
    }
    let segments = if is_key(name) {
        vec![name]
    } else {
        split_path(name)
    };
    let oversized = segments.iter().any(|segment| {
        is_index(segment) && !matches!(segment.parse::<usize>(), Ok(i) if i <= MAX_ARRAY_INDEX)
    });
    if oversized {
        return false;
    }
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = root.clone();
    for (depth, segment) in parents.iter().enumerate() {
        let next_is_index = is_index(segments[depth + 1]);
        let existing = current
            .child(segment)
            .filter(|child| matches!(child, FieldValue::Object(_) | FieldValue::Array(_)));
        let next = match existing {
            Some(child) => child,
            None => {
                let fresh = if next_is_index {
                    FieldValue::array([])
                } else {
                    FieldValue::object()
                };
                if !current.put(segment, fresh.clone()) {
                    return false;
                }
                fresh
            }
        };
        current = next;
    }
    current.put(last, value)
}

/// Remove the value at `name` and prune parents left empty by the removal.
///
/// Object keys are removed outright; array slots become `Null` so sibling
/// indices stay stable. Returns whether anything was removed.
pub fn unset_path(root: &FieldValue, name: &str) -> bool {
    let segments = if is_key(name) {
        vec![name]
    } else {
        split_path(name)
    };
    if segments.is_empty() {
        return false;
    }

    // containers[i] holds segments[i]
    let mut containers = Vec::with_capacity(segments.len());
    let mut current = root.clone();
    for segment in &segments[..segments.len() - 1] {
        let Some(next) = current.child(segment) else {
            return false;
        };
        containers.push(current);
        current = next;
    }
    containers.push(current);

    let mut removed = false;
    for (container, segment) in containers.iter().zip(&segments).rev() {
        if removed && !container.child(segment).is_some_and(|c| c.is_empty_container()) {
            break;
        }
        if !remove_child(container, segment) {
            break;
        }
        removed = true;
    }
    removed
}

fn remove_child(container: &FieldValue, key: &str) -> bool {
    match container {
        FieldValue::Object(map) => map.borrow_mut().shift_remove(key).is_some(),
        FieldValue::Array(items) => {
            let Ok(index) = key.parse::<usize>() else {
                return false;
            };
            let mut items = items.borrow_mut();
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = FieldValue::Null;
                    true
                }
                None => false,
            }
        }
        _ => false,
    }
}
