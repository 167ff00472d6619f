#![forbid(unsafe_code)]

//! Watch resolution and the names registry.
//!
//! [`generate_watch_output`] reads one name, several names, or the whole
//! value store. In global mode it also records what was read in the form's
//! [`NamesRegistry`], so later changes to those names re-render the form.

use ahash::AHashSet;
use indexmap::IndexSet;

#[cfg(feature = "tracing")]
use crate::logging::trace;
use crate::path::get;
#[cfg(not(feature = "tracing"))]
use crate::trace;
use crate::value::FieldValue;

/// Per-form bookkeeping of field names.
///
/// Created empty with the form. `watch` and `watch_all` only grow; a form
/// reset replaces the whole registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamesRegistry {
    /// Registered (mounted) names, in registration order.
    pub mount: IndexSet<String>,
    /// Names whose elements went away and await removal.
    pub unmount: IndexSet<String>,
    /// Names under global watch.
    pub watch: AHashSet<String>,
    /// Whether the whole value store is under global watch.
    pub watch_all: bool,
    /// Field to focus on the next render.
    pub focus: Option<String>,
}

impl NamesRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a change to `name` concerns a global watcher.
    ///
    /// Blur events never do. Otherwise `name` is watched when everything is,
    /// when it is watched itself, or when a watched name is a parent path of
    /// it (`user` covers `user.email`, but not `username`).
    #[must_use]
    pub fn is_watched(&self, name: &str, is_blur: bool) -> bool {
        if is_blur {
            return false;
        }
        self.watch_all
            || self.watch.contains(name)
            || self.watch.iter().any(|watched| {
                name.strip_prefix(watched.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
            })
    }
}

/// What to watch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum WatchNames {
    #[default]
    All,
    One(String),
    Many(Vec<String>),
}

impl From<&str> for WatchNames {
    fn from(name: &str) -> Self {
        Self::One(name.to_owned())
    }
}

impl From<String> for WatchNames {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for WatchNames {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<Vec<&str>> for WatchNames {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for WatchNames {
    fn from(names: &[&str]) -> Self {
        Self::Many(names.iter().map(|name| (*name).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for WatchNames {
    fn from(names: [&str; N]) -> Self {
        Self::Many(names.iter().map(|name| (*name).to_owned()).collect())
    }
}

/// Result of a watch, shaped like the request.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchOutput {
    One(Option<FieldValue>),
    Many(Vec<Option<FieldValue>>),
    /// The value store itself, shared rather than copied.
    All(FieldValue),
}

impl WatchOutput {
    /// The single watched value, if this was a single-name watch that found one.
    #[must_use]
    pub fn into_one(self) -> Option<FieldValue> {
        match self {
            Self::One(value) => value,
            _ => None,
        }
    }

    #[must_use]
    pub fn into_many(self) -> Vec<Option<FieldValue>> {
        match self {
            Self::Many(values) => values,
            Self::One(value) => vec![value],
            Self::All(values) => vec![Some(values)],
        }
    }
}

/// Resolve `names` against `values`.
///
/// With `is_global`, every looked-up name is added to `registry.watch` (one
/// at a time, interleaved with the lookups) and a whole-store watch sets
/// `registry.watch_all`. Without it the registry is left untouched.
pub fn generate_watch_output(
    names: &WatchNames,
    registry: &mut NamesRegistry,
    values: &FieldValue,
    is_global: bool,
) -> WatchOutput {
    match names {
        WatchNames::One(name) => {
            if is_global {
                registry.watch.insert(name.clone());
            }
            WatchOutput::One(get(values, name))
        }
        WatchNames::Many(names) => WatchOutput::Many(
            names
                .iter()
                .map(|name| {
                    if is_global {
                        registry.watch.insert(name.clone());
                    }
                    get(values, name)
                })
                .collect(),
        ),
        WatchNames::All => {
            if is_global {
                trace!("watching every field");
                registry.watch_all = true;
            }
            WatchOutput::All(values.clone())
        }
    }
}
