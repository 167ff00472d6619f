#![forbid(unsafe_code)]

//! Focus the first field matching a predicate.
//!
//! Used to move focus to the first invalid field after validation. The walk
//! is first-match: it stops at the first field that satisfies the predicate
//! and has something to focus, even when that focus call does nothing
//! visible.

use std::ops::ControlFlow;

use crate::field::{ElementHandle, FieldNode, FieldTree};
#[cfg(feature = "tracing")]
use crate::logging::debug;
#[cfg(not(feature = "tracing"))]
use crate::debug;

/// The UI host's side of focus dispatch.
pub trait ElementHost {
    /// Whether `handle` exposes a focus action.
    fn can_focus(&self, handle: ElementHandle) -> bool;

    /// Run the element's focus action.
    fn focus(&mut self, handle: ElementHandle);
}

/// Walk `fields` in key order and focus the first field whose name satisfies
/// `predicate`. Returns that field's name.
pub fn focus_field_by<P>(
    fields: &FieldTree,
    host: &mut dyn ElementHost,
    mut predicate: P,
) -> Option<String>
where
    P: FnMut(&str) -> bool,
{
    match walk(fields, host, &mut predicate) {
        ControlFlow::Break(name) => Some(name),
        ControlFlow::Continue(()) => None,
    }
}

/// Like [`focus_field_by`], but only visits `names`, in the given order.
/// Groups reached through a name are walked completely.
pub fn focus_field_by_names<P, I, S>(
    fields: &FieldTree,
    host: &mut dyn ElementHost,
    mut predicate: P,
    names: I,
) -> Option<String>
where
    P: FnMut(&str) -> bool,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for name in names {
        let Some(node) = fields.get(name.as_ref()) else {
            continue;
        };
        if let ControlFlow::Break(found) = visit(node, host, &mut predicate) {
            return Some(found);
        }
    }
    None
}

fn walk(
    fields: &FieldTree,
    host: &mut dyn ElementHost,
    predicate: &mut dyn FnMut(&str) -> bool,
) -> ControlFlow<String> {
    for (_, node) in fields.iter() {
        visit(node, host, predicate)?;
    }
    ControlFlow::Continue(())
}

fn visit(
    node: &FieldNode,
    host: &mut dyn ElementHost,
    predicate: &mut dyn FnMut(&str) -> bool,
) -> ControlFlow<String> {
    match node {
        FieldNode::Group(group) => walk(group, host, predicate),
        FieldNode::Field(meta) => {
            if !predicate(meta.name.as_str()) {
                return ControlFlow::Continue(());
            }
            let target = match meta.element {
                Some(element) if host.can_focus(element) => Some(element),
                _ => meta.refs.first().copied(),
            };
            match target {
                Some(handle) => {
                    debug!(field = %meta.name, element = handle.index(), "focusing field");
                    host.focus(handle);
                    ControlFlow::Break(meta.name.clone())
                }
                None => ControlFlow::Continue(()),
            }
        }
    }
}
