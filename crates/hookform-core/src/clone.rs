#![forbid(unsafe_code)]

//! Structural clone for default-value snapshots.
//!
//! [`structural_clone`] deep-copies arrays and objects so a snapshot taken at
//! form (re)initialization can't be changed through the caller's handles.
//!
//! # Rules
//!
//! | shape                  | result                                    |
//! |------------------------|-------------------------------------------|
//! | `Array`, `Object`      | new container, members cloned recursively |
//! | `Date`                 | new value, same instant                   |
//! | `Set`                  | new set, same members                     |
//! | `Opaque`               | same handle                               |
//! | container with a `Callable` member | the original container        |
//! | scalars, `Callable`    | returned as-is                            |
//!
//! The callable rule applies per container: a parent of a callable-bearing
//! container is still copied, it just holds the shared child. Inputs are
//! assumed acyclic.

use std::cell::RefCell;
use std::rc::Rc;

#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;
use crate::value::{FieldValue, Object};

/// Deep-copy `value` following the rules in the module docs.
#[must_use]
pub fn structural_clone(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Null
        | FieldValue::Bool(_)
        | FieldValue::Number(_)
        | FieldValue::Text(_)
        | FieldValue::Opaque(_)
        | FieldValue::Callable(_) => value.clone(),
        FieldValue::Date(instant) => FieldValue::Date(*instant),
        FieldValue::Set(members) => FieldValue::Set(Rc::new(RefCell::new(members.borrow().clone()))),
        FieldValue::Array(items) => {
            let items = items.borrow();
            if items.iter().any(FieldValue::is_callable) {
                trace!("array holds a callable; sharing instead of copying");
                return value.clone();
            }
            FieldValue::array(items.iter().map(structural_clone))
        }
        FieldValue::Object(map) => {
            let map = map.borrow();
            if map.values().any(FieldValue::is_callable) {
                trace!(keys = map.len(), "object holds a callable; sharing instead of copying");
                return value.clone();
            }
            let copy: Object = map
                .iter()
                .map(|(key, member)| (key.clone(), structural_clone(member)))
                .collect();
            FieldValue::Object(Rc::new(RefCell::new(copy)))
        }
    }
}
