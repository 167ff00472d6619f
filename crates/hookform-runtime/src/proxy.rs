#![forbid(unsafe_code)]

//! Read tracking over form-state snapshots, and the render gate built on it.
//!
//! A consumer reads form state only through a [`ProxyFormState`]. Every getter
//! records the property in the consumer's [`DependencySet`] before returning
//! it. [`should_render_form_state`] then lets an update through only when it
//! carries a property the consumer has read.
//!
//! # Invariants
//!
//! 1. A getter returns exactly the snapshot's value.
//! 2. After a getter call, its property is observed in every attached set.
//! 3. A forced check always renders.
//! 4. An unforced check renders iff the update carries an observed property.
//!    Properties absent from the update never count.

use std::rc::Rc;

use hookform_core::FieldErrors;
use indexmap::IndexSet;
use tracing::trace;

use crate::form_state::{DependencySet, FormState, FormStateFlags, FormStateUpdate};

/// Tracked view of one form-state snapshot.
#[derive(Clone, Debug)]
pub struct ProxyFormState {
    state: Rc<FormState>,
    deps: DependencySet,
    local: Option<DependencySet>,
}

impl ProxyFormState {
    #[must_use]
    pub fn new(state: Rc<FormState>, deps: DependencySet) -> Self {
        Self {
            state,
            deps,
            local: None,
        }
    }

    /// Also record reads in `local`.
    #[must_use]
    pub fn with_local(mut self, local: DependencySet) -> Self {
        self.local = Some(local);
        self
    }

    fn track(&self, key: FormStateFlags) {
        self.deps.mark(key);
        if let Some(local) = &self.local {
            local.mark(key);
        }
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.track(FormStateFlags::IS_DIRTY);
        self.state.is_dirty
    }

    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.track(FormStateFlags::IS_VALIDATING);
        self.state.is_validating
    }

    #[must_use]
    pub fn dirty_fields(&self) -> &IndexSet<String> {
        self.track(FormStateFlags::DIRTY_FIELDS);
        &self.state.dirty_fields
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.track(FormStateFlags::IS_SUBMITTED);
        self.state.is_submitted
    }

    #[must_use]
    pub fn submit_count(&self) -> u32 {
        self.track(FormStateFlags::SUBMIT_COUNT);
        self.state.submit_count
    }

    #[must_use]
    pub fn touched_fields(&self) -> &IndexSet<String> {
        self.track(FormStateFlags::TOUCHED_FIELDS);
        &self.state.touched_fields
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.track(FormStateFlags::IS_SUBMITTING);
        self.state.is_submitting
    }

    #[must_use]
    pub fn is_submit_successful(&self) -> bool {
        self.track(FormStateFlags::IS_SUBMIT_SUCCESSFUL);
        self.state.is_submit_successful
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.track(FormStateFlags::IS_VALID);
        self.state.is_valid
    }

    #[must_use]
    pub fn errors(&self) -> &FieldErrors {
        self.track(FormStateFlags::ERRORS);
        &self.state.errors
    }

    /// The untracked snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &Rc<FormState> {
        &self.state
    }
}

/// Whether `update` concerns anything the consumer behind `deps` has read.
#[must_use]
pub fn should_render_form_state(
    update: &FormStateUpdate,
    deps: &DependencySet,
    force: bool,
) -> bool {
    if force {
        return true;
    }
    let hit = update.keys().intersects(deps.observed());
    trace!(
        present = ?update.keys(),
        observed = ?deps.observed(),
        render = hit,
        "form state gate"
    );
    hit
}

/// Whether a subscriber filtered to `names` cares about an update for
/// `signal`.
///
/// No filter or no signal name always matches. Otherwise some name must equal
/// `signal` (`exact`) or be a prefix of it or extend it (not `exact`).
#[must_use]
pub fn should_subscribe_by_name(names: Option<&[String]>, signal: Option<&str>, exact: bool) -> bool {
    let (Some(names), Some(signal)) = (names, signal) else {
        return true;
    };
    names.iter().any(|name| {
        !name.is_empty()
            && if exact {
                name == signal
            } else {
                name.starts_with(signal) || signal.starts_with(name.as_str())
            }
    })
}
