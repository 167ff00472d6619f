#![forbid(unsafe_code)]

//! Form-state snapshots, deltas, and per-consumer dependency sets.

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;
use hookform_core::{FieldError, FieldErrors};
use indexmap::IndexSet;

bitflags! {
    /// One bit per [`FormState`] property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormStateFlags: u16 {
        const IS_DIRTY             = 1 << 0;
        const IS_VALIDATING        = 1 << 1;
        const DIRTY_FIELDS         = 1 << 2;
        const IS_SUBMITTED         = 1 << 3;
        const SUBMIT_COUNT         = 1 << 4;
        const TOUCHED_FIELDS       = 1 << 5;
        const IS_SUBMITTING        = 1 << 6;
        const IS_SUBMIT_SUCCESSFUL = 1 << 7;
        const IS_VALID             = 1 << 8;
        const ERRORS               = 1 << 9;
    }
}

/// Aggregate form status.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormState {
    pub is_dirty: bool,
    pub is_validating: bool,
    pub dirty_fields: IndexSet<String>,
    pub is_submitted: bool,
    pub submit_count: u32,
    pub touched_fields: IndexSet<String>,
    pub is_submitting: bool,
    pub is_submit_successful: bool,
    pub is_valid: bool,
    pub errors: FieldErrors,
}

impl FormState {
    #[must_use]
    pub fn error(&self, name: &str) -> Option<&FieldError> {
        self.errors.get(name)
    }
}

/// A partial [`FormState`]. Only `Some` properties are part of the update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormStateUpdate {
    /// Field the update concerns, if any.
    pub name: Option<String>,
    pub is_dirty: Option<bool>,
    pub is_validating: Option<bool>,
    pub dirty_fields: Option<IndexSet<String>>,
    pub is_submitted: Option<bool>,
    pub submit_count: Option<u32>,
    pub touched_fields: Option<IndexSet<String>>,
    pub is_submitting: Option<bool>,
    pub is_submit_successful: Option<bool>,
    pub is_valid: Option<bool>,
    pub errors: Option<FieldErrors>,
}

impl FormStateUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_is_dirty(mut self, is_dirty: bool) -> Self {
        self.is_dirty = Some(is_dirty);
        self
    }

    #[must_use]
    pub fn with_is_validating(mut self, is_validating: bool) -> Self {
        self.is_validating = Some(is_validating);
        self
    }

    #[must_use]
    pub fn with_dirty_fields(mut self, dirty_fields: IndexSet<String>) -> Self {
        self.dirty_fields = Some(dirty_fields);
        self
    }

    #[must_use]
    pub fn with_is_submitted(mut self, is_submitted: bool) -> Self {
        self.is_submitted = Some(is_submitted);
        self
    }

    #[must_use]
    pub fn with_submit_count(mut self, submit_count: u32) -> Self {
        self.submit_count = Some(submit_count);
        self
    }

    #[must_use]
    pub fn with_touched_fields(mut self, touched_fields: IndexSet<String>) -> Self {
        self.touched_fields = Some(touched_fields);
        self
    }

    #[must_use]
    pub fn with_is_submitting(mut self, is_submitting: bool) -> Self {
        self.is_submitting = Some(is_submitting);
        self
    }

    #[must_use]
    pub fn with_is_submit_successful(mut self, is_submit_successful: bool) -> Self {
        self.is_submit_successful = Some(is_submit_successful);
        self
    }

    #[must_use]
    pub fn with_is_valid(mut self, is_valid: bool) -> Self {
        self.is_valid = Some(is_valid);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Properties present in this update.
    #[must_use]
    pub fn keys(&self) -> FormStateFlags {
        let mut keys = FormStateFlags::empty();
        keys.set(FormStateFlags::IS_DIRTY, self.is_dirty.is_some());
        keys.set(FormStateFlags::IS_VALIDATING, self.is_validating.is_some());
        keys.set(FormStateFlags::DIRTY_FIELDS, self.dirty_fields.is_some());
        keys.set(FormStateFlags::IS_SUBMITTED, self.is_submitted.is_some());
        keys.set(FormStateFlags::SUBMIT_COUNT, self.submit_count.is_some());
        keys.set(FormStateFlags::TOUCHED_FIELDS, self.touched_fields.is_some());
        keys.set(FormStateFlags::IS_SUBMITTING, self.is_submitting.is_some());
        keys.set(
            FormStateFlags::IS_SUBMIT_SUCCESSFUL,
            self.is_submit_successful.is_some(),
        );
        keys.set(FormStateFlags::IS_VALID, self.is_valid.is_some());
        keys.set(FormStateFlags::ERRORS, self.errors.is_some());
        keys
    }

    /// No state property present. `name` is not a property.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Copy every present property onto `state`.
    pub fn apply_to(&self, state: &mut FormState) {
        if let Some(v) = self.is_dirty {
            state.is_dirty = v;
        }
        if let Some(v) = self.is_validating {
            state.is_validating = v;
        }
        if let Some(v) = &self.dirty_fields {
            state.dirty_fields.clone_from(v);
        }
        if let Some(v) = self.is_submitted {
            state.is_submitted = v;
        }
        if let Some(v) = self.submit_count {
            state.submit_count = v;
        }
        if let Some(v) = &self.touched_fields {
            state.touched_fields.clone_from(v);
        }
        if let Some(v) = self.is_submitting {
            state.is_submitting = v;
        }
        if let Some(v) = self.is_submit_successful {
            state.is_submit_successful = v;
        }
        if let Some(v) = self.is_valid {
            state.is_valid = v;
        }
        if let Some(v) = &self.errors {
            state.errors.clone_from(v);
        }
    }
}

/// Every property of `state`, all present.
impl From<&FormState> for FormStateUpdate {
    fn from(state: &FormState) -> Self {
        Self {
            name: None,
            is_dirty: Some(state.is_dirty),
            is_validating: Some(state.is_validating),
            dirty_fields: Some(state.dirty_fields.clone()),
            is_submitted: Some(state.is_submitted),
            submit_count: Some(state.submit_count),
            touched_fields: Some(state.touched_fields.clone()),
            is_submitting: Some(state.is_submitting),
            is_submit_successful: Some(state.is_submit_successful),
            is_valid: Some(state.is_valid),
            errors: Some(state.errors.clone()),
        }
    }
}

/// Properties one consumer has read.
///
/// Marking is monotonic; only [`reset`](Self::reset) clears. Clones share
/// the same underlying set.
#[derive(Clone, Debug, Default)]
pub struct DependencySet(Rc<Cell<FormStateFlags>>);

impl DependencySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mark(&self, keys: FormStateFlags) {
        self.0.set(self.0.get() | keys);
    }

    #[inline]
    #[must_use]
    pub fn is_observed(&self, key: FormStateFlags) -> bool {
        self.0.get().intersects(key)
    }

    #[inline]
    #[must_use]
    pub fn observed(&self) -> FormStateFlags {
        self.0.get()
    }

    /// Forget everything. For consumer re-mount only.
    pub fn reset(&self) {
        self.0.set(FormStateFlags::empty());
    }
}
