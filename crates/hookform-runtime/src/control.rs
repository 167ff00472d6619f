#![forbid(unsafe_code)]

//! The form controller.
//!
//! [`FormControl`] owns the value store, the default values, the field tree,
//! the names registry and the authoritative [`FormState`]. It publishes state
//! deltas on [`Subjects::state`] and value changes on [`Subjects::watch`].
//!
//! Every method takes `&self`. Interior borrows are released before anything
//! is published, so observers may call back into the control.
//!
//! # Invariants
//!
//! 1. Default values are held as a structural clone of what the caller passed.
//! 2. Dirty/touched bookkeeping is skipped for properties no consumer reads,
//!    except touched fields, which validation timing depends on.
//! 3. A published update has already been applied to the control's state.
//! 4. After [`reset`](FormControl::reset) the names registry is empty,
//!    including its watch entries.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use hookform_core::path::{get, set_path, unset_path};
use hookform_core::{
    ChangeEvent, ChangeSignal, ElementHandle, ElementHost, ErrorOption, EventKind, EventTarget,
    FieldError, FieldErrors, FieldMeta, FieldNode, FieldTree, FieldTreeError, FieldValue,
    NamesRegistry, WatchNames, WatchOutput, focus_field_by_names, generate_watch_output,
    get_event_value, structural_clone,
};
use indexmap::IndexSet;
use thiserror::Error;
use tracing::{debug, trace};

use crate::form_state::{DependencySet, FormState, FormStateFlags, FormStateUpdate};
use crate::options::{
    FormOptions, KeepStateOptions, RegisterOptions, SetValueOptions, UnregisterOptions,
    should_skip_validation,
};
use crate::subject::{Subject, Subscription};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error(transparent)]
    FieldTree(#[from] FieldTreeError),

    #[error("field `{0}` is not registered")]
    UnknownField(String),

    #[error("form has been disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, FormError>;

// ─── Validation boundary ─────────────────────────────────────────────────────

/// Evaluates one field. Returns the error to record, or `None` when valid.
pub trait FieldValidator {
    fn validate(
        &self,
        field: &FieldMeta,
        value: Option<&FieldValue>,
        values: &FieldValue,
    ) -> Option<FieldError>;
}

impl<F> FieldValidator for F
where
    F: Fn(&FieldMeta, Option<&FieldValue>, &FieldValue) -> Option<FieldError>,
{
    fn validate(
        &self,
        field: &FieldMeta,
        value: Option<&FieldValue>,
        values: &FieldValue,
    ) -> Option<FieldError> {
        self(field, value, values)
    }
}

// ─── Channels and flags ──────────────────────────────────────────────────────

/// Value-change notification.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WatchSignal {
    /// Field that changed; `None` for whole-form changes.
    pub name: Option<String>,
    pub kind: Option<EventKind>,
    /// The value store at publish time (shared, not copied).
    pub values: FieldValue,
}

#[derive(Clone, Debug, Default)]
pub struct Subjects {
    pub state: Subject<FormStateUpdate>,
    pub watch: Subject<WatchSignal>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateFlags {
    /// The root consumer has rendered at least once.
    pub mount: bool,
    /// Watchers need a refresh after the next render.
    pub watch: bool,
}

// ─── FormControl ─────────────────────────────────────────────────────────────

pub struct FormControl {
    options: RefCell<FormOptions>,
    fields: RefCell<FieldTree>,
    form_values: RefCell<FieldValue>,
    default_values: RefCell<FieldValue>,
    names: RefCell<NamesRegistry>,
    form_state: RefCell<FormState>,
    proxy_form_state: DependencySet,
    state_flags: Cell<StateFlags>,
    validator: Option<Rc<dyn FieldValidator>>,
    subjects: Subjects,
    disposed: Cell<bool>,
}

impl fmt::Debug for FormControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormControl")
            .field("fields", &self.fields.borrow().field_names())
            .field("form_state", &*self.form_state.borrow())
            .field("observed", &self.proxy_form_state.observed())
            .field("state_flags", &self.state_flags.get())
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for FormControl {
    fn default() -> Self {
        Self::new(FormOptions::default())
    }
}

impl FormControl {
    pub fn new(options: FormOptions) -> Self {
        let default_values = if options.default_values.is_container() {
            structural_clone(&options.default_values)
        } else {
            FieldValue::object()
        };
        let form_values = structural_clone(&default_values);
        Self {
            options: RefCell::new(options),
            fields: RefCell::new(FieldTree::new()),
            form_values: RefCell::new(form_values),
            default_values: RefCell::new(default_values),
            names: RefCell::new(NamesRegistry::new()),
            form_state: RefCell::new(FormState::default()),
            proxy_form_state: DependencySet::new(),
            state_flags: Cell::new(StateFlags::default()),
            validator: None,
            subjects: Subjects::default(),
            disposed: Cell::new(false),
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    #[must_use]
    pub fn options(&self) -> Ref<'_, FormOptions> {
        self.options.borrow()
    }

    pub fn set_options(&self, options: FormOptions) {
        *self.options.borrow_mut() = options;
    }

    #[inline]
    #[must_use]
    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    /// The form's root dependency set.
    #[inline]
    #[must_use]
    pub fn proxy_form_state(&self) -> &DependencySet {
        &self.proxy_form_state
    }

    /// Copy of the current form state.
    #[must_use]
    pub fn form_state(&self) -> FormState {
        self.form_state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn state_flags(&self) -> StateFlags {
        self.state_flags.get()
    }

    pub fn set_state_flags(&self, flags: StateFlags) {
        self.state_flags.set(flags);
    }

    #[must_use]
    pub fn names(&self) -> Ref<'_, NamesRegistry> {
        self.names.borrow()
    }

    #[must_use]
    pub fn fields(&self) -> Ref<'_, FieldTree> {
        self.fields.borrow()
    }

    /// The live value store (shared).
    #[must_use]
    pub fn form_values(&self) -> FieldValue {
        self.form_values.borrow().clone()
    }

    #[must_use]
    pub fn default_values(&self) -> FieldValue {
        self.default_values.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register `name`, or refresh its rules if already registered.
    ///
    /// Element handles of an existing registration are kept. When the store
    /// has no value for `name`, it is seeded from `options.value` or the
    /// default values.
    pub fn register(&self, name: &str, options: RegisterOptions) -> Result<()> {
        if self.disposed.get() {
            return Err(FormError::Disposed);
        }
        let existing = self.fields.borrow().get_field(name).cloned();
        let previous = existing.unwrap_or_else(|| FieldMeta::new(name));
        let meta = FieldMeta {
            rules: options.rules,
            mount: true,
            should_unregister: options.should_unregister.or(previous.should_unregister),
            ..previous
        };
        self.fields.borrow_mut().insert(meta)?;
        {
            let mut names = self.names.borrow_mut();
            names.mount.insert(name.to_owned());
            names.unmount.shift_remove(name);
        }

        let values = self.form_values();
        if get(&values, name).is_none() {
            let seed = options
                .value
                .or_else(|| get(&self.default_values.borrow(), name));
            if let Some(seed) = seed {
                set_path(&values, name, structural_clone(&seed));
            }
        }
        debug!(field = name, "registered field");

        if self.state_flags.get().mount {
            self.update_valid();
        }
        Ok(())
    }

    /// Bind a host element to `name`. `grouped` appends it to the field's
    /// sibling refs (checkbox and radio groups) instead of replacing the
    /// primary element.
    pub fn attach_element(&self, name: &str, element: ElementHandle, grouped: bool) -> Result<()> {
        {
            let mut fields = self.fields.borrow_mut();
            let meta = fields
                .get_field_mut(name)
                .ok_or_else(|| FormError::UnknownField(name.to_owned()))?;
            if grouped {
                if !meta.refs.contains(&element) {
                    meta.refs.push(element);
                }
            } else {
                meta.element = Some(element);
            }
            meta.mount = true;
        }
        self.names.borrow_mut().unmount.shift_remove(name);
        trace!(field = name, element = element.index(), grouped, "attached element");
        Ok(())
    }

    /// The host removed the field's elements. Queues the field for removal
    /// when it unregisters on unmount.
    pub fn detach_element(&self, name: &str) {
        let should_unregister = {
            let mut fields = self.fields.borrow_mut();
            let Some(meta) = fields.get_field_mut(name) else {
                return;
            };
            meta.mount = false;
            meta.element = None;
            meta.refs.clear();
            meta.should_unregister
                .unwrap_or(self.options.borrow().should_unregister)
        };
        if should_unregister {
            self.names.borrow_mut().unmount.insert(name.to_owned());
        }
        trace!(field = name, queued = should_unregister, "detached element");
    }

    /// Forget `name` and, unless kept, its value, error, dirty and touched
    /// entries.
    pub fn unregister(&self, name: &str, options: UnregisterOptions) {
        self.names.borrow_mut().mount.shift_remove(name);
        let registered = self.fields.borrow().contains(name);
        if registered {
            if !options.keep_value {
                self.fields.borrow_mut().remove(name);
                unset_path(&self.form_values(), name);
            }
            {
                let mut state = self.form_state.borrow_mut();
                if !options.keep_error {
                    state.errors.retain(|key, _| !is_under(key, name));
                }
                if !options.keep_dirty {
                    state.dirty_fields.retain(|key| !is_under(key, name));
                }
                if !options.keep_touched {
                    state.touched_fields.retain(|key| !is_under(key, name));
                }
            }
            if !self.options.borrow().should_unregister && !options.keep_default_value {
                unset_path(&self.default_values.borrow(), name);
            }
            debug!(field = name, "unregistered field");
        }

        self.subjects.watch.next(&WatchSignal {
            name: Some(name.to_owned()),
            kind: None,
            values: self.form_values(),
        });
        let mut update = FormStateUpdate::from(&*self.form_state.borrow());
        if !options.keep_dirty {
            update.is_dirty = Some(self.compute_is_dirty());
        }
        self.publish(update);
        self.update_valid();
    }

    /// Unregister every queued field whose element is still gone.
    pub fn remove_unmounted(&self) {
        let pending = std::mem::take(&mut self.names.borrow_mut().unmount);
        for name in pending {
            let gone = self
                .fields
                .borrow()
                .get_field(&name)
                .is_some_and(|meta| !meta.mount);
            if gone {
                self.unregister(&name, UnregisterOptions::default());
            }
        }
    }

    // ── Values ───────────────────────────────────────────────────────

    /// Store a structural clone of `value` at `name`.
    pub fn set_value(&self, name: &str, value: impl Into<FieldValue>, options: SetValueOptions) {
        let value = structural_clone(&value.into());
        let values = self.form_values();
        set_path(&values, name, value.clone());

        let registered = self.fields.borrow().get_field(name).is_some();
        if registered {
            if options.should_dirty || options.should_touch {
                self.update_touch_and_dirty(name, &value, options.should_touch, options.should_dirty, true);
            }
            if options.should_validate {
                self.trigger(name);
            }
        }

        if self.names.borrow().is_watched(name, false) {
            self.refresh_watchers();
        }
        self.subjects.watch.next(&WatchSignal {
            name: Some(name.to_owned()),
            kind: None,
            values,
        });
    }

    /// Change handler for a field's element.
    ///
    /// Unregistered names are ignored. The signal is normalized, stored, and
    /// dirty/touched state updated. Validation runs when the form's modes
    /// allow it at this point.
    pub fn on_change(&self, name: &str, signal: impl Into<ChangeSignal>) {
        let signal = signal.into();
        let Some(meta) = self.fields.borrow().get_field(name).cloned() else {
            trace!(field = name, "change for unregistered field ignored");
            return;
        };
        let is_blur = signal.is_blur();
        let value = get_event_value(signal);

        let skip_validation = {
            let state = self.form_state.borrow();
            let options = self.options.borrow();
            let nothing_to_check = meta.rules.is_empty()
                && self.validator.is_none()
                && !state.errors.contains_key(name);
            nothing_to_check
                || should_skip_validation(
                    is_blur,
                    state.touched_fields.contains(name),
                    state.is_submitted,
                    options.re_validate_mode,
                    options.mode,
                )
        };
        let watched = self.names.borrow().is_watched(name, is_blur);

        let values = self.form_values();
        set_path(&values, name, value.clone());

        let field_state = self.update_touch_and_dirty(name, &value, is_blur, false, false);
        let should_render = field_state.is_some() || watched;

        if !is_blur {
            self.subjects.watch.next(&WatchSignal {
                name: Some(name.to_owned()),
                kind: Some(EventKind::Change),
                values,
            });
        }

        if skip_validation {
            if should_render {
                let update = match field_state {
                    Some(update) if !watched => update,
                    _ => FormStateUpdate::new().with_name(name),
                };
                self.publish(update);
            }
            return;
        }

        if !is_blur && watched {
            self.subjects.state.next(&FormStateUpdate::new());
        }
        self.set_validating(true);
        let error = self.validate_field(name);
        let is_valid = self
            .proxy_form_state
            .is_observed(FormStateFlags::IS_VALID)
            .then(|| self.is_form_valid());
        self.render_by_error(name, is_valid, error, field_state);
    }

    /// Blur handler for a field's element.
    pub fn on_blur(&self, name: &str) {
        let current = get(&self.form_values(), name).unwrap_or_default();
        self.on_change(
            name,
            ChangeEvent::blur(EventTarget::text(current).with_name(name)),
        );
    }

    /// Read without subscribing.
    pub fn get_values(&self, names: impl Into<WatchNames>) -> WatchOutput {
        let values = self.form_values();
        generate_watch_output(&names.into(), &mut self.names.borrow_mut(), &values, false)
    }

    /// Read and subscribe the root consumer to future changes of `names`.
    /// Before the first render this reads the default values.
    pub fn watch(&self, names: impl Into<WatchNames>) -> WatchOutput {
        let values = if self.state_flags.get().mount {
            self.form_values()
        } else {
            self.default_values()
        };
        generate_watch_output(&names.into(), &mut self.names.borrow_mut(), &values, true)
    }

    /// Call `callback` with the value store on every value change.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_watch(
        &self,
        callback: impl Fn(&FieldValue, &WatchSignal) + 'static,
    ) -> Subscription {
        self.subjects
            .watch
            .subscribe(move |signal| callback(&signal.values, signal))
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Validate `names` and record their errors. Returns whether they all
    /// passed.
    pub fn trigger(&self, names: impl Into<WatchNames>) -> bool {
        self.trigger_inner(&names.into(), None)
    }

    /// Like [`trigger`](Self::trigger), then focus the first failing field.
    pub fn trigger_with_focus(
        &self,
        names: impl Into<WatchNames>,
        host: &mut dyn ElementHost,
    ) -> bool {
        self.trigger_inner(&names.into(), Some(host))
    }

    fn trigger_inner(&self, names: &WatchNames, host: Option<&mut dyn ElementHost>) -> bool {
        self.set_validating(true);
        let targets = self.resolve_field_names(names);
        let passed = self.run_validation(&targets);

        let mut update = FormStateUpdate::new().with_is_validating(false);
        match names {
            WatchNames::All => update.is_valid = Some(passed),
            WatchNames::One(name) => {
                update.name = Some(name.clone());
                if passed || self.form_state.borrow().is_valid {
                    self.update_valid();
                }
            }
            WatchNames::Many(_) => {
                if passed || self.form_state.borrow().is_valid {
                    self.update_valid();
                }
            }
        }
        update.errors = Some(self.form_state.borrow().errors.clone());
        self.publish(update);
        debug!(fields = targets.len(), passed, "validation triggered");

        match host {
            Some(host) if !passed => {
                let order = match names {
                    WatchNames::All => self.names.borrow().mount.iter().cloned().collect(),
                    WatchNames::One(name) => vec![name.clone()],
                    WatchNames::Many(names) => names.clone(),
                };
                self.focus_first_error(host, &order);
            }
            _ => {}
        }
        passed
    }

    /// Recompute `is_valid` when a consumer reads it.
    pub fn update_valid(&self) {
        if !self.proxy_form_state.is_observed(FormStateFlags::IS_VALID) {
            return;
        }
        let is_valid = self.is_form_valid();
        if is_valid != self.form_state.borrow().is_valid {
            self.publish(FormStateUpdate::new().with_is_valid(is_valid));
        }
    }

    /// Validate everything, then call `on_valid` with a copy of the values
    /// or `on_invalid` with the errors. Returns whether submission succeeded.
    pub fn handle_submit<V, I>(&self, host: &mut dyn ElementHost, on_valid: V, on_invalid: I) -> bool
    where
        V: FnOnce(&FieldValue),
        I: FnOnce(&FieldErrors),
    {
        let values = structural_clone(&self.form_values());
        self.publish(FormStateUpdate::new().with_is_submitting(true));

        let all = self.fields.borrow().field_names();
        self.run_validation(&all);
        self.form_state.borrow_mut().errors.shift_remove("root");
        let errors = self.form_state.borrow().errors.clone();
        let success = errors.is_empty();

        if success {
            self.publish(FormStateUpdate::new().with_errors(FieldErrors::new()));
            on_valid(&values);
        } else {
            on_invalid(&errors);
            let focus = self.options.borrow().should_focus_error;
            if focus {
                let order: Vec<String> = self.names.borrow().mount.iter().cloned().collect();
                self.focus_first_error(host, &order);
            }
        }

        let (submit_count, errors) = {
            let state = self.form_state.borrow();
            (state.submit_count + 1, state.errors.clone())
        };
        self.publish(
            FormStateUpdate::new()
                .with_is_submitted(true)
                .with_is_submitting(false)
                .with_is_submit_successful(success)
                .with_submit_count(submit_count)
                .with_errors(errors),
        );
        debug!(success, submit_count, "form submitted");
        success
    }

    // ── Errors and focus ─────────────────────────────────────────────

    /// Record a caller-supplied error. Marks the form invalid.
    pub fn set_error(&self, name: &str, error: ErrorOption) {
        let element = self
            .fields
            .borrow()
            .get_field(name)
            .and_then(focus_target_of);
        let mut error = FieldError::from(error);
        error.element = element;
        let errors = {
            let mut state = self.form_state.borrow_mut();
            state.errors.insert(name.to_owned(), error);
            state.errors.clone()
        };
        self.publish(
            FormStateUpdate::new()
                .with_name(name)
                .with_errors(errors)
                .with_is_valid(false),
        );
    }

    /// Clear errors for `names` (and anything nested under them), or all.
    pub fn clear_errors(&self, names: impl Into<WatchNames>) {
        let errors = {
            let mut state = self.form_state.borrow_mut();
            match names.into() {
                WatchNames::All => state.errors.clear(),
                WatchNames::One(name) => state.errors.retain(|key, _| !is_under(key, &name)),
                WatchNames::Many(names) => state
                    .errors
                    .retain(|key, _| !names.iter().any(|name| is_under(key, name))),
            }
            state.errors.clone()
        };
        self.publish(FormStateUpdate::new().with_errors(errors));
    }

    /// Focus the element of `name`. Returns whether anything was focused.
    pub fn set_focus(&self, name: &str, host: &mut dyn ElementHost) -> bool {
        let Some((primary, first_ref)) = self
            .fields
            .borrow()
            .get_field(name)
            .map(|meta| (meta.element, meta.refs.first().copied()))
        else {
            return false;
        };
        let target = match primary {
            Some(element) if host.can_focus(element) => Some(element),
            _ => first_ref,
        };
        match target {
            Some(element) => {
                host.focus(element);
                true
            }
            None => false,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Reset values and state.
    ///
    /// `values` replaces the defaults unless kept; `None` resets to the
    /// current defaults. The field tree and names registry are cleared.
    pub fn reset(&self, values: Option<FieldValue>, keep: KeepStateOptions) {
        let replaced = values.is_some();
        let updated = values.unwrap_or_else(|| self.default_values());
        if !keep.keep_default_values {
            *self.default_values.borrow_mut() = structural_clone(&updated);
        }

        let should_unregister = self.options.borrow().should_unregister;
        if !keep.keep_values {
            self.fields.borrow_mut().clear();
            let next = if should_unregister {
                if keep.keep_default_values {
                    structural_clone(&self.default_values.borrow())
                } else {
                    FieldValue::object()
                }
            } else {
                structural_clone(&updated)
            };
            *self.form_values.borrow_mut() = next;
        }

        *self.names.borrow_mut() = NamesRegistry::new();
        self.state_flags.set(StateFlags {
            mount: !self.proxy_form_state.is_observed(FormStateFlags::IS_VALID)
                || keep.keep_is_valid,
            watch: should_unregister,
        });

        self.subjects.watch.next(&WatchSignal {
            name: None,
            kind: None,
            values: self.form_values(),
        });

        let is_dirty_against_defaults =
            replaced && keep.keep_default_values && updated != *self.default_values.borrow();
        let update = {
            let state = self.form_state.borrow();
            FormStateUpdate {
                submit_count: Some(if keep.keep_submit_count { state.submit_count } else { 0 }),
                is_dirty: Some(if keep.keep_dirty {
                    state.is_dirty
                } else {
                    is_dirty_against_defaults
                }),
                is_submitted: Some(keep.keep_is_submitted && state.is_submitted),
                dirty_fields: Some(if keep.keep_dirty {
                    state.dirty_fields.clone()
                } else {
                    IndexSet::new()
                }),
                touched_fields: Some(if keep.keep_touched {
                    state.touched_fields.clone()
                } else {
                    IndexSet::new()
                }),
                errors: Some(if keep.keep_errors {
                    state.errors.clone()
                } else {
                    FieldErrors::new()
                }),
                is_submitting: Some(false),
                is_submit_successful: Some(false),
                ..FormStateUpdate::default()
            }
        };
        self.publish(update);
        debug!(replaced, keep_values = keep.keep_values, "form reset");
    }

    /// Tear down both subjects. Registration fails afterwards.
    pub fn dispose(&self) {
        self.subjects.state.teardown();
        self.subjects.watch.teardown();
        self.disposed.set(true);
        debug!("form disposed");
    }

    // ── Internals ────────────────────────────────────────────────────

    fn publish(&self, update: FormStateUpdate) {
        update.apply_to(&mut self.form_state.borrow_mut());
        trace!(keys = ?update.keys(), name = ?update.name, "publishing form state");
        self.subjects.state.next(&update);
    }

    fn refresh_watchers(&self) {
        let mut flags = self.state_flags.get();
        if flags.mount {
            self.subjects.state.next(&FormStateUpdate::new());
        } else {
            flags.watch = true;
            self.state_flags.set(flags);
        }
    }

    fn set_validating(&self, validating: bool) {
        if self.proxy_form_state.is_observed(FormStateFlags::IS_VALIDATING) {
            self.publish(FormStateUpdate::new().with_is_validating(validating));
        }
    }

    fn compute_is_dirty(&self) -> bool {
        *self.form_values.borrow() != *self.default_values.borrow()
    }

    /// Update dirty/touched bookkeeping for `name`. Returns the delta when
    /// something a consumer reads changed, publishing it if `should_render`.
    fn update_touch_and_dirty(
        &self,
        name: &str,
        value: &FieldValue,
        is_blur: bool,
        should_dirty: bool,
        should_render: bool,
    ) -> Option<FormStateUpdate> {
        let deps = &self.proxy_form_state;
        let mut changed = false;
        let mut output = FormStateUpdate::new().with_name(name);
        let was_touched = self.form_state.borrow().touched_fields.contains(name);

        if deps.is_observed(FormStateFlags::IS_DIRTY) {
            let is_dirty = self.compute_is_dirty();
            let mut state = self.form_state.borrow_mut();
            changed |= state.is_dirty != is_dirty;
            state.is_dirty = is_dirty;
            output.is_dirty = Some(is_dirty);
        }

        if deps.is_observed(FormStateFlags::DIRTY_FIELDS) && (!is_blur || should_dirty) {
            let pristine = get(&self.default_values.borrow(), name).unwrap_or_default() == *value;
            let mut state = self.form_state.borrow_mut();
            let was_dirty = state.dirty_fields.contains(name);
            if pristine {
                state.dirty_fields.shift_remove(name);
            } else {
                state.dirty_fields.insert(name.to_owned());
            }
            changed |= was_dirty == pristine;
            output.dirty_fields = Some(state.dirty_fields.clone());
        }

        if is_blur && !was_touched {
            let mut state = self.form_state.borrow_mut();
            state.touched_fields.insert(name.to_owned());
            output.touched_fields = Some(state.touched_fields.clone());
            changed |= deps.is_observed(FormStateFlags::TOUCHED_FIELDS);
        }

        if !changed {
            return None;
        }
        if should_render {
            self.publish(output.clone());
        }
        Some(output)
    }

    fn render_by_error(
        &self,
        name: &str,
        is_valid: Option<bool>,
        error: Option<FieldError>,
        field_state: Option<FormStateUpdate>,
    ) {
        let should_update_valid =
            is_valid.is_some_and(|valid| valid != self.form_state.borrow().is_valid);
        let error_changed = self.record_error(name, error);

        if error_changed || field_state.is_some() || should_update_valid {
            let mut update = field_state.unwrap_or_default().with_name(name);
            if should_update_valid {
                update.is_valid = is_valid;
            }
            update.errors = Some(self.form_state.borrow().errors.clone());
            self.publish(update);
        }
        self.set_validating(false);
    }

    /// Field names reached by `names`. Groups expand to every field inside.
    fn resolve_field_names(&self, names: &WatchNames) -> Vec<String> {
        let fields = self.fields.borrow();
        let expand = |name: &str| match fields.get(name) {
            Some(FieldNode::Field(meta)) => vec![meta.name.clone()],
            Some(FieldNode::Group(group)) => group.field_names(),
            None => Vec::new(),
        };
        match names {
            WatchNames::All => fields.field_names(),
            WatchNames::One(name) => expand(name),
            WatchNames::Many(names) => names.iter().flat_map(|name| expand(name)).collect(),
        }
    }

    fn validate_field(&self, name: &str) -> Option<FieldError> {
        let validator = self.validator.clone()?;
        let meta = self.fields.borrow().get_field(name).cloned()?;
        if !meta.mount || meta.rules.disabled {
            return None;
        }
        let values = self.form_values();
        let value = get(&values, name);
        let mut error = validator.validate(&meta, value.as_ref(), &values)?;
        if error.element.is_none() {
            error.element = focus_target_of(&meta);
        }
        Some(error)
    }

    /// Store or clear the error for `name`. Returns whether it changed.
    fn record_error(&self, name: &str, error: Option<FieldError>) -> bool {
        let mut state = self.form_state.borrow_mut();
        match error {
            Some(error) => {
                if state.errors.get(name) == Some(&error) {
                    return false;
                }
                state.errors.insert(name.to_owned(), error);
                true
            }
            None => state.errors.shift_remove(name).is_some(),
        }
    }

    fn run_validation(&self, names: &[String]) -> bool {
        let mut passed = true;
        for name in names {
            let error = self.validate_field(name);
            passed &= error.is_none();
            self.record_error(name, error);
        }
        passed
    }

    fn is_form_valid(&self) -> bool {
        let names = self.fields.borrow().field_names();
        names.iter().all(|name| self.validate_field(name).is_none())
    }

    fn focus_first_error(&self, host: &mut dyn ElementHost, order: &[String]) {
        // Snapshots, so the host may call back into the control from `focus`.
        let errors = self.form_state.borrow().errors.clone();
        let fields = self.fields.borrow().clone();
        let focused = focus_field_by_names(&fields, host, |key| errors.contains_key(key), order);
        trace!(focused = ?focused, "focus on error");
    }
}

fn focus_target_of(meta: &FieldMeta) -> Option<ElementHandle> {
    meta.element.or_else(|| meta.refs.first().copied())
}

/// `key` is `name` or a path below it.
fn is_under(key: &str, name: &str) -> bool {
    key.strip_prefix(name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
}
