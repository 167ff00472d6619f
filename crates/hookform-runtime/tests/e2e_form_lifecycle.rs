#![forbid(unsafe_code)]

//! E2E tests for a form driven the way a UI host drives it.
//!
//! Validates that:
//! 1. Submitting an invalid form focuses the first invalid field and renders
//!    consumers that read the errors.
//! 2. Fixing fields clears their errors and a second submit succeeds with a
//!    copy of the values.
//! 3. A root consumer that never read `is_dirty` is not re-rendered by dirty
//!    changes; once it reads it, it is.
//! 4. A global watch re-renders the root consumer for the watched field only.
//! 5. Reset clears the watch registry, so old watches stop rendering.
//! 6. A scoped subscriber only renders for its own field.
//! 7. Dropped or unsubscribed watch subscriptions are never called again.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hookform_core::path::get;
use hookform_core::{
    ChangeEvent, ElementHandle, ElementHost, EventTarget, FieldError, FieldMeta, FieldValue,
    ValidationRules,
};
use hookform_runtime::{
    FormControl, FormHandle, FormOptions, FormStateSubscriber, KeepStateOptions, RegisterOptions,
    SetValueOptions, SubscriberOptions,
};

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn required(meta: &FieldMeta, value: Option<&FieldValue>, _: &FieldValue) -> Option<FieldError> {
    let message = meta.rules.required.as_ref()?;
    value
        .is_none_or(|value| !value.is_truthy())
        .then(|| FieldError::new("required").with_message(message.clone()))
}

/// Host whose elements can all be focused; records focus calls.
#[derive(Default)]
struct Host {
    focused: Vec<ElementHandle>,
}

impl ElementHost for Host {
    fn can_focus(&self, _: ElementHandle) -> bool {
        true
    }

    fn focus(&mut self, handle: ElementHandle) {
        self.focused.push(handle);
    }
}

fn render_counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
    let renders = Rc::new(Cell::new(0));
    let sink = Rc::clone(&renders);
    (renders, move || sink.set(sink.get() + 1))
}

fn login_form(on_render: impl Fn() + 'static) -> FormHandle {
    let options = FormOptions::new().with_default_values(FieldValue::object_from([
        ("email", FieldValue::from("")),
        ("password", FieldValue::from("")),
    ]));
    let control = Rc::new(FormControl::new(options).with_validator(required));
    let form = FormHandle::with_control(control, on_render);

    let control = form.control();
    for (index, name) in ["email", "password"].into_iter().enumerate() {
        control
            .register(
                name,
                RegisterOptions::new().with_rules(ValidationRules::required("required")),
            )
            .expect("register");
        control
            .attach_element(name, ElementHandle::new(index as u32 + 1), false)
            .expect("attach");
    }
    form
}

// ============================================================================
// Submit flow
// ============================================================================

#[test]
fn submit_invalid_then_fix_and_resubmit() {
    init_tracing();
    let (renders, on_render) = render_counter();
    let form = login_form(on_render);
    let control = Rc::clone(form.control());

    let state = form.form_state();
    let _ = state.errors();
    let _ = state.is_submitted();
    form.after_render();

    let mut host = Host::default();
    let ok = control.handle_submit(&mut host, |_| panic!("must not submit"), |_| {});
    assert!(!ok);
    assert_eq!(host.focused, vec![ElementHandle::new(1)]);
    let after_submit = renders.get();
    assert!(after_submit >= 1);

    let state = form.form_state();
    assert!(state.is_submitted());
    assert_eq!(
        state.errors().keys().cloned().collect::<Vec<_>>(),
        vec!["email".to_owned(), "password".to_owned()]
    );

    control.on_change("email", ChangeEvent::change(EventTarget::text("ada@example.com")));
    assert!(renders.get() > after_submit);
    assert!(!form.form_state().errors().contains_key("email"));

    control.set_value(
        "password",
        "hunter22",
        SetValueOptions::new().with_should_validate(true),
    );
    assert!(form.form_state().errors().is_empty());

    let submitted = RefCell::new(None);
    let ok = control.handle_submit(
        &mut host,
        |values| *submitted.borrow_mut() = Some(values.clone()),
        |_| panic!("must be valid"),
    );
    assert!(ok);
    let submitted = submitted.into_inner().expect("on_valid called");
    assert_eq!(get(&submitted, "email"), Some("ada@example.com".into()));
    assert_eq!(host.focused.len(), 1);
    assert_eq!(control.form_state().submit_count, 2);
}

// ============================================================================
// Render gating
// ============================================================================

#[test]
fn dirty_changes_render_only_after_is_dirty_was_read() {
    init_tracing();
    let (renders, on_render) = render_counter();
    let form = FormHandle::new(
        FormOptions::new().with_default_values(FieldValue::object_from([(
            "name",
            FieldValue::from("ada"),
        )])),
        on_render,
    );
    let control = Rc::clone(form.control());
    control.register("name", RegisterOptions::new()).expect("register");
    form.after_render();

    control.on_change("name", "grace");
    assert_eq!(renders.get(), 0);
    assert!(!control.form_state().is_dirty);

    assert!(!form.form_state().is_dirty());
    control.on_change("name", "linus");
    assert_eq!(renders.get(), 1);
    assert!(form.form_state().is_dirty());
}

#[test]
fn global_watch_renders_for_watched_field_only() {
    init_tracing();
    let (renders, on_render) = render_counter();
    let form = FormHandle::new(FormOptions::default(), on_render);
    let control = Rc::clone(form.control());
    control.register("email", RegisterOptions::new()).expect("register");
    control.register("name", RegisterOptions::new()).expect("register");
    form.after_render();

    let _ = control.watch("email");

    control.on_change("name", "ada");
    assert_eq!(renders.get(), 0);

    control.on_change("email", "ada@example.com");
    assert_eq!(renders.get(), 1);
    assert_eq!(
        control.watch("email").into_one(),
        Some("ada@example.com".into())
    );
}

#[test]
fn reset_drops_watches() {
    init_tracing();
    let (renders, on_render) = render_counter();
    let form = FormHandle::new(FormOptions::default(), on_render);
    let control = Rc::clone(form.control());
    control.register("email", RegisterOptions::new()).expect("register");
    form.after_render();
    let _ = control.watch("email");

    control.reset(None, KeepStateOptions::default());
    let before = renders.get();
    control.register("email", RegisterOptions::new()).expect("register");
    control.on_change("email", "x");

    assert!(control.names().watch.is_empty());
    assert_eq!(renders.get(), before);
}

#[test]
fn scoped_subscriber_ignores_other_fields() {
    init_tracing();
    let form = login_form(|| {});
    let control = Rc::clone(form.control());
    form.after_render();

    let (renders, on_render) = render_counter();
    let scoped = FormStateSubscriber::new(
        Rc::clone(&control),
        SubscriberOptions::new().with_names(["password"]).with_exact(true),
        on_render,
    );
    let _ = scoped.form_state().errors();

    assert!(!control.trigger("email"));
    assert_eq!(renders.get(), 0);

    assert!(!control.trigger("password"));
    assert_eq!(renders.get(), 1);
    assert!(scoped.form_state().errors().contains_key("password"));
}

// ============================================================================
// Watch subscriptions
// ============================================================================

#[test]
fn watch_subscription_stops_after_unsubscribe() {
    init_tracing();
    let form = FormHandle::new(FormOptions::default(), || {});
    let control = Rc::clone(form.control());
    let calls = Rc::new(Cell::new(0));

    let sink = Rc::clone(&calls);
    let mut subscription = control.subscribe_watch(move |_, _| sink.set(sink.get() + 1));
    control.set_value("a", 1, SetValueOptions::new());
    assert_eq!(calls.get(), 1);

    subscription.unsubscribe();
    subscription.unsubscribe();
    control.set_value("a", 2, SetValueOptions::new());
    assert_eq!(calls.get(), 1);

    let sink = Rc::clone(&calls);
    let dropped = control.subscribe_watch(move |_, _| sink.set(sink.get() + 1));
    drop(dropped);
    control.set_value("a", 3, SetValueOptions::new());
    assert_eq!(calls.get(), 1);
}
