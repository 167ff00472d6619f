#![forbid(unsafe_code)]

//! Form-state consumers.
//!
//! A consumer holds a rendered snapshot of the form state and a subscription
//! to the control's state subject. It asks the host to re-render only when an
//! update passes its gate.
//!
//! - [`FormHandle`] is the root consumer. It reads through the control's own
//!   dependency set and runs the mount effect after each render.
//! - [`FormStateSubscriber`] is a scoped consumer with its own dependency set
//!   and an optional field-name filter.
//!
//! An update with no state properties is a refresh request (watchers use it)
//! and passes every gate.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::control::{FormControl, StateFlags};
use crate::form_state::{DependencySet, FormState, FormStateUpdate};
use crate::options::FormOptions;
use crate::proxy::{ProxyFormState, should_render_form_state, should_subscribe_by_name};
use crate::subject::Subscription;

type Snapshot = Rc<RefCell<Rc<FormState>>>;
type RenderFn = Rc<dyn Fn()>;

// ─── FormHandle ──────────────────────────────────────────────────────────────

/// Root consumer of a form.
pub struct FormHandle {
    control: Rc<FormControl>,
    state: Snapshot,
    _subscription: Subscription,
}

impl fmt::Debug for FormHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHandle")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl FormHandle {
    /// New form. `on_render` is the host's re-render trigger.
    pub fn new(options: FormOptions, on_render: impl Fn() + 'static) -> Self {
        Self::with_control(Rc::new(FormControl::new(options)), on_render)
    }

    /// Root consumer over an existing control.
    pub fn with_control(control: Rc<FormControl>, on_render: impl Fn() + 'static) -> Self {
        let state: Snapshot = Rc::new(RefCell::new(Rc::new(control.form_state())));
        let weak: Weak<FormControl> = Rc::downgrade(&control);
        let snapshot = Rc::clone(&state);

        let subscription = control.subjects().state.subscribe(move |update| {
            let Some(control) = weak.upgrade() else {
                return;
            };
            if should_render_form_state(update, control.proxy_form_state(), update.is_empty()) {
                *snapshot.borrow_mut() = Rc::new(control.form_state());
                on_render();
            }
        });

        Self {
            control,
            state,
            _subscription: subscription,
        }
    }

    #[inline]
    #[must_use]
    pub fn control(&self) -> &Rc<FormControl> {
        &self.control
    }

    /// Tracked view of the last rendered state.
    #[must_use]
    pub fn form_state(&self) -> ProxyFormState {
        let snapshot = Rc::clone(&self.state.borrow());
        ProxyFormState::new(snapshot, self.control.proxy_form_state().clone())
    }

    /// Mount effect; the host calls it after every render.
    ///
    /// On first mount, validity is computed if a consumer reads it. A pending
    /// watcher refresh is then flushed and unmounted fields are removed.
    pub fn after_render(&self) {
        let control = &self.control;
        if !control.state_flags().mount {
            control.update_valid();
            control.set_state_flags(StateFlags {
                mount: true,
                ..control.state_flags()
            });
            trace!("form mounted");
        }
        let flags = control.state_flags();
        if flags.watch {
            control.set_state_flags(StateFlags {
                watch: false,
                ..flags
            });
            control.subjects().state.next(&FormStateUpdate::new());
        }
        control.remove_unmounted();
    }
}

// ─── FormStateSubscriber ─────────────────────────────────────────────────────

/// Options for a [`FormStateSubscriber`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriberOptions {
    /// React only to updates for these fields (and updates naming no field).
    pub names: Option<Vec<String>>,
    /// Match names exactly instead of by path prefix.
    pub exact: bool,
    /// Don't subscribe at all.
    pub disabled: bool,
}

impl SubscriberOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Scoped consumer of a form's state.
pub struct FormStateSubscriber {
    control: Rc<FormControl>,
    local: DependencySet,
    state: Snapshot,
    options: SubscriberOptions,
    on_render: RenderFn,
    subscription: Option<Subscription>,
}

impl fmt::Debug for FormStateSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStateSubscriber")
            .field("observed", &self.local.observed())
            .field("options", &self.options)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl FormStateSubscriber {
    pub fn new(
        control: Rc<FormControl>,
        options: SubscriberOptions,
        on_render: impl Fn() + 'static,
    ) -> Self {
        let state: Snapshot = Rc::new(RefCell::new(Rc::new(control.form_state())));
        let mut subscriber = Self {
            control,
            local: DependencySet::new(),
            state,
            options,
            on_render: Rc::new(on_render),
            subscription: None,
        };
        if !subscriber.options.disabled {
            subscriber.subscribe();
        }
        subscriber
    }

    fn subscribe(&mut self) {
        let weak = Rc::downgrade(&self.control);
        let local = self.local.clone();
        let snapshot = Rc::clone(&self.state);
        let names = self.options.names.clone();
        let exact = self.options.exact;
        let on_render = Rc::clone(&self.on_render);

        self.subscription = Some(self.control.subjects().state.subscribe(move |update| {
            let Some(control) = weak.upgrade() else {
                return;
            };
            if should_subscribe_by_name(names.as_deref(), update.name.as_deref(), exact)
                && should_render_form_state(update, &local, update.is_empty())
            {
                *snapshot.borrow_mut() = Rc::new(control.form_state());
                on_render();
            }
        }));
    }

    /// Tracked view of the last rendered state. Reads register on this
    /// subscriber and on the form's root set.
    #[must_use]
    pub fn form_state(&self) -> ProxyFormState {
        let snapshot = Rc::clone(&self.state.borrow());
        ProxyFormState::new(snapshot, self.control.proxy_form_state().clone())
            .with_local(self.local.clone())
    }

    /// Turn the subscription off or back on.
    pub fn set_disabled(&mut self, disabled: bool) {
        if disabled == self.options.disabled {
            return;
        }
        self.options.disabled = disabled;
        if disabled {
            self.subscription = None;
        } else {
            self.subscribe();
        }
    }

    /// Forget recorded reads, as on a fresh mount.
    pub fn remount(&self) {
        self.local.reset();
        *self.state.borrow_mut() = Rc::new(self.control.form_state());
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    #[inline]
    #[must_use]
    pub fn local_dependencies(&self) -> &DependencySet {
        &self.local
    }
}
