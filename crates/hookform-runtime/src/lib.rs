#![forbid(unsafe_code)]

//! Runtime: subjects, form-state tracking, the form controller, and its
//! consumers.
//!
//! # Architecture
//!
//! [`FormControl`] owns all form data and publishes [`FormStateUpdate`]s on
//! its state [`Subject`]. Each consumer ([`FormHandle`],
//! [`FormStateSubscriber`]) reads state through a [`ProxyFormState`], which
//! records what was read in a [`DependencySet`]. When an update arrives,
//! [`should_render_form_state`] compares it with those records and only a
//! consumer that read one of the updated properties re-renders.
//!
//! Everything is single-threaded (`Rc`, `RefCell`, `Cell`).

pub mod consumer;
pub mod control;
pub mod form_state;
pub mod options;
pub mod proxy;
pub mod subject;

pub use consumer::{FormHandle, FormStateSubscriber, SubscriberOptions};
pub use control::{
    FieldValidator, FormControl, FormError, Result, StateFlags, Subjects, WatchSignal,
};
pub use form_state::{DependencySet, FormState, FormStateFlags, FormStateUpdate};
pub use options::{
    FormOptions, KeepStateOptions, ReValidateMode, RegisterOptions, SetValueOptions,
    UnregisterOptions, ValidationMode, should_skip_validation,
};
pub use proxy::{ProxyFormState, should_render_form_state, should_subscribe_by_name};
pub use subject::{Subject, Subscription};
