#![forbid(unsafe_code)]

//! hookform public facade crate.
//!
//! Re-exports the value and field model from `hookform-core` and the form
//! controller from `hookform-runtime`.
//!
//! ```
//! use hookform::prelude::*;
//!
//! let form = FormHandle::new(FormOptions::default(), || {});
//! form.control()
//!     .register("email", RegisterOptions::new())
//!     .expect("register");
//! form.after_render();
//!
//! form.control().on_change("email", "ada@example.com");
//! assert_eq!(
//!     form.control().get_values("email").into_one(),
//!     Some("ada@example.com".into())
//! );
//! ```

pub use hookform_core as core;
pub use hookform_runtime as runtime;

pub mod prelude {
    pub use hookform_core::{
        ChangeEvent, ElementHandle, ElementHost, EventTarget, FieldError, FieldErrors, FieldMeta,
        FieldValue, ValidationRules, WatchNames, WatchOutput,
    };
    pub use hookform_runtime::{
        FormControl, FormHandle, FormOptions, FormState, FormStateSubscriber, KeepStateOptions,
        ReValidateMode, RegisterOptions, SetValueOptions, SubscriberOptions, UnregisterOptions,
        ValidationMode,
    };

    pub use hookform_core as core;
    pub use hookform_runtime as runtime;
}
