#![forbid(unsafe_code)]

//! Core: field values, path access, structural clone, change-signal
//! extraction, the field tree with focus dispatch, and watch resolution.
//!
//! Nothing in this crate is reactive. The form controller and its
//! notification plumbing live in `hookform-runtime`.

pub mod clone;
pub mod error;
pub mod event;
pub mod field;
pub mod focus;
pub mod logging;
pub mod path;
pub mod value;
pub mod watch;

pub use clone::structural_clone;
pub use error::{ErrorOption, FieldError, FieldErrors, FieldTreeError, MultipleFieldErrors, ValidateResult};
pub use event::{ChangeEvent, ChangeSignal, EventKind, EventTarget, InputKind, get_event_value};
pub use field::{ElementHandle, FieldMeta, FieldNode, FieldTree, ValidationRules};
pub use focus::{ElementHost, focus_field_by, focus_field_by_names};
pub use value::{Callable, FieldValue, MAX_ARRAY_INDEX, Object, OpaqueHandle, OpaqueKind};
pub use watch::{NamesRegistry, WatchNames, WatchOutput, generate_watch_output};
