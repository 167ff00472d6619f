#![forbid(unsafe_code)]

//! Validation payloads and field-tree errors.
//!
//! [`FieldError`] and friends are data: validators produce them and the form
//! stores them, but nothing here raises them. [`FieldTreeError`] is the one
//! real error type, returned when a registration would break the tree shape.

use indexmap::IndexMap;
use thiserror::Error;

use crate::field::ElementHandle;

/// Result of one validation rule.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidateResult {
    Message(String),
    Messages(Vec<String>),
    Passed(bool),
}

/// Every rule failure for one field, keyed by rule type.
pub type MultipleFieldErrors = IndexMap<String, ValidateResult>;

/// A recorded validation failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldError {
    /// Rule that failed (`required`, `pattern`, or a custom key).
    pub kind: String,
    pub message: Option<String>,
    pub types: Option<MultipleFieldErrors>,
    /// Element to focus when reporting the error.
    pub element: Option<ElementHandle>,
}

impl FieldError {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_element(mut self, element: ElementHandle) -> Self {
        self.element = Some(element);
        self
    }
}

/// Caller-supplied error for `set_error`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorOption {
    pub kind: Option<String>,
    pub message: Option<String>,
    pub types: Option<MultipleFieldErrors>,
}

impl From<ErrorOption> for FieldError {
    fn from(option: ErrorOption) -> Self {
        Self {
            kind: option.kind.unwrap_or_default(),
            message: option.message,
            types: option.types,
            element: None,
        }
    }
}

/// Recorded errors, keyed by field name.
pub type FieldErrors = IndexMap<String, FieldError>;

/// A registration that doesn't fit the field tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldTreeError {
    #[error("field name is empty")]
    EmptyName,

    #[error("cannot register `{name}` beneath field `{field}`")]
    NestedUnderField { name: String, field: String },

    #[error("cannot register `{name}` over nested fields")]
    ShadowsGroup { name: String },
}
