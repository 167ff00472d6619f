#![forbid(unsafe_code)]

//! Change-signal normalization.
//!
//! A field's new value arrives either as the value itself or wrapped in a UI
//! change event. [`get_event_value`] turns both into the value the field
//! stores: checkboxes yield their checked state, every other input its value.

use crate::value::FieldValue;

/// Input element kind, as far as value extraction cares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InputKind {
    #[default]
    Text,
    Checkbox,
    Radio,
    Number,
    Select,
    File,
    Other,
}

impl InputKind {
    /// Map an element's `type` attribute.
    #[must_use]
    pub fn from_type_attr(attr: &str) -> Self {
        match attr {
            "text" | "email" | "password" | "search" | "tel" | "url" | "textarea" => Self::Text,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "number" | "range" => Self::Number,
            "select-one" | "select-multiple" => Self::Select,
            "file" => Self::File,
            _ => Self::Other,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_checkbox(self) -> bool {
        self == Self::Checkbox
    }
}

/// The element that raised a change event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventTarget {
    pub kind: InputKind,
    pub name: Option<String>,
    pub checked: bool,
    pub value: FieldValue,
}

impl EventTarget {
    pub fn text(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn checkbox(checked: bool, value: impl Into<FieldValue>) -> Self {
        Self {
            kind: InputKind::Checkbox,
            checked,
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The value a field bound to this element stores.
    #[must_use]
    pub fn field_value(&self) -> FieldValue {
        if self.kind.is_checkbox() {
            FieldValue::Bool(self.checked)
        } else {
            self.value.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EventKind {
    #[default]
    Change,
    Blur,
}

/// A UI change or blur event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub target: EventTarget,
}

impl ChangeEvent {
    #[must_use]
    pub fn change(target: EventTarget) -> Self {
        Self {
            kind: EventKind::Change,
            target,
        }
    }

    #[must_use]
    pub fn blur(target: EventTarget) -> Self {
        Self {
            kind: EventKind::Blur,
            target,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_blur(&self) -> bool {
        self.kind == EventKind::Blur
    }
}

/// Either a raw value or a UI event carrying one.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeSignal {
    Value(FieldValue),
    Event(ChangeEvent),
}

impl ChangeSignal {
    #[must_use]
    pub fn is_blur(&self) -> bool {
        matches!(self, Self::Event(event) if event.is_blur())
    }
}

impl From<FieldValue> for ChangeSignal {
    fn from(value: FieldValue) -> Self {
        Self::Value(value)
    }
}

impl From<ChangeEvent> for ChangeSignal {
    fn from(event: ChangeEvent) -> Self {
        Self::Event(event)
    }
}

impl From<&str> for ChangeSignal {
    fn from(value: &str) -> Self {
        Self::Value(value.into())
    }
}

impl From<String> for ChangeSignal {
    fn from(value: String) -> Self {
        Self::Value(value.into())
    }
}

impl From<bool> for ChangeSignal {
    fn from(value: bool) -> Self {
        Self::Value(value.into())
    }
}

impl From<f64> for ChangeSignal {
    fn from(value: f64) -> Self {
        Self::Value(value.into())
    }
}

/// Extract the value a field should store from a change signal.
///
/// A dynamic value counts as an event when it is an object with a truthy
/// `target` member; its `target.type == "checkbox"` selects `target.checked`,
/// anything else `target.value` (`Null` when absent). All other values are
/// returned unchanged.
pub fn get_event_value(signal: impl Into<ChangeSignal>) -> FieldValue {
    match signal.into() {
        ChangeSignal::Event(event) => event.target.field_value(),
        ChangeSignal::Value(value) => match value.child("target") {
            Some(target) if target.is_truthy() => {
                let is_checkbox = target
                    .child("type")
                    .is_some_and(|t| t.as_str() == Some("checkbox"));
                let member = if is_checkbox { "checked" } else { "value" };
                target.child(member).unwrap_or_default()
            }
            _ => value,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(get_event_value("hello"), FieldValue::from("hello"));
        assert_eq!(get_event_value(3.0), FieldValue::from(3.0));
        assert_eq!(get_event_value(FieldValue::Null), FieldValue::Null);
    }

    #[test]
    fn object_without_target_passes_through() {
        let value = FieldValue::object_from([("value", FieldValue::from("x"))]);
        assert!(get_event_value(value.clone()).is_same(&value));
    }

    #[test]
    fn typed_checkbox_yields_checked() {
        let event = ChangeEvent::change(EventTarget::checkbox(true, "x"));
        assert_eq!(get_event_value(event), FieldValue::Bool(true));
    }

    #[test]
    fn typed_text_yields_value() {
        let event = ChangeEvent::change(EventTarget::text("typed"));
        assert_eq!(get_event_value(event), FieldValue::from("typed"));
    }

    #[test]
    fn dynamic_checkbox_event() {
        let signal = FieldValue::object_from([(
            "target",
            FieldValue::object_from([
                ("type", FieldValue::from("checkbox")),
                ("checked", FieldValue::from(true)),
                ("value", FieldValue::from("x")),
            ]),
        )]);
        assert_eq!(get_event_value(signal), FieldValue::Bool(true));
    }

    #[test]
    fn dynamic_text_event() {
        let signal = FieldValue::object_from([(
            "target",
            FieldValue::object_from([("value", FieldValue::from("abc"))]),
        )]);
        assert_eq!(get_event_value(signal), FieldValue::from("abc"));
    }

    #[test]
    fn falsy_target_is_not_an_event() {
        let signal = FieldValue::object_from([("target", FieldValue::Null)]);
        assert!(get_event_value(signal.clone()).is_same(&signal));
    }

    #[test]
    fn input_kind_from_type_attr() {
        assert_eq!(InputKind::from_type_attr("checkbox"), InputKind::Checkbox);
        assert_eq!(InputKind::from_type_attr("email"), InputKind::Text);
        assert_eq!(InputKind::from_type_attr("color"), InputKind::Other);
    }

    #[test]
    fn blur_detection() {
        assert!(ChangeSignal::from(ChangeEvent::blur(EventTarget::default())).is_blur());
        assert!(!ChangeSignal::from("x").is_blur());
    }
}
