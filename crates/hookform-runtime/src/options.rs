#![forbid(unsafe_code)]

//! Form, field, and operation options.
//!
//! All option structs are plain data with `Default` and chained `with_*`
//! builders.

use hookform_core::{FieldValue, ValidationRules};

/// When fields validate before the first submit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    #[default]
    OnSubmit,
    OnBlur,
    OnChange,
    /// First validation on blur, then on every change.
    OnTouched,
    All,
}

/// When fields validate after the first submit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReValidateMode {
    #[default]
    OnChange,
    OnBlur,
    OnSubmit,
}

/// Whether a change or blur event should skip field validation.
#[must_use]
pub fn should_skip_validation(
    is_blur: bool,
    is_touched: bool,
    is_submitted: bool,
    re_validate_mode: ReValidateMode,
    mode: ValidationMode,
) -> bool {
    if mode == ValidationMode::All {
        return false;
    }
    if !is_submitted && mode == ValidationMode::OnTouched {
        return !(is_touched || is_blur);
    }
    let on_blur = if is_submitted {
        re_validate_mode == ReValidateMode::OnBlur
    } else {
        mode == ValidationMode::OnBlur
    };
    if on_blur {
        return !is_blur;
    }
    let on_change = if is_submitted {
        re_validate_mode == ReValidateMode::OnChange
    } else {
        mode == ValidationMode::OnChange
    };
    if on_change {
        return is_blur;
    }
    true
}

/// Form-wide configuration.
#[derive(Clone, Debug)]
pub struct FormOptions {
    pub mode: ValidationMode,
    pub re_validate_mode: ReValidateMode,
    /// Initial values. Snapshotted with a structural clone.
    pub default_values: FieldValue,
    /// Focus the first invalid field after a failed submit.
    pub should_focus_error: bool,
    /// Drop a field's value when its element goes away.
    pub should_unregister: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            re_validate_mode: ReValidateMode::default(),
            default_values: FieldValue::object(),
            should_focus_error: true,
            should_unregister: false,
        }
    }
}

impl FormOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_re_validate_mode(mut self, mode: ReValidateMode) -> Self {
        self.re_validate_mode = mode;
        self
    }

    #[must_use]
    pub fn with_default_values(mut self, values: FieldValue) -> Self {
        self.default_values = values;
        self
    }

    #[must_use]
    pub fn with_should_focus_error(mut self, enabled: bool) -> Self {
        self.should_focus_error = enabled;
        self
    }

    #[must_use]
    pub fn with_should_unregister(mut self, enabled: bool) -> Self {
        self.should_unregister = enabled;
        self
    }
}

/// Per-field registration options.
#[derive(Clone, Debug, Default)]
pub struct RegisterOptions {
    pub rules: ValidationRules,
    /// Initial value when the store has none for this field.
    pub value: Option<FieldValue>,
    /// Overrides [`FormOptions::should_unregister`] for this field.
    pub should_unregister: Option<bool>,
}

impl RegisterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_should_unregister(mut self, enabled: bool) -> Self {
        self.should_unregister = Some(enabled);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetValueOptions {
    pub should_validate: bool,
    pub should_dirty: bool,
    pub should_touch: bool,
}

impl SetValueOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_should_validate(mut self, enabled: bool) -> Self {
        self.should_validate = enabled;
        self
    }

    #[must_use]
    pub fn with_should_dirty(mut self, enabled: bool) -> Self {
        self.should_dirty = enabled;
        self
    }

    #[must_use]
    pub fn with_should_touch(mut self, enabled: bool) -> Self {
        self.should_touch = enabled;
        self
    }
}

/// What an unregistered field leaves behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnregisterOptions {
    pub keep_value: bool,
    pub keep_error: bool,
    pub keep_dirty: bool,
    pub keep_touched: bool,
    pub keep_default_value: bool,
}

/// What a form reset preserves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeepStateOptions {
    pub keep_values: bool,
    pub keep_default_values: bool,
    pub keep_errors: bool,
    pub keep_dirty: bool,
    pub keep_touched: bool,
    pub keep_is_submitted: bool,
    pub keep_submit_count: bool,
    pub keep_is_valid: bool,
}
