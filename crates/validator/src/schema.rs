#![forbid(unsafe_code)]

use serde_yaml::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FindingKind {
    Schema,
    Structural,
    Reference,
    Complexity,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Finding {
    pub(crate) kind: FindingKind,
    pub(crate) message: String,
}

/// Batched findings for one run. Checks append and keep going; nothing here aborts.
#[derive(Clone, Debug, Default)]
pub(crate) struct Diagnostics {
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
}

impl Diagnostics {
    pub(crate) fn error(&mut self, kind: FindingKind, message: impl Into<String>) {
        self.errors.push(Finding {
            kind,
            message: message.into(),
        });
    }

    pub(crate) fn schema(&mut self, message: impl Into<String>) {
        self.error(FindingKind::Schema, message);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(Finding {
            kind: FindingKind::Complexity,
            message: message.into(),
        });
    }

    pub(crate) fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub(crate) fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub(crate) fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

pub(crate) fn require_hash<'v>(
    value: Option<&'v Value>,
    label: &str,
    diags: &mut Diagnostics,
) -> Option<&'v Value> {
    if is_missing(value) {
        diags.schema(format!("Missing {label}"));
        return None;
    }
    let value = value?;
    if !value.is_mapping() {
        diags.schema(format!("{label} must be a mapping"));
        return None;
    }
    Some(value)
}

pub(crate) fn require_array<'v>(
    value: Option<&'v Value>,
    label: &str,
    diags: &mut Diagnostics,
) -> Option<&'v [Value]> {
    if is_missing(value) {
        diags.schema(format!("Missing {label}"));
        return None;
    }
    match value.and_then(Value::as_sequence) {
        Some(items) => Some(items.as_slice()),
        None => {
            diags.schema(format!("{label} must be an array"));
            None
        }
    }
}

pub(crate) fn require_string<'v>(
    value: Option<&'v Value>,
    label: &str,
    diags: &mut Diagnostics,
) -> Option<&'v str> {
    if is_missing(value) {
        diags.schema(format!("Missing {label}"));
        return None;
    }
    match value.and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => Some(text),
        _ => {
            diags.schema(format!("{label} must be a non-empty string"));
            None
        }
    }
}

/// Absent and `null` are fine; anything else must pass `require_string`.
pub(crate) fn optional_string<'v>(
    value: Option<&'v Value>,
    label: &str,
    diags: &mut Diagnostics,
) -> Option<&'v str> {
    if is_missing(value) {
        return None;
    }
    require_string(value, label, diags)
}

pub(crate) fn require_bool(
    value: Option<&Value>,
    label: &str,
    diags: &mut Diagnostics,
) -> Option<bool> {
    if is_missing(value) {
        diags.schema(format!("Missing {label}"));
        return None;
    }
    let parsed = value.and_then(Value::as_bool);
    if parsed.is_none() {
        diags.schema(format!("{label} must be a boolean"));
    }
    parsed
}

pub(crate) fn require_int(
    value: Option<&Value>,
    label: &str,
    min: i64,
    diags: &mut Diagnostics,
) -> Option<i64> {
    if is_missing(value) {
        diags.schema(format!("Missing {label}"));
        return None;
    }
    match value.and_then(Value::as_i64) {
        Some(n) if n >= min => Some(n),
        _ => {
            diags.schema(format!("{label} must be an integer >= {min}"));
            None
        }
    }
}

pub(crate) fn require_enum<'v>(
    value: Option<&'v Value>,
    label: &str,
    allowed: &[&str],
    diags: &mut Diagnostics,
) -> Option<&'v str> {
    if is_missing(value) {
        diags.schema(format!("Missing {label}"));
        return None;
    }
    let found = value.and_then(Value::as_str).map(str::trim);
    if let Some(text) = found
        && allowed.contains(&text)
    {
        return Some(text);
    }
    let got = value.map(describe_scalar).unwrap_or_default();
    diags.schema(format!(
        "{label} must be one of: {} (got {got})",
        allowed.join(", ")
    ));
    None
}

/// Value cells may be written as strings, booleans or numbers; they are compared as text.
pub(crate) fn require_scalar(
    value: Option<&Value>,
    label: &str,
    diags: &mut Diagnostics,
) -> Option<String> {
    if is_missing(value) {
        diags.schema(format!("Missing {label}"));
        return None;
    }
    let text = value.and_then(scalar_text);
    if text.is_none() {
        diags.schema(format!("{label} must be a string, boolean or number"));
    }
    text
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        }
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn describe_scalar(value: &Value) -> String {
    match value {
        Value::Sequence(_) => "an array".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(_) => "a tagged value".to_string(),
        Value::Null => "null".to_string(),
        other => scalar_text(other)
            .map(|text| format!("`{text}`"))
            .unwrap_or_else(|| "an empty string".to_string()),
    }
}
