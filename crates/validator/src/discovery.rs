#![forbid(unsafe_code)]

use crate::methods::METHOD_MODES;
use crate::schema::{
    Diagnostics, optional_string, require_array, require_bool, require_enum, require_hash,
    require_int, require_string,
};
use serde_yaml::Value;
use std::collections::BTreeSet;

/// File-level fields the discovery stage records for later stages.
pub(crate) fn check_discovery_fields(doc: &Value, diags: &mut Diagnostics) {
    require_string(doc.get("source_file"), "source_file", diags);
    require_string(doc.get("spec_file"), "spec_file", diags);
    optional_string(doc.get("class_name"), "class_name", diags);
}

/// `required` is true for the discovery stage, which must produce a non-empty selection.
/// Later stages only re-check the entries when the list is present.
pub(crate) fn check_methods_to_analyze(doc: &Value, required: bool, diags: &mut Diagnostics) {
    let raw = doc.get("methods_to_analyze");
    if !required && raw.is_none_or(Value::is_null) {
        return;
    }
    let Some(items) = require_array(raw, "methods_to_analyze", diags) else {
        return;
    };
    if required && items.is_empty() {
        diags.schema("methods_to_analyze must not be empty");
    }

    let mut names = BTreeSet::new();
    for (idx, item) in items.iter().enumerate() {
        let label = format!("methods_to_analyze[{idx}]");
        let Some(item) = require_hash(Some(item), &label, diags) else {
            continue;
        };
        if let Some(name) = require_string(item.get("name"), &format!("{label}.name"), diags)
            && !names.insert(name)
        {
            diags.schema(format!(
                "Duplicate methods_to_analyze[].name at {label} (duplicate: {name})"
            ));
        }
        require_enum(
            item.get("method_mode"),
            &format!("{label}.method_mode"),
            METHOD_MODES,
            diags,
        );
        check_line_range(item.get("line_range"), &format!("{label}.line_range"), diags);
        require_bool(item.get("selected"), &format!("{label}.selected"), diags);
    }
}

fn check_line_range(value: Option<&Value>, label: &str, diags: &mut Diagnostics) {
    let Some(bounds) = require_array(value, label, diags) else {
        return;
    };
    if bounds.len() != 2 {
        diags.schema(format!(
            "{label} must be a [start, end] pair (got {} entries)",
            bounds.len()
        ));
        return;
    }
    let start = require_int(bounds.first(), &format!("{label}[0]"), 1, diags);
    let end = require_int(bounds.get(1), &format!("{label}[1]"), 1, diags);
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        diags.schema(format!(
            "{label} must satisfy start <= end (got [{start}, {end}])"
        ));
    }
}
