#![forbid(unsafe_code)]

use crate::behaviors::BehaviorBank;
use crate::methods::MethodView;
use crate::schema::{Diagnostics, FindingKind};
use mv_core::tree::{CharacteristicArena, leaf_cells};
use serde_yaml::Value;
use std::collections::BTreeSet;

/// Every leaf must name the behavior its generated example asserts.
///
/// A value reached through several parent states is one cell in the document, so it is
/// reported once no matter how many paths lead to it.
pub(crate) fn check_leaf_bindings(
    method: &MethodView<'_>,
    arena: &CharacteristicArena<'_>,
    diags: &mut Diagnostics,
) {
    for cell in leaf_cells(arena) {
        let Some(characteristic) = arena.get(cell.characteristic) else {
            continue;
        };
        let Some(value) = characteristic.values.get(cell.value) else {
            continue;
        };
        if value.bound_behavior().is_some() {
            continue;
        }
        diags.error(
            FindingKind::Structural,
            format!(
                "Missing values[].behavior_id on leaf value: method {} characteristics[{}] ({}) values[{}] ({})",
                method.display_name(),
                characteristic.index,
                characteristic.name,
                cell.value,
                value.value
            ),
        );
    }
}

pub(crate) fn check_behavior_references(
    methods: &[MethodView<'_>],
    bank: &BehaviorBank<'_>,
    diags: &mut Diagnostics,
) {
    for method in methods {
        for reference in &method.value_refs {
            if !bank.contains(reference.behavior_id) {
                diags.error(
                    FindingKind::Reference,
                    format!(
                        "Unknown behavior_id `{}` at {} (method {})",
                        reference.behavior_id,
                        reference.location,
                        method.display_name()
                    ),
                );
            }
        }
        for reference in &method.side_effect_refs {
            match bank.get(reference.behavior_id) {
                None => diags.error(
                    FindingKind::Reference,
                    format!(
                        "Unknown behavior_id `{}` at {} (method {})",
                        reference.behavior_id,
                        reference.location,
                        method.display_name()
                    ),
                ),
                Some(entry) => {
                    if let Some(kind) = entry.kind
                        && kind != "side_effect"
                    {
                        diags.error(
                            FindingKind::Reference,
                            format!(
                                "{} references behavior `{}` (behaviors[{}]) of type `{kind}`; side effects must reference side_effect behaviors",
                                reference.location, reference.behavior_id, entry.index
                            ),
                        );
                    }
                }
            }
        }
    }
}

/// `methods[]` must cover exactly the methods selected upstream.
pub(crate) fn check_selection_set(
    doc: &Value,
    methods: &[MethodView<'_>],
    diags: &mut Diagnostics,
) {
    let Some(selection) = doc.get("methods_to_analyze").and_then(Value::as_sequence) else {
        return;
    };
    if doc.get("methods").and_then(Value::as_sequence).is_none() {
        return;
    }

    let mut selected = Vec::<(&str, Option<&str>)>::new();
    for entry in selection {
        if entry.get("selected").and_then(Value::as_bool) != Some(true) {
            continue;
        }
        let Some(name) = entry.get("name").and_then(Value::as_str).map(str::trim) else {
            continue;
        };
        if name.is_empty() || selected.iter().any(|(seen, _)| *seen == name) {
            continue;
        }
        let mode = entry.get("method_mode").and_then(Value::as_str).map(str::trim);
        selected.push((name, mode));
    }

    let analyzed = methods.iter().filter_map(|m| m.name).collect::<BTreeSet<_>>();
    let selected_names = selected.iter().map(|(name, _)| *name).collect::<BTreeSet<_>>();

    let missing = selected
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !analyzed.contains(name))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        diags.error(
            FindingKind::Reference,
            format!(
                "Selected methods missing from methods[]: {}",
                missing.join(", ")
            ),
        );
    }

    let mut extra = Vec::new();
    for name in methods.iter().filter_map(|m| m.name) {
        if !selected_names.contains(name) && !extra.contains(&name) {
            extra.push(name);
        }
    }
    if !extra.is_empty() {
        diags.error(
            FindingKind::Reference,
            format!(
                "methods[] contains methods not selected in methods_to_analyze: {}",
                extra.join(", ")
            ),
        );
    }

    for method in methods {
        let (Some(name), Some(mode)) = (method.name, method.method_mode) else {
            continue;
        };
        let Some((_, Some(selected_mode))) = selected.iter().find(|(n, _)| *n == name) else {
            continue;
        };
        if *selected_mode != mode {
            diags.error(
                FindingKind::Reference,
                format!(
                    "method_mode mismatch for `{name}`: methods_to_analyze says `{selected_mode}`, methods[{}] says `{mode}`",
                    method.index
                ),
            );
        }
    }
}
