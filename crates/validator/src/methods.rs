#![forbid(unsafe_code)]

use crate::schema::{
    Diagnostics, FindingKind, optional_string, require_array, require_bool, require_enum,
    require_hash, require_int, require_scalar, require_string, scalar_text,
};
use mv_core::model::{Characteristic, CharacteristicValue};
use serde_yaml::Value;
use std::collections::BTreeSet;

pub(crate) const METHOD_TYPES: &[&str] = &["instance", "class"];
pub(crate) const METHOD_MODES: &[&str] = &["new", "modified", "unchanged"];
pub(crate) const CHARACTERISTIC_TYPES: &[&str] = &["binary", "enum", "range", "sequential"];
pub(crate) const SOURCE_KINDS: &[&str] = &["internal", "external"];
pub(crate) const SETUP_TYPES: &[&str] = &["model", "data", "action"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BehaviorRef<'v> {
    pub(crate) location: String,
    pub(crate) behavior_id: &'v str,
}

/// A checked `methods[]` entry plus the typed characteristic list for the tree builder.
#[derive(Clone, Debug)]
pub(crate) struct MethodView<'v> {
    pub(crate) index: usize,
    pub(crate) name: Option<&'v str>,
    pub(crate) method_mode: Option<&'v str>,
    pub(crate) raw: &'v Value,
    pub(crate) characteristic_count: usize,
    pub(crate) characteristics: Vec<Characteristic>,
    /// False when any field the tree keys on failed its schema check.
    pub(crate) tree_ready: bool,
    pub(crate) value_refs: Vec<BehaviorRef<'v>>,
    pub(crate) side_effect_refs: Vec<BehaviorRef<'v>>,
    pub(crate) side_effect_count: usize,
}

impl MethodView<'_> {
    pub(crate) fn display_name(&self) -> String {
        match self.name {
            Some(name) => format!("`{name}`"),
            None => format!("methods[{}]", self.index),
        }
    }
}

pub(crate) fn check_methods<'v>(doc: &'v Value, diags: &mut Diagnostics) -> Vec<MethodView<'v>> {
    let Some(items) = require_array(doc.get("methods"), "methods", diags) else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let label = format!("methods[{idx}]");
        let Some(item) = require_hash(Some(item), &label, diags) else {
            continue;
        };
        let view = check_method(idx, item, diags);
        if let Some(name) = view.name
            && !seen.insert(name)
        {
            diags.schema(format!(
                "Duplicate methods[].name at {label} (duplicate: {name})"
            ));
        }
        out.push(view);
    }
    out
}

fn check_method<'v>(idx: usize, item: &'v Value, diags: &mut Diagnostics) -> MethodView<'v> {
    let label = format!("methods[{idx}]");
    let name = require_string(item.get("name"), &format!("{label}.name"), diags);
    require_enum(
        item.get("type"),
        &format!("{label}.type"),
        METHOD_TYPES,
        diags,
    );
    require_bool(item.get("analyzed"), &format!("{label}.analyzed"), diags);
    let method_mode = require_enum(
        item.get("method_mode"),
        &format!("{label}.method_mode"),
        METHOD_MODES,
        diags,
    );

    let mut view = MethodView {
        index: idx,
        name,
        method_mode,
        raw: item,
        characteristic_count: 0,
        characteristics: Vec::new(),
        tree_ready: false,
        value_refs: Vec::new(),
        side_effect_refs: Vec::new(),
        side_effect_count: 0,
    };

    if let Some(chars) = require_array(
        item.get("characteristics"),
        &format!("{label}.characteristics"),
        diags,
    ) {
        view.characteristic_count = chars.len();
        view.tree_ready = true;
        let mut names = BTreeSet::new();
        for (char_idx, raw) in chars.iter().enumerate() {
            let char_label = format!("{label}.characteristics[{char_idx}]");
            let Some(raw) = require_hash(Some(raw), &char_label, diags) else {
                view.tree_ready = false;
                continue;
            };
            match check_characteristic(char_idx, raw, &char_label, &mut view.value_refs, diags) {
                Some(characteristic) => {
                    if !names.insert(characteristic.name.clone()) {
                        diags.error(
                            FindingKind::Structural,
                            format!(
                                "Duplicate characteristic name `{}` at {char_label} (method {})",
                                characteristic.name,
                                view.display_name()
                            ),
                        );
                        view.tree_ready = false;
                    }
                    view.characteristics.push(characteristic);
                }
                None => view.tree_ready = false,
            }
        }
    }

    match item.get("side_effects") {
        None | Some(Value::Null) => {}
        raw => {
            if let Some(effects) = require_array(raw, &format!("{label}.side_effects"), diags) {
                view.side_effect_count = effects.len();
                for (effect_idx, effect) in effects.iter().enumerate() {
                    let effect_label = format!("{label}.side_effects[{effect_idx}]");
                    if let Some(effect_ref) = check_side_effect(effect, &effect_label, diags) {
                        view.side_effect_refs.push(effect_ref);
                    }
                }
            }
        }
    }

    view
}

/// Returns the typed characteristic only when every field the tree keys on is well-formed.
fn check_characteristic<'v>(
    index: usize,
    raw: &'v Value,
    label: &str,
    value_refs: &mut Vec<BehaviorRef<'v>>,
    diags: &mut Diagnostics,
) -> Option<Characteristic> {
    let before = diags.error_count();

    let name = require_string(raw.get("name"), &format!("{label}.name"), diags);
    let level = require_int(raw.get("level"), &format!("{label}.level"), 1, diags);
    let depends_on = match raw.get("depends_on") {
        None | Some(Value::Null) => None,
        Some(Value::String(parent)) if !parent.trim().is_empty() => Some(parent.trim().to_string()),
        Some(_) => {
            diags.schema(format!(
                "{label}.depends_on must be a characteristic name or null"
            ));
            None
        }
    };
    let when_parent = match raw.get("when_parent") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(states)) => {
            let mut out = Vec::with_capacity(states.len());
            for (state_idx, state) in states.iter().enumerate() {
                match scalar_text(state) {
                    Some(text) => out.push(text),
                    None => diags.schema(format!(
                        "{label}.when_parent[{state_idx}] must be a string, boolean or number"
                    )),
                }
            }
            out
        }
        Some(_) => {
            diags.schema(format!(
                "{label}.when_parent must be a list of parent values or null"
            ));
            Vec::new()
        }
    };

    let mut values = Vec::new();
    let value_items = require_array(raw.get("values"), &format!("{label}.values"), diags);
    if let Some(items) = value_items {
        if items.is_empty() {
            diags.schema(format!("{label}.values must not be empty"));
        }
        let mut seen = BTreeSet::new();
        for (value_idx, item) in items.iter().enumerate() {
            let value_label = format!("{label}.values[{value_idx}]");
            let Some(item) = require_hash(Some(item), &value_label, diags) else {
                continue;
            };
            if let Some(value) = check_value(item, &value_label, value_refs, diags) {
                if !seen.insert(value.value.clone()) {
                    diags.error(
                        FindingKind::Structural,
                        format!("Duplicate value `{}` at {value_label}", value.value),
                    );
                }
                values.push(value);
            }
        }
    }

    let tree_fields_ok = diags.error_count() == before;

    require_string(
        raw.get("description"),
        &format!("{label}.description"),
        diags,
    );
    for (value_idx, item) in value_items.unwrap_or_default().iter().enumerate() {
        if item.is_mapping() {
            require_string(
                item.get("description"),
                &format!("{label}.values[{value_idx}].description"),
                diags,
            );
        }
    }
    let kind = require_enum(
        raw.get("type"),
        &format!("{label}.type"),
        CHARACTERISTIC_TYPES,
        diags,
    );
    if kind == Some("binary") && tree_fields_ok && values.len() != 2 {
        diags.schema(format!(
            "{label}.values must hold exactly 2 entries for a binary characteristic (got {})",
            values.len()
        ));
    }
    if let Some(source) = require_hash(raw.get("source"), &format!("{label}.source"), diags) {
        require_enum(
            source.get("kind"),
            &format!("{label}.source.kind"),
            SOURCE_KINDS,
            diags,
        );
        optional_string(source.get("class"), &format!("{label}.source.class"), diags);
        optional_string(
            source.get("method"),
            &format!("{label}.source.method"),
            diags,
        );
    }
    if let Some(setup) = require_hash(raw.get("setup"), &format!("{label}.setup"), diags) {
        require_enum(
            setup.get("type"),
            &format!("{label}.setup.type"),
            SETUP_TYPES,
            diags,
        );
        optional_string(setup.get("class"), &format!("{label}.setup.class"), diags);
    }

    if !tree_fields_ok {
        return None;
    }
    Some(Characteristic {
        index,
        name: name?.to_string(),
        level: u64::try_from(level?).ok()?,
        depends_on,
        when_parent,
        values,
    })
}

fn check_value<'v>(
    item: &'v Value,
    label: &str,
    value_refs: &mut Vec<BehaviorRef<'v>>,
    diags: &mut Diagnostics,
) -> Option<CharacteristicValue> {
    let value = require_scalar(item.get("value"), &format!("{label}.value"), diags);
    let terminal = require_bool(item.get("terminal"), &format!("{label}.terminal"), diags);
    let behavior_id = match item.get("behavior_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.trim()),
        Some(_) => {
            diags.schema(format!("{label}.behavior_id must be a string"));
            None
        }
    };
    if let Some(id) = behavior_id.filter(|id| !id.is_empty()) {
        value_refs.push(BehaviorRef {
            location: label.to_string(),
            behavior_id: id,
        });
    }
    Some(CharacteristicValue {
        value: value?,
        terminal: terminal?,
        behavior_id: behavior_id.map(str::to_string),
    })
}

fn check_side_effect<'v>(
    effect: &'v Value,
    label: &str,
    diags: &mut Diagnostics,
) -> Option<BehaviorRef<'v>> {
    let effect = require_hash(Some(effect), label, diags)?;
    optional_string(effect.get("type"), &format!("{label}.type"), diags);
    optional_string(effect.get("description"), &format!("{label}.description"), diags);
    let behavior_id = optional_string(
        effect.get("behavior_id"),
        &format!("{label}.behavior_id"),
        diags,
    )?;
    Some(BehaviorRef {
        location: label.to_string(),
        behavior_id,
    })
}
