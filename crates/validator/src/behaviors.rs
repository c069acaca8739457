#![forbid(unsafe_code)]

use crate::schema::{
    Diagnostics, FindingKind, optional_string, require_array, require_bool, require_enum,
    require_hash, require_string,
};
use serde_yaml::Value;
use std::collections::BTreeMap;

pub(crate) const BEHAVIOR_TYPES: &[&str] = &["terminal", "success", "side_effect"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BehaviorEntry<'v> {
    pub(crate) index: usize,
    pub(crate) kind: Option<&'v str>,
}

/// Read-only `id -> behavior` lookup. The first declaration of an id owns it.
#[derive(Clone, Debug, Default)]
pub(crate) struct BehaviorBank<'v> {
    by_id: BTreeMap<&'v str, BehaviorEntry<'v>>,
}

impl<'v> BehaviorBank<'v> {
    pub(crate) fn get(&self, id: &str) -> Option<&BehaviorEntry<'v>> {
        self.by_id.get(id.trim())
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}

pub(crate) fn index_behaviors<'v>(doc: &'v Value, diags: &mut Diagnostics) -> BehaviorBank<'v> {
    let mut bank = BehaviorBank::default();
    let Some(items) = require_array(doc.get("behaviors"), "behaviors", diags) else {
        return bank;
    };

    for (idx, item) in items.iter().enumerate() {
        let label = format!("behaviors[{idx}]");
        let Some(item) = require_hash(Some(item), &label, diags) else {
            continue;
        };
        let id = require_string(item.get("id"), &format!("{label}.id"), diags);

        let enabled = match item.get("enabled") {
            None | Some(Value::Null) => true,
            raw => require_bool(raw, &format!("{label}.enabled"), diags).unwrap_or(true),
        };
        if enabled {
            require_string(
                item.get("description"),
                &format!("{label}.description"),
                diags,
            );
        } else {
            optional_string(
                item.get("description"),
                &format!("{label}.description"),
                diags,
            );
        }
        let kind = require_enum(
            item.get("type"),
            &format!("{label}.type"),
            BEHAVIOR_TYPES,
            diags,
        );
        optional_string(item.get("subtype"), &format!("{label}.subtype"), diags);
        check_used_by(item.get("used_by"), &label, diags);

        let Some(id) = id else {
            continue;
        };
        if bank.by_id.contains_key(id) {
            diags.error(
                FindingKind::Reference,
                format!("Duplicate behaviors[].id at {label} (duplicate: {id})"),
            );
            continue;
        }
        bank.by_id.insert(id, BehaviorEntry { index: idx, kind });
    }
    bank
}

fn check_used_by(value: Option<&Value>, label: &str, diags: &mut Diagnostics) {
    match value {
        None | Some(Value::Null) | Some(Value::Sequence(_)) => {}
        Some(Value::Number(n)) if n.as_u64().is_some() => {}
        Some(_) => diags.schema(format!(
            "{label}.used_by must be a non-negative integer or a list"
        )),
    }
}
