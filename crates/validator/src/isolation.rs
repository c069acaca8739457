#![forbid(unsafe_code)]

use crate::methods::MethodView;
use crate::schema::{Diagnostics, require_array, require_enum, require_hash};
use serde_yaml::Value;

pub(crate) const TEST_LEVELS: &[&str] = &["unit", "integration", "request"];
pub(crate) const CONFIDENCE_LEVELS: &[&str] = &["high", "medium", "low"];
pub(crate) const ISOLATION_MODES: &[&str] = &["real", "stubbed", "none"];
pub(crate) const ISOLATION_TARGETS: &[&str] = &["db", "external_http", "queue"];

/// Shape of the per-method isolation decision. Whether the decision is right is not checked.
pub(crate) fn check_test_configs(methods: &[MethodView<'_>], diags: &mut Diagnostics) {
    for method in methods {
        let label = format!("methods[{}].test_config", method.index);
        let Some(config) = require_hash(method.raw.get("test_config"), &label, diags) else {
            continue;
        };
        require_enum(
            config.get("test_level"),
            &format!("{label}.test_level"),
            TEST_LEVELS,
            diags,
        );
        require_enum(
            config.get("confidence"),
            &format!("{label}.confidence"),
            CONFIDENCE_LEVELS,
            diags,
        );
        if let Some(isolation) =
            require_hash(config.get("isolation"), &format!("{label}.isolation"), diags)
        {
            for target in ISOLATION_TARGETS {
                require_enum(
                    isolation.get(*target),
                    &format!("{label}.isolation.{target}"),
                    ISOLATION_MODES,
                    diags,
                );
            }
        }
        let trace_label = format!("{label}.decision_trace");
        if let Some(trace) = require_array(config.get("decision_trace"), &trace_label, diags) {
            if trace.is_empty() {
                diags.schema(format!("{trace_label} must not be empty"));
            }
            for (idx, step) in trace.iter().enumerate() {
                let well_formed = match step {
                    Value::String(text) => !text.trim().is_empty(),
                    Value::Mapping(map) => !map.is_empty(),
                    _ => false,
                };
                if !well_formed {
                    diags.schema(format!(
                        "{trace_label}[{idx}] must be a non-empty string or mapping"
                    ));
                }
            }
        }
    }
}
