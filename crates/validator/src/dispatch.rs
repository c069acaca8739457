#![forbid(unsafe_code)]

use crate::behaviors::index_behaviors;
use crate::discovery::{check_discovery_fields, check_methods_to_analyze};
use crate::isolation::check_test_configs;
use crate::methods::{MethodView, check_methods};
use crate::references::{check_behavior_references, check_leaf_bindings, check_selection_set};
use crate::schema::{Diagnostics, require_bool};
use crate::spec_file::check_spec_file;
use crate::stage::Stage;
use crate::structure::check_structure;
use mv_core::complexity::{ComplexityThresholds, estimate};
use mv_core::tree::CharacteristicArena;
use serde_yaml::Value;
use std::path::Path;

pub(crate) const SCOPE_DECISION_WARNING: &str = "Combinatorial explosion risk: use AskUserQuestion to decide whether to continue with the full scope or reduce it before generating tests";

pub(crate) struct StageContext<'a> {
    pub(crate) stage: Stage,
    pub(crate) thresholds: ComplexityThresholds,
    pub(crate) project_root: &'a Path,
    pub(crate) trace: bool,
}

impl StageContext<'_> {
    fn log(&self, message: &str) {
        if self.trace {
            eprintln!("validate_metadata_stage: {message}");
        }
    }
}

/// Runs every check the stage owns and returns the batched findings.
pub(crate) fn validate_stage(doc: &Value, ctx: &StageContext<'_>) -> Diagnostics {
    let mut diags = Diagnostics::default();
    check_automation(doc, ctx.stage, &mut diags);

    if !ctx.stage.runs_analysis_checks() {
        check_discovery_fields(doc, &mut diags);
        check_methods_to_analyze(doc, true, &mut diags);
        return diags;
    }

    // Every later stage re-checks the analysis output it builds on.
    check_methods_to_analyze(doc, false, &mut diags);
    let bank = index_behaviors(doc, &mut diags);
    let methods = check_methods(doc, &mut diags);
    ctx.log(&format!(
        "stage={} behaviors={} methods={}",
        ctx.stage.as_str(),
        bank.len(),
        methods.len()
    ));

    let mut arenas = Vec::new();
    for method in &methods {
        if let Some(arena) = check_structure(method, &mut diags) {
            check_leaf_bindings(method, &arena, &mut diags);
            arenas.push((method, arena));
        }
    }
    check_behavior_references(&methods, &bank, &mut diags);
    check_selection_set(doc, &methods, &mut diags);

    if ctx.stage.estimates_complexity() {
        check_complexity(&arenas, ctx, &mut diags);
    }
    if ctx.stage.requires_test_config() {
        check_test_configs(&methods, &mut diags);
    }
    if ctx.stage.requires_spec_file() {
        check_spec_file(
            doc,
            ctx.project_root,
            ctx.stage.forbids_placeholders(),
            &mut diags,
        );
    }
    diags
}

/// `automation` is optional, but when present it must show every earlier stage as done.
fn check_automation(doc: &Value, stage: Stage, diags: &mut Diagnostics) {
    let automation = match doc.get("automation") {
        None | Some(Value::Null) => return,
        Some(value) if value.is_mapping() => value,
        Some(_) => {
            diags.schema("automation must be a mapping");
            return;
        }
    };

    let own_key = stage.completion_key();
    if let Some(raw) = automation.get(own_key)
        && !raw.is_null()
    {
        require_bool(Some(raw), &format!("automation.{own_key}"), diags);
    }
    for earlier in stage.predecessors() {
        let key = earlier.completion_key();
        if automation.get(key).and_then(Value::as_bool) != Some(true) {
            diags.schema(format!(
                "automation.{key} must be true before {} output is accepted",
                stage.as_str()
            ));
        }
    }
}

fn check_complexity(
    arenas: &[(&MethodView<'_>, CharacteristicArena<'_>)],
    ctx: &StageContext<'_>,
    diags: &mut Diagnostics,
) {
    let limits = ctx.thresholds;
    let mut flagged = false;
    for (method, arena) in arenas {
        let metrics = estimate(
            arena,
            method.characteristic_count,
            method.side_effect_count,
        );
        ctx.log(&format!(
            "method {} characteristics={} leaf_contexts={} side_effects={} estimated_examples={}",
            method.display_name(),
            metrics.characteristics,
            metrics.leaf_contexts,
            metrics.side_effects,
            metrics.estimated_examples
        ));
        if !limits.is_exceeded(&metrics) {
            continue;
        }
        flagged = true;
        diags.warn(format!(
            "Combinatorial explosion risk in method {}: characteristics={}, leaf_contexts={}, estimated_examples={} (thresholds: characteristics>={}, leaf_contexts>={}, estimated_examples>={})",
            method.display_name(),
            metrics.characteristics,
            metrics.leaf_contexts,
            metrics.estimated_examples,
            limits.max_characteristics,
            limits.max_leaf_contexts,
            limits.max_examples
        ));
    }
    if flagged {
        diags.warn(SCOPE_DECISION_WARNING);
    }
}
