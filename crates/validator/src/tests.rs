#![forbid(unsafe_code)]

use super::*;
use crate::schema::{Diagnostics, require_enum, require_string, scalar_text};
use mv_core::complexity::ComplexityThresholds;
use serde_yaml::Value;
use std::path::Path;

const BEHAVIORS: &str = "behaviors:
  - id: returns_completed
    description: completes the order
    type: success
    enabled: true
  - id: returns_unauthorized
    description: rejects anonymous callers
    type: terminal
    enabled: true
  - id: sends_receipt
    description: emails a receipt
    type: side_effect
    subtype: email
    enabled: true
";

const SELECT_PROCESS: &str = "methods_to_analyze:
  - name: process
    method_mode: new
    line_range: [10, 40]
    selected: true
";

const AUTHENTICATED: &str = "      - name: authenticated
        description: caller is signed in
        type: binary
        level: 1
        depends_on: null
        when_parent: null
        source: { kind: internal, class: User, method: \"signed_in?\" }
        setup: { type: model, class: User }
        values:
          - { value: true, description: signed in, terminal: true, behavior_id: returns_completed }
          - { value: false, description: signed out, terminal: true, behavior_id: returns_unauthorized }
";

const NESTED_STATUS: &str = "      - name: order_status
        description: state of the order
        type: enum
        level: 2
        depends_on: authenticated
        when_parent: [true]
        source: { kind: internal, class: Order, method: status }
        setup: { type: data }
        values:
          - { value: pending, description: awaiting payment, terminal: false, behavior_id: returns_completed }
          - { value: shipped, description: already shipped, terminal: true, behavior_id: returns_unauthorized }
";

const TEST_CONFIG: &str = "    test_config:
      test_level: unit
      confidence: high
      isolation: { db: real, external_http: stubbed, queue: none }
      decision_trace:
        - pure model logic
";

fn method_block(name: &str, characteristics: &str) -> String {
    format!(
        "  - name: {name}
    type: instance
    analyzed: true
    method_mode: new
    characteristics:
{characteristics}"
    )
}

fn analyzed_doc(characteristics: &str) -> String {
    format!(
        "{BEHAVIORS}{SELECT_PROCESS}methods:\n{}",
        method_block("process", characteristics)
    )
}

/// Root authenticated flag whose `true` branch opens into `order_status`.
fn nested_characteristics() -> String {
    format!(
        "{}{NESTED_STATUS}",
        AUTHENTICATED.replace(
            "terminal: true, behavior_id: returns_completed",
            "terminal: false"
        )
    )
}

fn flag(name: &str) -> String {
    format!(
        "      - name: {name}
        description: {name} switch
        type: binary
        level: 1
        source: {{ kind: internal }}
        setup: {{ type: data }}
        values:
          - {{ value: true, description: set, terminal: true, behavior_id: returns_completed }}
          - {{ value: false, description: unset, terminal: true, behavior_id: returns_unauthorized }}
"
    )
}

fn flags(count: usize) -> String {
    (0..count).map(|i| flag(&format!("flag_{i}"))).collect()
}

fn enumerated(values: usize) -> String {
    let mut out = "      - name: plan
        description: subscription plan
        type: enum
        level: 1
        source: { kind: internal }
        setup: { type: data }
        values:
"
    .to_string();
    for i in 0..values {
        out.push_str(&format!(
            "          - {{ value: plan_{i}, description: plan {i}, terminal: true, behavior_id: returns_completed }}\n"
        ));
    }
    out
}

fn side_effects(count: usize) -> String {
    let mut out = "    side_effects:\n".to_string();
    for i in 0..count {
        out.push_str(&format!(
            "      - {{ type: email, description: receipt {i}, behavior_id: sends_receipt }}\n"
        ));
    }
    out
}

/// `levels` nested characteristics of `width` values; every value of a level opens the next.
fn fan_out(levels: usize, width: usize) -> String {
    let states = (0..width).map(|i| format!("v{i}")).collect::<Vec<_>>();
    let mut out = String::new();
    for level in 0..levels {
        let wiring = if level == 0 {
            "depends_on: null".to_string()
        } else {
            format!(
                "depends_on: c{}, when_parent: [{}]",
                level - 1,
                states.join(", ")
            )
        };
        let ending = if level + 1 == levels {
            "terminal: true, behavior_id: returns_completed"
        } else {
            "terminal: false"
        };
        let values = states
            .iter()
            .map(|state| format!("{{ value: {state}, description: {state}, {ending} }}"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "      - {{ name: c{level}, description: level {level}, type: enum, level: {}, {wiring}, source: {{ kind: internal }}, setup: {{ type: data }}, values: [{values}] }}\n",
            level + 1
        ));
    }
    out
}

fn validate_in(stage: Stage, yaml: &str, project_root: &Path) -> Report {
    let doc = loader::parse_document(yaml, Path::new("metadata.yml")).expect("parse fixture");
    let ctx = StageContext {
        stage,
        thresholds: ComplexityThresholds::default(),
        project_root,
        trace: false,
    };
    report::render(&validate_stage(&doc, &ctx))
}

fn validate(stage: Stage, yaml: &str) -> Report {
    validate_in(stage, yaml, Path::new("."))
}

fn error_lines(report: &Report) -> Vec<&str> {
    report
        .stderr
        .lines()
        .filter_map(|line| line.strip_prefix("- "))
        .collect()
}

fn temp_dir(prefix: &str) -> std::path::PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("mv_validator_{prefix}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn parsed(raw: &[&str]) -> ValidatorConfig {
    match parse_args(&args(raw), &no_env).expect("parse args") {
        Command::Validate(cfg) => cfg,
        other => panic!("expected a validation command, got {other:?}"),
    }
}

#[test]
fn parse_args_accepts_inline_and_separate_values() {
    let inline = parsed(&["--stage=code-analyzer", "--metadata=meta.yml"]);
    let separate = parsed(&["--stage", "code-analyzer", "--metadata", "meta.yml"]);
    assert_eq!(inline.stage, Stage::CodeAnalyzer);
    assert_eq!(separate.stage, Stage::CodeAnalyzer);
    assert_eq!(inline.metadata, separate.metadata);
    assert_eq!(inline.thresholds, ComplexityThresholds::default());
    assert!(!inline.debug);
}

#[test]
fn parse_args_rejects_unknown_or_missing_stage() {
    let err = parse_args(&args(&["--stage=linter", "--metadata=m.yml"]), &no_env)
        .expect_err("unknown stage");
    assert!(err.contains("`linter`"), "err={err}");
    assert!(err.contains("test-implementer"), "err={err}");

    let err = parse_args(&args(&["--metadata=m.yml"]), &no_env).expect_err("missing stage");
    assert!(err.contains("--stage is required"), "err={err}");

    let err = parse_args(&args(&["--stage=code-analyzer"]), &no_env).expect_err("no metadata");
    assert!(err.contains("--metadata"), "err={err}");

    let err = parse_args(&args(&["--stage"]), &no_env).expect_err("dangling flag");
    assert!(err.contains("requires STAGE"), "err={err}");
}

#[test]
fn parse_args_rejects_unknown_flags_and_bad_thresholds() {
    let err = parse_args(
        &args(&["--stage=code-analyzer", "--metadata=m.yml", "--strict"]),
        &no_env,
    )
    .expect_err("unknown flag");
    assert!(err.contains("--strict"), "err={err}");

    let err = parse_args(
        &args(&["--stage=code-analyzer", "--metadata=m.yml", "--max-examples=0"]),
        &no_env,
    )
    .expect_err("zero threshold");
    assert!(err.contains("positive integer"), "err={err}");
}

#[test]
fn flags_override_env_thresholds() {
    let env = |name: &str| match name {
        config::ENV_MAX_CHARACTERISTICS => Some("9".to_string()),
        config::ENV_MAX_EXAMPLES => Some("70".to_string()),
        config::ENV_PROJECT_ROOT => Some("/srv/app".to_string()),
        config::ENV_DEBUG => Some("1".to_string()),
        _ => None,
    };
    let cmd = parse_args(
        &args(&[
            "--stage=code-analyzer",
            "--metadata=m.yml",
            "--max-characteristics",
            "3",
        ]),
        &env,
    )
    .expect("parse args");
    let Command::Validate(cfg) = cmd else {
        panic!("expected a validation command");
    };
    assert_eq!(cfg.thresholds.max_characteristics, 3);
    assert_eq!(cfg.thresholds.max_leaf_contexts, 25);
    assert_eq!(cfg.thresholds.max_examples, 70);
    assert_eq!(cfg.project_root, std::path::PathBuf::from("/srv/app"));
    assert!(cfg.debug);
}

#[test]
fn help_and_version_short_circuit() {
    assert!(matches!(
        parse_args(&args(&["--stage=nope", "--help"]), &no_env),
        Ok(Command::Help)
    ));
    assert!(matches!(
        parse_args(&args(&["-V"]), &no_env),
        Ok(Command::Version)
    ));
    assert!(usage().contains("isolation-decider"));
}

#[test]
fn schema_helpers_report_label_and_offending_value() {
    let mut diags = Diagnostics::default();
    let value: Value = serde_yaml::from_str("kind: remote").expect("yaml");
    assert_eq!(
        require_enum(value.get("kind"), "source.kind", &["internal", "external"], &mut diags),
        None
    );
    assert_eq!(
        diags.errors()[0].message,
        "source.kind must be one of: internal, external (got `remote`)"
    );

    let blank: Value = serde_yaml::from_str("name: '  '").expect("yaml");
    assert_eq!(require_string(blank.get("name"), "name", &mut diags), None);
    assert_eq!(require_string(None, "id", &mut diags), None);
    let messages = diags
        .errors()
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>();
    assert_eq!(messages[1], "name must be a non-empty string");
    assert_eq!(messages[2], "Missing id");
}

#[test]
fn scalar_cells_compare_as_text() {
    let doc: Value = serde_yaml::from_str("[true, 3, ' pending ', null, [1]]").expect("yaml");
    let cells = doc
        .as_sequence()
        .expect("sequence")
        .iter()
        .map(scalar_text)
        .collect::<Vec<_>>();
    assert_eq!(
        cells,
        vec![
            Some("true".to_string()),
            Some("3".to_string()),
            Some("pending".to_string()),
            None,
            None,
        ]
    );
}

#[test]
fn loader_rejects_non_mapping_roots_and_bad_yaml() {
    let err = loader::parse_document("- a\n- b\n", Path::new("m.yml")).expect_err("sequence root");
    assert_eq!(err.to_string(), "Metadata root in m.yml must be a mapping");

    let err = loader::parse_document("methods: [\n", Path::new("m.yml")).expect_err("bad yaml");
    assert!(err.to_string().starts_with("YAML parse error in m.yml"));

    let missing = Path::new("/definitely/not/here/metadata.yml");
    let err = loader::load_document(missing).expect_err("missing file");
    assert!(matches!(err, loader::LoadError::NotFound(_)));
}

#[test]
fn single_flag_method_passes() {
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(AUTHENTICATED));
    assert_eq!(report.stdout, "OK\n");
    assert_eq!(report.stderr, "");
    assert_eq!(report.exit_code, report::EXIT_OK);
}

#[test]
fn leaf_without_behavior_id_fails_once() {
    let doc = analyzed_doc(&AUTHENTICATED.replace(", behavior_id: returns_unauthorized", ""));
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    assert_eq!(report.stdout, "");
    assert!(report.stderr.starts_with("Metadata validation failed:\n"));
    assert_eq!(
        error_lines(&report),
        vec![
            "Missing values[].behavior_id on leaf value: method `process` characteristics[0] (authenticated) values[1] (false)"
        ]
    );
}

#[test]
fn duplicate_behavior_ids_fail() {
    let doc = analyzed_doc(AUTHENTICATED).replacen(
        "behaviors:\n",
        "behaviors:\n  - id: returns_completed\n    description: shadow\n    type: success\n",
        1,
    );
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    assert!(
        report.stderr.contains("duplicate: returns_completed"),
        "stderr={}",
        report.stderr
    );
}

#[test]
fn five_flags_warn_and_ask_for_a_scope_decision() {
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&flags(5)));
    assert_eq!(report.exit_code, report::EXIT_WARNINGS);
    assert_eq!(report.stdout, "OK\n");
    assert!(report.stderr.starts_with("Metadata validation warnings:\n"));
    assert!(
        report
            .stderr
            .contains("Combinatorial explosion risk in method `process`: characteristics=5, leaf_contexts=10, estimated_examples=10"),
        "stderr={}",
        report.stderr
    );
    assert!(report.stderr.contains("AskUserQuestion"));
}

#[test]
fn one_below_every_threshold_stays_quiet() {
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&flags(4)));
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&enumerated(24)));
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let seven_by_seven = format!("{}{}", enumerated(7), side_effects(6));
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&seven_by_seven));
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);
}

#[test]
fn leaf_and_example_thresholds_trip_at_boundary() {
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&enumerated(25)));
    assert_eq!(report.exit_code, report::EXIT_WARNINGS);
    assert!(report.stderr.contains("leaf_contexts=25"));

    let ten_by_five = format!("{}{}", enumerated(10), side_effects(4));
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&ten_by_five));
    assert_eq!(report.exit_code, report::EXIT_WARNINGS);
    assert!(report.stderr.contains("estimated_examples=50"));
}

#[test]
fn wide_nesting_warns_instead_of_failing() {
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&fan_out(5, 11)));
    assert_eq!(report.exit_code, report::EXIT_WARNINGS, "stderr={}", report.stderr);
    assert_eq!(report.stdout, "OK\n");
    assert!(
        report
            .stderr
            .contains("characteristics=5, leaf_contexts=161051, estimated_examples=161051"),
        "stderr={}",
        report.stderr
    );

    let unbound = fan_out(5, 11).replacen(
        "{ value: v3, description: v3, terminal: true, behavior_id: returns_completed }",
        "{ value: v3, description: v3, terminal: true }",
        1,
    );
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&unbound));
    assert_eq!(
        error_lines(&report),
        vec![
            "Missing values[].behavior_id on leaf value: method `process` characteristics[4] (c4) values[3] (v3)"
        ]
    );
}

#[test]
fn custom_thresholds_are_honored() {
    let doc = loader::parse_document(&analyzed_doc(AUTHENTICATED), Path::new("m.yml"))
        .expect("parse fixture");
    let ctx = StageContext {
        stage: Stage::CodeAnalyzer,
        thresholds: ComplexityThresholds {
            max_characteristics: 1,
            ..ComplexityThresholds::default()
        },
        project_root: Path::new("."),
        trace: false,
    };
    let report = report::render(&validate_stage(&doc, &ctx));
    assert_eq!(report.exit_code, report::EXIT_WARNINGS);
    assert!(report.stderr.contains("characteristics>=1"));
}

#[test]
fn errors_withhold_warnings() {
    let doc = analyzed_doc(&flags(5).replacen(", behavior_id: returns_completed", "", 1));
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    assert!(!report.stderr.contains("Combinatorial"));
}

#[test]
fn unselected_method_is_reported_as_extra() {
    let doc = format!(
        "{BEHAVIORS}{SELECT_PROCESS}methods:\n{}{}",
        method_block("process", AUTHENTICATED),
        method_block("refund", AUTHENTICATED)
    );
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    assert_eq!(
        error_lines(&report),
        vec!["methods[] contains methods not selected in methods_to_analyze: refund"]
    );
}

#[test]
fn selection_mismatch_names_both_sides() {
    let selection = "methods_to_analyze:
  - { name: alpha, method_mode: new, line_range: [1, 5], selected: true }
  - { name: beta, method_mode: new, line_range: [6, 9], selected: true }
  - { name: gamma, method_mode: new, line_range: [10, 12], selected: false }
";
    let doc = format!(
        "{BEHAVIORS}{selection}methods:\n{}{}",
        method_block("alpha", AUTHENTICATED),
        method_block("gamma", AUTHENTICATED)
    );
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    let lines = error_lines(&report);
    assert!(lines.contains(&"Selected methods missing from methods[]: beta"));
    assert!(lines.contains(&"methods[] contains methods not selected in methods_to_analyze: gamma"));
}

#[test]
fn method_mode_must_agree_with_selection() {
    let doc = analyzed_doc(AUTHENTICATED).replacen("method_mode: new", "method_mode: modified", 1);
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    assert!(report.stderr.contains("method_mode mismatch for `process`"));
}

#[test]
fn unknown_and_mistyped_behavior_references_fail() {
    let doc = analyzed_doc(&format!(
        "{}{}",
        AUTHENTICATED.replace("behavior_id: returns_completed", "behavior_id: returns_ghost"),
        "    side_effects:\n      - { type: email, description: wrong bank entry, behavior_id: returns_unauthorized }\n"
    ));
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    let lines = error_lines(&report);
    assert!(lines.contains(
        &"Unknown behavior_id `returns_ghost` at methods[0].characteristics[0].values[0] (method `process`)"
    ));
    assert!(
        lines
            .iter()
            .any(|line| line.contains("side effects must reference side_effect behaviors")),
        "lines={lines:?}"
    );
}

#[test]
fn nested_tree_passes_and_childless_values_are_leaves() {
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&nested_characteristics()));
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let unbound = nested_characteristics().replace(
        "terminal: false, behavior_id: returns_completed",
        "terminal: false",
    );
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&unbound));
    assert_eq!(
        error_lines(&report),
        vec![
            "Missing values[].behavior_id on leaf value: method `process` characteristics[1] (order_status) values[0] (pending)"
        ]
    );
}

#[test]
fn characteristic_order_does_not_change_the_outcome() {
    let reversed = format!(
        "{NESTED_STATUS}{}",
        AUTHENTICATED.replace(
            "terminal: true, behavior_id: returns_completed",
            "terminal: false"
        )
    );
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&reversed));
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let unbound = reversed.replace(", behavior_id: returns_unauthorized }\n      - name", " }\n      - name");
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&unbound));
    let lines = error_lines(&report);
    assert_eq!(lines.len(), 1, "lines={lines:?}");
    assert!(lines[0].contains("(order_status) values[1] (shipped)"));
}

#[test]
fn broken_wiring_is_structural() {
    let wrong_state = nested_characteristics().replace("when_parent: [true]", "when_parent: [maybe]");
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&wrong_state));
    assert!(
        report
            .stderr
            .contains("when_parent value `maybe` is not a value of `authenticated`"),
        "stderr={}",
        report.stderr
    );
    assert!(!report.stderr.contains("unreachable"));

    let wrong_level = nested_characteristics().replace("level: 2", "level: 3");
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&wrong_level));
    assert!(report.stderr.contains("expected level 2"), "stderr={}", report.stderr);

    let orphan = nested_characteristics().replace("depends_on: authenticated", "depends_on: plan");
    let report = validate(Stage::CodeAnalyzer, &analyzed_doc(&orphan));
    assert!(
        report
            .stderr
            .contains("depends_on `plan`, which is not a characteristic of method `process`"),
        "stderr={}",
        report.stderr
    );
}

#[test]
fn branching_under_a_terminal_value_is_rejected() {
    let doc = analyzed_doc(&format!("{AUTHENTICATED}{NESTED_STATUS}"));
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    assert!(
        report
            .stderr
            .contains("when_parent value `true` is terminal in `authenticated`"),
        "stderr={}",
        report.stderr
    );
}

#[test]
fn validation_is_idempotent() {
    let doc = analyzed_doc(&nested_characteristics().replace("level: 2", "level: 4"));
    let first = validate(Stage::CodeAnalyzer, &doc);
    let second = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(first, second);
    assert_eq!(first.exit_code, report::EXIT_FAILED);
}

#[test]
fn automation_requires_earlier_stages() {
    let doc = format!(
        "automation:\n  discovery_agent_completed: false\n{}",
        analyzed_doc(AUTHENTICATED)
    );
    let report = validate(Stage::CodeAnalyzer, &doc);
    assert_eq!(
        error_lines(&report),
        vec!["automation.discovery_agent_completed must be true before code-analyzer output is accepted"]
    );

    let doc = format!(
        "automation:\n  discovery_agent_completed: true\n  code_analyzer_completed: true\n{}",
        analyzed_doc(AUTHENTICATED)
    );
    assert_eq!(validate(Stage::CodeAnalyzer, &doc).exit_code, report::EXIT_OK);
}

#[test]
fn discovery_stage_checks_selection_records() {
    let header = "source_file: app/models/order.rb\nspec_file: spec/models/order_spec.rb\nclass_name: Order\n";
    let report = validate(Stage::DiscoveryAgent, &format!("{header}{SELECT_PROCESS}"));
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let inverted = SELECT_PROCESS.replace("[10, 40]", "[40, 10]");
    let report = validate(Stage::DiscoveryAgent, &format!("{header}{inverted}"));
    assert_eq!(
        error_lines(&report),
        vec!["methods_to_analyze[0].line_range must satisfy start <= end (got [40, 10])"]
    );

    let report = validate(
        Stage::DiscoveryAgent,
        "source_file: app/models/order.rb\nmethods_to_analyze: []\n",
    );
    let lines = error_lines(&report);
    assert!(lines.contains(&"Missing spec_file"));
    assert!(lines.contains(&"methods_to_analyze must not be empty"));
}

#[test]
fn isolation_stage_requires_test_config_and_skips_estimates() {
    let report = validate(Stage::IsolationDecider, &analyzed_doc(&flags(5)));
    assert_eq!(
        error_lines(&report),
        vec!["Missing methods[0].test_config"]
    );

    let configured = analyzed_doc(&format!("{}{TEST_CONFIG}", flags(5)));
    let report = validate(Stage::IsolationDecider, &configured);
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let bad = configured.replace("queue: none", "queue: mocked");
    let report = validate(Stage::IsolationDecider, &bad);
    assert!(
        report
            .stderr
            .contains("methods[0].test_config.isolation.queue must be one of: real, stubbed, none (got `mocked`)"),
        "stderr={}",
        report.stderr
    );
}

#[test]
fn architect_stage_requires_the_spec_file_on_disk() {
    let root = temp_dir("architect");
    let doc = format!(
        "spec_file: spec/models/order_spec.rb\n{}",
        analyzed_doc(&format!("{AUTHENTICATED}{TEST_CONFIG}"))
    );

    let report = validate_in(Stage::TestArchitect, &doc, &root);
    assert_eq!(report.exit_code, report::EXIT_FAILED);
    assert!(report.stderr.contains("Spec file not found"), "stderr={}", report.stderr);

    let spec = root.join("spec").join("models");
    std::fs::create_dir_all(&spec).expect("create spec dir");
    std::fs::write(spec.join("order_spec.rb"), "# {{SUBJECT}} skeleton\n").expect("write spec");
    let report = validate_in(Stage::TestArchitect, &doc, &root);
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn implementer_stage_rejects_unresolved_placeholders() {
    let root = temp_dir("implementer");
    let spec_path = root.join("order_spec.rb");
    let doc = format!(
        "spec_file: order_spec.rb\n{}",
        analyzed_doc(&format!("{AUTHENTICATED}{TEST_CONFIG}"))
    );

    std::fs::write(
        &spec_path,
        "RSpec.describe Order do\n  subject { {{SUBJECT}} }\n  let(:attrs) { {{a: 1}} }\nend\n",
    )
    .expect("write spec");
    let report = validate_in(Stage::TestImplementer, &doc, &root);
    let expected = format!("Unresolved placeholder in {} line 2", spec_path.display());
    assert_eq!(error_lines(&report), vec![expected.as_str()]);

    std::fs::write(&spec_path, "RSpec.describe Order do\nend\n").expect("write spec");
    let report = validate_in(Stage::TestImplementer, &doc, &root);
    assert_eq!(report.exit_code, report::EXIT_OK, "stderr={}", report.stderr);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn placeholder_scan_knows_markers_and_caps_its_report() {
    let text = "ok\n<PLACEHOLDER>\n{{ user.name }}\n__PLACEHOLDER__\n{ {x} }\nTODO_PLACEHOLDER\n";
    assert_eq!(spec_file::placeholder_lines(text), vec![2, 3, 4, 6]);

    let root = temp_dir("placeholder_cap");
    let body = (0..25).map(|i| format!("it {{{{CASE_{i}}}}}\n")).collect::<String>();
    std::fs::write(root.join("spec.rb"), body).expect("write spec");
    let doc: Value = serde_yaml::from_str("spec_file: spec.rb").expect("yaml");
    let mut diags = Diagnostics::default();
    spec_file::check_spec_file(&doc, &root, true, &mut diags);
    assert_eq!(diags.error_count(), 21);
    assert!(
        diags.errors()[20]
            .message
            .starts_with("5 more lines with unresolved placeholders")
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn kind_summary_counts_every_finding() {
    let doc = loader::parse_document(
        &analyzed_doc(&flags(5)).replacen("type: success", "type: happy", 1),
        Path::new("m.yml"),
    )
    .expect("parse fixture");
    let ctx = StageContext {
        stage: Stage::CodeAnalyzer,
        thresholds: ComplexityThresholds::default(),
        project_root: Path::new("."),
        trace: false,
    };
    let diags = validate_stage(&doc, &ctx);
    assert_eq!(
        report::kind_summary(&diags),
        "schema=1 structural=0 reference=0 complexity=2"
    );
}
