#![forbid(unsafe_code)]

mod behaviors;
mod config;
mod discovery;
mod dispatch;
mod isolation;
mod loader;
mod methods;
mod references;
mod report;
mod schema;
mod spec_file;
mod stage;
mod structure;

use config::ValidatorConfig;
use dispatch::{StageContext, validate_stage};
use report::{EXIT_FAILED, Report};
use stage::{Stage, stage_names};
use std::io::Write as _;
use std::path::PathBuf;

#[cfg(test)]
mod tests;

fn usage() -> String {
    format!(
        "validate_metadata_stage: gate a metadata YAML document between pipeline stages

USAGE:
  validate_metadata_stage --stage=STAGE --metadata=PATH
      [--max-characteristics N] [--max-leaf-contexts N] [--max-examples N]
      [--project-root DIR] [--debug]
  validate_metadata_stage --help | --version

STAGES:
  {}

EXIT CODES:
  0  all checks passed (stdout: OK)
  1  usage error or hard validation failure (stderr: error list)
  2  passed with warnings; ask before continuing (stdout: OK, stderr: warning list)

ENV:
  MV_MAX_CHARACTERISTICS, MV_MAX_LEAF_CONTEXTS, MV_MAX_EXAMPLES, MV_PROJECT_ROOT, MV_DEBUG
",
        stage_names()
    )
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug)]
enum Command {
    Help,
    Version,
    Validate(ValidatorConfig),
}

fn parse_threshold(flag: &str, raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| format!("{flag} must be a positive integer (got `{raw}`)"))
}

/// Accepts both `--flag=value` and `--flag value`. The stage is validated here so an unknown
/// stage fails before the metadata file is touched.
fn parse_args(args: &[String], env: &dyn Fn(&str) -> Option<String>) -> Result<Command, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(Command::Help);
    }
    if args.iter().any(|a| a == "-V" || a == "--version") {
        return Ok(Command::Version);
    }

    let mut stage: Option<String> = None;
    let mut metadata: Option<PathBuf> = None;
    let mut thresholds = config::thresholds_from_env(env);
    let mut project_root: Option<PathBuf> = env(config::ENV_PROJECT_ROOT).map(PathBuf::from);
    let mut debug = config::env_flag(env(config::ENV_DEBUG));

    let mut i = 0usize;
    while i < args.len() {
        let raw = args[i].as_str();
        let (flag, inline) = match raw.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (raw, None),
        };
        let mut value = |hint: &str| -> Result<String, String> {
            if let Some(v) = inline.clone() {
                return Ok(v);
            }
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("{flag} requires {hint}"))
        };
        match flag {
            "--stage" => stage = Some(value("STAGE")?),
            "--metadata" => metadata = Some(PathBuf::from(value("PATH")?)),
            "--max-characteristics" => {
                thresholds.max_characteristics = parse_threshold(flag, &value("N")?)?;
            }
            "--max-leaf-contexts" => {
                thresholds.max_leaf_contexts = parse_threshold(flag, &value("N")?)?;
            }
            "--max-examples" => {
                thresholds.max_examples = parse_threshold(flag, &value("N")?)?;
            }
            "--project-root" => project_root = Some(PathBuf::from(value("DIR")?)),
            "--debug" => debug = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let stage_raw = stage.ok_or_else(|| format!("--stage is required (one of: {})", stage_names()))?;
    let stage = Stage::parse(&stage_raw).ok_or_else(|| {
        format!(
            "unknown --stage value `{stage_raw}` (expected one of: {})",
            stage_names()
        )
    })?;
    let metadata = metadata
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or("--metadata is required")?;

    Ok(Command::Validate(ValidatorConfig {
        stage,
        metadata,
        thresholds,
        project_root: project_root.unwrap_or_else(config::default_project_root),
        debug,
    }))
}

fn run(cfg: &ValidatorConfig) -> Report {
    let trace = |message: &str| {
        if cfg.debug {
            eprintln!("validate_metadata_stage: {message}");
        }
    };
    trace(&format!(
        "stage={} metadata={} project_root={}",
        cfg.stage.as_str(),
        cfg.metadata.display(),
        cfg.project_root.display()
    ));

    let doc = match loader::load_document(&cfg.metadata) {
        Ok(doc) => doc,
        Err(err) => {
            trace(&format!("load failed: {err}"));
            return report::failure(&[err.to_string().as_str()]);
        }
    };

    let ctx = StageContext {
        stage: cfg.stage,
        thresholds: cfg.thresholds,
        project_root: &cfg.project_root,
        trace: cfg.debug,
    };
    let diags = validate_stage(&doc, &ctx);
    let report = report::render(&diags);
    trace(&format!(
        "{} exit={}",
        report::kind_summary(&diags),
        report.exit_code
    ));
    report
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = match parse_args(&args, &env_var) {
        Ok(Command::Help) => {
            print!("{}", usage());
            return;
        }
        Ok(Command::Version) => {
            println!("validate_metadata_stage {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Ok(Command::Validate(cfg)) => cfg,
        Err(e) => {
            eprintln!("{e}\n");
            eprint!("{}", usage());
            std::process::exit(EXIT_FAILED);
        }
    };

    let report = run(&cfg);
    print!("{}", report.stdout);
    eprint!("{}", report.stderr);
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    std::process::exit(report.exit_code);
}
