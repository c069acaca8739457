#![forbid(unsafe_code)]

use crate::stage::Stage;
use mv_core::complexity::ComplexityThresholds;
use std::path::{Path, PathBuf};

pub(crate) const ENV_MAX_CHARACTERISTICS: &str = "MV_MAX_CHARACTERISTICS";
pub(crate) const ENV_MAX_LEAF_CONTEXTS: &str = "MV_MAX_LEAF_CONTEXTS";
pub(crate) const ENV_MAX_EXAMPLES: &str = "MV_MAX_EXAMPLES";
pub(crate) const ENV_PROJECT_ROOT: &str = "MV_PROJECT_ROOT";
pub(crate) const ENV_DEBUG: &str = "MV_DEBUG";

#[derive(Clone, Debug)]
pub(crate) struct ValidatorConfig {
    pub(crate) stage: Stage,
    pub(crate) metadata: PathBuf,
    pub(crate) thresholds: ComplexityThresholds,
    pub(crate) project_root: PathBuf,
    pub(crate) debug: bool,
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Relative `spec_file` paths are written from the repository root, not from wherever the
/// orchestrator happened to start the validator.
pub(crate) fn default_project_root_from_start(start: &Path) -> PathBuf {
    find_repo_root(start).unwrap_or_else(|| start.to_path_buf())
}

pub(crate) fn default_project_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    default_project_root_from_start(&cwd)
}

/// Environment layer of the thresholds. Unparseable or zero values fall back to defaults.
pub(crate) fn thresholds_from_env(env: &dyn Fn(&str) -> Option<String>) -> ComplexityThresholds {
    let read = |name: &str, fallback: usize| {
        env(name)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(fallback)
    };
    let defaults = ComplexityThresholds::default();
    ComplexityThresholds {
        max_characteristics: read(ENV_MAX_CHARACTERISTICS, defaults.max_characteristics),
        max_leaf_contexts: read(ENV_MAX_LEAF_CONTEXTS, defaults.max_leaf_contexts),
        max_examples: read(ENV_MAX_EXAMPLES, defaults.max_examples),
    }
}

pub(crate) fn env_flag(raw: Option<String>) -> bool {
    raw.map(|v| v.to_ascii_lowercase())
        .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}
