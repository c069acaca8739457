#![forbid(unsafe_code)]

use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Failures that stop a run before any check executes.
#[derive(Debug)]
pub(crate) enum LoadError {
    NotFound(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    NotMapping(PathBuf),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Metadata file not found: {}", path.display()),
            Self::Io { path, source } => {
                write!(f, "Cannot read metadata file {}: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "YAML parse error in {}: {message}", path.display())
            }
            Self::NotMapping(path) => {
                write!(f, "Metadata root in {} must be a mapping", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub(crate) fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&raw, path)
}

pub(crate) fn parse_document(raw: &str, path: &Path) -> Result<Value, LoadError> {
    let value: Value = serde_yaml::from_str(raw).map_err(|err| LoadError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if !value.is_mapping() {
        return Err(LoadError::NotMapping(path.to_path_buf()));
    }
    Ok(value)
}
