#![forbid(unsafe_code)]

use crate::schema::{Diagnostics, FindingKind, require_string};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

const PLACEHOLDER_MARKERS: &[&str] = &["<PLACEHOLDER>", "__PLACEHOLDER__", "TODO_PLACEHOLDER"];
const MAX_REPORTED_PLACEHOLDER_LINES: usize = 20;

pub(crate) fn resolve_spec_path(project_root: &Path, spec_file: &str) -> PathBuf {
    let path = Path::new(spec_file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// The spec file named by `spec_file` must exist; with `forbid_placeholders` it must also be
/// free of unresolved template tokens.
pub(crate) fn check_spec_file(
    doc: &Value,
    project_root: &Path,
    forbid_placeholders: bool,
    diags: &mut Diagnostics,
) {
    let Some(spec_file) = require_string(doc.get("spec_file"), "spec_file", diags) else {
        return;
    };
    let path = resolve_spec_path(project_root, spec_file);
    if !path.is_file() {
        diags.error(
            FindingKind::Reference,
            format!("Spec file not found: {} (spec_file: {spec_file})", path.display()),
        );
        return;
    }
    if !forbid_placeholders {
        return;
    }
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            diags.error(
                FindingKind::Reference,
                format!("Cannot read spec file {}: {err}", path.display()),
            );
            return;
        }
    };

    let lines = placeholder_lines(&text);
    for line in lines.iter().take(MAX_REPORTED_PLACEHOLDER_LINES) {
        diags.error(
            FindingKind::Reference,
            format!(
                "Unresolved placeholder in {} line {line}",
                path.display()
            ),
        );
    }
    if lines.len() > MAX_REPORTED_PLACEHOLDER_LINES {
        diags.error(
            FindingKind::Reference,
            format!(
                "{} more lines with unresolved placeholders in {}",
                lines.len() - MAX_REPORTED_PLACEHOLDER_LINES,
                path.display()
            ),
        );
    }
}

/// 1-based numbers of lines that still carry template tokens.
pub(crate) fn placeholder_lines(text: &str) -> Vec<usize> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            PLACEHOLDER_MARKERS.iter().any(|marker| line.contains(marker))
                || has_template_token(line)
        })
        .map(|(idx, _)| idx + 1)
        .collect()
}

/// `{{NAME}}` / `{{ subject.name }}`; Ruby hash literals such as `{{a: 1}}` do not match.
fn has_template_token(line: &str) -> bool {
    let mut rest = line;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        if let Some(end) = after.find("}}") {
            let inner = after[..end].trim();
            if !inner.is_empty()
                && inner
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
            {
                return true;
            }
        }
        rest = after;
    }
    false
}
