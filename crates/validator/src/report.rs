#![forbid(unsafe_code)]

use crate::schema::{Diagnostics, FindingKind};

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_FAILED: i32 = 1;
pub(crate) const EXIT_WARNINGS: i32 = 2;

const SUCCESS_MARKER: &str = "OK";
const FAILED_HEADER: &str = "Metadata validation failed:";
const WARNINGS_HEADER: &str = "Metadata validation warnings:";

/// What the process prints and returns; rendering is kept apart from printing for tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Report {
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) exit_code: i32,
}

fn bullet_list(header: &str, messages: &[&str]) -> String {
    let mut out = String::with_capacity(header.len() + 1);
    out.push_str(header);
    out.push('\n');
    for message in messages {
        out.push_str("- ");
        out.push_str(message);
        out.push('\n');
    }
    out
}

/// Errors win over warnings: warnings are withheld until the document passes.
pub(crate) fn render(diags: &Diagnostics) -> Report {
    if diags.has_errors() {
        let messages = diags
            .errors()
            .iter()
            .map(|finding| finding.message.as_str())
            .collect::<Vec<_>>();
        return failure(&messages);
    }
    if diags.warnings().is_empty() {
        return Report {
            stdout: format!("{SUCCESS_MARKER}\n"),
            stderr: String::new(),
            exit_code: EXIT_OK,
        };
    }
    let messages = diags
        .warnings()
        .iter()
        .map(|finding| finding.message.as_str())
        .collect::<Vec<_>>();
    Report {
        stdout: format!("{SUCCESS_MARKER}\n"),
        stderr: bullet_list(WARNINGS_HEADER, &messages),
        exit_code: EXIT_WARNINGS,
    }
}

pub(crate) fn failure(messages: &[&str]) -> Report {
    Report {
        stdout: String::new(),
        stderr: bullet_list(FAILED_HEADER, messages),
        exit_code: EXIT_FAILED,
    }
}

/// `schema=2 structural=1 reference=0 complexity=1`, for the debug trace.
pub(crate) fn kind_summary(diags: &Diagnostics) -> String {
    let count = |kind: FindingKind| {
        diags
            .errors()
            .iter()
            .chain(diags.warnings())
            .filter(|finding| finding.kind == kind)
            .count()
    };
    format!(
        "schema={} structural={} reference={} complexity={}",
        count(FindingKind::Schema),
        count(FindingKind::Structural),
        count(FindingKind::Reference),
        count(FindingKind::Complexity)
    )
}
