//! gcc/clang/tcc 诊断输出解析

use std::sync::OnceLock;

use regex::Regex;

use crate::kernel::services::ports::compiler::{Diagnostic, Severity};

fn diagnostic_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?):(\d+):(\d+):\s*(fatal error|error|warning|note):\s*(.*)$").ok()
    })
    .as_ref()
}

fn severity_of(label: &str) -> Severity {
    match label {
        "warning" => Severity::Warning,
        "note" => Severity::Note,
        _ => Severity::Error,
    }
}

/// Parses compiler stderr. Notes attach to the preceding diagnostic; unstructured
/// lines mentioning `error:`/`warning:` become location-less diagnostics.
pub fn parse_diagnostics(output: &str) -> Vec<Diagnostic> {
    let mut out: Vec<Diagnostic> = Vec::new();
    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = diagnostic_regex().and_then(|re| re.captures(line)) {
            let severity = severity_of(&caps[4]);
            let message = caps[5].trim().to_string();
            if severity == Severity::Note {
                if let Some(prev) = out.last_mut() {
                    prev.notes.push(line.to_string());
                    continue;
                }
            }
            out.push(Diagnostic {
                file: caps[1].to_string(),
                line: caps[2].parse().unwrap_or(0),
                column: caps[3].parse().unwrap_or(0),
                severity,
                message,
                notes: Vec::new(),
            });
            continue;
        }

        let severity = if line.contains("error:") {
            Severity::Error
        } else if line.contains("warning:") {
            Severity::Warning
        } else {
            continue;
        };
        out.push(Diagnostic {
            file: String::new(),
            line: 0,
            column: 0,
            severity,
            message: line.to_string(),
            notes: Vec::new(),
        });
    }
    out
}

pub fn split_by_severity(diagnostics: Vec<Diagnostic>) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
    diagnostics
        .into_iter()
        .partition(|d| d.severity == Severity::Error)
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/compiler/diagnostics.rs"]
mod tests;
