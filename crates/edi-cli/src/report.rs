//! Validation report rendering

use edi_parser::ParseResult;
use edi_validation::{Summary, ValidationError};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Output format of `edi validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Per-file entry of a JSON report
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub file: String,
    pub success: bool,
    pub summary: Summary,
    pub errors: &'a [ValidationError],
}

impl<'a> FileReport<'a> {
    pub fn new(path: &Path, result: &'a ParseResult) -> Self {
        Self {
            file: path.display().to_string(),
            success: result.success,
            summary: result.summary,
            errors: &result.errors,
        }
    }
}

/// Itemised plain-text report for one file
pub fn render_text(path: &Path, result: &ParseResult) -> String {
    let mut out = String::new();
    let status = if result.success { "valid" } else { "INVALID" };
    let _ = writeln!(out, "{}: {status} ({})", path.display(), result.summary);

    for error in &result.errors {
        let _ = writeln!(
            out,
            "  [{}] {:<7} {} at {}",
            error.code(),
            error.severity.as_str(),
            error.category(),
            error.position
        );
        let _ = writeln!(out, "      {}", error.message);
        if !error.path.is_empty() {
            let _ = writeln!(out, "      path: {}", error.path);
        }
        let _ = writeln!(out, "      suggestion: {}", error.suggestion());
    }

    out
}
