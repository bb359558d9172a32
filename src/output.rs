//! Report rendering for table, JSON, and CSV modes
//!
//! The scan engine hands over an immutable `ScanReport`; everything here is
//! presentation. JSON is machine-readable and includes the recovered errors;
//! the table is for humans; CSV is one row per matched specifier.

use crate::report::ScanReport;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!(
                "Unknown output format '{}'. Supported: table, json, csv",
                s
            )),
        }
    }
}

/// Render a report in the requested format. The result always ends with a
/// newline (or is empty).
pub fn render(report: &ScanReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(report),
        OutputFormat::Json => render_json(report),
        OutputFormat::Csv => render_csv(report),
    }
}

// === JSON ===

#[derive(Serialize)]
struct JsonReport<'a> {
    package: &'a str,
    total_checked: usize,
    matched_projects: usize,
    matches: Vec<JsonMatch<'a>>,
    version_distribution: &'a std::collections::BTreeMap<String, usize>,
    errors: Vec<JsonError<'a>>,
}

#[derive(Serialize)]
struct JsonMatch<'a> {
    project: &'a str,
    project_url: &'a str,
    file: &'a str,
    file_url: String,
    specifiers: Vec<JsonSpecifier<'a>>,
}

#[derive(Serialize)]
struct JsonSpecifier<'a> {
    name: &'a str,
    constraint: &'a str,
    line: usize,
}

#[derive(Serialize)]
struct JsonError<'a> {
    project: &'a str,
    reason: String,
}

fn render_json(report: &ScanReport) -> String {
    let json = JsonReport {
        package: &report.package,
        total_checked: report.total_checked,
        matched_projects: report.matched_count(),
        matches: report
            .matches
            .iter()
            .map(|m| JsonMatch {
                project: &m.project.path_with_namespace,
                project_url: &m.project.web_url,
                file: &m.file,
                file_url: m.file_url(),
                specifiers: m
                    .specifiers
                    .iter()
                    .map(|s| JsonSpecifier {
                        name: &s.name,
                        constraint: &s.constraint,
                        line: s.line,
                    })
                    .collect(),
            })
            .collect(),
        version_distribution: &report.version_distribution,
        errors: report
            .errors
            .iter()
            .map(|e| JsonError {
                project: &e.project,
                reason: e.reason.to_string(),
            })
            .collect(),
    };

    // Serialization of these plain structs cannot fail.
    let mut out = serde_json::to_string_pretty(&json).unwrap_or_default();
    out.push('\n');
    out
}

// === Table ===

type Row = (String, String, String, String);

fn specifier_rows(report: &ScanReport) -> Vec<Row> {
    let mut rows = Vec::new();
    for m in &report.matches {
        for (i, spec) in m.specifiers.iter().enumerate() {
            let project = if i == 0 {
                m.project.path_with_namespace.clone()
            } else {
                String::new()
            };
            rows.push((
                project,
                m.file.clone(),
                format!("{}{}", report.package, spec.constraint),
                spec.line.to_string(),
            ));
        }
    }
    rows
}

fn render_table(report: &ScanReport) -> String {
    let mut out = String::new();

    if report.matches.is_empty() {
        out.push_str(&format!(
            "No projects depending on '{}' found ({} checked)\n",
            report.package, report.total_checked
        ));
        return out;
    }

    out.push_str(&format!(
        "Found '{}' in {} of {} projects\n\n",
        report.package,
        report.matched_count(),
        report.total_checked
    ));

    let header: Row = (
        "PROJECT".to_string(),
        "FILE".to_string(),
        "PACKAGE".to_string(),
        "LINE".to_string(),
    );
    let rows = specifier_rows(report);

    let width = |pick: fn(&Row) -> &String| {
        rows.iter()
            .map(pick)
            .chain(std::iter::once(pick(&header)))
            .map(|s| s.len())
            .max()
            .unwrap_or(0)
    };
    let w_project = width(|r| &r.0);
    let w_file = width(|r| &r.1);
    let w_package = width(|r| &r.2);

    for row in std::iter::once(&header).chain(rows.iter()) {
        out.push_str(&format!(
            "{:<w_project$}  {:<w_file$}  {:<w_package$}  {}\n",
            row.0, row.1, row.2, row.3
        ));
    }

    out.push_str("\nVersion distribution:\n");
    let mut entries: Vec<(&String, &usize)> = report.version_distribution.iter().collect();
    // Most common first, ties by specifier string
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (specifier, count) in entries {
        out.push_str(&format!("  {}: {} project(s)\n", specifier, count));
    }

    out
}

// === CSV ===

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_row(fields: &[&str]) -> String {
    let escaped: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
    format!("{}\n", escaped.join(","))
}

fn render_csv(report: &ScanReport) -> String {
    let mut out = csv_row(&["Project", "File", "Package", "Line", "URL"]);
    for m in &report.matches {
        let file_url = m.file_url();
        for spec in &m.specifiers {
            out.push_str(&csv_row(&[
                &m.project.path_with_namespace,
                &m.file,
                &format!("{}{}", report.package, spec.constraint),
                &spec.line.to_string(),
                &file_url,
            ]));
        }
    }
    out
}
