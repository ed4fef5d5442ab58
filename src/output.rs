//! Output formatting for declmap.
//!
//! Renders extraction reports as a plain-text listing or as JSON.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::extract::{ClassRecord, FunctionRecord, SourceReport};

/// Errors that can occur during output formatting.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("formatting failed: {0}")]
    Fmt(#[from] std::fmt::Error),
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Options controlling what to include in output.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub include_functions: bool,
    pub include_classes: bool,
    /// Include the raw source text of each declaration.
    pub include_text: bool,
    pub include_summary: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            include_functions: true,
            include_classes: true,
            include_text: true,
            include_summary: true,
        }
    }
}

impl OutputOptions {
    pub fn functions_only() -> Self {
        Self {
            include_classes: false,
            include_summary: false,
            ..Default::default()
        }
    }

    pub fn classes_only() -> Self {
        Self {
            include_functions: false,
            include_summary: false,
            ..Default::default()
        }
    }
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Totals across all reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub lines: usize,
    pub classes: usize,
    pub functions: usize,
    pub methods: usize,
    pub failures: usize,
}

impl Summary {
    pub fn of(reports: &[SourceReport], failures: &[FileFailure]) -> Self {
        Self {
            files: reports.len(),
            lines: reports.iter().map(|r| r.lines).sum(),
            classes: reports.iter().map(SourceReport::class_count).sum(),
            functions: reports.iter().map(|r| r.functions.len()).sum(),
            methods: reports.iter().map(SourceReport::method_count).sum(),
            failures: failures.len(),
        }
    }
}

/// Format reports with the requested sections.
pub fn format_output(
    reports: &[SourceReport],
    failures: &[FileFailure],
    options: &OutputOptions,
) -> Result<String, OutputError> {
    match options.format {
        OutputFormat::Text => format_text(reports, failures, options),
        OutputFormat::Json => format_json(reports, failures, options),
    }
}

// ============================================================================
// Text Formatting
// ============================================================================

fn format_text(
    reports: &[SourceReport],
    failures: &[FileFailure],
    options: &OutputOptions,
) -> Result<String, OutputError> {
    let mut out = String::new();

    for report in reports {
        if let Some(path) = &report.path {
            writeln!(out, "== {} ==\n", path.display())?;
        }
        if options.include_classes {
            for class in &report.classes {
                write_class(&mut out, class, options.include_text)?;
            }
        }
        if options.include_functions {
            for function in &report.functions {
                write_function(&mut out, function, options.include_text)?;
            }
        }
    }

    for failure in failures {
        writeln!(out, "Failed: {}: {}", failure.path.display(), failure.error)?;
    }

    if options.include_summary {
        let s = Summary::of(reports, failures);
        writeln!(
            out,
            "Files: {}, lines: {}, classes: {}, functions: {} ({} methods)",
            s.files, s.lines, s.classes, s.functions, s.methods
        )?;
        if s.failures > 0 {
            writeln!(out, "Failed files: {}", s.failures)?;
        }
    }

    Ok(out)
}

fn write_class(out: &mut String, class: &ClassRecord, include_text: bool) -> std::fmt::Result {
    writeln!(out, "Class: {}", class.name.as_deref().unwrap_or("<anonymous>"))?;
    if let Some(parent) = &class.parent_class {
        writeln!(out, "Parent class: {parent}")?;
    }
    if let Some(bases) = &class.base_classes {
        writeln!(out, "Base classes: {bases}")?;
    }
    writeln!(out, "Class attributes: {}", class.attributes.join(", "))?;
    let instance: Vec<&str> = class.instance_attributes.iter().map(String::as_str).collect();
    writeln!(out, "Instance attributes: {}", instance.join(", "))?;
    writeln!(out, "Methods: {}", class.methods.join(", "))?;
    if !class.inner_classes.is_empty() {
        let inner: Vec<&str> = class
            .inner_classes
            .iter()
            .map(|c| c.name.as_deref().unwrap_or("<anonymous>"))
            .collect();
        writeln!(out, "Inner classes: {}", inner.join(", "))?;
    }
    writeln!(out, "Lines: {}-{}", class.start_line, class.end_line)?;
    if include_text {
        writeln!(out, "Code:\n{}", class.text)?;
    }
    writeln!(out)?;

    for inner in &class.inner_classes {
        write_class(out, inner, include_text)?;
    }
    Ok(())
}

fn write_function(out: &mut String, function: &FunctionRecord, include_text: bool) -> std::fmt::Result {
    writeln!(out, "Type: {}", function.kind)?;
    if let Some(class) = &function.enclosing_class {
        writeln!(out, "Class: {class}")?;
    }
    writeln!(out, "Function: {}", function.name)?;
    writeln!(out, "Parameters: {}", function.parameters)?;
    if !function.decorators.is_empty() {
        writeln!(out, "Decorators: {}", function.decorators.join(", "))?;
    }
    if let Some(doc) = &function.docstring {
        writeln!(out, "Docstring: {doc}")?;
    }
    writeln!(out, "Lines: {}-{}", function.start_line, function.end_line)?;
    if include_text {
        writeln!(out, "Code:\n{}", function.text)?;
    }
    writeln!(out)
}

// ============================================================================
// JSON Formatting
// ============================================================================

#[derive(Serialize)]
struct JsonFile<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a PathBuf>,
    lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionRecord]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    classes: Option<&'a [ClassRecord]>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    files: Vec<JsonFile<'a>>,
    #[serde(skip_serializing_if = "no_failures")]
    failures: &'a [FileFailure],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

fn no_failures(failures: &&[FileFailure]) -> bool {
    failures.is_empty()
}

fn format_json(
    reports: &[SourceReport],
    failures: &[FileFailure],
    options: &OutputOptions,
) -> Result<String, OutputError> {
    let files = reports
        .iter()
        .map(|r| JsonFile {
            path: r.path.as_ref(),
            lines: r.lines,
            functions: options.include_functions.then_some(r.functions.as_slice()),
            classes: options.include_classes.then_some(r.classes.as_slice()),
        })
        .collect();

    let output = JsonOutput {
        files,
        failures,
        summary: options
            .include_summary
            .then(|| Summary::of(reports, failures)),
    };

    let mut value = serde_json::to_value(&output)?;
    if !options.include_text {
        strip_text(&mut value);
    }

    let mut json = serde_json::to_string_pretty(&value)?;
    json.push('\n');
    Ok(json)
}

/// Drop every `text` member, recursing through nested classes.
fn strip_text(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("text");
            map.values_mut().for_each(strip_text);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_text),
        _ => {}
    }
}
