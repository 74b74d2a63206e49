//! CLI presentation: text and json formatters for run output and listings.

use crate::capability::{Command, Entry, Registry};
use crate::error::EngineError;
use crate::executor::RunReport;
use crate::sigil::value_to_text;
use comfy_table::Table;
use serde_json::{json, Value};

/// What the run should print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSelection {
    Last,
    All,
}

fn to_json(value: &impl serde::Serialize) -> Result<String, EngineError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::InvalidArgument(format!("Cannot encode output: {}", e)))
}

/// Scalars print bare; mappings and lists print as indented JSON.
pub fn format_value_text(value: &Value) -> Result<String, EngineError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Object(_) | Value::Array(_) => to_json(value),
        other => Ok(value_to_text(other)),
    }
}

pub fn format_run_text(report: &RunReport, selection: OutputSelection) -> Result<String, EngineError> {
    let mut lines: Vec<String> = report.comments.clone();
    match selection {
        OutputSelection::All => {
            for value in &report.results {
                lines.push(format_value_text(value)?);
            }
        }
        OutputSelection::Last => {
            if let Some(value) = &report.last {
                lines.push(format_value_text(value)?);
            }
        }
    }
    Ok(lines.join("\n"))
}

pub fn format_run_json(report: &RunReport, selection: OutputSelection) -> Result<String, EngineError> {
    match selection {
        OutputSelection::All => to_json(&report.results),
        OutputSelection::Last => to_json(report.last.as_ref().unwrap_or(&Value::Null)),
    }
}

pub fn format_expression(value: Option<&Value>, json: bool) -> Result<String, EngineError> {
    let value = value.unwrap_or(&Value::Null);
    if json {
        to_json(value)
    } else {
        format_value_text(value)
    }
}

/// Flattened listing row: dotted path, kind, usage, summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRow {
    pub path: String,
    pub kind: &'static str,
    pub usage: String,
    pub summary: String,
}

fn command_row(prefix: &str, command: &Command) -> CapabilityRow {
    let path = if prefix.is_empty() {
        command.name().to_string()
    } else {
        format!("{}.{}", prefix, command.name())
    };
    CapabilityRow {
        path,
        kind: "command",
        usage: command.schema().usage(),
        summary: command.summary().unwrap_or_default().to_string(),
    }
}

/// Every root-level capability, with namespaces expanded one level.
///
/// Plugin namespaces that fail to load are listed without children.
pub fn capability_rows(registry: &Registry) -> Vec<CapabilityRow> {
    let mut rows = Vec::new();
    for name in registry.names() {
        match registry.lookup(&name) {
            Ok(Entry::Command(command)) => rows.push(command_row("", &command)),
            Ok(Entry::Namespace(namespace)) => {
                rows.push(CapabilityRow {
                    path: name.clone(),
                    kind: "namespace",
                    usage: String::new(),
                    summary: namespace.summary().unwrap_or_default().to_string(),
                });
                for command in namespace.commands() {
                    rows.push(command_row(&name, &command));
                }
            }
            Err(reason) => rows.push(CapabilityRow {
                path: name.clone(),
                kind: "unavailable",
                usage: String::new(),
                summary: reason,
            }),
        }
    }
    rows
}

pub fn format_capabilities_text(rows: &[CapabilityRow]) -> String {
    if rows.is_empty() {
        return "No capabilities registered.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Capability", "Kind", "Usage", "Summary"]);
    for row in rows {
        table.add_row(vec![&row.path, row.kind, &row.usage, &row.summary]);
    }
    table.to_string()
}

pub fn format_capabilities_json(rows: &[CapabilityRow]) -> Result<String, EngineError> {
    let items: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "path": row.path,
                "kind": row.kind,
                "usage": row.usage,
                "summary": row.summary,
            })
        })
        .collect();
    to_json(&items)
}
