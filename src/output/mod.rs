//! Output formatters for analysis results.
//!
//! JSON always carries the full record. Markdown and text render a
//! condensed [`Summary`] when the record has one, and otherwise walk the
//! serialized value generically.

use std::io::Write;

use serde::Serialize;
use serde_json::{json, Map, Value};
use unicode_width::UnicodeWidthStr;

use crate::analyzers::{CodeSmell, SemanticIssue};
use crate::config::OutputFormat;
use crate::core::Result;
use crate::engine::{FileAnalysis, ProjectAnalysis};
use crate::score::CompositeScore;

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Json,
    Markdown,
    #[default]
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

/// A condensed, human-oriented view of a result record.
pub trait Summary {
    fn summary(&self) -> Value;
}

impl Format {
    pub fn format_value<W: Write>(&self, value: &Value, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => format_json(value, writer),
            Format::Markdown => format_value_as_markdown(value, writer, 0),
            Format::Text => format_value_as_text(value, writer, 0),
        }
    }

    /// Render any serializable record field by field.
    pub fn format<T: Serialize, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.format_value(&value, writer)
    }

    /// Render a result record: full JSON, or its summary for people.
    pub fn render<T: Serialize + Summary, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => self.format(data, writer),
            _ => self.format_value(&data.summary(), writer),
        }
    }
}

fn format_json<W: Write>(value: &Value, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn issue_rows(smells: &[CodeSmell], issues: &[SemanticIssue]) -> Vec<Value> {
    let mut rows: Vec<(usize, usize, Value)> = smells
        .iter()
        .map(|s| {
            (
                s.line,
                s.column,
                json!({
                    "line": s.line,
                    "kind": s.kind,
                    "severity": s.severity,
                    "message": s.message,
                }),
            )
        })
        .chain(issues.iter().map(|i| {
            (
                i.line,
                i.column,
                json!({
                    "line": i.line,
                    "kind": i.kind,
                    "severity": i.severity,
                    "message": i.message,
                }),
            )
        }))
        .collect();
    rows.sort_by_key(|(line, column, _)| (*line, *column));
    rows.into_iter().map(|(_, _, row)| row).collect()
}

fn score_fields(score: &CompositeScore, map: &mut Map<String, Value>) {
    map.insert("score".into(), json!(score.overall));
    map.insert("grade".into(), json!(score.grade.to_string()));
    map.insert("confidence".into(), json!(format!("{}%", score.confidence)));
    map.insert(
        "dimensions".into(),
        Value::Array(
            score
                .breakdown
                .iter()
                .map(|(dimension, value)| {
                    json!({
                        "dimension": dimension.as_str(),
                        "score": value,
                        "status": score.status.get(dimension),
                    })
                })
                .collect(),
        ),
    );
    map.insert(
        "recommendations".into(),
        Value::Array(
            score
                .recommendations
                .iter()
                .map(|r| {
                    json!({
                        "severity": r.severity,
                        "principle": r.principle.as_str(),
                        "impact": r.estimated_impact,
                        "message": r.message,
                    })
                })
                .collect(),
        ),
    );
}

impl Summary for CompositeScore {
    fn summary(&self) -> Value {
        let mut map = Map::new();
        score_fields(self, &mut map);
        Value::Object(map)
    }
}

impl Summary for FileAnalysis {
    fn summary(&self) -> Value {
        let mut map = Map::new();
        map.insert("file".into(), json!(self.file_path.display().to_string()));
        map.insert("language".into(), json!(self.language));
        score_fields(&self.composite_score, &mut map);
        map.insert(
            "issues".into(),
            Value::Array(issue_rows(
                &self.code_metrics.code_smells,
                &self.semantic_issues,
            )),
        );
        map.insert("advice".into(), json!(self.recommendations));
        map.insert(
            "analysis_time_ms".into(),
            json!(self.performance_metrics.analysis_time_ms),
        );
        Value::Object(map)
    }
}

impl Summary for ProjectAnalysis {
    fn summary(&self) -> Value {
        let files: Vec<Value> = self
            .files
            .iter()
            .map(|f| {
                json!({
                    "file": f.file_path.display().to_string(),
                    "score": f.overall_score(),
                    "grade": f.composite_score.grade.as_str(),
                    "issues": f.performance_metrics.issues_found,
                })
            })
            .collect();
        let skipped: Vec<Value> = self
            .skipped
            .iter()
            .map(|s| json!({ "file": s.path.display().to_string(), "reason": s.reason }))
            .collect();

        json!({
            "project": self.project_path.display().to_string(),
            "files_analyzed": self.file_count,
            "lines_of_code": self.total_lines_of_code,
            "average_quality": self.average_quality,
            "critical_issues": self.critical_issues,
            "metrics": self.project_metrics,
            "advice": self.recommendations,
            "files": files,
            "skipped": skipped,
            "analysis_time_ms": self.analysis_time_ms,
        })
    }
}

fn format_value_as_markdown<W: Write>(value: &Value, writer: &mut W, depth: usize) -> Result<()> {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let header_level = "#".repeat((depth + 1).min(6));
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        writeln!(writer, "{} {}\n", header_level, format_key(key))?;
                        format_value_as_markdown(val, writer, depth + 1)?;
                    }
                    _ => {
                        writeln!(writer, "**{}**: {}\n", format_key(key), format_scalar(val))?;
                    }
                }
            }
        }
        Value::Array(arr) => {
            if arr.is_empty() {
                writeln!(writer, "_None_\n")?;
            } else if is_table_compatible(arr) {
                format_as_table(arr, writer)?;
            } else if arr.iter().all(is_scalar) {
                for item in arr {
                    writeln!(writer, "- {}", format_scalar(item).trim_start())?;
                }
                writeln!(writer)?;
            } else {
                for item in arr {
                    writeln!(writer, "---\n")?;
                    format_value_as_markdown(item, writer, depth)?;
                }
            }
        }
        _ => {
            writeln!(writer, "{}\n", format_scalar(value))?;
        }
    }
    Ok(())
}

fn format_key(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Some(f) => format!("{f:.2}"),
            None => n.to_string(),
        },
        Value::Bool(b) => if *b { "Yes" } else { "No" }.to_string(),
        Value::Null => "-".to_string(),
        _ => value.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn is_table_compatible(arr: &[Value]) -> bool {
    !arr.is_empty()
        && arr.iter().all(|v| match v {
            Value::Object(map) => map.values().all(is_scalar),
            _ => false,
        })
}

fn table_headers(arr: &[Value]) -> Vec<&str> {
    match arr.first() {
        Some(Value::Object(map)) => map.keys().map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

fn table_cell(item: &Value, header: &str) -> String {
    format_scalar(item.get(header).unwrap_or(&Value::Null))
}

fn format_as_table<W: Write>(arr: &[Value], writer: &mut W) -> Result<()> {
    let headers = table_headers(arr);
    if headers.is_empty() {
        return Ok(());
    }

    write!(writer, "|")?;
    for header in &headers {
        write!(writer, " {} |", format_key(header))?;
    }
    writeln!(writer)?;

    write!(writer, "|")?;
    for _ in &headers {
        write!(writer, " --- |")?;
    }
    writeln!(writer)?;

    for item in arr {
        write!(writer, "|")?;
        for header in &headers {
            write!(writer, " {} |", table_cell(item, header).replace('|', "\\|"))?;
        }
        writeln!(writer)?;
    }

    writeln!(writer)?;
    Ok(())
}

/// Aligned columns for flat records in text mode.
fn format_as_columns<W: Write>(arr: &[Value], writer: &mut W, prefix: &str) -> Result<()> {
    let headers = table_headers(arr);
    let rows: Vec<Vec<String>> = arr
        .iter()
        .map(|item| headers.iter().map(|h| table_cell(item, h)).collect())
        .collect();
    let titles: Vec<String> = headers.iter().map(|h| format_key(h)).collect();

    let widths: Vec<usize> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            rows.iter()
                .map(|row| row[i].width())
                .chain(std::iter::once(title.width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    for row in std::iter::once(&titles).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell}{}", " ".repeat(width - cell.width())))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(writer, "{}{}", prefix, line.trim_end())?;
    }
    Ok(())
}

fn format_value_as_text<W: Write>(value: &Value, writer: &mut W, indent: usize) -> Result<()> {
    let prefix = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                if is_scalar(val) {
                    writeln!(writer, "{}{}: {}", prefix, format_key(key), format_scalar(val))?;
                } else {
                    writeln!(writer, "{}{}:", prefix, format_key(key))?;
                    format_value_as_text(val, writer, indent + 1)?;
                }
            }
        }
        Value::Array(arr) if arr.is_empty() => {
            writeln!(writer, "{prefix}(none)")?;
        }
        Value::Array(arr) if is_table_compatible(arr) => {
            format_as_columns(arr, writer, &prefix)?;
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                if is_scalar(item) {
                    writeln!(writer, "{}{}", prefix, format_scalar(item))?;
                } else {
                    writeln!(writer, "{prefix}[{i}]")?;
                    format_value_as_text(item, writer, indent + 1)?;
                }
            }
        }
        _ => {
            writeln!(writer, "{}{}", prefix, format_scalar(value))?;
        }
    }
    Ok(())
}
