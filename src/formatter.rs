//! Report writers for classified file records.
//!
//! This module provides trait-based writers for rendering [`FileData`] rows
//! as a text table or a JSON document, plus the helper that saves a rendered
//! report under a timestamped file name.

use crate::error::ReportError;
use crate::types::FileData;
use chrono::{DateTime, Local};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Column titles, in output order.
pub const COLUMNS: [&str; 7] = [
    "ReportGenerationTime",
    "MachineName",
    "ParentDirectory",
    "BinaryName",
    "BinaryArchitecture",
    "FileVersion",
    "LastModDateTime",
];

/// Timestamp format used inside reports.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Timestamp format used in report file names.
pub const FILE_STAMP_FORMAT: &str = "%d_%m_%Y_%H_%M_%S";

/// Base name of every report file.
pub const REPORT_PREFIX: &str = "file_attributes_output";

/// Trait for rendering a set of rows into a report document.
pub trait ReportWriter {
    /// File extension of the rendered document, without the dot.
    fn extension(&self) -> &'static str;

    /// Render all rows. `generated` is stamped on every row.
    fn render(&self, rows: &[FileData], generated: DateTime<Local>) -> Result<String, ReportError>;
}

/// Text table writer.
#[derive(Debug, Clone, Default)]
pub struct TableWriter;

impl TableWriter {
    /// Create a new table writer.
    pub fn new() -> Self {
        Self
    }
}

impl ReportWriter for TableWriter {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, rows: &[FileData], generated: DateTime<Local>) -> Result<String, ReportError> {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(COLUMNS.iter().map(|c| Cell::new(c)));

        let stamp = generated.format(TIMESTAMP_FORMAT).to_string();
        for row in rows {
            table.add_row(vec![
                Cell::new(&stamp).set_alignment(CellAlignment::Center),
                Cell::new(&row.machine_name).set_alignment(CellAlignment::Center),
                Cell::new(row.path.as_deref().unwrap_or_default()),
                Cell::new(&row.name).set_alignment(CellAlignment::Center),
                Cell::new(row.architecture.name()).set_alignment(CellAlignment::Center),
                Cell::new(row.file_version.as_deref().unwrap_or_default())
                    .set_alignment(CellAlignment::Center),
                Cell::new(row.last_modified.format(TIMESTAMP_FORMAT))
                    .set_alignment(CellAlignment::Center),
            ]);
        }

        Ok(format!("{table}\n"))
    }
}

/// JSON output writer.
#[derive(Debug, Clone)]
pub struct JsonWriter {
    /// Pretty-print JSON
    pub pretty: bool,
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonWriter {
    /// Create a new JSON writer with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON writer.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ReportWriter for JsonWriter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, rows: &[FileData], generated: DateTime<Local>) -> Result<String, ReportError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct JsonRow<'a> {
            report_generation_time: String,
            machine_name: &'a str,
            parent_directory: Option<&'a str>,
            binary_name: &'a str,
            binary_architecture: &'static str,
            file_version: Option<&'a str>,
            last_mod_date_time: String,
        }

        let stamp = generated.format(TIMESTAMP_FORMAT).to_string();
        let output: Vec<JsonRow<'_>> = rows
            .iter()
            .map(|row| JsonRow {
                report_generation_time: stamp.clone(),
                machine_name: &row.machine_name,
                parent_directory: row.path.as_deref(),
                binary_name: &row.name,
                binary_architecture: row.architecture.name(),
                file_version: row.file_version.as_deref(),
                last_mod_date_time: row.last_modified.format(TIMESTAMP_FORMAT).to_string(),
            })
            .collect();

        let mut json = if self.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        json.push('\n');
        Ok(json)
    }
}

/// File name for a report generated at `generated`.
pub fn report_file_name(generated: DateTime<Local>, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        REPORT_PREFIX,
        generated.format(FILE_STAMP_FORMAT),
        extension
    )
}

/// Render `rows` and save them into `directory`, returning the file path.
pub fn write_report(
    writer: &dyn ReportWriter,
    rows: &[FileData],
    directory: &Path,
    generated: DateTime<Local>,
) -> Result<PathBuf, ReportError> {
    let rendered = writer.render(rows, generated)?;
    let path = directory.join(report_file_name(generated, writer.extension()));
    fs::write(&path, rendered).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
