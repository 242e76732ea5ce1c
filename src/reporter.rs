//! Report orchestration: validation, scanning and output.
//!
//! A single failing file never aborts a directory scan. Its error is turned
//! into a progress message, recorded in [`ReportResult::failures`], and the
//! file is left out of the rows.

use crate::attributes::AttributeCollector;
use crate::formatter::{write_report, JsonWriter, ReportWriter, TableWriter};
use crate::scan;
use crate::types::FileData;
use chrono::Local;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What the search path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    /// A single file
    File,
    /// The files directly inside a directory
    Directory,
    /// Every file below a directory
    DirectoryRecurse,
}

/// Report document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Text table
    #[default]
    Table,
    /// JSON array of rows
    Json,
}

impl ReportFormat {
    /// Writer that renders this format.
    pub fn writer(self) -> Box<dyn ReportWriter + Send + Sync> {
        match self {
            Self::Table => Box::new(TableWriter::new()),
            Self::Json => Box::new(JsonWriter::new()),
        }
    }
}

/// Everything a report run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    /// File or directory to search
    pub path: PathBuf,
    /// How `path` is interpreted
    pub search_mode: SearchMode,
    /// Report document format
    pub format: ReportFormat,
    /// Directory that receives the report; current directory when unset
    pub output_dir: Option<PathBuf>,
}

impl Parameters {
    /// Parameters with the default table format and no output directory.
    pub fn new(path: impl Into<PathBuf>, search_mode: SearchMode) -> Self {
        Self {
            path: path.into(),
            search_mode,
            format: ReportFormat::default(),
            output_dir: None,
        }
    }

    /// Set the report format.
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Success flag with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportValidation {
    pub success: bool,
    pub message: String,
}

impl ReportValidation {
    /// A successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of a report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    /// Overall status
    pub validation: ReportValidation,
    /// Classified files, ordered by path
    pub files: Vec<FileData>,
    /// One message per file that could not be classified
    pub failures: Vec<String>,
}

impl ReportResult {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            validation: ReportValidation::failed(message),
            files: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Check parameters before running a report.
pub fn validate(parameters: &Parameters) -> ReportValidation {
    let path = &parameters.path;

    if path.as_os_str().is_empty() {
        return ReportValidation::failed("path to search is not specified");
    }

    match parameters.search_mode {
        SearchMode::File if !path.is_file() => {
            return ReportValidation::failed("path to search does not exist");
        }
        SearchMode::Directory | SearchMode::DirectoryRecurse if !path.is_dir() => {
            return ReportValidation::failed(
                "path is not a directory but directory search requested",
            );
        }
        _ => {}
    }

    if let Some(dir) = &parameters.output_dir {
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            return ReportValidation::failed(
                "the directory specified for the output does not exist",
            );
        }
    }

    ReportValidation::ok("")
}

/// Run the scan described by `parameters`.
///
/// `progress` receives narration and per-file failure messages; it may be
/// called from several threads at once.
pub fn run_report<F>(parameters: &Parameters, progress: F) -> ReportResult
where
    F: Fn(&str) + Sync,
{
    let collector = AttributeCollector::new();

    match parameters.search_mode {
        SearchMode::File => match collector.collect(&parameters.path) {
            Ok(data) => ReportResult {
                validation: ReportValidation::ok(""),
                files: vec![data],
                failures: Vec::new(),
            },
            Err(e) => {
                let message = failure_message(&parameters.path, &e);
                warn!(path = %parameters.path.display(), error = %e, "classification failed");
                progress(&message);
                ReportResult::failed(e.to_string())
            }
        },
        SearchMode::Directory | SearchMode::DirectoryRecurse => {
            let recursive = parameters.search_mode == SearchMode::DirectoryRecurse;
            scan_directory(&collector, &parameters.path, recursive, &progress)
        }
    }
}

fn scan_directory<F>(
    collector: &AttributeCollector,
    root: &Path,
    recursive: bool,
    progress: &F,
) -> ReportResult
where
    F: Fn(&str) + Sync,
{
    progress(&format!("Searching for file(s) at {} ...", root.display()));

    let files = match scan::list_files(root, recursive) {
        Ok(files) => files,
        Err(e) => return ReportResult::failed(e.to_string()),
    };

    let outcomes: Vec<_> = files
        .par_iter()
        .map(|file| {
            progress(&format!("Getting file information for : {}", file.display()));
            debug!(path = %file.display(), "classifying");
            collector.collect(file).map_err(|e| {
                warn!(path = %file.display(), error = %e, "classification failed");
                let message = failure_message(file, &e);
                progress(&message);
                message
            })
        })
        .collect();

    let mut rows = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(data) => rows.push(data),
            Err(message) => failures.push(message),
        }
    }

    info!(
        root = %root.display(),
        classified = rows.len(),
        failed = failures.len(),
        "scan finished"
    );

    if rows.is_empty() {
        return ReportResult {
            validation: ReportValidation::failed(format!(
                "no binaries found that could be classified under {}",
                root.display()
            )),
            files: rows,
            failures,
        };
    }

    ReportResult {
        validation: ReportValidation::ok(""),
        files: rows,
        failures,
    }
}

fn failure_message(path: &Path, error: &dyn std::fmt::Display) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("Failed to get data for {name} : {error}")
}

/// Write the report for a successful run.
///
/// On success the message holds the path of the written file.
pub fn output_results(result: &ReportResult, parameters: &Parameters) -> ReportValidation {
    let directory = match &parameters.output_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
        _ => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => return ReportValidation::failed(format!("failed to generate report: {e}")),
        },
    };

    let writer = parameters.format.writer();
    match write_report(writer.as_ref(), &result.files, &directory, Local::now()) {
        Ok(path) => {
            info!(path = %path.display(), rows = result.files.len(), "report written");
            ReportValidation::ok(path.display().to_string())
        }
        Err(e) => ReportValidation::failed(format!("failed to generate report: {e}")),
    }
}
