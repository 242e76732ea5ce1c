//! Per-file attribute collection.
//!
//! Builds a [`FileData`] record from a single read of the file: the same
//! bytes feed the architecture classifier and the version resource lookup.

use crate::error::Result;
use crate::formats::version;
use crate::types::FileData;
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use sysinfo::System;

/// Fallback when the host name cannot be determined.
pub const UNKNOWN_MACHINE: &str = "unknown";

/// Collects [`FileData`] records on behalf of one host.
#[derive(Debug, Clone)]
pub struct AttributeCollector {
    machine_name: String,
}

impl Default for AttributeCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeCollector {
    /// Create a collector for the local host.
    pub fn new() -> Self {
        Self::with_machine_name(System::host_name().unwrap_or_else(|| UNKNOWN_MACHINE.to_string()))
    }

    /// Create a collector that stamps records with a fixed machine name.
    pub fn with_machine_name(machine_name: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
        }
    }

    /// Machine name written into each record.
    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Classify one file and gather its descriptive attributes.
    pub fn collect(&self, path: &Path) -> Result<FileData> {
        let modified = fs::metadata(path)?.modified()?;
        let data = fs::read(path)?;
        let architecture = crate::classify_bytes(&data)?;

        Ok(FileData {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: parent_directory(path),
            machine_name: self.machine_name.clone(),
            last_modified: DateTime::<Local>::from(modified),
            architecture,
            file_version: version::file_version(&data),
        })
    }
}

/// Gather attributes for one file on the local host.
pub fn file_attributes<P: AsRef<Path>>(path: P) -> Result<FileData> {
    AttributeCollector::new().collect(path.as_ref())
}

fn parent_directory(path: &Path) -> Option<String> {
    let full = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    full.parent()
        .map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
}
