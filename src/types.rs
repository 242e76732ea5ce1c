//! Core types for PE architecture classification.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// COFF header machine codes that carry meaning for classification.
pub mod machine {
    pub const I386: u16 = 0x014C;
    pub const IA64: u16 = 0x0200;
    pub const AMD64: u16 = 0x8664;
}

/// Target machine declared in the COFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineType {
    /// x86-64 (`0x8664`)
    Amd64,
    /// Itanium (`0x0200`)
    Ia64,
    /// Intel 386 or later (`0x014C`)
    I386,
    /// Any other code, kept verbatim
    Other(u16),
}

impl MachineType {
    /// Decode a raw machine field.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            machine::AMD64 => Self::Amd64,
            machine::IA64 => Self::Ia64,
            machine::I386 => Self::I386,
            other => Self::Other(other),
        }
    }

    /// The raw 16-bit value as stored in the file.
    pub fn raw(self) -> u16 {
        match self {
            Self::Amd64 => machine::AMD64,
            Self::Ia64 => machine::IA64,
            Self::I386 => machine::I386,
            Self::Other(raw) => raw,
        }
    }

    /// Native register width implied by the machine type, if recognized.
    pub fn native_bitwidth(self) -> Option<u8> {
        match self {
            Self::Amd64 | Self::Ia64 => Some(64),
            Self::I386 => Some(32),
            Self::Other(_) => None,
        }
    }

    /// True for AMD64 and IA64.
    pub fn is_64bit(self) -> bool {
        self.native_bitwidth() == Some(64)
    }

    /// True for I386.
    pub fn is_32bit(self) -> bool {
        self.native_bitwidth() == Some(32)
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amd64 => write!(f, "AMD64"),
            Self::Ia64 => write!(f, "IA64"),
            Self::I386 => write!(f, "I386"),
            Self::Other(raw) => write!(f, "0x{:04X}", raw),
        }
    }
}

/// Final architecture classification of a binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryArchitecture {
    /// Native 64-bit code (AMD64 or IA64)
    Native64,
    /// Native 32-bit code (I386)
    Native32Bit,
    /// Managed assembly with no specific processor requirement
    ManagedDotNet,
    /// Managed assembly that requires a 32-bit x86 process
    ManagedDotNet32,
    /// Managed assembly built for AMD64
    ManagedDotNet64,
    /// PE container with nothing we recognize
    Unknown,
}

impl BinaryArchitecture {
    /// Variant name, as shown in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Native64 => "Native64",
            Self::Native32Bit => "Native32Bit",
            Self::ManagedDotNet => "ManagedDotNet",
            Self::ManagedDotNet32 => "ManagedDotNet32",
            Self::ManagedDotNet64 => "ManagedDotNet64",
            Self::Unknown => "Unknown",
        }
    }

    /// True for every managed variant.
    pub fn is_managed(&self) -> bool {
        matches!(
            self,
            Self::ManagedDotNet | Self::ManagedDotNet32 | Self::ManagedDotNet64
        )
    }

    /// True for the native variants.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native64 | Self::Native32Bit)
    }
}

impl fmt::Display for BinaryArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Descriptive record for one classified file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    /// File name without directory
    pub name: String,
    /// Containing directory
    pub path: Option<String>,
    /// Host that produced the record
    pub machine_name: String,
    /// Last write time of the file
    pub last_modified: DateTime<Local>,
    /// Resolved architecture
    pub architecture: BinaryArchitecture,
    /// Fixed file version from the version resource
    pub file_version: Option<String>,
}
