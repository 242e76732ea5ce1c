//! PE Arch Report - Binary Architecture Classification and Reporting
//!
//! This library classifies Windows PE binaries by processor architecture and
//! tells native images apart from managed (.NET) assemblies, without loading
//! them through a runtime.
//!
//! # Features
//!
//! - **Header Parsing**: Reads the PE signature and COFF machine type directly
//! - **Managed Detection**: Finds the CLI header and the assembly manifest table
//! - **Platform Refinement**: Splits managed assemblies into AnyCPU, x86 and x64
//! - **Version Lookup**: Reads the fixed file version from the version resource
//! - **Batch Reports**: Scans directories in parallel and renders a table or JSON
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pe_arch_report::{classify_file, BinaryArchitecture};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let arch = classify_file("C:/Windows/System32/kernel32.dll")?;
//!     if arch == BinaryArchitecture::Native64 {
//!         println!("64-bit native image");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Decision Table
//!
//! Evaluated in order, first match wins:
//!
//! | Machine      | Assembly manifest | Result                 |
//! |--------------|-------------------|------------------------|
//! | AMD64 / IA64 | no                | `Native64`             |
//! | I386         | no                | `Native32Bit`          |
//! | any          | yes               | `ManagedDotNet*`       |
//! | other        | no                | `Unknown`              |

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod attributes;
pub mod error;
pub mod formats;
pub mod formatter;
pub mod reporter;
pub mod scan;
pub mod types;

pub use error::{ClassifierError, ErrorKind, ReportError, Result};
pub use formats::cli::{CorFlags, ManagedProbe};
pub use types::{BinaryArchitecture, FileData, MachineType};

use std::path::Path;

/// Classify a binary file by path.
///
/// The file is opened for shared reading, read in full and closed before any
/// parsing happens.
///
/// # Errors
///
/// * [`ErrorKind::Io`] if the file cannot be opened or read
/// * [`ErrorKind::MalformedHeader`] if it is not a PE container
///
/// # Example
///
/// ```rust,no_run
/// use pe_arch_report::classify_file;
///
/// let arch = classify_file("app.exe")?;
/// println!("Architecture: {}", arch);
/// # Ok::<(), pe_arch_report::ClassifierError>(())
/// ```
pub fn classify_file<P: AsRef<Path>>(path: P) -> Result<BinaryArchitecture> {
    let data = std::fs::read(path)?;
    classify_bytes(&data)
}

/// Classify binary data from a byte slice.
///
/// # Example
///
/// ```rust
/// use pe_arch_report::{classify_bytes, BinaryArchitecture};
///
/// let mut image = vec![0u8; 0x100];
/// image[0x3C] = 0x80;
/// image[0x80..0x84].copy_from_slice(b"PE\0\0");
/// image[0x84..0x86].copy_from_slice(&0x8664u16.to_le_bytes());
///
/// assert_eq!(classify_bytes(&image)?, BinaryArchitecture::Native64);
/// # Ok::<(), pe_arch_report::ClassifierError>(())
/// ```
pub fn classify_bytes(data: &[u8]) -> Result<BinaryArchitecture> {
    let header = formats::pe::parse_header(data)?;
    let managed = formats::cli::probe(data, &header);
    Ok(decide(header.machine, &managed))
}

/// Apply the classification decision table.
pub fn decide(machine: MachineType, managed: &ManagedProbe) -> BinaryArchitecture {
    let is_assembly = managed.is_assembly();

    if machine.is_64bit() && !is_assembly {
        return BinaryArchitecture::Native64;
    }
    if machine.is_32bit() && !is_assembly {
        return BinaryArchitecture::Native32Bit;
    }
    if is_assembly {
        return managed_platform(machine, managed.flags().unwrap_or_else(CorFlags::empty));
    }
    BinaryArchitecture::Unknown
}

/// Managed platform from the machine type and CLI header flags.
///
/// AMD64 images are x64-only. I386 images that require 32-bit, or that carry
/// native code (no `IL_ONLY`), are x86-only. Everything else runs anywhere.
pub fn managed_platform(machine: MachineType, flags: CorFlags) -> BinaryArchitecture {
    match machine {
        MachineType::Amd64 => BinaryArchitecture::ManagedDotNet64,
        MachineType::I386
            if flags.contains(CorFlags::REQUIRES_32BIT) || !flags.contains(CorFlags::IL_ONLY) =>
        {
            BinaryArchitecture::ManagedDotNet32
        }
        _ => BinaryArchitecture::ManagedDotNet,
    }
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
