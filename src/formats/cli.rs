//! CLI (managed code) header and metadata probing.
//!
//! A PE image is managed when its CLI header data directory is present. It is
//! an *assembly* only when its metadata additionally defines an Assembly table
//! row; a metadata-bearing image without one is a netmodule.
//!
//! The probe never fails. Any inconsistency inside the CLI structures is
//! reported as the weakest outcome that could still be established.

use crate::error::{ClassifierError, Result};
use crate::formats::pe::{directory, DataDirectory, PeHeader, PeLayout};
use crate::formats::{magic, read_bytes, read_u16, read_u32, read_u64};
use bitflags::bitflags;

/// Metadata table number of the Assembly table.
pub const ASSEMBLY_TABLE: u32 = 0x20;

/// Longest stream name allowed by the metadata format, including the NUL.
const MAX_STREAM_NAME: usize = 32;

bitflags! {
    /// `Flags` field of the CLI header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CorFlags: u32 {
        /// Image contains only IL code
        const IL_ONLY = 0x0000_0001;
        /// Image must run in a 32-bit process
        const REQUIRES_32BIT = 0x0000_0002;
        /// Image is an IL library
        const IL_LIBRARY = 0x0000_0004;
        /// Image has a strong name signature
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// Entry point is native code
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// Runtime should track debug data
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// AnyCPU image that prefers a 32-bit process
        const PREFERS_32BIT = 0x0002_0000;
    }
}

/// The fields of the CLI header we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliHeader {
    /// Minimum runtime version (major, minor)
    pub runtime_version: (u16, u16),
    /// Location of the metadata root
    pub metadata: DataDirectory,
    /// Image flags
    pub flags: CorFlags,
}

/// Outcome of probing an image for managed metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedProbe {
    /// No usable CLI header
    Native,
    /// CLI header present but no assembly manifest
    Module(CliHeader),
    /// CLI header and assembly manifest present
    Assembly(CliHeader),
}

impl ManagedProbe {
    /// True only when an assembly manifest was found.
    pub fn is_assembly(&self) -> bool {
        matches!(self, Self::Assembly(_))
    }

    /// CLI header flags, if a CLI header was found.
    pub fn flags(&self) -> Option<CorFlags> {
        match self {
            Self::Native => None,
            Self::Module(h) | Self::Assembly(h) => Some(h.flags),
        }
    }
}

/// Probe a PE image for CLI metadata and an assembly manifest.
pub fn probe(data: &[u8], header: &PeHeader) -> ManagedProbe {
    let Ok(layout) = PeLayout::parse(data, header) else {
        return ManagedProbe::Native;
    };
    let Some(cli) = read_cli_header(data, &layout) else {
        return ManagedProbe::Native;
    };

    match has_assembly_manifest(data, &layout, &cli) {
        Ok(true) => ManagedProbe::Assembly(cli),
        _ => ManagedProbe::Module(cli),
    }
}

/// Locate and decode the CLI header through data directory 14.
pub fn read_cli_header(data: &[u8], layout: &PeLayout) -> Option<CliHeader> {
    let dir = layout.directory(directory::CLI_HEADER)?;
    let off = layout.rva_to_offset(dir.virtual_address)?;

    // cb, runtime version, metadata directory, flags
    let raw = read_bytes(data, off, 20).ok()?;
    let cb = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    if cb < 20 {
        return None;
    }

    Some(CliHeader {
        runtime_version: (
            u16::from_le_bytes([raw[4], raw[5]]),
            u16::from_le_bytes([raw[6], raw[7]]),
        ),
        metadata: DataDirectory {
            virtual_address: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            size: u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]),
        },
        flags: CorFlags::from_bits_retain(u32::from_le_bytes([
            raw[16], raw[17], raw[18], raw[19],
        ])),
    })
}

/// Check the metadata tables stream for at least one Assembly row.
pub fn has_assembly_manifest(data: &[u8], layout: &PeLayout, cli: &CliHeader) -> Result<bool> {
    if !cli.metadata.is_present() {
        return Ok(false);
    }
    let Some(root_off) = layout.rva_to_offset(cli.metadata.virtual_address) else {
        return Ok(false);
    };
    let root = read_bytes(data, root_off, cli.metadata.size as usize)?;

    match find_table_stream(root)? {
        Some(tables) => assembly_row_count(tables).map(|rows| rows > 0),
        None => Ok(false),
    }
}

/// Find the `#~` (or uncompressed `#-`) stream inside a metadata root.
pub fn find_table_stream(root: &[u8]) -> Result<Option<&[u8]>> {
    if read_u32(root, 0)? != magic::METADATA_ROOT {
        return Ok(None);
    }

    // Version string length is stored padded to 4 bytes
    let version_len = read_u32(root, 12)? as usize;
    let flags_off = 16usize.saturating_add(version_len);
    let stream_count = read_u16(root, flags_off + 2)?;

    let mut off = flags_off + 4;
    for _ in 0..stream_count {
        let stream_off = read_u32(root, off)? as usize;
        let stream_size = read_u32(root, off + 4)? as usize;

        let name_area = &root[(off + 8).min(root.len())..];
        let name_len = memchr::memchr(0, &name_area[..name_area.len().min(MAX_STREAM_NAME)])
            .ok_or(ClassifierError::TruncatedData {
                offset: off + 8,
                expected: MAX_STREAM_NAME,
                actual: name_area.len(),
            })?;
        let name = &name_area[..name_len];

        if name == b"#~" || name == b"#-" {
            return read_bytes(root, stream_off, stream_size).map(Some);
        }

        // Name plus NUL, rounded up to a 4-byte boundary
        off += 8 + ((name_len + 4) & !3);
    }

    Ok(None)
}

/// Number of rows in the Assembly table of a `#~` stream.
pub fn assembly_row_count(tables: &[u8]) -> Result<u32> {
    let valid = read_u64(tables, 8)?;
    if valid & (1u64 << ASSEMBLY_TABLE) == 0 {
        return Ok(0);
    }

    // Row counts follow the header, one per present table, in table order
    let mask_below = (1u64 << ASSEMBLY_TABLE) - 1;
    let index = (valid & mask_below).count_ones() as usize;
    read_u32(tables, 24 + index * 4)
}
