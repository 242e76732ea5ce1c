//! PE container parsers.
//!
//! This module provides the byte-level pieces of classification:
//! - PE/COFF header and layout (`pe`)
//! - CLI (managed) header and metadata streams (`cli`)
//! - Version resource lookup (`version`)

pub mod cli;
pub mod pe;
pub mod version;

use crate::error::{ClassifierError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Magic values for the structures we look for.
pub mod magic {
    /// PE signature: 'P' 'E' '\0' '\0' read as a little-endian u32
    pub const PE: u32 = 0x0000_4550;

    /// CLI metadata root signature: "BSJB"
    pub const METADATA_ROOT: u32 = 0x424A_5342;

    /// `VS_FIXEDFILEINFO` signature
    pub const FIXED_FILE_INFO: u32 = 0xFEEF_04BD;
}

/// Read bytes with bounds checking.
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(ClassifierError::TruncatedData {
            offset,
            expected: len,
            actual: data.len().saturating_sub(offset),
        }),
    }
}

/// Read a little-endian u16.
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    read_bytes(data, offset, 2).map(LittleEndian::read_u16)
}

/// Read a little-endian u32.
pub fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    read_bytes(data, offset, 4).map(LittleEndian::read_u32)
}

/// Read a little-endian i32.
pub fn read_i32(data: &[u8], offset: usize) -> Result<i32> {
    read_bytes(data, offset, 4).map(LittleEndian::read_i32)
}

/// Read a little-endian u64.
pub fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    read_bytes(data, offset, 8).map(LittleEndian::read_u64)
}
