//! Version resource lookup.
//!
//! Walks the three-level resource tree (type, name, language) to the first
//! `RT_VERSION` leaf and reads the `VS_FIXEDFILEINFO` block inside it.

use crate::formats::pe::{directory, parse_header, PeLayout};
use crate::formats::{magic, read_bytes, read_u16, read_u32};
use memchr::memmem;

/// Resource type id of version information.
pub const RT_VERSION: u32 = 16;

/// High bit of an entry offset marks a subdirectory.
const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;

/// Upper bound on entries scanned per directory level.
const MAX_ENTRIES: usize = 4096;

/// Four-part fixed file version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl FileVersion {
    /// Build from the `dwFileVersionMS`/`dwFileVersionLS` pair.
    pub fn from_parts(ms: u32, ls: u32) -> Self {
        Self {
            major: (ms >> 16) as u16,
            minor: (ms & 0xFFFF) as u16,
            build: (ls >> 16) as u16,
            revision: (ls & 0xFFFF) as u16,
        }
    }
}

impl std::fmt::Display for FileVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Fixed file version of a PE image as a display string.
pub fn file_version(data: &[u8]) -> Option<String> {
    fixed_file_version(data).map(|v| v.to_string())
}

/// Fixed file version of a PE image, if it carries a version resource.
pub fn fixed_file_version(data: &[u8]) -> Option<FileVersion> {
    let header = parse_header(data).ok()?;
    let layout = PeLayout::parse(data, &header).ok()?;
    let resource = version_resource(data, &layout)?;
    parse_fixed_file_info(resource)
}

/// Raw bytes of the first `RT_VERSION` resource.
pub fn version_resource<'a>(data: &'a [u8], layout: &PeLayout) -> Option<&'a [u8]> {
    let dir = layout.directory(directory::RESOURCE)?;
    let base = layout.rva_to_offset(dir.virtual_address)?;

    let type_entry = find_entry(data, base, Some(RT_VERSION))?;
    let names_dir = subdirectory(type_entry)?;
    let name_entry = find_entry(data, base + names_dir, None)?;
    let languages_dir = subdirectory(name_entry)?;
    let leaf = find_entry(data, base + languages_dir, None)?;
    if leaf & SUBDIRECTORY_FLAG != 0 {
        return None;
    }

    // IMAGE_RESOURCE_DATA_ENTRY: OffsetToData (an RVA), Size
    let entry_off = base + leaf as usize;
    let data_rva = read_u32(data, entry_off).ok()?;
    let size = read_u32(data, entry_off + 4).ok()?;
    let off = layout.rva_to_offset(data_rva)?;
    read_bytes(data, off, size as usize).ok()
}

fn subdirectory(entry: u32) -> Option<usize> {
    (entry & SUBDIRECTORY_FLAG != 0).then(|| (entry & !SUBDIRECTORY_FLAG) as usize)
}

/// Return the `OffsetToData` of the entry with `id`, or of the first entry.
fn find_entry(data: &[u8], dir_off: usize, id: Option<u32>) -> Option<u32> {
    let named = read_u16(data, dir_off + 12).ok()? as usize;
    let ids = read_u16(data, dir_off + 14).ok()? as usize;
    let total = (named + ids).min(MAX_ENTRIES);

    (0..total).find_map(|i| {
        let off = dir_off + 16 + i * 8;
        let name = read_u32(data, off).ok()?;
        let target = read_u32(data, off + 4).ok()?;
        match id {
            Some(wanted) if name != wanted => None,
            _ => Some(target),
        }
    })
}

/// Locate `VS_FIXEDFILEINFO` inside a version resource blob.
pub fn parse_fixed_file_info(resource: &[u8]) -> Option<FileVersion> {
    let signature = magic::FIXED_FILE_INFO.to_le_bytes();
    let pos = memmem::find(resource, &signature)?;
    let ms = read_u32(resource, pos + 8).ok()?;
    let ls = read_u32(resource, pos + 12).ok()?;
    Some(FileVersion::from_parts(ms, ls))
}
