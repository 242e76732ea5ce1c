//! Synthetic PE image builder shared by the integration tests.
//!
//! Layout of every image:
//!
//! | File offset | RVA    | Content                                  |
//! |-------------|--------|------------------------------------------|
//! | 0x000       |        | DOS header, `e_lfanew` = 0x80            |
//! | 0x080       |        | `PE\0\0`, COFF header, optional header   |
//! | 0x400       | 0x2000 | CLI header                               |
//! | 0x448       | 0x2048 | metadata root with `#~` stream           |
//! | 0xC00       | 0x2800 | resource tree with one `RT_VERSION` leaf |

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const AMD64: u16 = 0x8664;
pub const IA64: u16 = 0x0200;
pub const I386: u16 = 0x014C;
pub const ARM64: u16 = 0xAA64;

pub const IL_ONLY: u32 = 0x1;
pub const REQUIRES_32BIT: u32 = 0x2;
pub const PREFERS_32BIT: u32 = 0x20000;

const PE_OFFSET: usize = 0x80;
const SECTION_RVA: u32 = 0x2000;
const SECTION_RAW: usize = 0x400;
const SECTION_SIZE: usize = 0x1000;
const CLI_RVA: u32 = 0x2000;
const METADATA_RVA: u32 = 0x2048;
const RESOURCE_RVA: u32 = 0x2800;

/// Managed payload of an image.
#[derive(Debug, Clone, Copy)]
pub enum Managed {
    /// CLI header with an Assembly table row and the given flags
    Assembly { flags: u32 },
    /// CLI header whose metadata has no Assembly table
    Module { flags: u32 },
}

#[derive(Debug, Clone)]
pub struct PeBuilder {
    machine: u16,
    pe32plus: bool,
    managed: Option<Managed>,
    version: Option<(u32, u32)>,
}

impl PeBuilder {
    pub fn new(machine: u16) -> Self {
        Self {
            machine,
            pe32plus: machine == AMD64 || machine == IA64 || machine == ARM64,
            managed: None,
            version: None,
        }
    }

    pub fn assembly(mut self, flags: u32) -> Self {
        self.managed = Some(Managed::Assembly { flags });
        self
    }

    pub fn module(mut self, flags: u32) -> Self {
        self.managed = Some(Managed::Module { flags });
        self
    }

    pub fn version(mut self, major: u16, minor: u16, build: u16, revision: u16) -> Self {
        let ms = (u32::from(major) << 16) | u32::from(minor);
        let ls = (u32::from(build) << 16) | u32::from(revision);
        self.version = Some((ms, ls));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; SECTION_RAW + SECTION_SIZE];
        data[0..2].copy_from_slice(b"MZ");
        put_u32(&mut data, 0x3C, PE_OFFSET as u32);

        data[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");
        let coff = PE_OFFSET + 4;
        put_u16(&mut data, coff, self.machine);
        put_u16(&mut data, coff + 2, 1);
        let opt_size: u16 = if self.pe32plus { 0xF0 } else { 0xE0 };
        put_u16(&mut data, coff + 16, opt_size);

        let opt = coff + 20;
        put_u16(&mut data, opt, if self.pe32plus { 0x20B } else { 0x10B });
        let (count_off, dirs_off) = if self.pe32plus {
            (opt + 108, opt + 112)
        } else {
            (opt + 92, opt + 96)
        };
        put_u32(&mut data, count_off, 16);

        let section = opt + opt_size as usize;
        data[section..section + 5].copy_from_slice(b".text");
        put_u32(&mut data, section + 8, SECTION_SIZE as u32);
        put_u32(&mut data, section + 12, SECTION_RVA);
        put_u32(&mut data, section + 16, SECTION_SIZE as u32);
        put_u32(&mut data, section + 20, SECTION_RAW as u32);

        if let Some(managed) = self.managed {
            let (flags, with_assembly) = match managed {
                Managed::Assembly { flags } => (flags, true),
                Managed::Module { flags } => (flags, false),
            };
            let metadata = metadata_root(with_assembly);

            put_u32(&mut data, dirs_off + 14 * 8, CLI_RVA);
            put_u32(&mut data, dirs_off + 14 * 8 + 4, 72);

            let cli = rva_to_offset(CLI_RVA);
            put_u32(&mut data, cli, 72);
            put_u16(&mut data, cli + 4, 2);
            put_u16(&mut data, cli + 6, 5);
            put_u32(&mut data, cli + 8, METADATA_RVA);
            put_u32(&mut data, cli + 12, metadata.len() as u32);
            put_u32(&mut data, cli + 16, flags);

            let root = rva_to_offset(METADATA_RVA);
            data[root..root + metadata.len()].copy_from_slice(&metadata);
        }

        if let Some((ms, ls)) = self.version {
            let resources = resource_tree(ms, ls);
            put_u32(&mut data, dirs_off + 2 * 8, RESOURCE_RVA);
            put_u32(&mut data, dirs_off + 2 * 8 + 4, resources.len() as u32);

            let base = rva_to_offset(RESOURCE_RVA);
            data[base..base + resources.len()].copy_from_slice(&resources);
        }

        data
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.build()).unwrap();
        path
    }
}

fn rva_to_offset(rva: u32) -> usize {
    (rva - SECTION_RVA) as usize + SECTION_RAW
}

fn put_u16(data: &mut [u8], off: usize, value: u16) {
    data[off..off + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(data: &mut [u8], off: usize, value: u32) {
    data[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

/// Metadata root with `#~` and `#Strings` streams.
fn metadata_root(with_assembly: bool) -> Vec<u8> {
    // Module, TypeDef, and optionally Assembly
    let mut valid: u64 = 1 | (1 << 2);
    let mut rows = vec![1u32, 2];
    if with_assembly {
        valid |= 1 << 0x20;
        rows.push(1);
    }

    let mut tables = vec![0u8; 24];
    tables[4] = 2;
    tables[7] = 1;
    tables[8..16].copy_from_slice(&valid.to_le_bytes());
    for r in rows {
        tables.extend_from_slice(&r.to_le_bytes());
    }

    let mut root = Vec::new();
    root.extend_from_slice(b"BSJB");
    root.extend_from_slice(&1u16.to_le_bytes());
    root.extend_from_slice(&1u16.to_le_bytes());
    root.extend_from_slice(&0u32.to_le_bytes());
    root.extend_from_slice(&12u32.to_le_bytes());
    root.extend_from_slice(b"v4.0.30319\0\0");
    root.extend_from_slice(&0u16.to_le_bytes());
    root.extend_from_slice(&2u16.to_le_bytes());

    // Stream headers: offsets are patched once the layout is known
    let tables_hdr = root.len();
    root.extend_from_slice(&[0u8; 8]);
    root.extend_from_slice(b"#~\0\0");
    let strings_hdr = root.len();
    root.extend_from_slice(&[0u8; 8]);
    root.extend_from_slice(b"#Strings\0\0\0\0");

    let tables_off = root.len() as u32;
    root.extend_from_slice(&tables);
    let strings_off = root.len() as u32;
    root.extend_from_slice(&[0u8; 8]);

    root[tables_hdr..tables_hdr + 4].copy_from_slice(&tables_off.to_le_bytes());
    root[tables_hdr + 4..tables_hdr + 8].copy_from_slice(&(tables.len() as u32).to_le_bytes());
    root[strings_hdr..strings_hdr + 4].copy_from_slice(&strings_off.to_le_bytes());
    root[strings_hdr + 4..strings_hdr + 8].copy_from_slice(&8u32.to_le_bytes());

    root
}

/// Resource tree: RT_VERSION -> id 1 -> language 0x409 -> VS_VERSIONINFO.
fn resource_tree(ms: u32, ls: u32) -> Vec<u8> {
    let mut res = vec![0u8; 0x100];

    // Level 1 at 0x00: a named entry first, then RT_VERSION
    put_u16(&mut res, 12, 1);
    put_u16(&mut res, 14, 1);
    put_u32(&mut res, 16, 0x8000_0090);
    put_u32(&mut res, 20, 0x8000_0090);
    put_u32(&mut res, 24, 16);
    put_u32(&mut res, 28, 0x8000_0020);

    // Level 2 at 0x20
    put_u16(&mut res, 0x20 + 14, 1);
    put_u32(&mut res, 0x30, 1);
    put_u32(&mut res, 0x34, 0x8000_0040);

    // Level 3 at 0x40
    put_u16(&mut res, 0x40 + 14, 1);
    put_u32(&mut res, 0x50, 0x409);
    put_u32(&mut res, 0x54, 0x60);

    // Data entry at 0x60, blob at 0xA0
    let info = version_info(ms, ls);
    put_u32(&mut res, 0x60, RESOURCE_RVA + 0xA0);
    put_u32(&mut res, 0x64, info.len() as u32);

    res.truncate(0xA0);
    res.extend_from_slice(&info);
    res
}

/// Minimal `VS_VERSIONINFO` with a `VS_FIXEDFILEINFO` value.
fn version_info(ms: u32, ls: u32) -> Vec<u8> {
    let key: Vec<u8> = "VS_VERSION_INFO\0"
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();

    let mut blob = Vec::new();
    blob.extend_from_slice(&0u16.to_le_bytes());
    blob.extend_from_slice(&52u16.to_le_bytes());
    blob.extend_from_slice(&0u16.to_le_bytes());
    blob.extend_from_slice(&key);
    while blob.len() % 4 != 0 {
        blob.push(0);
    }

    blob.extend_from_slice(&0xFEEF_04BDu32.to_le_bytes());
    blob.extend_from_slice(&0x0001_0000u32.to_le_bytes());
    blob.extend_from_slice(&ms.to_le_bytes());
    blob.extend_from_slice(&ls.to_le_bytes());
    blob.extend_from_slice(&ms.to_le_bytes());
    blob.extend_from_slice(&ls.to_le_bytes());
    blob.extend_from_slice(&[0u8; 28]);

    let len = blob.len() as u16;
    blob[0..2].copy_from_slice(&len.to_le_bytes());
    blob
}
