//! PE/COFF (Portable Executable) header parser.
//!
//! Header parsing is strict: the DOS header pointer, the `PE\0\0` signature
//! and the machine field must all be present. Layout parsing (optional
//! header data directories and the section table) is a separate step so that
//! callers probing for optional structures can treat its failures as
//! "structure absent".

use crate::error::{ClassifierError, Result};
use crate::formats::{magic, read_i32, read_u16, read_u32};
use crate::types::MachineType;

/// Offset of `e_lfanew` in the DOS header.
pub const PE_OFFSET_POINTER: usize = 0x3C;

/// Smallest file that can hold the DOS header pointer.
pub const MIN_FILE_SIZE: usize = 0x40;

/// Size of the COFF file header following the signature.
pub const COFF_HEADER_SIZE: usize = 20;

/// Size of one section table entry.
pub const SECTION_HEADER_SIZE: usize = 40;

/// Number of data directories defined by the format.
pub const MAX_DATA_DIRECTORIES: usize = 16;

/// The loader refuses images with more sections than this.
pub const MAX_SECTIONS: usize = 96;

/// PE optional header magic values.
pub mod optional_magic {
    pub const PE32: u16 = 0x10B;
    pub const PE32PLUS: u16 = 0x20B;
}

/// Data directory indices used by this crate.
pub mod directory {
    pub const RESOURCE: usize = 2;
    pub const CLI_HEADER: usize = 14;
}

/// The strict part of a PE header: where it lives and what it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeHeader {
    /// File offset of the `PE\0\0` signature
    pub pe_offset: usize,
    /// Declared target machine
    pub machine: MachineType,
}

impl PeHeader {
    /// File offset of the COFF file header.
    pub fn coff_offset(&self) -> usize {
        self.pe_offset + 4
    }
}

/// Parse the PE signature and machine type.
///
/// Fails with a malformed-header error when the file is shorter than the DOS
/// header, when the header offset is negative or out of range, or when the
/// signature does not match.
pub fn parse_header(data: &[u8]) -> Result<PeHeader> {
    if data.len() < MIN_FILE_SIZE {
        return Err(ClassifierError::FileTooSmall {
            expected: MIN_FILE_SIZE,
            actual: data.len(),
        });
    }

    let raw_offset = read_i32(data, PE_OFFSET_POINTER)?;
    let pe_offset = usize::try_from(raw_offset)
        .map_err(|_| ClassifierError::InvalidHeaderOffset { offset: raw_offset })?;

    let signature = read_u32(data, pe_offset)?;
    if signature != magic::PE {
        return Err(ClassifierError::InvalidSignature {
            expected: magic::PE,
            actual: signature,
        });
    }

    let machine = MachineType::from_raw(read_u16(data, pe_offset + 4)?);

    Ok(PeHeader { pe_offset, machine })
}

/// An RVA/size pair from the optional header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    /// Directories with a zero RVA or size are absent.
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0 && self.size != 0
    }
}

/// One entry of the section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_size: u32,
    pub raw_offset: u32,
}

impl Section {
    fn contains(&self, rva: u32) -> bool {
        let extent = self.virtual_size.max(self.raw_size);
        rva >= self.virtual_address && rva - self.virtual_address < extent
    }
}

/// Optional header directories and section table of a PE image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeLayout {
    /// True when the optional header is PE32+
    pub is_pe32plus: bool,
    /// Data directories, at most [`MAX_DATA_DIRECTORIES`]
    pub directories: Vec<DataDirectory>,
    /// Section table
    pub sections: Vec<Section>,
}

impl PeLayout {
    /// Parse the optional header directories and section table.
    pub fn parse(data: &[u8], header: &PeHeader) -> Result<Self> {
        let coff_off = header.coff_offset();
        let num_sections = read_u16(data, coff_off + 2)? as usize;
        let size_of_optional = read_u16(data, coff_off + 16)? as usize;
        let opt_off = coff_off + COFF_HEADER_SIZE;

        let mut is_pe32plus = false;
        let mut directories = Vec::new();

        if size_of_optional > 0 {
            let opt_magic = read_u16(data, opt_off)?;
            is_pe32plus = opt_magic == optional_magic::PE32PLUS;

            // NumberOfRvaAndSizes sits right before the directory array
            let (count_off, dirs_off) = if is_pe32plus {
                (opt_off + 108, opt_off + 112)
            } else {
                (opt_off + 92, opt_off + 96)
            };

            if count_off + 4 <= opt_off + size_of_optional {
                let count = (read_u32(data, count_off)? as usize).min(MAX_DATA_DIRECTORIES);
                let room = (opt_off + size_of_optional).saturating_sub(dirs_off) / 8;
                for i in 0..count.min(room) {
                    let off = dirs_off + i * 8;
                    directories.push(DataDirectory {
                        virtual_address: read_u32(data, off)?,
                        size: read_u32(data, off + 4)?,
                    });
                }
            }
        }

        let table_off = opt_off + size_of_optional;
        let mut sections = Vec::with_capacity(num_sections.min(MAX_SECTIONS));
        for i in 0..num_sections.min(MAX_SECTIONS) {
            let off = table_off + i * SECTION_HEADER_SIZE;
            sections.push(Section {
                virtual_size: read_u32(data, off + 8)?,
                virtual_address: read_u32(data, off + 12)?,
                raw_size: read_u32(data, off + 16)?,
                raw_offset: read_u32(data, off + 20)?,
            });
        }

        Ok(Self {
            is_pe32plus,
            directories,
            sections,
        })
    }

    /// Look up a data directory; `None` when missing or empty.
    pub fn directory(&self, index: usize) -> Option<DataDirectory> {
        self.directories
            .get(index)
            .copied()
            .filter(DataDirectory::is_present)
    }

    /// Translate an RVA into a file offset through the section table.
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.sections
            .iter()
            .find(|s| s.contains(rva))
            .map(|s| (rva - s.virtual_address) as usize + s.raw_offset as usize)
    }
}
