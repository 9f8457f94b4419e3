//! FDT header parsing.
//!
//! Every device tree blob begins with this header; all fields are
//! stored big-endian on-disk and converted to host order on read.

use crate::error::{BlobError, Error};

pub const FDT_MAGIC: u32 = 0xd00dfeed;

/// Minimum header version this engine relies on for a trustworthy
/// `size_dt_struct` (see spec.md §6 and §9's "older, fuller" decision).
pub const MIN_VERSION: u32 = 16;

pub const HEADER_SIZE: usize = 40;

#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub magic: u32,
    pub totalsize: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    pub boot_cpuid_phys: u32,
    pub size_dt_strings: u32,
    pub size_dt_struct: u32,
}

impl Header {
    /// Parses a header from the start of `data`, validating the magic
    /// number, minimum version, and that `totalsize` fits the slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < HEADER_SIZE {
            return Err(BlobError::BufferTooSmall { pos: HEADER_SIZE }.into());
        }

        let word = |i: usize| {
            u32::from_be_bytes(data[i * 4..i * 4 + 4].try_into().unwrap())
        };

        let magic = word(0);
        if magic != FDT_MAGIC {
            return Err(BlobError::InvalidMagic(magic).into());
        }

        let header = Header {
            magic,
            totalsize: word(1),
            off_dt_struct: word(2),
            off_dt_strings: word(3),
            off_mem_rsvmap: word(4),
            version: word(5),
            last_comp_version: word(6),
            boot_cpuid_phys: word(7),
            size_dt_strings: word(8),
            size_dt_struct: word(9),
        };

        if header.version < MIN_VERSION {
            return Err(BlobError::UnsupportedVersion(header.version).into());
        }
        if (header.totalsize as usize) > data.len() {
            return Err(BlobError::BufferTooSmall {
                pos: header.totalsize as usize,
            }
            .into());
        }

        Ok(header)
    }

    /// Serializes the header fields in on-disk (big-endian) order.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let fields = [
            self.magic,
            self.totalsize,
            self.off_dt_struct,
            self.off_dt_strings,
            self.off_mem_rsvmap,
            self.version,
            self.last_comp_version,
            self.boot_cpuid_phys,
            self.size_dt_strings,
            self.size_dt_struct,
        ];
        for (i, field) in fields.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&field.to_be_bytes());
        }
        out
    }
}
