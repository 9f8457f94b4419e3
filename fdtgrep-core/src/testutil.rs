//! A minimal, hand-rolled DTB encoder for building synthetic test
//! fixtures, in the spirit of the encode path a full device-tree
//! editor needs: append a tag, align it, intern a string, done.
//!
//! This is not a general-purpose "flatten tree to blob" writer (that's
//! explicitly out of scope, per spec.md §1) — just enough to produce
//! well-formed inputs for the engine's own tests.

use crate::data::align4;
use crate::header::{Header, HEADER_SIZE};

pub struct BlobBuilder {
    struct_bytes: Vec<u8>,
    strings: Vec<u8>,
    string_offsets: std::collections::HashMap<String, usize>,
    mem_rsv: Vec<u8>,
    ended: bool,
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self {
            struct_bytes: Vec::new(),
            strings: Vec::new(),
            string_offsets: std::collections::HashMap::new(),
            mem_rsv: Vec::new(),
            ended: false,
        }
    }

    fn push_token(&mut self, value: u32) {
        self.struct_bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn mem_rsv(&mut self, address: u64, size: u64) -> &mut Self {
        self.mem_rsv.extend_from_slice(&address.to_be_bytes());
        self.mem_rsv.extend_from_slice(&size.to_be_bytes());
        self
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.push_token(0x1);
        self.struct_bytes.extend_from_slice(name.as_bytes());
        self.struct_bytes.push(0);
        let padded = align4(name.len() + 1);
        self.struct_bytes.resize(
            self.struct_bytes.len() + (padded - (name.len() + 1)),
            0,
        );
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.push_token(0x2);
        self
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&off) = self.string_offsets.get(name) {
            return off;
        }
        let off = self.strings.len();
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.string_offsets.insert(name.to_string(), off);
        off
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_offset = self.intern(name) as u32;
        self.push_token(0x3);
        self.push_token(value.len() as u32);
        self.push_token(name_offset);
        self.struct_bytes.extend_from_slice(value);
        let padded = align4(value.len());
        self.struct_bytes
            .resize(self.struct_bytes.len() + (padded - value.len()), 0);
        self
    }

    pub fn nop(&mut self) -> &mut Self {
        self.push_token(0x4);
        self
    }

    pub fn end(&mut self) -> &mut Self {
        self.push_token(0x9);
        self.ended = true;
        self
    }

    pub fn build(&mut self) -> Vec<u8> {
        if !self.ended {
            self.end();
        }
        self.mem_rsv.extend_from_slice(&0u64.to_be_bytes());
        self.mem_rsv.extend_from_slice(&0u64.to_be_bytes());

        let off_mem_rsvmap = HEADER_SIZE;
        let off_dt_struct = off_mem_rsvmap + self.mem_rsv.len();
        let off_dt_strings = off_dt_struct + self.struct_bytes.len();
        let totalsize = off_dt_strings + self.strings.len();

        let header = Header {
            magic: crate::header::FDT_MAGIC,
            totalsize: totalsize as u32,
            off_dt_struct: off_dt_struct as u32,
            off_dt_strings: off_dt_strings as u32,
            off_mem_rsvmap: off_mem_rsvmap as u32,
            version: 17,
            last_comp_version: 16,
            boot_cpuid_phys: 0,
            size_dt_strings: self.strings.len() as u32,
            size_dt_struct: self.struct_bytes.len() as u32,
        };

        let mut out = Vec::with_capacity(totalsize);
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&self.mem_rsv);
        out.extend_from_slice(&self.struct_bytes);
        out.extend_from_slice(&self.strings);
        out
    }
}

/// Builds a synthetic DTB blob using the closure-driven `BlobBuilder`
/// API; the closure need not call `end()` explicitly.
pub fn build_blob<F: FnOnce(&mut BlobBuilder)>(f: F) -> Vec<u8> {
    let mut builder = BlobBuilder::new();
    f(&mut builder);
    builder.build()
}
