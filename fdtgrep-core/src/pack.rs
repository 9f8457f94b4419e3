//! Binary packing of a selected region list: either a raw concatenation
//! of bytes (`bin` mode) or a full, valid FDT reconstruction (`dtb`
//! mode), per spec.md §6.

use crate::blob::Blob;
use crate::data::align4;
use crate::error::Error;
use crate::header::{Header, HEADER_SIZE};
use crate::region::Region;

/// Concatenates the bytes of `regions` verbatim, in order. Not
/// necessarily a valid FDT on its own — callers wanting a re-parseable
/// blob should use [`pack_dtb`] instead.
pub fn pack_bin(blob: &Blob<'_>, regions: &[Region]) -> Vec<u8> {
    let mut out = Vec::with_capacity(regions.iter().map(|r| r.size).sum());
    for region in regions {
        out.extend_from_slice(&blob.bytes()[region.offset..region.end()]);
    }
    out
}

/// Reconstructs a standalone, valid FDT from a region list that must
/// include exactly the memory-reservation map (leading), the structure
/// block's selected regions, and the string table (trailing) — i.e.
/// the caller selected with `AddMemRsvmap` and `AddStringTab` both set.
///
/// Splits `regions` back into "belongs to the struct block" versus the
/// mem-rsvmap/string-table regions by comparing offsets against the
/// source blob's own layout, then rewrites the header with recomputed
/// offsets: `off_mem_rsvmap` double-word aligned just past the header,
/// `off_dt_struct` following the reserve entries, `off_dt_strings`
/// following the struct bytes, `totalsize` the sum of all of it.
pub fn pack_dtb(blob: &Blob<'_>, regions: &[Region]) -> Result<Vec<u8>, Error> {
    let struct_start = blob.struct_offset();
    let struct_end = struct_start + blob.struct_size();
    let strings_start = blob.strings_offset();
    let strings_end = strings_start + blob.strings_size();
    let mem_rsvmap_start = blob.mem_rsvmap_offset();
    let mem_rsvmap_end = mem_rsvmap_start + blob.mem_rsvmap_size();

    let mut mem_rsvmap_bytes = Vec::new();
    let mut struct_bytes = Vec::new();
    let mut strings_bytes = Vec::new();

    for region in regions {
        if region.offset >= mem_rsvmap_start && region.end() <= mem_rsvmap_end {
            mem_rsvmap_bytes.extend_from_slice(&blob.bytes()[region.offset..region.end()]);
        } else if region.offset >= struct_start && region.end() <= struct_end {
            struct_bytes.extend_from_slice(&blob.bytes()[region.offset..region.end()]);
        } else if region.offset >= strings_start && region.end() <= strings_end {
            strings_bytes.extend_from_slice(&blob.bytes()[region.offset..region.end()]);
        } else {
            return Err(Error::BadLayout);
        }
    }

    if mem_rsvmap_bytes.is_empty() {
        mem_rsvmap_bytes.extend_from_slice(&0u64.to_be_bytes());
        mem_rsvmap_bytes.extend_from_slice(&0u64.to_be_bytes());
    }

    let off_mem_rsvmap = align4(HEADER_SIZE);
    let off_dt_struct = off_mem_rsvmap + mem_rsvmap_bytes.len();
    let off_dt_strings = off_dt_struct + struct_bytes.len();
    let totalsize = off_dt_strings + strings_bytes.len();

    let header = Header {
        magic: crate::header::FDT_MAGIC,
        totalsize: totalsize as u32,
        off_dt_struct: off_dt_struct as u32,
        off_dt_strings: off_dt_strings as u32,
        off_mem_rsvmap: off_mem_rsvmap as u32,
        version: 17,
        last_comp_version: 16,
        boot_cpuid_phys: blob.header().boot_cpuid_phys,
        size_dt_strings: strings_bytes.len() as u32,
        size_dt_struct: struct_bytes.len() as u32,
    };

    let mut out = Vec::with_capacity(totalsize);
    out.extend_from_slice(&header.to_bytes());
    out.resize(off_mem_rsvmap, 0);
    out.extend_from_slice(&mem_rsvmap_bytes);
    out.extend_from_slice(&struct_bytes);
    out.extend_from_slice(&strings_bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::build_blob;

    #[test]
    fn pack_bin_concatenates_regions_in_order() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let region = Region::new(blob.struct_offset(), blob.struct_size());
        let packed = pack_bin(&blob, &[region]);
        assert_eq!(packed, blob.struct_bytes());
    }

    #[test]
    fn pack_dtb_round_trips_select_everything() {
        let bytes = build_blob(|b| {
            b.mem_rsv(0x1000, 0x100);
            b.begin_node("");
            b.prop("compatible", b"vendor,board\0");
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let regions = [
            Region::new(blob.mem_rsvmap_offset(), blob.mem_rsvmap_size()),
            Region::new(blob.struct_offset(), blob.struct_size()),
            Region::new(blob.strings_offset(), blob.strings_size()),
        ];
        let packed = pack_dtb(&blob, &regions).unwrap();
        let repacked = Blob::from_bytes(&packed).unwrap();

        assert_eq!(repacked.struct_bytes(), blob.struct_bytes());
        assert_eq!(repacked.strings_bytes(), blob.strings_bytes());
        assert_eq!(
            repacked.memory_reservations().collect::<Vec<_>>(),
            blob.memory_reservations().collect::<Vec<_>>()
        );
    }

    #[test]
    fn pack_dtb_rejects_region_outside_known_sections() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let bogus = Region::new(0, HEADER_SIZE);
        let err = pack_dtb(&blob, &[bogus]).unwrap_err();
        assert_eq!(err, Error::BadLayout);
    }
}
