//! Re-walks the structure block, keyed off a sorted, disjoint region
//! list, and renders the tags that fall inside a region as DTS text
//! (spec.md §4.3).

use std::fmt::Write as _;

use crate::blob::{Blob, TagData};
use crate::error::Error;
use crate::region::Region;
use crate::value::format_property_value;

/// Adornments toggled independently of the region selection itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Show a struct-block-relative address column.
    pub addresses: bool,
    /// Show an absolute file-offset column.
    pub offsets: bool,
    /// Show `+`/`-` inclusion markers and print excluded tags too.
    pub diff: bool,
}

/// Walks every tag of `blob`'s structure block and renders the ones
/// whose offset falls inside `regions` (which must be sorted and
/// disjoint, as the selection state machine guarantees) as DTS text.
pub fn render_dts(blob: &Blob<'_>, regions: &[Region], options: &RenderOptions) -> Result<String, Error> {
    let mut out = String::new();
    let mut cursor = RegionCursor::new(regions);
    let mut depth = 0usize;
    let mut offset = 0usize;

    loop {
        let tag = blob.next_tag(offset)?;
        let abs = blob.struct_offset() + tag.offset;
        let included = cursor.advance_to(abs);

        match tag.data {
            TagData::EndNode => {
                depth = depth.saturating_sub(1);
                if included || options.diff {
                    emit_line(&mut out, options, abs, included, depth, "};".to_string());
                }
            }
            TagData::BeginNode { name } => {
                let label = if name.is_empty() { "/" } else { name };
                if included || options.diff {
                    emit_line(&mut out, options, abs, included, depth, format!("{label} {{"));
                }
                depth += 1;
            }
            TagData::Prop { name, value, .. } => {
                if included || options.diff {
                    let line = match format_property_value(value) {
                        Some(v) => format!("{name} = {v};"),
                        None => format!("{name};"),
                    };
                    emit_line(&mut out, options, abs, included, depth, line);
                }
            }
            TagData::Nop => {
                if included || options.diff {
                    emit_line(&mut out, options, abs, included, depth, "// [NOP]".to_string());
                }
            }
            TagData::End => break,
        }

        offset = tag.next_offset;
    }

    Ok(out)
}

fn emit_line(
    out: &mut String,
    options: &RenderOptions,
    abs_offset: usize,
    included: bool,
    depth: usize,
    body: String,
) {
    if options.diff {
        out.push(if included { '+' } else { '-' });
    }
    if options.addresses {
        let _ = write!(out, "{abs_offset:08x}: ");
    }
    if options.offsets {
        let _ = write!(out, "[{abs_offset:#x}] ");
    }
    for _ in 0..depth {
        out.push_str("    ");
    }
    out.push_str(&body);
    out.push('\n');
}

/// Tracks progress through a sorted, disjoint region list as tag
/// offsets monotonically increase.
struct RegionCursor<'a> {
    regions: &'a [Region],
    index: usize,
}

impl<'a> RegionCursor<'a> {
    fn new(regions: &'a [Region]) -> Self {
        Self { regions, index: 0 }
    }

    /// Advances past any regions that have ended before `offset`, and
    /// reports whether `offset` falls inside the (now current) region.
    fn advance_to(&mut self, offset: usize) -> bool {
        while self.index < self.regions.len() && offset >= self.regions[self.index].end() {
            self.index += 1;
        }
        self.index < self.regions.len()
            && offset >= self.regions[self.index].offset
            && offset < self.regions[self.index].end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::build_blob;

    #[test]
    fn renders_selected_leaf_with_supernodes() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.begin_node("a");
            b.prop("b", &1u32.to_be_bytes());
            b.prop("c", &2u32.to_be_bytes());
            b.end_node();
            b.begin_node("d");
            b.end_node();
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();

        // Hand-built region list covering only "/"'s BeginNode, "a"'s
        // BeginNode and its "b" property — enough to check that "c" and
        // "d" are left out regardless of what the state machine would
        // add beyond this point.
        let root_begin = Region::new(blob.struct_offset(), 8);
        let a_through_b_and_end = Region::new(blob.struct_offset() + 8, 8 + 12 + 4);
        let regions = [root_begin, a_through_b_and_end];

        let options = RenderOptions::default();
        let dts = render_dts(&blob, &regions, &options).unwrap();
        assert!(dts.contains("/ {"));
        assert!(dts.contains("a {"));
        assert!(dts.contains("b = <0x1>;"));
        assert!(!dts.contains("c = "));
        assert!(!dts.contains("d {"));
    }

    #[test]
    fn empty_root_name_renders_as_slash() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let region = Region::new(blob.struct_offset(), blob.struct_size());
        let dts = render_dts(&blob, &[region], &RenderOptions::default()).unwrap();
        assert!(dts.starts_with("/ {"));
    }

    #[test]
    fn diff_mode_marks_excluded_lines() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.prop("x", b"");
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let region = Region::new(blob.struct_offset(), 8); // just the root BeginNode
        let options = RenderOptions { diff: true, ..Default::default() };
        let dts = render_dts(&blob, &[region], &options).unwrap();
        assert!(dts.lines().any(|l| l.starts_with('+') && l.contains("/ {")));
        assert!(dts.lines().any(|l| l.starts_with('-') && l.contains("x;")));
    }
}
