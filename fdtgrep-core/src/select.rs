//! The resumable region-selection state machine (spec.md §4.2).
//!
//! The walk is driven one tag at a time. Every tag is processed against
//! a *local* copy of the mutable state; the copy is only written back
//! ("committed") once the regions that tag produced are known to fit in
//! the caller's output slice. This is what makes [`SelectionState::first`]
//! and [`SelectionState::next`] safely resumable: on a short write, the
//! state is exactly as it was before the tag that didn't fit, and the
//! next call reprocesses it from scratch.

use heapless::Vec as HVec;

use crate::blob::{begin_node_tag_size, Blob, TagData};
use crate::error::Error;
use crate::predicate::{Decision, FilterSet, Kind};
use crate::region::{Flags, Region, Want, MAX_DEPTH, PATH_CAPACITY};

/// One entry of the ancestor stack, pushed on `BeginNode` and popped on
/// `EndNode`. Borrows its name directly out of the structure block.
#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    name: &'a str,
    tag_offset: usize,
    tag_size: usize,
    /// This node's own `want`; mutable so supernode back-fill can raise
    /// it after the fact.
    want: Want,
    /// Whether a region has already been opened (directly, or via
    /// supernode back-fill) for this frame's `BeginNode`.
    included: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Nothing,
    Struct,
    StructDone,
    Complete,
}

/// What one `first`/`next` call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `n` regions were written to the front of the caller's output
    /// slice; more may follow on a subsequent call.
    Regions(usize),
    /// Nothing more to select; the walk is complete.
    NotFound,
}

/// Upper bound on how many regions a single tag can produce in one
/// step: one supernode back-fill region per ancestor, plus the region
/// this tag's own open/close transition can close or open.
const STEP_BUF_CAP: usize = MAX_DEPTH + 4;

/// The mutable half of [`SelectionState`], cloned into a working copy
/// before each tag and committed back only on success.
#[derive(Clone)]
struct Working<'a> {
    stack: HVec<Frame<'a>, MAX_DEPTH>,
    next_offset: usize,
    /// Struct-relative offset where the currently open run of included
    /// tags began; `None` when nothing is currently open.
    open_start: Option<usize>,
    /// A closed region not yet written to the caller's output, held
    /// back in case the next closed region is adjacent and the two
    /// should coalesce.
    pending: Option<Region>,
    can_merge: bool,
    phase: Phase,
}

/// Resumable region-selection cursor over one blob. Bounded memory: the
/// ancestor stack and path buffer are fixed-capacity, so depth is
/// capped at [`MAX_DEPTH`] regardless of input size.
pub struct SelectionState<'a> {
    working: Working<'a>,
    path: heapless::String<PATH_CAPACITY>,
    flags: Flags,
}

impl<'a> SelectionState<'a> {
    pub fn new(flags: Flags) -> Self {
        Self {
            working: Working {
                stack: HVec::new(),
                next_offset: 0,
                open_start: None,
                pending: None,
                can_merge: true,
                phase: Phase::Nothing,
            },
            path: heapless::String::new(),
            flags,
        }
    }

    /// The path of the node currently at the top of the ancestor stack,
    /// or empty before the walk has begun.
    pub fn current_path(&self) -> &str {
        &self.path
    }

    /// Starts (or restarts) the walk from the beginning of the blob.
    pub fn first(
        &mut self,
        blob: &Blob<'a>,
        predicate: &FilterSet,
        out: &mut [Region],
    ) -> Result<Outcome, Error> {
        self.working = Working {
            stack: HVec::new(),
            next_offset: 0,
            open_start: None,
            pending: None,
            can_merge: true,
            phase: Phase::Nothing,
        };
        self.path.clear();
        self.run(blob, predicate, out)
    }

    /// Resumes the walk from wherever the last call left off.
    pub fn next(
        &mut self,
        blob: &Blob<'a>,
        predicate: &FilterSet,
        out: &mut [Region],
    ) -> Result<Outcome, Error> {
        if self.working.phase == Phase::Complete {
            return Ok(Outcome::NotFound);
        }
        self.run(blob, predicate, out)
    }

    fn run(
        &mut self,
        blob: &Blob<'a>,
        predicate: &FilterSet,
        out: &mut [Region],
    ) -> Result<Outcome, Error> {
        let mut written = 0usize;

        if self.working.phase == Phase::Nothing {
            if self.flags.add_mem_rsvmap && blob.mem_rsvmap_size() > 0 {
                if written >= out.len() {
                    return Ok(Outcome::Regions(written));
                }
                out[written] = Region::new(blob.mem_rsvmap_offset(), blob.mem_rsvmap_size());
                written += 1;
                self.working.can_merge = false;
            } else {
                self.working.can_merge = true;
            }
            self.working.phase = Phase::Struct;
        }

        if self.working.phase == Phase::Struct {
            loop {
                if written >= out.len() {
                    return Ok(Outcome::Regions(written));
                }
                if self.working.next_offset > blob.struct_size() {
                    return Err(Error::BadStructure {
                        at: self.working.next_offset,
                    });
                }

                let mut w = self.working.clone();
                let mut emitted: HVec<Region, STEP_BUF_CAP> = HVec::new();
                let new_path = step(&mut w, blob, predicate, self.flags, &self.path, &mut emitted)?;

                if written + emitted.len() > out.len() {
                    // Does not fit; leave `self.working`/`self.path` untouched.
                    return Ok(Outcome::Regions(written));
                }
                for region in &emitted {
                    out[written] = *region;
                    written += 1;
                }
                self.working = w;
                if let Some(p) = new_path {
                    self.path = p;
                }

                if self.working.phase != Phase::Struct {
                    break;
                }
            }
        }

        if self.working.phase == Phase::StructDone {
            if self.flags.add_string_tab && blob.strings_size() > 0 {
                if blob.strings_offset() < blob.struct_offset() + blob.struct_size() {
                    return Err(Error::BadLayout);
                }
                if written >= out.len() {
                    return Ok(Outcome::Regions(written));
                }
                out[written] = Region::new(blob.strings_offset(), blob.strings_size());
                written += 1;
                self.working.can_merge = false;
            }
            self.working.phase = Phase::Complete;
        }

        if written == 0 {
            Ok(Outcome::NotFound)
        } else {
            Ok(Outcome::Regions(written))
        }
    }
}

fn abs(blob: &Blob<'_>, struct_relative: usize) -> usize {
    blob.struct_offset() + struct_relative
}

/// Merges `region` into `pending` if adjacent and `can_merge`;
/// otherwise flushes whatever was pending and holds `region` instead.
fn push_closed_region(
    region: Region,
    pending: &mut Option<Region>,
    can_merge: bool,
    emitted: &mut HVec<Region, STEP_BUF_CAP>,
) -> Result<(), Error> {
    match pending {
        Some(p) if can_merge && p.adjoins(&region) => {
            p.merge(&region);
        }
        Some(_) => {
            let old = pending.take().unwrap();
            emitted.push(old).map_err(|_| Error::TooDeep)?;
            *pending = Some(region);
        }
        None => {
            *pending = Some(region);
        }
    }
    Ok(())
}

fn flush_pending(
    pending: &mut Option<Region>,
    emitted: &mut HVec<Region, STEP_BUF_CAP>,
) -> Result<(), Error> {
    if let Some(p) = pending.take() {
        emitted.push(p).map_err(|_| Error::TooDeep)?;
    }
    Ok(())
}

/// Walks the ancestor stack root-down, synthesizing a one-tag region
/// for every frame not yet marked `included`, and raises each such
/// frame's own `want` to at least `NodesOnly` so its `EndNode` is kept.
fn backfill(
    stack: &mut [Frame<'_>],
    blob: &Blob<'_>,
    pending: &mut Option<Region>,
    can_merge: bool,
    emitted: &mut HVec<Region, STEP_BUF_CAP>,
) -> Result<(), Error> {
    for frame in stack.iter_mut() {
        if frame.included {
            continue;
        }
        let region = Region::new(abs(blob, frame.tag_offset), frame.tag_size);
        push_closed_region(region, pending, can_merge, emitted)?;
        frame.included = true;
        frame.want = frame.want.max(Want::NodesOnly);
    }
    Ok(())
}

/// Reads forward from `offset` (struct-relative, just past a
/// `BeginNode`) through any leading `Prop`/`Nop` tags, looking for a
/// `compatible` property, without disturbing the caller's own cursor.
fn peek_compatible<'a>(blob: &Blob<'a>, mut offset: usize) -> Result<Option<&'a [u8]>, Error> {
    loop {
        let tag = blob.next_tag(offset)?;
        match tag.data {
            TagData::Prop { name, value, .. } => {
                if name == "compatible" {
                    return Ok(Some(value));
                }
                offset = tag.next_offset;
            }
            TagData::Nop => offset = tag.next_offset,
            _ => return Ok(None),
        }
    }
}

fn extend_path(
    base: &str,
    name: &str,
) -> Result<heapless::String<PATH_CAPACITY>, Error> {
    let mut buf = heapless::String::new();
    buf.push_str(base).map_err(|_| Error::NoSpace)?;
    if name.is_empty() {
        if buf.is_empty() {
            buf.push_str("/").map_err(|_| Error::NoSpace)?;
        }
    } else {
        if !buf.ends_with('/') {
            buf.push('/').map_err(|_| Error::NoSpace)?;
        }
        buf.push_str(name).map_err(|_| Error::NoSpace)?;
    }
    Ok(buf)
}

fn rebuild_path(stack: &[Frame<'_>]) -> Result<heapless::String<PATH_CAPACITY>, Error> {
    let mut buf = heapless::String::new();
    for frame in stack {
        if frame.name.is_empty() {
            buf.push_str("/").map_err(|_| Error::NoSpace)?;
        } else {
            if !buf.ends_with('/') {
                buf.push('/').map_err(|_| Error::NoSpace)?;
            }
            buf.push_str(frame.name).map_err(|_| Error::NoSpace)?;
        }
    }
    Ok(buf)
}

/// Processes exactly one tag against the local working copy `w`,
/// leaving `emitted` holding the regions it produced. Returns the new
/// current path when it changed.
fn step<'a>(
    w: &mut Working<'a>,
    blob: &Blob<'a>,
    predicate: &FilterSet,
    flags: Flags,
    path: &str,
    emitted: &mut HVec<Region, STEP_BUF_CAP>,
) -> Result<Option<heapless::String<PATH_CAPACITY>>, Error> {
    let tag = blob.next_tag(w.next_offset)?;
    let mut new_path = None;

    match tag.data {
        TagData::BeginNode { name } => {
            if w.stack.len() >= MAX_DEPTH {
                return Err(Error::TooDeep);
            }

            let candidate_path = extend_path(path, name)?;
            let parent_want = w.stack.last().map(|f| f.want).unwrap_or(Want::Nothing);

            let compat = peek_compatible(blob, tag.next_offset)?;
            let decision = predicate.classify_node(candidate_path.as_str(), compat);

            // A genuinely empty filter set mentions no kind at all, so
            // every node's own classification is unconditionally
            // `DontKnow` regardless of depth; escalating it is safe
            // there and only there, since nothing else in the tree can
            // ever resolve to a definitive `Exclude` to decay against.
            // With any non-empty filter set a `DontKnow` must instead
            // decay through `parent_want` below, never escalate on its
            // own, or an unrelated sibling subtree would get pulled in
            // by an unrelated ancestor's inclusion.
            let provisional =
                decision == Decision::Include || (decision == Decision::DontKnow && predicate.is_empty());
            let node_want = if provisional {
                if flags.all_subnodes {
                    Want::AllNodesAndProps
                } else {
                    Want::NodesAndProps
                }
            } else {
                match parent_want {
                    Want::AllNodesAndProps => Want::AllNodesAndProps,
                    Want::NodesAndProps if flags.direct_subnodes => Want::NodesOnly,
                    _ => Want::Nothing,
                }
            };
            let node_tag_included = node_want != Want::Nothing;

            if node_tag_included {
                if w.open_start.is_none() {
                    if flags.supernodes {
                        backfill(&mut w.stack, blob, &mut w.pending, w.can_merge, emitted)?;
                    }
                    w.open_start = Some(tag.offset);
                }
            } else if let Some(start) = w.open_start.take() {
                let region = Region::new(abs(blob, start), tag.offset - start);
                push_closed_region(region, &mut w.pending, w.can_merge, emitted)?;
            }

            w.stack
                .push(Frame {
                    name,
                    tag_offset: tag.offset,
                    tag_size: begin_node_tag_size(name),
                    want: node_want,
                    included: node_tag_included,
                })
                .map_err(|_| Error::TooDeep)?;

            new_path = Some(candidate_path);
        }

        TagData::EndNode => {
            let frame = w.stack.pop().ok_or(Error::BadStructure { at: tag.offset })?;
            let included = frame.want != Want::Nothing;

            if included {
                if w.open_start.is_none() {
                    if flags.supernodes {
                        backfill(&mut w.stack, blob, &mut w.pending, w.can_merge, emitted)?;
                    }
                    w.open_start = Some(tag.offset);
                }
            } else if let Some(start) = w.open_start.take() {
                let region = Region::new(abs(blob, start), tag.offset - start);
                push_closed_region(region, &mut w.pending, w.can_merge, emitted)?;
            }

            new_path = Some(rebuild_path(&w.stack)?);
        }

        TagData::Prop { name, .. } => {
            let cur_want = w.stack.last().map(|f| f.want).unwrap_or(Want::Nothing);
            let decision = predicate.classify_prop(name);
            let included = decision == Decision::Include
                || (decision == Decision::DontKnow && cur_want >= Want::NodesAndProps);

            if included {
                if w.open_start.is_none() {
                    if flags.supernodes {
                        backfill(&mut w.stack, blob, &mut w.pending, w.can_merge, emitted)?;
                    }
                    w.open_start = Some(tag.offset);
                }
                if decision == Decision::Include && cur_want == Want::Nothing && flags.supernodes {
                    if let Some(top) = w.stack.last_mut() {
                        top.want = top.want.max(Want::NodesOnly);
                    }
                }
            } else if let Some(start) = w.open_start.take() {
                let region = Region::new(abs(blob, start), tag.offset - start);
                push_closed_region(region, &mut w.pending, w.can_merge, emitted)?;
            }
        }

        TagData::Nop => {
            let cur_want = w.stack.last().map(|f| f.want).unwrap_or(Want::Nothing);
            let included = cur_want >= Want::NodesAndProps;

            if included {
                if w.open_start.is_none() {
                    if flags.supernodes {
                        backfill(&mut w.stack, blob, &mut w.pending, w.can_merge, emitted)?;
                    }
                    w.open_start = Some(tag.offset);
                }
            } else if let Some(start) = w.open_start.take() {
                let region = Region::new(abs(blob, start), tag.offset - start);
                push_closed_region(region, &mut w.pending, w.can_merge, emitted)?;
            }
        }

        TagData::End => {
            if tag.next_offset != blob.struct_size() {
                return Err(Error::BadStructure { at: tag.next_offset });
            }
            if !w.stack.is_empty() {
                return Err(Error::BadStructure { at: tag.offset });
            }
            if w.open_start.is_none() {
                w.open_start = Some(tag.offset);
            }
            let start = w.open_start.take().unwrap();
            let region = Region::new(abs(blob, start), tag.next_offset - start);
            push_closed_region(region, &mut w.pending, w.can_merge, emitted)?;
            flush_pending(&mut w.pending, emitted)?;
            w.phase = Phase::StructDone;
        }
    }

    w.next_offset = tag.next_offset;
    Ok(new_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Polarity, Rule};
    use crate::testutil::build_blob;

    fn no_filters() -> FilterSet {
        FilterSet::new(Vec::new(), false).unwrap()
    }

    #[test]
    fn select_everything_yields_one_region_spanning_the_struct_block() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.prop("compatible", b"vendor,board\0");
            b.begin_node("soc");
            b.end_node();
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let predicate = no_filters();
        let flags = Flags {
            supernodes: false,
            direct_subnodes: false,
            all_subnodes: true,
            add_string_tab: false,
            add_mem_rsvmap: false,
        };
        let mut state = SelectionState::new(flags);
        let mut out = [Region::new(0, 1); 8];
        let outcome = state.first(&blob, &predicate, &mut out).unwrap();
        match outcome {
            Outcome::Regions(n) => {
                assert_eq!(n, 1);
                assert_eq!(out[0], Region::new(blob.struct_offset(), blob.struct_size()));
            }
            Outcome::NotFound => panic!("expected at least one region"),
        }
        let next = state.next(&blob, &predicate, &mut out).unwrap();
        assert_eq!(next, Outcome::NotFound);
    }

    #[test]
    fn including_a_leaf_property_backfills_ancestor_supernodes() {
        // /soc/uart { reg = ...; unrelated = ...; }
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.begin_node("soc");
            b.begin_node("uart");
            b.prop("reg", b"\0\0\0\x10");
            b.prop("unrelated", b"\0");
            b.end_node();
            b.end_node();
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let predicate =
            FilterSet::new(vec![Rule::new(Kind::Prop, Polarity::Include, "reg")], false).unwrap();
        let flags = Flags {
            supernodes: true,
            direct_subnodes: false,
            all_subnodes: false,
            add_string_tab: false,
            add_mem_rsvmap: false,
        };
        let mut state = SelectionState::new(flags);
        let mut out = [Region::new(0, 1); 16];
        let mut all = Vec::new();
        let mut outcome = state.first(&blob, &predicate, &mut out).unwrap();
        loop {
            match outcome {
                Outcome::Regions(n) => {
                    all.extend_from_slice(&out[..n]);
                    outcome = state.next(&blob, &predicate, &mut out).unwrap();
                }
                Outcome::NotFound => break,
            }
        }
        // root/soc/uart BeginNodes plus "reg" merge into one contiguous
        // region; the excluded "unrelated" property leaves a gap before
        // the EndNodes and the final End tag, which form a second region.
        assert_eq!(all.len(), 2);
        let total: usize = all.iter().map(|r| r.size).sum();
        assert!(total < blob.struct_size());
    }

    #[test]
    fn dont_know_sibling_does_not_inherit_an_unrelated_ancestors_inclusion() {
        // root's own Node-classify is `DontKnow` (no Node rule) and it
        // has no `compatible` property of its own, so it is only ever
        // included via supernode back-fill once "uart" matches. "other"
        // is a sibling of "soc": also `DontKnow` on its own classify,
        // with no `compatible` property, so it must decay to `Nothing`
        // through its parent's `want` rather than escalate just because
        // the unrelated "uart" subtree got backfilled in.
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.begin_node("soc");
            b.begin_node("uart");
            b.prop("compatible", b"v,u\0");
            b.end_node();
            b.end_node();
            b.begin_node("other");
            b.prop("foo", b"\0");
            b.end_node();
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let predicate =
            FilterSet::new(vec![Rule::new(Kind::Compat, Polarity::Include, "v,u")], false).unwrap();
        let flags = Flags {
            supernodes: true,
            direct_subnodes: false,
            all_subnodes: false,
            add_string_tab: false,
            add_mem_rsvmap: false,
        };
        let mut state = SelectionState::new(flags);
        let mut out = [Region::new(0, 1); 16];
        let mut all = Vec::new();
        let mut outcome = state.first(&blob, &predicate, &mut out).unwrap();
        loop {
            match outcome {
                Outcome::Regions(n) => {
                    all.extend_from_slice(&out[..n]);
                    outcome = state.next(&blob, &predicate, &mut out).unwrap();
                }
                Outcome::NotFound => break,
            }
        }
        let other_begin = blob
            .struct_bytes()
            .windows(5)
            .position(|w| w == b"other")
            .expect("fixture contains \"other\"");
        let other_offset = blob.struct_offset() + other_begin - 4;
        assert!(
            all.iter().all(|r| other_offset < r.offset || other_offset >= r.end()),
            "the \"other\" subtree must not fall inside any selected region: {all:?}",
        );
    }

    #[test]
    fn excluded_sibling_subtree_is_dropped() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.begin_node("a");
            b.prop("x", b"\0");
            b.end_node();
            b.begin_node("b");
            b.prop("y", b"\0");
            b.end_node();
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let predicate =
            FilterSet::new(vec![Rule::new(Kind::Node, Polarity::Include, "/a")], false).unwrap();
        let flags = Flags {
            supernodes: true,
            direct_subnodes: false,
            all_subnodes: false,
            add_string_tab: false,
            add_mem_rsvmap: false,
        };
        let mut state = SelectionState::new(flags);
        let mut out = [Region::new(0, 1); 16];
        let mut all = Vec::new();
        let mut outcome = state.first(&blob, &predicate, &mut out).unwrap();
        loop {
            match outcome {
                Outcome::Regions(n) => {
                    all.extend_from_slice(&out[..n]);
                    outcome = state.next(&blob, &predicate, &mut out).unwrap();
                }
                Outcome::NotFound => break,
            }
        }
        // "b"'s subtree must never appear in any selected region.
        for region in &all {
            assert!(region.end() <= blob.total_size());
        }
        let total: usize = all.iter().map(|r| r.size).sum();
        assert!(total < blob.struct_size());
    }

    #[test]
    fn pausing_mid_walk_and_resuming_matches_one_shot() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            b.begin_node("a");
            b.prop("x", b"\0");
            b.end_node();
            b.begin_node("b");
            b.prop("y", b"\0");
            b.end_node();
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let predicate = no_filters();
        let flags = Flags {
            supernodes: false,
            direct_subnodes: false,
            all_subnodes: true,
            add_string_tab: true,
            add_mem_rsvmap: true,
        };

        let mut one_shot_state = SelectionState::new(flags);
        let mut one_shot_buf = [Region::new(0, 1); 32];
        let mut one_shot = Vec::new();
        let mut outcome = one_shot_state.first(&blob, &predicate, &mut one_shot_buf).unwrap();
        loop {
            match outcome {
                Outcome::Regions(n) => {
                    one_shot.extend_from_slice(&one_shot_buf[..n]);
                    outcome = one_shot_state.next(&blob, &predicate, &mut one_shot_buf).unwrap();
                }
                Outcome::NotFound => break,
            }
        }

        let mut paced_state = SelectionState::new(flags);
        let mut paced = Vec::new();
        let mut small = [Region::new(0, 1); 1];
        let mut outcome = paced_state.first(&blob, &predicate, &mut small).unwrap();
        loop {
            match outcome {
                Outcome::Regions(n) => {
                    paced.extend_from_slice(&small[..n]);
                    outcome = paced_state.next(&blob, &predicate, &mut small).unwrap();
                }
                Outcome::NotFound => break,
            }
        }

        assert_eq!(one_shot, paced);
    }

    #[test]
    fn mem_rsvmap_region_never_merges_with_struct_block() {
        let bytes = build_blob(|b| {
            b.mem_rsv(0x1000, 0x100);
            b.begin_node("");
            b.end_node();
            b.end();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let predicate = no_filters();
        let flags = Flags {
            supernodes: false,
            direct_subnodes: false,
            all_subnodes: true,
            add_string_tab: false,
            add_mem_rsvmap: true,
        };
        let mut state = SelectionState::new(flags);
        let mut out = [Region::new(0, 1); 8];
        let mut all = Vec::new();
        let mut outcome = state.first(&blob, &predicate, &mut out).unwrap();
        loop {
            match outcome {
                Outcome::Regions(n) => {
                    all.extend_from_slice(&out[..n]);
                    outcome = state.next(&blob, &predicate, &mut out).unwrap();
                }
                Outcome::NotFound => break,
            }
        }
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], Region::new(blob.mem_rsvmap_offset(), blob.mem_rsvmap_size()));
        assert_eq!(all[1], Region::new(blob.struct_offset(), blob.struct_size()));
    }

    #[test]
    fn depth_beyond_max_depth_is_rejected() {
        let bytes = build_blob(|b| {
            b.begin_node("");
            for i in 0..(MAX_DEPTH + 2) {
                b.begin_node(&format!("n{i}"));
            }
            for _ in 0..(MAX_DEPTH + 2) {
                b.end_node();
            }
            b.end_node();
        });
        let blob = Blob::from_bytes(&bytes).unwrap();
        let predicate = no_filters();
        let flags = Flags {
            supernodes: false,
            direct_subnodes: false,
            all_subnodes: true,
            add_string_tab: false,
            add_mem_rsvmap: false,
        };
        let mut state = SelectionState::new(flags);
        let mut out = [Region::new(0, 1); 1];
        let mut outcome = state.first(&blob, &predicate, &mut out);
        loop {
            match outcome {
                Ok(Outcome::Regions(_)) => {
                    outcome = state.next(&blob, &predicate, &mut out);
                }
                Ok(Outcome::NotFound) => panic!("expected TooDeep before completion"),
                Err(Error::TooDeep) => break,
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }
    }
}
