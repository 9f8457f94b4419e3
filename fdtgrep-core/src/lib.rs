//! Region-selection engine for extracting and reassembling fragments of
//! a Flattened Device Tree blob: parse a blob, decide which tags a set
//! of node/property/compatible filters select, and emit either the raw
//! byte regions, a repacked blob, or a DTS-like text rendering.
//!
//! The crate is `std`-free only in spirit, not in declaration: it
//! targets a hosted CLI (see the `fdtgrep-cli` binary), not an embedded
//! target, so it links the standard library. The traversal core
//! ([`select`]) still keeps its working state in fixed-capacity
//! `heapless` collections, since bounding memory to the ancestor-stack
//! depth is a property of the algorithm, not of a `no_std` target.

pub mod blob;
pub mod data;
pub mod error;
pub mod header;
pub mod pack;
pub mod predicate;
pub mod region;
pub mod render;
pub mod select;
pub mod value;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use blob::Blob;
pub use error::{BlobError, Error, Result};
pub use predicate::{Decision, FilterSet, Kind, Polarity, Rule};
pub use region::{Flags, Region, Want};
pub use select::{Outcome, SelectionState};
