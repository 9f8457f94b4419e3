//! Error types shared by every layer of the engine.

use crate::predicate::Kind;

/// Failures in parsing the blob's header or binary envelope.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobError {
    /// The magic number at the start of the blob didn't match `0xd00dfeed`.
    #[error("invalid magic number {0:#x}")]
    InvalidMagic(u32),
    /// The slice is too small to hold the header, or `totalsize` exceeds it.
    #[error("buffer too small at or before position {pos}")]
    BufferTooSmall { pos: usize },
    /// `version` is below the minimum this engine understands (16).
    #[error("unsupported FDT version {0}")]
    UnsupportedVersion(u32),
    /// A string in the blob wasn't valid UTF-8.
    #[error("failed to parse UTF-8 string")]
    Utf8Parse,
    /// A nul-terminated string was expected but none was found.
    #[error("data does not contain a nul terminator")]
    FromBytesUntilNull,
}

/// Every fatal condition the engine can report.
///
/// All variants are immediate and fatal; the state machine never
/// attempts to recover and skip malformed tags. `NotFound`, the normal
/// completion signal, is deliberately not a member of this enum — it is
/// returned as `Ok(Outcome::NotFound)`, not as an error.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Header or binary-envelope sanity check failed.
    #[error("bad blob: {0}")]
    BadBlob(#[from] BlobError),
    /// The structure-block tag stream is internally inconsistent: a
    /// truncated tag, an `EndNode` with no matching `BeginNode`, or a
    /// final `next_offset` that doesn't match the declared struct size.
    #[error("bad structure at offset {at:#x}")]
    BadStructure { at: usize },
    /// The path buffer would have exceeded its fixed capacity.
    #[error("path buffer exhausted")]
    NoSpace,
    /// The ancestor stack would have exceeded its static depth bound.
    #[error("node nesting exceeds the supported depth")]
    TooDeep,
    /// The string-table offset precedes the struct region just written.
    #[error("string table offset precedes the struct region")]
    BadLayout,
    /// Filter construction declared both `Include` and `Exclude`
    /// polarity for the same match kind.
    #[error("filter set declares both inclusion and exclusion for {0:?}")]
    ConflictingFilter(Kind),
    /// `--invert` was combined with an `Exclude`-polarity rule.
    #[error("--invert cannot be combined with an exclusion rule")]
    InvertWithExclusion,
}

pub type Result<T> = core::result::Result<T, Error>;
