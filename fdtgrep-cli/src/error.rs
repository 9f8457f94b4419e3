//! Binary-local error wrapper: the engine's `Error` plus the I/O
//! failures that only exist once a file system is involved.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Engine(#[from] fdtgrep_core::Error),
    #[error("failed to read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write to stdout: {0}")]
    WriteStdout(#[source] std::io::Error),
}
