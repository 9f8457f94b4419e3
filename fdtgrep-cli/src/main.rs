//! `fdtgrep`: extract and reassemble fragments of a Flattened Device
//! Tree blob selected by node/property/compatible-string filters.

mod cli;
mod error;

use std::io::Write as _;
use std::process::ExitCode;

use clap::Parser;
use fdtgrep_core::pack::{pack_bin, pack_dtb};
use fdtgrep_core::render::{render_dts, RenderOptions};
use fdtgrep_core::{Blob, FilterSet, Flags, Outcome, Region, SelectionState};

use cli::{Args, OutputFormat};
use error::CliError;

/// Initial region-array capacity the driver allocates before its first
/// attempt; doubled and restarted from `first()` on overflow (spec.md
/// §4.4).
const INITIAL_CAPACITY: usize = 100;

fn main() -> ExitCode {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    }
    builder.init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let path = args.dtb_path();
    let bytes = std::fs::read(&path).map_err(|source| CliError::ReadInput {
        path: path.clone(),
        source,
    })?;
    let blob = Blob::from_bytes(&bytes)?;

    let predicate = args.build_filter_set()?;
    let flags = args.build_flags();
    let regions = select_regions(&blob, &predicate, flags)?;

    let text_output = if args.list_regions {
        Some(render_region_list(&regions))
    } else if matches!(args.format, OutputFormat::Dts) {
        let options = RenderOptions {
            addresses: args.addresses,
            offsets: args.offsets,
            diff: args.diff,
        };
        Some(render_dts(&blob, &regions, &options)?)
    } else {
        None
    };

    if let Some(text) = text_output {
        write_text(args, &text)
    } else {
        let bytes = if args.wants_dtb_packing() {
            pack_dtb(&blob, &regions)?
        } else {
            pack_bin(&blob, &regions)
        };
        write_bytes(args, &bytes)
    }
}

/// Drives `SelectionState::first`/`next` to completion with a
/// fixed-capacity buffer, doubling that capacity and restarting from
/// `first()` whenever a call makes no progress (the buffer was too
/// small for even one atomic step). This is the one place in the whole
/// pipeline allowed to grow a list; the engine itself stays
/// bounded-memory.
fn select_regions(
    blob: &Blob<'_>,
    predicate: &FilterSet,
    flags: Flags,
) -> Result<Vec<Region>, fdtgrep_core::Error> {
    let mut capacity = INITIAL_CAPACITY;

    loop {
        let mut buf = vec![Region::new(0, 1); capacity];
        let mut state = SelectionState::new(flags);
        let mut collected = Vec::new();
        let mut outcome = state.first(blob, predicate, &mut buf)?;
        let mut starved = false;

        loop {
            match outcome {
                Outcome::Regions(0) => {
                    starved = true;
                    break;
                }
                Outcome::Regions(n) => {
                    collected.extend_from_slice(&buf[..n]);
                    outcome = state.next(blob, predicate, &mut buf)?;
                }
                Outcome::NotFound => return Ok(collected),
            }
        }

        if starved {
            capacity *= 2;
            log::debug!("region buffer too small, retrying with capacity {capacity}");
            continue;
        }
    }
}

fn render_region_list(regions: &[Region]) -> String {
    let mut out = String::new();
    for region in regions {
        out.push_str(&format!("{:#010x} {:#x}\n", region.offset, region.size));
    }
    out
}

fn write_text(args: &Args, text: &str) -> Result<(), CliError> {
    match &args.output {
        Some(path) => std::fs::write(path, text).map_err(|source| CliError::WriteOutput {
            path: path.clone(),
            source,
        }),
        None => {
            print!("{text}");
            std::io::stdout().flush().map_err(CliError::WriteStdout)
        }
    }
}

fn write_bytes(args: &Args, bytes: &[u8]) -> Result<(), CliError> {
    match &args.output {
        Some(path) => std::fs::write(path, bytes).map_err(|source| CliError::WriteOutput {
            path: path.clone(),
            source,
        }),
        None => {
            std::io::stdout()
                .write_all(bytes)
                .map_err(CliError::WriteStdout)?;
            std::io::stdout().flush().map_err(CliError::WriteStdout)
        }
    }
}
