//! Command-line surface: argument parsing and translation into the
//! library's `FilterSet`/`Flags`/`RenderOptions` triple. No `clap` type
//! is allowed to cross into `fdtgrep-core`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fdtgrep_core::{Error, FilterSet, Flags, Kind, Polarity, Rule};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Dts,
    Dtb,
    Bin,
}

/// Extracts and reassembles fragments of a Flattened Device Tree blob
/// by node, property and compatible-string filters.
#[derive(Parser, Debug)]
#[command(name = "fdtgrep", version, about)]
pub struct Args {
    /// Include by node path (repeatable).
    #[arg(short = 'n', long = "include-node", value_name = "PATH")]
    pub include_node: Vec<String>,
    /// Exclude by node path (repeatable).
    #[arg(short = 'N', long = "exclude-node", value_name = "PATH")]
    pub exclude_node: Vec<String>,
    /// Include by property name (repeatable).
    #[arg(short = 'p', long = "include-prop", value_name = "NAME")]
    pub include_prop: Vec<String>,
    /// Exclude by property name (repeatable).
    #[arg(short = 'P', long = "exclude-prop", value_name = "NAME")]
    pub exclude_prop: Vec<String>,
    /// Include by compatible string (repeatable).
    #[arg(short = 'c', long = "include-compat", value_name = "STR")]
    pub include_compat: Vec<String>,
    /// Exclude by compatible string (repeatable).
    #[arg(short = 'C', long = "exclude-compat", value_name = "STR")]
    pub exclude_compat: Vec<String>,
    /// Include by any kind (repeatable).
    #[arg(short = 'g', long = "include-any", value_name = "STR")]
    pub include_any: Vec<String>,
    /// Exclude by any kind (repeatable).
    #[arg(short = 'G', long = "exclude-any", value_name = "STR")]
    pub exclude_any: Vec<String>,
    /// Invert predicate polarity.
    #[arg(short = 'v', long = "invert")]
    pub invert: bool,
    /// Include direct subnodes (open/close only, no properties).
    #[arg(short = 'e', long = "direct-subnodes")]
    pub direct_subnodes: bool,
    /// Include the entire subtree, with properties.
    #[arg(short = 's', long = "all-subnodes")]
    pub all_subnodes: bool,
    /// Suppress supernode back-fill (on by default).
    #[arg(short = 'S', long = "no-supernodes")]
    pub no_supernodes: bool,
    /// Include the memory reservation map region.
    #[arg(short = 'm', long = "mem-rsvmap")]
    pub mem_rsvmap: bool,
    /// Include the string table region.
    #[arg(short = 't', long = "string-table")]
    pub string_table: bool,
    /// Emit/recompute an FDT header (implies `dtb` packing).
    #[arg(short = 'H', long = "header")]
    pub header: bool,
    /// Output format.
    #[arg(short = 'O', long = "format", value_enum, default_value_t = OutputFormat::Dts)]
    pub format: OutputFormat,
    /// Output path (default stdout).
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Show an address column in `dts` mode.
    #[arg(short = 'a', long = "addresses")]
    pub addresses: bool,
    /// Show a file-offset column in `dts` mode.
    #[arg(short = 'f', long = "offsets")]
    pub offsets: bool,
    /// Show +/- inclusion markers in `dts` mode.
    #[arg(short = 'd', long = "diff")]
    pub diff: bool,
    /// Print the region list instead of content.
    #[arg(short = 'l', long = "list-regions")]
    pub list_regions: bool,
    /// Suppress log output below `error` level.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
    /// Bare filter literals (same as `--include-any`), followed by the
    /// mandatory DTB file path as the final positional argument.
    #[arg(value_name = "FILTER-OR-DTB-FILE", required = true, num_args = 1..)]
    pub positional: Vec<String>,
}

impl Args {
    /// The final positional argument is always the input blob path; any
    /// before it are bare filter literals.
    pub fn dtb_path(&self) -> PathBuf {
        PathBuf::from(self.positional.last().expect("clap requires at least one positional"))
    }

    pub fn bare_filters(&self) -> &[String] {
        &self.positional[..self.positional.len() - 1]
    }

    pub fn build_filter_set(&self) -> Result<FilterSet, Error> {
        let mut rules = Vec::new();
        for p in &self.include_node {
            rules.push(Rule::new(Kind::Node, Polarity::Include, p.clone()));
        }
        for p in &self.exclude_node {
            rules.push(Rule::new(Kind::Node, Polarity::Exclude, p.clone()));
        }
        for p in &self.include_prop {
            rules.push(Rule::new(Kind::Prop, Polarity::Include, p.clone()));
        }
        for p in &self.exclude_prop {
            rules.push(Rule::new(Kind::Prop, Polarity::Exclude, p.clone()));
        }
        for p in &self.include_compat {
            rules.push(Rule::new(Kind::Compat, Polarity::Include, p.clone()));
        }
        for p in &self.exclude_compat {
            rules.push(Rule::new(Kind::Compat, Polarity::Exclude, p.clone()));
        }
        for p in &self.include_any {
            rules.push(Rule::new(Kind::Any, Polarity::Include, p.clone()));
        }
        for p in &self.exclude_any {
            rules.push(Rule::new(Kind::Any, Polarity::Exclude, p.clone()));
        }
        for literal in self.bare_filters() {
            rules.push(Rule::new(Kind::Any, Polarity::Include, literal.clone()));
        }
        FilterSet::new(rules, self.invert)
    }

    /// Whether the output packer must emit a full FDT header, which in
    /// turn forces `AddMemRsvmap`/`AddStringTab` on regardless of
    /// whether the user also passed `-m`/`-t` explicitly.
    pub fn wants_dtb_packing(&self) -> bool {
        self.header || matches!(self.format, OutputFormat::Dtb)
    }

    pub fn build_flags(&self) -> Flags {
        let force = self.wants_dtb_packing();
        Flags {
            supernodes: !self.no_supernodes,
            direct_subnodes: self.direct_subnodes,
            all_subnodes: self.all_subnodes,
            add_string_tab: self.string_table || force,
            add_mem_rsvmap: self.mem_rsvmap || force,
        }
    }
}
