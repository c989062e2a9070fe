//! Shared CLI definitions for jsonquery.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{Arg, CommandFactory, Parser, ValueEnum};
use std::fmt::Write;
use std::path::Path;

/// Decompression applied while reading a data file
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// gzip (.gz)
    Gzip,
    /// Zstandard (.zst)
    Zstd,
    /// bzip2 (.bz2)
    Bzip2,
    /// xz / LZMA (.xz)
    Xz,
}

impl CompressionFormat {
    /// Format implied by the last extension of `path`, if it names one.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gz" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bz" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Format from a name as written in the config file. Short extension
    /// spellings are accepted too.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name, true)
            .ok()
            .or_else(|| Self::from_extension(Path::new(&format!("x.{name}"))))
    }
}

/// Output format for the exported view
#[derive(Debug, Default, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON (2-space indent)
    #[default]
    Json,
    /// Comma-separated values; layout depends on grouping and counts
    Csv,
}

impl ExportFormat {
    /// Format named by an extension or config value (`json`, `csv`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::from_str(ext, true).ok()
    }

    /// Format implied by an output path. None when the extension is missing
    /// or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }
}

/// Command-line arguments for jsonquery
#[derive(Clone, Parser, Debug)]
#[command(
    name = "jsonquery",
    version,
    about = "Filter, group, sort and aggregate JSON datasets",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the JSON data file (an array of objects). Not required with --generate-config or --list-operators
    #[arg(required_unless_present_any = ["generate_config", "list_operators"], value_name = "DATA")]
    pub data: Option<std::path::PathBuf>,

    /// Path to a JSON schema file mapping field names to types (string, int, bool, date, array).
    /// When omitted the schema is inferred from the data.
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<std::path::PathBuf>,

    /// Add a filter: FIELD:OPERATOR[:VALUE[:VALUE1]]. Repeatable; filters are combined with AND
    #[arg(short = 'f', long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Group by this field. Repeat to nest groups in the given order
    #[arg(short = 'g', long = "group-by", value_name = "FIELD")]
    pub group_by: Vec<String>,

    /// Collapse each group into a "key: count" entry, largest first
    #[arg(long = "counts", action)]
    pub counts: bool,

    /// Order of counted groups (default: desc)
    #[arg(long = "group-sort", value_parser = ["asc", "desc"])]
    pub group_sort: Option<String>,

    /// Keep only the first N counted groups (N >= 1)
    #[arg(
        long = "group-limit",
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub group_limit: Option<usize>,

    /// Merge groups cut off by the group limit (--group-limit or config) into a trailing "Other" entry
    #[arg(long = "combine-remainder", action)]
    pub combine_remainder: bool,

    /// Sort by FIELD[:asc|desc]. Repeatable; the first sort is the primary key
    #[arg(short = 's', long = "sort", value_name = "SORT")]
    pub sort: Vec<String>,

    /// Keep only the first N records of a flat result
    #[arg(short = 'n', long = "limit", value_name = "N")]
    pub limit: Option<usize>,

    /// Summarise a single numeric field (count, sum, average, min, max) instead of listing records
    #[arg(long = "analyse", value_name = "FIELD", conflicts_with = "group_by")]
    pub analyse: Option<String>,

    /// Comma-separated list of fields to keep in the result
    #[arg(long = "fields", value_name = "FIELDS", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Calculated fields: "name = expression; other = expression"
    #[arg(long = "calc", value_name = "CALCULATIONS")]
    pub calc: Option<String>,

    /// Output format (json, csv). Defaults to the --output extension, then config, then json
    #[arg(long = "format", value_enum)]
    pub format: Option<ExportFormat>,

    /// Write the export to this file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<std::path::PathBuf>,

    /// Print group statistics (number of groups, max/min/average size) instead of the view
    #[arg(long = "stats", requires = "group_by", action)]
    pub stats: bool,

    /// List the filter operators available for a field type and exit
    #[arg(long = "list-operators", value_name = "TYPE")]
    pub list_operators: Option<String>,

    /// Decompress the data file with this format instead of guessing from its extension
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Enable debug logging on stderr (RUST_LOG overrides)
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/jsonquery/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Replace an existing config file with --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// How an argument is written on the command line, e.g. `-f, --filter <FILTER>`.
fn invocation(arg: &Arg) -> String {
    let values = arg
        .get_value_names()
        .unwrap_or_default()
        .iter()
        .map(|name| format!("<{}>", name.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    if arg.is_positional() {
        return if arg.is_required_set() {
            values
        } else {
            format!("[{values}]")
        };
    }

    let flags = arg
        .get_short()
        .map(|s| format!("-{s}"))
        .into_iter()
        .chain(arg.get_long().map(|l| format!("--{l}")))
        .collect::<Vec<_>>()
        .join(", ");
    if values.is_empty() || !arg.get_action().takes_values() {
        flags
    } else {
        format!("{flags} {values}")
    }
}

/// Command-line reference as markdown: a usage block, then one table row
/// per argument. Printed by the gen_docs binary.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::new();
    let _ = writeln!(out, "# Command Line Options\n");
    let _ = writeln!(out, "## Usage\n\n```\n{}\n```\n", cmd.render_usage());
    let _ = writeln!(out, "## Options\n");
    let _ = writeln!(out, "| Option | Description |");
    let _ = writeln!(out, "|--------|-------------|");

    let documented = cmd
        .get_arguments()
        .filter(|arg| !matches!(arg.get_id().as_str(), "help" | "version"));
    for arg in documented {
        let help = arg
            .get_help()
            .map(|h| table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "| `{}` | {} |", invocation(arg), help);
    }

    out
}
