//! Command-line argument definitions for the dtlink CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the root source file, the configuration
//! file, extra include search paths and common files, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the dtlink checker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the root devicetree source file
    #[arg(help = "Path to the root .dts file")]
    pub input: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory searched for `#include` and `/include/` targets
    #[arg(short = 'I', long = "include-path")]
    pub include_path: Vec<String>,

    /// File resolved before the root file and its includes
    #[arg(long)]
    pub common: Vec<String>,

    /// Print the resolved node tree after the diagnostics
    #[arg(long)]
    pub dump_tree: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
