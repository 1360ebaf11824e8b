//! blescout CLI
//!
//! Command-line interface for the blescout BLE detection correlation engine:
//! drives scan sessions from replay or synthetic feeds, resolves private
//! addresses against identity resolving keys, and exports per-device results.
//!
//! # Usage
//!
//! ```bash
//! # Replay a JSONL capture through the correlation engine
//! blescout scan --replay capture.jsonl --window 5 --environment indoor
//!
//! # Resolve rotating addresses from a fleet key file, with exports
//! blescout scan --synthetic 4 --irk-file fleet.keys --csv out.csv
//!
//! # One-shot resolution check (exit code 1 on no-match)
//! blescout resolve --address 54:2B:9A:10:22:31 --irk-file fleet.keys
//!
//! # Validate and list a key file
//! blescout keys --irk-file fleet.keys
//! ```

use clap::{Parser, Subcommand};

pub mod keys;
pub mod resolve;
pub mod scan;

/// blescout Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "blescout")]
#[command(author, version, about = "BLE scanner with private-address resolution")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scan session from replay and/or synthetic feeds
    Scan(scan::ScanArgs),

    /// Check one address against a set of identity resolving keys
    Resolve(resolve::ResolveArgs),

    /// Validate an IRK file and list its keys
    Keys(keys::KeysArgs),

    /// Display version information
    Version,
}
