//! Identity resolving key loading and the key-listing subcommand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use blescout_core::{parse_irk_lines, IdentityResolvingKey};

/// Collects keys from command-line hex values and an optional key file, in
/// that order. Returns an empty vector when neither source is given.
pub fn load_keys(
    hex_values: &[String],
    file: Option<&Path>,
) -> Result<Vec<IdentityResolvingKey>> {
    let mut keys = Vec::new();
    for value in hex_values {
        keys.push(IdentityResolvingKey::parse(value)?);
    }
    if let Some(path) = file {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading key file {}", path.display()))?;
        keys.extend(
            parse_irk_lines(&body).with_context(|| format!("in key file {}", path.display()))?,
        );
    }
    Ok(keys)
}

/// Arguments for the keys command
#[derive(Args, Debug)]
pub struct KeysArgs {
    /// File with one identity resolving key per line
    #[arg(long, value_name = "PATH")]
    pub irk_file: PathBuf,
}

/// Key display row
#[derive(Tabled)]
struct KeyRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Key")]
    masked: String,
}

/// Execute the keys command: validate a key file and list its keys in
/// masked form. Full key material is never printed.
pub fn execute(args: KeysArgs) -> Result<()> {
    let keys = load_keys(&[], Some(&args.irk_file))?;

    println!(
        "{} {} valid key(s) in {}",
        "[OK]".green().bold(),
        keys.len(),
        args.irk_file.display()
    );
    let rows: Vec<KeyRow> = keys
        .iter()
        .enumerate()
        .map(|(index, key)| KeyRow {
            index,
            masked: key.masked(),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
