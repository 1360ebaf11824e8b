//! One-shot address resolution subcommand.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use blescout_core::{Address, RpaResolver};

use crate::keys::load_keys;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Address to check, e.g. 54:2B:9A:10:22:31
    #[arg(short, long)]
    pub address: String,

    /// Identity resolving key as hex (repeatable)
    #[arg(long = "irk", value_name = "HEX")]
    pub irks: Vec<String>,

    /// File with one identity resolving key per line
    #[arg(long, value_name = "PATH")]
    pub irk_file: Option<PathBuf>,
}

/// Execute the resolve command. Exits with code 1 on no-match so shell
/// scripts can branch on the result.
pub fn execute(args: ResolveArgs) -> Result<()> {
    let keys = load_keys(&args.irks, args.irk_file.as_deref())?;
    if keys.is_empty() {
        bail!("no keys given; pass --irk and/or --irk-file");
    }

    let address = Address::parse(&args.address)?;
    if !address.is_resolvable_private() {
        println!(
            "{} {} is not a resolvable private address",
            "[no-match]".yellow().bold(),
            address
        );
        std::process::exit(1);
    }

    let resolver = RpaResolver::new(keys);
    match resolver.resolve(&address) {
        Some(index) => {
            println!(
                "{} {} resolves against key #{} ({})",
                "[match]".green().bold(),
                address,
                index,
                resolver.keys()[index]
            );
        }
        None => {
            println!(
                "{} {} matches none of the {} loaded key(s)",
                "[no-match]".yellow().bold(),
                address,
                resolver.len()
            );
            std::process::exit(1);
        }
    }
    Ok(())
}
