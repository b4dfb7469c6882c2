//! fabrichub CLI: offline inspection of captured ledger blocks.
//!
//! # Commands
//! ```text
//! fabrichub decode --file <block.pb> [--hex] [--json]
//! fabrichub policy --file <policy.pb> [--name <path>] [--hex] [--json]
//! fabrichub info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fabrichub_observability::{init_tracing, LogConfig};
use std::path::{Path, PathBuf};

mod cmd_decode;
mod cmd_policy;

#[derive(Parser)]
#[command(
    name = "fabrichub",
    about = "Decode and inspect ledger blocks captured from a peer",
    long_about = "
fabrichub CLI: decode serialized blocks and policies into readable form.
Input files hold the raw protobuf bytes, or hex text with --hex.
Logs go to stderr; --log-level accepts EnvFilter directives.
",
    version
)]
struct Cli {
    /// Log level for diagnostics written to stderr
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a serialized block
    Decode {
        /// Path to the block file
        #[arg(short, long)]
        file: PathBuf,
        /// The file contains hex text instead of raw bytes
        #[arg(long)]
        hex: bool,
        /// Print the full decoded block as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a serialized policy
    Policy {
        /// Path to the policy file
        #[arg(short, long)]
        file: PathBuf,
        /// Name reported in diagnostics
        #[arg(long, default_value = "policy")]
        name: String,
        /// The file contains hex text instead of raw bytes
        #[arg(long)]
        hex: bool,
        /// Print the decoded policy as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show build and capability info
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log = LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
        ..LogConfig::default()
    };
    // A subscriber may already be installed when embedded; keep going.
    let _ = init_tracing(&log);

    match cli.command {
        Commands::Decode { file, hex, json } => {
            let bytes = read_input(&file, hex)?;
            cmd_decode::run(&bytes, json)
        }
        Commands::Policy {
            file,
            name,
            hex,
            json,
        } => {
            let bytes = read_input(&file, hex)?;
            cmd_policy::run(&name, &bytes, json)
        }
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

/// Read `path` as raw bytes, or as hex text when `hex` is set.
fn read_input(path: &Path, hex: bool) -> Result<Vec<u8>> {
    if !hex {
        return std::fs::read(path).with_context(|| format!("reading {}", path.display()));
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_hex(&text).with_context(|| format!("{} is not valid hex", path.display()))
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact.strip_prefix("0x").unwrap_or(&compact);
    Ok(hex::decode(digits)?)
}

fn cmd_info() {
    println!("fabrichub {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Decodes:");
    println!("  blocks            header, envelopes, metadata, transactions filter");
    println!("  payload types     CONFIG, CONFIG_UPDATE, ENDORSER_TRANSACTION (others kept raw)");
    println!("  policies          SIGNATURE, IMPLICIT_META (MSP reported as a diagnostic)");
    println!();
    println!("Limits:");
    println!(
        "  config nesting    {} levels",
        fabrichub_decode::MAX_CONFIG_DEPTH
    );
    println!(
        "  policy nesting    {} levels",
        fabrichub_decode::MAX_POLICY_DEPTH
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_input_tolerates_prefix_and_whitespace() {
        assert_eq!(parse_hex("0x0a 02\n0801\n").unwrap(), vec![0x0a, 0x02, 0x08, 0x01]);
        assert_eq!(parse_hex("ff").unwrap(), vec![0xff]);
        assert!(parse_hex("0xzz").is_err());
    }
}
