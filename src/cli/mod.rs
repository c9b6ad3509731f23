//! Command-line interface

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::address::multisig;
use crate::decode::decode_transaction;
use crate::lookup::HttpTxSource;
use crate::script::{classify, Script};
use crate::types::{Network, ProtocolGeneration};

#[derive(Parser)]
#[command(name = "token-tape-decoder")]
#[command(about = "Decode raw transactions and their token-tape protocol payloads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a transaction to its full detail record, as JSON
    Decode {
        /// Transaction id to fetch and decode
        #[arg(long, conflicts_with = "hex")]
        txid: Option<String>,
        /// Raw transaction hex to decode directly
        #[arg(long)]
        hex: Option<String>,
        /// Network: mainnet or testnet
        #[arg(long, default_value = "mainnet")]
        network: Network,
        /// Protocol generation: ft or ftnft
        #[arg(long, default_value = "ft")]
        generation: ProtocolGeneration,
        /// Compact single-line JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Disassemble a script hex to ASM with its classification
    Asm {
        /// Script hex
        hex: String,
        /// Network used for address encoding
        #[arg(long, default_value = "mainnet")]
        network: Network,
    },
    /// Derive a multisig address from an ordered pubkey set
    MultisigAddress {
        /// Compressed pubkeys in hex, in canonical order
        #[arg(long, required = true, num_args = 1..)]
        pubkeys: Vec<String>,
        /// Required signature count
        #[arg(long)]
        required: u8,
    },
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Decode {
            txid,
            hex,
            network,
            generation,
            compact,
        } => {
            let source = HttpTxSource::new();
            let detail = match (txid, hex) {
                (Some(txid), None) => {
                    info!(%txid, "fetching transaction");
                    crate::decode_txid(&txid, network, generation, &source)
                        .await
                        .with_context(|| format!("decoding {}", txid))?
                }
                (None, Some(hex)) => {
                    decode_transaction(&hex, network, generation, &source).await?
                }
                _ => bail!("exactly one of --txid or --hex is required"),
            };
            let rendered = if compact {
                serde_json::to_string(&detail)?
            } else {
                serde_json::to_string_pretty(&detail)?
            };
            println!("{}", rendered);
        }
        Command::Asm { hex, network } => {
            let script = Script::from_hex(&hex).context("invalid script hex")?;
            let detail = classify::parse_script(&script, network);
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Command::MultisigAddress { pubkeys, required } => {
            let total = u8::try_from(pubkeys.len()).context("too many pubkeys")?;
            let address = multisig::derive_multisig_address(&pubkeys, required, total)?;
            let combine = multisig::combine_hash(&address)?;
            println!(
                "{}",
                serde_json::json!({
                    "address": address,
                    "combine_hash": combine,
                    "lock_script_asm": multisig::lock_script_asm(&address)?,
                })
            );
        }
    }
    Ok(())
}
