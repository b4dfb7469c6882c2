//! `fabrichub decode`: decode a block and print a summary or JSON.

use anyhow::{Context, Result};
use fabrichub_core::{Block, Decoded, PayloadData};
use fabrichub_decode::BlockDecoder;
use std::fmt::{self, Write};
use tracing::debug;

pub fn run(bytes: &[u8], as_json: bool) -> Result<()> {
    let decoded = BlockDecoder::new()
        .decode(bytes)
        .context("failed to decode block")?;
    debug!(
        block = decoded.value.number(),
        envelopes = decoded.value.tx_count(),
        diagnostics = decoded.diagnostics.len(),
        "block decoded"
    );

    if as_json {
        let doc = serde_json::json!({
            "block": decoded.value,
            "diagnostics": decoded.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", summary(&decoded)?);
    }
    Ok(())
}

fn summary(decoded: &Decoded<Block>) -> Result<String, fmt::Error> {
    let block = &decoded.value;
    let mut out = String::new();
    writeln!(out, "Block #{} ({} envelopes)", block.number(), block.tx_count())?;
    writeln!(out, "  previous hash: {}", hex::encode(&block.header.previous_hash))?;
    writeln!(out, "  data hash:     {}", hex::encode(&block.header.data_hash))?;

    for (i, (envelope, (_, code))) in block
        .data
        .iter()
        .zip(block.transaction_statuses())
        .enumerate()
    {
        let tx_id = if envelope.tx_id().is_empty() {
            "-"
        } else {
            envelope.tx_id()
        };
        writeln!(
            out,
            "  [{i}] {:?} tx={tx_id} channel={} status={code}",
            envelope.header_type(),
            envelope.channel_id(),
        )?;
        match &envelope.payload.data {
            PayloadData::Transaction(tx) => {
                for event in tx.chaincode_events() {
                    match event {
                        Ok(Some(e)) => {
                            writeln!(
                                out,
                                "      event {}/{} ({} bytes)",
                                e.chaincode_id,
                                e.event_name,
                                e.payload.len()
                            )?;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            writeln!(out, "      event undecodable: {e}")?;
                        }
                    }
                }
            }
            PayloadData::Config(config) => {
                writeln!(
                    out,
                    "      config sequence {} with {} policies",
                    config.config.sequence,
                    config
                        .config
                        .channel_group
                        .as_ref()
                        .map_or(0, |g| g.policy_count())
                )?;
            }
            PayloadData::ConfigUpdate(update) => {
                writeln!(
                    out,
                    "      config update for '{}' with {} signatures",
                    update.config_update.channel_id,
                    update.signatures.len()
                )?;
            }
            PayloadData::Raw(raw) => {
                writeln!(out, "      {} bytes kept undecoded", raw.len())?;
            }
        }
    }

    if !decoded.diagnostics.is_empty() {
        writeln!(out, "Diagnostics:")?;
        for d in &decoded.diagnostics {
            writeln!(out, "  - {d}")?;
        }
    }
    Ok(out)
}
