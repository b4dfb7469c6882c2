//! `fabrichub policy`: decode a serialized `Policy`.

use anyhow::{Context, Result};
use fabrichub_core::{DecodedPolicy, Principal};
use fabrichub_decode::decode_policy_bytes;

pub fn run(name: &str, bytes: &[u8], as_json: bool) -> Result<()> {
    let decoded =
        decode_policy_bytes(name, bytes).with_context(|| format!("failed to decode policy '{name}'"))?;

    if as_json {
        let doc = serde_json::json!({
            "policy": decoded.value,
            "diagnostics": decoded.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{}", describe(name, &decoded.value));
    for d in &decoded.diagnostics {
        println!("  warning: {d}");
    }
    Ok(())
}

fn describe(name: &str, policy: &DecodedPolicy) -> String {
    match policy {
        DecodedPolicy::Signature(envelope) => {
            let mut lines = vec![format!("{name}: SIGNATURE {}", envelope.rule)];
            for (i, principal) in envelope.identities.iter().enumerate() {
                lines.push(format!("  [{i}] {}", principal_label(principal)));
            }
            lines.join("\n")
        }
        DecodedPolicy::ImplicitMeta(meta) => {
            format!("{name}: IMPLICIT_META {:?} of '{}'", meta.rule, meta.sub_policy)
        }
        DecodedPolicy::Msp { raw } => format!("{name}: MSP ({} bytes, not decoded)", raw.len()),
    }
}

fn principal_label(principal: &Principal) -> String {
    match principal {
        Principal::Role { msp_id, role } => format!("{msp_id} {role:?}"),
        Principal::OrganizationUnit { msp_id, ou_id, .. } => format!("{msp_id} OU={ou_id}"),
        Principal::Identity(identity) => format!("{} identity", identity.mspid),
        Principal::Other { classification, .. } => format!("classification {classification}"),
    }
}
