//! Channel-configuration decoder: config envelopes, config updates and the
//! recursive `ConfigGroup` tree with its embedded policies.

use fabrichub_core::{
    wire, Config, ConfigEnvelope, ConfigGroup, ConfigPolicy, ConfigSignature, ConfigUpdate,
    ConfigUpdateEnvelope, ConfigValue, DecodeError,
};

use crate::block::{decode_envelope_message, decode_signature_header};
use crate::context::DecodeContext;
use crate::policy::decode_policy_into;

/// Deepest `ConfigGroup` nesting accepted.
pub const MAX_CONFIG_DEPTH: usize = 64;

const ROOT_GROUP: &str = "Channel";

pub(crate) fn decode_config_envelope(
    bytes: &[u8],
    ctx: &mut DecodeContext,
) -> Result<ConfigEnvelope, DecodeError> {
    let raw: wire::ConfigEnvelope = wire::decode(bytes, "ConfigEnvelope")?;
    let config = raw.config.as_ref().ok_or(DecodeError::MissingField {
        field: "ConfigEnvelope.config",
    })?;

    let channel_group = config
        .channel_group
        .as_ref()
        .map(|g| decode_group(g, ROOT_GROUP, 0, ctx))
        .transpose()?;

    let last_update = match &raw.last_update {
        Some(env) => Some(Box::new(decode_envelope_message(env, ctx)?)),
        None => None,
    };

    Ok(ConfigEnvelope {
        config: Config {
            sequence: config.sequence,
            channel_group,
        },
        last_update,
    })
}

pub(crate) fn decode_config_update_envelope(
    bytes: &[u8],
    ctx: &mut DecodeContext,
) -> Result<ConfigUpdateEnvelope, DecodeError> {
    let raw: wire::ConfigUpdateEnvelope = wire::decode(bytes, "ConfigUpdateEnvelope")?;
    let update: wire::ConfigUpdate = wire::decode(&raw.config_update, "ConfigUpdate")?;

    let read_set = update
        .read_set
        .as_ref()
        .map(|g| decode_group(g, ROOT_GROUP, 0, ctx))
        .transpose()?;
    let write_set = update
        .write_set
        .as_ref()
        .map(|g| decode_group(g, ROOT_GROUP, 0, ctx))
        .transpose()?;

    let signatures = raw
        .signatures
        .iter()
        .map(|s| {
            Ok(ConfigSignature {
                signature_header: decode_signature_header(&s.signature_header)?,
                signature: s.signature.clone(),
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(ConfigUpdateEnvelope {
        config_update: ConfigUpdate {
            channel_id: update.channel_id,
            read_set,
            write_set,
        },
        signatures,
    })
}

/// Decode one tree node. `path` is the slash-joined group path, used to
/// name policies in errors and diagnostics.
fn decode_group(
    raw: &wire::ConfigGroup,
    path: &str,
    depth: usize,
    ctx: &mut DecodeContext,
) -> Result<ConfigGroup, DecodeError> {
    if depth > MAX_CONFIG_DEPTH {
        return Err(DecodeError::TooDeep {
            what: "config group",
            limit: MAX_CONFIG_DEPTH,
        });
    }

    let mut group = ConfigGroup {
        version: raw.version,
        mod_policy: raw.mod_policy.clone(),
        ..ConfigGroup::default()
    };

    for (name, child) in &raw.groups {
        let child_path = format!("{path}/{name}");
        group
            .groups
            .insert(name.clone(), decode_group(child, &child_path, depth + 1, ctx)?);
    }

    for (name, value) in &raw.values {
        group.values.insert(
            name.clone(),
            ConfigValue {
                version: value.version,
                value: value.value.clone(),
                mod_policy: value.mod_policy.clone(),
            },
        );
    }

    for (name, config_policy) in &raw.policies {
        let policy_path = format!("{path}/{name}");
        let policy = config_policy
            .policy
            .as_ref()
            .map(|p| decode_policy_into(&policy_path, p, &mut ctx.diagnostics))
            .transpose()?;
        group.policies.insert(
            name.clone(),
            ConfigPolicy {
                version: config_policy.version,
                policy,
                mod_policy: config_policy.mod_policy.clone(),
            },
        );
    }

    Ok(group)
}
