//! Authorization-policy decoder.
//!
//! A wire `Policy` is `{type, value}`; `value` is interpreted by `type`:
//!
//! | type            | value decodes to                           |
//! |-----------------|--------------------------------------------|
//! | SIGNATURE (1)   | `SignaturePolicyEnvelope` (rule tree + principals) |
//! | MSP (2)         | not decoded; placeholder + diagnostic      |
//! | IMPLICIT_META (3) | `ImplicitMetaPolicy` (sub-policy name + rule) |
//!
//! Any other type is rejected with `DecodeError::UnknownPolicyType`.

use fabrichub_core::{
    wire::{self, policies::signature_policy},
    DecodeError, Decoded, DecodedPolicy, Diagnostic, ImplicitMetaPolicy, ImplicitMetaRule,
    MspRole, PolicyType, Principal, SerializedIdentity, SignaturePolicy,
    SignaturePolicyEnvelope,
};
use tracing::warn;

/// Deepest signature-policy expression tree accepted.
pub const MAX_POLICY_DEPTH: usize = 32;

/// Decode one policy. `name` identifies it in errors and diagnostics.
pub fn decode_policy(
    name: &str,
    policy: &wire::Policy,
) -> Result<Decoded<DecodedPolicy>, DecodeError> {
    let mut diagnostics = Vec::new();
    let value = decode_policy_into(name, policy, &mut diagnostics)?;
    Ok(Decoded { value, diagnostics })
}

/// Decode a serialized `Policy` message.
pub fn decode_policy_bytes(
    name: &str,
    bytes: &[u8],
) -> Result<Decoded<DecodedPolicy>, DecodeError> {
    let policy: wire::Policy = wire::decode(bytes, "Policy")?;
    decode_policy(name, &policy)
}

pub(crate) fn decode_policy_into(
    name: &str,
    policy: &wire::Policy,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<DecodedPolicy, DecodeError> {
    let policy_type =
        PolicyType::from_wire(policy.r#type).ok_or_else(|| DecodeError::UnknownPolicyType {
            name: name.to_string(),
            policy_type: policy.r#type,
        })?;

    match policy_type {
        PolicyType::ImplicitMeta => {
            decode_implicit_meta(&policy.value).map(DecodedPolicy::ImplicitMeta)
        }
        PolicyType::Signature => {
            decode_signature_envelope(&policy.value).map(DecodedPolicy::Signature)
        }
        PolicyType::Msp => {
            warn!(
                policy = %name,
                policy_type = policy.r#type,
                "MSP policy type is not supported, value left undecoded"
            );
            diagnostics.push(Diagnostic::UnsupportedPolicyType {
                name: name.to_string(),
                policy_type: policy.r#type,
            });
            Ok(DecodedPolicy::Msp {
                raw: policy.value.clone(),
            })
        }
    }
}

fn decode_implicit_meta(bytes: &[u8]) -> Result<ImplicitMetaPolicy, DecodeError> {
    let raw: wire::ImplicitMetaPolicy = wire::decode(bytes, "ImplicitMetaPolicy")?;
    let rule = ImplicitMetaRule::from_wire(raw.rule).ok_or(DecodeError::InvalidEnum {
        field: "ImplicitMetaPolicy.rule",
        value: raw.rule,
    })?;
    Ok(ImplicitMetaPolicy {
        sub_policy: raw.sub_policy,
        rule,
    })
}

fn decode_signature_envelope(bytes: &[u8]) -> Result<SignaturePolicyEnvelope, DecodeError> {
    let raw: wire::SignaturePolicyEnvelope = wire::decode(bytes, "SignaturePolicyEnvelope")?;
    let rule = raw.rule.as_ref().ok_or(DecodeError::MissingField {
        field: "SignaturePolicyEnvelope.rule",
    })?;
    let rule = convert_rule(rule, 1)?;
    let identities = raw
        .identities
        .iter()
        .map(decode_principal)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SignaturePolicyEnvelope {
        version: raw.version,
        rule,
        identities,
    })
}

fn convert_rule(rule: &wire::SignaturePolicy, depth: usize) -> Result<SignaturePolicy, DecodeError> {
    if depth > MAX_POLICY_DEPTH {
        return Err(DecodeError::TooDeep {
            what: "signature policy",
            limit: MAX_POLICY_DEPTH,
        });
    }
    match &rule.r#type {
        Some(signature_policy::Type::SignedBy(index)) => Ok(SignaturePolicy::SignedBy(*index)),
        Some(signature_policy::Type::NOutOf(n_out_of)) => {
            let rules = n_out_of
                .rules
                .iter()
                .map(|r| convert_rule(r, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SignaturePolicy::NOutOf {
                n: n_out_of.n,
                rules,
            })
        }
        None => Err(DecodeError::MissingField {
            field: "SignaturePolicy.type",
        }),
    }
}

fn decode_principal(p: &wire::MspPrincipal) -> Result<Principal, DecodeError> {
    let principal = match p.principal_classification {
        0 => {
            let role: wire::MspRole = wire::decode(&p.principal, "MSPRole")?;
            Principal::Role {
                msp_id: role.msp_identifier,
                role: MspRole::from(role.role),
            }
        }
        1 => {
            let ou: wire::OrganizationUnit = wire::decode(&p.principal, "OrganizationUnit")?;
            Principal::OrganizationUnit {
                msp_id: ou.msp_identifier,
                ou_id: ou.organizational_unit_identifier,
                certifiers_id: ou.certifiers_identifier,
            }
        }
        2 => {
            let id: wire::SerializedIdentity = wire::decode(&p.principal, "SerializedIdentity")?;
            Principal::Identity(SerializedIdentity {
                mspid: id.mspid,
                id_bytes: id.id_bytes,
            })
        }
        other => Principal::Other {
            classification: other,
            principal: p.principal.clone(),
        },
    };
    Ok(principal)
}
