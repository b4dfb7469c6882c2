//! Decoded authorization-policy types.

use serde::Serialize;
use std::fmt;

use crate::block::SerializedIdentity;

/// The wire `Policy.PolicyType` values this library accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    Signature = 1,
    Msp = 2,
    ImplicitMeta = 3,
}

impl PolicyType {
    /// Map a wire value; `None` for UNKNOWN (0) and anything out of range.
    pub fn from_wire(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::Signature),
            2 => Some(Self::Msp),
            3 => Some(Self::ImplicitMeta),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecodedPolicy {
    Signature(SignaturePolicyEnvelope),
    ImplicitMeta(ImplicitMetaPolicy),
    /// Legacy MSP policy, left undecoded.
    Msp {
        #[serde(serialize_with = "crate::hexser::serialize")]
        raw: Vec<u8>,
    },
}

impl DecodedPolicy {
    pub fn policy_type(&self) -> PolicyType {
        match self {
            Self::Signature(_) => PolicyType::Signature,
            Self::ImplicitMeta(_) => PolicyType::ImplicitMeta,
            Self::Msp { .. } => PolicyType::Msp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignaturePolicyEnvelope {
    pub version: i32,
    pub rule: SignaturePolicy,
    pub identities: Vec<Principal>,
}

/// Boolean expression over indices into `SignaturePolicyEnvelope::identities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    SignedBy(i32),
    NOutOf { n: i32, rules: Vec<SignaturePolicy> },
}

impl fmt::Display for SignaturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedBy(i) => write!(f, "signed_by({i})"),
            Self::NOutOf { n, rules } => {
                write!(f, "out_of({n}")?;
                for rule in rules {
                    write!(f, ", {rule}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImplicitMetaPolicy {
    pub sub_policy: String,
    pub rule: ImplicitMetaRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplicitMetaRule {
    Any,
    All,
    Majority,
}

impl ImplicitMetaRule {
    pub fn from_wire(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Any),
            1 => Some(Self::All),
            2 => Some(Self::Majority),
            _ => None,
        }
    }
}

/// An identity descriptor referenced by a signature policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Role {
        msp_id: String,
        role: MspRole,
    },
    OrganizationUnit {
        msp_id: String,
        ou_id: String,
        #[serde(serialize_with = "crate::hexser::serialize")]
        certifiers_id: Vec<u8>,
    },
    Identity(SerializedIdentity),
    /// Classifications this library does not interpret (anonymity, combined).
    Other {
        classification: i32,
        #[serde(serialize_with = "crate::hexser::serialize")]
        principal: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MspRole {
    Member,
    Admin,
    Client,
    Peer,
    Orderer,
    Other(i32),
}

impl From<i32> for MspRole {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Member,
            1 => Self::Admin,
            2 => Self::Client,
            3 => Self::Peer,
            4 => Self::Orderer,
            other => Self::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_type_rejects_unknown() {
        assert_eq!(PolicyType::from_wire(0), None);
        assert_eq!(PolicyType::from_wire(2), Some(PolicyType::Msp));
        assert_eq!(PolicyType::from_wire(4), None);
    }

    #[test]
    fn signature_policy_display() {
        let rule = SignaturePolicy::NOutOf {
            n: 1,
            rules: vec![
                SignaturePolicy::SignedBy(0),
                SignaturePolicy::NOutOf {
                    n: 2,
                    rules: vec![SignaturePolicy::SignedBy(1), SignaturePolicy::SignedBy(2)],
                },
            ],
        };
        assert_eq!(
            rule.to_string(),
            "out_of(1, signed_by(0), out_of(2, signed_by(1), signed_by(2)))"
        );
    }

    #[test]
    fn msp_policy_serializes_with_type_tag() {
        let json = serde_json::to_value(DecodedPolicy::Msp { raw: vec![0xab] }).unwrap();
        assert_eq!(json["type"], "MSP");
        assert_eq!(json["raw"], "ab");
    }

    #[test]
    fn uninterpreted_principal_keeps_its_classification() {
        let json = serde_json::to_value(Principal::Other {
            classification: 3,
            principal: vec![0x01],
        })
        .unwrap();
        assert_eq!(json["kind"], "other");
        assert_eq!(json["classification"], 3);
        assert_eq!(json["principal"], "01");
    }
}
