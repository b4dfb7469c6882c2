//! Decoded channel-configuration types.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::block::{Envelope, SignatureHeader};
use crate::policy::DecodedPolicy;

/// Payload of a CONFIG envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigEnvelope {
    pub config: Config,
    /// The CONFIG_UPDATE envelope that produced this configuration.
    pub last_update: Option<Box<Envelope>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub sequence: u64,
    pub channel_group: Option<ConfigGroup>,
}

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConfigGroup {
    pub version: u64,
    pub groups: BTreeMap<String, ConfigGroup>,
    pub values: BTreeMap<String, ConfigValue>,
    pub policies: BTreeMap<String, ConfigPolicy>,
    pub mod_policy: String,
}

impl ConfigGroup {
    /// Follow `path` (group names from this node downwards).
    pub fn group(&self, path: &[&str]) -> Option<&ConfigGroup> {
        path.iter()
            .try_fold(self, |node, name| node.groups.get(*name))
    }

    /// Total number of policies in this subtree.
    pub fn policy_count(&self) -> usize {
        self.policies.len()
            + self
                .groups
                .values()
                .map(ConfigGroup::policy_count)
                .sum::<usize>()
    }
}

/// A configuration value; its content is opaque to this library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigValue {
    pub version: u64,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub value: Vec<u8>,
    pub mod_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigPolicy {
    pub version: u64,
    /// Absent in read sets that only reference a policy by version.
    pub policy: Option<DecodedPolicy>,
    pub mod_policy: String,
}

/// Payload of a CONFIG_UPDATE envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigUpdateEnvelope {
    pub config_update: ConfigUpdate,
    pub signatures: Vec<ConfigSignature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigUpdate {
    pub channel_id: String,
    pub read_set: Option<ConfigGroup>,
    pub write_set: Option<ConfigGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSignature {
    pub signature_header: SignatureHeader,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub signature: Vec<u8>,
}
