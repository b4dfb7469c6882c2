//! Event hub configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for one [`EventHub`](crate::EventHub).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// gRPC endpoint of the peer's event service, e.g. "grpcs://peer0.org1:7053"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_url: Option<String>,
    /// Channel whose blocks are requested on registration
    #[serde(default = "default_channel_id")]
    pub channel_id: String,
    /// How long `connect()` waits for the peer to acknowledge registration
    #[serde(default = "default_registration_timeout_ms")]
    pub registration_timeout_ms: u64,
    /// TCP/TLS connect timeout for the gRPC transport
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Capacity of the outbound message queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// PEM-encoded CA certificate(s) trusted for `grpcs://` peers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_pem: Option<String>,
    /// Host name checked against the peer certificate instead of the URL host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_target_name_override: Option<String>,
}

fn default_channel_id() -> String { "mychannel".into() }
fn default_registration_timeout_ms() -> u64 { 3_000 }
fn default_connect_timeout_ms() -> u64 { 5_000 }
fn default_outbound_buffer() -> usize { 64 }

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            peer_url: None,
            channel_id: default_channel_id(),
            registration_timeout_ms: default_registration_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            outbound_buffer: default_outbound_buffer(),
            tls_ca_pem: None,
            ssl_target_name_override: None,
        }
    }
}

impl HubConfig {
    /// Default settings pointed at `peer_url`.
    pub fn for_peer(peer_url: impl Into<String>) -> Self {
        Self {
            peer_url: Some(peer_url.into()),
            ..Self::default()
        }
    }

    /// Parse a JSON config document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// Trust `ca_pem` for TLS peers, optionally verifying the certificate
    /// against `target_name` rather than the host in `peer_url`.
    pub fn with_tls(mut self, ca_pem: impl Into<String>, target_name: Option<String>) -> Self {
        self.tls_ca_pem = Some(ca_pem.into());
        self.ssl_target_name_override = target_name;
        self
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = HubConfig::from_json_str(r#"{"peer_url": "http://localhost:7053"}"#).unwrap();
        assert_eq!(config, HubConfig::for_peer("http://localhost:7053"));
        assert_eq!(config.channel_id, "mychannel");
        assert_eq!(config.registration_timeout(), Duration::from_secs(3));
        assert_eq!(config.outbound_buffer, 64);
    }

    #[test]
    fn explicit_values_win() {
        let config = HubConfig::from_json_str(
            r#"{"channel_id": "ops", "registration_timeout_ms": 250, "connect_timeout_ms": 100}"#,
        )
        .unwrap();
        assert!(config.peer_url.is_none());
        assert_eq!(config.channel_id, "ops");
        assert_eq!(config.registration_timeout_ms, 250);
        assert_eq!(config.connect_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn with_channel_overrides_default() {
        let config = HubConfig::for_peer("grpc://peer0:7053").with_channel("ops");
        assert_eq!(config.channel_id, "ops");
        assert_eq!(config.peer_url.as_deref(), Some("grpc://peer0:7053"));
    }

    #[test]
    fn tls_options_load_from_json() {
        let config = HubConfig::from_json_str(
            r#"{
                "peer_url": "grpcs://localhost:7053",
                "tls_ca_pem": "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n",
                "ssl_target_name_override": "peer0.org1.example.com"
            }"#,
        )
        .unwrap();
        assert!(config.tls_ca_pem.as_deref().unwrap().starts_with("-----BEGIN CERTIFICATE-----"));
        assert_eq!(
            config.ssl_target_name_override.as_deref(),
            Some("peer0.org1.example.com")
        );

        let plain = HubConfig::default();
        assert!(plain.tls_ca_pem.is_none());
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("tls_ca_pem").is_none());
    }
}
