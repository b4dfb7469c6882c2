//! Error types for the decode pipeline and the event transport.

use thiserror::Error;

/// Errors that can occur while decoding a block or any message nested in it.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Malformed {message}: {source}")]
    Malformed {
        message: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Unknown policy type {policy_type} for policy '{name}'")]
    UnknownPolicyType { name: String, policy_type: i32 },

    #[error("Invalid value {value} for {field}")]
    InvalidEnum { field: &'static str, value: i32 },

    #[error("{what} nesting exceeds the limit of {limit}")]
    TooDeep { what: &'static str, limit: usize },
}

impl DecodeError {
    /// Returns `true` for the unrecognised-policy-type case.
    pub fn is_unknown_policy_type(&self) -> bool {
        matches!(self, Self::UnknownPolicyType { .. })
    }
}

/// Errors raised by an event-stream transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not open the stream to the peer.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The stream emitted an error.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The peer closed the stream.
    #[error("Stream ended")]
    StreamEnded,

    /// An outbound message could not be handed to the stream.
    #[error("Send failed: {0}")]
    Send(String),
}

impl TransportError {
    /// Returns `true` if a fresh connection attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Stream(_) | Self::StreamEnded)
    }
}

/// Error returned by a [`SigningIdentity`](crate::identity::SigningIdentity).
#[derive(Debug, Clone, Error)]
#[error("Signing failed: {reason}")]
pub struct SigningError {
    pub reason: String,
}

impl SigningError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_policy_type_message_names_the_policy() {
        let err = DecodeError::UnknownPolicyType {
            name: "Admins".into(),
            policy_type: 7,
        };
        assert!(err.is_unknown_policy_type());
        assert_eq!(err.to_string(), "Unknown policy type 7 for policy 'Admins'");
    }

    #[test]
    fn send_failures_are_not_retryable() {
        assert!(TransportError::StreamEnded.is_retryable());
        assert!(!TransportError::Send("closed".into()).is_retryable());
    }
}
