//! Error types for the event hub.

use fabrichub_core::{DecodeError, SigningError, TransportError};
use thiserror::Error;

/// Why the hub could not reach, or stay connected to, a peer.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("No peer address configured")]
    NoPeer,

    #[error("Event hub is not connected")]
    NotConnected,

    #[error("Timed out after {ms} ms waiting for the peer to acknowledge registration")]
    Timeout { ms: u64 },

    #[error("Failed to open event stream: {0}")]
    Open(#[from] TransportError),
}

/// Every error the hub returns or hands to a listener's `on_error`.
///
/// `Clone` because one terminal error fans out to every registered listener.
#[derive(Debug, Clone, Error)]
pub enum HubError {
    #[error("Invalid input: {reason}")]
    Input { reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("Event hub has been shut down")]
    Shutdown,
}

impl HubError {
    pub(crate) fn input(reason: impl Into<String>) -> Self {
        Self::Input {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the listener was removed by an explicit disconnect.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Returns `true` for registration-acknowledgement timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Connection(ConnectionError::Timeout { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_convert_into_connection_errors() {
        let err: ConnectionError = TransportError::StreamEnded.into();
        assert_eq!(err.to_string(), "Failed to open event stream: Stream ended");
    }

    #[test]
    fn classification_helpers() {
        assert!(HubError::Shutdown.is_shutdown());
        assert!(HubError::from(ConnectionError::Timeout { ms: 3000 }).is_timeout());
        assert!(!HubError::input("empty tx id").is_timeout());
    }
}
