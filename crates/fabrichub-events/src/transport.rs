//! The `EventTransport` trait: the seam between the hub and the wire.

use async_trait::async_trait;
use fabrichub_core::{wire, TransportError};
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Inbound half of an event stream.
pub type InboundStream = Pin<Box<dyn Stream<Item = Result<wire::Event, TransportError>> + Send>>;

/// One open bidirectional stream to a peer's event service.
///
/// Dropping `outbound` ends the request side; dropping `inbound` stops
/// reading and releases the stream.
pub struct EventStream {
    pub outbound: mpsc::Sender<wire::SignedEvent>,
    pub inbound: InboundStream,
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("outbound_closed", &self.outbound.is_closed())
            .finish_non_exhaustive()
    }
}

/// Transport health, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The last open succeeded.
    Healthy,
    /// Open succeeded but the stream has reported errors.
    Degraded,
    /// The last open failed.
    Unhealthy,
    /// No open attempted yet.
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Opens event streams to one peer.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the hub stores them as
/// `Arc<dyn EventTransport>` and opens streams from any task.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    /// Open a fresh stream. Every call yields an independent stream.
    async fn open(&self) -> Result<EventStream, TransportError>;

    /// Return the current health status of this transport.
    fn health(&self) -> HealthStatus {
        HealthStatus::Unknown
    }

    /// Return the peer endpoint this transport connects to.
    fn endpoint(&self) -> &str;
}
