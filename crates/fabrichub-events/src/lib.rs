//! # fabrichub-events
//!
//! Event hub for a ledger peer's event service.
//!
//! Opens one bidirectional stream per hub, registers for the channel's
//! blocks, decodes each inbound block and fans the result out to three
//! registries of listeners.
//!
//! ## Architecture
//! ```text
//! EventTransport (gRPC Events.Chat, one stream)
//!       │
//!       ▼
//! reader task (per stream)
//!       │
//!       ▼
//! BlockDecoder::decode_message
//!       │
//!       ▼
//! dispatch ──▶ block listeners        (Arc<Block>)
//!          ──▶ transaction listeners  (TxStatus, keyed by tx id)
//!          ──▶ chaincode listeners    (ChaincodeEvent, by chaincode id + name regex)
//! ```

pub mod config;
mod dispatch;
pub mod error;
pub mod grpc;
pub mod hub;
pub mod listener;
pub mod registry;
pub mod transport;

pub use config::HubConfig;
pub use error::{ConnectionError, HubError};
pub use grpc::GrpcEventTransport;
pub use hub::{ConnectionState, EventHub};
pub use listener::{Listener, Subscription};
pub use registry::{BlockRegistration, ChaincodeRegistration, RegistryCounts, TxStatus};
pub use transport::{EventStream, EventTransport, HealthStatus, InboundStream};
