//! # fabrichub-decode
//!
//! Decodes ledger blocks from their protobuf wire encoding into the typed
//! model of `fabrichub-core`.
//!
//! ## Pipeline
//! ```text
//! Block bytes
//!   └─ Envelope ─ Payload ─ Header (ChannelHeader + SignatureHeader)
//!        └─ by ChannelHeader.type:
//!             CONFIG               → ConfigEnvelope → ConfigGroup tree → policies
//!             CONFIG_UPDATE        → ConfigUpdateEnvelope → read/write sets
//!             ENDORSER_TRANSACTION → Transaction → ... → ChaincodeAction
//!             other                → raw bytes
//! ```
//!
//! Every failure aborts the whole decode with a [`DecodeError`]. Warnings
//! that do not abort (the legacy MSP policy type) are returned as
//! [`Diagnostic`]s next to the value.
//!
//! [`DecodeError`]: fabrichub_core::DecodeError
//! [`Diagnostic`]: fabrichub_core::Diagnostic

pub mod block;
pub mod config;
mod context;
pub mod policy;
pub mod transaction;

pub use block::{decode_block, decode_block_message, BlockDecoder};
pub use config::MAX_CONFIG_DEPTH;
pub use policy::{decode_policy, decode_policy_bytes, MAX_POLICY_DEPTH};
