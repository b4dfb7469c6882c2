//! # fabrichub-core
//!
//! Core types shared across all fabrichub crates.
//!
//! - [`wire`]: protobuf messages of the ledger's block, transaction,
//!   configuration, policy and event-service schemas
//! - [`block`], [`config`], [`policy`], [`transaction`]: the typed,
//!   fully decoded ledger structures produced by `fabrichub-decode`
//! - [`error`]: `DecodeError`, `TransportError`, `SigningError`
//! - [`identity`]: the externally supplied `SigningIdentity`

pub mod block;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod hexser;
pub mod identity;
pub mod policy;
pub mod transaction;
pub mod wire;

pub use block::{
    Block, BlockHeader, BlockMetadata, BlockMetadataIndex, ChannelHeader, Envelope, Header,
    HeaderType, Payload, PayloadData, SerializedIdentity, SignatureHeader, TxValidationCode,
};
pub use config::{
    Config, ConfigEnvelope, ConfigGroup, ConfigPolicy, ConfigSignature, ConfigUpdate,
    ConfigUpdateEnvelope, ConfigValue,
};
pub use diagnostic::{Decoded, Diagnostic};
pub use error::{DecodeError, SigningError, TransportError};
pub use identity::SigningIdentity;
pub use policy::{
    DecodedPolicy, ImplicitMetaPolicy, ImplicitMetaRule, MspRole, PolicyType, Principal,
    SignaturePolicy, SignaturePolicyEnvelope,
};
pub use transaction::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeEvent,
    ChaincodeId, Endorsement, ProposalResponsePayload, Response, Transaction, TransactionAction,
};
