//! Protobuf wire messages.
//!
//! Field numbers follow the ledger's published `.proto` schemas exactly.
//! Enum-typed fields are kept as raw `i32` here; the decoder validates them
//! when mapping into the typed model.

pub mod common;
pub mod configtx;
pub mod events;
pub mod peer;
pub mod policies;

use crate::error::DecodeError;

pub use common::{
    Block, BlockData, BlockHeader, BlockMetadata, ChannelHeader, Envelope, Header, Payload,
    SerializedIdentity, SignatureHeader,
};
pub use configtx::{
    Config, ConfigEnvelope, ConfigGroup, ConfigPolicy, ConfigSignature, ConfigUpdate,
    ConfigUpdateEnvelope, ConfigValue,
};
pub use events::{
    event, ChaincodeReg, Event, Interest, Register, Rejection, SignedEvent, Unregister,
};
pub use peer::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeEvent,
    ChaincodeId, Endorsement, ProposalResponsePayload, Response, Transaction, TransactionAction,
};
pub use policies::{
    ImplicitMetaPolicy, MspPrincipal, MspRole, OrganizationUnit, Policy, SignaturePolicy,
    SignaturePolicyEnvelope,
};

/// Decode `bytes` as message `M`, labelling failures with `what`.
pub fn decode<M: prost::Message + Default>(
    bytes: &[u8],
    what: &'static str,
) -> Result<M, DecodeError> {
    M::decode(bytes).map_err(|source| DecodeError::Malformed {
        message: what,
        source,
    })
}
