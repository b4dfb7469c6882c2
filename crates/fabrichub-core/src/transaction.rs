//! Decoded endorser-transaction types and chaincode events.

use serde::Serialize;

use crate::block::SignatureHeader;
use crate::error::DecodeError;
use crate::wire;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub actions: Vec<TransactionAction>,
}

impl Transaction {
    /// Decode the chaincode event of every action, in action order.
    /// Actions without an event yield `Ok(None)`.
    pub fn chaincode_events(
        &self,
    ) -> impl Iterator<Item = Result<Option<ChaincodeEvent>, DecodeError>> + '_ {
        self.actions
            .iter()
            .map(|a| a.chaincode_action().chaincode_event())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAction {
    pub header: SignatureHeader,
    pub payload: ChaincodeActionPayload,
}

impl TransactionAction {
    pub fn chaincode_action(&self) -> &ChaincodeAction {
        &self.payload.action.proposal_response_payload.extension
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChaincodeActionPayload {
    /// The original proposal input, kept undecoded.
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub chaincode_proposal_payload: Vec<u8>,
    pub action: ChaincodeEndorsedAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChaincodeEndorsedAction {
    pub proposal_response_payload: ProposalResponsePayload,
    pub endorsements: Vec<Endorsement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalResponsePayload {
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub proposal_hash: Vec<u8>,
    pub extension: ChaincodeAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endorsement {
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub endorser: Vec<u8>,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub signature: Vec<u8>,
}

/// The simulation result of one chaincode invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChaincodeAction {
    /// Serialized read-write set.
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub results: Vec<u8>,
    /// Serialized `ChaincodeEvent`; decoded on demand by [`Self::chaincode_event`].
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub events: Vec<u8>,
    pub response: Option<Response>,
    pub chaincode_id: Option<ChaincodeId>,
}

impl ChaincodeAction {
    /// Decode the event emitted by the chaincode, if any.
    pub fn chaincode_event(&self) -> Result<Option<ChaincodeEvent>, DecodeError> {
        if self.events.is_empty() {
            return Ok(None);
        }
        let raw: wire::ChaincodeEvent = wire::decode(&self.events, "ChaincodeEvent")?;
        Ok(Some(ChaincodeEvent {
            chaincode_id: raw.chaincode_id,
            tx_id: raw.tx_id,
            event_name: raw.event_name,
            payload: raw.payload,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: i32,
    pub message: String,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChaincodeId {
    pub path: String,
    pub name: String,
    pub version: String,
}

/// An application-defined event emitted during chaincode execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChaincodeEvent {
    pub chaincode_id: String,
    pub tx_id: String,
    pub event_name: String,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub payload: Vec<u8>,
}
