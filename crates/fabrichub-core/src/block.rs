//! Decoded block, envelope and header types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::config::{ConfigEnvelope, ConfigUpdateEnvelope};
use crate::transaction::Transaction;

/// A fully decoded ledger block. Immutable once produced by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub header: BlockHeader,
    pub data: Vec<Envelope>,
    pub metadata: BlockMetadata,
}

impl Block {
    /// Block number.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Number of envelopes in the block.
    pub fn tx_count(&self) -> usize {
        self.data.len()
    }

    /// Validation code recorded for the `index`-th envelope, if the
    /// transactions filter covers it.
    pub fn validation_code(&self, index: usize) -> Option<TxValidationCode> {
        self.metadata
            .transactions_filter()
            .get(index)
            .map(|b| TxValidationCode::from(*b))
    }

    /// `(tx_id, validation_code)` for each envelope, in block order.
    /// Entries the filter does not cover are reported as `NotValidated`.
    pub fn transaction_statuses(&self) -> impl Iterator<Item = (&str, TxValidationCode)> + '_ {
        self.data.iter().enumerate().map(|(i, env)| {
            (
                env.tx_id(),
                self.validation_code(i)
                    .unwrap_or(TxValidationCode::NotValidated),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub number: u64,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub previous_hash: Vec<u8>,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub data_hash: Vec<u8>,
}

/// Fixed positions in the block metadata array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMetadataIndex {
    Signatures = 0,
    TransactionsFilter = 1,
    LastConfig = 2,
    Orderer = 3,
}

/// Block metadata, retained verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BlockMetadata {
    #[serde(serialize_with = "crate::hexser::serialize_vec")]
    pub entries: Vec<Vec<u8>>,
}

impl BlockMetadata {
    pub fn get(&self, index: BlockMetadataIndex) -> Option<&[u8]> {
        self.entries.get(index as usize).map(Vec::as_slice)
    }

    /// The per-transaction validation-code array (one byte per envelope).
    /// Empty if the block carries no filter.
    pub fn transactions_filter(&self) -> &[u8] {
        self.get(BlockMetadataIndex::TransactionsFilter)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub payload: Payload,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub signature: Vec<u8>,
}

impl Envelope {
    pub fn tx_id(&self) -> &str {
        &self.payload.header.channel_header.tx_id
    }

    pub fn channel_id(&self) -> &str {
        &self.payload.header.channel_header.channel_id
    }

    pub fn header_type(&self) -> HeaderType {
        self.payload.header.channel_header.header_type
    }

    /// The decoded endorser transaction, if this envelope carries one.
    pub fn transaction(&self) -> Option<&Transaction> {
        match &self.payload.data {
            PayloadData::Transaction(tx) => Some(tx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub header: Header,
    pub data: PayloadData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub channel_header: ChannelHeader,
    pub signature_header: SignatureHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHeader {
    pub header_type: HeaderType,
    pub version: i32,
    pub timestamp: Option<DateTime<Utc>>,
    pub channel_id: String,
    pub tx_id: String,
    pub epoch: u64,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub extension: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SignatureHeader {
    pub creator: SerializedIdentity,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub nonce: Vec<u8>,
}

/// An MSP identity: the MSP id plus its (PEM) certificate bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SerializedIdentity {
    pub mspid: String,
    #[serde(serialize_with = "crate::hexser::serialize")]
    pub id_bytes: Vec<u8>,
}

/// The payload body, decoded according to the channel header type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PayloadData {
    Config(ConfigEnvelope),
    ConfigUpdate(ConfigUpdateEnvelope),
    Transaction(Transaction),
    /// Header types this library does not interpret, kept undecoded.
    Raw(#[serde(serialize_with = "crate::hexser::serialize")] Vec<u8>),
}

/// `common.HeaderType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderType {
    Message,
    Config,
    ConfigUpdate,
    EndorserTransaction,
    OrdererTransaction,
    DeliverSeekInfo,
    ChaincodePackage,
    PeerAdminOperation,
    Unknown(i32),
}

impl From<i32> for HeaderType {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Message,
            1 => Self::Config,
            2 => Self::ConfigUpdate,
            3 => Self::EndorserTransaction,
            4 => Self::OrdererTransaction,
            5 => Self::DeliverSeekInfo,
            6 => Self::ChaincodePackage,
            8 => Self::PeerAdminOperation,
            other => Self::Unknown(other),
        }
    }
}

impl HeaderType {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Message => 0,
            Self::Config => 1,
            Self::ConfigUpdate => 2,
            Self::EndorserTransaction => 3,
            Self::OrdererTransaction => 4,
            Self::DeliverSeekInfo => 5,
            Self::ChaincodePackage => 6,
            Self::PeerAdminOperation => 8,
            Self::Unknown(v) => v,
        }
    }
}

/// `protos.TxValidationCode`, one byte per transaction in the block filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxValidationCode {
    Valid,
    NilEnvelope,
    BadPayload,
    BadCommonHeader,
    BadCreatorSignature,
    InvalidEndorserTransaction,
    InvalidConfigTransaction,
    UnsupportedTxPayload,
    BadProposalTxid,
    DuplicateTxid,
    EndorsementPolicyFailure,
    MvccReadConflict,
    PhantomReadConflict,
    UnknownTxType,
    TargetChainNotFound,
    MarshalTxError,
    NilTxaction,
    ExpiredChaincode,
    ChaincodeVersionConflict,
    BadHeaderExtension,
    BadChannelHeader,
    BadResponsePayload,
    BadRwset,
    IllegalWriteset,
    InvalidWriteset,
    NotValidated,
    InvalidOtherReason,
    Other(u8),
}

impl From<u8> for TxValidationCode {
    fn from(v: u8) -> Self {
        use TxValidationCode::*;
        match v {
            0 => Valid,
            1 => NilEnvelope,
            2 => BadPayload,
            3 => BadCommonHeader,
            4 => BadCreatorSignature,
            5 => InvalidEndorserTransaction,
            6 => InvalidConfigTransaction,
            7 => UnsupportedTxPayload,
            8 => BadProposalTxid,
            9 => DuplicateTxid,
            10 => EndorsementPolicyFailure,
            11 => MvccReadConflict,
            12 => PhantomReadConflict,
            13 => UnknownTxType,
            14 => TargetChainNotFound,
            15 => MarshalTxError,
            16 => NilTxaction,
            17 => ExpiredChaincode,
            18 => ChaincodeVersionConflict,
            19 => BadHeaderExtension,
            20 => BadChannelHeader,
            21 => BadResponsePayload,
            22 => BadRwset,
            23 => IllegalWriteset,
            24 => InvalidWriteset,
            254 => NotValidated,
            255 => InvalidOtherReason,
            other => Other(other),
        }
    }
}

impl TxValidationCode {
    pub fn as_u8(self) -> u8 {
        use TxValidationCode::*;
        match self {
            Valid => 0,
            NilEnvelope => 1,
            BadPayload => 2,
            BadCommonHeader => 3,
            BadCreatorSignature => 4,
            InvalidEndorserTransaction => 5,
            InvalidConfigTransaction => 6,
            UnsupportedTxPayload => 7,
            BadProposalTxid => 8,
            DuplicateTxid => 9,
            EndorsementPolicyFailure => 10,
            MvccReadConflict => 11,
            PhantomReadConflict => 12,
            UnknownTxType => 13,
            TargetChainNotFound => 14,
            MarshalTxError => 15,
            NilTxaction => 16,
            ExpiredChaincode => 17,
            ChaincodeVersionConflict => 18,
            BadHeaderExtension => 19,
            BadChannelHeader => 20,
            BadResponsePayload => 21,
            BadRwset => 22,
            IllegalWriteset => 23,
            InvalidWriteset => 24,
            NotValidated => 254,
            InvalidOtherReason => 255,
            Other(v) => v,
        }
    }

    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl fmt::Display for TxValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(v) => write!(f, "UNKNOWN({v})"),
            known => write!(f, "{known:?}({})", known.as_u8()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_keep_their_wire_value() {
        for b in [0u8, 11, 24, 254, 255, 77] {
            assert_eq!(TxValidationCode::from(b).as_u8(), b);
        }
        assert_eq!(TxValidationCode::from(77), TxValidationCode::Other(77));
        assert!(TxValidationCode::from(0).is_valid());
    }

    #[test]
    fn header_type_unknown_is_preserved() {
        assert_eq!(HeaderType::from(3), HeaderType::EndorserTransaction);
        assert_eq!(HeaderType::from(42), HeaderType::Unknown(42));
        assert_eq!(HeaderType::from(42).as_i32(), 42);
    }

    #[test]
    fn transactions_filter_reads_index_one() {
        let meta = BlockMetadata {
            entries: vec![vec![9, 9], vec![0, 11, 0]],
        };
        assert_eq!(meta.transactions_filter(), &[0, 11, 0]);
        assert!(meta.get(BlockMetadataIndex::Orderer).is_none());
        assert!(BlockMetadata::default().transactions_filter().is_empty());
    }
}
