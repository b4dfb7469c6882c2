//! `BlockDecoder`: the entry point from raw block bytes to a typed [`Block`].

use chrono::{DateTime, Utc};
use fabrichub_core::{
    wire, Block, BlockHeader, BlockMetadata, ChannelHeader, DecodeError, Decoded, Envelope,
    Header, HeaderType, Payload, PayloadData, SerializedIdentity, SignatureHeader,
};
use tracing::debug;

use crate::config::{decode_config_envelope, decode_config_update_envelope};
use crate::context::DecodeContext;
use crate::transaction::decode_transaction;

/// Stateless block decoder. Cheap to copy, safe to share across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockDecoder;

impl BlockDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a serialized `common.Block`.
    pub fn decode(&self, raw: &[u8]) -> Result<Decoded<Block>, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::InvalidInput {
                reason: "block bytes are empty".into(),
            });
        }
        let block: wire::Block = wire::decode(raw, "Block")?;
        self.decode_message(&block)
    }

    /// Decode an already-parsed wire block, as delivered by the event service.
    pub fn decode_message(&self, block: &wire::Block) -> Result<Decoded<Block>, DecodeError> {
        let header = block.header.as_ref().ok_or(DecodeError::MissingField {
            field: "Block.header",
        })?;

        let mut ctx = DecodeContext::default();
        let data = match &block.data {
            Some(d) => d
                .data
                .iter()
                .map(|bytes| decode_envelope_bytes(bytes, &mut ctx))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let decoded = Block {
            header: BlockHeader {
                number: header.number,
                previous_hash: header.previous_hash.clone(),
                data_hash: header.data_hash.clone(),
            },
            data,
            metadata: BlockMetadata {
                entries: block
                    .metadata
                    .as_ref()
                    .map(|m| m.metadata.clone())
                    .unwrap_or_default(),
            },
        };

        debug!(
            block = decoded.number(),
            envelopes = decoded.tx_count(),
            diagnostics = ctx.diagnostics.len(),
            "block decoded"
        );

        Ok(Decoded {
            value: decoded,
            diagnostics: ctx.diagnostics,
        })
    }

    /// Decode a single serialized `common.Envelope` outside of a block.
    pub fn decode_envelope(&self, raw: &[u8]) -> Result<Decoded<Envelope>, DecodeError> {
        let mut ctx = DecodeContext::default();
        let value = decode_envelope_bytes(raw, &mut ctx)?;
        Ok(Decoded {
            value,
            diagnostics: ctx.diagnostics,
        })
    }
}

/// Shorthand for `BlockDecoder.decode(raw)`.
pub fn decode_block(raw: &[u8]) -> Result<Decoded<Block>, DecodeError> {
    BlockDecoder.decode(raw)
}

/// Shorthand for `BlockDecoder.decode_message(block)`.
pub fn decode_block_message(block: &wire::Block) -> Result<Decoded<Block>, DecodeError> {
    BlockDecoder.decode_message(block)
}

fn decode_envelope_bytes(bytes: &[u8], ctx: &mut DecodeContext) -> Result<Envelope, DecodeError> {
    let envelope: wire::Envelope = wire::decode(bytes, "Envelope")?;
    decode_envelope_message(&envelope, ctx)
}

pub(crate) fn decode_envelope_message(
    envelope: &wire::Envelope,
    ctx: &mut DecodeContext,
) -> Result<Envelope, DecodeError> {
    ctx.enter_envelope()?;
    let payload = decode_payload(&envelope.payload, ctx);
    ctx.leave_envelope();
    Ok(Envelope {
        payload: payload?,
        signature: envelope.signature.clone(),
    })
}

fn decode_payload(bytes: &[u8], ctx: &mut DecodeContext) -> Result<Payload, DecodeError> {
    let raw: wire::Payload = wire::decode(bytes, "Payload")?;
    let header = raw.header.as_ref().ok_or(DecodeError::MissingField {
        field: "Payload.header",
    })?;

    let channel_header = decode_channel_header(&header.channel_header)?;
    let signature_header = decode_signature_header(&header.signature_header)?;

    let data = match channel_header.header_type {
        HeaderType::Config => PayloadData::Config(decode_config_envelope(&raw.data, ctx)?),
        HeaderType::ConfigUpdate => {
            PayloadData::ConfigUpdate(decode_config_update_envelope(&raw.data, ctx)?)
        }
        HeaderType::EndorserTransaction => PayloadData::Transaction(decode_transaction(&raw.data)?),
        _ => PayloadData::Raw(raw.data),
    };

    Ok(Payload {
        header: Header {
            channel_header,
            signature_header,
        },
        data,
    })
}

fn decode_channel_header(bytes: &[u8]) -> Result<ChannelHeader, DecodeError> {
    let raw: wire::ChannelHeader = wire::decode(bytes, "ChannelHeader")?;
    Ok(ChannelHeader {
        header_type: HeaderType::from(raw.r#type),
        version: raw.version,
        timestamp: raw.timestamp.as_ref().and_then(to_datetime),
        channel_id: raw.channel_id,
        tx_id: raw.tx_id,
        epoch: raw.epoch,
        extension: raw.extension,
    })
}

pub(crate) fn decode_signature_header(bytes: &[u8]) -> Result<SignatureHeader, DecodeError> {
    let raw: wire::SignatureHeader = wire::decode(bytes, "SignatureHeader")?;
    let creator: wire::SerializedIdentity = wire::decode(&raw.creator, "SerializedIdentity")?;
    Ok(SignatureHeader {
        creator: SerializedIdentity {
            mspid: creator.mspid,
            id_bytes: creator.id_bytes,
        },
        nonce: raw.nonce,
    })
}

// Out-of-range timestamps are dropped rather than failing the block.
fn to_datetime(ts: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    fn envelope(header_type: i32, tx_id: &str, data: Vec<u8>) -> wire::Envelope {
        let channel_header = wire::ChannelHeader {
            r#type: header_type,
            version: 1,
            timestamp: Some(prost_types::Timestamp {
                seconds: 1_700_000_000,
                nanos: 5,
            }),
            channel_id: "mychannel".into(),
            tx_id: tx_id.into(),
            epoch: 0,
            extension: vec![],
        };
        let payload = wire::Payload {
            header: Some(wire::Header {
                channel_header: channel_header.encode_to_vec(),
                signature_header: wire::SignatureHeader::default().encode_to_vec(),
            }),
            data,
        };
        wire::Envelope {
            payload: payload.encode_to_vec(),
            signature: vec![0x51],
        }
    }

    fn block_of(envelopes: Vec<wire::Envelope>) -> wire::Block {
        wire::Block {
            header: Some(wire::BlockHeader {
                number: 7,
                previous_hash: vec![1],
                data_hash: vec![2],
            }),
            data: Some(wire::BlockData {
                data: envelopes.iter().map(Message::encode_to_vec).collect(),
            }),
            metadata: Some(wire::BlockMetadata {
                metadata: vec![vec![], vec![0, 0]],
            }),
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = BlockDecoder.decode(&[]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput { .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = decode_block(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { message: "Block", .. }));
    }

    #[test]
    fn block_without_header_is_rejected() {
        let bytes = wire::Block {
            header: None,
            data: Some(wire::BlockData { data: vec![] }),
            metadata: None,
        }
        .encode_to_vec();
        let err = BlockDecoder.decode(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "Block.header" }));
    }

    #[test]
    fn unknown_header_types_stay_raw() {
        let block = block_of(vec![
            envelope(0, "msg", b"opaque".to_vec()),
            envelope(42, "future", vec![9, 9]),
        ]);
        let decoded = BlockDecoder.decode_message(&block).unwrap();
        let b = decoded.value;
        assert_eq!(b.number(), 7);
        assert_eq!(b.tx_count(), 2);
        assert_eq!(b.data[0].payload.data, PayloadData::Raw(b"opaque".to_vec()));
        assert_eq!(b.data[1].header_type(), HeaderType::Unknown(42));
        assert_eq!(b.data[1].tx_id(), "future");
        assert_eq!(b.data[0].channel_id(), "mychannel");
        assert_eq!(b.metadata.transactions_filter(), &[0, 0]);
        let ts = b.data[0].payload.header.channel_header.timestamp.unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn envelope_without_payload_header_fails_the_block() {
        let bad = wire::Envelope {
            payload: wire::Payload {
                header: None,
                data: vec![1],
            }
            .encode_to_vec(),
            signature: vec![],
        };
        let block = block_of(vec![envelope(0, "ok", vec![]), bad]);
        let err = BlockDecoder.decode_message(&block).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "Payload.header" }));
    }

    #[test]
    fn negative_nanos_drop_the_timestamp() {
        let ts = prost_types::Timestamp {
            seconds: 10,
            nanos: -1,
        };
        assert!(to_datetime(&ts).is_none());
    }

    #[test]
    fn standalone_envelope() {
        let env = envelope(0, "solo", vec![]).encode_to_vec();
        let decoded = BlockDecoder.decode_envelope(&env).unwrap();
        assert_eq!(decoded.value.tx_id(), "solo");
        assert_eq!(decoded.value.signature, vec![0x51]);
    }
}
