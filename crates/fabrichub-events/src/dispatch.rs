//! Fan-out of one decoded block to the three registries.

use fabrichub_core::{Block, TxValidationCode};
use fabrichub_observability::{DispatchKind, HubMetrics};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::{Registries, TxStatus};

/// How many listener invocations each pass made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DispatchCounts {
    pub blocks: u64,
    pub transactions: u64,
    pub chaincodes: u64,
}

/// Run all three passes for `block`. Every pass runs regardless of what the
/// others found or failed on.
pub(crate) fn dispatch_block(
    registries: &Registries,
    block: &Arc<Block>,
    metrics: Option<&HubMetrics>,
) -> DispatchCounts {
    let counts = DispatchCounts {
        blocks: block_pass(registries, block),
        transactions: transaction_pass(registries, block),
        chaincodes: chaincode_pass(registries, block, metrics),
    };

    debug!(
        block = block.number(),
        block_listeners = counts.blocks,
        tx_listeners = counts.transactions,
        chaincode_listeners = counts.chaincodes,
        "block dispatched"
    );
    if let Some(m) = metrics {
        m.record_dispatch(DispatchKind::Block, counts.blocks);
        m.record_dispatch(DispatchKind::Transaction, counts.transactions);
        m.record_dispatch(DispatchKind::Chaincode, counts.chaincodes);
    }
    counts
}

fn block_pass(registries: &Registries, block: &Arc<Block>) -> u64 {
    let listeners = registries.block_listeners();
    for listener in &listeners {
        listener.deliver(Arc::clone(block));
    }
    listeners.len() as u64
}

fn transaction_pass(registries: &Registries, block: &Block) -> u64 {
    if !registries.has_tx_listeners() {
        return 0;
    }
    let mut delivered = 0;
    for (tx_id, validation_code) in block.transaction_statuses() {
        if tx_id.is_empty() {
            continue;
        }
        let Some(listener) = registries.tx_listener(tx_id) else {
            continue;
        };
        if validation_code == TxValidationCode::NotValidated {
            debug!(tx_id, block = block.number(), "no validation code recorded for transaction");
        }
        listener.deliver(TxStatus {
            tx_id: tx_id.to_string(),
            validation_code,
            block_number: block.number(),
        });
        delivered += 1;
    }
    delivered
}

fn chaincode_pass(registries: &Registries, block: &Block, metrics: Option<&HubMetrics>) -> u64 {
    if !registries.has_chaincode_listeners() {
        return 0;
    }
    let mut delivered = 0;
    for envelope in &block.data {
        let Some(tx) = envelope.transaction() else {
            continue;
        };
        for event in tx.chaincode_events() {
            let event = match event {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        tx_id = envelope.tx_id(),
                        block = block.number(),
                        error = %e,
                        "skipping undecodable chaincode event"
                    );
                    if let Some(m) = metrics {
                        m.record_chaincode_error();
                    }
                    break;
                }
            };
            for listener in registries.chaincode_matches(&event.chaincode_id, &event.event_name) {
                listener.deliver(event.clone());
                delivered += 1;
            }
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::Listener;
    use fabrichub_core::wire;
    use prost::Message;
    use regex::Regex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(tx_id: &str, events: Vec<u8>) -> Vec<u8> {
        let action = wire::ChaincodeAction {
            events,
            ..Default::default()
        };
        let payload = wire::ChaincodeActionPayload {
            chaincode_proposal_payload: vec![],
            action: Some(wire::ChaincodeEndorsedAction {
                proposal_response_payload: wire::ProposalResponsePayload {
                    proposal_hash: vec![],
                    extension: action.encode_to_vec(),
                }
                .encode_to_vec(),
                endorsements: vec![],
            }),
        };
        let tx = wire::Transaction {
            actions: vec![wire::TransactionAction {
                header: vec![],
                payload: payload.encode_to_vec(),
            }],
        };
        wire::Envelope {
            payload: wire::Payload {
                header: Some(wire::Header {
                    channel_header: wire::ChannelHeader {
                        r#type: 3,
                        tx_id: tx_id.into(),
                        ..Default::default()
                    }
                    .encode_to_vec(),
                    signature_header: vec![],
                }),
                data: tx.encode_to_vec(),
            }
            .encode_to_vec(),
            signature: vec![],
        }
        .encode_to_vec()
    }

    fn event(name: &str) -> Vec<u8> {
        wire::ChaincodeEvent {
            chaincode_id: "mycc".into(),
            tx_id: String::new(),
            event_name: name.into(),
            payload: vec![],
        }
        .encode_to_vec()
    }

    fn decoded(envelopes: Vec<Vec<u8>>, filter: Vec<u8>) -> Arc<Block> {
        let raw = wire::Block {
            header: Some(wire::BlockHeader {
                number: 5,
                ..Default::default()
            }),
            data: Some(wire::BlockData { data: envelopes }),
            metadata: Some(wire::BlockMetadata {
                metadata: vec![vec![], filter],
            }),
        };
        Arc::new(fabrichub_decode::decode_block_message(&raw).unwrap().into_value())
    }

    #[test]
    fn bad_chaincode_event_does_not_stop_other_passes() {
        let registries = Registries::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        registries.add_block(Listener::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = Arc::clone(&hits);
        registries.add_tx(
            "tx2".into(),
            Listener::new(move |status: TxStatus| {
                assert_eq!(status.validation_code, TxValidationCode::NotValidated);
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let h = Arc::clone(&hits);
        registries.add_chaincode(
            "mycc".into(),
            Regex::new(".*").unwrap(),
            Listener::new(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let block = decoded(
            vec![envelope("tx1", vec![0x0a, 0x7f]), envelope("tx2", event("ok"))],
            vec![0],
        );
        let counts = dispatch_block(&registries, &block, None);
        assert_eq!(
            counts,
            DispatchCounts {
                blocks: 1,
                transactions: 1,
                chaincodes: 1,
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_registries_dispatch_nothing() {
        let block = decoded(vec![envelope("tx1", event("evt"))], vec![0]);
        let counts = dispatch_block(&Registries::default(), &block, None);
        assert_eq!(counts, DispatchCounts::default());
    }
}
