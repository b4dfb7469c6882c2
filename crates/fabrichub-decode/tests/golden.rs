//! Golden block tests.
//!
//! Each test assembles a realistic block with the prost encoders, decodes
//! it through the public API and checks the decoded structure.

use fabrichub_core::{
    wire::{self, policies::signature_policy},
    DecodeError, DecodedPolicy, Diagnostic, HeaderType, ImplicitMetaRule, PayloadData,
    Principal, TxValidationCode,
};
use fabrichub_decode::{decode_block, BlockDecoder};
use prost::Message;
use std::collections::BTreeMap;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn identity(mspid: &str) -> Vec<u8> {
    wire::SerializedIdentity {
        mspid: mspid.into(),
        id_bytes: b"-----BEGIN CERTIFICATE-----".to_vec(),
    }
    .encode_to_vec()
}

fn envelope(header_type: i32, tx_id: &str, data: Vec<u8>) -> wire::Envelope {
    let channel_header = wire::ChannelHeader {
        r#type: header_type,
        version: 0,
        timestamp: Some(prost_types::Timestamp {
            seconds: 1_650_000_000,
            nanos: 0,
        }),
        channel_id: "mychannel".into(),
        tx_id: tx_id.into(),
        epoch: 0,
        extension: vec![],
    };
    wire::Envelope {
        payload: wire::Payload {
            header: Some(wire::Header {
                channel_header: channel_header.encode_to_vec(),
                signature_header: wire::SignatureHeader {
                    creator: identity("Org1MSP"),
                    nonce: vec![0xab; 24],
                }
                .encode_to_vec(),
            }),
            data,
        }
        .encode_to_vec(),
        signature: vec![0x30, 0x44],
    }
}

fn block(number: u64, envelopes: &[wire::Envelope], filter: Vec<u8>) -> Vec<u8> {
    wire::Block {
        header: Some(wire::BlockHeader {
            number,
            previous_hash: vec![0x11; 32],
            data_hash: vec![0x22; 32],
        }),
        data: Some(wire::BlockData {
            data: envelopes.iter().map(Message::encode_to_vec).collect(),
        }),
        metadata: Some(wire::BlockMetadata {
            metadata: vec![vec![], filter, vec![], vec![]],
        }),
    }
    .encode_to_vec()
}

fn implicit_meta(sub_policy: &str, rule: i32) -> wire::ConfigPolicy {
    wire::ConfigPolicy {
        version: 0,
        policy: Some(wire::Policy {
            r#type: 3,
            value: wire::ImplicitMetaPolicy {
                sub_policy: sub_policy.into(),
                rule,
            }
            .encode_to_vec(),
        }),
        mod_policy: "Admins".into(),
    }
}

fn member_signature_policy(msp: &str) -> wire::ConfigPolicy {
    let envelope = wire::SignaturePolicyEnvelope {
        version: 0,
        rule: Some(wire::SignaturePolicy {
            r#type: Some(signature_policy::Type::NOutOf(signature_policy::NOutOf {
                n: 1,
                rules: vec![wire::SignaturePolicy {
                    r#type: Some(signature_policy::Type::SignedBy(0)),
                }],
            })),
        }),
        identities: vec![wire::MspPrincipal {
            principal_classification: 0,
            principal: wire::MspRole {
                msp_identifier: msp.into(),
                role: 0,
            }
            .encode_to_vec(),
        }],
    };
    wire::ConfigPolicy {
        version: 0,
        policy: Some(wire::Policy {
            r#type: 1,
            value: envelope.encode_to_vec(),
        }),
        mod_policy: "Admins".into(),
    }
}

fn channel_config(org_policies: Vec<(&str, wire::ConfigPolicy)>) -> wire::ConfigGroup {
    let org = wire::ConfigGroup {
        version: 1,
        policies: org_policies
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        mod_policy: "Admins".into(),
        ..Default::default()
    };
    let application = wire::ConfigGroup {
        groups: BTreeMap::from([("Org1MSP".to_string(), org)]),
        policies: BTreeMap::from([
            ("Admins".to_string(), implicit_meta("Admins", 2)),
            ("Readers".to_string(), implicit_meta("Readers", 0)),
        ]),
        mod_policy: "Admins".into(),
        ..Default::default()
    };
    wire::ConfigGroup {
        groups: BTreeMap::from([("Application".to_string(), application)]),
        values: BTreeMap::from([(
            "HashingAlgorithm".to_string(),
            wire::ConfigValue {
                version: 0,
                value: b"\n\x06SHA256".to_vec(),
                mod_policy: "Admins".into(),
            },
        )]),
        policies: BTreeMap::from([("Writers".to_string(), implicit_meta("Writers", 0))]),
        mod_policy: "Admins".into(),
        ..Default::default()
    }
}

fn config_block(org_policies: Vec<(&str, wire::ConfigPolicy)>) -> Vec<u8> {
    let update = wire::ConfigUpdateEnvelope {
        config_update: wire::ConfigUpdate {
            channel_id: "mychannel".into(),
            read_set: None,
            write_set: Some(wire::ConfigGroup::default()),
        }
        .encode_to_vec(),
        signatures: vec![],
    };
    let config = wire::ConfigEnvelope {
        config: Some(wire::Config {
            sequence: 1,
            channel_group: Some(channel_config(org_policies)),
        }),
        last_update: Some(envelope(2, "", update.encode_to_vec())),
    };
    block(0, &[envelope(1, "", config.encode_to_vec())], vec![0])
}

fn endorser_tx(chaincode: &str, event: Option<(&str, &[u8])>) -> Vec<u8> {
    let events = event
        .map(|(name, payload)| {
            wire::ChaincodeEvent {
                chaincode_id: chaincode.into(),
                tx_id: String::new(),
                event_name: name.into(),
                payload: payload.to_vec(),
            }
            .encode_to_vec()
        })
        .unwrap_or_default();
    let action = wire::ChaincodeAction {
        results: vec![0x0a],
        events,
        response: Some(wire::Response {
            status: 200,
            message: String::new(),
            payload: b"ok".to_vec(),
        }),
        chaincode_id: Some(wire::ChaincodeId {
            path: String::new(),
            name: chaincode.into(),
            version: "1".into(),
        }),
    };
    let payload = wire::ChaincodeActionPayload {
        chaincode_proposal_payload: vec![],
        action: Some(wire::ChaincodeEndorsedAction {
            proposal_response_payload: wire::ProposalResponsePayload {
                proposal_hash: vec![0xcc; 32],
                extension: action.encode_to_vec(),
            }
            .encode_to_vec(),
            endorsements: vec![wire::Endorsement {
                endorser: identity("Org1MSP"),
                signature: vec![0x30],
            }],
        }),
    };
    wire::Transaction {
        actions: vec![wire::TransactionAction {
            header: wire::SignatureHeader {
                creator: identity("Org1MSP"),
                nonce: vec![1],
            }
            .encode_to_vec(),
            payload: payload.encode_to_vec(),
        }],
    }
    .encode_to_vec()
}

// ─── Config blocks ────────────────────────────────────────────────────────────

#[test]
fn config_block_decodes_policy_tree() {
    let raw = config_block(vec![("Members", member_signature_policy("Org1MSP"))]);
    let decoded = decode_block(&raw).expect("config block decodes");
    assert!(!decoded.has_warnings());

    let block = decoded.value;
    assert_eq!(block.number(), 0);
    assert_eq!(block.data[0].header_type(), HeaderType::Config);

    let PayloadData::Config(env) = &block.data[0].payload.data else {
        panic!("expected a config payload");
    };
    assert_eq!(env.config.sequence, 1);
    let root = env.config.channel_group.as_ref().unwrap();
    assert_eq!(root.policy_count(), 4);

    let app = root.group(&["Application"]).unwrap();
    match &app.policies["Admins"].policy {
        Some(DecodedPolicy::ImplicitMeta(p)) => {
            assert_eq!(p.sub_policy, "Admins");
            assert_eq!(p.rule, ImplicitMetaRule::Majority);
        }
        other => panic!("unexpected policy {other:?}"),
    }

    let org = root.group(&["Application", "Org1MSP"]).unwrap();
    match &org.policies["Members"].policy {
        Some(DecodedPolicy::Signature(sig)) => {
            assert_eq!(sig.rule.to_string(), "out_of(1, signed_by(0))");
            assert!(matches!(&sig.identities[0], Principal::Role { msp_id, .. } if msp_id == "Org1MSP"));
        }
        other => panic!("unexpected policy {other:?}"),
    }

    let last_update = env.last_update.as_ref().expect("last update kept");
    assert_eq!(last_update.header_type(), HeaderType::ConfigUpdate);
    assert!(matches!(
        &last_update.payload.data,
        PayloadData::ConfigUpdate(u) if u.config_update.channel_id == "mychannel"
    ));
}

#[test]
fn msp_policy_in_config_yields_one_diagnostic() {
    let legacy = wire::ConfigPolicy {
        version: 0,
        policy: Some(wire::Policy {
            r#type: 2,
            value: vec![0xde, 0xad],
        }),
        mod_policy: String::new(),
    };
    let raw = config_block(vec![("Legacy", legacy)]);
    let decoded = decode_block(&raw).expect("MSP policies do not fail the block");
    assert_eq!(
        decoded.diagnostics,
        vec![Diagnostic::UnsupportedPolicyType {
            name: "Channel/Application/Org1MSP/Legacy".into(),
            policy_type: 2,
        }]
    );
}

#[test]
fn unknown_policy_type_fails_the_block() {
    let unknown = wire::ConfigPolicy {
        version: 0,
        policy: Some(wire::Policy {
            r#type: 7,
            value: vec![],
        }),
        mod_policy: String::new(),
    };
    let raw = config_block(vec![("Broken", unknown)]);
    let err = decode_block(&raw).unwrap_err();
    assert!(err.is_unknown_policy_type());
    assert_eq!(
        err.to_string(),
        "Unknown policy type 7 for policy 'Channel/Application/Org1MSP/Broken'"
    );
}

// ─── Endorser blocks ──────────────────────────────────────────────────────────

#[test]
fn endorser_block_with_chaincode_events() {
    let envelopes = [
        envelope(3, "tx1", endorser_tx("basic", Some(("evtA", b"a")))),
        envelope(3, "tx2", endorser_tx("basic", None)),
        envelope(3, "tx3", endorser_tx("other", Some(("evtB", b"b")))),
    ];
    let raw = block(12, &envelopes, vec![0, 11, 0]);
    let block = decode_block(&raw).unwrap().into_value();

    assert_eq!(block.tx_count(), 3);
    let statuses: Vec<_> = block.transaction_statuses().collect();
    assert_eq!(
        statuses,
        vec![
            ("tx1", TxValidationCode::Valid),
            ("tx2", TxValidationCode::MvccReadConflict),
            ("tx3", TxValidationCode::Valid),
        ]
    );

    let tx1 = block.data[0].transaction().unwrap();
    let event = tx1.chaincode_events().next().unwrap().unwrap().unwrap();
    assert_eq!(event.chaincode_id, "basic");
    assert_eq!(event.event_name, "evtA");
    assert_eq!(event.payload, b"a");

    let tx2 = block.data[1].transaction().unwrap();
    assert!(tx2.chaincode_events().next().unwrap().unwrap().is_none());

    let creator = &block.data[2].payload.header.signature_header.creator;
    assert_eq!(creator.mspid, "Org1MSP");
}

#[test]
fn short_filter_leaves_trailing_codes_unknown() {
    let envelopes = [
        envelope(3, "a", endorser_tx("cc", None)),
        envelope(3, "b", endorser_tx("cc", None)),
    ];
    let block = decode_block(&block(1, &envelopes, vec![0]))
        .unwrap()
        .into_value();
    assert_eq!(block.validation_code(0), Some(TxValidationCode::Valid));
    assert_eq!(block.validation_code(1), None);
    assert_eq!(
        block.transaction_statuses().nth(1),
        Some(("b", TxValidationCode::NotValidated))
    );
}

// ─── Mixed and malformed input ────────────────────────────────────────────────

#[test]
fn mixed_header_types() {
    let envelopes = [
        envelope(0, "m", b"hello".to_vec()),
        envelope(3, "t", endorser_tx("cc", None)),
        envelope(5, "s", vec![1, 2, 3]),
        envelope(99, "x", vec![4]),
    ];
    let block = decode_block(&block(3, &envelopes, vec![0, 0, 0, 0]))
        .unwrap()
        .into_value();
    let kinds: Vec<_> = block.data.iter().map(|e| e.header_type()).collect();
    assert_eq!(
        kinds,
        vec![
            HeaderType::Message,
            HeaderType::EndorserTransaction,
            HeaderType::DeliverSeekInfo,
            HeaderType::Unknown(99),
        ]
    );
    assert_eq!(block.data[0].payload.data, PayloadData::Raw(b"hello".to_vec()));
    assert!(block.data[3].transaction().is_none());
}

#[test]
fn corrupt_transaction_fails_the_block() {
    let envelopes = [
        envelope(3, "ok", endorser_tx("cc", None)),
        envelope(3, "bad", vec![0xff, 0xff]),
    ];
    let err = decode_block(&block(4, &envelopes, vec![0, 0])).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed { message: "Transaction", .. }));
}

#[test]
fn empty_and_non_block_input() {
    assert!(matches!(decode_block(&[]), Err(DecodeError::InvalidInput { .. })));
    assert!(decode_block(b"definitely not a block").is_err());
}

#[test]
fn decoding_is_deterministic() {
    let raw = config_block(vec![
        ("Members", member_signature_policy("Org1MSP")),
        ("Peers", member_signature_policy("Org1MSP")),
    ]);
    let decoder = BlockDecoder::new();
    let a = decoder.decode(&raw).unwrap();
    let b = decoder.decode(&raw).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a.value).unwrap(),
        serde_json::to_string(&b.value).unwrap()
    );
}
