//! Endorser-transaction decoder.
//!
//! `Transaction → TransactionAction[] → ChaincodeActionPayload →
//! ChaincodeEndorsedAction → ProposalResponsePayload → ChaincodeAction`.
//! The chaincode event inside `ChaincodeAction.events` stays encoded; the
//! event hub decodes it per envelope.

use fabrichub_core::{
    wire, ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeId,
    DecodeError, Endorsement, ProposalResponsePayload, Response, Transaction, TransactionAction,
};

use crate::block::decode_signature_header;

pub(crate) fn decode_transaction(bytes: &[u8]) -> Result<Transaction, DecodeError> {
    let raw: wire::Transaction = wire::decode(bytes, "Transaction")?;
    let actions = raw
        .actions
        .iter()
        .map(decode_action)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Transaction { actions })
}

fn decode_action(raw: &wire::TransactionAction) -> Result<TransactionAction, DecodeError> {
    Ok(TransactionAction {
        header: decode_signature_header(&raw.header)?,
        payload: decode_action_payload(&raw.payload)?,
    })
}

fn decode_action_payload(bytes: &[u8]) -> Result<ChaincodeActionPayload, DecodeError> {
    let raw: wire::ChaincodeActionPayload = wire::decode(bytes, "ChaincodeActionPayload")?;
    let endorsed = raw.action.ok_or(DecodeError::MissingField {
        field: "ChaincodeActionPayload.action",
    })?;

    let prp: wire::ProposalResponsePayload =
        wire::decode(&endorsed.proposal_response_payload, "ProposalResponsePayload")?;
    let action: wire::ChaincodeAction = wire::decode(&prp.extension, "ChaincodeAction")?;

    Ok(ChaincodeActionPayload {
        chaincode_proposal_payload: raw.chaincode_proposal_payload,
        action: ChaincodeEndorsedAction {
            proposal_response_payload: ProposalResponsePayload {
                proposal_hash: prp.proposal_hash,
                extension: convert_chaincode_action(action),
            },
            endorsements: endorsed
                .endorsements
                .into_iter()
                .map(|e| Endorsement {
                    endorser: e.endorser,
                    signature: e.signature,
                })
                .collect(),
        },
    })
}

fn convert_chaincode_action(raw: wire::ChaincodeAction) -> ChaincodeAction {
    ChaincodeAction {
        results: raw.results,
        events: raw.events,
        response: raw.response.map(|r| Response {
            status: r.status,
            message: r.message,
            payload: r.payload,
        }),
        chaincode_id: raw.chaincode_id.map(|c| ChaincodeId {
            path: c.path,
            name: c.name,
            version: c.version,
        }),
    }
}
