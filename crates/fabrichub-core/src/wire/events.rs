//! `protos` package: the peer event service (`Events.Chat`).

use super::common::Block;
use super::peer::{ChaincodeEvent, Transaction};

/// `EventType` values used in [`Interest::event_type`].
pub mod event_type {
    pub const REGISTER: i32 = 0;
    pub const BLOCK: i32 = 1;
    pub const CHAINCODE: i32 = 2;
    pub const REJECTION: i32 = 3;
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ChaincodeReg {
    #[prost(string, tag = "1")]
    pub chaincode_id: String,
    #[prost(string, tag = "2")]
    pub event_name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Interest {
    #[prost(int32, tag = "1")]
    pub event_type: i32,
    /// Sole member of the `RegInfo` oneof; wire-identical as an optional field.
    #[prost(message, optional, tag = "2")]
    pub chaincode_reg_info: Option<ChaincodeReg>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Register {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<Interest>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Unregister {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<Interest>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Rejection {
    #[prost(message, optional, tag = "1")]
    pub tx: Option<Transaction>,
    #[prost(string, tag = "2")]
    pub error_msg: String,
}

/// Outbound envelope: `event_bytes` is a serialized [`Event`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct SignedEvent {
    #[prost(bytes = "vec", tag = "1")]
    pub signature: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub event_bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Event {
    #[prost(oneof = "event::Event", tags = "1, 2, 3, 4, 5")]
    pub event: Option<event::Event>,
    #[prost(bytes = "vec", tag = "6")]
    pub creator: Vec<u8>,
    #[prost(message, optional, tag = "8")]
    pub timestamp: Option<prost_types::Timestamp>,
}

pub mod event {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        Register(super::Register),
        #[prost(message, tag = "2")]
        Block(super::Block),
        #[prost(message, tag = "3")]
        ChaincodeEvent(super::ChaincodeEvent),
        #[prost(message, tag = "4")]
        Rejection(super::Rejection),
        #[prost(message, tag = "5")]
        Unregister(super::Unregister),
    }
}
