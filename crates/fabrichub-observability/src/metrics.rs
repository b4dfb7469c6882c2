//! Event hub metrics definitions.
//!
//! Instruments are created from a caller-supplied OpenTelemetry `Meter`, so
//! exporting is left to whichever provider the application installs.

use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Which registry a dispatched event went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Block,
    Transaction,
    Chaincode,
}

impl DispatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Transaction => "transaction",
            Self::Chaincode => "chaincode",
        }
    }
}

/// Metrics handle attached to an event hub.
#[derive(Clone)]
pub struct HubMetrics {
    pub blocks_received: Counter<u64>,
    pub block_decode_errors: Counter<u64>,
    pub block_decode_latency_ms: Histogram<f64>,
    pub events_dispatched: Counter<u64>,
    pub chaincode_decode_errors: Counter<u64>,
    pub reconnects: Counter<u64>,
}

impl HubMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            blocks_received: meter
                .u64_counter("fabrichub.blocks_received")
                .with_description("Blocks received from the peer event stream")
                .init(),
            block_decode_errors: meter
                .u64_counter("fabrichub.block_decode_errors")
                .with_description("Blocks skipped because they failed to decode")
                .init(),
            block_decode_latency_ms: meter
                .f64_histogram("fabrichub.block_decode_latency_ms")
                .with_description("Time to decode one block in milliseconds")
                .init(),
            events_dispatched: meter
                .u64_counter("fabrichub.events_dispatched")
                .with_description("Listener invocations, by registry kind")
                .init(),
            chaincode_decode_errors: meter
                .u64_counter("fabrichub.chaincode_decode_errors")
                .with_description("Chaincode events that failed to decode")
                .init(),
            reconnects: meter
                .u64_counter("fabrichub.reconnects")
                .with_description("Connection attempts after the first")
                .init(),
        }
    }

    pub fn record_block(&self, latency_ms: f64) {
        self.blocks_received.add(1, &[]);
        self.block_decode_latency_ms.record(latency_ms, &[]);
    }

    pub fn record_block_error(&self, error_type: &str) {
        self.block_decode_errors
            .add(1, &[KeyValue::new("error_type", error_type.to_string())]);
    }

    pub fn record_dispatch(&self, kind: DispatchKind, count: u64) {
        if count > 0 {
            self.events_dispatched
                .add(count, &[KeyValue::new("kind", kind.as_str())]);
        }
    }

    pub fn record_chaincode_error(&self) {
        self.chaincode_decode_errors.add(1, &[]);
    }

    pub fn record_reconnect(&self, trigger: &'static str) {
        self.reconnects.add(1, &[KeyValue::new("trigger", trigger)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_against_the_global_noop_meter() {
        let meter = opentelemetry::global::meter("fabrichub-test");
        let metrics = HubMetrics::new(&meter);
        metrics.record_block(1.5);
        metrics.record_block_error("malformed");
        metrics.record_dispatch(DispatchKind::Chaincode, 2);
        metrics.record_dispatch(DispatchKind::Block, 0);
        metrics.record_chaincode_error();
        metrics.record_reconnect("registration");
    }

    #[test]
    fn dispatch_kind_labels() {
        assert_eq!(DispatchKind::Transaction.as_str(), "transaction");
    }
}
