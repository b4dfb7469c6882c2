//! # fabrichub-observability
//!
//! Structured logging and OpenTelemetry metrics for fabrichub.
//!
//! ## Built-in metrics
//! - `fabrichub.blocks_received`         : counter
//! - `fabrichub.block_decode_errors`     : counter
//! - `fabrichub.block_decode_latency_ms` : histogram
//! - `fabrichub.events_dispatched`       : counter, tagged with kind
//! - `fabrichub.chaincode_decode_errors` : counter
//! - `fabrichub.reconnects`              : counter, tagged with trigger
//!
//! ## Structured logging
//! Text or JSON logs with per-component levels, see [`LogConfig`].

pub mod metrics;
pub mod tracing_setup;

pub use metrics::{DispatchKind, HubMetrics};
pub use tracing_setup::{build_filter, init_tracing, LogConfig};
