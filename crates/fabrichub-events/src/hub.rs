//! `EventHub`: one event-service stream to one peer, plus the registries fed
//! by it.
//!
//! ## Connection lifecycle
//! ```text
//!             connect()/force_connect()           Register ack or Block
//! Disconnected ───────────────────────▶ Connecting ───────────────────▶ Connected
//!      ▲                                    │                               │
//!      └────── disconnect() / stream end / stream error / ack timeout ◀─────┘
//! ```
//! Each opened stream gets a generation number. Terminal signals from a
//! stream that is no longer current are ignored.

use fabrichub_core::{wire, Block, ChaincodeEvent, SigningIdentity};
use fabrichub_decode::BlockDecoder;
use fabrichub_observability::HubMetrics;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use prost::Message;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Instant, SystemTime};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::HubConfig;
use crate::dispatch::dispatch_block;
use crate::error::{ConnectionError, HubError};
use crate::grpc::GrpcEventTransport;
use crate::listener::Listener;
use crate::registry::{
    BlockRegistration, ChaincodeRegistration, Registries, RegistryCounts, TxStatus,
};
use crate::transport::{EventStream, EventTransport, HealthStatus, InboundStream};

/// Connection state of an [`EventHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Event hub for a single peer.
///
/// Cheap to clone; clones share the connection and the registries.
///
/// # Usage
/// ```no_run
/// # async fn example(identity: std::sync::Arc<dyn fabrichub_core::SigningIdentity>) -> Result<(), fabrichub_events::HubError> {
/// use fabrichub_events::{EventHub, HubConfig, Listener};
///
/// let hub = EventHub::new(HubConfig::for_peer("grpcs://peer0.org1:7053"), identity);
/// hub.connect().await?;
/// let (listener, mut sub) = Listener::channel();
/// hub.register_tx_event("4f1c...", listener)?;
/// if let Some(status) = sub.next().await {
///     println!("{} committed as {}", status.tx_id, status.validation_code);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    identity: Arc<dyn SigningIdentity>,
    transport: Mutex<Option<Arc<dyn EventTransport>>>,
    metrics: RwLock<Option<HubMetrics>>,
    registries: Registries,
    decoder: BlockDecoder,
    conn: Mutex<ConnSlot>,
    attempts: AtomicU64,
}

struct ConnSlot {
    state: ConnectionState,
    generation: u64,
    stream: Option<LiveStream>,
    last_error: Option<HubError>,
}

struct LiveStream {
    outbound: mpsc::Sender<wire::SignedEvent>,
    reader: JoinHandle<()>,
}

impl LiveStream {
    /// Stop reading; dropping `outbound` ends the request side.
    fn close(self) {
        self.reader.abort();
    }
}

impl EventHub {
    pub fn new(config: HubConfig, identity: Arc<dyn SigningIdentity>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config,
                identity,
                transport: Mutex::new(None),
                metrics: RwLock::new(None),
                registries: Registries::default(),
                decoder: BlockDecoder::new(),
                conn: Mutex::new(ConnSlot {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    stream: None,
                    last_error: None,
                }),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Record hub activity into `metrics`.
    pub fn with_metrics(self, metrics: HubMetrics) -> Self {
        *self.inner.metrics.write() = Some(metrics);
        self
    }

    /// Point the hub at a peer's event service. Takes effect on the next connect.
    pub fn set_peer_addr(&self, peer_url: impl Into<String>) {
        let transport = GrpcEventTransport::from_config(peer_url, &self.inner.config);
        *self.inner.transport.lock() = Some(Arc::new(transport));
    }

    /// Use a custom transport. Takes effect on the next connect.
    pub fn set_transport(&self, transport: Arc<dyn EventTransport>) {
        *self.inner.transport.lock() = Some(transport);
    }

    /// Endpoint of the configured peer, if any.
    pub fn peer_addr(&self) -> Option<String> {
        if let Some(t) = self.inner.transport.lock().as_ref() {
            return Some(t.endpoint().to_string());
        }
        self.inner.config.peer_url.clone()
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.conn.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Live registrations per registry.
    pub fn registration_counts(&self) -> RegistryCounts {
        self.inner.registries.counts()
    }

    /// Connect unless already connected to a healthy transport.
    pub async fn connect(&self) -> Result<(), HubError> {
        self.inner.connect(false, None).await
    }

    /// Tear down any existing stream and connect again.
    pub async fn force_connect(&self) -> Result<(), HubError> {
        self.inner.connect(true, None).await
    }

    /// Drop the connection and every registration. Each listener with an
    /// error callback receives [`HubError::Shutdown`]. Idempotent, and safe to
    /// call from inside any listener callback.
    pub fn disconnect(&self) {
        self.inner.close(HubError::Shutdown, None);
    }

    /// Receive every block delivered by the peer.
    ///
    /// Unless the hub is connected, a listener without an error callback is
    /// rejected with [`ConnectionError::NotConnected`]. One with an error
    /// callback is accepted, and on a disconnected hub a reconnect is started
    /// in the background.
    pub fn register_block_event(
        &self,
        listener: Listener<Arc<Block>>,
    ) -> Result<BlockRegistration, HubError> {
        let reconnect = self.admit(listener.has_error_handler())?;
        let registration = self.inner.registries.add_block(listener);
        debug!(%registration, "block listener registered");
        if reconnect {
            self.spawn_reconnect();
        }
        Ok(registration)
    }

    /// Returns `false` if the registration was already gone.
    pub fn unregister_block_event(&self, registration: &BlockRegistration) -> bool {
        self.inner.registries.remove_block(registration)
    }

    /// Receive the validation outcome of transaction `tx_id`. A second
    /// registration for the same id replaces the first.
    pub fn register_tx_event(
        &self,
        tx_id: impl Into<String>,
        listener: Listener<TxStatus>,
    ) -> Result<(), HubError> {
        let tx_id = tx_id.into();
        if tx_id.is_empty() {
            return Err(HubError::input("transaction id must not be empty"));
        }
        let reconnect = self.admit(listener.has_error_handler())?;
        if self.inner.registries.add_tx(tx_id.clone(), listener) {
            warn!(tx_id = %tx_id, "replacing existing transaction listener");
        }
        if reconnect {
            self.spawn_reconnect();
        }
        Ok(())
    }

    pub fn unregister_tx_event(&self, tx_id: &str) -> bool {
        self.inner.registries.remove_tx(tx_id)
    }

    /// Receive events emitted by `chaincode_id` whose name matches
    /// `event_pattern` anywhere (a regular expression, not anchored).
    pub fn register_chaincode_event(
        &self,
        chaincode_id: impl Into<String>,
        event_pattern: &str,
        listener: Listener<ChaincodeEvent>,
    ) -> Result<ChaincodeRegistration, HubError> {
        let chaincode_id = chaincode_id.into();
        if chaincode_id.is_empty() {
            return Err(HubError::input("chaincode id must not be empty"));
        }
        let pattern = Regex::new(event_pattern).map_err(|e| {
            HubError::input(format!("invalid event name pattern '{event_pattern}': {e}"))
        })?;
        let reconnect = self.admit(listener.has_error_handler())?;
        let registration = self
            .inner
            .registries
            .add_chaincode(chaincode_id, pattern, listener);
        debug!(
            chaincode = %registration.chaincode_id,
            id = registration.id,
            pattern = event_pattern,
            "chaincode listener registered"
        );
        if reconnect {
            self.spawn_reconnect();
        }
        Ok(registration)
    }

    pub fn unregister_chaincode_event(&self, registration: &ChaincodeRegistration) -> bool {
        self.inner.registries.remove_chaincode(registration)
    }

    /// Decide whether a registration may proceed. `Ok(true)` means it may,
    /// and the hub must reconnect afterwards.
    ///
    /// Only a connected hub accepts listeners without an error callback. A
    /// hub that is still connecting may fail, and those listeners would be
    /// dropped without a word.
    fn admit(&self, has_error_handler: bool) -> Result<bool, HubError> {
        let state = self.state();
        if state == ConnectionState::Connected {
            return Ok(false);
        }
        if !has_error_handler {
            return Err(ConnectionError::NotConnected.into());
        }
        if state == ConnectionState::Connecting {
            return Ok(false);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no async runtime available to reconnect the event hub");
            return Err(ConnectionError::NotConnected.into());
        }
        Ok(true)
    }

    /// Start one background reconnect, unless another registration already did.
    fn spawn_reconnect(&self) {
        let claimed = {
            let mut slot = self.inner.conn.lock();
            if slot.state != ConnectionState::Disconnected {
                return;
            }
            slot.state = ConnectionState::Connecting;
            slot.generation += 1;
            slot.generation
        };
        if let Some(m) = self.inner.metrics.read().as_ref() {
            m.record_reconnect("registration");
        }

        let inner = Arc::clone(&self.inner);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = inner.connect(false, Some(claimed)).await {
                        warn!(error = %e, "background reconnect failed");
                        inner.close(e, Some(claimed));
                    }
                });
            }
            Err(_) => inner.close(ConnectionError::NotConnected.into(), Some(claimed)),
        }
    }
}

impl HubInner {
    fn transport(&self) -> Result<Arc<dyn EventTransport>, ConnectionError> {
        let mut slot = self.transport.lock();
        if let Some(t) = slot.as_ref() {
            return Ok(Arc::clone(t));
        }
        let url = self.config.peer_url.as_ref().ok_or(ConnectionError::NoPeer)?;
        let transport: Arc<dyn EventTransport> =
            Arc::new(GrpcEventTransport::from_config(url.clone(), &self.config));
        *slot = Some(Arc::clone(&transport));
        Ok(transport)
    }

    /// Open a stream, register for blocks and wait for the peer to
    /// acknowledge. `claimed` is the generation reserved by a background
    /// reconnect; the attempt is abandoned if that reservation was superseded.
    async fn connect(
        self: &Arc<Self>,
        force: bool,
        claimed: Option<u64>,
    ) -> Result<(), HubError> {
        let transport = self.transport()?;

        if claimed.is_none() && !force && transport.health() != HealthStatus::Unhealthy {
            let slot = self.conn.lock();
            if slot.state == ConnectionState::Connected {
                return Ok(());
            }
        }

        let register = self.signed_event(wire::event::Event::Register(wire::Register {
            events: vec![self.block_interest()],
        }))?;

        let generation = {
            let mut slot = self.conn.lock();
            if let Some(g) = claimed {
                if slot.generation != g || slot.state != ConnectionState::Connecting {
                    debug!("background reconnect superseded");
                    return Ok(());
                }
            }
            if let Some(old) = slot.stream.take() {
                debug!(generation = slot.generation, "replacing existing event stream");
                old.close();
            }
            slot.generation += 1;
            slot.state = ConnectionState::Connecting;
            slot.last_error = None;
            slot.generation
        };

        if self.attempts.fetch_add(1, Ordering::Relaxed) > 0 && claimed.is_none() {
            if let Some(m) = self.metrics.read().as_ref() {
                m.record_reconnect("connect");
            }
        }

        info!(peer = %transport.endpoint(), generation, "opening event stream");
        let EventStream { outbound, inbound } = match transport.open().await {
            Ok(stream) => stream,
            Err(e) => {
                let err = HubError::from(ConnectionError::Open(e));
                error!(peer = %transport.endpoint(), error = %err, "failed to open event stream");
                self.close(err.clone(), Some(generation));
                return Err(err);
            }
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        let reader = tokio::spawn(read_loop(
            Arc::downgrade(self),
            generation,
            inbound,
            ack_tx,
        ));

        {
            let mut slot = self.conn.lock();
            if slot.generation != generation || slot.state == ConnectionState::Disconnected {
                reader.abort();
                return Err(superseded_error(&slot, generation));
            }
            slot.stream = Some(LiveStream {
                outbound: outbound.clone(),
                reader,
            });
        }

        if let Err(e) = outbound.send(register).await {
            let err = HubError::from(fabrichub_core::TransportError::Send(e.to_string()));
            self.close(err.clone(), Some(generation));
            return Err(err);
        }

        let timeout = self.config.registration_timeout();
        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(())) => {
                info!(peer = %transport.endpoint(), generation, "event hub connected");
                Ok(())
            }
            Ok(Err(_)) => {
                // The stream ended, or was closed by the peer, before the ack.
                let slot = self.conn.lock();
                Err(superseded_error(&slot, generation))
            }
            Err(_) => {
                let err = HubError::from(ConnectionError::Timeout {
                    ms: self.config.registration_timeout_ms,
                });
                warn!(peer = %transport.endpoint(), error = %err, "registration not acknowledged");
                self.close(err.clone(), Some(generation));
                Err(err)
            }
        }
    }

    /// Disconnect semantics. With `only_generation`, this is a terminal signal
    /// from that stream and is ignored unless the stream is still current and
    /// the hub is not already disconnected.
    fn close(&self, cause: HubError, only_generation: Option<u64>) {
        let stream = {
            let mut slot = self.conn.lock();
            if let Some(g) = only_generation {
                if slot.generation != g || slot.state == ConnectionState::Disconnected {
                    debug!(generation = g, "ignoring stale terminal signal");
                    return;
                }
            }
            if slot.state != ConnectionState::Disconnected {
                info!(reason = %cause, "event hub disconnecting");
            }
            slot.state = ConnectionState::Disconnected;
            slot.last_error = Some(cause.clone());
            slot.stream.take()
        };

        if let Some(stream) = stream {
            self.send_unregister(&stream.outbound);
            stream.close();
        }

        let drained = self.registries.drain();
        if !drained.is_empty() {
            debug!(listeners = drained.len(), "notifying listeners of disconnect");
        }
        drained.fail_all(&cause);
    }

    fn send_unregister(&self, outbound: &mpsc::Sender<wire::SignedEvent>) {
        let unregister = self.signed_event(wire::event::Event::Unregister(wire::Unregister {
            events: vec![self.block_interest()],
        }));
        match unregister {
            Ok(event) => {
                if let Err(e) = outbound.try_send(event) {
                    debug!(error = %e, "could not send unregister");
                }
            }
            Err(e) => debug!(error = %e, "could not sign unregister"),
        }
    }

    fn block_interest(&self) -> wire::Interest {
        wire::Interest {
            event_type: wire::events::event_type::BLOCK,
            chaincode_reg_info: None,
            chain_id: self.config.channel_id.clone(),
        }
    }

    fn signed_event(&self, body: wire::event::Event) -> Result<wire::SignedEvent, HubError> {
        let event = wire::Event {
            event: Some(body),
            creator: self.identity.serialize(),
            timestamp: Some(prost_types::Timestamp::from(SystemTime::now())),
        };
        let event_bytes = event.encode_to_vec();
        let signature = self.identity.sign(&event_bytes)?;
        Ok(wire::SignedEvent {
            signature,
            event_bytes,
        })
    }

    /// Returns `false` if `generation` is stale.
    fn mark_connected(&self, generation: u64) -> bool {
        let mut slot = self.conn.lock();
        if slot.generation != generation || slot.state == ConnectionState::Disconnected {
            return false;
        }
        slot.state = ConnectionState::Connected;
        true
    }

    fn on_message(&self, generation: u64, event: wire::Event) {
        match event.event {
            Some(wire::event::Event::Block(block)) => self.on_block(&block),
            Some(wire::event::Event::Register(_)) => {
                debug!(generation, "registration acknowledged");
            }
            Some(wire::event::Event::Unregister(_)) => {
                info!(generation, "peer ended the registration");
                self.close(HubError::Shutdown, Some(generation));
            }
            Some(wire::event::Event::Rejection(rejection)) => {
                warn!(generation, reason = %rejection.error_msg, "peer rejected a request");
            }
            Some(wire::event::Event::ChaincodeEvent(_)) | None => {
                warn!(generation, "ignoring unexpected event message");
            }
        }
    }

    fn on_block(&self, raw: &wire::Block) {
        let metrics = self.metrics.read().clone();
        let started = Instant::now();
        let decoded = match self.decoder.decode_message(raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                let number = raw.header.as_ref().map(|h| h.number);
                error!(block = ?number, error = %e, "failed to decode block, skipping");
                if let Some(m) = &metrics {
                    m.record_block_error(error_kind(&e));
                }
                return;
            }
        };
        if let Some(m) = &metrics {
            m.record_block(started.elapsed().as_secs_f64() * 1_000.0);
        }

        let block = Arc::new(decoded.value);
        dispatch_block(&self.registries, &block, metrics.as_ref());
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        if let Some(stream) = self.conn.get_mut().stream.take() {
            stream.close();
        }
    }
}

fn superseded_error(slot: &ConnSlot, generation: u64) -> HubError {
    if slot.generation == generation {
        if let Some(e) = &slot.last_error {
            return e.clone();
        }
    }
    ConnectionError::NotConnected.into()
}

fn error_kind(e: &fabrichub_core::DecodeError) -> &'static str {
    use fabrichub_core::DecodeError::*;
    match e {
        InvalidInput { .. } => "invalid_input",
        Malformed { .. } => "malformed",
        MissingField { .. } => "missing_field",
        UnknownPolicyType { .. } => "unknown_policy_type",
        InvalidEnum { .. } => "invalid_enum",
        TooDeep { .. } => "too_deep",
    }
}

/// The peer answers a `Register` with a `Register` echo, or starts
/// delivering blocks straight away.
fn acknowledges_registration(event: &wire::Event) -> bool {
    matches!(
        event.event,
        Some(wire::event::Event::Register(_)) | Some(wire::event::Event::Block(_))
    )
}

/// Reader task: one per stream. Holds only a weak reference so a dropped
/// hub is not kept alive by its own stream.
async fn read_loop(
    hub: Weak<HubInner>,
    generation: u64,
    mut inbound: InboundStream,
    ack: oneshot::Sender<()>,
) {
    let mut ack = Some(ack);
    let cause = loop {
        match inbound.next().await {
            Some(Ok(event)) => {
                let Some(inner) = hub.upgrade() else { return };
                if ack.is_some() && acknowledges_registration(&event) {
                    if !inner.mark_connected(generation) {
                        return;
                    }
                    if let Some(tx) = ack.take() {
                        let _ = tx.send(());
                    }
                }
                inner.on_message(generation, event);
            }
            Some(Err(e)) => break HubError::from(e),
            None => break HubError::from(fabrichub_core::TransportError::StreamEnded),
        }
    };

    if let Some(inner) = hub.upgrade() {
        warn!(generation, error = %cause, "event stream terminated");
        inner.close(cause, Some(generation));
    }
}
