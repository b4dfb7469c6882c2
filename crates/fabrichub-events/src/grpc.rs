//! gRPC transport over the peer's bidirectional `Events.Chat` RPC.
//!
//! The RPC is driven by a background task per stream. The peer does not
//! answer (not even with headers) until it has read a `Register`, so `open`
//! hands back the outbound sender before the call has completed.

use async_trait::async_trait;
use fabrichub_core::{wire, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, warn};

use crate::config::HubConfig;
use crate::transport::{EventStream, EventTransport, HealthStatus};

const CHAT_PATH: &str = "/protos.Events/Chat";

/// [`EventTransport`] backed by a tonic channel.
pub struct GrpcEventTransport {
    endpoint: String,
    connect_timeout: Duration,
    buffer: usize,
    tls_ca_pem: Option<String>,
    ssl_target_name_override: Option<String>,
    health: Arc<Mutex<HealthStatus>>,
}

impl GrpcEventTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let defaults = HubConfig::default();
        Self {
            endpoint: endpoint.into(),
            connect_timeout: defaults.connect_timeout(),
            buffer: defaults.outbound_buffer,
            tls_ca_pem: None,
            ssl_target_name_override: None,
            health: Arc::new(Mutex::new(HealthStatus::Unknown)),
        }
    }

    /// Transport for `endpoint` using the timeouts, buffer size and TLS
    /// settings of `config`.
    pub fn from_config(endpoint: impl Into<String>, config: &HubConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            buffer: config.outbound_buffer.max(1),
            tls_ca_pem: config.tls_ca_pem.clone(),
            ssl_target_name_override: config.ssl_target_name_override.clone(),
            ..Self::new(endpoint)
        }
    }

    /// Trust `ca_pem` and optionally check the certificate against
    /// `target_name` instead of the endpoint host.
    pub fn with_tls(mut self, ca_pem: impl Into<String>, target_name: Option<String>) -> Self {
        self.tls_ca_pem = Some(ca_pem.into());
        self.ssl_target_name_override = target_name;
        self
    }

    fn tls_config(&self) -> ClientTlsConfig {
        let mut tls = ClientTlsConfig::new();
        if let Some(pem) = &self.tls_ca_pem {
            tls = tls.ca_certificate(Certificate::from_pem(pem));
        }
        if let Some(name) = &self.ssl_target_name_override {
            tls = tls.domain_name(name.clone());
        }
        tls
    }

    async fn connect_channel(&self) -> Result<Channel, TransportError> {
        let (uri, tls) = http_uri(&self.endpoint);
        let mut endpoint = Endpoint::from_shared(uri)
            .map_err(|e| self.connect_error(e))?
            .connect_timeout(self.connect_timeout);
        if tls {
            endpoint = endpoint
                .tls_config(self.tls_config())
                .map_err(|e| self.connect_error(e))?;
        }
        endpoint.connect().await.map_err(|e| self.connect_error(e))
    }

    fn connect_error(&self, reason: impl ToString) -> TransportError {
        TransportError::Connect {
            endpoint: self.endpoint.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl EventTransport for GrpcEventTransport {
    async fn open(&self) -> Result<EventStream, TransportError> {
        let channel = match self.connect_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                *self.health.lock() = HealthStatus::Unhealthy;
                return Err(e);
            }
        };
        *self.health.lock() = HealthStatus::Healthy;

        let (out_tx, out_rx) = mpsc::channel(self.buffer);
        let (in_tx, in_rx) = mpsc::channel(self.buffer);
        let health = Arc::clone(&self.health);
        let endpoint = self.endpoint.clone();

        tokio::spawn(async move {
            run_chat(channel, out_rx, in_tx, health, endpoint).await;
        });

        Ok(EventStream {
            outbound: out_tx,
            inbound: Box::pin(ReceiverStream::new(in_rx)),
        })
    }

    fn health(&self) -> HealthStatus {
        *self.health.lock()
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Peers are usually addressed as `grpc://` / `grpcs://`; tonic wants the
/// HTTP scheme. Returns the rewritten URI and whether TLS is required.
fn http_uri(endpoint: &str) -> (String, bool) {
    if let Some(rest) = endpoint.strip_prefix("grpcs://") {
        (format!("https://{rest}"), true)
    } else if let Some(rest) = endpoint.strip_prefix("grpc://") {
        (format!("http://{rest}"), false)
    } else {
        (endpoint.to_string(), endpoint.starts_with("https://"))
    }
}

/// Drive one `Chat` call, forwarding responses until either side goes away.
async fn run_chat(
    channel: Channel,
    outbound: mpsc::Receiver<wire::SignedEvent>,
    inbound: mpsc::Sender<Result<wire::Event, TransportError>>,
    health: Arc<Mutex<HealthStatus>>,
    endpoint: String,
) {
    let mut grpc = tonic::client::Grpc::new(channel);
    if let Err(e) = grpc.ready().await {
        let _ = inbound
            .send(Err(TransportError::Stream(format!("service not ready: {e}"))))
            .await;
        return;
    }

    let codec = ProstCodec::<wire::SignedEvent, wire::Event>::default();
    let request = tonic::Request::new(ReceiverStream::new(outbound));
    let mut responses = match grpc
        .streaming(request, PathAndQuery::from_static(CHAT_PATH), codec)
        .await
    {
        Ok(response) => response.into_inner(),
        Err(status) => {
            warn!(peer = %endpoint, code = ?status.code(), "Chat call rejected");
            *health.lock() = HealthStatus::Degraded;
            let _ = inbound.send(Err(TransportError::Stream(status.to_string()))).await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = inbound.closed() => {
                debug!(peer = %endpoint, "event stream released");
                return;
            }
            message = responses.message() => match message {
                Ok(Some(event)) => {
                    if inbound.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    debug!(peer = %endpoint, "peer closed the event stream");
                    return;
                }
                Err(status) => {
                    *health.lock() = HealthStatus::Degraded;
                    let _ = inbound.send(Err(TransportError::Stream(status.to_string()))).await;
                    return;
                }
            }
        }
    }
}
