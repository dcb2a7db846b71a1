//! Per-device session actor
//!
//! One spawned task per device owns that device's transport exclusively.
//! Callers talk to it through a bounded FIFO request queue with a oneshot
//! reply per request, which structurally guarantees at most one in-flight
//! command per device. Connects are lazy: the first command after spawn (or
//! after a dropped link) pays for the connect.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{ScaleCodec, ScaleResponse};
use crate::device::{DeviceDescriptor, LogicalCommand, ScaleProtocol};
use crate::error::{WireError, WireResult};
use crate::transport::{Connector, ScaleTransport};

/// Commands waiting per device before senders start blocking
const SESSION_QUEUE_DEPTH: usize = 32;

/// Lifecycle state of one device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
    Executing,
}

/// Counter snapshot for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionStats {
    pub connect_attempts: u64,
    pub connects_succeeded: u64,
    pub commands_executed: u64,
    pub commands_failed: u64,
}

struct SessionShared {
    device_id: String,
    state: AtomicU8,
    connect_attempts: AtomicU64,
    connects_succeeded: AtomicU64,
    commands_executed: AtomicU64,
    commands_failed: AtomicU64,
}

impl SessionShared {
    fn new(device_id: String) -> Self {
        Self {
            device_id,
            state: AtomicU8::new(SessionState::Disconnected as u8),
            connect_attempts: AtomicU64::new(0),
            connects_succeeded: AtomicU64::new(0),
            commands_executed: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
        }
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> SessionState {
        match self.state.load(Ordering::Acquire) {
            1 => SessionState::Connecting,
            2 => SessionState::Ready,
            3 => SessionState::Executing,
            _ => SessionState::Disconnected,
        }
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connects_succeeded: self.connects_succeeded.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
        }
    }
}

struct SessionRequest {
    command: LogicalCommand,
    token: String,
    reply: oneshot::Sender<WireResult<ScaleResponse>>,
}

/// Cloneable handle onto a device session actor
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
    cancel: CancellationToken,
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    /// Queue one command and wait for its outcome.
    ///
    /// Requests are served strictly in arrival order; a closed session
    /// answers with a lost-connection error rather than panicking.
    pub async fn execute(
        &self,
        command: LogicalCommand,
        token: &str,
    ) -> WireResult<ScaleResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = SessionRequest {
            command,
            token: token.to_string(),
            reply: reply_tx,
        };
        self.tx
            .send(request)
            .await
            .map_err(|_| WireError::connection_lost("session closed"))?;
        reply_rx
            .await
            .map_err(|_| WireError::connection_lost("session closed"))?
    }

    /// Stop the actor: pending queued requests are answered with a
    /// session-closed error and the transport shuts
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.stats()
    }

    pub fn device_id(&self) -> &str {
        &self.shared.device_id
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("device_id", &self.shared.device_id)
            .field("state", &self.shared.state())
            .finish()
    }
}

/// Factory for device session actors
pub struct DeviceSession;

impl DeviceSession {
    /// Spawn the actor task for one device and return its handle.
    ///
    /// No connection is opened here; the first executed command triggers it.
    pub fn spawn(descriptor: Arc<DeviceDescriptor>, connector: Arc<dyn Connector>) -> SessionHandle {
        let (tx, rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
        let cancel = CancellationToken::new();
        let shared = Arc::new(SessionShared::new(descriptor.id.clone()));

        tokio::spawn(run_session(
            rx,
            descriptor,
            connector,
            Arc::clone(&shared),
            cancel.clone(),
        ));

        SessionHandle { tx, cancel, shared }
    }
}

async fn run_session(
    mut rx: mpsc::Receiver<SessionRequest>,
    descriptor: Arc<DeviceDescriptor>,
    connector: Arc<dyn Connector>,
    shared: Arc<SessionShared>,
    cancel: CancellationToken,
) {
    let mut transport: Option<Box<dyn ScaleTransport>> = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = rx.recv() => match request {
                Some(request) => {
                    serve_request(
                        request,
                        &descriptor,
                        connector.as_ref(),
                        &shared,
                        &mut transport,
                    )
                    .await;
                }
                None => break,
            },
        }
    }

    // Answer anything still queued, then release the transport
    rx.close();
    while let Ok(request) = rx.try_recv() {
        let _ = request
            .reply
            .send(Err(WireError::connection_lost("session closed")));
    }
    if let Some(mut t) = transport.take() {
        t.close().await;
    }
    shared.set_state(SessionState::Disconnected);
    debug!("[{}] session closed", shared.device_id);
}

async fn serve_request(
    request: SessionRequest,
    descriptor: &DeviceDescriptor,
    connector: &dyn Connector,
    shared: &SessionShared,
    transport: &mut Option<Box<dyn ScaleTransport>>,
) {
    let protocol = descriptor.protocol;
    let outcome = execute_exchange(
        request.command,
        &request.token,
        protocol,
        descriptor.timeout(),
        connector,
        shared,
        transport,
    )
    .await;

    match &outcome {
        Ok(_) => {
            shared.commands_executed.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            shared.commands_failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                "[{}] {} failed: {}",
                shared.device_id, request.command, e
            );
        }
    }

    // Receiver may have given up; nothing to do about it here
    let _ = request.reply.send(outcome);
}

async fn execute_exchange(
    command: LogicalCommand,
    token: &str,
    protocol: ScaleProtocol,
    deadline: Duration,
    connector: &dyn Connector,
    shared: &SessionShared,
    transport: &mut Option<Box<dyn ScaleTransport>>,
) -> WireResult<ScaleResponse> {
    // Encoding is pure; a bad token must not cost a connection
    let command_bytes = ScaleCodec::encode_command(protocol, token)?;
    let terminator = ScaleCodec::response_terminator(protocol);

    if transport.is_none() {
        shared.set_state(SessionState::Connecting);
        shared.connect_attempts.fetch_add(1, Ordering::Relaxed);
        match connector.connect().await {
            Ok(t) => {
                shared.connects_succeeded.fetch_add(1, Ordering::Relaxed);
                debug!("[{}] connected to {}", shared.device_id, t.peer());
                *transport = Some(t);
            }
            Err(e) => {
                shared.set_state(SessionState::Disconnected);
                return Err(e);
            }
        }
    }

    shared.set_state(SessionState::Executing);
    let link = transport
        .as_mut()
        .ok_or_else(|| WireError::connection_lost("transport vanished"))?;
    let exchanged = link.exchange(&command_bytes, terminator, deadline).await;

    match exchanged {
        Ok(frame) => {
            shared.set_state(SessionState::Ready);
            ScaleCodec::decode_response(protocol, command, &frame)
        }
        Err(e) => {
            // A dead link forces a reconnect on the next command; a slow or
            // noisy device keeps its connection
            if e.is_connection_lost() {
                if let Some(mut t) = transport.take() {
                    t.close().await;
                }
                shared.set_state(SessionState::Disconnected);
            } else {
                shared.set_state(SessionState::Ready);
            }
            Err(e)
        }
    }
}
