//! Transports for weighing indicators
//!
//! A transport is a byte pipe with explicit connect, a write-then-read
//! exchange, and close. TCP indicators sit behind serial-to-ethernet
//! converters or native ethernet options; serial indicators hang off local
//! ports. Framing is terminator-based (the codec says which bytes end a
//! frame); everything read past the terminator is discarded.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::device::{ConnectionSettings, DeviceDescriptor, FlowControl, Parity, StopBits};
use crate::error::{WireError, WireResult};

/// Upper bound on one response frame; protects against a peer that streams
/// bytes without ever sending a terminator
const MAX_FRAME_LEN: usize = 8192;

/// Byte pipe to one indicator
#[async_trait]
pub trait ScaleTransport: Send {
    /// Write the full command, then read until `terminator` is seen.
    ///
    /// Returns the frame including the terminator. The deadline covers the
    /// whole exchange; expiry is a timeout error, an EOF or IO failure
    /// mid-exchange is a lost connection.
    async fn exchange(
        &mut self,
        command: &[u8],
        terminator: &[u8],
        deadline: Duration,
    ) -> WireResult<Vec<u8>>;

    /// Close the pipe. Idempotent; close errors are logged, not returned.
    async fn close(&mut self);

    /// Peer description for logs
    fn peer(&self) -> &str;
}

/// Builds transports on demand; sessions reconnect lazily through this
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> WireResult<Box<dyn ScaleTransport>>;
}

/// Shared exchange loop over any async byte stream
async fn exchange_on<S>(
    stream: &mut S,
    peer: &str,
    command: &[u8],
    terminator: &[u8],
    deadline: Duration,
) -> WireResult<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let result = timeout(deadline, async {
        stream
            .write_all(command)
            .await
            .map_err(|e| WireError::connection_lost(format!("write to {} failed: {}", peer, e)))?;
        stream
            .flush()
            .await
            .map_err(|e| WireError::connection_lost(format!("flush to {} failed: {}", peer, e)))?;

        let mut frame: Vec<u8> = Vec::with_capacity(64);
        let mut chunk = [0u8; 256];
        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| WireError::connection_lost(format!("read from {} failed: {}", peer, e)))?;
            if n == 0 {
                return Err(WireError::connection_lost(format!(
                    "{} closed the connection",
                    peer
                )));
            }
            frame.extend_from_slice(&chunk[..n]);

            if let Some(pos) = find_terminator(&frame, terminator) {
                let end = pos + terminator.len();
                if frame.len() > end {
                    debug!(
                        "[{}] discarding {} trailing bytes after frame terminator",
                        peer,
                        frame.len() - end
                    );
                    frame.truncate(end);
                }
                return Ok(frame);
            }

            if frame.len() > MAX_FRAME_LEN {
                return Err(WireError::decode(format!(
                    "{} sent {} bytes without a frame terminator",
                    peer,
                    frame.len()
                )));
            }
        }
    })
    .await;

    match result {
        Ok(Ok(frame)) => Ok(frame),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(WireError::timeout(format!(
            "no complete response from {} within {:?}",
            peer, deadline
        ))),
    }
}

fn find_terminator(frame: &[u8], terminator: &[u8]) -> Option<usize> {
    if terminator.is_empty() || frame.len() < terminator.len() {
        return None;
    }
    frame
        .windows(terminator.len())
        .position(|window| window == terminator)
}

/// TCP transport
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
}

impl TcpTransport {
    /// Connect within the deadline; refusal and expiry both fail the connect
    pub async fn connect(host: &str, port: u16, deadline: Duration) -> WireResult<Self> {
        let addr = format!("{}:{}", host, port);
        match timeout(deadline, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                // Weighing exchanges are single short lines; no batching wanted
                stream.set_nodelay(true).ok();
                info!("[{}] TCP connection established", addr);
                Ok(Self { stream, peer: addr })
            }
            Ok(Err(e)) => Err(WireError::connect(format!(
                "TCP connect to {} failed: {}",
                addr, e
            ))),
            Err(_) => Err(WireError::connect(format!(
                "TCP connect to {} timed out after {:?}",
                addr, deadline
            ))),
        }
    }
}

#[async_trait]
impl ScaleTransport for TcpTransport {
    async fn exchange(
        &mut self,
        command: &[u8],
        terminator: &[u8],
        deadline: Duration,
    ) -> WireResult<Vec<u8>> {
        exchange_on(&mut self.stream, &self.peer, command, terminator, deadline).await
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("[{}] TCP shutdown error (ignored): {}", self.peer, e);
        }
        debug!("[{}] TCP connection closed", self.peer);
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

/// Serial port transport
pub struct SerialTransport {
    port: SerialStream,
    peer: String,
}

impl SerialTransport {
    /// Open and configure the port from descriptor settings
    pub fn open(
        port_path: &str,
        baud_rate: u32,
        data_bits: u8,
        stop_bits: StopBits,
        parity: Parity,
        flow_control: FlowControl,
        deadline: Duration,
    ) -> WireResult<Self> {
        let builder = tokio_serial::new(port_path, baud_rate)
            .data_bits(to_serial_data_bits(data_bits))
            .stop_bits(stop_bits.into())
            .parity(parity.into())
            .flow_control(flow_control.into())
            .timeout(deadline);

        match builder.open_native_async() {
            Ok(port) => {
                #[cfg(unix)]
                let mut port = port;
                #[cfg(unix)]
                port.set_exclusive(false).map_err(|e| {
                    WireError::io(format!("failed to set exclusive mode on {}: {}", port_path, e))
                })?;

                info!("[{}@{}] serial port opened", port_path, baud_rate);
                Ok(Self {
                    port,
                    peer: format!("{}@{}", port_path, baud_rate),
                })
            }
            Err(e) => Err(WireError::connect(format!(
                "failed to open serial port {}: {}",
                port_path, e
            ))),
        }
    }
}

#[async_trait]
impl ScaleTransport for SerialTransport {
    async fn exchange(
        &mut self,
        command: &[u8],
        terminator: &[u8],
        deadline: Duration,
    ) -> WireResult<Vec<u8>> {
        exchange_on(&mut self.port, &self.peer, command, terminator, deadline).await
    }

    async fn close(&mut self) {
        // The port is released when the stream drops
        debug!("[{}] serial port closed", self.peer);
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

fn to_serial_data_bits(bits: u8) -> tokio_serial::DataBits {
    match bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(stop_bits: StopBits) -> Self {
        match stop_bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow_control: FlowControl) -> Self {
        match flow_control {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Production connector: builds the transport the descriptor asks for
pub struct NetConnector {
    settings: ConnectionSettings,
    timeout: Duration,
}

impl NetConnector {
    pub fn new(settings: ConnectionSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    pub fn from_descriptor(descriptor: &DeviceDescriptor) -> Self {
        Self::new(descriptor.connection.clone(), descriptor.timeout())
    }
}

#[async_trait]
impl Connector for NetConnector {
    async fn connect(&self) -> WireResult<Box<dyn ScaleTransport>> {
        match &self.settings {
            ConnectionSettings::Tcp { host, port } => {
                let transport = TcpTransport::connect(host, *port, self.timeout).await?;
                Ok(Box::new(transport))
            }
            ConnectionSettings::Serial {
                port_path,
                baud_rate,
                data_bits,
                stop_bits,
                parity,
                flow_control,
            } => {
                let transport = SerialTransport::open(
                    port_path,
                    *baud_rate,
                    *data_bits,
                    *stop_bits,
                    *parity,
                    *flow_control,
                    self.timeout,
                )?;
                Ok(Box::new(transport))
            }
        }
    }
}
