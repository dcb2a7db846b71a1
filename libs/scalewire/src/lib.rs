//! Scalewire Protocol & Session Library
//!
//! Wire protocols, transports and per-device sessions for industrial
//! weighing indicators. Logical commands (read gross, read net, tare, zero)
//! are encoded into vendor protocol frames, exchanged over TCP or serial,
//! and decoded back into normalized weight readings.
//!
//! # Key Components
//!
//! - **ScaleCodec**: Protocol dispatch for RINCMD and DFW_ASCII framing
//! - **ScaleTransport / Connector**: Request/response byte exchange over TCP or serial
//! - **DeviceSession**: Per-device actor serializing command execution
//! - **DeviceDescriptor**: Declarative device configuration
//! - **WeightReading**: Normalized decoded measurement

pub mod codec;
pub mod device;
pub mod error;
pub mod reading;
pub mod session;
pub mod transport;

// Re-exports
pub use error::{WireError, WireResult};

// Device model exports
pub use device::{
    CommandMap, ConnectionSettings, DeviceDescriptor, FlowControl, LogicalCommand, Parity,
    ScaleProtocol, StopBits,
};

// Measurement exports
pub use reading::{Stability, WeightReading};

// Codec exports
pub use codec::{ScaleCodec, ScaleResponse};

// Transport exports
pub use transport::{Connector, NetConnector, ScaleTransport, SerialTransport, TcpTransport};

// Session exports
pub use session::{DeviceSession, SessionHandle, SessionState, SessionStats};
