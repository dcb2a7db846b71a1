//! Protocol codecs for weighing indicators
//!
//! Pure encode/decode, no IO. Protocol dispatch is an exhaustive match on
//! [`ScaleProtocol`]; adding a protocol means adding a variant and a module.

pub mod dfw;
pub mod rincmd;

use crate::device::{LogicalCommand, ScaleProtocol};
use crate::error::WireResult;
use crate::reading::WeightReading;

/// Decoded response frame from an indicator
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleResponse {
    /// A weight sample (read commands, or indicators that echo a weight)
    Reading(WeightReading),
    /// Bare acknowledgement with no payload (tare/zero style actions)
    Ack,
}

impl ScaleResponse {
    pub fn into_reading(self) -> Option<WeightReading> {
        match self {
            ScaleResponse::Reading(reading) => Some(reading),
            ScaleResponse::Ack => None,
        }
    }
}

/// Scale protocol codec
pub struct ScaleCodec;

impl ScaleCodec {
    /// Encode a wire token into the raw command bytes for one protocol
    pub fn encode_command(protocol: ScaleProtocol, token: &str) -> WireResult<Vec<u8>> {
        match protocol {
            ScaleProtocol::Rincmd => rincmd::encode(token),
            ScaleProtocol::DfwAscii => dfw::encode(token),
        }
    }

    /// Decode one raw response frame.
    ///
    /// Total: any input yields either a frame or a decode error. The issued
    /// command disambiguates response shapes that do not name the weight
    /// channel themselves.
    pub fn decode_response(
        protocol: ScaleProtocol,
        command: LogicalCommand,
        raw: &[u8],
    ) -> WireResult<ScaleResponse> {
        match protocol {
            ScaleProtocol::Rincmd => rincmd::decode(command, raw),
            ScaleProtocol::DfwAscii => dfw::decode(raw),
        }
    }

    /// Byte sequence ending one response frame
    pub fn response_terminator(protocol: ScaleProtocol) -> &'static [u8] {
        match protocol {
            ScaleProtocol::Rincmd => b"\r\n",
            ScaleProtocol::DfwAscii => b"\r\n",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Stability;

    #[test]
    fn encode_dispatches_per_protocol() {
        let dfw = ScaleCodec::encode_command(ScaleProtocol::DfwAscii, "READ").unwrap();
        assert_eq!(dfw, b"READ\r\n");
        let rin = ScaleCodec::encode_command(ScaleProtocol::Rincmd, "20050026").unwrap();
        assert_eq!(rin, b"20050026\r\n");
    }

    #[test]
    fn decode_dispatches_per_protocol() {
        let resp = ScaleCodec::decode_response(
            ScaleProtocol::DfwAscii,
            LogicalCommand::ReadGross,
            b"ST,GS,12.500,kg\r\n",
        )
        .unwrap();
        match resp {
            ScaleResponse::Reading(reading) => {
                assert_eq!(reading.gross_weight, Some(12.5));
                assert_eq!(reading.stability, Stability::Stable);
            }
            ScaleResponse::Ack => panic!("expected reading"),
        }

        let resp = ScaleCodec::decode_response(
            ScaleProtocol::Rincmd,
            LogicalCommand::ReadGross,
            b"20050026+123.45kg\r\n",
        )
        .unwrap();
        assert!(matches!(resp, ScaleResponse::Reading(_)));
    }

    #[test]
    fn both_protocols_terminate_on_crlf() {
        assert_eq!(ScaleCodec::response_terminator(ScaleProtocol::Rincmd), b"\r\n");
        assert_eq!(
            ScaleCodec::response_terminator(ScaleProtocol::DfwAscii),
            b"\r\n"
        );
    }

    #[test]
    fn into_reading_unwraps_only_readings() {
        assert!(ScaleResponse::Ack.into_reading().is_none());
        let reading = WeightReading::gross(1.0, "kg", Stability::Stable);
        assert_eq!(
            ScaleResponse::Reading(reading.clone()).into_reading(),
            Some(reading)
        );
    }
}
