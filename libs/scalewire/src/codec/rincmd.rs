//! RINCMD codec (Rinstrum R/C-series indicators)
//!
//! Token commands, CR/LF-terminated single-line replies. Indicators answer
//! in one of three shapes: a register echo glued to the value
//! (`20050026+123.45kg`), a colon form with a trailing channel flag
//! (`81050026: -   23 kg G`) and a status-prefix form (`S 00032.000 kg`).
//! Write commands are acknowledged by echoing the register, and a bare `E`
//! reports an indicator-side error.

use std::sync::OnceLock;

use regex::Regex;

use crate::codec::ScaleResponse;
use crate::device::LogicalCommand;
use crate::error::{WireError, WireResult};
use crate::reading::{Stability, WeightReading};

fn echo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9A-Fa-f]{8})([+-])(\d+(?:\.\d+)?)(kg|lb|g)$").unwrap()
    })
}

fn colon_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9A-Fa-f]{8}):\s*([+-]?)\s*(\d+(?:\.\d+)?)\s*(kg|lb|g)\s*([GNTZ])$")
            .unwrap()
    })
}

fn ack_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9A-Fa-f]{8})(?::\s*[0-9A-Fa-f]{1,4})?$").unwrap())
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([SU])\s+([+-]?\d+(?:\.\d+)?)\s*(kg|lb|g)$").unwrap())
}

/// Encode a RINCMD token; commands are sent CR/LF-terminated
pub fn encode(token: &str) -> WireResult<Vec<u8>> {
    let token = token.trim();
    if token.is_empty() {
        return Err(WireError::config("RINCMD command token is empty"));
    }
    let mut bytes = Vec::with_capacity(token.len() + 2);
    bytes.extend_from_slice(token.as_bytes());
    bytes.extend_from_slice(b"\r\n");
    Ok(bytes)
}

/// Decode one RINCMD response line.
///
/// The register-echo and status-prefix shapes do not name the weight channel,
/// so the issued command decides which field the value fills.
pub fn decode(command: LogicalCommand, raw: &[u8]) -> WireResult<ScaleResponse> {
    let text = std::str::from_utf8(raw).map_err(|_| {
        WireError::decode(format!(
            "RINCMD response is not ASCII: {:02X?}",
            &raw[..raw.len().min(32)]
        ))
    })?;
    let line = text.trim_matches(['\r', '\n', ' ', '\t']);

    if line.is_empty() {
        return Err(WireError::decode("RINCMD response is empty"));
    }

    if line == "E" || line.starts_with("E ") {
        return Err(WireError::decode(format!(
            "indicator reported error: {:?}",
            line
        )));
    }

    if let Some(caps) = echo_re().captures(line) {
        let value = signed(&caps[2], &caps[3], line)?;
        return Ok(hinted_reading(command, value, &caps[4], &caps[1]));
    }

    if let Some(caps) = colon_re().captures(line) {
        let value = signed(&caps[2], &caps[3], line)?;
        let unit = &caps[4];
        let echo = &caps[1];
        return Ok(match &caps[5] {
            "G" => ScaleResponse::Reading(
                WeightReading::gross(value, unit, Stability::Stable).with_raw_status(echo),
            ),
            "N" => ScaleResponse::Reading(
                WeightReading::net(value, unit, Stability::Stable).with_raw_status(echo),
            ),
            "T" => ScaleResponse::Reading(
                WeightReading {
                    gross_weight: None,
                    net_weight: None,
                    tare_weight: Some(value),
                    unit: unit.to_string(),
                    stability: Stability::Stable,
                    raw_status_code: echo.to_string(),
                    timestamp: None,
                },
            ),
            // "Z" is the only remaining flag the pattern admits
            _ => ScaleResponse::Ack,
        });
    }

    // Token echoes acknowledge write actions only; a read answered with a
    // bare echo carries no value and cannot satisfy the query
    if matches!(command, LogicalCommand::Tare | LogicalCommand::Zero)
        && ack_re().is_match(line)
    {
        return Ok(ScaleResponse::Ack);
    }

    if let Some(caps) = status_re().captures(line) {
        let value: f64 = caps[2].parse().map_err(|_| {
            WireError::decode(format!("RINCMD weight {:?} is not a number", &caps[2]))
        })?;
        let stability = match &caps[1] {
            "S" => Stability::Stable,
            _ => Stability::Unstable,
        };
        return Ok(match command {
            LogicalCommand::ReadGross => ScaleResponse::Reading(
                WeightReading::gross(value, &caps[3], stability).with_raw_status(&caps[1]),
            ),
            LogicalCommand::ReadNet => ScaleResponse::Reading(
                WeightReading::net(value, &caps[3], stability).with_raw_status(&caps[1]),
            ),
            LogicalCommand::Tare | LogicalCommand::Zero => ScaleResponse::Ack,
        });
    }

    Err(WireError::decode(format!(
        "unrecognized RINCMD response: {:?}",
        line
    )))
}

/// Register-echo shape carries no channel flag; the issued command decides
fn hinted_reading(
    command: LogicalCommand,
    value: f64,
    unit: &str,
    echo: &str,
) -> ScaleResponse {
    match command {
        LogicalCommand::ReadGross => ScaleResponse::Reading(
            WeightReading::gross(value, unit, Stability::Stable).with_raw_status(echo),
        ),
        LogicalCommand::ReadNet => ScaleResponse::Reading(
            WeightReading::net(value, unit, Stability::Stable).with_raw_status(echo),
        ),
        LogicalCommand::Tare | LogicalCommand::Zero => ScaleResponse::Ack,
    }
}

fn signed(sign: &str, digits: &str, line: &str) -> WireResult<f64> {
    let value: f64 = digits
        .parse()
        .map_err(|_| WireError::decode(format!("RINCMD weight in {:?} is not a number", line)))?;
    Ok(if sign == "-" { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(resp: ScaleResponse) -> WeightReading {
        match resp {
            ScaleResponse::Reading(r) => r,
            ScaleResponse::Ack => panic!("expected a reading, got ack"),
        }
    }

    // ---------- register-echo shape ----------

    #[test]
    fn register_echo_gross() {
        let r = reading(decode(LogicalCommand::ReadGross, b"20050026+123.45kg\r\n").unwrap());
        assert_eq!(r.gross_weight, Some(123.45));
        assert_eq!(r.unit, "kg");
        assert_eq!(r.stability, Stability::Stable);
        assert_eq!(r.raw_status_code, "20050026");
    }

    #[test]
    fn register_echo_net_with_negative_sign() {
        let r = reading(decode(LogicalCommand::ReadNet, b"20050025-067.89lb\r\n").unwrap());
        assert_eq!(r.net_weight, Some(-67.89));
        assert_eq!(r.unit, "lb");
    }

    // ---------- colon shape ----------

    #[test]
    fn colon_form_with_padded_negative_value() {
        let r = reading(decode(LogicalCommand::ReadGross, b"81050026: -   23 kg G\r\n").unwrap());
        assert_eq!(r.gross_weight, Some(-23.0));
        assert_eq!(r.unit, "kg");
        assert_eq!(r.raw_status_code, "81050026");
    }

    #[test]
    fn colon_form_with_dash_glued_to_colon() {
        let r = reading(decode(LogicalCommand::ReadGross, b"81050026:-     23 kg G\r\n").unwrap());
        assert_eq!(r.gross_weight, Some(-23.0));
    }

    #[test]
    fn colon_form_net_flag_overrides_hint() {
        let r = reading(decode(LogicalCommand::ReadGross, b"81050025: 12.5 kg N\r\n").unwrap());
        assert_eq!(r.net_weight, Some(12.5));
        assert_eq!(r.gross_weight, None);
    }

    #[test]
    fn colon_form_tare_flag_fills_tare_field() {
        let r = reading(decode(LogicalCommand::Tare, b"81120008: 1.500 kg T\r\n").unwrap());
        assert_eq!(r.tare_weight, Some(1.5));
        assert_eq!(r.gross_weight, None);
        assert_eq!(r.net_weight, None);
    }

    #[test]
    fn colon_form_zero_flag_is_an_ack() {
        let resp = decode(LogicalCommand::Zero, b"81120008: 0.000 kg Z\r\n").unwrap();
        assert_eq!(resp, ScaleResponse::Ack);
    }

    // ---------- write acknowledgement ----------

    #[test]
    fn register_echo_of_write_token_is_an_ack() {
        let resp = decode(LogicalCommand::Tare, b"81120008:0C\r\n").unwrap();
        assert_eq!(resp, ScaleResponse::Ack);
        let resp = decode(LogicalCommand::Zero, b"81120008:0B\r\n").unwrap();
        assert_eq!(resp, ScaleResponse::Ack);
    }

    #[test]
    fn bare_register_echo_is_an_ack() {
        let resp = decode(LogicalCommand::Zero, b"21120008\r\n").unwrap();
        assert_eq!(resp, ScaleResponse::Ack);
    }

    #[test]
    fn bare_echo_does_not_satisfy_a_read() {
        let err = decode(LogicalCommand::ReadGross, b"20050026\r\n").unwrap_err();
        assert!(matches!(err, WireError::DecodeError(_)));
    }

    // ---------- status-prefix shape ----------

    #[test]
    fn status_prefix_stable_and_unstable() {
        let r = reading(decode(LogicalCommand::ReadGross, b"S 00032.000 kg\r\n").unwrap());
        assert_eq!(r.gross_weight, Some(32.0));
        assert_eq!(r.stability, Stability::Stable);
        assert_eq!(r.raw_status_code, "S");

        let r = reading(decode(LogicalCommand::ReadGross, b"U 00032.000 kg\r\n").unwrap());
        assert_eq!(r.stability, Stability::Unstable);
    }

    #[test]
    fn status_prefix_negative_weight() {
        let r = reading(decode(LogicalCommand::ReadGross, b"S -32.000 kg\r\n").unwrap());
        assert_eq!(r.gross_weight, Some(-32.0));
    }

    #[test]
    fn status_prefix_fills_net_for_net_query() {
        let r = reading(decode(LogicalCommand::ReadNet, b"S 5.125 kg\r\n").unwrap());
        assert_eq!(r.net_weight, Some(5.125));
        assert_eq!(r.gross_weight, None);
    }

    #[test]
    fn status_prefix_for_action_command_is_an_ack() {
        let resp = decode(LogicalCommand::Tare, b"S 0.000 kg\r\n").unwrap();
        assert_eq!(resp, ScaleResponse::Ack);
    }

    // ---------- error reply and totality ----------

    #[test]
    fn bare_e_reports_indicator_error() {
        let err = decode(LogicalCommand::ReadGross, b"E\r\n").unwrap_err();
        assert!(matches!(err, WireError::DecodeError(_)));
        assert!(err.to_string().contains("indicator reported error"));

        let err = decode(LogicalCommand::ReadGross, b"E 02\r\n").unwrap_err();
        assert!(matches!(err, WireError::DecodeError(_)));
    }

    #[test]
    fn junk_bytes_never_panic() {
        let junk: &[&[u8]] = &[
            b"",
            b"\r\n",
            b"\xFF\x00\xAB",
            b"hello world",
            b"2005002",
            b"200500266",
            b"20050026+kg",
            b"S  kg",
            b": 1 kg G",
            b"81050026: 23 kg X",
        ];
        for raw in junk {
            assert!(
                decode(LogicalCommand::ReadGross, raw).is_err(),
                "accepted junk: {:?}",
                raw
            );
        }
    }

    #[test]
    fn encode_appends_crlf() {
        assert_eq!(encode("20050026").unwrap(), b"20050026\r\n");
        assert_eq!(encode("21120008:0C").unwrap(), b"21120008:0C\r\n");
        assert!(encode("").is_err());
    }
}
