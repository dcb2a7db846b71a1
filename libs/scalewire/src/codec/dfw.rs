//! DFW_ASCII codec (Dini Argeo DFW indicator family)
//!
//! CR/LF-delimited comma-separated frames. Three response shapes:
//! a bare `OK` acknowledgement, the short weight form
//! `st,GS,<weight>,<unit>` and the extended form
//! `st,<n>,<net>,PT <tare>,<count>,<unit>`.

use crate::codec::ScaleResponse;
use crate::error::{WireError, WireResult};
use crate::reading::{Stability, WeightReading};

/// Encode a DFW command token; the indicator expects CR LF after the token
pub fn encode(token: &str) -> WireResult<Vec<u8>> {
    let token = token.trim();
    if token.is_empty() {
        return Err(WireError::config("DFW command token is empty"));
    }
    let mut bytes = Vec::with_capacity(token.len() + 2);
    bytes.extend_from_slice(token.as_bytes());
    bytes.extend_from_slice(b"\r\n");
    Ok(bytes)
}

/// Decode one DFW response frame
pub fn decode(raw: &[u8]) -> WireResult<ScaleResponse> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| WireError::decode(format!("DFW response is not ASCII: {:02X?}", snip(raw))))?;
    let line = text.trim_matches(['\r', '\n', ' ', '\t']);

    if line.is_empty() {
        return Err(WireError::decode("DFW response is empty"));
    }

    if line.eq_ignore_ascii_case("OK") {
        return Ok(ScaleResponse::Ack);
    }

    let fields: Vec<&str> = line.split(',').collect();
    match fields.len() {
        4 => decode_short(&fields, line),
        6 => decode_extended(&fields, line),
        n => Err(WireError::decode(format!(
            "DFW frame has {} fields, expected 4 or 6: {:?}",
            n, line
        ))),
    }
}

/// Short form: `st,GS,<weight>,<unit>`
fn decode_short(fields: &[&str], line: &str) -> WireResult<ScaleResponse> {
    let status = fields[0].trim();
    let stability = stability_for(status);
    let channel = fields[1].trim();
    let weight = parse_weight(fields[2], line)?;
    let unit = parse_unit(fields[3], line)?;

    let reading = match channel.to_ascii_uppercase().as_str() {
        "GS" => WeightReading::gross(weight, unit, stability),
        "NT" => WeightReading::net(weight, unit, stability),
        other => {
            return Err(WireError::decode(format!(
                "DFW frame names unknown channel {:?}: {:?}",
                other, line
            )))
        }
    };
    Ok(ScaleResponse::Reading(reading.with_raw_status(status)))
}

/// Extended form: `st,<n>,<net>,PT <tare>,<count>,<unit>`
fn decode_extended(fields: &[&str], line: &str) -> WireResult<ScaleResponse> {
    let status = fields[0].trim();
    let stability = stability_for(status);
    let net = parse_weight(fields[2], line)?;
    let tare = parse_preset_tare(fields[3], line)?;
    let unit = parse_unit(fields[5], line)?;

    let reading = WeightReading::net(net, unit, stability)
        .with_tare(tare)
        .with_raw_status(status);
    Ok(ScaleResponse::Reading(reading))
}

/// Map the two-letter status field; unrecognized codes decode as Unknown
fn stability_for(status: &str) -> Stability {
    match status.to_ascii_uppercase().as_str() {
        "ST" => Stability::Stable,
        "US" => Stability::Unstable,
        "OL" => Stability::Overload,
        "UL" => Stability::Underload,
        _ => Stability::Unknown,
    }
}

fn parse_weight(field: &str, line: &str) -> WireResult<f64> {
    let trimmed = field.trim().trim_start_matches('+');
    trimmed.parse::<f64>().map_err(|_| {
        WireError::decode(format!(
            "DFW weight field {:?} is not a number: {:?}",
            field, line
        ))
    })
}

/// `PT <tare>` field of the extended form
fn parse_preset_tare(field: &str, line: &str) -> WireResult<f64> {
    let trimmed = field.trim();
    let rest = trimmed
        .strip_prefix("PT")
        .or_else(|| trimmed.strip_prefix("pt"))
        .ok_or_else(|| {
            WireError::decode(format!(
                "DFW tare field {:?} lacks PT prefix: {:?}",
                field, line
            ))
        })?;
    parse_weight(rest, line)
}

fn parse_unit(field: &str, line: &str) -> WireResult<String> {
    let unit = field.trim();
    if unit.is_empty() {
        return Err(WireError::decode(format!(
            "DFW frame is missing the unit field: {:?}",
            line
        )));
    }
    Ok(unit.to_string())
}

fn snip(raw: &[u8]) -> &[u8] {
    &raw[..raw.len().min(32)]
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

    // ---------- short form ----------

    #[test]
    fn short_form_gross_stable() {
        let r = reading(decode(b"ST,GS,  12.500,kg\r\n").unwrap());
        assert_eq!(r.gross_weight, Some(12.5));
        assert_eq!(r.net_weight, None);
        assert_eq!(r.unit, "kg");
        assert_eq!(r.stability, Stability::Stable);
        assert_eq!(r.raw_status_code, "ST");
    }

    #[test]
    fn short_form_net_channel_fills_net() {
        let r = reading(decode(b"US,NT,3.250,kg\r\n").unwrap());
        assert_eq!(r.net_weight, Some(3.25));
        assert_eq!(r.gross_weight, None);
        assert_eq!(r.stability, Stability::Unstable);
    }

    #[test]
    fn short_form_accepts_explicit_plus_sign() {
        let r = reading(decode(b"ST,GS,+00023.450,kg\r\n").unwrap());
        assert_eq!(r.gross_weight, Some(23.45));
    }

    #[test]
    fn short_form_overload_and_underload_flags() {
        let r = reading(decode(b"OL,GS,99999.9,kg\r\n").unwrap());
        assert_eq!(r.stability, Stability::Overload);
        let r = reading(decode(b"UL,GS,-1.0,kg\r\n").unwrap());
        assert_eq!(r.stability, Stability::Underload);
    }

    #[test]
    fn unknown_status_code_still_decodes() {
        let r = reading(decode(b"XX,GS,5.0,kg\r\n").unwrap());
        assert_eq!(r.stability, Stability::Unknown);
        assert_eq!(r.raw_status_code, "XX");
        assert_eq!(r.gross_weight, Some(5.0));
    }

    // ---------- extended form ----------

    #[test]
    fn extended_form_net_and_preset_tare() {
        let r = reading(decode(b"US,1,  7.200,PT  1.300,5,kg\r\n").unwrap());
        assert_eq!(r.net_weight, Some(7.2));
        assert_eq!(r.tare_weight, Some(1.3));
        assert_eq!(r.unit, "kg");
        assert_eq!(r.stability, Stability::Unstable);
        assert_eq!(r.gross_weight, None);
    }

    #[test]
    fn extended_form_requires_pt_prefix() {
        let err = decode(b"ST,1,7.2,1.3,5,kg\r\n").unwrap_err();
        assert!(matches!(err, WireError::DecodeError(_)));
        assert!(err.to_string().contains("PT"));
    }

    // ---------- acknowledgement ----------

    #[test]
    fn bare_ok_is_an_ack() {
        assert_eq!(decode(b"OK\r\n").unwrap(), ScaleResponse::Ack);
        assert_eq!(decode(b"ok\r\n").unwrap(), ScaleResponse::Ack);
        assert_eq!(decode(b"  OK  \r\n").unwrap(), ScaleResponse::Ack);
    }

    // ---------- decode totality ----------

    #[test]
    fn wrong_field_count_is_a_decode_error() {
        assert!(decode(b"ST,GS,12.5\r\n").is_err());
        assert!(decode(b"ST,GS,12.5,kg,extra\r\n").is_err());
        assert!(decode(b"\r\n").is_err());
    }

    #[test]
    fn unparsable_weight_is_a_decode_error() {
        let err = decode(b"ST,GS,abc,kg\r\n").unwrap_err();
        assert!(matches!(err, WireError::DecodeError(_)));
    }

    #[test]
    fn unknown_channel_is_a_decode_error() {
        assert!(decode(b"ST,QQ,12.5,kg\r\n").is_err());
    }

    #[test]
    fn missing_unit_is_a_decode_error() {
        assert!(decode(b"ST,GS,12.5, \r\n").is_err());
    }

    #[test]
    fn junk_bytes_never_panic() {
        let junk: &[&[u8]] = &[
            b"",
            b"\xFF\xFE\xFD",
            b",,,,,,,,",
            b"OKOK",
            b"ST,GS",
            b"1,2,3,4,5,6,7",
            b"\r\n\r\n",
        ];
        for raw in junk {
            assert!(decode(raw).is_err(), "accepted junk: {:?}", raw);
        }
    }

    #[test]
    fn encode_appends_crlf() {
        assert_eq!(encode("READ").unwrap(), b"READ\r\n");
        assert_eq!(encode(" TARE ").unwrap(), b"TARE\r\n");
        assert!(encode("  ").is_err());
    }
}
