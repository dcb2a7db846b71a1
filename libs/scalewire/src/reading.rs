//! Normalized weight reading produced by the protocol decoders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stability flag reported by the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Stable,
    Unstable,
    Overload,
    Underload,
    Unknown,
}

/// One decoded weight sample.
///
/// Only the fields the vendor response actually carried are set; the
/// timestamp is assigned by the executor when the exchange completes, never
/// parsed off the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WeightReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tare_weight: Option<f64>,
    /// Measurement unit as reported (kg, lb, g)
    pub unit: String,
    pub stability: Stability,
    /// Verbatim vendor status field
    pub raw_status_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WeightReading {
    pub fn gross(value: f64, unit: impl Into<String>, stability: Stability) -> Self {
        Self {
            gross_weight: Some(value),
            net_weight: None,
            tare_weight: None,
            unit: unit.into(),
            stability,
            raw_status_code: String::new(),
            timestamp: None,
        }
    }

    pub fn net(value: f64, unit: impl Into<String>, stability: Stability) -> Self {
        Self {
            gross_weight: None,
            net_weight: Some(value),
            tare_weight: None,
            unit: unit.into(),
            stability,
            raw_status_code: String::new(),
            timestamp: None,
        }
    }

    pub fn with_tare(mut self, tare: f64) -> Self {
        self.tare_weight = Some(tare);
        self
    }

    pub fn with_raw_status(mut self, raw: impl Into<String>) -> Self {
        self.raw_status_code = raw.into();
        self
    }

    /// Assign the completion timestamp
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}
