// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status payload decoding.
//!
//! The node answers a query with a flat JSON object of nine fields. The
//! firmware formats every value as a fixed-point string:
//!
//! ```json
//! {"irms":"2.30","urms":"120.10","pmean":"0.280","qmean":"0.000",
//!  "freq":"60.00","powerf":"1.000","pangle":"0.0","smean":"0.280",
//!  "kwh":"14.2000"}
//! ```
//!
//! Values are kept exactly as received, so the display shows what the
//! device reported. That holds for bare JSON numbers too: `120.10` stays
//! `120.10` and `1e2` stays `1e2`. Decoding is all-or-nothing: a payload missing any of
//! the nine fields yields [`DecodeError::MissingField`] and no reading.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

use crate::error::DecodeError;

/// A single measurement value, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingValue {
    /// Value reported as a string (what the firmware sends).
    Text(String),
    /// Value reported as a bare JSON number, holding the literal as sent.
    Number(String),
}

impl ReadingValue {
    /// Returns the value as the device formatted it.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(s) | Self::Number(s) => s,
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width/alignment flags work for the display columns
        f.pad(self.as_text())
    }
}

impl From<&str> for ReadingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ReadingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Serialize for ReadingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(literal) => RawValue::from_string(literal.clone())
                .map_err(<S::Error as ser::Error>::custom)?
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ReadingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Captured raw so number literals keep their exact digits
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let value: Value =
            serde_json::from_str(raw.get()).map_err(<D::Error as de::Error>::custom)?;
        match value {
            Value::String(s) => Ok(Self::Text(s)),
            Value::Number(_) => Ok(Self::Number(raw.get().to_string())),
            other => Err(<D::Error as de::Error>::custom(format!(
                "expected string or number, found {}",
                json_kind(&other)
            ))),
        }
    }
}

/// One snapshot of the node's electrical measurements.
///
/// # Examples
///
/// ```
/// use acpowermon::decode_reading;
///
/// let payload = br#"{"urms":"120.1","irms":"2.3","pmean":"0.28","smean":"0.28",
///     "qmean":"0.0","freq":"60.0","powerf":"1.0","pangle":"0.0","kwh":"14.2"}"#;
/// let reading = decode_reading(payload).unwrap();
/// assert_eq!(reading.voltage.to_string(), "120.1");
/// assert_eq!(reading.energy.to_string(), "14.2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// RMS voltage (V).
    #[serde(rename = "urms")]
    pub voltage: ReadingValue,

    /// RMS current (A).
    #[serde(rename = "irms")]
    pub current: ReadingValue,

    /// Mean real power (kW).
    #[serde(rename = "pmean")]
    pub real_power: ReadingValue,

    /// Mean apparent power (kVA).
    #[serde(rename = "smean")]
    pub apparent_power: ReadingValue,

    /// Mean reactive power (kVAR).
    #[serde(rename = "qmean")]
    pub reactive_power: ReadingValue,

    /// Line frequency (Hz).
    #[serde(rename = "freq")]
    pub frequency: ReadingValue,

    /// Power factor.
    #[serde(rename = "powerf")]
    pub power_factor: ReadingValue,

    /// Phase angle between voltage and current.
    #[serde(rename = "pangle")]
    pub phase_angle: ReadingValue,

    /// Cumulative energy (kWh).
    #[serde(rename = "kwh")]
    pub energy: ReadingValue,
}

impl Reading {
    /// Wire keys of the nine required fields, in display order.
    pub const FIELDS: [&'static str; 9] = [
        "urms", "irms", "pmean", "smean", "qmean", "freq", "powerf", "pangle", "kwh",
    ];

    /// Display labels matching [`Reading::FIELDS`].
    pub const LABELS: [&'static str; 9] = [
        "Vrms", "Arms", "kW", "kVA", "kVAR", "Freq", "PF", "PH>", "kWh",
    ];

    /// Returns `(label, value)` pairs in display order.
    #[must_use]
    pub fn labelled(&self) -> [(&'static str, &ReadingValue); 9] {
        let values = [
            &self.voltage,
            &self.current,
            &self.real_power,
            &self.apparent_power,
            &self.reactive_power,
            &self.frequency,
            &self.power_factor,
            &self.phase_angle,
            &self.energy,
        ];
        std::array::from_fn(|i| (Self::LABELS[i], values[i]))
    }

    /// Serializes the reading into the node's status payload format.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DecodeError> {
        serde_json::to_string(self).map_err(DecodeError::Json)
    }
}

/// Decodes a status payload into a [`Reading`].
///
/// Extra keys are ignored. The node also publishes other replies on the
/// status topic (e.g. `{"resetkwh":"..."}`); those fail with
/// [`DecodeError::MissingField`].
///
/// # Errors
///
/// - [`DecodeError::Json`] if the payload is not well-formed JSON
/// - [`DecodeError::NotAnObject`] if it is JSON but not an object
/// - [`DecodeError::MissingField`] naming the first absent field
/// - [`DecodeError::InvalidValue`] if a field is not a string or number
pub fn decode_reading(payload: &[u8]) -> Result<Reading, DecodeError> {
    let value: Value = serde_json::from_slice(payload)?;
    let Value::Object(map) = value else {
        return Err(DecodeError::NotAnObject);
    };

    for field in Reading::FIELDS {
        match map.get(field) {
            None => return Err(DecodeError::MissingField(field)),
            Some(Value::String(_) | Value::Number(_)) => {}
            Some(other) => {
                return Err(DecodeError::InvalidValue {
                    field,
                    message: format!("expected string or number, found {}", json_kind(other)),
                });
            }
        }
    }

    // Second pass over the bytes keeps number literals as sent
    serde_json::from_slice(payload).map_err(DecodeError::Json)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
