// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `acpowermon` library.
//!
//! Failures split into two groups. Session-level errors (configuration,
//! connection, subscribe, publish) are fatal and propagate to the caller.
//! Payload-level errors ([`DecodeError`], [`SinkError`]) are reported by the
//! polling loop and never stop it.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was rejected before connecting.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The broker could not be reached or the session was lost.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Subscribing to the status topic failed.
    #[error("subscribe error: {0}")]
    Subscribe(#[from] SubscribeError),

    /// A query command could not be published.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// A status payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors raised while validating a [`Config`](crate::Config).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The broker host is empty.
    #[error("broker host is required")]
    EmptyHost,

    /// The broker port is outside 1-65535.
    #[error("broker port must be in [1, 65535]")]
    InvalidPort,

    /// A password was supplied without a username.
    #[error("password supplied without a username")]
    PasswordWithoutUsername,

    /// The base topic is empty.
    #[error("base topic must not be empty")]
    EmptyBaseTopic,
}

/// Errors establishing or keeping the broker connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The broker refused the connection or the network failed before `ConnAck`.
    #[error("cannot connect to {host}:{port}: {reason}")]
    Refused {
        /// Broker host.
        host: String,
        /// Broker port.
        port: u16,
        /// Transport-reported cause.
        reason: String,
    },

    /// No `ConnAck` arrived within the connection timeout.
    #[error("connection to {host}:{port} timed out after {secs}s")]
    Timeout {
        /// Broker host.
        host: String,
        /// Broker port.
        port: u16,
        /// Elapsed timeout in seconds.
        secs: u64,
    },

    /// An established session terminated.
    #[error("connection to {host}:{port} lost: {reason}")]
    Lost {
        /// Broker host.
        host: String,
        /// Broker port.
        port: u16,
        /// Transport-reported cause.
        reason: String,
    },
}

/// Low-level transport failure underlying subscribe/publish errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The MQTT client rejected the request.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The transport's request channel is gone.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Subscribing to a topic failed.
#[derive(Debug, Error)]
#[error("failed to subscribe to {topic}: {source}")]
pub struct SubscribeError {
    /// Topic the subscription was for.
    pub topic: String,
    /// Underlying transport failure.
    #[source]
    pub source: TransportError,
}

/// Publishing to a topic failed.
#[derive(Debug, Error)]
#[error("failed to publish to {topic}: {source}")]
pub struct PublishError {
    /// Topic the payload was destined for.
    pub topic: String,
    /// Underlying transport failure.
    #[source]
    pub source: TransportError,
}

/// Errors decoding a status payload into a [`Reading`](crate::Reading).
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not well-formed JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required reading field is absent.
    #[error("missing field in status payload: {0}")]
    MissingField(&'static str),

    /// A required field holds something other than a string or number.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },
}

impl DecodeError {
    /// Returns `true` if this is a [`DecodeError::MissingField`].
    #[must_use]
    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField(_))
    }
}

/// Errors delivering a reading to a display sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The presentation side has gone away.
    #[error("display channel closed")]
    Closed,

    /// The presentation side is not keeping up.
    #[error("display channel full")]
    Full,

    /// The sink refused the reading.
    #[error("reading rejected: {0}")]
    Rejected(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
