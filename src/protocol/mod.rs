// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker transport and session lifecycle.
//!
//! - [`Transport`]: the subscribe/publish seam the poller drives
//! - [`MqttSession`]: a `rumqttc` connection implementing [`Transport`]
//! - [`Event`]: what the session's network task reports to the poller
//!
//! The network I/O runs on its own tokio task. Incoming packets are turned
//! into [`Event`]s and queued on a channel, so they are consumed one at a
//! time and never concurrently.

mod mqtt_session;

pub use mqtt_session::MqttSession;

use crate::error::{PublishError, SubscribeError};

/// An event delivered by the session's network task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The broker acknowledged the connection.
    Connected,

    /// A message arrived on a subscribed topic.
    MessageReceived(String, Vec<u8>),

    /// The session terminated; no further events follow.
    Disconnected {
        /// Broker host of the lost session.
        host: String,
        /// Broker port of the lost session.
        port: u16,
        /// Transport-reported cause.
        reason: String,
    },
}

/// Publish/subscribe operations used by the poller.
///
/// Both operations return once the request is queued with the transport;
/// they do not wait for broker acknowledgement.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Subscribes to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError`] if the request cannot be queued.
    async fn subscribe(&self, topic: &str) -> Result<(), SubscribeError>;

    /// Publishes `payload` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the request cannot be queued.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}
