// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker session.
//!
//! # Examples
//!
//! ```no_run
//! use acpowermon::{Config, protocol::{MqttSession, Transport}};
//!
//! # async fn example() -> acpowermon::Result<()> {
//! let config = Config::builder().host("192.168.1.50").build()?;
//! let (session, mut events) = MqttSession::connect(&config).await?;
//!
//! session.subscribe("/home/lab/acpowermon/status").await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//!
//! session.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rumqttc::{AsyncClient, EventLoop, MqttOptions, Outgoing, QoS};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{ConnectionError, PublishError, SubscribeError, TransportError};
use crate::protocol::{Event, Transport};

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Capacity of the client's request queue.
const REQUEST_CAPACITY: usize = 10;

/// Capacity of the event channel towards the poller.
const EVENT_CAPACITY: usize = 64;

/// A live connection to the MQTT broker.
///
/// Dropping the session sends a best-effort disconnect if
/// [`disconnect`](Self::disconnect) was not called.
pub struct MqttSession {
    client: AsyncClient,
    host: String,
    port: u16,
    /// Cleared on local disconnect or when the network task stops.
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MqttSession {
    /// Connects to the broker and waits for its `ConnAck`.
    ///
    /// Returns the session and the receiver of its [`Event`]s. The first
    /// event is always [`Event::Connected`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Refused`] if the network or broker rejects
    /// the connection and [`ConnectionError::Timeout`] if no `ConnAck`
    /// arrives within the configured timeout.
    pub async fn connect(config: &Config) -> Result<(Self, mpsc::Receiver<Event>), ConnectionError> {
        let host = config.host().to_string();
        let port = config.port();

        let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("acpowermon_{}_{}", std::process::id(), counter);

        let mut mqtt_options = MqttOptions::new(&client_id, &host, port);
        mqtt_options.set_keep_alive(config.keep_alive());
        mqtt_options.set_clean_session(true);

        if let Some(username) = config.username() {
            mqtt_options.set_credentials(username, config.password().unwrap_or_default());
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (connack_tx, connack_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(false));

        tracing::debug!(client_id = %client_id, host = %host, port, "Connecting to MQTT broker");

        let task = tokio::spawn(handle_session_events(
            event_loop,
            SessionLink {
                host: host.clone(),
                port,
                events: events_tx,
                connected: Arc::clone(&connected),
            },
            connack_tx,
        ));

        let timeout = config.connection_timeout();
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(host = %host, port, "Connected to MQTT broker");
            }
            Ok(Ok(Err(reason))) => {
                return Err(ConnectionError::Refused { host, port, reason });
            }
            Ok(Err(_)) => {
                return Err(ConnectionError::Refused {
                    host,
                    port,
                    reason: "MQTT event loop terminated unexpectedly".to_string(),
                });
            }
            Err(_) => {
                task.abort();
                return Err(ConnectionError::Timeout {
                    host,
                    port,
                    secs: timeout.as_secs(),
                });
            }
        }

        let session = Self {
            client,
            host,
            port,
            connected,
            task,
        };
        Ok((session, events_rx))
    }

    /// Returns whether the session is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Disconnects from the broker.
    ///
    /// Idempotent; calls after the first one, or after the session was
    /// lost, do nothing. Failures are logged since the session is going
    /// away regardless.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        tracing::info!(host = %self.host, port = self.port, "Disconnecting from MQTT broker");

        if let Err(e) = self.client.disconnect().await {
            tracing::warn!(error = %e, "Failed to send MQTT disconnect");
        }
    }
}

impl Transport for MqttSession {
    async fn subscribe(&self, topic: &str) -> Result<(), SubscribeError> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| SubscribeError {
                topic: topic.to_string(),
                source: TransportError::Mqtt(e),
            })?;

        tracing::debug!(topic = %topic, "Subscribed");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        tracing::debug!(
            topic = %topic,
            payload = %String::from_utf8_lossy(&payload),
            "Publishing MQTT message"
        );

        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| PublishError {
                topic: topic.to_string(),
                source: TransportError::Mqtt(e),
            })
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(host = %self.host, "Session dropped while connected, disconnecting");
        if self.client.try_disconnect().is_err() {
            self.task.abort();
        }
    }
}

impl std::fmt::Debug for MqttSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttSession")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Channel and identity the network task reports through.
struct SessionLink {
    host: String,
    port: u16,
    events: mpsc::Sender<Event>,
    connected: Arc<AtomicBool>,
}

impl SessionLink {
    async fn lost(&self, reason: String) {
        let _ = self
            .events
            .send(Event::Disconnected {
                host: self.host.clone(),
                port: self.port,
                reason,
            })
            .await;
    }
}

/// Drives the `rumqttc` event loop and forwards what the poller needs.
///
/// Runs until the connection fails, the broker disconnects, a local
/// disconnect is flushed, or the poller drops its receiver. There is no
/// reconnect: the first error ends the session.
async fn handle_session_events(
    mut event_loop: EventLoop,
    link: SessionLink,
    connack_tx: oneshot::Sender<Result<(), String>>,
) {
    use rumqttc::{Event as MqttEvent, Packet};

    let mut connack_tx = Some(connack_tx);

    loop {
        let event = match event_loop.poll().await {
            Ok(MqttEvent::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                link.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                }
                Event::Connected
            }
            Ok(MqttEvent::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
                continue;
            }
            Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                Event::MessageReceived(publish.topic, publish.payload.to_vec())
            }
            Ok(MqttEvent::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                link.connected.store(false, Ordering::Release);
                link.lost("broker sent disconnect".to_string()).await;
                break;
            }
            Ok(MqttEvent::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("MQTT disconnect flushed");
                link.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                if let Some(tx) = connack_tx.take() {
                    tracing::debug!(error = %e, "MQTT connection failed");
                    let _ = tx.send(Err(e.to_string()));
                    break;
                }
                // A local disconnect already cleared the flag; the error is
                // just the socket closing behind it.
                if link.connected.swap(false, Ordering::AcqRel) {
                    tracing::error!(error = %e, "MQTT session event loop error");
                    link.lost(e.to_string()).await;
                }
                break;
            }
        };

        if link.events.send(event).await.is_err() {
            tracing::debug!("Event receiver dropped, stopping MQTT event loop");
            break;
        }
    }
}
