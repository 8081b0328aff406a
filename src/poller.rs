// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The query/reply polling loop.
//!
//! The poller keeps exactly one query outstanding. A new query is published
//! only right after subscribing, or right after a status message has been
//! handled:
//!
//! ```text
//! Connected ──► subscribe(status) ──► publish(query)
//!                                          │
//!        ┌─────────────────────────────────┘
//!        ▼
//! MessageReceived(status) ──► decode ──► sink ──► publish(query) ──┐
//!        ▲                                                         │
//!        └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A payload that fails to decode is reported and dropped, and the next
//! query still goes out. Subscribe and publish failures are fatal.

use tokio::sync::mpsc;

use crate::command::encode_query;
use crate::error::{ConnectionError, DecodeError, Error, PublishError};
use crate::protocol::{Event, Transport};
use crate::reading::decode_reading;
use crate::sink::DisplaySink;
use crate::topic::TopicPair;

/// Lifecycle of the polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection acknowledged yet.
    #[default]
    Disconnected,
    /// Connected, status subscription not yet in place.
    Connected,
    /// Subscribed with one query outstanding.
    SubscribedAwaitingReply,
    /// Terminal: subscribe or publish failed, or the session was lost.
    Failed,
}

/// What the poller did with one event.
#[derive(Debug)]
pub enum Outcome {
    /// Subscribed and sent the first query.
    Queried,
    /// A reading went to the sink and the next query was sent.
    Displayed,
    /// The payload could not be decoded; the next query was still sent.
    Discarded(DecodeError),
    /// The event was not for this poller or arrived in the wrong state.
    Ignored,
}

/// Drives the query/reply cycle against one monitoring node.
///
/// # Examples
///
/// ```no_run
/// use acpowermon::{ChannelSink, Config, Poller, protocol::MqttSession};
///
/// # async fn example() -> acpowermon::Result<()> {
/// let config = Config::default();
/// let (session, mut events) = MqttSession::connect(&config).await?;
/// let (sink, mut readings) = ChannelSink::default_pair();
///
/// std::thread::spawn(move || {
///     while let Some(reading) = readings.blocking_recv() {
///         println!("{} V", reading.voltage);
///     }
/// });
///
/// let mut poller = Poller::new(session, sink, config.topics());
/// poller.run(&mut events).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Poller<T, S> {
    transport: T,
    sink: S,
    topics: TopicPair,
    state: ConnectionState,
    round_trips: u64,
}

impl<T: Transport, S: DisplaySink> Poller<T, S> {
    /// Creates a poller in the [`ConnectionState::Disconnected`] state.
    #[must_use]
    pub fn new(transport: T, sink: S, topics: TopicPair) -> Self {
        Self {
            transport,
            sink,
            topics,
            state: ConnectionState::Disconnected,
            round_trips: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the number of status messages answered with a new query.
    #[must_use]
    pub fn round_trips(&self) -> u64 {
        self.round_trips
    }

    /// Returns the topics this poller uses.
    #[must_use]
    pub fn topics(&self) -> &TopicPair {
        &self.topics
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the display sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the poller, returning its transport and sink.
    #[must_use]
    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.sink)
    }

    /// Handles one event.
    ///
    /// # Errors
    ///
    /// - [`Error::Subscribe`] if the status subscription fails
    /// - [`Error::Publish`] if a query cannot be sent
    /// - [`Error::Connection`] on [`Event::Disconnected`]
    ///
    /// All of these leave the poller in [`ConnectionState::Failed`].
    pub async fn handle(&mut self, event: Event) -> Result<Outcome, Error> {
        match event {
            Event::Connected => self.on_connected().await,
            Event::MessageReceived(topic, payload) => self.on_message(&topic, &payload).await,
            Event::Disconnected { host, port, reason } => {
                tracing::error!(host = %host, port, reason = %reason, "Session lost");
                self.state = ConnectionState::Failed;
                Err(ConnectionError::Lost { host, port, reason }.into())
            }
        }
    }

    /// Handles events until the channel closes or a fatal error occurs.
    ///
    /// Returns `Ok(())` when the event channel closes, which happens after
    /// a local disconnect.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error from [`handle`](Self::handle).
    pub async fn run(&mut self, events: &mut mpsc::Receiver<Event>) -> Result<(), Error> {
        while let Some(event) = events.recv().await {
            self.handle(event).await?;
        }
        tracing::debug!(round_trips = self.round_trips, "Event channel closed");
        Ok(())
    }

    async fn on_connected(&mut self) -> Result<Outcome, Error> {
        if self.state != ConnectionState::Disconnected {
            tracing::warn!(state = ?self.state, "Unexpected connect event, ignoring");
            return Ok(Outcome::Ignored);
        }
        self.state = ConnectionState::Connected;

        if let Err(e) = self.transport.subscribe(self.topics.status()).await {
            tracing::error!(error = %e, "Status subscription failed, no query sent");
            self.state = ConnectionState::Failed;
            return Err(e.into());
        }

        self.query().await?;
        self.state = ConnectionState::SubscribedAwaitingReply;
        tracing::info!(
            command = %self.topics.command(),
            status = %self.topics.status(),
            "Polling started"
        );
        Ok(Outcome::Queried)
    }

    async fn on_message(&mut self, topic: &str, payload: &[u8]) -> Result<Outcome, Error> {
        if !self.topics.is_status(topic) {
            tracing::trace!(topic = %topic, "Ignoring message on foreign topic");
            return Ok(Outcome::Ignored);
        }
        if self.state != ConnectionState::SubscribedAwaitingReply {
            tracing::debug!(state = ?self.state, "Ignoring status message outside polling");
            return Ok(Outcome::Ignored);
        }

        let outcome = match decode_reading(payload) {
            Ok(reading) => {
                if let Err(e) = self.sink.update_reading(reading) {
                    tracing::warn!(error = %e, "Display update failed");
                }
                Outcome::Displayed
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "Discarding undecodable status payload"
                );
                Outcome::Discarded(e)
            }
        };

        self.query().await?;
        self.round_trips += 1;
        Ok(outcome)
    }

    async fn query(&mut self) -> Result<(), PublishError> {
        match self
            .transport
            .publish(self.topics.command(), encode_query())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, "Query publish failed, polling stops");
                self.state = ConnectionState::Failed;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SinkError, SubscribeError, TransportError};
    use crate::reading::Reading;
    use std::cell::RefCell;

    const STATUS: &str = "/home/lab/acpowermon/status";
    const COMMAND: &str = "/home/lab/acpowermon/command";
    const FULL: &[u8] = br#"{"urms":"120.1","irms":"2.3","pmean":"0.28","smean":"0.28","qmean":"0.0","freq":"60.0","powerf":"1.0","pangle":"0.0","kwh":"14.2"}"#;

    #[derive(Default)]
    struct FakeTransport {
        calls: RefCell<Vec<String>>,
        fail_subscribe: bool,
        fail_publish: bool,
    }

    impl Transport for FakeTransport {
        async fn subscribe(&self, topic: &str) -> Result<(), SubscribeError> {
            self.calls.borrow_mut().push(format!("sub {topic}"));
            if self.fail_subscribe {
                return Err(SubscribeError {
                    topic: topic.to_string(),
                    source: TransportError::ChannelClosed("test".to_string()),
                });
            }
            Ok(())
        }

        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
            self.calls.borrow_mut().push(format!(
                "pub {topic} {}",
                String::from_utf8(payload).unwrap()
            ));
            if self.fail_publish {
                return Err(PublishError {
                    topic: topic.to_string(),
                    source: TransportError::ChannelClosed("test".to_string()),
                });
            }
            Ok(())
        }
    }

    fn poller(
        transport: FakeTransport,
    ) -> Poller<FakeTransport, impl FnMut(Reading) -> Result<(), SinkError>> {
        Poller::new(
            transport,
            |_reading: Reading| -> Result<(), SinkError> { Ok(()) },
            TopicPair::resolve("/home/lab/acpowermon"),
        )
    }

    fn calls(p: &Poller<FakeTransport, impl DisplaySink>) -> Vec<String> {
        p.transport().calls.borrow().clone()
    }

    #[tokio::test]
    async fn connected_subscribes_then_queries() {
        let mut p = poller(FakeTransport::default());
        let outcome = p.handle(Event::Connected).await.unwrap();

        assert!(matches!(outcome, Outcome::Queried));
        assert_eq!(p.state(), ConnectionState::SubscribedAwaitingReply);
        assert_eq!(
            calls(&p),
            vec![
                format!("sub {STATUS}"),
                format!(r#"pub {COMMAND} {{"command":"query"}}"#),
            ]
        );
    }

    #[tokio::test]
    async fn subscribe_failure_sends_no_query() {
        let mut p = poller(FakeTransport {
            fail_subscribe: true,
            ..Default::default()
        });
        let err = p.handle(Event::Connected).await.unwrap_err();

        assert!(matches!(err, Error::Subscribe(_)));
        assert_eq!(p.state(), ConnectionState::Failed);
        assert_eq!(calls(&p), vec![format!("sub {STATUS}")]);
    }

    #[tokio::test]
    async fn publish_failure_is_fatal() {
        let mut p = poller(FakeTransport {
            fail_publish: true,
            ..Default::default()
        });
        let err = p.handle(Event::Connected).await.unwrap_err();

        assert!(matches!(err, Error::Publish(_)));
        assert_eq!(p.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn status_message_requeries_once() {
        let mut p = poller(FakeTransport::default());
        p.handle(Event::Connected).await.unwrap();

        let outcome = p
            .handle(Event::MessageReceived(STATUS.to_string(), FULL.to_vec()))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Displayed));
        assert_eq!(p.round_trips(), 1);
        assert_eq!(calls(&p).len(), 3);
    }

    #[tokio::test]
    async fn status_before_connect_is_ignored() {
        let mut p = poller(FakeTransport::default());
        let outcome = p
            .handle(Event::MessageReceived(STATUS.to_string(), FULL.to_vec()))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Ignored));
        assert!(calls(&p).is_empty());
    }

    #[tokio::test]
    async fn second_connect_is_ignored() {
        let mut p = poller(FakeTransport::default());
        p.handle(Event::Connected).await.unwrap();
        let outcome = p.handle(Event::Connected).await.unwrap();

        assert!(matches!(outcome, Outcome::Ignored));
        assert_eq!(calls(&p).len(), 2);
    }

    #[tokio::test]
    async fn disconnect_is_terminal() {
        let mut p = poller(FakeTransport::default());
        p.handle(Event::Connected).await.unwrap();

        let err = p
            .handle(Event::Disconnected {
                host: "mqtt".to_string(),
                port: 1883,
                reason: "keep-alive timeout".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ConnectionError::Lost { ref host, port: 1883, .. }) if host == "mqtt"
        ));
        assert!(err.to_string().contains("mqtt:1883"));
        assert_eq!(p.state(), ConnectionState::Failed);

        let outcome = p
            .handle(Event::MessageReceived(STATUS.to_string(), FULL.to_vec()))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Ignored));
    }

    #[tokio::test]
    async fn run_stops_when_channel_closes() {
        let mut p = poller(FakeTransport::default());
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(Event::Connected).await.unwrap();
        tx.send(Event::MessageReceived(STATUS.to_string(), FULL.to_vec()))
            .await
            .unwrap();
        tx.send(Event::MessageReceived(STATUS.to_string(), b"garbage".to_vec()))
            .await
            .unwrap();
        drop(tx);

        p.run(&mut rx).await.unwrap();
        assert_eq!(p.round_trips(), 2);
        assert_eq!(calls(&p).len(), 4);
    }
}
