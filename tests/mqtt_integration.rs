// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT session using mockforge-mqtt.

use std::time::Duration;

use acpowermon::{
    ChannelSink, Config, ConnectionState, Event, MqttSession, Outcome, Poller, Transport,
};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::{sleep, timeout};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind
    sleep(Duration::from_millis(500)).await;
}

fn config_for(port: u16) -> Config {
    Config::builder()
        .host("127.0.0.1")
        .port(port)
        .connection_timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

// ============================================================================
// Session lifecycle
// ============================================================================

mod session {
    use super::*;

    #[tokio::test]
    async fn connect_reports_connected_first() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (session, mut events) = MqttSession::connect(&config_for(port)).await.unwrap();

        assert!(session.is_connected());
        assert_eq!(session.host(), "127.0.0.1");
        assert_eq!(session.port(), port);

        let first = timeout(Duration::from_secs(2), events.recv()).await.unwrap();
        assert_eq!(first, Some(Event::Connected));
    }

    #[tokio::test]
    async fn subscribe_and_publish_are_accepted() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = config_for(port);
        let topics = config.topics();
        let (session, _events) = MqttSession::connect(&config).await.unwrap();

        session.subscribe(topics.status()).await.unwrap();
        session
            .publish(topics.command(), acpowermon::encode_query())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_closes_events() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (session, mut events) = MqttSession::connect(&config_for(port)).await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Connected));

        session.disconnect().await;
        assert!(!session.is_connected());
        session.disconnect().await;

        // Local disconnect ends the stream without a Disconnected event
        let next = timeout(Duration::from_secs(5), events.recv()).await.unwrap();
        assert_eq!(next, None);
    }
}

// ============================================================================
// Poller against a live broker
// ============================================================================

mod poller {
    use super::*;

    #[tokio::test]
    async fn handshake_over_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = config_for(port);
        let (session, mut events) = MqttSession::connect(&config).await.unwrap();
        let (sink, _readings) = ChannelSink::default_pair();
        let mut poller = Poller::new(session, sink, config.topics());

        let event = events.recv().await.unwrap();
        let outcome = poller.handle(event).await.unwrap();

        assert!(matches!(outcome, Outcome::Queried));
        assert_eq!(poller.state(), ConnectionState::SubscribedAwaitingReply);

        poller.transport().disconnect().await;
        let result = timeout(Duration::from_secs(5), poller.run(&mut events))
            .await
            .unwrap();
        assert!(result.is_ok());
    }
}
