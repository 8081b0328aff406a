// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `acpowermon` - poll an AC power monitoring node over MQTT.
//!
//! The node listens on `<base>/command` and answers a
//! `{"command":"query"}` with one reading on `<base>/status`. This library
//! keeps that exchange going: every reply is decoded, handed to a display
//! sink, and answered with the next query, so the polling rate is set by
//! how fast the node and broker respond.
//!
//! # Measurements
//!
//! | Key | Field | Unit |
//! |-----|-------|------|
//! | `urms` | [`Reading::voltage`] | V |
//! | `irms` | [`Reading::current`] | A |
//! | `pmean` | [`Reading::real_power`] | kW |
//! | `smean` | [`Reading::apparent_power`] | kVA |
//! | `qmean` | [`Reading::reactive_power`] | kVAR |
//! | `freq` | [`Reading::frequency`] | Hz |
//! | `powerf` | [`Reading::power_factor`] | |
//! | `pangle` | [`Reading::phase_angle`] | |
//! | `kwh` | [`Reading::energy`] | kWh |
//!
//! # Quick Start
//!
//! ```no_run
//! use acpowermon::{ChannelSink, Config, Poller, protocol::MqttSession};
//!
//! #[tokio::main]
//! async fn main() -> acpowermon::Result<()> {
//!     let config = Config::builder()
//!         .host("192.168.1.50")
//!         .base_topic("/home/lab/acpowermon")
//!         .build()?;
//!
//!     let (session, mut events) = MqttSession::connect(&config).await?;
//!     let (sink, mut readings) = ChannelSink::default_pair();
//!
//!     // The display runs in its own context
//!     std::thread::spawn(move || {
//!         while let Some(reading) = readings.blocking_recv() {
//!             println!("{} V  {} A  {} kWh", reading.voltage, reading.current, reading.energy);
//!         }
//!     });
//!
//!     let mut poller = Poller::new(session, sink, config.topics());
//!     poller.run(&mut events).await
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod poller;
pub mod protocol;
pub mod reading;
pub mod sink;
pub mod topic;

pub use command::{Command, QueryCommand, encode_query};
pub use config::{Config, ConfigBuilder};
pub use error::{
    ConfigError, ConnectionError, DecodeError, Error, PublishError, Result, SinkError,
    SubscribeError, TransportError,
};
pub use poller::{ConnectionState, Outcome, Poller};
pub use protocol::{Event, MqttSession, Transport};
pub use reading::{Reading, ReadingValue, decode_reading};
pub use sink::{ChannelSink, DisplaySink};
pub use topic::TopicPair;
