// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display sinks receiving decoded readings.
//!
//! The poller runs on the transport's task and must never block on the
//! presentation layer. [`ChannelSink`] hands readings over a bounded channel
//! to whatever thread owns the display; if that side falls behind the
//! reading is dropped and polling carries on.
//!
//! # Examples
//!
//! ```
//! use acpowermon::sink::{ChannelSink, DisplaySink};
//! # use acpowermon::decode_reading;
//! # let reading = decode_reading(br#"{"urms":"1","irms":"1","pmean":"1","smean":"1",
//! #     "qmean":"1","freq":"1","powerf":"1","pangle":"1","kwh":"1"}"#).unwrap();
//!
//! let (mut sink, mut readings) = ChannelSink::new(4);
//! sink.update_reading(reading.clone()).unwrap();
//!
//! // On the display thread:
//! assert_eq!(readings.blocking_recv(), Some(reading));
//! ```

use tokio::sync::mpsc;

use crate::error::SinkError;
use crate::reading::Reading;

/// Receives every successfully decoded reading.
pub trait DisplaySink {
    /// Delivers a reading to the presentation layer.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the reading could not be delivered. The
    /// poller logs the failure and keeps polling.
    fn update_reading(&mut self, reading: Reading) -> Result<(), SinkError>;
}

impl<F> DisplaySink for F
where
    F: FnMut(Reading) -> Result<(), SinkError>,
{
    fn update_reading(&mut self, reading: Reading) -> Result<(), SinkError> {
        self(reading)
    }
}

/// Default capacity used by [`ChannelSink::default_pair`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Hands readings to another execution context over a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Reading>,
}

impl ChannelSink {
    /// Creates a sink and the receiver for the display side.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Reading>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Creates a sink with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn default_pair() -> (Self, mpsc::Receiver<Reading>) {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Returns whether the display side has hung up.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl DisplaySink for ChannelSink {
    fn update_reading(&mut self, reading: Reading) -> Result<(), SinkError> {
        self.sender.try_send(reading).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
