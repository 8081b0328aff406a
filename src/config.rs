// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker and device configuration.
//!
//! A [`Config`] is built once at startup and never changes afterwards.
//!
//! # Examples
//!
//! ```
//! use acpowermon::Config;
//!
//! let config = Config::builder()
//!     .host("192.168.1.50")
//!     .credentials("user", "password")
//!     .base_topic("/home/garage/acpowermon")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.port(), 1883);
//! assert_eq!(config.topics().status(), "/home/garage/acpowermon/status");
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::topic::TopicPair;

/// Default broker host.
pub const DEFAULT_HOST: &str = "mqtt";

/// Default broker port.
pub const DEFAULT_PORT: u16 = 1883;

/// Default base topic of the monitoring node.
pub const DEFAULT_BASE_TOPIC: &str = "/home/lab/acpowermon";

/// Immutable configuration for one monitoring session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    base_topic: String,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            base_topic: DEFAULT_BASE_TOPIC.to_string(),
            keep_alive: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Creates a builder seeded with the default values.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
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

    /// Returns the username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the password, if any.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the base topic of the monitoring node.
    #[must_use]
    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// Returns the MQTT keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Returns how long to wait for the broker's `ConnAck`.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Derives the command/status topic pair from the base topic.
    #[must_use]
    pub fn topics(&self) -> TopicPair {
        TopicPair::resolve(&self.base_topic)
    }

    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the host or base topic is empty, the port
    /// is zero, or a password is set without a username.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::PasswordWithoutUsername);
        }
        if self.base_topic.is_empty() {
            return Err(ConfigError::EmptyBaseTopic);
        }
        Ok(())
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the broker host (default: `mqtt`).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the username and password.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    /// Sets only the username, leaving the password empty.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Sets only the password. Requires a username to validate.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Sets the base topic (default: `/home/lab/acpowermon`).
    #[must_use]
    pub fn base_topic(mut self, base_topic: impl Into<String>) -> Self {
        self.config.base_topic = base_topic.into();
        self
    }

    /// Sets the keep-alive interval (default: 60 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if [`Config::validate`] fails.
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
