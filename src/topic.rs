// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command and status topic derivation.
//!
//! A monitoring node listens on `<base>/command` and answers on
//! `<base>/status`:
//!
//! ```text
//! /home/lab/acpowermon/command  ← {"command":"query"}
//! /home/lab/acpowermon/status   → {"urms":"120.1", ...}
//! ```

/// Suffix appended to the base topic for commands.
pub const COMMAND_SUFFIX: &str = "/command";

/// Suffix appended to the base topic for status messages.
pub const STATUS_SUFFIX: &str = "/status";

/// The command/status topics of one monitoring node.
///
/// Both topics always share the same base prefix.
///
/// # Examples
///
/// ```
/// use acpowermon::TopicPair;
///
/// let topics = TopicPair::resolve("/home/lab/acpowermon");
/// assert_eq!(topics.command(), "/home/lab/acpowermon/command");
/// assert_eq!(topics.status(), "/home/lab/acpowermon/status");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPair {
    command: String,
    status: String,
}

impl TopicPair {
    /// Derives both topics from `base_topic` by plain concatenation.
    #[must_use]
    pub fn resolve(base_topic: &str) -> Self {
        Self {
            command: format!("{base_topic}{COMMAND_SUFFIX}"),
            status: format!("{base_topic}{STATUS_SUFFIX}"),
        }
    }

    /// Returns the command topic.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the status topic.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns whether `topic` is exactly this node's status topic.
    #[must_use]
    pub fn is_status(&self, topic: &str) -> bool {
        topic == self.status
    }
}
