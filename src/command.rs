// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commands sent to the monitoring node.
//!
//! Commands are JSON objects published on the node's command topic. The
//! poller only ever sends one of them:
//!
//! ```
//! use acpowermon::command::{Command, QueryCommand, encode_query};
//!
//! assert_eq!(QueryCommand.name(), "query");
//! assert_eq!(encode_query(), br#"{"command":"query"}"#.to_vec());
//! ```

/// A command that can be published to a monitoring node.
pub trait Command {
    /// Returns the value of the `command` key.
    fn name(&self) -> &'static str;

    /// Returns the serialized MQTT payload.
    ///
    /// Format: `{"command":"<name>"}`.
    fn payload(&self) -> String {
        format!(r#"{{"command":"{}"}}"#, self.name())
    }
}

/// Requests one reading from the node.
///
/// The node answers on the status topic with a single reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCommand;

impl Command for QueryCommand {
    fn name(&self) -> &'static str {
        "query"
    }
}

/// Serializes the query command into its wire payload.
#[must_use]
pub fn encode_query() -> Vec<u8> {
    QueryCommand.payload().into_bytes()
}
