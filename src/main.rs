// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `acpowermon` - live terminal display for an AC power monitoring node.
//!
//! # Usage
//!
//! ```bash
//! acpowermon --host mqtt --port 1883 --basetopic /home/lab/acpowermon
//! acpowermon --host 192.168.1.50 --user reader --pw secret
//! RUST_LOG=acpowermon=debug acpowermon
//! ```

use std::io::Write;
use std::process::ExitCode;

use acpowermon::config::{DEFAULT_BASE_TOPIC, DEFAULT_HOST, DEFAULT_PORT};
use acpowermon::{ChannelSink, Config, MqttSession, Poller, Reading};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Poll an AC power monitor over MQTT and display its readings.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Host name of the MQTT broker
    #[arg(long, default_value = DEFAULT_HOST, env = "ACPOWERMON_HOST")]
    host: String,

    /// Port number of the MQTT broker
    #[arg(long, default_value_t = DEFAULT_PORT, env = "ACPOWERMON_PORT")]
    port: u16,

    /// Broker username
    #[arg(long, env = "ACPOWERMON_USER")]
    user: Option<String>,

    /// Broker password (requires --user)
    #[arg(long, env = "ACPOWERMON_PW", requires = "user")]
    pw: Option<String>,

    /// Base topic for command and status messages
    #[arg(long, default_value = DEFAULT_BASE_TOPIC, env = "ACPOWERMON_BASETOPIC")]
    basetopic: String,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn to_config(&self) -> Result<Config, acpowermon::ConfigError> {
        let mut builder = Config::builder()
            .host(&self.host)
            .port(self.port)
            .base_topic(&self.basetopic);
        if let Some(user) = &self.user {
            builder = builder.username(user);
        }
        if let Some(pw) = &self.pw {
            builder = builder.password(pw);
        }
        builder.build()
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "acpowermon stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> acpowermon::Result<()> {
    let config = args.to_config()?;
    let topics = config.topics();

    let (session, mut events) = MqttSession::connect(&config).await?;

    let (sink, readings) = ChannelSink::default_pair();
    let title = config.base_topic().to_string();
    let display = std::thread::spawn(move || render_readings(&title, readings));

    let mut poller = Poller::new(session, sink, topics);
    let result = tokio::select! {
        result = poller.run(&mut events) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    };

    let (session, sink) = poller.into_parts();
    session.disconnect().await;
    drop(session);
    // Closing the sink ends the display loop
    drop(sink);
    if display.join().is_err() {
        tracing::warn!("Display thread panicked");
    }

    result
}

/// Presentation loop: owns stdout and redraws on every reading.
fn render_readings(title: &str, mut readings: mpsc::Receiver<Reading>) {
    let mut stdout = std::io::stdout().lock();
    while let Some(reading) = readings.blocking_recv() {
        if stdout.write_all(render_panel(title, &reading).as_bytes()).is_err()
            || stdout.flush().is_err()
        {
            break;
        }
    }
}

fn render_panel(title: &str, reading: &Reading) -> String {
    use std::fmt::Write as _;

    let mut out = format!("\n{title}\n");
    for (label, value) in reading.labelled() {
        let _ = writeln!(out, "{value:>10}  {label}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::parse_from(["acpowermon"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.host(), "mqtt");
        assert_eq!(config.port(), 1883);
        assert_eq!(config.base_topic(), "/home/lab/acpowermon");
        assert!(config.username().is_none());
    }

    #[test]
    fn args_with_credentials() {
        let args = Args::parse_from([
            "acpowermon",
            "--host",
            "broker.local",
            "--port",
            "8883",
            "--user",
            "reader",
            "--pw",
            "secret",
            "--basetopic",
            "/garage/meter",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.host(), "broker.local");
        assert_eq!(config.port(), 8883);
        assert_eq!(config.username(), Some("reader"));
        assert_eq!(config.password(), Some("secret"));
        assert_eq!(config.topics().command(), "/garage/meter/command");
    }

    #[test]
    fn password_requires_user() {
        assert!(Args::try_parse_from(["acpowermon", "--pw", "secret"]).is_err());
    }

    #[test]
    fn panel_lists_all_fields() {
        let reading = acpowermon::decode_reading(
            br#"{"urms":"120.1","irms":"2.3","pmean":"0.28","smean":"0.28","qmean":"0.0","freq":"60.0","powerf":"1.0","pangle":"0.0","kwh":"14.2"}"#,
        )
        .unwrap();
        let panel = render_panel("/home/lab/acpowermon", &reading);
        let lines: Vec<&str> = panel.lines().collect();

        assert_eq!(lines[1], "/home/lab/acpowermon");
        assert_eq!(lines[2], "     120.1  Vrms");
        assert_eq!(lines[10], "      14.2  kWh");
        assert_eq!(lines.len(), 11);
    }
}
