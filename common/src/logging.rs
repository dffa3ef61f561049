// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;
use slog::Drain;
use slog::Logger;

/// Output log info in unstructured text or json?
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Human,
    #[default]
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h" | "human" => Ok(LogFormat::Human),
            "j" | "json" => Ok(LogFormat::Json),
            _ => Err(format!("invalid log format: {s}")),
        }
    }
}

fn build<W: Write + Send + 'static>(
    name: &str,
    w: W,
    format: LogFormat,
) -> Logger {
    let drain = match format {
        LogFormat::Json => {
            let drain = slog_bunyan::new(w).build().fuse();
            slog_async::Async::new(drain)
                .chan_size(0x2000)
                .build()
                .fuse()
        }
        LogFormat::Human => {
            let decorator = slog_term::PlainDecorator::new(w);
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            slog_async::Async::new(drain)
                .chan_size(0x2000)
                .build()
                .fuse()
        }
    };
    Logger::root(drain, slog::o!("name" => name.to_string()))
}

/// Build the root logger for a process.
///
/// If `log_file` is set, records are appended to that file, otherwise they
/// go to stdout.
pub fn init(
    name: &str,
    log_file: &Option<String>,
    format: LogFormat,
) -> anyhow::Result<Logger> {
    Ok(match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {path}"))?;
            build(name, file, format)
        }
        None => build(name, std::io::stdout(), format),
    })
}

/// Build a human-readable logger on stderr, for interactive tools whose
/// stdout carries their actual output.
pub fn init_stderr(name: &str) -> Logger {
    build(name, std::io::stderr(), LogFormat::Human)
}

#[cfg(test)]
mod tests {
    use super::LogFormat;

    #[test]
    fn test_parse_log_format() {
        assert_eq!("human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("j".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("bunyan".parse::<LogFormat>().is_err());
    }
}
