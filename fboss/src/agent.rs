// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use anyhow::Context;
use structopt::*;

use crate::CliOptions;

/// The agent option controlling its log verbosity.
const VERBOSITY_OPTION: &str = "v";

#[derive(Debug, StructOpt)]
#[structopt(about = "manage the agent")]
pub enum Agent {
    Config(Config),
}

#[derive(Debug, StructOpt)]
#[structopt(about = "show or reload the agent's configuration")]
pub enum Config {
    #[structopt(about = "show the running configuration")]
    Show {
        /// Show the configuration as indented JSON.
        #[structopt(long)]
        json: bool,
    },
    #[structopt(about = "reload the configuration file")]
    Reload,
}

fn format_config(config: &str, json: bool) -> anyhow::Result<String> {
    if !json {
        return Ok(config.to_string());
    }
    let value: serde_json::Value = serde_json::from_str(config)
        .context("running configuration is not valid JSON")?;
    Ok(serde_json::to_string_pretty(&value)?)
}

pub async fn agent_cmd(opts: &CliOptions, cmd: Agent) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    match cmd {
        Agent::Config(Config::Show { json }) => {
            let config = client
                .get_running_config()
                .await
                .context("failed to fetch running configuration")?;
            println!("{}", format_config(&config, json)?);
            Ok(())
        }
        Agent::Config(Config::Reload) => {
            client
                .reload_config()
                .await
                .context("failed to reload configuration")?;
            println!("Config reloaded");
            Ok(())
        }
    }
}

pub async fn verbosity(opts: &CliOptions, level: String) -> anyhow::Result<()> {
    opts.agent_client()?
        .set_option(String::from(VERBOSITY_OPTION), level)
        .await
        .context("failed to set verbosity")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_config() {
        let raw = r#"{"version":1}"#;
        assert_eq!(format_config(raw, false).unwrap(), raw);
        assert_eq!(
            format_config(raw, true).unwrap(),
            "{\n  \"version\": 1\n}"
        );
        assert!(format_config("version = 1", true).is_err());
    }
}
