// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Configuration for the link-test harness.

use std::time::Duration;

use anyhow::Context;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;

use fboss_client::RetryPolicy;

/// Settings for a link-test run. Every field may be omitted from the
/// configuration file, in which case the default is used.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Host running the agent and the qsfp_service.
    pub hostname: String,

    /// TCP port of the agent's control service.
    pub agent_port: u16,

    /// TCP port of the qsfp_service's control service.
    pub qsfp_port: u16,

    /// Per-call timeout, in seconds.
    pub timeout_secs: u64,

    /// Name of the platform under test. Selects the lab topology file.
    pub platform: String,

    /// Directory holding one lab topology document per platform.
    pub lab_config_dir: Utf8PathBuf,

    /// Agent configuration selected during setup.
    pub agent_config: String,

    /// How long to wait after the services start before checking ports.
    pub settle_time_secs: u64,

    /// Number of attempts made by the port and transceiver checks.
    pub check_attempts: u32,

    /// Delay between those attempts, in seconds.
    pub check_interval_secs: u64,

    /// How the agent and the qsfp_service are managed on the host.
    pub services: ServiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hostname: String::from("::1"),
            agent_port: common::DEFAULT_AGENT_PORT,
            qsfp_port: common::DEFAULT_QSFP_PORT,
            timeout_secs: common::DEFAULT_TIMEOUT_SECS,
            platform: String::new(),
            lab_config_dir: Utf8PathBuf::from(
                "/etc/fboss/lab/link_test_switch_config",
            ),
            agent_config: String::from("100G"),
            settle_time_secs: 120,
            check_attempts: 50,
            check_interval_secs: 5,
            services: ServiceConfig::default(),
        }
    }
}

impl Config {
    /// Read a configuration file in TOML format.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {path}"))?;
        toml::from_str(&contents).with_context(|| format!("parsing {path}"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_secs(self.settle_time_secs)
    }

    /// The retry policy applied to the port and transceiver checks.
    pub fn check_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.check_attempts,
            Duration::from_secs(self.check_interval_secs),
        )
    }

    /// Path of the lab topology document for this platform.
    pub fn lab_config_path(&self) -> Utf8PathBuf {
        self.lab_config_dir.join(&self.platform)
    }
}

/// Service management on the switch under test.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service manager used to stop and start the services.
    pub systemctl: Utf8PathBuf,

    /// Unit name of the agent.
    pub agent_unit: String,

    /// Unit name of the qsfp_service.
    pub qsfp_unit: String,

    /// Directory of named agent configurations, e.g. `100G`.
    pub agent_config_dir: Utf8PathBuf,

    /// Where the agent reads its configuration at startup.
    pub agent_config_path: Utf8PathBuf,

    /// Directories of persisted state removed by teardown.
    pub state_dirs: Vec<Utf8PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            systemctl: Utf8PathBuf::from("/usr/bin/systemctl"),
            agent_unit: String::from("wedge_agent"),
            qsfp_unit: String::from("qsfp_service"),
            agent_config_dir: Utf8PathBuf::from("/etc/coop/agent_configs"),
            agent_config_path: Utf8PathBuf::from("/etc/coop/agent.conf"),
            state_dirs: vec![
                Utf8PathBuf::from("/dev/shm/fboss"),
                Utf8PathBuf::from("/var/facebook/fboss"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(
            config.check_policy(),
            RetryPolicy::new(50, Duration::from_secs(5))
        );
        assert_eq!(config.settle_time(), Duration::from_secs(120));
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            platform = "wedge100s"
            lab_config_dir = "/tmp/lab"
            settle_time_secs = 0

            [services]
            agent_unit = "fboss_sw_agent"
            "#,
        )
        .unwrap();
        assert_eq!(config.lab_config_path(), "/tmp/lab/wedge100s");
        assert_eq!(config.settle_time(), Duration::ZERO);
        assert_eq!(config.services.agent_unit, "fboss_sw_agent");
        assert_eq!(config.services.qsfp_unit, "qsfp_service");
        assert_eq!(config.agent_config, "100G");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(toml::from_str::<Config>("settle_time = 3").is_err());
    }
}
