// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Harness for link tests run against a switch in the lab.
//!
//! A [`LinkTestCase`] restarts the agent and the qsfp_service with a known
//! configuration, waits for the links described by the lab topology to come
//! up, and offers the queries and checks individual tests are built from.

use std::collections::BTreeMap;

use serde::Serialize;
use slog::info;
use slog::warn;
use slog::Logger;
use tokio::sync::OnceCell;

use fboss_client::types::PortOperState;
use fboss_client::types::TransceiverInfo;
use fboss_client::AgentClient;
use fboss_client::ClientState;
use fboss_client::FbossCtrl;
use fboss_client::HttpTransport;
use fboss_client::QsfpClient;
use fboss_client::QsfpService;

pub mod config;
pub mod lab;
pub mod services;

pub use config::Config;
pub use lab::LabConfig;
pub use services::Service;
pub use services::ServiceControl;
pub use services::SystemdServices;

/// Counter tracking the number of link flaps, switch-wide or, prefixed with
/// a port name, for a single port.
pub const LINK_FLAP_COUNT_KEY: &str = "link_state.flap.sum";

/// Ports skipped when the check expects every port down. The corner ports
/// of the lab topology aren't cabled.
const UNCABLED_PORTS: [&str; 2] = ["eth2/1/1", "eth9/16/1"];

#[derive(Debug, thiserror::Error)]
pub enum LinkTestError {
    #[error(transparent)]
    Rpc(#[from] fboss_client::Error),
    #[error("not all ports are up, ports that are down: {}", .0.join(", "))]
    PortsDown(Vec<String>),
    #[error("not all ports are down, ports that are up: {}", .0.join(", "))]
    PortsUp(Vec<String>),
    #[error("empty port info returned for {0}")]
    EmptyPortInfo(String),
    #[error("empty transceiver info received from qsfp_service")]
    EmptyTransceiverInfo,
    #[error("transceiver absent on {0}")]
    TransceiverAbsent(String),
    #[error("unexpected link flaps: {}", flap_report(.0))]
    UnexpectedFlaps(BTreeMap<String, String>),
    #[error("counter {0} not reported")]
    MissingCounter(String),
    #[error("build info is missing {0}")]
    MissingBuildInfo(String),
    #[error("lab config {path}: {reason}")]
    LabConfig { path: String, reason: String },
    #[error("{command} failed: {reason}")]
    Service { command: String, reason: String },
}

fn flap_report(bad: &BTreeMap<String, String>) -> String {
    bad.iter()
        .map(|(port, why)| format!("{port}: {why}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The agent's port id for an interface, and the first VLAN it belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PortVlan {
    pub port_id: i32,
    pub vlan_id: Option<i32>,
}

/// The interface, and its port id, wired to a transceiver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransceiverPort {
    pub interface_name: String,
    pub port_id: i32,
}

/// Build information exported by a service.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BuildInfo {
    #[serde(rename = "Package Name")]
    pub package_name: String,
    #[serde(rename = "Package Info")]
    pub package_info: String,
    #[serde(rename = "Package Version")]
    pub package_version: String,
    #[serde(rename = "Build details")]
    pub details: BuildDetails,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildDetails {
    pub host: String,
    pub time: String,
    pub user: String,
    pub path: String,
    pub platform: String,
    pub revision: String,
}

impl BuildInfo {
    fn from_exported(
        values: &BTreeMap<String, String>,
    ) -> Result<Self, LinkTestError> {
        let get = |key: &str| {
            values
                .get(key)
                .cloned()
                .ok_or_else(|| LinkTestError::MissingBuildInfo(key.to_string()))
        };
        Ok(BuildInfo {
            package_name: get("build_package_name")?,
            package_info: values
                .get("build_package_info")
                .cloned()
                .unwrap_or_else(|| String::from("-")),
            package_version: get("build_package_version")?,
            details: BuildDetails {
                host: get("build_host")?,
                time: get("build_time")?,
                user: get("build_user")?,
                path: get("build_path")?,
                platform: get("build_platform")?,
                revision: get("build_revision")?,
            },
        })
    }
}

/// Compare flap counters read before and after a test step.
///
/// Every port in `new` must have flapped when `expect_flaps` is set, and
/// must have kept its count otherwise. A port missing from either map
/// counts as zero flaps.
pub fn check_port_flap_counts(
    old: &BTreeMap<String, i64>,
    new: &BTreeMap<String, i64>,
    expect_flaps: bool,
) -> Result<(), LinkTestError> {
    let mut bad = BTreeMap::new();
    for (port, &after) in new {
        let before = old.get(port).copied().unwrap_or(0);
        if expect_flaps && before == after {
            bad.insert(
                port.clone(),
                String::from("port was expected to flap but it didn't"),
            );
        } else if !expect_flaps && before != after {
            bad.insert(
                port.clone(),
                format!(
                    "expected_flap_count = {before}, actual_flap_count = {after}"
                ),
            );
        }
    }
    if bad.is_empty() {
        Ok(())
    } else {
        Err(LinkTestError::UnexpectedFlaps(bad))
    }
}

pub struct LinkTestCase {
    log: Logger,
    config: Config,
    agent: Box<dyn FbossCtrl>,
    qsfp: Box<dyn QsfpService>,
    services: Box<dyn ServiceControl>,
    lab: OnceCell<LabConfig>,
    port_ids: OnceCell<BTreeMap<String, PortVlan>>,
    transceiver_ids: OnceCell<BTreeMap<String, i32>>,
}

impl LinkTestCase {
    pub fn new(
        log: Logger,
        config: Config,
        agent: Box<dyn FbossCtrl>,
        qsfp: Box<dyn QsfpService>,
        services: Box<dyn ServiceControl>,
    ) -> Self {
        LinkTestCase {
            log,
            config,
            agent,
            qsfp,
            services,
            lab: OnceCell::new(),
            port_ids: OnceCell::new(),
            transceiver_ids: OnceCell::new(),
        }
    }

    /// Build a harness talking to the services named in `config`, managed
    /// through systemd.
    pub fn connect(log: Logger, config: Config) -> anyhow::Result<Self> {
        let state = |tag: &str| ClientState {
            tag: tag.to_string(),
            log: log.new(slog::o!("unit" => tag.to_string())),
        };
        let agent = AgentClient::new(
            HttpTransport::new(
                &config.hostname,
                config.agent_port,
                config.timeout(),
            )?,
            state("agent"),
        );
        let qsfp = QsfpClient::new(
            HttpTransport::new(
                &config.hostname,
                config.qsfp_port,
                config.timeout(),
            )?,
            state("qsfp"),
        );
        let services = SystemdServices::new(
            log.new(slog::o!("unit" => "services")),
            config.services.clone(),
        );
        Ok(Self::new(
            log,
            config,
            Box::new(agent),
            Box::new(qsfp),
            Box::new(services),
        ))
    }

    /// Use an already loaded lab topology instead of reading it from
    /// `lab_config_dir`.
    pub fn with_lab_config(mut self, lab: LabConfig) -> Self {
        self.lab = OnceCell::from(lab);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Restart both services with the configured agent config and wait for
    /// the cabled ports to come up.
    pub async fn set_up(&self) -> Result<(), LinkTestError> {
        self.services.stop(Service::Agent).await?;
        self.services.stop(Service::Qsfp).await?;
        self.services
            .use_agent_config(&self.config.agent_config)
            .await?;
        self.services.start(Service::Agent).await?;
        self.services.start(Service::Qsfp).await?;

        info!(self.log, "waiting for services to settle";
            "settle_time" => ?self.config.settle_time());
        tokio::time::sleep(self.config.settle_time()).await;

        self.check_transceiver_presence().await?;
        self.check_port_status(true).await
    }

    pub async fn tear_down(&self) -> Result<(), LinkTestError> {
        self.services.stop(Service::Agent).await?;
        self.services.stop(Service::Qsfp).await?;
        self.services.clear_state().await
    }

    async fn lab_config(&self) -> Result<&LabConfig, LinkTestError> {
        self.lab
            .get_or_try_init(|| async {
                let path = self.config.lab_config_path();
                info!(self.log, "loading lab config"; "path" => %path);
                LabConfig::load(&path).await
            })
            .await
    }

    /// Names of the ports cabled to a neighbor in the lab.
    pub async fn expected_up_ports(
        &self,
    ) -> Result<Vec<String>, LinkTestError> {
        Ok(self.lab_config().await?.expected_up_ports())
    }

    /// Check that the expected-up ports are all up or, when `expect_up` is
    /// false, all down. The uncabled corner ports are left out of the
    /// down check. Retried per the configured check policy.
    pub async fn check_port_status(
        &self,
        expect_up: bool,
    ) -> Result<(), LinkTestError> {
        self.config
            .check_policy()
            .retry(
                &self.log,
                "port status check",
                || self.port_status_once(expect_up),
                retry_check,
            )
            .await
    }

    async fn port_status_once(
        &self,
        expect_up: bool,
    ) -> Result<(), LinkTestError> {
        let port_info = self.agent.get_all_port_info().await?;
        let expected_up = self.expected_up_ports().await?;
        info!(self.log, "checking port status"; "expect_up" => expect_up);
        if expect_up {
            let down = port_info
                .values()
                .filter(|p| {
                    p.oper_state != PortOperState::Up
                        && expected_up.contains(&p.name)
                })
                .map(|p| p.name.clone())
                .collect::<Vec<_>>();
            if !down.is_empty() {
                return Err(LinkTestError::PortsDown(down));
            }
        } else {
            let up = port_info
                .values()
                .filter(|p| {
                    p.oper_state == PortOperState::Up
                        && expected_up.contains(&p.name)
                        && !UNCABLED_PORTS.contains(&p.name.as_str())
                })
                .map(|p| p.name.clone())
                .collect::<Vec<_>>();
            if !up.is_empty() {
                return Err(LinkTestError::PortsUp(up));
            }
        }
        Ok(())
    }

    /// Check that every expected-up port has a transceiver the qsfp_service
    /// reports as present. Retried per the configured check policy.
    pub async fn check_transceiver_presence(
        &self,
    ) -> Result<(), LinkTestError> {
        self.config
            .check_policy()
            .retry(
                &self.log,
                "transceiver presence check",
                || self.transceiver_presence_once(),
                retry_check,
            )
            .await
    }

    async fn transceiver_presence_once(&self) -> Result<(), LinkTestError> {
        info!(self.log, "checking if transceivers are marked present");
        let qsfp_info = self.qsfp.get_transceiver_info(Vec::new()).await?;
        if qsfp_info.is_empty() {
            return Err(LinkTestError::EmptyTransceiverInfo);
        }
        let intf_map = self.interface_to_transceiver_id().await?;
        for port in self.expected_up_ports().await? {
            let present = intf_map
                .get(&port)
                .and_then(|id| qsfp_info.get(id))
                .is_some_and(|info| info.present);
            if !present {
                return Err(LinkTestError::TransceiverAbsent(port));
            }
        }
        Ok(())
    }

    /// Map each interface name to its port id and first VLAN. Fetched once
    /// and cached.
    pub async fn interface_name_to_port_id(
        &self,
    ) -> Result<&BTreeMap<String, PortVlan>, LinkTestError> {
        self.port_ids
            .get_or_try_init(|| async {
                let port_info = self.agent.get_all_port_info().await?;
                if port_info.is_empty() {
                    return Err(LinkTestError::EmptyPortInfo(
                        self.config.hostname.clone(),
                    ));
                }
                Ok(port_info
                    .into_values()
                    .map(|p| {
                        let pv = PortVlan {
                            port_id: p.port_id,
                            vlan_id: p.vlans.first().copied(),
                        };
                        (p.name, pv)
                    })
                    .collect())
            })
            .await
    }

    /// Map each transceiver id to the interface wired to it. Interfaces
    /// without a known transceiver are logged and left out.
    pub async fn transceiver_id_to_interface(
        &self,
    ) -> Result<BTreeMap<i32, TransceiverPort>, LinkTestError> {
        let intf_map = self.interface_name_to_port_id().await?;
        let status = self.agent.get_port_status(Vec::new()).await?;
        let mut map = BTreeMap::new();
        for (name, pv) in intf_map {
            match status
                .get(&pv.port_id)
                .and_then(|s| s.transceiver_idx.as_ref())
            {
                Some(idx) => {
                    map.insert(
                        idx.transceiver_id,
                        TransceiverPort {
                            interface_name: name.clone(),
                            port_id: pv.port_id,
                        },
                    );
                }
                None => warn!(self.log,
                    "transceiver id to interface name mapping failed";
                    "interface" => name),
            }
        }
        Ok(map)
    }

    /// Map each interface name to the transceiver wired to it. Fetched once
    /// and cached.
    pub async fn interface_to_transceiver_id(
        &self,
    ) -> Result<&BTreeMap<String, i32>, LinkTestError> {
        self.transceiver_ids
            .get_or_try_init(|| async {
                let intf_map = self.interface_name_to_port_id().await?;
                let status = self.agent.get_port_status(Vec::new()).await?;
                let mut map = BTreeMap::new();
                for (name, pv) in intf_map {
                    match status
                        .get(&pv.port_id)
                        .and_then(|s| s.transceiver_idx.as_ref())
                    {
                        Some(idx) => {
                            map.insert(name.clone(), idx.transceiver_id);
                        }
                        None => warn!(self.log,
                            "interface name to transceiver id mapping failed";
                            "interface" => name),
                    }
                }
                Ok::<_, LinkTestError>(map)
            })
            .await
    }

    /// Transceiver data for every present optic, keyed by interface name.
    pub async fn all_qsfp_dom_values(
        &self,
    ) -> Result<BTreeMap<String, TransceiverInfo>, LinkTestError> {
        let trans_map = self.transceiver_id_to_interface().await?;
        let qsfp_info = self.qsfp.get_transceiver_info(Vec::new()).await?;
        if qsfp_info.is_empty() {
            warn!(self.log, "empty transceiver info received from qsfp_service");
        }
        let mut values = BTreeMap::new();
        for (id, info) in qsfp_info {
            match trans_map.get(&id) {
                Some(tp) => {
                    values.insert(tp.interface_name.clone(), info);
                }
                None => warn!(self.log, "no interface for transceiver";
                    "transceiver" => id),
            }
        }
        Ok(values)
    }

    /// Build information exported by one of the services, or `None` if it
    /// exported nothing.
    pub async fn formatted_build_info(
        &self,
        service: Service,
    ) -> Result<Option<BuildInfo>, LinkTestError> {
        let regex = String::from("build_.*");
        let values = match service {
            Service::Agent => self.agent.get_regex_exported_values(regex).await?,
            Service::Qsfp => self.qsfp.get_regex_exported_values(regex).await?,
        };
        if values.is_empty() {
            warn!(self.log, "empty build info";
                "host" => &self.config.hostname,
                "service" => ?service);
            return Ok(None);
        }
        BuildInfo::from_exported(&values).map(Some)
    }

    /// The switch-wide link flap count.
    pub async fn overall_link_flap_count(&self) -> Result<i64, LinkTestError> {
        let key = LINK_FLAP_COUNT_KEY.to_string();
        let counters =
            self.agent.get_selected_counters(vec![key.clone()]).await?;
        counters
            .get(&key)
            .copied()
            .ok_or(LinkTestError::MissingCounter(key))
    }

    /// Per-port link flap counters, keyed by counter name.
    pub async fn ports_link_flap_count(
        &self,
        ports: &[String],
    ) -> Result<BTreeMap<String, i64>, LinkTestError> {
        let keys = ports
            .iter()
            .map(|port| format!("{port}.{LINK_FLAP_COUNT_KEY}"))
            .collect();
        Ok(self.agent.get_selected_counters(keys).await?)
    }
}

// Lab config errors are permanent.
fn retry_check(e: &LinkTestError) -> bool {
    !matches!(e, LinkTestError::LabConfig { .. })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fboss_client::types::PortInfoThrift;
    use fboss_client::types::PortStatus;
    use fboss_client::types::TransceiverIdThrift;
    use fboss_client::MockFbossCtrl;
    use fboss_client::MockQsfpService;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    use super::services::MockServiceControl;
    use super::*;

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn config() -> Config {
        Config {
            settle_time_secs: 0,
            check_attempts: 2,
            check_interval_secs: 0,
            ..Default::default()
        }
    }

    fn lab() -> LabConfig {
        LabConfig::parse(
            camino::Utf8Path::new("test"),
            r#"{"pimInfo": [{"interfaces": {
                "eth1/1/1": {"neighbor": "rsw1"},
                "eth1/2/1": {"neighbor": "rsw2"},
                "eth1/3/1": {}
            }}]}"#,
        )
        .unwrap()
    }

    fn port(id: i32, name: &str, up: bool) -> PortInfoThrift {
        PortInfoThrift {
            port_id: id,
            name: name.to_string(),
            vlans: vec![2000 + id],
            oper_state: if up {
                PortOperState::Up
            } else {
                PortOperState::Down
            },
            ..Default::default()
        }
    }

    fn ports(up: [bool; 3]) -> BTreeMap<i32, PortInfoThrift> {
        BTreeMap::from([
            (1, port(1, "eth1/1/1", up[0])),
            (2, port(2, "eth1/2/1", up[1])),
            (3, port(3, "eth1/3/1", up[2])),
        ])
    }

    fn status() -> BTreeMap<i32, PortStatus> {
        let wired = |id| PortStatus {
            transceiver_idx: Some(TransceiverIdThrift {
                transceiver_id: id,
                channels: vec![0],
            }),
            ..Default::default()
        };
        BTreeMap::from([
            (1, wired(10)),
            (2, wired(20)),
            (3, PortStatus::default()),
        ])
    }

    fn transceiver(present: bool) -> TransceiverInfo {
        TransceiverInfo {
            present,
            ..Default::default()
        }
    }

    fn harness(
        agent: MockFbossCtrl,
        qsfp: MockQsfpService,
        services: MockServiceControl,
    ) -> LinkTestCase {
        LinkTestCase::new(
            logger(),
            config(),
            Box::new(agent),
            Box::new(qsfp),
            Box::new(services),
        )
        .with_lab_config(lab())
    }

    fn counts(c: &[(&str, i64)]) -> BTreeMap<String, i64> {
        c.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_flaps_expected() {
        let old = counts(&[("a", 1), ("b", 2)]);
        let new = counts(&[("a", 2), ("b", 2)]);
        assert!(check_port_flap_counts(&old, &old, false).is_ok());
        match check_port_flap_counts(&old, &new, true) {
            Err(LinkTestError::UnexpectedFlaps(bad)) => assert_eq!(
                bad,
                BTreeMap::from([(
                    String::from("b"),
                    String::from("port was expected to flap but it didn't")
                )])
            ),
            other => panic!("expected UnexpectedFlaps, got {other:?}"),
        }
    }

    #[test]
    fn test_flaps_unexpected() {
        let old = counts(&[("a", 1)]);
        let new = counts(&[("a", 1), ("c", 3)]);
        match check_port_flap_counts(&old, &new, false) {
            Err(LinkTestError::UnexpectedFlaps(bad)) => assert_eq!(
                bad,
                BTreeMap::from([(
                    String::from("c"),
                    String::from(
                        "expected_flap_count = 0, actual_flap_count = 3"
                    )
                )])
            ),
            other => panic!("expected UnexpectedFlaps, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_port_status_retries_until_up() {
        let mut agent = MockFbossCtrl::new();
        let mut seq = Sequence::new();
        agent
            .expect_get_all_port_info()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ports([true, false, false])));
        agent
            .expect_get_all_port_info()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ports([true, true, false])));
        let tc =
            harness(agent, MockQsfpService::new(), MockServiceControl::new());
        tc.check_port_status(true).await.unwrap();
    }

    #[tokio::test]
    async fn test_port_status_reports_down_ports() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .times(2)
            .returning(|| Ok(ports([false, true, false])));
        let tc =
            harness(agent, MockQsfpService::new(), MockServiceControl::new());
        match tc.check_port_status(true).await {
            Err(LinkTestError::PortsDown(down)) => {
                assert_eq!(down, vec!["eth1/1/1"])
            }
            other => panic!("expected PortsDown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_port_status_down_expected_reports_up_ports() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .times(2)
            .returning(|| Ok(ports([true, false, true])));
        let tc =
            harness(agent, MockQsfpService::new(), MockServiceControl::new());
        match tc.check_port_status(false).await {
            Err(LinkTestError::PortsUp(up)) => assert_eq!(up, vec!["eth1/1/1"]),
            other => panic!("expected PortsUp, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_port_status_down_expected_all_down() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .times(1)
            .returning(|| Ok(ports([false, false, false])));
        let tc =
            harness(agent, MockQsfpService::new(), MockServiceControl::new());
        tc.check_port_status(false).await.unwrap();
    }

    #[tokio::test]
    async fn test_port_status_down_expected_skips_uncabled() {
        let mut agent = MockFbossCtrl::new();
        agent.expect_get_all_port_info().times(1).returning(|| {
            let mut info = ports([false, false, false]);
            info.insert(4, port(4, "eth2/1/1", true));
            Ok(info)
        });
        let lab = LabConfig::parse(
            camino::Utf8Path::new("test"),
            r#"{"pimInfo": [{"interfaces": {
                "eth1/1/1": {"neighbor": "rsw1"},
                "eth2/1/1": {"neighbor": "rsw2"}
            }}]}"#,
        )
        .unwrap();
        let tc =
            harness(agent, MockQsfpService::new(), MockServiceControl::new())
                .with_lab_config(lab);
        tc.check_port_status(false).await.unwrap();
    }

    #[tokio::test]
    async fn test_transceiver_presence() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .times(1)
            .returning(|| Ok(ports([true, true, true])));
        agent
            .expect_get_port_status()
            .with(eq(Vec::<i32>::new()))
            .times(1)
            .returning(|_| Ok(status()));
        let mut qsfp = MockQsfpService::new();
        qsfp.expect_get_transceiver_info().times(2).returning(|_| {
            Ok(BTreeMap::from([
                (10, transceiver(true)),
                (20, transceiver(false)),
            ]))
        });
        let tc = harness(agent, qsfp, MockServiceControl::new());
        match tc.check_transceiver_presence().await {
            Err(LinkTestError::TransceiverAbsent(port)) => {
                assert_eq!(port, "eth1/2/1")
            }
            other => panic!("expected TransceiverAbsent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_transceiver_info() {
        let mut qsfp = MockQsfpService::new();
        qsfp.expect_get_transceiver_info()
            .times(2)
            .returning(|_| Ok(BTreeMap::new()));
        let tc = harness(MockFbossCtrl::new(), qsfp, MockServiceControl::new());
        assert!(matches!(
            tc.check_transceiver_presence().await,
            Err(LinkTestError::EmptyTransceiverInfo)
        ));
    }

    #[tokio::test]
    async fn test_interface_maps() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .times(1)
            .returning(|| Ok(ports([true, true, true])));
        agent
            .expect_get_port_status()
            .times(2)
            .returning(|_| Ok(status()));
        let mut qsfp = MockQsfpService::new();
        qsfp.expect_get_transceiver_info().times(1).returning(|_| {
            Ok(BTreeMap::from([
                (10, transceiver(true)),
                (30, transceiver(true)),
            ]))
        });
        let tc = harness(agent, qsfp, MockServiceControl::new());

        let ids = tc.interface_name_to_port_id().await.unwrap();
        assert_eq!(
            ids["eth1/2/1"],
            PortVlan {
                port_id: 2,
                vlan_id: Some(2002)
            }
        );
        // Cached: the agent is asked for port info only once.
        assert_eq!(tc.interface_name_to_port_id().await.unwrap().len(), 3);

        let xcvrs = tc.interface_to_transceiver_id().await.unwrap();
        assert_eq!(
            xcvrs,
            &BTreeMap::from([
                (String::from("eth1/1/1"), 10),
                (String::from("eth1/2/1"), 20),
            ])
        );

        let dom = tc.all_qsfp_dom_values().await.unwrap();
        assert_eq!(dom.keys().collect::<Vec<_>>(), vec!["eth1/1/1"]);
    }

    #[tokio::test]
    async fn test_empty_port_info() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .returning(|| Ok(BTreeMap::new()));
        let tc =
            harness(agent, MockQsfpService::new(), MockServiceControl::new());
        assert!(matches!(
            tc.interface_name_to_port_id().await,
            Err(LinkTestError::EmptyPortInfo(host)) if host == "::1"
        ));
    }

    #[tokio::test]
    async fn test_build_info() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_regex_exported_values()
            .with(eq(String::from("build_.*")))
            .returning(|_| {
                Ok([
                    ("build_package_name", "fboss.agent"),
                    ("build_package_version", "42"),
                    ("build_host", "builder"),
                    ("build_time", "Mon Oct 12 2026"),
                    ("build_user", "svc"),
                    ("build_path", "/src"),
                    ("build_platform", "x86_64"),
                    ("build_revision", "abc123"),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect())
            });
        let mut qsfp = MockQsfpService::new();
        qsfp.expect_get_regex_exported_values()
            .returning(|_| Ok(BTreeMap::new()));
        let tc = harness(agent, qsfp, MockServiceControl::new());

        let info = tc.formatted_build_info(Service::Agent).await.unwrap();
        let info = info.unwrap();
        assert_eq!(info.package_name, "fboss.agent");
        assert_eq!(info.package_info, "-");
        assert_eq!(info.details.revision, "abc123");
        assert_eq!(
            serde_json::to_value(&info).unwrap()["Build details"]["Host"],
            "builder"
        );

        assert_eq!(tc.formatted_build_info(Service::Qsfp).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flap_counters() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_selected_counters()
            .with(eq(vec![String::from("link_state.flap.sum")]))
            .returning(|keys| Ok(BTreeMap::from([(keys[0].clone(), 7)])));
        agent
            .expect_get_selected_counters()
            .with(eq(vec![
                String::from("eth1/1/1.link_state.flap.sum"),
                String::from("eth1/2/1.link_state.flap.sum"),
            ]))
            .returning(|keys| {
                Ok(keys.into_iter().map(|k| (k, 1)).collect())
            });
        let tc =
            harness(agent, MockQsfpService::new(), MockServiceControl::new());

        assert_eq!(tc.overall_link_flap_count().await.unwrap(), 7);
        let counts = tc
            .ports_link_flap_count(&[
                String::from("eth1/1/1"),
                String::from("eth1/2/1"),
            ])
            .await
            .unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["eth1/2/1.link_state.flap.sum"], 1);
    }

    #[tokio::test]
    async fn test_set_up_and_tear_down() {
        let mut services = MockServiceControl::new();
        let mut seq = Sequence::new();
        services
            .expect_stop()
            .with(eq(Service::Agent))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        services
            .expect_stop()
            .with(eq(Service::Qsfp))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        services
            .expect_use_agent_config()
            .with(eq("100G"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        services
            .expect_start()
            .with(eq(Service::Agent))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        services
            .expect_start()
            .with(eq(Service::Qsfp))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        services
            .expect_stop()
            .with(eq(Service::Agent))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        services
            .expect_stop()
            .with(eq(Service::Qsfp))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        services
            .expect_clear_state()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .returning(|| Ok(ports([true, true, false])));
        agent.expect_get_port_status().returning(|_| Ok(status()));
        let mut qsfp = MockQsfpService::new();
        qsfp.expect_get_transceiver_info().returning(|_| {
            Ok(BTreeMap::from([
                (10, transceiver(true)),
                (20, transceiver(true)),
            ]))
        });

        let tc = harness(agent, qsfp, services);
        assert_eq!(tc.config().settle_time(), Duration::ZERO);
        tc.set_up().await.unwrap();
        tc.tear_down().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_up_stops_on_service_failure() {
        let mut services = MockServiceControl::new();
        services.expect_stop().times(1).returning(|_| {
            Err(LinkTestError::Service {
                command: String::from("systemctl stop wedge_agent"),
                reason: String::from("unit not loaded"),
            })
        });
        let tc = harness(MockFbossCtrl::new(), MockQsfpService::new(), services);
        let err = tc.set_up().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "systemctl stop wedge_agent failed: unit not loaded"
        );
    }

    #[tokio::test]
    async fn test_lab_config_loaded_from_dir() {
        let dir = std::env::temp_dir()
            .join(format!("link-test-lab-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("wedge100s"),
            r#"{"pimInfo": [{"interfaces": {"ETH3/1/1": {"neighbor": "x"}}}]}"#,
        )
        .unwrap();
        let config = Config {
            platform: String::from("wedge100s"),
            lab_config_dir: camino::Utf8PathBuf::try_from(dir.clone()).unwrap(),
            ..config()
        };
        let tc = LinkTestCase::new(
            logger(),
            config,
            Box::new(MockFbossCtrl::new()),
            Box::new(MockQsfpService::new()),
            Box::new(MockServiceControl::new()),
        );
        assert_eq!(tc.expected_up_ports().await.unwrap(), vec!["eth3/1/1"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
