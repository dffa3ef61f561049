// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Shared formatting and the VLAN/port topology used by several commands.
//!
//! Next-hops returned by the agent name their egress interface as
//! `fboss<vlan>`. To show something an operator can act on, the route
//! commands build a map from each VLAN to the physical ports (or the
//! aggregate port) behind it, and resolve interface names through it.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use anyhow::anyhow;
use anyhow::bail;
use colored::*;
use lazy_static::lazy_static;
use oxnet::IpNet;
use regex::Regex;
use slog::warn;
use slog::Logger;

use common::network::ip_ntop;
use common::network::ip_pton;
use common::network::AddressError;
use fboss_client::types::BinaryAddress;
use fboss_client::types::IpPrefix;
use fboss_client::types::MplsAction;
use fboss_client::types::MplsActionCode;
use fboss_client::types::NextHopThrift;
use fboss_client::types::PortInfoThrift;
use fboss_client::types::PortStatus;
use fboss_client::FbossCtrl;
use fboss_client::QsfpService;
use fboss_client::RetryPolicy;

/// VLAN id, then root port name, then the summaries of that root port's
/// member ports in port-id order.
pub type VlanPortMap = BTreeMap<i32, BTreeMap<String, Vec<PortSummary>>>;

/// VLAN id to the name of the aggregate port carrying it.
pub type VlanAggregatePortMap = BTreeMap<i32, String>;

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("failed to fetch port topology")]
    Rpc(#[from] fboss_client::Error),
    #[error("port {port} is a member of {count} VLANs, expected exactly one")]
    VlanCount { port: String, count: usize },
    #[error("root port for {port} could not be determined")]
    NoRootPort { port: String },
}

impl TopologyError {
    // Only failures talking to the agent are worth another attempt. The
    // others describe the switch's configuration and won't change.
    fn is_transient(&self) -> bool {
        matches!(self, TopologyError::Rpc(_))
    }
}

/// How a port summary is highlighted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkIndicator {
    Up,
    Down,
    Plain,
}

/// A one-word description of a port, for listing alongside routes and
/// interfaces.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PortSummary {
    pub name: String,
    /// Speed annotation, empty unless details were requested.
    pub speed: String,
    pub state: LinkIndicator,
    pub colors: bool,
}

impl fmt::Display for PortSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match (self.colors, self.state) {
            (true, LinkIndicator::Up) => self.name.green().to_string(),
            (true, LinkIndicator::Down) => self.name.red().to_string(),
            _ => self.name.clone(),
        };
        if self.speed.is_empty() {
            write!(f, "{name}")
        } else {
            write!(f, "{name} {}", self.speed)
        }
    }
}

fn port_speed_display(speed_gbps: i32, enabled: bool, up: bool) -> String {
    match (enabled, up) {
        (false, _) => String::new(),
        (true, true) => format!("({speed_gbps}G)"),
        (true, false) => String::from("()"),
    }
}

/// Summarize a port, or return `None` if it isn't worth showing.
///
/// Enabled ports with lanes assigned are shown. They're highlighted by link
/// state when a transceiver is present, or when they are fabric ports,
/// which have no transceiver.
pub fn port_summary(
    name: &str,
    status: &PortStatus,
    transceiver_present: bool,
    colors: bool,
    details: bool,
) -> Option<PortSummary> {
    let has_channels = status
        .transceiver_idx
        .as_ref()
        .is_some_and(|t| !t.channels.is_empty());
    let fabric = name.contains("fab");

    if !has_channels || !status.enabled {
        return None;
    }
    let state = if transceiver_present || fabric {
        if status.up {
            LinkIndicator::Up
        } else {
            LinkIndicator::Down
        }
    } else {
        LinkIndicator::Plain
    };
    let speed = if details {
        port_speed_display(status.speed_mbps / 1000, status.enabled, status.up)
    } else {
        String::new()
    };
    Some(PortSummary {
        name: name.to_string(),
        speed,
        state,
        colors,
    })
}

/// Strip the trailing `/<lane>` from a port name: `eth1/2/1` is a member
/// of root port `eth1/2`.
pub fn root_port(name: &str) -> Result<&str, TopologyError> {
    match name.rsplit_once('/') {
        Some((root, lane))
            if !lane.is_empty() && lane.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Ok(root)
        }
        _ => Err(TopologyError::NoRootPort {
            port: name.to_string(),
        }),
    }
}

fn single_vlan(port: &PortInfoThrift) -> Result<Option<i32>, TopologyError> {
    match port.vlans.as_slice() {
        [] => Ok(None),
        [vlan] => Ok(Some(*vlan)),
        vlans => Err(TopologyError::VlanCount {
            port: port.name.clone(),
            count: vlans.len(),
        }),
    }
}

async fn fetch_vlan_port_map(
    log: &Logger,
    agent: &dyn FbossCtrl,
    qsfp: Option<&dyn QsfpService>,
    colors: bool,
    details: bool,
) -> Result<VlanPortMap, TopologyError> {
    let ports = agent.get_all_port_info().await?;
    let statuses = agent.get_port_status(Vec::new()).await?;

    let transceivers = match qsfp {
        None => BTreeMap::new(),
        Some(qsfp) => match qsfp.get_transceiver_info(Vec::new()).await {
            Ok(t) => t,
            Err(e) => {
                warn!(log, "failed to fetch transceiver info"; "error" => %e);
                eprintln!(
                    "{}",
                    format!("Could not get qsfp info; continue anyway\n{e}")
                        .red()
                );
                BTreeMap::new()
            }
        },
    };

    let mut map = VlanPortMap::new();
    for port in ports.values() {
        // Unconfigured ports aren't part of any VLAN.
        let Some(vlan) = single_vlan(port)? else {
            continue;
        };
        let root = root_port(&port.name)?;
        let Some(status) = statuses.get(&port.port_id) else {
            slog::debug!(log, "no status for port"; "port" => &port.name);
            continue;
        };
        let present = status
            .transceiver_idx
            .as_ref()
            .and_then(|idx| transceivers.get(&idx.transceiver_id))
            .is_some_and(|t| t.present);

        if let Some(summary) =
            port_summary(&port.name, status, present, colors, details)
        {
            map.entry(vlan)
                .or_default()
                .entry(root.to_string())
                .or_default()
                .push(summary);
        }
    }
    Ok(map)
}

/// Group the switch's ports by VLAN and root port.
///
/// Failures to reach the qsfp_service are reported and otherwise ignored:
/// every port is then treated as having no transceiver.
pub async fn build_vlan_port_map(
    log: &Logger,
    agent: &dyn FbossCtrl,
    qsfp: Option<&dyn QsfpService>,
    colors: bool,
    details: bool,
) -> Result<VlanPortMap, TopologyError> {
    RetryPolicy::topology()
        .retry(
            log,
            "fetch VLAN port map",
            move || fetch_vlan_port_map(log, agent, qsfp, colors, details),
            TopologyError::is_transient,
        )
        .await
}

async fn fetch_vlan_aggregate_port_map(
    agent: &dyn FbossCtrl,
) -> Result<VlanAggregatePortMap, TopologyError> {
    let mut map = VlanAggregatePortMap::new();
    for aggregate in agent.get_aggregate_port_table().await? {
        for member in &aggregate.member_ports {
            let port = agent.get_port_info(member.member_port_id).await?;
            match single_vlan(&port)? {
                // When two aggregates claim the same VLAN, the last one
                // listed wins.
                Some(vlan) => {
                    map.insert(vlan, aggregate.name.clone());
                }
                None => {
                    return Err(TopologyError::VlanCount {
                        port: port.name,
                        count: 0,
                    })
                }
            }
        }
    }
    Ok(map)
}

/// Map each VLAN carried by an aggregate port's members to that aggregate.
pub async fn build_vlan_aggregate_port_map(
    log: &Logger,
    agent: &dyn FbossCtrl,
) -> Result<VlanAggregatePortMap, TopologyError> {
    RetryPolicy::topology()
        .retry(
            log,
            "fetch VLAN aggregate port map",
            move || fetch_vlan_aggregate_port_map(agent),
            TopologyError::is_transient,
        )
        .await
}

/// The VLAN behind an agent interface name like `fboss2000`.
pub fn interface_vlan(if_name: &str) -> Option<i32> {
    if_name.strip_prefix("fboss")?.parse().ok()
}

fn mpls_action_to_str(action: &MplsAction) -> String {
    let labels = match action.action {
        MplsActionCode::Swap => {
            action.swap_label.map(|label| format!(" : {label}"))
        }
        MplsActionCode::Push => {
            let stack = action
                .push_labels
                .iter()
                .flatten()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(",");
            Some(format!(" : {{{stack}}}"))
        }
        _ => None,
    };
    format!(" MPLS -> {}{}", action.action, labels.unwrap_or_default())
}

/// Render a next-hop as `<ip>[ dev <via>][ weight <w>][ MPLS -> ...]`.
///
/// When the VLAN maps are supplied, an `fboss<vlan>` interface is shown as
/// the aggregate port or the physical ports behind it.
pub fn nexthop_to_str(
    nexthop: &NextHopThrift,
    aggregates: Option<&VlanAggregatePortMap>,
    ports: Option<&VlanPortMap>,
) -> Result<String, AddressError> {
    let ip = nexthop.address.to_ip()?;

    let via = match (nexthop.address.if_name.as_deref(), ports) {
        (None, _) => String::new(),
        (Some(if_name), None) => if_name.to_string(),
        (Some(if_name), Some(ports)) => match interface_vlan(if_name) {
            None => if_name.to_string(),
            Some(vlan) => match aggregates.and_then(|a| a.get(&vlan)) {
                Some(aggregate) => aggregate.clone(),
                None => ports
                    .get(&vlan)
                    .map(|roots| {
                        roots
                            .values()
                            .flatten()
                            .map(|p| p.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default(),
            },
        },
    };

    let mut out = ip.to_string();
    let via = via.trim();
    if !via.is_empty() {
        out.push_str(&format!(" dev {via}"));
    }
    if nexthop.weight != 0 {
        out.push_str(&format!(" weight {}", nexthop.weight));
    }
    if let Some(action) = &nexthop.mpls_action {
        out.push_str(&mpls_action_to_str(action));
    }
    Ok(out)
}

/// UCMP is active when a route's next-hops don't all carry the same
/// weight.
pub fn is_ucmp_active(nexthops: &[NextHopThrift]) -> bool {
    match nexthops.split_first() {
        None => false,
        Some((first, rest)) => rest.iter().any(|nh| nh.weight != first.weight),
    }
}

pub fn ip_to_binary(ip: &str) -> Result<BinaryAddress, AddressError> {
    Ok(BinaryAddress {
        addr: ip_pton(ip)?,
        if_name: None,
    })
}

/// Render a prefix as `<ip>/<len>`.
pub fn prefix_to_str(prefix: &IpPrefix) -> Result<String, AddressError> {
    Ok(format!("{}/{}", ip_ntop(&prefix.ip.addr)?, prefix.prefix_length))
}

lazy_static! {
    static ref PORT_NAME_RE: Regex =
        Regex::new(r"^([a-z][a-z][a-z])(\d+)/(\d+)/(\d)").unwrap();
}

/// Sort key for names like `eth1/2/3`. Names that don't look like that
/// sort before all others.
pub fn port_name_sort_key(name: &str) -> (String, u32, u32, u32) {
    let key = || {
        let caps = PORT_NAME_RE.captures(name)?;
        Some((
            caps[1].to_string(),
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
            caps[4].parse().ok()?,
        ))
    };
    key().unwrap_or_else(|| (String::new(), 0, 0, 0))
}

pub fn port_sort_key(port: &PortInfoThrift) -> (String, u32, u32, u32) {
    if port.name.is_empty() {
        (String::new(), u32::try_from(port.port_id).unwrap_or(0), 0, 0)
    } else {
        port_name_sort_key(&port.name)
    }
}

/// Column values for one row of `port state show`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusStrs {
    pub admin: &'static str,
    pub link: &'static str,
    pub link_state: LinkIndicator,
    pub present: &'static str,
    pub speed: String,
    pub profile: String,
}

impl StatusStrs {
    pub fn link_colored(&self) -> ColoredString {
        match self.link_state {
            LinkIndicator::Up => self.link.green(),
            LinkIndicator::Down => self.link.red(),
            LinkIndicator::Plain => self.link.normal(),
        }
    }
}

/// `present` is `None` when the transceiver's state couldn't be learned.
pub fn status_strs(status: &PortStatus, present: Option<bool>) -> StatusStrs {
    let speed = if status.enabled && status.speed_mbps != 0 {
        format!("{}G", status.speed_mbps / 1000)
    } else {
        String::new()
    };
    let (link, link_state) = match (status.up, status.enabled, present) {
        (true, _, _) => ("Up", LinkIndicator::Up),
        (false, true, Some(true)) => ("Down", LinkIndicator::Down),
        (false, _, _) => ("Down", LinkIndicator::Plain),
    };
    StatusStrs {
        admin: if status.enabled { "Enabled" } else { "Disabled" },
        link,
        link_state,
        present: match present {
            None => "Unknown",
            Some(true) => "Present",
            Some(false) => "",
        },
        speed,
        profile: if status.profile_id.is_empty() {
            String::from("-")
        } else {
            status.profile_id.clone()
        },
    }
}

/// Resolve port ids or names given on the command line. An empty list
/// selects every port.
pub async fn resolve_ports(
    agent: &dyn FbossCtrl,
    ports: &[String],
) -> anyhow::Result<Vec<i32>> {
    let all = agent.get_all_port_info().await?;
    if ports.is_empty() {
        return Ok(all.keys().copied().collect());
    }
    ports
        .iter()
        .map(|p| match p.parse::<i32>() {
            Ok(id) if all.contains_key(&id) => Ok(id),
            Ok(_) => Err(anyhow!("{p} is not a valid Port")),
            Err(_) => all
                .values()
                .find(|info| info.name == *p)
                .map(|info| info.port_id)
                .ok_or_else(|| anyhow!("{p} is not a valid Port")),
        })
        .collect()
}

fn host_bits(net: &IpNet) -> u128 {
    match net {
        IpNet::V4(n) => {
            let addr = u32::from(n.addr());
            let mask = u32::MAX.checked_shl(32 - u32::from(n.width())).unwrap_or(0);
            u128::from(addr & !mask)
        }
        IpNet::V6(n) => {
            let addr = u128::from(n.addr());
            let mask =
                u128::MAX.checked_shl(128 - u32::from(n.width())).unwrap_or(0);
            addr & !mask
        }
    }
}

/// Parse `a.b.c.d/len` or `x::/len` into a prefix. Host bits must be zero.
pub fn parse_prefix(s: &str) -> anyhow::Result<IpPrefix> {
    let net: IpNet = s
        .parse()
        .map_err(|e| anyhow!("invalid prefix {s}: {e}"))?;
    if host_bits(&net) != 0 {
        bail!("{s} has host bits set");
    }
    let (addr, width) = match net {
        IpNet::V4(n) => (IpAddr::V4(n.addr()), n.width()),
        IpNet::V6(n) => (IpAddr::V6(n.addr()), n.width()),
    };
    Ok(IpPrefix {
        ip: BinaryAddress::from(addr),
        prefix_length: i16::from(width),
    })
}

/// Returns `true` if `ip` falls within `net`.
pub fn subnet_contains(net: &IpNet, ip: IpAddr) -> bool {
    match (net, ip) {
        (IpNet::V4(n), IpAddr::V4(ip)) => {
            let mask = u32::MAX.checked_shl(32 - u32::from(n.width())).unwrap_or(0);
            u32::from(n.addr()) & mask == u32::from(ip) & mask
        }
        (IpNet::V6(n), IpAddr::V6(ip)) => {
            let mask =
                u128::MAX.checked_shl(128 - u32::from(n.width())).unwrap_or(0);
            u128::from(n.addr()) & mask == u128::from(ip) & mask
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::net::IpAddr;

    use fboss_client::types::*;
    use fboss_client::Error;
    use fboss_client::MockFbossCtrl;
    use fboss_client::MockQsfpService;
    use pretty_assertions::assert_eq;

    use super::*;

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn nexthop(ip: &str) -> NextHopThrift {
        NextHopThrift::from(BinaryAddress::from(ip.parse::<IpAddr>().unwrap()))
    }

    fn weighted(ip: &str, weight: i32) -> NextHopThrift {
        NextHopThrift {
            weight,
            ..nexthop(ip)
        }
    }

    fn port(id: i32, name: &str, vlans: &[i32]) -> PortInfoThrift {
        PortInfoThrift {
            port_id: id,
            name: name.to_string(),
            vlans: vlans.to_vec(),
            ..Default::default()
        }
    }

    fn status(enabled: bool, up: bool, transceiver: i32) -> PortStatus {
        PortStatus {
            enabled,
            up,
            speed_mbps: 100_000,
            transceiver_idx: Some(TransceiverIdThrift {
                transceiver_id: transceiver,
                channels: vec![0, 1, 2, 3],
            }),
            ..Default::default()
        }
    }

    fn summary(name: &str, state: LinkIndicator) -> PortSummary {
        PortSummary {
            name: name.to_string(),
            speed: String::new(),
            state,
            colors: false,
        }
    }

    #[test]
    fn test_bare_nexthop() {
        for ip in ["10.0.0.1", "2401:db00::1"] {
            assert_eq!(nexthop_to_str(&nexthop(ip), None, None).unwrap(), ip);
        }
    }

    #[test]
    fn test_nexthop_without_context_prints_interface() {
        let mut nh = weighted("10.0.0.1", 3);
        nh.address.if_name = Some(String::from("fboss10"));
        assert_eq!(
            nexthop_to_str(&nh, None, None).unwrap(),
            "10.0.0.1 dev fboss10 weight 3"
        );
    }

    #[test]
    fn test_nexthop_resolves_vlan_ports() {
        let mut ports = VlanPortMap::new();
        let roots = ports.entry(10).or_default();
        roots.insert(
            String::from("eth1/1"),
            vec![
                summary("eth1/1/1", LinkIndicator::Up),
                summary("eth1/1/2", LinkIndicator::Down),
            ],
        );
        roots.insert(
            String::from("eth1/2"),
            vec![summary("eth1/2/1", LinkIndicator::Plain)],
        );
        let aggregates = VlanAggregatePortMap::new();

        let mut nh = nexthop("fe80::1");
        nh.address.if_name = Some(String::from("fboss10"));
        assert_eq!(
            nexthop_to_str(&nh, Some(&aggregates), Some(&ports)).unwrap(),
            "fe80::1 dev eth1/1/1, eth1/1/2, eth1/2/1"
        );

        // A VLAN with no visible ports has nothing to show.
        nh.address.if_name = Some(String::from("fboss11"));
        assert_eq!(
            nexthop_to_str(&nh, Some(&aggregates), Some(&ports)).unwrap(),
            "fe80::1"
        );

        // Names that don't encode a VLAN are shown as they are.
        nh.address.if_name = Some(String::from("lo"));
        assert_eq!(
            nexthop_to_str(&nh, Some(&aggregates), Some(&ports)).unwrap(),
            "fe80::1 dev lo"
        );
    }

    #[test]
    fn test_nexthop_prefers_aggregate() {
        let mut ports = VlanPortMap::new();
        ports.entry(10).or_default().insert(
            String::from("eth1/1"),
            vec![summary("eth1/1/1", LinkIndicator::Up)],
        );
        let aggregates = VlanAggregatePortMap::from([(10, String::from("po1"))]);
        let mut nh = nexthop("10.0.0.1");
        nh.address.if_name = Some(String::from("fboss10"));
        assert_eq!(
            nexthop_to_str(&nh, Some(&aggregates), Some(&ports)).unwrap(),
            "10.0.0.1 dev po1"
        );
    }

    #[test]
    fn test_nexthop_empty_port_map_is_context() {
        let mut nh = nexthop("10.0.0.1");
        nh.address.if_name = Some(String::from("fboss10"));
        let ports = VlanPortMap::new();
        assert_eq!(
            nexthop_to_str(&nh, None, Some(&ports)).unwrap(),
            "10.0.0.1"
        );

        let aggregates = VlanAggregatePortMap::from([(10, String::from("po1"))]);
        assert_eq!(
            nexthop_to_str(&nh, Some(&aggregates), Some(&ports)).unwrap(),
            "10.0.0.1 dev po1"
        );
        assert_eq!(
            nexthop_to_str(&nh, Some(&aggregates), None).unwrap(),
            "10.0.0.1 dev fboss10"
        );
    }

    #[test]
    fn test_nexthop_mpls() {
        let mut nh = nexthop("10.0.0.1");
        nh.mpls_action = Some(MplsAction {
            action: MplsActionCode::Push,
            swap_label: None,
            push_labels: Some(vec![100, 200]),
        });
        assert_eq!(
            nexthop_to_str(&nh, None, None).unwrap(),
            "10.0.0.1 MPLS -> PUSH : {100,200}"
        );

        nh.mpls_action = Some(MplsAction {
            action: MplsActionCode::Swap,
            swap_label: Some(300),
            push_labels: None,
        });
        assert_eq!(
            nexthop_to_str(&nh, None, None).unwrap(),
            "10.0.0.1 MPLS -> SWAP : 300"
        );

        nh.mpls_action = Some(MplsAction {
            action: MplsActionCode::PopAndLookup,
            ..Default::default()
        });
        assert_eq!(
            nexthop_to_str(&nh, None, None).unwrap(),
            "10.0.0.1 MPLS -> POP_AND_LOOKUP"
        );
    }

    #[test]
    fn test_nexthop_bad_address() {
        let nh = NextHopThrift::from(BinaryAddress {
            addr: vec![1, 2, 3],
            if_name: None,
        });
        assert!(nexthop_to_str(&nh, None, None).is_err());
    }

    #[test]
    fn test_is_ucmp_active() {
        assert!(!is_ucmp_active(&[]));
        assert!(!is_ucmp_active(&[weighted("10.0.0.1", 5)]));
        assert!(!is_ucmp_active(&[
            weighted("10.0.0.1", 1),
            weighted("10.0.0.2", 1)
        ]));
        assert!(is_ucmp_active(&[
            weighted("10.0.0.1", 1),
            weighted("10.0.0.2", 1),
            weighted("10.0.0.3", 2)
        ]));
    }

    #[test]
    fn test_ip_to_binary() {
        assert_eq!(ip_to_binary("10.1.1.1").unwrap().addr, vec![10, 1, 1, 1]);
        assert!(ip_to_binary("2001::1").unwrap().is_v6());
        assert!(ip_to_binary("not-an-ip").is_err());
    }

    #[test]
    fn test_port_name_sort_key() {
        assert_eq!(
            port_name_sort_key("eth1/2/3"),
            (String::from("eth"), 1, 2, 3)
        );
        assert_eq!(port_name_sort_key("po1"), (String::new(), 0, 0, 0));

        let mut names = vec!["eth10/1/1", "eth2/1/1", "fab1/1/1", "cpu"];
        names.sort_by_key(|n| port_name_sort_key(n));
        assert_eq!(names, vec!["cpu", "eth2/1/1", "eth10/1/1", "fab1/1/1"]);
    }

    #[test]
    fn test_port_sort_key_unnamed() {
        assert_eq!(port_sort_key(&port(7, "", &[])), (String::new(), 7, 0, 0));
        assert_eq!(
            port_sort_key(&port(7, "eth3/4/1", &[])),
            (String::from("eth"), 3, 4, 1)
        );
    }

    #[test]
    fn test_port_summary_states() {
        let up = port_summary("eth1/1/1", &status(true, true, 1), true, true, false)
            .unwrap();
        assert_eq!(up.state, LinkIndicator::Up);

        let down =
            port_summary("eth1/1/1", &status(true, false, 1), true, true, false)
                .unwrap();
        assert_eq!(down.state, LinkIndicator::Down);

        assert_eq!(
            port_summary("eth1/1/1", &status(false, true, 1), true, true, false),
            None
        );
    }

    #[test]
    fn test_port_summary_without_transceiver() {
        let plain =
            port_summary("eth1/1/1", &status(true, true, 1), false, true, false)
                .unwrap();
        assert_eq!(plain.state, LinkIndicator::Plain);
        assert_eq!(plain.to_string(), "eth1/1/1");

        // Fabric ports have no transceiver but still report link state.
        let fab =
            port_summary("fab1/1/1", &status(true, false, 1), false, true, false)
                .unwrap();
        assert_eq!(fab.state, LinkIndicator::Down);

        // No lanes, nothing to show.
        let mut no_lanes = status(true, true, 1);
        no_lanes.transceiver_idx = None;
        assert_eq!(
            port_summary("eth1/1/1", &no_lanes, true, true, false),
            None
        );
    }

    #[test]
    fn test_port_summary_speed() {
        let up = port_summary("eth1/1/1", &status(true, true, 1), true, false, true)
            .unwrap();
        assert_eq!(up.to_string(), "eth1/1/1 (100G)");
        let down =
            port_summary("eth1/1/1", &status(true, false, 1), true, false, true)
                .unwrap();
        assert_eq!(down.to_string(), "eth1/1/1 ()");
    }

    #[test]
    fn test_root_port() {
        assert_eq!(root_port("eth1/2/1").unwrap(), "eth1/2");
        assert!(matches!(
            root_port("po1"),
            Err(TopologyError::NoRootPort { port }) if port == "po1"
        ));
        assert!(root_port("eth1/2/x").is_err());
    }

    #[test]
    fn test_status_strs() {
        let s = status_strs(&status(true, false, 1), Some(true));
        assert_eq!(s.admin, "Enabled");
        assert_eq!(s.link, "Down");
        assert_eq!(s.link_state, LinkIndicator::Down);
        assert_eq!(s.present, "Present");
        assert_eq!(s.speed, "100G");
        assert_eq!(s.profile, "-");

        let s = status_strs(&status(false, false, 1), None);
        assert_eq!(s.admin, "Disabled");
        assert_eq!(s.link_state, LinkIndicator::Plain);
        assert_eq!(s.present, "Unknown");
        assert_eq!(s.speed, "");
    }

    #[test]
    fn test_parse_prefix() {
        let p = parse_prefix("10.1.0.0/16").unwrap();
        assert_eq!(p.ip.addr, vec![10, 1, 0, 0]);
        assert_eq!(p.prefix_length, 16);
        assert_eq!(parse_prefix("2001:db8::/32").unwrap().prefix_length, 32);
        assert!(parse_prefix("10.1.0.1/16").is_err());
        assert!(parse_prefix("10.1.0.0/33").is_err());
    }

    #[test]
    fn test_subnet_contains() {
        let net: IpNet = "10.1.0.0/16".parse().unwrap();
        assert!(subnet_contains(&net, "10.1.200.3".parse().unwrap()));
        assert!(!subnet_contains(&net, "10.2.0.1".parse().unwrap()));
        assert!(!subnet_contains(&net, "::1".parse().unwrap()));
        let all: IpNet = "::/0".parse().unwrap();
        assert!(subnet_contains(&all, "2001:db8::9".parse().unwrap()));
    }

    fn topology_agent() -> MockFbossCtrl {
        let mut agent = MockFbossCtrl::new();
        agent.expect_get_all_port_info().returning(|| {
            Ok(BTreeMap::from([
                (1, port(1, "eth1/1/1", &[10])),
                (2, port(2, "eth1/1/2", &[10])),
                (3, port(3, "eth1/2/1", &[20])),
                (4, port(4, "eth1/3/1", &[])),
            ]))
        });
        agent.expect_get_port_status().returning(|_| {
            Ok(BTreeMap::from([
                (1, status(true, true, 0)),
                (2, status(true, false, 0)),
                (3, status(false, false, 1)),
                (4, status(true, true, 2)),
            ]))
        });
        agent
    }

    #[tokio::test]
    async fn test_build_vlan_port_map() {
        let agent = topology_agent();
        let mut qsfp = MockQsfpService::new();
        qsfp.expect_get_transceiver_info().returning(|_| {
            Ok(BTreeMap::from([(
                0,
                TransceiverInfo {
                    present: true,
                    ..Default::default()
                },
            )]))
        });

        let map =
            build_vlan_port_map(&logger(), &agent, Some(&qsfp), false, false)
                .await
                .unwrap();
        assert_eq!(map.len(), 1, "disabled and unconfigured ports are omitted");
        let members = &map[&10]["eth1/1"];
        assert_eq!(
            members,
            &vec![
                summary("eth1/1/1", LinkIndicator::Up),
                summary("eth1/1/2", LinkIndicator::Down)
            ]
        );
    }

    #[tokio::test]
    async fn test_build_vlan_port_map_without_qsfp() {
        let agent = topology_agent();
        let mut qsfp = MockQsfpService::new();
        qsfp.expect_get_transceiver_info()
            .once()
            .returning(|_| Err(Error::Transport(String::from("refused"))));

        let map =
            build_vlan_port_map(&logger(), &agent, Some(&qsfp), false, false)
                .await
                .unwrap();
        let members = &map[&10]["eth1/1"];
        assert!(members.iter().all(|p| p.state == LinkIndicator::Plain));
    }

    #[tokio::test]
    async fn test_build_vlan_port_map_rejects_multiple_vlans() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .once()
            .returning(|| Ok(BTreeMap::from([(1, port(1, "eth1/1/1", &[10, 20]))])));
        agent
            .expect_get_port_status()
            .once()
            .returning(|_| Ok(BTreeMap::new()));

        let err = build_vlan_port_map(&logger(), &agent, None, false, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopologyError::VlanCount { ref port, count: 2 } if port == "eth1/1/1"
        ));
    }

    #[tokio::test]
    async fn test_build_vlan_port_map_retries_rpc_failures() {
        let mut sequence = mockall::Sequence::new();
        let mut agent = MockFbossCtrl::new();
        for _ in 0..2 {
            agent
                .expect_get_all_port_info()
                .once()
                .returning(|| Err(Error::Transport(String::from("reset"))))
                .in_sequence(&mut sequence);
        }
        agent
            .expect_get_all_port_info()
            .once()
            .returning(|| Ok(BTreeMap::from([(1, port(1, "eth1/1/1", &[10]))])))
            .in_sequence(&mut sequence);
        agent
            .expect_get_port_status()
            .once()
            .returning(|_| Ok(BTreeMap::from([(1, status(true, true, 0))])));

        let map = build_vlan_port_map(&logger(), &agent, None, false, false)
            .await
            .unwrap();
        assert_eq!(map[&10]["eth1/1"][0].name, "eth1/1/1");
    }

    #[tokio::test]
    async fn test_build_vlan_port_map_gives_up() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_all_port_info()
            .times(3)
            .returning(|| Err(Error::Transport(String::from("reset"))));

        let err = build_vlan_port_map(&logger(), &agent, None, false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, TopologyError::Rpc(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_build_vlan_aggregate_port_map() {
        let mut agent = MockFbossCtrl::new();
        agent.expect_get_aggregate_port_table().once().returning(|| {
            Ok(vec![AggregatePortThrift {
                key: 1,
                name: String::from("po1"),
                member_ports: vec![AggregatePortMemberThrift {
                    member_port_id: 5,
                    ..Default::default()
                }],
                ..Default::default()
            }])
        });
        agent
            .expect_get_port_info()
            .withf(|id| *id == 5)
            .once()
            .returning(|_| Ok(port(5, "eth2/1/1", &[10])));

        let aggregates = build_vlan_aggregate_port_map(&logger(), &agent)
            .await
            .unwrap();
        assert_eq!(aggregates, BTreeMap::from([(10, String::from("po1"))]));

        let mut nh = nexthop("10.0.0.1");
        nh.address.if_name = Some(String::from("fboss10"));
        assert_eq!(
            nexthop_to_str(&nh, Some(&aggregates), Some(&VlanPortMap::new()))
                .unwrap(),
            "10.0.0.1 dev po1"
        );
    }

    fn po1() -> Vec<AggregatePortThrift> {
        vec![AggregatePortThrift {
            key: 1,
            name: String::from("po1"),
            member_ports: vec![AggregatePortMemberThrift {
                member_port_id: 5,
                ..Default::default()
            }],
            ..Default::default()
        }]
    }

    #[tokio::test]
    async fn test_build_vlan_aggregate_port_map_retries_rpc_failures() {
        let mut sequence = mockall::Sequence::new();
        let mut agent = MockFbossCtrl::new();
        for _ in 0..2 {
            agent
                .expect_get_aggregate_port_table()
                .once()
                .returning(|| Err(Error::Transport(String::from("reset"))))
                .in_sequence(&mut sequence);
        }
        agent
            .expect_get_aggregate_port_table()
            .once()
            .returning(|| Ok(po1()))
            .in_sequence(&mut sequence);
        agent
            .expect_get_port_info()
            .once()
            .returning(|_| Ok(port(5, "eth2/1/1", &[30])));

        let aggregates = build_vlan_aggregate_port_map(&logger(), &agent)
            .await
            .unwrap();
        assert_eq!(aggregates, BTreeMap::from([(30, String::from("po1"))]));
    }

    #[tokio::test]
    async fn test_build_vlan_aggregate_port_map_gives_up() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_aggregate_port_table()
            .times(3)
            .returning(|| Err(Error::Transport(String::from("reset"))));

        let err = build_vlan_aggregate_port_map(&logger(), &agent)
            .await
            .unwrap_err();
        assert!(matches!(err, TopologyError::Rpc(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_build_vlan_aggregate_port_map_member_without_vlan() {
        let mut agent = MockFbossCtrl::new();
        agent
            .expect_get_aggregate_port_table()
            .once()
            .returning(|| Ok(po1()));
        agent
            .expect_get_port_info()
            .once()
            .returning(|_| Ok(port(5, "eth2/1/1", &[])));

        let err = build_vlan_aggregate_port_map(&logger(), &agent)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopologyError::VlanCount { ref port, count: 0 } if port == "eth2/1/1"
        ));
    }

    #[tokio::test]
    async fn test_resolve_ports() {
        let agent = topology_agent();
        let ids = resolve_ports(
            &agent,
            &[String::from("3"), String::from("eth1/1/2")],
        )
        .await
        .unwrap();
        assert_eq!(ids, vec![3, 2]);

        assert_eq!(resolve_ports(&agent, &[]).await.unwrap(), vec![1, 2, 3, 4]);
        assert!(resolve_ports(&agent, &[String::from("99")]).await.is_err());
        assert!(resolve_ports(&agent, &[String::from("eth9/9/9")])
            .await
            .is_err());
    }
}
