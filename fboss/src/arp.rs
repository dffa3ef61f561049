// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::collections::BTreeMap;
use std::io::{stdout, Write};
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;

use anyhow::bail;
use anyhow::Context;
use colored::*;
use oxnet::IpNet;
use oxnet::Ipv4Net;
use oxnet::Ipv6Net;
use structopt::*;
use tabwriter::TabWriter;

use fboss_client::types::NeighborEntryThrift;
use fboss_client::types::PortInfoThrift;
use fboss_client::FbossCtrl;

use crate::utils::subnet_contains;
use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "show or flush the ARP table")]
pub enum Arp {
    #[structopt(about = "show the ARP table")]
    Table,
    #[structopt(about = "flush ARP entries by IP, subnet, or \"all\"")]
    Flush(FlushArgs),
}

#[derive(Debug, StructOpt)]
#[structopt(about = "show or flush the NDP table")]
pub enum Ndp {
    #[structopt(about = "show the NDP table")]
    Table,
    #[structopt(about = "flush NDP entries by IP, subnet, or \"all\"")]
    Flush(FlushArgs),
}

#[derive(Debug, StructOpt)]
pub struct FlushArgs {
    #[structopt(help = "host IP, subnet, or \"all\"")]
    target: String,
    #[structopt(
        short = "V",
        long,
        default_value = "0",
        help = "only flush entries in this VLAN"
    )]
    vlan: i32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Family {
    V4,
    V6,
}

/// Parse the target of a flush: one address, a subnet, or "all" of the
/// table's family.
fn parse_flush_target(target: &str, family: Family) -> anyhow::Result<IpNet> {
    let net = if target == "all" {
        match family {
            Family::V4 => {
                IpNet::V4(Ipv4Net::new_unchecked(Ipv4Addr::UNSPECIFIED, 0))
            }
            Family::V6 => {
                IpNet::V6(Ipv6Net::new_unchecked(Ipv6Addr::UNSPECIFIED, 0))
            }
        }
    } else if let Ok(ip) = target.parse::<IpAddr>() {
        match ip {
            IpAddr::V4(ip) => IpNet::V4(Ipv4Net::new_unchecked(ip, 32)),
            IpAddr::V6(ip) => IpNet::V6(Ipv6Net::new_unchecked(ip, 128)),
        }
    } else {
        target
            .parse::<IpNet>()
            .map_err(|e| anyhow::anyhow!("invalid flush target {target}: {e}"))?
    };

    match (family, &net) {
        (Family::V4, IpNet::V4(_)) | (Family::V6, IpNet::V6(_)) => Ok(net),
        (Family::V4, _) => bail!("{target} is not an IPv4 address or subnet"),
        (Family::V6, _) => bail!("{target} is not an IPv6 address or subnet"),
    }
}

/// Entries to flush from `table`, as (address, VLAN) pairs. A VLAN of 0
/// matches every VLAN.
fn flush_candidates(
    table: &[NeighborEntryThrift],
    net: &IpNet,
    vlan: i32,
) -> Vec<(IpAddr, i32)> {
    table
        .iter()
        .filter(|e| vlan == 0 || e.vlan_id == vlan)
        .filter_map(|e| e.ip.to_ip().ok().map(|ip| (ip, e.vlan_id)))
        .filter(|(ip, _)| subnet_contains(net, *ip))
        .collect()
}

async fn neighbor_flush(
    opts: &CliOptions,
    family: Family,
    args: FlushArgs,
) -> anyhow::Result<()> {
    let net = parse_flush_target(&args.target, family)?;
    let client = opts.agent_client()?;
    let table = match family {
        Family::V4 => client.get_arp_table().await,
        Family::V6 => client.get_ndp_table().await,
    }
    .context("failed to fetch neighbor table")?;

    let mut flushed = 0;
    for (ip, vlan) in flush_candidates(&table, &net, args.vlan) {
        flushed += client
            .flush_neighbor_entry(ip.into(), vlan)
            .await
            .with_context(|| format!("failed to flush {ip}"))?;
    }
    println!("Flushed {flushed} entries");
    Ok(())
}

fn port_name(ports: &BTreeMap<i32, PortInfoThrift>, id: i32) -> String {
    ports
        .get(&id)
        .map(|p| p.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| id.to_string())
}

async fn neighbor_table(
    client: &dyn FbossCtrl,
    family: Family,
) -> anyhow::Result<()> {
    let mut entries = match family {
        Family::V4 => client.get_arp_table().await,
        Family::V6 => client.get_ndp_table().await,
    }
    .context("failed to fetch neighbor table")?;
    let ports = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    entries.sort_by_key(|e| (e.ip.addr.clone(), e.vlan_id));

    let mut tw = TabWriter::new(stdout());
    writeln!(
        tw,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        "IP Address".underline(),
        "MAC Address".underline(),
        "Port".underline(),
        "VLAN".underline(),
        "State".underline(),
        "TTL".underline(),
        "CLASSID".underline(),
    )?;
    for e in entries {
        let ip = e
            .ip
            .to_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| String::from("-"));
        writeln!(
            tw,
            "{ip}\t{}\t{}\t{} ({})\t{}\t{}\t{}",
            e.mac,
            port_name(&ports, e.port),
            e.vlan_name,
            e.vlan_id,
            e.state,
            e.ttl,
            e.class_id,
        )?;
    }
    tw.flush().map_err(|e| e.into())
}

pub async fn arp_cmd(opts: &CliOptions, cmd: Arp) -> anyhow::Result<()> {
    match cmd {
        Arp::Table => {
            neighbor_table(opts.agent_client()?.as_ref(), Family::V4).await
        }
        Arp::Flush(args) => neighbor_flush(opts, Family::V4, args).await,
    }
}

pub async fn ndp_cmd(opts: &CliOptions, cmd: Ndp) -> anyhow::Result<()> {
    match cmd {
        Ndp::Table => {
            neighbor_table(opts.agent_client()?.as_ref(), Family::V6).await
        }
        Ndp::Flush(args) => neighbor_flush(opts, Family::V6, args).await,
    }
}

#[cfg(test)]
mod tests {
    use fboss_client::types::BinaryAddress;
    use fboss_client::types::NeighborEntryThrift;

    use super::*;

    fn entry(ip: &str, vlan: i32) -> NeighborEntryThrift {
        NeighborEntryThrift {
            ip: BinaryAddress::from(ip.parse::<IpAddr>().unwrap()),
            vlan_id: vlan,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_flush_target() {
        let all = parse_flush_target("all", Family::V4).unwrap();
        assert!(subnet_contains(&all, "192.0.2.1".parse().unwrap()));
        assert!(parse_flush_target("10.0.0.1", Family::V4).is_ok());
        assert!(parse_flush_target("10.0.0.0/8", Family::V4).is_ok());
        assert!(parse_flush_target("2001::1", Family::V4).is_err());
        assert!(parse_flush_target("fe80::/10", Family::V6).is_ok());
        assert!(parse_flush_target("bogus", Family::V6).is_err());
    }

    #[test]
    fn test_flush_candidates() {
        let table = vec![
            entry("10.0.0.1", 100),
            entry("10.0.0.2", 200),
            entry("10.1.0.1", 100),
        ];
        let net = parse_flush_target("10.0.0.0/16", Family::V4).unwrap();
        assert_eq!(
            flush_candidates(&table, &net, 0),
            vec![
                ("10.0.0.1".parse().unwrap(), 100),
                ("10.0.0.2".parse().unwrap(), 200)
            ]
        );
        assert_eq!(
            flush_candidates(&table, &net, 200),
            vec![("10.0.0.2".parse().unwrap(), 200)]
        );
        let one = parse_flush_target("10.1.0.1", Family::V4).unwrap();
        assert_eq!(flush_candidates(&table, &one, 0).len(), 1);
    }
}
