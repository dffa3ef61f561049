// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::net::IpAddr;
use std::str::FromStr;

use anyhow::anyhow;
use anyhow::Context;
use structopt::*;

use common::network::ip_ntop;
use fboss_client::types::Address;
use fboss_client::types::BinaryAddress;
use fboss_client::types::IpPrefix;
use fboss_client::types::NextHopThrift;
use fboss_client::types::RouteDetails;
use fboss_client::types::UnicastRoute;
use fboss_client::FbossCtrl;

use crate::utils;
use crate::utils::VlanAggregatePortMap;
use crate::utils::VlanPortMap;
use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "show or change the routing table")]
pub enum Route {
    #[structopt(about = "show the route to a specific IP")]
    Ip {
        #[structopt(help = "destination IP address")]
        ip: IpAddr,
        #[structopt(short, long, default_value = "0", help = "VRF to look in")]
        vrf: i32,
    },
    #[structopt(about = "show the routing table")]
    Table {
        #[structopt(long, help = "only show routes programmed by this client")]
        client_id: Option<i16>,
        #[structopt(flatten)]
        filter: RouteFilter,
    },
    #[structopt(about = "show details of every route")]
    Details {
        #[structopt(flatten)]
        filter: RouteFilter,
    },
    /// Add a new route or change an existing one.
    Add {
        /// The route prefix, e.g. "1.1.1.0/24" or "2001::0/64".
        prefix: String,
        /// The route's next-hops, as `addr[@ifname|%ifname][xweight]`, e.g.
        /// "10.1.1.1" or "fe80::1@fboss2000x3".
        #[structopt(required = true, parse(try_from_str))]
        nexthops: Vec<NextHopArg>,
        /// The client ID used to manipulate the routes.
        #[structopt(short, long, default_value = "1")]
        client_id: i16,
        /// DIRECTLY_CONNECTED=0, STATIC_ROUTE=1, EBGP=20, IBGP=200,
        /// MAX_ADMIN_DISTANCE=255.
        #[structopt(short = "d", long)]
        admin_distance: Option<i32>,
    },
    /// Delete an existing route.
    Delete {
        /// The route prefix, e.g. "1.1.1.0/24" or "2001::0/64".
        prefix: String,
        /// The client ID used to manipulate the routes.
        #[structopt(short, long, default_value = "1")]
        client_id: i16,
    },
    /// Flush all routes programmed by a client.
    Flush {
        /// The client ID used to manipulate the routes.
        #[structopt(short, long, default_value = "1")]
        client_id: i16,
    },
    #[structopt(about = "summarize the routing table")]
    Summary,
}

#[derive(Debug, StructOpt)]
pub struct RouteFilter {
    #[structopt(short = "4", long = "ipv4", help = "show IPv4 routes")]
    ipv4: bool,
    #[structopt(short = "6", long = "ipv6", help = "show IPv6 routes")]
    ipv6: bool,
    #[structopt(help = "only show these prefixes")]
    prefixes: Vec<String>,
}

impl RouteFilter {
    fn parse(&self) -> anyhow::Result<Vec<IpPrefix>> {
        self.prefixes.iter().map(|p| utils::parse_prefix(p)).collect()
    }

    // With neither or both of -4 and -6, every family is shown.
    fn shows(&self, dest: &IpPrefix, prefixes: &[IpPrefix]) -> bool {
        let family = match (self.ipv4, self.ipv6) {
            (true, false) => dest.ip.is_v4(),
            (false, true) => dest.ip.is_v6(),
            _ => true,
        };
        family && (prefixes.is_empty() || prefixes.contains(dest))
    }
}

/// One next-hop argument: `addr[@ifname|%ifname][xweight]`.
#[derive(Clone, Debug, PartialEq)]
pub struct NextHopArg(NextHopThrift);

impl FromStr for NextHopArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_if, weight) = match s.rsplit_once('x') {
            Some((addr_if, weight)) => (
                addr_if,
                weight
                    .parse::<i32>()
                    .map_err(|_| anyhow!("invalid weight in next-hop {s}"))?,
            ),
            None => (s, 0),
        };
        let (addr, if_name) = match addr_if
            .rsplit_once('@')
            .or_else(|| addr_if.rsplit_once('%'))
        {
            Some((addr, if_name)) => (addr, Some(if_name.to_string())),
            None => (addr_if, None),
        };
        let ip: IpAddr = addr
            .parse()
            .map_err(|_| anyhow!("invalid address in next-hop {s}"))?;
        Ok(NextHopArg(NextHopThrift {
            address: BinaryAddress {
                if_name,
                ..BinaryAddress::from(ip)
            },
            weight,
            mpls_action: None,
        }))
    }
}

// The VLAN maps used to show where next-hops egress.
async fn topology(
    opts: &CliOptions,
    client: &dyn FbossCtrl,
) -> anyhow::Result<(VlanAggregatePortMap, VlanPortMap)> {
    let qsfp = opts.qsfp_client()?;
    let ports = utils::build_vlan_port_map(
        &opts.log,
        client,
        Some(qsfp.as_ref()),
        false,
        false,
    )
    .await
    .context("failed to map VLANs to ports")?;
    let aggregates = utils::build_vlan_aggregate_port_map(&opts.log, client)
        .await
        .context("failed to map VLANs to aggregate ports")?;
    Ok((aggregates, ports))
}

fn print_route_detail_entry(
    entry: &RouteDetails,
    aggregates: &VlanAggregatePortMap,
    ports: &VlanPortMap,
) -> anyhow::Result<()> {
    let suffix = if entry.is_connected { " (connected)" } else { "" };
    println!(
        "Network Address: {}{suffix}",
        utils::prefix_to_str(&entry.dest)?
    );
    for group in &entry.next_hop_multi {
        println!("  Nexthops from client {}", group.client_id);
        if !group.next_hop_addrs.is_empty() {
            for addr in &group.next_hop_addrs {
                let nh = NextHopThrift::from(addr.clone());
                println!("    {}", utils::nexthop_to_str(&nh, None, None)?);
            }
        } else {
            for nh in &group.next_hops {
                println!("    {}", utils::nexthop_to_str(nh, None, None)?);
            }
        }
    }
    println!("  Action: {}", entry.action);
    if !entry.next_hops.is_empty() {
        println!("  Forwarding via:");
        for nh in &entry.next_hops {
            println!(
                "    {}",
                utils::nexthop_to_str(nh, Some(aggregates), Some(ports))?
            );
        }
    } else if !entry.fwd_info.is_empty() {
        println!("  Forwarding via:");
        for fwd in &entry.fwd_info {
            println!(
                "    (i/f {}) {}",
                fwd.interface_id,
                ip_ntop(&fwd.ip.addr)?
            );
        }
    } else {
        println!("  No Forwarding Info");
    }
    match entry.admin_distance {
        Some(d) => println!("  Admin Distance: {d}"),
        None => println!("  Admin Distance: None"),
    }
    println!();
    Ok(())
}

async fn route_ip(
    opts: &CliOptions,
    ip: IpAddr,
    vrf: i32,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let (aggregates, ports) = topology(opts, client.as_ref()).await?;
    let details = client
        .get_ip_route_details(Address::from(ip), vrf)
        .await
        .context("failed to look up route")?;
    if details.next_hop_multi.is_empty() {
        println!("No route to {ip}, Vrf: {vrf}");
        return Ok(());
    }
    println!("Route to {ip}, Vrf: {vrf}");
    print_route_detail_entry(&details, &aggregates, &ports)
}

async fn route_table(
    opts: &CliOptions,
    client_id: Option<i16>,
    filter: RouteFilter,
) -> anyhow::Result<()> {
    let prefixes = filter.parse()?;
    let client = opts.agent_client()?;
    let routes = match client_id {
        None => client.get_route_table().await,
        Some(id) => client.get_route_table_by_client(id).await,
    }
    .context("failed to fetch routing table")?;
    if routes.is_empty() {
        println!("No Route Table Entries Found");
        return Ok(());
    }

    let (aggregates, ports) = topology(opts, client.as_ref()).await?;
    for entry in routes.iter().filter(|r| filter.shows(&r.dest, &prefixes)) {
        let ucmp = if utils::is_ucmp_active(&entry.next_hops) {
            " (UCMP Active)"
        } else {
            ""
        };
        println!(
            "Network Address: {}{ucmp}",
            utils::prefix_to_str(&entry.dest)?
        );
        if !entry.next_hops.is_empty() {
            for nh in &entry.next_hops {
                println!(
                    "\tvia {}",
                    utils::nexthop_to_str(nh, Some(&aggregates), Some(&ports))?
                );
            }
        } else {
            for addr in &entry.next_hop_addrs {
                let nh = NextHopThrift::from(addr.clone());
                println!("\tvia {}", utils::nexthop_to_str(&nh, None, None)?);
            }
        }
    }
    Ok(())
}

async fn route_details(
    opts: &CliOptions,
    filter: RouteFilter,
) -> anyhow::Result<()> {
    let prefixes = filter.parse()?;
    let client = opts.agent_client()?;
    let (aggregates, ports) = topology(opts, client.as_ref()).await?;
    let routes = client
        .get_route_table_details()
        .await
        .context("failed to fetch route details")?;
    if routes.is_empty() {
        println!("No Route Table Details Found");
        return Ok(());
    }
    for entry in routes.iter().filter(|r| filter.shows(&r.dest, &prefixes)) {
        print_route_detail_entry(entry, &aggregates, &ports)?;
    }
    Ok(())
}

async fn route_add(
    opts: &CliOptions,
    prefix: &str,
    nexthops: Vec<NextHopArg>,
    client_id: i16,
    admin_distance: Option<i32>,
) -> anyhow::Result<()> {
    let route = UnicastRoute {
        dest: utils::parse_prefix(prefix)?,
        next_hops: nexthops.into_iter().map(|nh| nh.0).collect(),
        admin_distance,
        ..Default::default()
    };
    opts.agent_client()?
        .add_unicast_routes(client_id, vec![route])
        .await
        .context("failed to add route")
}

async fn route_delete(
    opts: &CliOptions,
    prefix: &str,
    client_id: i16,
) -> anyhow::Result<()> {
    let prefix = utils::parse_prefix(prefix)?;
    opts.agent_client()?
        .delete_unicast_routes(client_id, vec![prefix])
        .await
        .context("failed to delete route")
}

async fn route_flush(opts: &CliOptions, client_id: i16) -> anyhow::Result<()> {
    // Syncing an empty table removes everything the client programmed.
    opts.agent_client()?
        .sync_fib(client_id, Vec::new())
        .await
        .context("failed to flush routes")
}

#[derive(Debug, Default, Eq, PartialEq)]
struct RouteCounts {
    v4: usize,
    v6: usize,
}

fn count_routes(routes: &[UnicastRoute]) -> RouteCounts {
    let mut counts = RouteCounts::default();
    for r in routes {
        if r.dest.ip.is_v4() {
            counts.v4 += 1;
        } else if r.dest.ip.is_v6() {
            counts.v6 += 1;
        }
    }
    counts
}

async fn route_summary(opts: &CliOptions) -> anyhow::Result<()> {
    let routes = opts
        .agent_client()?
        .get_route_table()
        .await
        .context("failed to fetch routing table")?;
    let counts = count_routes(&routes);
    println!("Number of v4 routes: {}", counts.v4);
    println!("Number of v6 routes: {}", counts.v6);
    println!("Total routes: {}", counts.v4 + counts.v6);
    Ok(())
}

pub async fn route_cmd(opts: &CliOptions, cmd: Route) -> anyhow::Result<()> {
    match cmd {
        Route::Ip { ip, vrf } => route_ip(opts, ip, vrf).await,
        Route::Table { client_id, filter } => {
            route_table(opts, client_id, filter).await
        }
        Route::Details { filter } => route_details(opts, filter).await,
        Route::Add {
            prefix,
            nexthops,
            client_id,
            admin_distance,
        } => {
            route_add(opts, &prefix, nexthops, client_id, admin_distance).await
        }
        Route::Delete { prefix, client_id } => {
            route_delete(opts, &prefix, client_id).await
        }
        Route::Flush { client_id } => route_flush(opts, client_id).await,
        Route::Summary => route_summary(opts).await,
    }
}
