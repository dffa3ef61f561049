// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::io::{stdout, Write};

use anyhow::Context;
use colored::*;
use structopt::*;
use tabwriter::TabWriter;

use fboss_client::types::LinkNeighborThrift;

use crate::utils;
use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "show LLDP neighbors")]
pub struct Lldp {
    /// Only show the neighbor on this port.
    #[structopt(short, long)]
    port: Option<i32>,
    /// Level of detail; repeat for more, e.g. -vv.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn or_dash(s: Option<&String>) -> &str {
    s.map(|s| s.as_str()).filter(|s| !s.is_empty()).unwrap_or("-")
}

fn print_neighbor_detail(
    n: &LinkNeighborThrift,
    local: &str,
    verbose: u8,
) {
    println!("Local Port: {local}");
    println!("  Local VLAN: {}", n.local_vlan);
    println!("  Neighbor MAC: {}", n.src_mac);
    println!("  Chassis ID: {}", n.printable_chassis_id);
    println!("  Port ID: {}", n.printable_port_id);
    println!("  System Name: {}", or_dash(n.system_name.as_ref()));
    println!("  Port Description: {}", or_dash(n.port_description.as_ref()));
    println!("  TTL: {}", n.ttl);
    if verbose > 1 {
        println!(
            "  System Description: {}",
            or_dash(n.system_description.as_ref())
        );
    }
    println!();
}

pub async fn lldp_cmd(opts: &CliOptions, cmd: Lldp) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let mut neighbors = client
        .get_lldp_neighbors()
        .await
        .context("failed to fetch LLDP neighbors")?;
    let ports = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    if let Some(port) = cmd.port {
        neighbors.retain(|n| n.local_port == port);
    }
    let local_name = |id: i32| {
        ports
            .get(&id)
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.to_string())
    };
    neighbors.sort_by_key(|n| {
        ports
            .get(&n.local_port)
            .map(utils::port_sort_key)
            .unwrap_or_default()
    });

    if cmd.verbose > 0 {
        for n in &neighbors {
            print_neighbor_detail(n, &local_name(n.local_port), cmd.verbose);
        }
        return Ok(());
    }

    let mut tw = TabWriter::new(stdout());
    writeln!(
        tw,
        "{}\t{}\t{}\t{}",
        "Local Port".underline(),
        "Name".underline(),
        "Neighbor Port".underline(),
        "TTL".underline(),
    )?;
    for n in &neighbors {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            local_name(n.local_port),
            or_dash(n.system_name.as_ref()),
            n.printable_port_id,
            n.ttl,
        )?;
    }
    tw.flush().map_err(|e| e.into())
}
