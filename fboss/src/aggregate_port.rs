// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::collections::BTreeMap;

use anyhow::bail;
use anyhow::Context;
use structopt::*;

use fboss_client::types::AggregatePortThrift;
use fboss_client::types::PortInfoThrift;

use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "show aggregate ports and their members")]
pub struct AggregatePort {
    /// Only show this aggregate port.
    name: Option<String>,
}

fn aggregate_lines(
    agg: &AggregatePortThrift,
    ports: &BTreeMap<i32, PortInfoThrift>,
) -> Vec<String> {
    let up = agg.member_ports.iter().filter(|m| m.is_forwarding).count();
    let mut lines = vec![
        format!("Port name: {}", agg.name),
        format!("Description: {}", agg.description),
        format!(
            "Active members/Configured members/Min members: {}/{}/{}",
            up,
            agg.member_ports.len(),
            agg.minimum_link_count
        ),
    ];
    for m in &agg.member_ports {
        let name = ports
            .get(&m.member_port_id)
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| m.member_port_id.to_string());
        lines.push(format!(
            "\t Member: {name:>10}, id: {:>3}, Up: {}, Rate: {}",
            m.member_port_id,
            if m.is_forwarding { "True" } else { "False" },
            m.rate
        ));
    }
    lines
}

pub async fn aggregate_port_cmd(
    opts: &CliOptions,
    cmd: AggregatePort,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let mut table = client
        .get_aggregate_port_table()
        .await
        .context("failed to fetch aggregate ports")?;
    let ports = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;

    if let Some(name) = &cmd.name {
        table.retain(|a| a.name == *name);
        if table.is_empty() {
            bail!("no aggregate port named {name}");
        }
    }
    table.sort_by(|a, b| a.name.cmp(&b.name));
    for agg in &table {
        for line in aggregate_lines(agg, &ports) {
            println!("{line}");
        }
        println!();
    }
    Ok(())
}
