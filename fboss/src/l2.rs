// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::collections::BTreeMap;
use std::io::{stdout, Write};

use anyhow::Context;
use colored::*;
use structopt::*;
use tabwriter::TabWriter;

use fboss_client::types::AggregatePortThrift;
use fboss_client::types::L2EntryThrift;
use fboss_client::types::L2EntryType;
use fboss_client::types::PortInfoThrift;

use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "show L2 information")]
pub enum L2 {
    #[structopt(about = "show the L2 table")]
    Table,
}

/// One printable row of the L2 table.
#[derive(Debug, Eq, PartialEq)]
struct L2Row {
    mac: String,
    port: String,
    vlan: i32,
    kind: &'static str,
    class_id: String,
}

fn l2_rows(
    mut entries: Vec<L2EntryThrift>,
    ports: &BTreeMap<i32, PortInfoThrift>,
    aggregates: &[AggregatePortThrift],
) -> Vec<L2Row> {
    entries.sort_by(|a, b| {
        (a.port, a.vlan_id, &a.mac).cmp(&(b.port, b.vlan_id, &b.mac))
    });
    entries
        .into_iter()
        .filter_map(|e| {
            let port = match e.trunk.filter(|t| *t != 0) {
                Some(trunk) => {
                    let mut matches =
                        aggregates.iter().filter(|a| a.key == trunk);
                    match (matches.next(), matches.next()) {
                        (Some(agg), None) => agg.name.clone(),
                        _ => format!("{trunk} (Trunk)"),
                    }
                }
                // Entries on ports the agent doesn't list belong to the
                // CPU port, and only carry the VLANs' own MACs.
                None => {
                    let info = ports.get(&e.port)?;
                    if info.name.is_empty() {
                        e.port.to_string()
                    } else {
                        info.name.clone()
                    }
                }
            };
            let kind = match e.l2_entry_type {
                Some(L2EntryType::L2EntryTypePending) => "Pending",
                Some(L2EntryType::L2EntryTypeValidated) => "Validated",
                None => "-",
            };
            Some(L2Row {
                mac: e.mac,
                port,
                vlan: e.vlan_id,
                kind,
                class_id: e
                    .class_id
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| String::from("-")),
            })
        })
        .collect()
}

pub async fn l2_cmd(opts: &CliOptions, cmd: L2) -> anyhow::Result<()> {
    match cmd {
        L2::Table => {
            let client = opts.agent_client()?;
            let entries = client
                .get_l2_table()
                .await
                .context("failed to fetch L2 table")?;
            let ports = client
                .get_all_port_info()
                .await
                .context("failed to fetch port info")?;
            let aggregates = client
                .get_aggregate_port_table()
                .await
                .context("failed to fetch aggregate ports")?;

            if entries.is_empty() {
                println!("No L2 Entries Found");
                return Ok(());
            }
            let mut tw = TabWriter::new(stdout());
            writeln!(
                tw,
                "{}\t{}\t{}\t{}\t{}",
                "MAC Address".underline(),
                "Port/Trunk".underline(),
                "VLAN".underline(),
                "TYPE".underline(),
                "CLASSID".underline(),
            )?;
            for row in l2_rows(entries, &ports, &aggregates) {
                writeln!(
                    tw,
                    "{}\t{}\t{}\t{}\t{}",
                    row.mac, row.port, row.vlan, row.kind, row.class_id
                )?;
            }
            tw.flush().map_err(|e| e.into())
        }
    }
}
