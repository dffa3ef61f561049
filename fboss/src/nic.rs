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

use common::network::MacAddr;
use fboss_client::types::NeighborEntryThrift;
use fboss_client::types::PortInfoThrift;

use crate::CliOptions;

const UNKNOWN_VENDOR: &str = "Unknown";

// NIC vendors by OUI.
const NIC_VENDORS: &[([u8; 3], &str)] = &[
    ([0x00, 0x02, 0xc9], "Mellanox"),
    ([0x24, 0x8a, 0x07], "Mellanox"),
    ([0x50, 0x6b, 0x4b], "Mellanox"),
    ([0x7c, 0xfe, 0x90], "Mellanox"),
    ([0x98, 0x03, 0x9b], "Mellanox"),
    ([0xb8, 0x59, 0x9f], "Mellanox"),
    ([0xec, 0x0d, 0x9a], "Mellanox"),
    ([0x00, 0x0a, 0xf7], "Broadcom"),
    ([0x00, 0x10, 0x18], "Broadcom"),
    ([0x00, 0x1b, 0x21], "Intel"),
    ([0x3c, 0xfd, 0xfe], "Intel"),
    ([0x68, 0x05, 0xca], "Intel"),
    ([0xa0, 0x36, 0x9f], "Intel"),
    ([0xf8, 0xf2, 0x1e], "Intel"),
    ([0x00, 0x07, 0x43], "Chelsio"),
    ([0x00, 0x0f, 0x53], "Solarflare"),
];

#[derive(Debug, StructOpt)]
#[structopt(about = "show NIC information of connected hosts")]
pub enum Nic {
    #[structopt(about = "show the NIC vendors of hosts seen in ARP and NDP")]
    Vendor {
        /// List the vendor behind each port.
        #[structopt(long)]
        detail: bool,
        /// Also show each neighbor's MAC and IP address.
        #[structopt(long)]
        verbose: bool,
    },
}

pub fn vendor(mac: &str) -> &'static str {
    let Ok(mac) = mac.parse::<MacAddr>() else {
        return UNKNOWN_VENDOR;
    };
    NIC_VENDORS
        .iter()
        .find(|(oui, _)| *oui == mac.oui())
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_VENDOR)
}

// The number of distinct neighbor MACs per vendor.
fn vendor_counts(entries: &[NeighborEntryThrift]) -> BTreeMap<&'static str, usize> {
    let mut macs = entries.iter().map(|e| e.mac.as_str()).collect::<Vec<_>>();
    macs.sort_unstable();
    macs.dedup();
    let mut counts = BTreeMap::new();
    for mac in macs {
        *counts.entry(vendor(mac)).or_insert(0) += 1;
    }
    counts
}

fn port_name(ports: &BTreeMap<i32, PortInfoThrift>, id: i32) -> String {
    ports
        .get(&id)
        .map(|p| p.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| id.to_string())
}

pub async fn nic_cmd(opts: &CliOptions, cmd: Nic) -> anyhow::Result<()> {
    let Nic::Vendor { detail, verbose } = cmd;
    let client = opts.agent_client()?;
    let mut entries = client
        .get_arp_table()
        .await
        .context("failed to fetch ARP table")?;
    entries.extend(
        client
            .get_ndp_table()
            .await
            .context("failed to fetch NDP table")?,
    );

    let mut tw = TabWriter::new(stdout());
    if !detail && !verbose {
        writeln!(tw, "{}\t{}", "Vendor".underline(), "Hosts".underline())?;
        for (vendor, count) in vendor_counts(&entries) {
            writeln!(tw, "{vendor}\t{count}")?;
        }
        return tw.flush().map_err(|e| e.into());
    }

    let ports = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    entries.sort_by_key(|e| (e.port, e.mac.clone()));
    if verbose {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            "Port".underline(),
            "Vendor".underline(),
            "MAC Address".underline(),
            "IP Address".underline(),
        )?;
    } else {
        writeln!(tw, "{}\t{}", "Port".underline(), "Vendor".underline())?;
        entries.dedup_by(|a, b| a.port == b.port && a.mac == b.mac);
    }
    for e in &entries {
        let port = port_name(&ports, e.port);
        if verbose {
            let ip = e
                .ip
                .to_ip()
                .map(|ip| ip.to_string())
                .unwrap_or_else(|_| String::from("-"));
            writeln!(tw, "{port}\t{}\t{}\t{ip}", vendor(&e.mac), e.mac)?;
        } else {
            writeln!(tw, "{port}\t{}", vendor(&e.mac))?;
        }
    }
    tw.flush().map_err(|e| e.into())
}
