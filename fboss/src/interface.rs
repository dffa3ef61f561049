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

use fboss_client::types::InterfaceDetail;

use crate::utils;
use crate::utils::VlanAggregatePortMap;
use crate::utils::VlanPortMap;
use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "show the IP addresses of an interface")]
pub struct Ip {
    #[structopt(short, long, help = "interface id")]
    interface: i32,
}

#[derive(Debug, StructOpt)]
#[structopt(about = "show interface information")]
pub enum Interface {
    /// Show details of the given interfaces, or list every interface.
    Show {
        interfaces: Vec<i32>,
    },
    /// Show a summary of every interface and the ports behind it.
    Summary,
}

fn addresses(detail: &InterfaceDetail) -> anyhow::Result<Vec<String>> {
    detail
        .address
        .iter()
        .map(|p| utils::prefix_to_str(p).map_err(|e| e.into()))
        .collect()
}

pub async fn ip_cmd(opts: &CliOptions, cmd: Ip) -> anyhow::Result<()> {
    let detail = opts
        .agent_client()?
        .get_interface_detail(cmd.interface)
        .await
        .context("failed to fetch interface")?;
    println!("{} ({}):", detail.interface_name, detail.interface_id);
    for addr in addresses(&detail)? {
        println!("  {addr}");
    }
    Ok(())
}

fn print_interface_detail(detail: &InterfaceDetail) -> anyhow::Result<()> {
    println!(
        "{}\tInterface ID: {}",
        detail.interface_name, detail.interface_id
    );
    println!("  Vlan: {}\t\t\tRouter Id: {}", detail.vlan_id, detail.router_id);
    match detail.mtu {
        Some(mtu) => println!("  MTU: {mtu}"),
        None => println!("  MTU: -"),
    }
    println!("  Mac Address: {}", detail.mac);
    println!("  IP Address:");
    for addr in addresses(detail)? {
        println!("\t{addr}");
    }
    Ok(())
}

async fn interface_show(
    opts: &CliOptions,
    interfaces: Vec<i32>,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    if interfaces.is_empty() {
        let all = client
            .get_all_interfaces()
            .await
            .context("failed to fetch interfaces")?;
        if all.is_empty() {
            println!("No Interfaces Found");
        }
        for detail in all.values() {
            println!("{}", detail.interface_name);
        }
        return Ok(());
    }
    for id in interfaces {
        let detail = client
            .get_interface_detail(id)
            .await
            .with_context(|| format!("failed to fetch interface {id}"))?;
        print_interface_detail(&detail)?;
    }
    Ok(())
}

/// One row of `interface summary`.
#[derive(Debug, Eq, PartialEq)]
struct InterfaceRow {
    vlan: i32,
    name: String,
    mtu: String,
    addresses: String,
    ports: String,
}

// Root ports in slot order, so that eth2/1 precedes eth10/1.
fn sorted_roots(
    roots: &BTreeMap<String, Vec<utils::PortSummary>>,
) -> Vec<&String> {
    let mut names = roots.keys().collect::<Vec<_>>();
    names.sort_by_key(|root| utils::port_name_sort_key(&format!("{root}/0")));
    names
}

fn interface_row(
    detail: &InterfaceDetail,
    aggregates: &VlanAggregatePortMap,
    ports: &VlanPortMap,
) -> anyhow::Result<InterfaceRow> {
    let name = match aggregates.get(&detail.vlan_id) {
        Some(aggregate) => format!("{} ({aggregate})", detail.interface_name),
        None => detail.interface_name.clone(),
    };
    let ports = ports
        .get(&detail.vlan_id)
        .map(|roots| {
            sorted_roots(roots)
                .into_iter()
                .flat_map(|root| roots[root].iter().map(|p| p.to_string()))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    Ok(InterfaceRow {
        vlan: detail.vlan_id,
        name,
        mtu: detail
            .mtu
            .map(|m| m.to_string())
            .unwrap_or_else(|| String::from("-")),
        addresses: addresses(detail)?.join(", "),
        ports,
    })
}

async fn interface_summary(opts: &CliOptions) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let qsfp = opts.qsfp_client()?;
    let ports = utils::build_vlan_port_map(
        &opts.log,
        client.as_ref(),
        Some(qsfp.as_ref()),
        opts.colors,
        false,
    )
    .await
    .context("failed to map VLANs to ports")?;
    let aggregates =
        utils::build_vlan_aggregate_port_map(&opts.log, client.as_ref())
            .await
            .context("failed to map VLANs to aggregate ports")?;
    let interfaces = client
        .get_all_interfaces()
        .await
        .context("failed to fetch interfaces")?;

    let mut tw = TabWriter::new(stdout());
    writeln!(
        tw,
        "{}\t{}\t{}\t{}\t{}",
        "VLAN".underline(),
        "Interface".underline(),
        "MTU".underline(),
        "Addresses".underline(),
        "Ports".underline(),
    )?;
    for detail in interfaces.values() {
        let row = interface_row(detail, &aggregates, &ports)?;
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}",
            row.vlan, row.name, row.mtu, row.addresses, row.ports
        )?;
    }
    tw.flush().map_err(|e| e.into())
}

pub async fn interface_cmd(
    opts: &CliOptions,
    cmd: Interface,
) -> anyhow::Result<()> {
    match cmd {
        Interface::Show { interfaces } => interface_show(opts, interfaces).await,
        Interface::Summary => interface_summary(opts).await,
    }
}
