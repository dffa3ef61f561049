// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::collections::BTreeMap;
use std::io::{stdout, Write};
use std::time::Duration;

use anyhow::bail;
use anyhow::Context;
use colored::*;
use slog::warn;
use structopt::*;
use tabwriter::TabWriter;

use fboss_client::types::LinkNeighborThrift;
use fboss_client::types::PortCounters;
use fboss_client::types::PortInfoThrift;
use fboss_client::types::PortLedExternalState;
use fboss_client::types::PortOperState;
use fboss_client::types::PortStatus;
use fboss_client::types::PrbsComponent;
use fboss_client::types::PrbsStats;
use fboss_client::types::TransceiverInfo;
use fboss_client::FbossCtrl;

use crate::utils;
use crate::CliOptions;

/// How long a flapped port is held down.
const FLAP_DOWN_TIME: Duration = Duration::from_secs(1);

#[derive(Debug, StructOpt)]
#[structopt(about = "show or change port state")]
pub enum Port {
    #[structopt(about = "show port details")]
    Details {
        #[structopt(help = "port ids or names, default all")]
        ports: Vec<String>,
    },
    #[structopt(about = "show port descriptions")]
    Description {
        #[structopt(help = "port ids or names, default all")]
        ports: Vec<String>,
    },
    State(PortState),
    Transceiver(Transceiver),
    Stats(Stats),
    Prbs(Prbs),
}

#[derive(Debug, StructOpt)]
#[structopt(about = "show or change the administrative state of ports")]
pub enum PortState {
    #[structopt(about = "show port state")]
    Show {
        ports: Vec<String>,
        /// Include disabled ports.
        #[structopt(long)]
        all: bool,
    },
    #[structopt(about = "enable ports")]
    Enable { ports: Vec<String> },
    #[structopt(about = "disable ports")]
    Disable { ports: Vec<String> },
    #[structopt(about = "take ports down and bring them back up")]
    Flap {
        ports: Vec<String>,
        /// Flap every port that is enabled and has a transceiver, but whose
        /// link is down.
        #[structopt(long)]
        all: bool,
    },
    #[structopt(
        name = "set-led",
        visible_alias = "set_led",
        about = "force a port's LED on or off"
    )]
    SetLed {
        ports: Vec<String>,
        /// LED will be permanently on.
        #[structopt(long, conflicts_with = "off")]
        on: bool,
        /// LED will be permanently off.
        #[structopt(long)]
        off: bool,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(about = "show transceivers")]
pub enum Transceiver {
    #[structopt(about = "show the transceivers behind ports")]
    Show { ports: Vec<String> },
}

#[derive(Debug, StructOpt)]
#[structopt(about = "show or clear port counters")]
pub enum Stats {
    #[structopt(about = "show port counters")]
    Show {
        ports: Vec<String>,
        /// Show each port on its own, with its LLDP neighbor.
        #[structopt(long)]
        detail: bool,
    },
    #[structopt(about = "clear port counters")]
    Clear { ports: Vec<String> },
}

#[derive(Debug, StructOpt)]
#[structopt(about = "pseudo-random bit sequence testing")]
pub enum Prbs {
    #[structopt(about = "PRBS between the ASIC and its peer")]
    Asic(PrbsOp),
    #[structopt(about = "PRBS on a gearbox")]
    Gearbox(Gearbox),
}

#[derive(Debug, StructOpt)]
pub enum Gearbox {
    #[structopt(about = "the gearbox's system side")]
    System(PrbsOp),
    #[structopt(about = "the gearbox's line side")]
    Line(PrbsOp),
}

#[derive(Debug, StructOpt)]
pub enum PrbsOp {
    #[structopt(about = "start generating and checking PRBS")]
    Enable {
        ports: Vec<String>,
        #[structopt(
            short = "p",
            default_value = "31",
            help = "the PRBS polynomial"
        )]
        polynomial: i32,
    },
    #[structopt(about = "stop PRBS")]
    Disable { ports: Vec<String> },
    #[structopt(about = "show PRBS lane statistics")]
    Stats { ports: Vec<String> },
    #[structopt(about = "clear PRBS lane statistics")]
    Clear { ports: Vec<String> },
}

fn port_name(all: &BTreeMap<i32, PortInfoThrift>, id: i32) -> String {
    all.get(&id)
        .map(|p| p.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| id.to_string())
}

// Ports in display order: by name, falling back to id for unnamed ports.
fn sorted_ports<'a>(
    all: &'a BTreeMap<i32, PortInfoThrift>,
    ids: &[i32],
) -> Vec<&'a PortInfoThrift> {
    let mut ports = ids.iter().filter_map(|id| all.get(id)).collect::<Vec<_>>();
    ports.sort_by_key(|p| utils::port_sort_key(p));
    ports
}

// Transceiver presence for each port, or `None` where it can't be
// learned. The agent's own answer wins when it has one.
async fn port_presence(
    opts: &CliOptions,
    statuses: &BTreeMap<i32, PortStatus>,
) -> BTreeMap<i32, Option<bool>> {
    let transceivers = match opts.qsfp_client() {
        Ok(qsfp) => match qsfp.get_transceiver_info(Vec::new()).await {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(opts.log, "failed to fetch transceiver info"; "error" => %e);
                None
            }
        },
        Err(e) => {
            warn!(opts.log, "no qsfp client"; "error" => %e);
            None
        }
    };
    presence_map(statuses, transceivers.as_ref())
}

fn presence_map(
    statuses: &BTreeMap<i32, PortStatus>,
    transceivers: Option<&BTreeMap<i32, TransceiverInfo>>,
) -> BTreeMap<i32, Option<bool>> {
    statuses
        .iter()
        .map(|(id, status)| {
            let present = status.present.or_else(|| {
                let idx = status.transceiver_idx.as_ref()?;
                let t = transceivers?.get(&idx.transceiver_id)?;
                Some(t.present)
            });
            (*id, present)
        })
        .collect()
}

fn counter_header(tw: &mut TabWriter<std::io::Stdout>) -> anyhow::Result<()> {
    writeln!(
        tw,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        "Port".underline(),
        "Direction".underline(),
        "Bytes".underline(),
        "Unicast".underline(),
        "Multicast".underline(),
        "Broadcast".underline(),
        "Errors".underline(),
        "Discards".underline(),
    )?;
    Ok(())
}

fn counter_row(
    tw: &mut TabWriter<std::io::Stdout>,
    name: &str,
    direction: &str,
    c: &PortCounters,
) -> anyhow::Result<()> {
    writeln!(
        tw,
        "{name}\t{direction}\t{}\t{}\t{}\t{}\t{}\t{}",
        c.bytes,
        c.ucast_pkts,
        c.multicast_pkts,
        c.broadcast_pkts,
        c.errors,
        c.discards,
    )?;
    Ok(())
}

async fn port_details(opts: &CliOptions, ports: &[String]) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    for port in sorted_ports(&all, &ids) {
        let oper = match port.oper_state {
            PortOperState::Up => "UP",
            PortOperState::Down => "DOWN",
        };
        println!("{}  ID: {}", port.name, port.port_id);
        println!("  Description: {}", port.description);
        println!("  Admin State: {:?}", port.admin_state);
        println!("  Link State:  {oper}");
        println!("  Speed:       {}G", port.speed_mbps / 1000);
        println!(
            "  VLANs:       {}",
            port.vlans
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!(
            "  FEC:         {}",
            if port.fec_enabled { "Enabled" } else { "Disabled" }
        );
        println!(
            "  Pause:       tx {} rx {}",
            if port.tx_pause { "on" } else { "off" },
            if port.rx_pause { "on" } else { "off" },
        );
        if !port.profile_id.is_empty() {
            println!("  Profile ID:  {}", port.profile_id);
        }
        println!();
    }
    Ok(())
}

async fn port_description(
    opts: &CliOptions,
    ports: &[String],
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;

    let mut tw = TabWriter::new(stdout());
    writeln!(
        tw,
        "{}\t{}\t{}",
        "ID".underline(),
        "Name".underline(),
        "Description".underline()
    )?;
    for port in sorted_ports(&all, &ids) {
        writeln!(tw, "{}\t{}\t{}", port.port_id, port.name, port.description)?;
    }
    tw.flush().map_err(|e| e.into())
}

async fn state_show(
    opts: &CliOptions,
    ports: &[String],
    all_ports: bool,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    let statuses = client
        .get_port_status(ids.clone())
        .await
        .context("failed to fetch port status")?;
    let presence = port_presence(opts, &statuses).await;

    let mut tw = TabWriter::new(stdout());
    writeln!(
        tw,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        "ID".underline(),
        "Name".underline(),
        "AdminState".underline(),
        "LinkState".underline(),
        "Transceiver".underline(),
        "Speed".underline(),
        "ProfileID".underline(),
    )?;
    for port in sorted_ports(&all, &ids) {
        let Some(status) = statuses.get(&port.port_id) else {
            continue;
        };
        if !status.enabled && !all_ports {
            continue;
        }
        let strs = utils::status_strs(
            status,
            presence.get(&port.port_id).copied().flatten(),
        );
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            port.port_id,
            port.name,
            strs.admin,
            strs.link_colored(),
            strs.present,
            strs.speed,
            strs.profile,
        )?;
    }
    tw.flush().map_err(|e| e.into())
}

async fn set_state(
    opts: &CliOptions,
    ports: &[String],
    enable: bool,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    for id in ids {
        client
            .set_port_state(id, enable)
            .await
            .with_context(|| format!("failed to change state of port {id}"))?;
        println!(
            "Port {}: {}",
            port_name(&all, id),
            if enable { "Enabled" } else { "Disabled" }
        );
    }
    Ok(())
}

// Ports worth flapping: enabled, with a transceiver, but not up.
fn flap_candidates(
    statuses: &BTreeMap<i32, PortStatus>,
    presence: &BTreeMap<i32, Option<bool>>,
) -> Vec<i32> {
    statuses
        .iter()
        .filter(|(id, s)| {
            s.enabled && !s.up && presence.get(*id) == Some(&Some(true))
        })
        .map(|(id, _)| *id)
        .collect()
}

async fn flap(
    opts: &CliOptions,
    ports: &[String],
    all_ports: bool,
) -> anyhow::Result<()> {
    if ports.is_empty() && !all_ports {
        bail!("no ports to flap: name some ports, or pass --all");
    }
    let client = opts.agent_client()?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    let ids = if all_ports {
        let statuses = client
            .get_port_status(Vec::new())
            .await
            .context("failed to fetch port status")?;
        let presence = port_presence(opts, &statuses).await;
        flap_candidates(&statuses, &presence)
    } else {
        utils::resolve_ports(client.as_ref(), ports).await?
    };
    if ids.is_empty() {
        println!("No ports to flap");
        return Ok(());
    }
    flap_ports(client.as_ref(), &all, &ids).await
}

async fn flap_ports(
    client: &dyn FbossCtrl,
    all: &BTreeMap<i32, PortInfoThrift>,
    ids: &[i32],
) -> anyhow::Result<()> {
    for id in ids {
        client
            .set_port_state(*id, false)
            .await
            .with_context(|| format!("failed to disable port {id}"))?;
    }
    tokio::time::sleep(FLAP_DOWN_TIME).await;
    for id in ids {
        client
            .set_port_state(*id, true)
            .await
            .with_context(|| format!("failed to enable port {id}"))?;
        println!("Port {}: Flapped", port_name(all, *id));
    }
    Ok(())
}

fn led_state(on: bool, off: bool) -> PortLedExternalState {
    match (on, off) {
        (true, _) => PortLedExternalState::ExternalForceOn,
        (false, true) => PortLedExternalState::ExternalForceOff,
        (false, false) => PortLedExternalState::None,
    }
}

async fn set_led(
    opts: &CliOptions,
    ports: &[String],
    on: bool,
    off: bool,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let state = led_state(on, off);
    for id in ids {
        client
            .set_port_led_external_state(id, state)
            .await
            .with_context(|| format!("failed to set LED of port {id}"))?;
    }
    Ok(())
}

async fn transceiver_show(
    opts: &CliOptions,
    ports: &[String],
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;
    let statuses = client
        .get_port_status(ids.clone())
        .await
        .context("failed to fetch port status")?;
    let transceivers = opts
        .qsfp_client()?
        .get_transceiver_info(Vec::new())
        .await
        .context("failed to fetch transceiver info")?;

    let mut tw = TabWriter::new(stdout());
    writeln!(
        tw,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        "Port".underline(),
        "ID".underline(),
        "Present".underline(),
        "Vendor".underline(),
        "Part Number".underline(),
        "Serial".underline(),
        "Temp (C)".underline(),
        "Vcc (V)".underline(),
    )?;
    for port in sorted_ports(&all, &ids) {
        let Some(idx) = statuses
            .get(&port.port_id)
            .and_then(|s| s.transceiver_idx.as_ref())
        else {
            continue;
        };
        let Some(t) = transceivers.get(&idx.transceiver_id) else {
            writeln!(tw, "{}\t{}\t-\t\t\t\t\t", port.name, idx.transceiver_id)?;
            continue;
        };
        let vendor = t.vendor.clone().unwrap_or_default();
        let (temp, vcc) = match &t.sensor {
            Some(s) => (
                format!("{:.2}", s.temp.value),
                format!("{:.2}", s.vcc.value),
            ),
            None => (String::new(), String::new()),
        };
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{temp}\t{vcc}",
            port.name,
            idx.transceiver_id,
            if t.present { "Present" } else { "Absent" },
            vendor.name.trim(),
            vendor.part_number.trim(),
            vendor.serial.trim(),
        )?;
    }
    tw.flush().map_err(|e| e.into())
}

fn lldp_neighbor_names(
    neighbors: &[LinkNeighborThrift],
) -> BTreeMap<i32, String> {
    neighbors
        .iter()
        .map(|n| {
            let name = n
                .system_name
                .clone()
                .unwrap_or_else(|| n.printable_chassis_id.clone());
            (n.local_port, format!("{name} {}", n.printable_port_id))
        })
        .collect()
}

async fn stats_show(
    opts: &CliOptions,
    ports: &[String],
    detail: bool,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;

    if !detail {
        let mut tw = TabWriter::new(stdout());
        counter_header(&mut tw)?;
        for port in sorted_ports(&all, &ids) {
            counter_row(&mut tw, &port.name, "in", &port.input)?;
            counter_row(&mut tw, "", "out", &port.output)?;
        }
        return tw.flush().map_err(|e| e.into());
    }

    // LLDP isn't essential to the counters, so carry on without it.
    let neighbors = match client.get_lldp_neighbors().await {
        Ok(n) => lldp_neighbor_names(&n),
        Err(e) => {
            warn!(opts.log, "failed to fetch LLDP neighbors"; "error" => %e);
            BTreeMap::new()
        }
    };
    for port in sorted_ports(&all, &ids) {
        println!("{} ({})", port.name, port.port_id);
        if let Some(n) = neighbors.get(&port.port_id) {
            println!("  LLDP neighbor: {n}");
        }
        let mut tw = TabWriter::new(stdout());
        counter_header(&mut tw)?;
        counter_row(&mut tw, &port.name, "in", &port.input)?;
        counter_row(&mut tw, "", "out", &port.output)?;
        tw.flush()?;
        println!();
    }
    Ok(())
}

async fn stats_clear(opts: &CliOptions, ports: &[String]) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    client
        .clear_port_stats(ids)
        .await
        .context("failed to clear port counters")
}

fn print_prbs_stats(name: &str, stats: &PrbsStats) -> anyhow::Result<()> {
    println!("{name} ({}):", stats.component);
    let mut tw = TabWriter::new(stdout());
    writeln!(
        tw,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        "Lane".underline(),
        "Locked".underline(),
        "BER".underline(),
        "Max BER".underline(),
        "Loss of Lock".underline(),
        "Since Locked".underline(),
        "Since Cleared".underline(),
    )?;
    for lane in &stats.lane_stats {
        writeln!(
            tw,
            "{}\t{}\t{:.3e}\t{:.3e}\t{}\t{}s\t{}s",
            lane.lane_id,
            if lane.locked { "yes" } else { "no" },
            lane.ber,
            lane.max_ber,
            lane.num_loss_of_lock,
            lane.time_since_last_locked,
            lane.time_since_last_clear,
        )?;
    }
    tw.flush()?;
    Ok(())
}

async fn prbs_op(
    opts: &CliOptions,
    component: PrbsComponent,
    op: PrbsOp,
) -> anyhow::Result<()> {
    let client = opts.agent_client()?;
    let ports = match &op {
        PrbsOp::Enable { ports, .. }
        | PrbsOp::Disable { ports }
        | PrbsOp::Stats { ports }
        | PrbsOp::Clear { ports } => ports,
    };
    let ids = utils::resolve_ports(client.as_ref(), ports).await?;
    let all = client
        .get_all_port_info()
        .await
        .context("failed to fetch port info")?;

    for id in ids {
        let name = port_name(&all, id);
        match &op {
            PrbsOp::Enable { polynomial, .. } => client
                .set_port_prbs(id, component, true, *polynomial)
                .await
                .with_context(|| format!("failed to enable PRBS on {name}"))?,
            PrbsOp::Disable { .. } => client
                .set_port_prbs(id, component, false, 0)
                .await
                .with_context(|| format!("failed to disable PRBS on {name}"))?,
            PrbsOp::Stats { .. } => {
                let stats = client
                    .get_port_prbs_stats(component, id)
                    .await
                    .with_context(|| {
                        format!("failed to fetch PRBS stats of {name}")
                    })?;
                print_prbs_stats(&name, &stats)?;
            }
            PrbsOp::Clear { .. } => client
                .clear_port_prbs_stats(component, id)
                .await
                .with_context(|| {
                    format!("failed to clear PRBS stats of {name}")
                })?,
        }
    }
    Ok(())
}

pub async fn port_cmd(opts: &CliOptions, cmd: Port) -> anyhow::Result<()> {
    match cmd {
        Port::Details { ports } => port_details(opts, &ports).await,
        Port::Description { ports } => port_description(opts, &ports).await,
        Port::State(PortState::Show { ports, all }) => {
            state_show(opts, &ports, all).await
        }
        Port::State(PortState::Enable { ports }) => {
            set_state(opts, &ports, true).await
        }
        Port::State(PortState::Disable { ports }) => {
            set_state(opts, &ports, false).await
        }
        Port::State(PortState::Flap { ports, all }) => {
            flap(opts, &ports, all).await
        }
        Port::State(PortState::SetLed { ports, on, off }) => {
            set_led(opts, &ports, on, off).await
        }
        Port::Transceiver(Transceiver::Show { ports }) => {
            transceiver_show(opts, &ports).await
        }
        Port::Stats(Stats::Show { ports, detail }) => {
            stats_show(opts, &ports, detail).await
        }
        Port::Stats(Stats::Clear { ports }) => stats_clear(opts, &ports).await,
        Port::Prbs(Prbs::Asic(op)) => {
            prbs_op(opts, PrbsComponent::Asic, op).await
        }
        Port::Prbs(Prbs::Gearbox(Gearbox::System(op))) => {
            prbs_op(opts, PrbsComponent::GbSystem, op).await
        }
        Port::Prbs(Prbs::Gearbox(Gearbox::Line(op))) => {
            prbs_op(opts, PrbsComponent::GbLine, op).await
        }
    }
}
