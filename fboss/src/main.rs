// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use display_error_chain::DisplayErrorChain;
use slog::Logger;
use structopt::clap::AppSettings;
use structopt::*;

use fboss_client::AgentClient;
use fboss_client::ClientState;
use fboss_client::FbossCtrl;
use fboss_client::HttpTransport;
use fboss_client::QsfpClient;
use fboss_client::QsfpService;
use fboss_client::SnapshotTransport;

mod acl;
mod agent;
mod aggregate_port;
mod arp;
mod hw_objects;
mod interface;
mod l2;
mod lldp;
mod nic;
mod port;
mod product;
mod route;
mod utils;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "fboss",
    about = "provides a command-line interface to the FBOSS agent",
    global_settings = &[AppSettings::VersionlessSubcommands]
)]
struct GlobalOpts {
    #[structopt(
        short = "H",
        long,
        default_value = "::1",
        help = "switch's hostname or IP address"
    )]
    hostname: String,

    #[structopt(short = "F", long, help = "snapshot file to read from")]
    file: Option<PathBuf>,

    #[structopt(short, long, help = "agent's TCP port")]
    port: Option<u16>,

    #[structopt(long, help = "qsfp_service's TCP port")]
    qsfp_port: Option<u16>,

    #[structopt(short, long, help = "client timeout in seconds")]
    timeout: Option<u64>,

    #[structopt(long, help = "log client activity to stderr")]
    debug: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    Arp(arp::Arp),
    #[structopt(name = "aggregate-port", visible_alias = "aggregate_port")]
    AggregatePort(aggregate_port::AggregatePort),
    Ip(interface::Ip),
    Interface(interface::Interface),
    L2(l2::L2),
    #[structopt(name = "list-hw-objects", visible_alias = "list_hw_objects")]
    ListHwObjects(hw_objects::ListHwObjects),
    Lldp(lldp::Lldp),
    Ndp(arp::Ndp),
    Nic(nic::Nic),
    Port(port::Port),
    Product(product::Product),
    Route(route::Route),
    /// Change the verbosity of the agent's logging.
    Verbosity {
        /// The new verbosity level.
        level: String,
    },
    Agent(agent::Agent),
    Acl(acl::Acl),
}

/// Connection parameters shared by every command. Read-only once built.
#[derive(Debug)]
pub struct CliOptions {
    pub host: String,
    pub snapshot: Option<PathBuf>,
    pub port: u16,
    pub qsfp_port: u16,
    pub timeout: Duration,
    /// Highlight up/down state in output.
    pub colors: bool,
    pub log: Logger,
}

impl CliOptions {
    fn client_state(&self, tag: &str) -> ClientState {
        ClientState {
            tag: String::from(tag),
            log: self.log.new(slog::o!("client" => tag.to_string())),
        }
    }

    fn snapshot(&self) -> anyhow::Result<Option<SnapshotTransport>> {
        self.snapshot
            .as_ref()
            .map(|path| {
                SnapshotTransport::load(path).context("failed to load snapshot")
            })
            .transpose()
    }

    /// Open a client for the agent.
    pub fn agent_client(&self) -> anyhow::Result<Box<dyn FbossCtrl>> {
        let state = self.client_state("agent");
        Ok(match self.snapshot()? {
            Some(snapshot) => Box::new(AgentClient::new(snapshot, state)),
            None => Box::new(AgentClient::new(
                HttpTransport::new(&self.host, self.port, self.timeout)?,
                state,
            )),
        })
    }

    /// Open a client for the qsfp_service.
    pub fn qsfp_client(&self) -> anyhow::Result<Box<dyn QsfpService>> {
        let state = self.client_state("qsfp");
        Ok(match self.snapshot()? {
            Some(snapshot) => Box::new(QsfpClient::new(snapshot, state)),
            None => Box::new(QsfpClient::new(
                HttpTransport::new(&self.host, self.qsfp_port, self.timeout)?,
                state,
            )),
        })
    }
}

// The one-line message printed when a command fails.
fn exit_message(err: &anyhow::Error) -> String {
    let rpc = err
        .chain()
        .find_map(|e| e.downcast_ref::<fboss_client::Error>());
    match rpc {
        Some(fboss_client::Error::Fboss(e)) => format!("Fboss Error: {e}"),
        Some(fboss_client::Error::Unsupported(_)) => {
            String::from("Command not available on host")
        }
        Some(fboss_client::Error::Transport(_)) => {
            String::from("Failed connecting to host")
        }
        _ => {
            let err: &(dyn std::error::Error + 'static) = err.as_ref();
            DisplayErrorChain::new(err).to_string()
        }
    }
}

async fn run(opts: &CliOptions, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Arp(a) => arp::arp_cmd(opts, a).await,
        Commands::AggregatePort(a) => {
            aggregate_port::aggregate_port_cmd(opts, a).await
        }
        Commands::Ip(i) => interface::ip_cmd(opts, i).await,
        Commands::Interface(i) => interface::interface_cmd(opts, i).await,
        Commands::L2(l) => l2::l2_cmd(opts, l).await,
        Commands::ListHwObjects(h) => hw_objects::hw_objects_cmd(opts, h).await,
        Commands::Lldp(l) => lldp::lldp_cmd(opts, l).await,
        Commands::Ndp(n) => arp::ndp_cmd(opts, n).await,
        Commands::Nic(n) => nic::nic_cmd(opts, n).await,
        Commands::Port(p) => port::port_cmd(opts, p).await,
        Commands::Product(p) => product::product_cmd(opts, p).await,
        Commands::Route(r) => route::route_cmd(opts, r).await,
        Commands::Verbosity { level } => agent::verbosity(opts, level).await,
        Commands::Agent(a) => agent::agent_cmd(opts, a).await,
        Commands::Acl(a) => acl::acl_cmd(opts, a).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opts = GlobalOpts::from_args();
    let log = if opts.debug {
        common::logging::init_stderr("fboss")
    } else {
        Logger::root(slog::Discard, slog::o!())
    };
    let colors = std::io::stdout().is_terminal();
    colored::control::set_override(colors);

    let cli = CliOptions {
        host: opts.hostname,
        snapshot: opts.file,
        port: opts.port.unwrap_or(fboss_client::DEFAULT_AGENT_PORT),
        qsfp_port: opts.qsfp_port.unwrap_or(fboss_client::DEFAULT_QSFP_PORT),
        timeout: Duration::from_secs(
            opts.timeout.unwrap_or(common::DEFAULT_TIMEOUT_SECS),
        ),
        colors,
        log,
    };

    if let Err(e) = run(&cli, opts.cmd).await {
        slog::debug!(cli.log, "command failed"; "error" => ?e);
        eprintln!("{}", exit_message(&e));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use fboss_client::types::FbossBaseError;
    use fboss_client::Error;

    use super::exit_message;
    use crate::utils::TopologyError;

    #[test]
    fn test_exit_messages() {
        let e = anyhow::Error::new(Error::Fboss(FbossBaseError {
            message: String::from("Invalid route"),
        }))
        .context("failed to add route");
        assert_eq!(exit_message(&e), "Fboss Error: Invalid route");

        let e = anyhow::Error::new(Error::Unsupported(String::from("x")));
        assert_eq!(exit_message(&e), "Command not available on host");

        let e = Err::<(), _>(TopologyError::from(Error::Transport(
            String::from("refused"),
        )))
        .context("building VLAN map");
        assert_eq!(exit_message(&e.unwrap_err()), "Failed connecting to host");

        let e = anyhow::Error::new(TopologyError::NoRootPort {
            port: String::from("po1"),
        });
        assert!(exit_message(&e).contains("po1"));
    }
}
