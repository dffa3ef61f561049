// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use anyhow::Context;
use structopt::*;

use common::network::ip_ntop;
use common::network::AddressError;
use fboss_client::types::AclEntryThrift;

use crate::CliOptions;

const IPPROTO_TCP: i32 = 6;
const IPPROTO_UDP: i32 = 17;

#[derive(Debug, StructOpt)]
#[structopt(about = "show ACL information")]
pub enum Acl {
    #[structopt(about = "show the ACL table")]
    Table,
}

fn proto_name(proto: i32) -> String {
    match proto {
        IPPROTO_TCP => String::from("tcp"),
        IPPROTO_UDP => String::from("udp"),
        p => p.to_string(),
    }
}

// The lines describing one entry. Unset and zero-valued matchers are left
// out.
fn acl_lines(entry: &AclEntryThrift) -> Result<Vec<String>, AddressError> {
    let mut lines = vec![
        format!("Acl: {}", entry.name),
        format!("   priority: {}", entry.priority),
    ];
    if !entry.src_ip.is_empty() {
        lines.push(format!(
            "   src ip: {}/{}",
            ip_ntop(&entry.src_ip.addr)?,
            entry.src_ip_prefix_length
        ));
    }
    if !entry.dst_ip.is_empty() {
        lines.push(format!(
            "   dst ip: {}/{}",
            ip_ntop(&entry.dst_ip.addr)?,
            entry.dst_ip_prefix_length
        ));
    }
    let set = |v: Option<i32>| v.filter(|v| *v != 0);
    if let Some(proto) = set(entry.proto) {
        lines.push(format!("   proto: {proto}({})", proto_name(proto)));
    }
    let fields = [
        ("src port", entry.src_port),
        ("dst port", entry.dst_port),
        ("ip fragment", entry.ip_frag),
        ("dscp", entry.dscp),
        ("ip type", entry.ip_type),
        ("icmp type", entry.icmp_type),
        ("icmp code", entry.icmp_code),
        ("ttl", entry.ttl),
        ("L4 src port", entry.l4_src_port),
        ("L4 dst port", entry.l4_dst_port),
    ];
    for (label, value) in fields {
        if let Some(v) = set(value) {
            lines.push(format!("   {label}: {v}"));
        }
    }
    if let Some(mac) = entry.dst_mac.as_ref().filter(|m| !m.is_empty()) {
        lines.push(format!("   dst mac: {mac}"));
    }
    lines.push(format!("   action: {}", entry.action_type));
    Ok(lines)
}

pub async fn acl_cmd(opts: &CliOptions, cmd: Acl) -> anyhow::Result<()> {
    match cmd {
        Acl::Table => {
            let mut entries = opts
                .agent_client()?
                .get_acl_table()
                .await
                .context("failed to fetch ACL table")?;
            if entries.is_empty() {
                println!("No Acl Entries Found");
                return Ok(());
            }
            entries.sort_by_key(|e| e.priority);
            for entry in &entries {
                for line in acl_lines(entry)? {
                    println!("{line}");
                }
                println!();
            }
            Ok(())
        }
    }
}
