// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use anyhow::Context;
use structopt::*;

use fboss_client::types::ProductInfo;

use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "show product information")]
pub struct Product {
    /// Display detailed product information.
    #[structopt(short, long)]
    detail: bool,
}

fn product_lines(p: &ProductInfo, detail: bool) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Product", p.product.clone()),
        ("OEM", p.oem.clone()),
        ("Serial", p.serial.clone()),
    ];
    if detail {
        lines.extend([
            ("Management MAC Address", p.mgmt_mac.clone()),
            ("BMC MAC Address", p.bmc_mac.clone()),
            ("Extended MAC Start", p.mac_range_start.clone()),
            ("Extended MAC Size", p.mac_range_size.to_string()),
            ("Assembled At", p.assembled_at.clone()),
            ("Product Asset Tag", p.asset_tag.clone()),
            ("Product Part Number", p.part_number.clone()),
            ("Product Production State", p.production_state.to_string()),
            ("Product Sub-Version", p.sub_version.to_string()),
            ("Product Version", p.product_version.to_string()),
            ("System Assembly Part Number", p.system_part_number.clone()),
            ("System Manufacturing Date", p.mfg_date.clone()),
            ("PCB Manufacturer", p.pcb_manufacturer.clone()),
            ("Facebook PCBA Part Number", p.fb_pcba_part_number.clone()),
            ("Facebook PCB Part Number", p.fb_pcb_part_number.clone()),
            ("ODM PCBA Part Number", p.odm_pcba_part_number.clone()),
            ("ODM PCBA Serial Number", p.odm_pcba_serial.clone()),
            ("Version", p.version.to_string()),
        ]);
    }
    lines
}

pub async fn product_cmd(opts: &CliOptions, cmd: Product) -> anyhow::Result<()> {
    let info = opts
        .agent_client()?
        .get_product_info()
        .await
        .context("failed to fetch product info")?;
    for (label, value) in product_lines(&info, cmd.detail) {
        println!("{label}: {value}");
    }
    Ok(())
}
