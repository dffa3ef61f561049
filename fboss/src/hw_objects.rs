// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use anyhow::Context;
use structopt::*;
use strum::IntoEnumIterator;

use fboss_client::types::HwObjectType;

use crate::CliOptions;

#[derive(Debug, StructOpt)]
#[structopt(about = "list objects programmed into the hardware")]
pub enum ListHwObjects {
    #[structopt(about = "dump hardware objects")]
    List {
        /// Object types to dump, e.g. ROUTE_ENTRY. May be repeated; all types
        /// are dumped when none are given.
        #[structopt(short = "o", long = "hw-object", number_of_values = 1)]
        hw_objects: Vec<HwObjectType>,
        /// Use the objects cached by the agent rather than reading them
        /// back from the hardware.
        #[structopt(short, long)]
        cached: bool,
    },
}

fn selected_types(types: Vec<HwObjectType>) -> Vec<HwObjectType> {
    if types.is_empty() {
        HwObjectType::iter().collect()
    } else {
        types
    }
}

pub async fn hw_objects_cmd(
    opts: &CliOptions,
    cmd: ListHwObjects,
) -> anyhow::Result<()> {
    let ListHwObjects::List { hw_objects, cached } = cmd;
    let dump = opts
        .agent_client()?
        .list_hw_objects(selected_types(hw_objects), cached)
        .await
        .context("failed to list hardware objects")?;
    println!("{dump}");
    Ok(())
}
