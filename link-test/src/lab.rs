// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The physical topology of a lab switch: which of its interfaces are
//! cabled to a neighbor, and so are expected to come up.

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::Deserialize;

use crate::LinkTestError;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterfaceInfo {
    pub neighbor: String,
}

/// One port interface module of the switch.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PimInfo {
    pub interfaces: BTreeMap<String, InterfaceInfo>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LabConfig {
    pub pim_info: Vec<PimInfo>,
}

impl LabConfig {
    pub fn parse(path: &Utf8Path, doc: &str) -> Result<Self, LinkTestError> {
        serde_json::from_str(doc).map_err(|e| LinkTestError::LabConfig {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn load(path: &Utf8Path) -> Result<Self, LinkTestError> {
        let doc = tokio::fs::read_to_string(path).await.map_err(|e| {
            LinkTestError::LabConfig {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::parse(path, &doc)
    }

    /// Lower-cased names of the interfaces with a neighbor, in PIM order.
    pub fn expected_up_ports(&self) -> Vec<String> {
        self.pim_info
            .iter()
            .flat_map(|pim| pim.interfaces.iter())
            .filter(|(_, info)| !info.neighbor.is_empty())
            .map(|(name, _)| name.to_lowercase())
            .collect()
    }
}
