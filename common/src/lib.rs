// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Pieces shared by the FBOSS client, the `fboss` CLI and the link-test
//! harness.

pub mod logging;
pub mod network;

/// Default TCP port of the FBOSS agent's control service.
pub const DEFAULT_AGENT_PORT: u16 = 5909;

/// Default TCP port of the qsfp_service's control service.
pub const DEFAULT_QSFP_PORT: u16 = 5910;

/// Default per-call timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
