// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Records exchanged with the agent and the qsfp_service.
//!
//! Field names follow the service's camelCase spelling on the wire.

use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;

use common::network::ip_ntop;
use common::network::ip_octets;
use common::network::AddressError;

/// Error payload returned by the agent when it rejects a request.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FbossBaseError {
    pub message: String,
}

impl fmt::Display for FbossBaseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// An address in network byte order, optionally scoped to an interface.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryAddress {
    pub addr: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_name: Option<String>,
}

impl BinaryAddress {
    pub fn to_ip(&self) -> Result<IpAddr, AddressError> {
        ip_ntop(&self.addr)
    }

    pub fn is_v4(&self) -> bool {
        self.addr.len() == 4
    }

    pub fn is_v6(&self) -> bool {
        self.addr.len() == 16
    }

    /// `true` for the all-unset address the agent uses for "no address".
    pub fn is_empty(&self) -> bool {
        self.addr.is_empty()
    }
}

impl From<IpAddr> for BinaryAddress {
    fn from(ip: IpAddr) -> Self {
        BinaryAddress {
            addr: ip_octets(ip),
            if_name: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressType {
    #[default]
    V4,
    V6,
}

/// A textual address, used by the route lookup call.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Address {
    pub addr: String,
    #[serde(rename = "type")]
    pub kind: AddressType,
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address {
            addr: ip.to_string(),
            kind: match ip {
                IpAddr::V4(_) => AddressType::V4,
                IpAddr::V6(_) => AddressType::V6,
            },
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpPrefix {
    pub ip: BinaryAddress,
    pub prefix_length: i16,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MplsActionCode {
    Push,
    Swap,
    Php,
    PopAndLookup,
    #[default]
    Noop,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MplsAction {
    pub action: MplsActionCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_label: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_labels: Option<Vec<i32>>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextHopThrift {
    pub address: BinaryAddress,
    #[serde(default)]
    pub weight: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpls_action: Option<MplsAction>,
}

impl From<BinaryAddress> for NextHopThrift {
    fn from(address: BinaryAddress) -> Self {
        NextHopThrift {
            address,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnicastRoute {
    pub dest: IpPrefix,
    #[serde(default)]
    pub next_hop_addrs: Vec<BinaryAddress>,
    #[serde(default)]
    pub next_hops: Vec<NextHopThrift>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_distance: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAndNextHops {
    pub client_id: i32,
    #[serde(default)]
    pub next_hop_addrs: Vec<BinaryAddress>,
    #[serde(default)]
    pub next_hops: Vec<NextHopThrift>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IfAndIp {
    #[serde(rename = "interfaceID")]
    pub interface_id: i32,
    pub ip: BinaryAddress,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetails {
    pub dest: IpPrefix,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub fwd_info: Vec<IfAndIp>,
    #[serde(default)]
    pub next_hop_multi: Vec<ClientAndNextHops>,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub admin_distance: Option<i32>,
    #[serde(default)]
    pub next_hops: Vec<NextHopThrift>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortAdminState {
    #[default]
    Disabled,
    Enabled,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortOperState {
    #[default]
    Down,
    Up,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortCounters {
    pub bytes: i64,
    pub ucast_pkts: i64,
    pub multicast_pkts: i64,
    pub broadcast_pkts: i64,
    pub errors: i64,
    pub discards: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortInfoThrift {
    pub port_id: i32,
    pub name: String,
    pub description: String,
    pub speed_mbps: i64,
    pub vlans: Vec<i32>,
    pub admin_state: PortAdminState,
    pub oper_state: PortOperState,
    pub input: PortCounters,
    pub output: PortCounters,
    pub fec_enabled: bool,
    pub tx_pause: bool,
    pub rx_pause: bool,
    pub profile_id: String,
}

/// Which transceiver, and which of its lanes, a port is wired to.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransceiverIdThrift {
    pub transceiver_id: i32,
    pub channels: Vec<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortStatus {
    pub enabled: bool,
    pub up: bool,
    pub present: Option<bool>,
    pub speed_mbps: i32,
    pub transceiver_idx: Option<TransceiverIdThrift>,
    #[serde(rename = "profileID")]
    pub profile_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Vendor {
    pub name: String,
    pub part_number: String,
    pub rev: String,
    pub serial: String,
    pub date_code: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Sensor {
    pub value: f64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GlobalSensors {
    pub temp: Sensor,
    pub vcc: Sensor,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelSensors {
    pub rx_pwr: Sensor,
    pub tx_bias: Sensor,
    pub tx_pwr: Sensor,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Channel {
    pub channel: i32,
    pub sensors: ChannelSensors,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransceiverInfo {
    pub port: i32,
    pub present: bool,
    pub transceiver: Option<String>,
    pub vendor: Option<Vendor>,
    pub sensor: Option<GlobalSensors>,
    pub channels: Vec<Channel>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregatePortMemberThrift {
    #[serde(rename = "memberPortID")]
    pub member_port_id: i32,
    pub weight: i32,
    pub priority: i32,
    pub is_forwarding: bool,
    pub rate: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregatePortThrift {
    pub key: i32,
    pub name: String,
    pub description: String,
    pub minimum_link_count: i32,
    pub member_ports: Vec<AggregatePortMemberThrift>,
}

/// An ARP or NDP table entry.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NeighborEntryThrift {
    pub mac: String,
    pub port: i32,
    pub vlan_name: String,
    pub ip: BinaryAddress,
    #[serde(rename = "vlanID")]
    pub vlan_id: i32,
    pub state: String,
    pub ttl: i32,
    #[serde(rename = "classID")]
    pub class_id: i32,
}

pub type ArpEntryThrift = NeighborEntryThrift;
pub type NdpEntryThrift = NeighborEntryThrift;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum L2EntryType {
    L2EntryTypePending,
    L2EntryTypeValidated,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct L2EntryThrift {
    pub mac: String,
    pub port: i32,
    #[serde(rename = "vlanID")]
    pub vlan_id: i32,
    pub trunk: Option<i32>,
    pub l2_entry_type: Option<L2EntryType>,
    #[serde(rename = "classID")]
    pub class_id: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AclEntryThrift {
    pub priority: i32,
    pub name: String,
    pub src_ip: BinaryAddress,
    pub src_ip_prefix_length: i32,
    pub dst_ip: BinaryAddress,
    pub dst_ip_prefix_length: i32,
    pub proto: Option<i32>,
    pub src_port: Option<i32>,
    pub dst_port: Option<i32>,
    pub ip_frag: Option<i32>,
    pub icmp_type: Option<i32>,
    pub icmp_code: Option<i32>,
    pub dscp: Option<i32>,
    pub ip_type: Option<i32>,
    pub ttl: Option<i32>,
    pub l4_src_port: Option<i32>,
    pub l4_dst_port: Option<i32>,
    pub dst_mac: Option<String>,
    pub action_type: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterfaceDetail {
    pub interface_name: String,
    pub interface_id: i32,
    pub vlan_id: i32,
    pub router_id: i32,
    pub mtu: Option<i32>,
    pub mac: String,
    pub address: Vec<IpPrefix>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkNeighborThrift {
    pub local_port: i32,
    pub local_vlan: i32,
    pub src_mac: String,
    pub chassis_id: String,
    pub printable_chassis_id: String,
    pub port_id: String,
    pub printable_port_id: String,
    pub ttl: i32,
    pub system_name: Option<String>,
    pub system_description: Option<String>,
    pub port_description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductInfo {
    pub oem: String,
    pub product: String,
    pub serial: String,
    pub mgmt_mac: String,
    pub bmc_mac: String,
    pub mac_range_start: String,
    pub mac_range_size: i32,
    pub assembled_at: String,
    pub asset_tag: String,
    pub part_number: String,
    pub production_state: i32,
    pub sub_version: i32,
    pub product_version: i32,
    pub system_part_number: String,
    pub mfg_date: String,
    pub pcb_manufacturer: String,
    pub fb_pcba_part_number: String,
    pub fb_pcb_part_number: String,
    pub odm_pcba_part_number: String,
    pub odm_pcba_serial: String,
    pub version: i32,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PrbsComponent {
    Asic,
    GbSystem,
    GbLine,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrbsLaneStats {
    pub lane_id: i32,
    pub locked: bool,
    pub ber: f64,
    pub max_ber: f64,
    pub num_loss_of_lock: i32,
    pub time_since_last_locked: i64,
    pub time_since_last_clear: i64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrbsStats {
    pub port_id: i32,
    pub component: PrbsComponent,
    #[serde(default)]
    pub lane_stats: Vec<PrbsLaneStats>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortLedExternalState {
    None,
    ExternalForceOn,
    ExternalForceOff,
}

/// Kinds of objects the agent can dump from the hardware layer.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum HwObjectType {
    Port,
    Lag,
    VirtualRouter,
    NextHop,
    NextHopGroup,
    RouterInterface,
    CpuTrap,
    Hash,
    Mirror,
    QosMap,
    Queue,
    Scheduler,
    L2Entry,
    NeighborEntry,
    RouteEntry,
    Vlan,
    Bridge,
    Buffer,
    Acl,
    DebugCounter,
    LabelEntry,
    Macsec,
}
