// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Client library for the FBOSS agent and qsfp_service control interfaces.
//!
//! The two services are described by the [`FbossCtrl`] and [`QsfpService`]
//! traits. [`AgentClient`] and [`QsfpClient`] implement them on top of a
//! [`Transport`], which is either a live connection to the switch
//! ([`HttpTransport`]) or a captured snapshot of its state
//! ([`SnapshotTransport`]).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use slog::Logger;

pub mod retry;
pub mod transport;
pub mod types;

pub use common::DEFAULT_AGENT_PORT;
pub use common::DEFAULT_QSFP_PORT;
pub use retry::RetryPolicy;
pub use transport::HttpTransport;
pub use transport::SnapshotTransport;
pub use transport::Transport;

use types::*;

/// State maintained by a client.
#[derive(Clone, Debug)]
pub struct ClientState {
    /// An arbitrary tag used to identify a client in log records.
    pub tag: String,
    /// Used for logging requests and responses.
    pub log: Logger,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service received the request and rejected it.
    #[error("{0}")]
    Fboss(FbossBaseError),
    /// The operation isn't offered by this build of the service.
    #[error("{0} is not available on this host")]
    Unsupported(String),
    /// The service couldn't be reached, or didn't answer in time.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response to {method}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Operations offered by the switch agent.
///
/// A port list argument that is empty means "all ports".
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait FbossCtrl: Send + Sync {
    async fn get_all_port_info(&self) -> Result<BTreeMap<i32, PortInfoThrift>>;
    async fn get_port_info(&self, port_id: i32) -> Result<PortInfoThrift>;
    async fn get_port_status(
        &self,
        ports: Vec<i32>,
    ) -> Result<BTreeMap<i32, PortStatus>>;
    async fn set_port_state(&self, port_id: i32, enable: bool) -> Result<()>;
    async fn set_port_led_external_state(
        &self,
        port_id: i32,
        state: PortLedExternalState,
    ) -> Result<()>;
    async fn clear_port_stats(&self, ports: Vec<i32>) -> Result<()>;
    async fn get_aggregate_port_table(&self)
        -> Result<Vec<AggregatePortThrift>>;

    async fn get_route_table(&self) -> Result<Vec<UnicastRoute>>;
    async fn get_route_table_by_client(
        &self,
        client_id: i16,
    ) -> Result<Vec<UnicastRoute>>;
    async fn get_route_table_details(&self) -> Result<Vec<RouteDetails>>;
    async fn get_ip_route_details(
        &self,
        addr: Address,
        vrf_id: i32,
    ) -> Result<RouteDetails>;
    async fn add_unicast_routes(
        &self,
        client_id: i16,
        routes: Vec<UnicastRoute>,
    ) -> Result<()>;
    async fn delete_unicast_routes(
        &self,
        client_id: i16,
        prefixes: Vec<IpPrefix>,
    ) -> Result<()>;
    async fn sync_fib(
        &self,
        client_id: i16,
        routes: Vec<UnicastRoute>,
    ) -> Result<()>;

    async fn get_arp_table(&self) -> Result<Vec<ArpEntryThrift>>;
    async fn get_ndp_table(&self) -> Result<Vec<NdpEntryThrift>>;
    /// Returns the number of entries flushed.
    async fn flush_neighbor_entry(
        &self,
        ip: BinaryAddress,
        vlan_id: i32,
    ) -> Result<i32>;
    async fn get_l2_table(&self) -> Result<Vec<L2EntryThrift>>;
    async fn get_acl_table(&self) -> Result<Vec<AclEntryThrift>>;

    async fn get_all_interfaces(
        &self,
    ) -> Result<BTreeMap<i32, InterfaceDetail>>;
    async fn get_interface_detail(
        &self,
        interface_id: i32,
    ) -> Result<InterfaceDetail>;
    async fn get_lldp_neighbors(&self) -> Result<Vec<LinkNeighborThrift>>;
    async fn get_product_info(&self) -> Result<ProductInfo>;

    async fn get_selected_counters(
        &self,
        keys: Vec<String>,
    ) -> Result<BTreeMap<String, i64>>;
    async fn get_regex_exported_values(
        &self,
        regex: String,
    ) -> Result<BTreeMap<String, String>>;
    async fn set_option(&self, name: String, value: String) -> Result<()>;
    async fn get_running_config(&self) -> Result<String>;
    async fn reload_config(&self) -> Result<()>;
    async fn list_hw_objects(
        &self,
        object_types: Vec<HwObjectType>,
        cached: bool,
    ) -> Result<String>;

    async fn set_port_prbs(
        &self,
        port_id: i32,
        component: PrbsComponent,
        enable: bool,
        polynomial: i32,
    ) -> Result<()>;
    async fn get_port_prbs_stats(
        &self,
        component: PrbsComponent,
        port_id: i32,
    ) -> Result<PrbsStats>;
    async fn clear_port_prbs_stats(
        &self,
        component: PrbsComponent,
        port_id: i32,
    ) -> Result<()>;
}

/// Operations offered by the qsfp_service.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait QsfpService: Send + Sync {
    /// Fetch transceiver data, keyed by transceiver id. An empty id list
    /// means "all transceivers".
    async fn get_transceiver_info(
        &self,
        ids: Vec<i32>,
    ) -> Result<BTreeMap<i32, TransceiverInfo>>;
    async fn get_regex_exported_values(
        &self,
        regex: String,
    ) -> Result<BTreeMap<String, String>>;
}

// Issue a call and decode its response. Mutations answer with `null`,
// which decodes as `()`.
async fn call<T: Transport, R: DeserializeOwned>(
    transport: &T,
    state: &ClientState,
    method: &str,
    args: serde_json::Value,
) -> Result<R> {
    slog::trace!(state.log, "client request";
        "client" => &state.tag,
        "method" => method,
        "args" => %args,
    );
    let result = transport.call(method, args).await;
    slog::trace!(state.log, "client response";
        "client" => &state.tag,
        "method" => method,
        "result" => ?result,
    );
    serde_json::from_value(result?).map_err(|source| Error::Decode {
        method: method.to_string(),
        source,
    })
}

/// A client for the switch agent.
#[derive(Debug)]
pub struct AgentClient<T: Transport> {
    transport: T,
    state: ClientState,
}

impl<T: Transport> AgentClient<T> {
    pub fn new(transport: T, state: ClientState) -> Self {
        AgentClient { transport, state }
    }

    pub fn inner(&self) -> &ClientState {
        &self.state
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<R> {
        call(&self.transport, &self.state, method, args).await
    }
}

#[async_trait]
impl<T: Transport> FbossCtrl for AgentClient<T> {
    async fn get_all_port_info(&self) -> Result<BTreeMap<i32, PortInfoThrift>> {
        self.call("getAllPortInfo", json!({})).await
    }

    async fn get_port_info(&self, port_id: i32) -> Result<PortInfoThrift> {
        self.call("getPortInfo", json!({ "portId": port_id })).await
    }

    async fn get_port_status(
        &self,
        ports: Vec<i32>,
    ) -> Result<BTreeMap<i32, PortStatus>> {
        self.call("getPortStatus", json!({ "ports": ports })).await
    }

    async fn set_port_state(&self, port_id: i32, enable: bool) -> Result<()> {
        self.call("setPortState", json!({ "portId": port_id, "enable": enable }))
            .await
    }

    async fn set_port_led_external_state(
        &self,
        port_id: i32,
        state: PortLedExternalState,
    ) -> Result<()> {
        self.call(
            "setPortLedExternalState",
            json!({ "portId": port_id, "ledState": state }),
        )
        .await
    }

    async fn clear_port_stats(&self, ports: Vec<i32>) -> Result<()> {
        self.call("clearPortStats", json!({ "ports": ports })).await
    }

    async fn get_aggregate_port_table(
        &self,
    ) -> Result<Vec<AggregatePortThrift>> {
        self.call("getAggregatePortTable", json!({})).await
    }

    async fn get_route_table(&self) -> Result<Vec<UnicastRoute>> {
        self.call("getRouteTable", json!({})).await
    }

    async fn get_route_table_by_client(
        &self,
        client_id: i16,
    ) -> Result<Vec<UnicastRoute>> {
        self.call("getRouteTableByClient", json!({ "clientId": client_id }))
            .await
    }

    async fn get_route_table_details(&self) -> Result<Vec<RouteDetails>> {
        self.call("getRouteTableDetails", json!({})).await
    }

    async fn get_ip_route_details(
        &self,
        addr: Address,
        vrf_id: i32,
    ) -> Result<RouteDetails> {
        self.call("getIpRouteDetails", json!({ "addr": addr, "vrfId": vrf_id }))
            .await
    }

    async fn add_unicast_routes(
        &self,
        client_id: i16,
        routes: Vec<UnicastRoute>,
    ) -> Result<()> {
        self.call(
            "addUnicastRoutes",
            json!({ "clientId": client_id, "routes": routes }),
        )
        .await
    }

    async fn delete_unicast_routes(
        &self,
        client_id: i16,
        prefixes: Vec<IpPrefix>,
    ) -> Result<()> {
        self.call(
            "deleteUnicastRoutes",
            json!({ "clientId": client_id, "prefixes": prefixes }),
        )
        .await
    }

    async fn sync_fib(
        &self,
        client_id: i16,
        routes: Vec<UnicastRoute>,
    ) -> Result<()> {
        self.call("syncFib", json!({ "clientId": client_id, "routes": routes }))
            .await
    }

    async fn get_arp_table(&self) -> Result<Vec<ArpEntryThrift>> {
        self.call("getArpTable", json!({})).await
    }

    async fn get_ndp_table(&self) -> Result<Vec<NdpEntryThrift>> {
        self.call("getNdpTable", json!({})).await
    }

    async fn flush_neighbor_entry(
        &self,
        ip: BinaryAddress,
        vlan_id: i32,
    ) -> Result<i32> {
        self.call("flushNeighborEntry", json!({ "ip": ip, "vlanId": vlan_id }))
            .await
    }

    async fn get_l2_table(&self) -> Result<Vec<L2EntryThrift>> {
        self.call("getL2Table", json!({})).await
    }

    async fn get_acl_table(&self) -> Result<Vec<AclEntryThrift>> {
        self.call("getAclTable", json!({})).await
    }

    async fn get_all_interfaces(
        &self,
    ) -> Result<BTreeMap<i32, InterfaceDetail>> {
        self.call("getAllInterfaces", json!({})).await
    }

    async fn get_interface_detail(
        &self,
        interface_id: i32,
    ) -> Result<InterfaceDetail> {
        self.call(
            "getInterfaceDetail",
            json!({ "interfaceId": interface_id }),
        )
        .await
    }

    async fn get_lldp_neighbors(&self) -> Result<Vec<LinkNeighborThrift>> {
        self.call("getLldpNeighbors", json!({})).await
    }

    async fn get_product_info(&self) -> Result<ProductInfo> {
        self.call("getProductInfo", json!({})).await
    }

    async fn get_selected_counters(
        &self,
        keys: Vec<String>,
    ) -> Result<BTreeMap<String, i64>> {
        self.call("getSelectedCounters", json!({ "keys": keys })).await
    }

    async fn get_regex_exported_values(
        &self,
        regex: String,
    ) -> Result<BTreeMap<String, String>> {
        self.call("getRegexExportedValues", json!({ "regex": regex }))
            .await
    }

    async fn set_option(&self, name: String, value: String) -> Result<()> {
        self.call("setOption", json!({ "name": name, "value": value }))
            .await
    }

    async fn get_running_config(&self) -> Result<String> {
        self.call("getRunningConfig", json!({})).await
    }

    async fn reload_config(&self) -> Result<()> {
        self.call("reloadConfig", json!({})).await
    }

    async fn list_hw_objects(
        &self,
        object_types: Vec<HwObjectType>,
        cached: bool,
    ) -> Result<String> {
        self.call(
            "listHwObjects",
            json!({ "hwObjectTypes": object_types, "cached": cached }),
        )
        .await
    }

    async fn set_port_prbs(
        &self,
        port_id: i32,
        component: PrbsComponent,
        enable: bool,
        polynomial: i32,
    ) -> Result<()> {
        self.call(
            "setPortPrbs",
            json!({
                "portId": port_id,
                "component": component,
                "enable": enable,
                "polynominal": polynomial,
            }),
        )
        .await
    }

    async fn get_port_prbs_stats(
        &self,
        component: PrbsComponent,
        port_id: i32,
    ) -> Result<PrbsStats> {
        self.call(
            "getPortPrbsStats",
            json!({ "component": component, "portId": port_id }),
        )
        .await
    }

    async fn clear_port_prbs_stats(
        &self,
        component: PrbsComponent,
        port_id: i32,
    ) -> Result<()> {
        self.call(
            "clearPortPrbsStats",
            json!({ "component": component, "portId": port_id }),
        )
        .await
    }
}

/// A client for the qsfp_service.
#[derive(Debug)]
pub struct QsfpClient<T: Transport> {
    transport: T,
    state: ClientState,
}

impl<T: Transport> QsfpClient<T> {
    pub fn new(transport: T, state: ClientState) -> Self {
        QsfpClient { transport, state }
    }

    pub fn inner(&self) -> &ClientState {
        &self.state
    }
}

#[async_trait]
impl<T: Transport> QsfpService for QsfpClient<T> {
    async fn get_transceiver_info(
        &self,
        ids: Vec<i32>,
    ) -> Result<BTreeMap<i32, TransceiverInfo>> {
        call(
            &self.transport,
            &self.state,
            "getTransceiverInfo",
            json!({ "ids": ids }),
        )
        .await
    }

    async fn get_regex_exported_values(
        &self,
        regex: String,
    ) -> Result<BTreeMap<String, String>> {
        call(
            &self.transport,
            &self.state,
            "getRegexExportedValues",
            json!({ "regex": regex }),
        )
        .await
    }
}
