//! Topology metadata document.
//!
//! `topology-metadata.json` is what the dashboard, the scenario executor
//! and the capture pipeline read instead of the raw configuration. Every
//! router or link name it mentions is also a key of its `routers` or
//! `links` map.

use super::{GeneratorSession, MGMT_NETWORK};
use crate::error::GenerateError;
use crate::topology::Router;
use serde::Serialize;
use std::collections::BTreeMap;

/// Version of the metadata document layout
pub const METADATA_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Metadata Types
// ============================================================================

#[derive(Serialize, Debug)]
pub struct TopologyMetadata {
    pub schema_version: u32,
    /// Configuration schema version the lab was generated from
    pub config_version: u32,
    pub lab: LabMetadata,
    pub routers: BTreeMap<String, RouterMetadata>,
    pub links: BTreeMap<String, LinkMetadata>,
    pub prefix_owners: Vec<PrefixOwnerMetadata>,
    pub scenarios: BTreeMap<String, ScenarioMetadata>,
    pub services: Vec<String>,
    pub pcap_pipeline: PcapMetadata,
}

#[derive(Serialize, Debug)]
pub struct LabMetadata {
    pub name: String,
    pub description: String,
    pub router_image: String,
    pub mgmt_network: String,
    pub mgmt_subnet: String,
}

#[derive(Serialize, Debug)]
pub struct RouterMetadata {
    pub name: String,
    pub asn: u32,
    pub role: String,
    pub local_pref: u32,
    pub export_policy: String,
    pub router_id: String,
    pub mgmt_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopback: Option<String>,
    pub networks: Vec<String>,
    pub interfaces: Vec<InterfaceMetadata>,
    pub peers: Vec<PeerMetadata>,
}

#[derive(Serialize, Debug)]
pub struct InterfaceMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub network: String,
    /// Address with prefix length, e.g. "10.0.0.1/29"
    pub address: String,
}

#[derive(Serialize, Debug)]
pub struct PeerMetadata {
    pub neighbor: String,
    pub neighbor_asn: u32,
    pub link: String,
    pub local_address: String,
    pub neighbor_address: String,
}

#[derive(Serialize, Debug)]
pub struct LinkMetadata {
    pub name: String,
    pub subnet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    /// Attached router -> address on this link
    pub routers: BTreeMap<String, String>,
}

#[derive(Serialize, Debug)]
pub struct PrefixOwnerMetadata {
    pub prefix: String,
    pub origin: String,
    pub origin_asn: u32,
    pub scope: String,
}

#[derive(Serialize, Debug)]
pub struct ScenarioMetadata {
    pub description: String,
    pub entrypoint: String,
}

#[derive(Serialize, Debug)]
pub struct PcapMetadata {
    pub enabled: bool,
    pub shared_volume: String,
}

// ============================================================================
// Rendering
// ============================================================================

/// Build the metadata document.
pub fn build_metadata(session: &GeneratorSession) -> Result<TopologyMetadata, GenerateError> {
    let topology = session.topology();
    let plan = session.plan();

    let mut routers = BTreeMap::new();
    for router in topology.routers.values() {
        routers.insert(router.name.clone(), router_metadata(session, router)?);
    }

    let links = topology
        .links
        .values()
        .map(|link| {
            let attached = plan
                .for_link(&link.name)
                .map(|(router, address)| (router.to_string(), address.to_string()))
                .collect();
            (
                link.name.clone(),
                LinkMetadata {
                    name: link.name.clone(),
                    subnet: link.subnet.to_string(),
                    gateway: session.link_gateway(link).map(|ip| ip.to_string()),
                    routers: attached,
                },
            )
        })
        .collect();

    let prefix_owners = topology
        .prefix_owners
        .iter()
        .map(|owner| -> Result<PrefixOwnerMetadata, GenerateError> {
            let origin_asn = topology
                .routers
                .get(&owner.origin)
                .map(|router| router.asn)
                .ok_or_else(|| GenerateError::Render {
                    artifact: super::METADATA_FILE.to_string(),
                    message: format!("prefix {} has unknown origin '{}'", owner.prefix, owner.origin),
                })?;
            Ok(PrefixOwnerMetadata {
                prefix: owner.prefix.to_string(),
                origin: owner.origin.clone(),
                origin_asn,
                scope: owner.scope.as_str().to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scenarios = topology
        .scenarios
        .iter()
        .map(|scenario| {
            (
                scenario.key.clone(),
                ScenarioMetadata {
                    description: scenario.description.clone(),
                    entrypoint: scenario.kind.entrypoint().to_string(),
                },
            )
        })
        .collect();

    Ok(TopologyMetadata {
        schema_version: METADATA_SCHEMA_VERSION,
        config_version: topology.schema_version,
        lab: LabMetadata {
            name: topology.lab.name.clone(),
            description: topology.lab.description.clone(),
            router_image: topology.lab.router_image.clone(),
            mgmt_network: MGMT_NETWORK.to_string(),
            mgmt_subnet: session.mgmt_network().to_string(),
        },
        routers,
        links,
        prefix_owners,
        scenarios,
        services: topology.services.keys().cloned().collect(),
        pcap_pipeline: PcapMetadata {
            enabled: topology.pcap.enabled,
            shared_volume: topology.pcap.shared_volume.clone(),
        },
    })
}

/// Render `topology-metadata.json`, newline terminated.
pub fn render_metadata(session: &GeneratorSession) -> Result<String, GenerateError> {
    let metadata = build_metadata(session)?;
    let mut json = serde_json::to_string_pretty(&metadata).map_err(|e| GenerateError::Render {
        artifact: super::METADATA_FILE.to_string(),
        message: e.to_string(),
    })?;
    json.push('\n');
    Ok(json)
}

fn router_metadata(session: &GeneratorSession, router: &Router) -> Result<RouterMetadata, GenerateError> {
    let role = session
        .topology()
        .role_of(router)
        .ok_or_else(|| GenerateError::Render {
            artifact: super::METADATA_FILE.to_string(),
            message: format!("router '{}' has unknown role '{}'", router.name, router.role),
        })?;

    let interfaces = session
        .interfaces(router)
        .into_iter()
        .map(|interface| InterfaceMetadata {
            address: interface.cidr(),
            name: interface.name,
            link: interface.link,
            network: interface.network,
        })
        .collect();

    let peers = session
        .peer_sessions(router)?
        .into_iter()
        .map(|peer| PeerMetadata {
            neighbor: peer.neighbor,
            neighbor_asn: peer.neighbor_asn,
            link: peer.link,
            local_address: peer.local_address.to_string(),
            neighbor_address: peer.remote_address.to_string(),
        })
        .collect();

    Ok(RouterMetadata {
        name: router.name.clone(),
        asn: router.asn,
        role: role.name.clone(),
        local_pref: role.local_pref,
        export_policy: role.export_policy.clone(),
        router_id: router.router_id.to_string(),
        mgmt_ip: router.mgmt_ip.to_string(),
        loopback: router.loopback.map(|net| net.to_string()),
        networks: router.networks.iter().map(|net| net.to_string()).collect(),
        interfaces,
        peers,
    })
}
