//! Docker Compose document.
//!
//! The compose file is built as plain serde structures and serialized with
//! `serde_yaml`. Maps are `BTreeMap`s so services, networks and keys come
//! out in name order.

use super::{GeneratorSession, FRR_DIR, MGMT_NETWORK};
use crate::error::GenerateError;
use crate::topology::{PlatformService, Router};
use serde::Serialize;
use std::collections::BTreeMap;

/// Mount point of the shared capture volume inside containers
pub const STATE_MOUNT: &str = "/lab/state";

/// Capabilities routers need to configure interfaces and capture traffic
const ROUTER_CAPABILITIES: [&str; 3] = ["NET_ADMIN", "NET_RAW", "SYS_ADMIN"];

/// Attachment priority step between consecutive interfaces
const PRIORITY_STEP: u32 = 10;

// ============================================================================
// Compose Types
// ============================================================================

#[derive(Serialize, Debug)]
pub struct ComposeFile {
    /// Compose project name
    pub name: String,
    pub services: BTreeMap<String, ComposeService>,
    pub networks: BTreeMap<String, ComposeNetwork>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, ComposeVolume>,
}

#[derive(Serialize, Debug, Default)]
pub struct ComposeService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctls: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub networks: BTreeMap<String, ServiceNetwork>,
}

/// Attachment of a service to one network
#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct ServiceNetwork {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    /// Higher priority attaches first and becomes the lower `ethN`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

#[derive(Serialize, Debug)]
pub struct ComposeNetwork {
    pub driver: String,
    pub ipam: Ipam,
}

#[derive(Serialize, Debug)]
pub struct Ipam {
    pub config: Vec<IpamPool>,
}

#[derive(Serialize, Debug)]
pub struct IpamPool {
    pub subnet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

#[derive(Serialize, Debug, Default)]
pub struct ComposeVolume {}

// ============================================================================
// Rendering
// ============================================================================

/// Build the compose document for the whole lab.
pub fn build_compose(session: &GeneratorSession) -> ComposeFile {
    let topology = session.topology();
    let pcap = &topology.pcap;
    let state_volume = format!("{}:{}", pcap.shared_volume, STATE_MOUNT);

    let mut services = BTreeMap::new();
    for router in topology.routers.values() {
        let mut service = router_service(session, router);
        if pcap.enabled {
            service.volumes.push(state_volume.clone());
        }
        services.insert(router.name.clone(), service);
    }
    for platform in topology.services.values() {
        let mut service = platform_service(platform);
        if platform.mount_state {
            service.volumes.push(state_volume.clone());
        }
        services.insert(platform.name.clone(), service);
    }

    let mut networks = BTreeMap::new();
    for link in topology.links.values() {
        networks.insert(
            link.name.clone(),
            bridge_network(link.subnet.to_string(), session.link_gateway(link)),
        );
    }
    networks.insert(
        MGMT_NETWORK.to_string(),
        bridge_network(session.mgmt_network().to_string(), session.mgmt_gateway()),
    );

    let mut volumes = BTreeMap::new();
    if pcap.enabled || topology.services.values().any(|s| s.mount_state) {
        volumes.insert(pcap.shared_volume.clone(), ComposeVolume::default());
    }

    ComposeFile {
        name: project_name(&topology.lab.name),
        services,
        networks,
        volumes,
    }
}

/// Render `docker-compose.yml`.
pub fn render_compose(session: &GeneratorSession) -> Result<String, GenerateError> {
    let compose = build_compose(session);
    serde_yaml::to_string(&compose).map_err(|e| GenerateError::Render {
        artifact: super::COMPOSE_FILE.to_string(),
        message: e.to_string(),
    })
}

fn router_service(session: &GeneratorSession, router: &Router) -> ComposeService {
    let topology = session.topology();
    let interfaces = session.interfaces(router);
    let count = interfaces.len() as u32;

    let networks = interfaces
        .iter()
        .enumerate()
        .map(|(index, interface)| {
            (
                interface.network.clone(),
                ServiceNetwork {
                    ipv4_address: Some(interface.address.to_string()),
                    priority: Some((count - index as u32) * PRIORITY_STEP),
                },
            )
        })
        .collect();

    let mut environment = BTreeMap::new();
    environment.insert("ASN".to_string(), router.asn.to_string());
    environment.insert("ROLE".to_string(), router.role.clone());

    let mut sysctls = BTreeMap::new();
    sysctls.insert("net.ipv4.ip_forward".to_string(), "1".to_string());
    sysctls.insert("net.ipv6.conf.all.disable_ipv6".to_string(), "1".to_string());

    // Directory holding frr.conf and daemons
    let frr_dir = format!("{}/{}", FRR_DIR, router.name);

    ComposeService {
        image: Some(topology.lab.router_image.clone()),
        container_name: Some(router.name.clone()),
        hostname: Some(router.name.clone()),
        cap_add: ROUTER_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
        sysctls,
        environment,
        volumes: vec![format!("./{}:/etc/frr", frr_dir)],
        networks,
        ..Default::default()
    }
}

fn platform_service(platform: &PlatformService) -> ComposeService {
    let mut networks = BTreeMap::new();
    networks.insert(MGMT_NETWORK.to_string(), ServiceNetwork::default());

    ComposeService {
        image: platform.image.clone(),
        build: platform.build.clone(),
        container_name: Some(platform.name.clone()),
        environment: platform.environment.clone(),
        ports: platform.ports.clone(),
        depends_on: platform.depends_on.clone(),
        networks,
        ..Default::default()
    }
}

fn bridge_network(subnet: String, gateway: Option<std::net::Ipv4Addr>) -> ComposeNetwork {
    ComposeNetwork {
        driver: "bridge".to_string(),
        ipam: Ipam {
            config: vec![IpamPool {
                subnet,
                gateway: gateway.map(|ip| ip.to_string()),
            }],
        },
    }
}

/// Compose project names are lowercase letters, digits, `-` and `_`.
fn project_name(lab: &str) -> String {
    let name: String = lab
        .trim()
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '-' | '_') => c,
            _ => '-',
        })
        .collect();
    name.trim_start_matches(['-', '_']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::allocate;
    use crate::render::tests::{topology, LAB};
    use serde_yaml::Value;

    fn compose_value(yaml: &str) -> Value {
        let topology = topology(yaml);
        let plan = allocate(&topology).unwrap();
        let session = GeneratorSession::new(&topology, &plan);
        serde_yaml::from_str(&render_compose(&session).unwrap()).unwrap()
    }

    #[test]
    fn test_router_services() {
        let compose = compose_value(LAB);
        assert_eq!(compose["name"], Value::from("bgp-attack-lab"));

        let r2 = &compose["services"]["r2"];
        assert_eq!(r2["image"], Value::from("quay.io/frrouting/frr:8.4.1"));
        assert_eq!(r2["hostname"], Value::from("r2"));
        assert_eq!(r2["environment"]["ASN"], Value::from("65002"));
        assert_eq!(r2["environment"]["ROLE"], Value::from("transit"));
        assert_eq!(r2["volumes"][0], Value::from("./frr/r2:/etc/frr"));
        assert_eq!(r2["volumes"][1], Value::from("lab_state:/lab/state"));

        let networks = &r2["networks"];
        assert_eq!(networks["lab_mgmt"]["ipv4_address"], Value::from("172.30.0.12"));
        assert_eq!(networks["fabric-a"]["ipv4_address"], Value::from("10.0.0.2"));
        assert_eq!(networks["fabric-b"]["ipv4_address"], Value::from("10.0.0.9"));
        assert_eq!(networks["lab_mgmt"]["priority"], Value::from(30));
        assert_eq!(networks["fabric-b"]["priority"], Value::from(10));
    }

    #[test]
    fn test_platform_service_and_networks() {
        let compose = compose_value(LAB);

        let controller = &compose["services"]["controller"];
        assert_eq!(controller["image"], Value::from("lab/controller:latest"));
        assert_eq!(controller["depends_on"][2], Value::from("r3"));
        assert_eq!(controller["volumes"][0], Value::from("lab_state:/lab/state"));
        assert!(controller["networks"]["lab_mgmt"].is_mapping());

        let fabric_a = &compose["networks"]["fabric-a"]["ipam"]["config"][0];
        assert_eq!(fabric_a["subnet"], Value::from("10.0.0.0/29"));
        assert_eq!(fabric_a["gateway"], Value::from("10.0.0.6"));
        assert!(compose["networks"]["fabric-b"]["ipam"]["config"][0]
            .get("gateway")
            .is_none());
        assert!(compose["volumes"]["lab_state"].is_mapping());
    }

    #[test]
    fn test_capture_volume_absent_when_unused() {
        let yaml = LAB
            .replace("    mount_state: true\n", "")
            .replace("  enabled: true\n", "  enabled: false\n");
        let compose = compose_value(&yaml);
        assert!(compose.get("volumes").is_none());
        assert_eq!(compose["services"]["r1"]["volumes"].as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn test_project_name() {
        assert_eq!(project_name("BGP Attack Lab"), "bgp-attack-lab");
        assert_eq!(project_name("_lab.v2"), "lab-v2");
    }
}
