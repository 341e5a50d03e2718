//! Configuration validation.
//!
//! This module checks a loaded [`LabConfig`] and turns it into a typed
//! [`Topology`]. Every check runs on every call and reports into one
//! [`ValidationReport`], so a user sees all problems of a configuration at
//! once. Checks run in a fixed order (schema, uniqueness, references,
//! ranges, capacity) which keeps the diagnostic order stable between runs.

use crate::config::{LabConfig, RouterConfig, DEFAULT_ROUTER_IMAGE, SUPPORTED_SCHEMA_VERSION};
use crate::error::{EntityKind, ErrorKind, Locator, ValidationReport};
use crate::render::MGMT_NETWORK;
use crate::topology::{
    LabInfo, Link, Peer, PcapPipeline, PlatformService, PrefixOwner, Role, Router, Scenario,
    ScenarioKind, ScenarioRegistry, Topology,
};
use crate::utils::asn::{asn_allowed, AsnRange};
use crate::utils::ip_utils::{
    covering_network, parse_cidr, parse_ipv4, parse_network, usable_host_count,
};
use ipnet::Ipv4Net;
use log::{debug, info};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Longest prefix used when the management subnet is derived from the
/// routers' management addresses
pub const DERIVED_MGMT_PREFIX_LEN: u8 = 24;

/// Names that end up as hostnames, service names or route-map names
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("Invalid identifier regex")
});

/// Validate a configuration and build the typed topology.
///
/// # Returns
/// * `Ok(Topology)` if no check failed
/// * `Err(ValidationReport)` with every diagnostic found, in check order
pub fn validate(config: &LabConfig) -> Result<Topology, ValidationReport> {
    let mut report = ValidationReport::default();

    check_schema(config, &mut report);
    check_uniqueness(config, &mut report);
    check_references(config, &mut report);
    check_ranges(config, &mut report);
    check_capacity(config, &mut report);

    if !report.is_empty() {
        info!("Validation found {} problem(s)", report.len());
        return Err(report);
    }

    log_notes(config);

    match assemble(config) {
        Some(topology) => Ok(topology),
        None => {
            report.push(
                ErrorKind::Schema,
                Locator::new(EntityKind::Lab, "<document>"),
                "configuration passed all checks but could not be resolved",
            );
            Err(report)
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

fn check_schema(config: &LabConfig, report: &mut ValidationReport) {
    // The loader already gates the version; this covers configs built in code.
    if config.version != SUPPORTED_SCHEMA_VERSION {
        report.push(
            ErrorKind::Schema,
            Locator::new(EntityKind::Lab, "version"),
            format!(
                "unsupported schema version {} (expected {})",
                config.version, SUPPORTED_SCHEMA_VERSION
            ),
        );
    }

    if config.metadata.name.trim().is_empty() {
        report.push(
            ErrorKind::Schema,
            Locator::new(EntityKind::Metadata, "metadata").field("name"),
            "lab name cannot be empty",
        );
    }

    if config.routers.is_empty() {
        report.push(
            ErrorKind::Schema,
            Locator::new(EntityKind::Lab, "routers"),
            "at least one router must be defined",
        );
    }

    for (name, service) in &config.services {
        if service.image.is_none() && service.build.is_none() {
            report.push(
                ErrorKind::Schema,
                Locator::new(EntityKind::Service, name.clone()),
                "service must declare an image or a build context",
            );
        }
    }
}

// ============================================================================
// Uniqueness
// ============================================================================

fn check_uniqueness(config: &LabConfig, report: &mut ValidationReport) {
    let mut names: HashSet<&str> = HashSet::new();
    let mut mgmt_ips: HashMap<String, &str> = HashMap::new();
    let mut router_ids: HashMap<String, &str> = HashMap::new();

    for router in &config.routers {
        if !names.insert(router.name.as_str()) {
            report.push(
                ErrorKind::Uniqueness,
                Locator::new(EntityKind::Router, router.name.clone()).field("name"),
                format!("router name '{}' is declared more than once", router.name),
            );
        }

        let mgmt_key = address_key(&router.mgmt_ip);
        if let Some(owner) = mgmt_ips.get(&mgmt_key) {
            report.push(
                ErrorKind::Uniqueness,
                Locator::new(EntityKind::Router, router.name.clone()).field("mgmt_ip"),
                format!("management IP {} is already used by router '{}'", mgmt_key, owner),
            );
        } else {
            mgmt_ips.insert(mgmt_key, &router.name);
        }

        let id_key = address_key(&router.router_id);
        if let Some(owner) = router_ids.get(&id_key) {
            report.push(
                ErrorKind::Uniqueness,
                Locator::new(EntityKind::Router, router.name.clone()).field("router_id"),
                format!("router-id {} is already used by router '{}'", id_key, owner),
            );
        } else {
            router_ids.insert(id_key, &router.name);
        }

        let mut sessions: HashSet<(&str, &str)> = HashSet::new();
        for peer in &router.peers {
            if !sessions.insert((peer.neighbor.as_str(), peer.link.as_str())) {
                report.push(
                    ErrorKind::Uniqueness,
                    Locator::new(EntityKind::Router, router.name.clone()).field("peers"),
                    format!(
                        "peer '{}' over link '{}' is declared more than once",
                        peer.neighbor, peer.link
                    ),
                );
            }
        }
    }

    for name in config.services.keys() {
        if names.contains(name.as_str()) {
            report.push(
                ErrorKind::Uniqueness,
                Locator::new(EntityKind::Service, name.clone()),
                format!("service name '{}' collides with a router of the same name", name),
            );
        }
    }

    if config.links.contains_key(MGMT_NETWORK) {
        report.push(
            ErrorKind::Uniqueness,
            Locator::new(EntityKind::Link, MGMT_NETWORK).field("name"),
            format!("link name '{}' is reserved for the management network", MGMT_NETWORK),
        );
    }

    let mut owners: HashSet<(String, &str)> = HashSet::new();
    for owner in &config.prefix_owners {
        if !owners.insert((address_key(&owner.prefix), owner.origin.as_str())) {
            report.push(
                ErrorKind::Uniqueness,
                Locator::new(EntityKind::PrefixOwner, owner.prefix.clone()).field("prefix"),
                format!(
                    "prefix {} is already recorded as originated by '{}'",
                    owner.prefix, owner.origin
                ),
            );
        }
    }
}

/// Normalised comparison key for an address-like field. Unparseable
/// values compare by their trimmed text and are reported by the range
/// checks.
fn address_key(value: &str) -> String {
    let value = value.trim();
    if let Ok(ip) = value.parse::<Ipv4Addr>() {
        return ip.to_string();
    }
    if let Ok(net) = value.parse::<Ipv4Net>() {
        return net.to_string();
    }
    value.to_string()
}

// ============================================================================
// References
// ============================================================================

fn check_references(config: &LabConfig, report: &mut ValidationReport) {
    let routers = router_index(config);

    for router in &config.routers {
        if !config.roles.contains_key(&router.role) {
            report.push(
                ErrorKind::Referential,
                Locator::new(EntityKind::Router, router.name.clone()).field("role"),
                format!("role '{}' is not defined", router.role),
            );
        }

        for peer in &router.peers {
            let locator = Locator::new(EntityKind::Router, router.name.clone()).field("peers");
            let neighbor = routers.get(peer.neighbor.as_str());
            let link_known = config.links.contains_key(&peer.link);

            if neighbor.is_none() {
                report.push(
                    ErrorKind::Referential,
                    locator.clone(),
                    format!("peer neighbor '{}' is not a defined router", peer.neighbor),
                );
            }
            if !link_known {
                report.push(
                    ErrorKind::Referential,
                    locator.clone(),
                    format!(
                        "peer link '{}' (neighbor '{}') is not a defined link",
                        peer.link, peer.neighbor
                    ),
                );
            }
            if peer.neighbor == router.name {
                report.push(
                    ErrorKind::Referential,
                    locator.clone(),
                    format!("router cannot peer with itself over link '{}'", peer.link),
                );
                continue;
            }

            if let (Some(neighbor), true) = (neighbor, link_known) {
                if !neighbor.peers.iter().any(|p| p.link == peer.link) {
                    report.push(
                        ErrorKind::Referential,
                        locator,
                        format!(
                            "neighbor '{}' declares no peer on link '{}' and has no address there",
                            peer.neighbor, peer.link
                        ),
                    );
                }
            }
        }
    }

    for owner in &config.prefix_owners {
        if !routers.contains_key(owner.origin.as_str()) {
            report.push(
                ErrorKind::Referential,
                Locator::new(EntityKind::PrefixOwner, owner.prefix.clone()).field("origin"),
                format!("origin '{}' is not a defined router", owner.origin),
            );
        }
    }

    for (key, scenario) in &config.scenarios {
        let entrypoint = scenario.orchestrator_entrypoint.as_deref().unwrap_or(key);
        if let Err(message) = entrypoint.parse::<ScenarioKind>() {
            report.push(
                ErrorKind::Referential,
                Locator::new(EntityKind::Scenario, key.clone()).field("orchestrator_entrypoint"),
                message,
            );
        }
    }

    for (name, service) in &config.services {
        for dependency in &service.depends_on {
            let known = routers.contains_key(dependency.as_str())
                || (config.services.contains_key(dependency) && dependency != name);
            if !known {
                report.push(
                    ErrorKind::Referential,
                    Locator::new(EntityKind::Service, name.clone()).field("depends_on"),
                    format!("dependency '{}' is not a router or another service", dependency),
                );
            }
        }
    }
}

/// First router declared under each name
fn router_index(config: &LabConfig) -> HashMap<&str, &RouterConfig> {
    let mut index = HashMap::new();
    for router in &config.routers {
        index.entry(router.name.as_str()).or_insert(router);
    }
    index
}

// ============================================================================
// Ranges and well-formedness
// ============================================================================

fn check_ranges(config: &LabConfig, report: &mut ValidationReport) {
    let asn_range = check_metadata(config, report);
    let mgmt_subnet = effective_mgmt_subnet(config);
    let mgmt_derived = config.metadata.mgmt_subnet.is_none();

    for (name, role) in &config.roles {
        check_identifier(report, Locator::new(EntityKind::Role, name.clone()), name);
        check_identifier(
            report,
            Locator::new(EntityKind::Role, name.clone()).field("export_policy"),
            &role.export_policy,
        );
    }

    for router in &config.routers {
        check_router_ranges(router, asn_range.as_ref(), mgmt_subnet.as_ref(), report);
    }

    let mut subnets: Vec<(&str, Ipv4Net)> = Vec::new();
    for (name, link) in &config.links {
        check_identifier(report, Locator::new(EntityKind::Link, name.clone()), name);
        match parse_network(&link.ipv4_subnet) {
            Ok(net) => subnets.push((name.as_str(), net)),
            Err(message) => report.push(
                ErrorKind::Range,
                Locator::new(EntityKind::Link, name.clone()).field("ipv4_subnet"),
                message,
            ),
        }
    }
    check_overlaps(&subnets, mgmt_subnet.as_ref(), mgmt_derived, report);

    for owner in &config.prefix_owners {
        if let Err(message) = parse_network(&owner.prefix) {
            report.push(
                ErrorKind::Range,
                Locator::new(EntityKind::PrefixOwner, owner.prefix.clone()).field("prefix"),
                message,
            );
        }
    }

    for name in config.services.keys() {
        check_identifier(report, Locator::new(EntityKind::Service, name.clone()), name);
    }

    check_identifier(
        report,
        Locator::new(EntityKind::PcapPipeline, "pcap_pipeline").field("shared_volume"),
        &config.pcap_pipeline.shared_volume,
    );
}

/// Management subnet the lab runs on: the configured one, or the smallest
/// network (at most /24) covering every parseable management address.
fn effective_mgmt_subnet(config: &LabConfig) -> Option<Ipv4Net> {
    match &config.metadata.mgmt_subnet {
        Some(subnet) => parse_network(subnet).ok(),
        None => {
            let addresses: Vec<Ipv4Addr> = config
                .routers
                .iter()
                .filter_map(|router| parse_ipv4(&router.mgmt_ip).ok())
                .collect();
            covering_network(&addresses, DERIVED_MGMT_PREFIX_LEN)
        }
    }
}

/// Check the metadata section and return the usable configured ASN range
fn check_metadata(config: &LabConfig, report: &mut ValidationReport) -> Option<AsnRange> {
    if let Some(subnet) = &config.metadata.mgmt_subnet {
        if let Err(message) = parse_network(subnet) {
            report.push(
                ErrorKind::Range,
                Locator::new(EntityKind::Metadata, "metadata").field("mgmt_subnet"),
                message,
            );
        }
    }

    let range = config.metadata.asn_range.as_ref()?;
    let locator = Locator::new(EntityKind::Metadata, "metadata").field("asn_range");
    let (min, max) = match (u32::try_from(range.min), u32::try_from(range.max)) {
        (Ok(min), Ok(max)) => (min, max),
        _ => {
            report.push(
                ErrorKind::Range,
                locator,
                format!("ASN range {}-{} exceeds the 32-bit ASN space", range.min, range.max),
            );
            return None;
        }
    };
    if min > max {
        report.push(
            ErrorKind::Range,
            locator,
            format!("ASN range minimum {} is greater than maximum {}", min, max),
        );
        return None;
    }
    Some(AsnRange { min, max })
}

fn check_router_ranges(
    router: &RouterConfig,
    asn_range: Option<&AsnRange>,
    mgmt_subnet: Option<&Ipv4Net>,
    report: &mut ValidationReport,
) {
    let locator = |field: &str| Locator::new(EntityKind::Router, router.name.clone()).field(field);

    check_identifier(report, locator("name"), &router.name);

    if !asn_allowed(router.asn, asn_range) {
        let configured = asn_range
            .map(|range| format!("the configured range {} and ", range))
            .unwrap_or_default();
        report.push(
            ErrorKind::Range,
            locator("asn"),
            format!(
                "ASN {} is outside {}the private ranges 64512-65534 and 4200000000-4294967294",
                router.asn, configured
            ),
        );
    }

    if let Err(message) = parse_ipv4(&router.router_id) {
        report.push(ErrorKind::Range, locator("router_id"), message);
    }

    match parse_ipv4(&router.mgmt_ip) {
        Ok(ip) => {
            if let Some(subnet) = mgmt_subnet {
                if !subnet.contains(&ip) {
                    report.push(
                        ErrorKind::Range,
                        locator("mgmt_ip"),
                        format!("management IP {} is outside the management subnet {}", ip, subnet),
                    );
                } else if ip == subnet.network() || ip == subnet.broadcast() {
                    report.push(
                        ErrorKind::Range,
                        locator("mgmt_ip"),
                        format!(
                            "management IP {} is the network or broadcast address of {}",
                            ip, subnet
                        ),
                    );
                }
            }
        }
        Err(message) => report.push(ErrorKind::Range, locator("mgmt_ip"), message),
    }

    if let Some(loopback) = &router.loopback {
        if let Err(message) = parse_cidr(loopback) {
            report.push(ErrorKind::Range, locator("loopback"), message);
        }
    }

    for network in &router.networks {
        if let Err(message) = parse_network(network) {
            report.push(ErrorKind::Range, locator("networks"), message);
        }
    }
}

/// Link subnets must not overlap each other or the management network
fn check_overlaps(
    subnets: &[(&str, Ipv4Net)],
    mgmt: Option<&Ipv4Net>,
    mgmt_derived: bool,
    report: &mut ValidationReport,
) {
    for (index, (name, net)) in subnets.iter().enumerate() {
        for (other_name, other) in &subnets[..index] {
            if net.contains(other) || other.contains(net) {
                report.push(
                    ErrorKind::Range,
                    Locator::new(EntityKind::Link, name.to_string()).field("ipv4_subnet"),
                    format!("subnet {} overlaps link '{}' ({})", net, other_name, other),
                );
            }
        }
        if let Some(mgmt) = mgmt {
            if net.contains(mgmt) || mgmt.contains(net) {
                report.push(
                    ErrorKind::Range,
                    Locator::new(EntityKind::Link, name.to_string()).field("ipv4_subnet"),
                    if mgmt_derived {
                        format!(
                            "subnet {} overlaps the management subnet {} derived from the management IPs (set metadata.mgmt_subnet)",
                            net, mgmt
                        )
                    } else {
                        format!("subnet {} overlaps the management subnet {}", net, mgmt)
                    },
                );
            }
        }
    }
}

fn check_identifier(report: &mut ValidationReport, locator: Locator, value: &str) {
    if !IDENTIFIER.is_match(value) {
        report.push(
            ErrorKind::Range,
            locator,
            format!(
                "'{}' is not a valid identifier (letters, digits, '_', '.', '-'; must start with a letter or digit)",
                value
            ),
        );
    }
}

// ============================================================================
// Capacity
// ============================================================================

fn check_capacity(config: &LabConfig, report: &mut ValidationReport) {
    let attached = attached_routers(config);

    for (name, link) in &config.links {
        let Ok(subnet) = parse_network(&link.ipv4_subnet) else {
            continue; // reported by the range checks
        };
        let routers = attached.get(name.as_str()).cloned().unwrap_or_default();
        let usable = usable_host_count(&subnet);
        if routers.len() as u64 > usable {
            report.push(
                ErrorKind::Capacity,
                Locator::new(EntityKind::Link, name.clone()).field("ipv4_subnet"),
                format!(
                    "{} routers are attached ({}) but {} has only {} usable host address(es)",
                    routers.len(),
                    routers.into_iter().collect::<Vec<_>>().join(", "),
                    subnet,
                    usable
                ),
            );
        }
    }
}

/// Distinct routers declaring a peer on each link
fn attached_routers(config: &LabConfig) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut attached: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for router in &config.routers {
        for peer in &router.peers {
            attached
                .entry(peer.link.as_str())
                .or_default()
                .insert(router.name.as_str());
        }
    }
    attached
}

fn log_notes(config: &LabConfig) {
    let attached = attached_routers(config);
    for name in config.links.keys() {
        if !attached.contains_key(name.as_str()) {
            info!("Link '{}' has no attached routers", name);
        }
    }

    for owner in &config.prefix_owners {
        let advertised = config
            .routers
            .iter()
            .filter(|router| router.name == owner.origin)
            .flat_map(|router| router.networks.iter())
            .any(|network| address_key(network) == address_key(&owner.prefix));
        if !advertised {
            info!(
                "Prefix {} is owned by '{}' but not among its advertised networks",
                owner.prefix, owner.origin
            );
        }
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Build the typed topology from a configuration that passed every check.
fn assemble(config: &LabConfig) -> Option<Topology> {
    let metadata = &config.metadata;
    let asn_range = match &metadata.asn_range {
        Some(range) => Some(AsnRange {
            min: u32::try_from(range.min).ok()?,
            max: u32::try_from(range.max).ok()?,
        }),
        None => None,
    };
    let mgmt_subnet = effective_mgmt_subnet(config)?;

    let lab = LabInfo {
        name: metadata.name.trim().to_string(),
        description: metadata.description.clone(),
        asn_range,
        router_image: metadata
            .router_image
            .clone()
            .unwrap_or_else(|| DEFAULT_ROUTER_IMAGE.to_string()),
        mgmt_subnet,
    };

    let roles = config
        .roles
        .iter()
        .map(|(name, role)| {
            (
                name.clone(),
                Role {
                    name: name.clone(),
                    local_pref: role.local_pref,
                    export_policy: role.export_policy.clone(),
                },
            )
        })
        .collect();

    let mut routers = BTreeMap::new();
    for router in &config.routers {
        let loopback = match &router.loopback {
            Some(loopback) => Some(parse_cidr(loopback).ok()?),
            None => None,
        };
        let networks = router
            .networks
            .iter()
            .map(|network| parse_network(network).ok())
            .collect::<Option<BTreeSet<_>>>()?;
        let typed = Router {
            name: router.name.clone(),
            asn: u32::try_from(router.asn).ok()?,
            role: router.role.clone(),
            router_id: parse_ipv4(&router.router_id).ok()?,
            mgmt_ip: parse_ipv4(&router.mgmt_ip).ok()?,
            loopback,
            networks,
            peers: router
                .peers
                .iter()
                .map(|peer| Peer {
                    neighbor: peer.neighbor.clone(),
                    link: peer.link.clone(),
                })
                .collect(),
        };
        routers.insert(typed.name.clone(), typed);
    }

    let mut links = BTreeMap::new();
    for (name, link) in &config.links {
        let subnet = parse_network(&link.ipv4_subnet).ok()?;
        links.insert(name.clone(), Link { name: name.clone(), subnet });
    }

    let prefix_owners = config
        .prefix_owners
        .iter()
        .map(|owner| {
            Some(PrefixOwner {
                prefix: parse_network(&owner.prefix).ok()?,
                origin: owner.origin.clone(),
                scope: owner.scope,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    let scenarios = config
        .scenarios
        .iter()
        .map(|(key, scenario)| {
            let entrypoint = scenario.orchestrator_entrypoint.as_deref().unwrap_or(key);
            Some(Scenario {
                key: key.clone(),
                description: scenario.description.clone(),
                kind: entrypoint.parse().ok()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    let services = config
        .services
        .iter()
        .map(|(name, service)| {
            (
                name.clone(),
                PlatformService {
                    name: name.clone(),
                    image: service.image.clone(),
                    build: service.build.clone(),
                    ports: service.ports.clone(),
                    environment: service.environment.clone(),
                    depends_on: service.depends_on.clone(),
                    mount_state: service.mount_state,
                },
            )
        })
        .collect();

    debug!(
        "Assembled topology with {} routers, {} links, {} scenarios",
        routers.len(),
        links.len(),
        scenarios.len()
    );

    Some(Topology {
        schema_version: config.version,
        lab,
        roles,
        routers,
        links,
        prefix_owners,
        scenarios: ScenarioRegistry::new(scenarios),
        services,
        pcap: PcapPipeline {
            enabled: config.pcap_pipeline.enabled,
            shared_volume: config.pcap_pipeline.shared_volume.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_loader::parse_config;

    const LAB: &str = r#"
version: 1
metadata:
  name: bgp-attack-lab
  description: three AS lab
  asn_range: { min: 65000, max: 65010 }
  mgmt_subnet: 172.30.0.0/24
roles:
  victim: { local_pref: 100, export_policy: customer }
  transit: { local_pref: 200, export_policy: provider }
  attacker: { local_pref: 100, export_policy: customer }
routers:
  - name: r1
    asn: 65001
    role: victim
    router_id: 1.1.1.1
    mgmt_ip: 172.30.0.11
    networks: [10.10.1.0/24]
    peers:
      - { neighbor: r2, link: fabric-a }
  - name: r2
    asn: 65002
    role: transit
    router_id: 2.2.2.2
    mgmt_ip: 172.30.0.12
    peers:
      - { neighbor: r1, link: fabric-a }
      - { neighbor: r3, link: fabric-b }
  - name: r3
    asn: 65003
    role: attacker
    router_id: 3.3.3.3
    mgmt_ip: 172.30.0.13
    networks: [10.20.3.0/24]
    peers:
      - { neighbor: r2, link: fabric-b }
links:
  fabric-a: { ipv4_subnet: 10.0.0.0/30 }
  fabric-b: { ipv4_subnet: 10.0.0.4/30 }
prefix_owners:
  - { prefix: 10.10.1.0/24, origin: r1, scope: full }
  - { prefix: 10.20.3.0/24, origin: r3, scope: limited }
scenarios:
  normal: { description: honest announcements }
  hijack: { description: exact prefix hijack, orchestrator_entrypoint: hijack }
"#;

    fn load(yaml: &str) -> LabConfig {
        parse_config(yaml).unwrap().config
    }

    fn kinds(report: &ValidationReport) -> Vec<ErrorKind> {
        report.diagnostics().iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_valid_lab_builds_topology() {
        let topology = validate(&load(LAB)).unwrap();
        assert_eq!(topology.routers.len(), 3);
        assert_eq!(topology.routers["r2"].asn, 65002);
        assert_eq!(topology.links["fabric-b"].subnet.to_string(), "10.0.0.4/30");
        assert_eq!(topology.scenarios.get("normal").unwrap().kind, ScenarioKind::Normal);
        assert_eq!(topology.lab.router_image, DEFAULT_ROUTER_IMAGE);
        assert_eq!(topology.attachments()["fabric-a"].len(), 2);
        assert_eq!(
            topology.routers["r2"].attached_links().into_iter().collect::<Vec<_>>(),
            vec!["fabric-a", "fabric-b"]
        );
        assert_eq!(topology.lab.mgmt_subnet.to_string(), "172.30.0.0/24");
    }

    #[test]
    fn test_asn_out_of_range_names_router() {
        let config = load(&LAB.replace("asn: 65003", "asn: 70000"));
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Range]);
        let diagnostic = &report.diagnostics()[0];
        assert_eq!(diagnostic.locator.name, "r3");
        assert_eq!(diagnostic.locator.field.as_deref(), Some("asn"));
        assert!(diagnostic.message.contains("70000"));
    }

    #[test]
    fn test_undefined_link_names_router_and_link() {
        let config = load(&LAB.replace(
            "      - { neighbor: r2, link: fabric-b }\n",
            "      - { neighbor: r2, link: fabric-b }\n      - { neighbor: r2, link: fabric-z }\n",
        ));
        let report = validate(&config).unwrap_err();
        assert!(report.has_kind(ErrorKind::Referential));
        let diagnostic = report
            .diagnostics()
            .iter()
            .find(|d| d.message.contains("fabric-z"))
            .unwrap();
        assert_eq!(diagnostic.kind, ErrorKind::Referential);
        assert_eq!(diagnostic.locator.entity, EntityKind::Router);
        assert_eq!(diagnostic.locator.name, "r3");
    }

    #[test]
    fn test_independent_defects_reported_together_in_order() {
        let config = load(
            &LAB.replace("asn: 65003", "asn: 70000")
                .replace("{ neighbor: r2, link: fabric-a }", "{ neighbor: r9, link: fabric-a }")
                .replace("mgmt_ip: 172.30.0.12", "mgmt_ip: 172.30.0.11"),
        );
        let report = validate(&config).unwrap_err();
        assert_eq!(
            kinds(&report),
            vec![ErrorKind::Uniqueness, ErrorKind::Referential, ErrorKind::Range]
        );
    }

    #[test]
    fn test_duplicates_are_reported() {
        let config = load(&LAB.replace("router_id: 3.3.3.3", "router_id: 2.2.2.2"));
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Uniqueness]);
        assert_eq!(report.diagnostics()[0].locator.field.as_deref(), Some("router_id"));
        assert!(report.diagnostics()[0].message.contains("'r2'"));
    }

    #[test]
    fn test_capacity_violation() {
        let config = load(
            &LAB.replace("{ neighbor: r2, link: fabric-b }", "{ neighbor: r2, link: fabric-a }")
                .replace(
                    "      - { neighbor: r3, link: fabric-b }\n",
                    "      - { neighbor: r3, link: fabric-a }\n",
                ),
        );
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Capacity]);
        assert_eq!(report.diagnostics()[0].locator.name, "fabric-a");
    }

    #[test]
    fn test_malformed_cidrs_are_range_errors() {
        let config = load(
            &LAB.replace("ipv4_subnet: 10.0.0.4/30", "ipv4_subnet: 10.0.0.5/30")
                .replace("networks: [10.10.1.0/24]", "networks: [10.10.1.0]"),
        );
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Range, ErrorKind::Range]);
    }

    #[test]
    fn test_neighbor_must_be_attached_to_link() {
        let config = load(&LAB.replace(
            "      - { neighbor: r1, link: fabric-a }\n",
            "      - { neighbor: r1, link: fabric-b }\n",
        ));
        let report = validate(&config).unwrap_err();
        assert!(report
            .diagnostics()
            .iter()
            .any(|d| d.kind == ErrorKind::Referential && d.message.contains("declares no peer")));
    }

    #[test]
    fn test_unknown_scenario_entrypoint_is_error() {
        let config = load(&LAB.replace("orchestrator_entrypoint: hijack", "orchestrator_entrypoint: flap"));
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Referential]);
        assert_eq!(report.diagnostics()[0].locator.entity, EntityKind::Scenario);
    }

    #[test]
    fn test_mgmt_ip_outside_subnet() {
        let config = load(&LAB.replace("mgmt_ip: 172.30.0.13", "mgmt_ip: 172.31.0.13"));
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Range]);
        assert_eq!(report.diagnostics()[0].locator.field.as_deref(), Some("mgmt_ip"));
    }

    #[test]
    fn test_overlapping_links() {
        let config = load(&LAB.replace("ipv4_subnet: 10.0.0.4/30", "ipv4_subnet: 10.0.0.0/29"));
        let report = validate(&config).unwrap_err();
        assert!(report.diagnostics().iter().any(|d| d.message.contains("overlaps")));
    }

    #[test]
    fn test_management_network_name_is_reserved() {
        let config = load(&LAB.replace("fabric-b", "lab_mgmt"));
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Uniqueness]);
        assert_eq!(report.diagnostics()[0].locator.name, "lab_mgmt");
    }

    #[test]
    fn test_invalid_identifiers() {
        let config = load(&LAB.replace("export_policy: provider", "export_policy: \"bad policy\""));
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Range]);
        assert_eq!(report.diagnostics()[0].locator.field.as_deref(), Some("export_policy"));
    }

    #[test]
    fn test_mgmt_ip_cannot_be_network_or_broadcast() {
        let config = load(
            &LAB.replace("mgmt_ip: 172.30.0.12", "mgmt_ip: 172.30.0.0")
                .replace("mgmt_ip: 172.30.0.13", "mgmt_ip: 172.30.0.255"),
        );
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Range, ErrorKind::Range]);
        for (diagnostic, router) in report.diagnostics().iter().zip(["r2", "r3"]) {
            assert_eq!(diagnostic.locator.name, router);
            assert_eq!(diagnostic.locator.field.as_deref(), Some("mgmt_ip"));
            assert!(diagnostic.message.contains("network or broadcast"));
        }
    }

    #[test]
    fn test_mgmt_subnet_is_derived_when_absent() {
        let config = load(&LAB.replace("  mgmt_subnet: 172.30.0.0/24\n", ""));
        let topology = validate(&config).unwrap();
        assert_eq!(topology.lab.mgmt_subnet.to_string(), "172.30.0.0/24");
    }

    #[test]
    fn test_derived_mgmt_subnet_must_not_overlap_links() {
        let config = load(
            &LAB.replace("  mgmt_subnet: 172.30.0.0/24\n", "")
                .replace("mgmt_ip: 172.30.0.1", "mgmt_ip: 10.0.0.2"),
        );
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Range, ErrorKind::Range]);
        for (diagnostic, link) in report.diagnostics().iter().zip(["fabric-a", "fabric-b"]) {
            assert_eq!(diagnostic.locator.name, link);
            assert_eq!(diagnostic.locator.field.as_deref(), Some("ipv4_subnet"));
            assert!(diagnostic.message.contains("10.0.0.0/24 derived"));
        }
    }

    #[test]
    fn test_scattered_mgmt_ips_widen_derived_subnet_into_links() {
        let config = load(
            &LAB.replace("  mgmt_subnet: 172.30.0.0/24\n", "")
                .replace("mgmt_ip: 172.30.0.13", "mgmt_ip: 10.200.0.13"),
        );
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Range, ErrorKind::Range]);
        assert!(report.diagnostics()[0].message.contains("0.0.0.0/0"));
    }

    #[test]
    fn test_schema_version_checked_for_configs_built_in_code() {
        let mut config = load(LAB);
        config.version = 2;
        let report = validate(&config).unwrap_err();
        assert_eq!(kinds(&report), vec![ErrorKind::Schema]);
        assert_eq!(report.diagnostics()[0].locator.name, "version");
    }
}
