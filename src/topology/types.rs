//! Topology type definitions.
//!
//! Every value in here has passed validation: names resolve, addresses
//! parse, ASNs are in range and every link has room for its routers.

use crate::config::PropagationScope;
use crate::topology::scenario::ScenarioRegistry;
use crate::utils::asn::AsnRange;
use ipnet::Ipv4Net;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

/// Fully validated lab
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub schema_version: u32,
    pub lab: LabInfo,
    pub roles: BTreeMap<String, Role>,
    pub routers: BTreeMap<String, Router>,
    pub links: BTreeMap<String, Link>,
    pub prefix_owners: Vec<PrefixOwner>,
    pub scenarios: ScenarioRegistry,
    pub services: BTreeMap<String, PlatformService>,
    pub pcap: PcapPipeline,
}

impl Topology {
    /// Router names attached to each link, sorted by name.
    ///
    /// A router is attached to a link when it declares at least one peer
    /// over it. Links nobody peers on map to an empty set.
    pub fn attachments(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut attached: BTreeMap<&str, BTreeSet<&str>> = self
            .links
            .keys()
            .map(|name| (name.as_str(), BTreeSet::new()))
            .collect();
        for router in self.routers.values() {
            for link in router.attached_links() {
                attached.entry(link).or_default().insert(router.name.as_str());
            }
        }
        attached
    }

    /// Role of a router. Validation guarantees the lookup succeeds.
    pub fn role_of(&self, router: &Router) -> Option<&Role> {
        self.roles.get(&router.role)
    }

    /// Ownership records originated by the given router
    pub fn prefixes_owned_by<'a>(&'a self, router: &'a str) -> impl Iterator<Item = &'a PrefixOwner> + 'a {
        self.prefix_owners.iter().filter(move |owner| owner.origin == router)
    }
}

/// Lab-wide metadata
#[derive(Debug, Clone, PartialEq)]
pub struct LabInfo {
    pub name: String,
    pub description: String,
    pub asn_range: Option<AsnRange>,
    pub router_image: String,
    /// Configured management subnet, or the one derived from the routers'
    /// management addresses when none is configured
    pub mgmt_subnet: Ipv4Net,
}

/// Routing-policy defaults of a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub local_pref: u32,
    pub export_policy: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    pub name: String,
    pub asn: u32,
    pub role: String,
    pub router_id: Ipv4Addr,
    pub mgmt_ip: Ipv4Addr,
    pub loopback: Option<Ipv4Net>,
    pub networks: BTreeSet<Ipv4Net>,
    pub peers: Vec<Peer>,
}

impl Router {
    /// Links this router declares a peer on, in name order
    pub fn attached_links(&self) -> BTreeSet<&str> {
        self.peers.iter().map(|peer| peer.link.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub neighbor: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub subnet: Ipv4Net,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixOwner {
    pub prefix: Ipv4Net,
    pub origin: String,
    pub scope: PropagationScope,
}

/// Non-router container declared under `services`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformService {
    pub name: String,
    pub image: Option<String>,
    pub build: Option<String>,
    pub ports: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub depends_on: Vec<String>,
    pub mount_state: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcapPipeline {
    pub enabled: bool,
    pub shared_volume: String,
}
