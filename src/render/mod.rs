//! # Artifact rendering
//!
//! Turns a validated [`Topology`] and its [`AddressPlan`] into the text of
//! every generated file. Nothing here touches the filesystem; the writer
//! receives the finished [`ArtifactSet`].
//!
//! ## Generated layout
//!
//! ```text
//! docker-compose.yml
//! topology-metadata.json
//! frr/<router>/frr.conf
//! frr/<router>/daemons
//! ```
//!
//! A [`GeneratorSession`] is built for each run and dropped afterwards.
//! It holds no state besides its inputs, so two sessions over equal inputs
//! render byte-identical artifacts.
//!
//! ## Interface numbering
//!
//! Inside each router container `eth0` is the management interface and the
//! link interfaces follow as `eth1..ethN` in ascending link-name order. The
//! compose file pins the same order through network attachment priorities.

pub mod compose;
pub mod frr;
pub mod metadata;

use crate::error::GenerateError;
use crate::ip::AddressPlan;
use crate::topology::{Link, Router, Topology};
use crate::utils::ip_utils::usable_host_count;
use ipnet::Ipv4Net;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const METADATA_FILE: &str = "topology-metadata.json";
pub const FRR_DIR: &str = "frr";
pub const FRR_CONF_FILE: &str = "frr.conf";
pub const DAEMONS_FILE: &str = "daemons";

/// Docker network every router and platform service joins
pub const MGMT_NETWORK: &str = "lab_mgmt";
pub const MGMT_INTERFACE: &str = "eth0";

/// Rendered files keyed by their path relative to the output directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: BTreeMap<PathBuf, String>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: String) {
        self.files.insert(path.into(), contents);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Files in path order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files
            .iter()
            .map(|(path, contents)| (path.as_path(), contents.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Relative path of a router's FRR configuration
pub fn frr_conf_path(router: &str) -> PathBuf {
    Path::new(FRR_DIR).join(router).join(FRR_CONF_FILE)
}

/// Relative path of a router's daemons file
pub fn daemons_path(router: &str) -> PathBuf {
    Path::new(FRR_DIR).join(router).join(DAEMONS_FILE)
}

/// One network interface inside a router container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Kernel name, `eth0`, `eth1`, ...
    pub name: String,
    /// Link the interface is on; `None` for management
    pub link: Option<String>,
    /// Docker network backing the interface
    pub network: String,
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl Interface {
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_len)
    }
}

/// A BGP session with both endpoint addresses resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSession {
    pub neighbor: String,
    pub neighbor_asn: u32,
    pub link: String,
    pub local_address: Ipv4Addr,
    pub remote_address: Ipv4Addr,
}

/// Per-run rendering context
pub struct GeneratorSession<'a> {
    topology: &'a Topology,
    plan: &'a AddressPlan,
    mgmt_network: Ipv4Net,
}

impl<'a> GeneratorSession<'a> {
    pub fn new(topology: &'a Topology, plan: &'a AddressPlan) -> Self {
        let mgmt_network = topology.lab.mgmt_subnet;
        debug!("Management network for this run: {}", mgmt_network);

        GeneratorSession {
            topology,
            plan,
            mgmt_network,
        }
    }

    pub fn topology(&self) -> &'a Topology {
        self.topology
    }

    pub fn plan(&self) -> &'a AddressPlan {
        self.plan
    }

    /// Management subnet settled by validation
    pub fn mgmt_network(&self) -> Ipv4Net {
        self.mgmt_network
    }

    /// Interfaces of a router: management first, then one per attached
    /// link in link-name order.
    pub fn interfaces(&self, router: &Router) -> Vec<Interface> {
        let mut interfaces = vec![Interface {
            name: MGMT_INTERFACE.to_string(),
            link: None,
            network: MGMT_NETWORK.to_string(),
            address: router.mgmt_ip,
            prefix_len: self.mgmt_network.prefix_len(),
        }];

        for (link_name, address) in self.plan.for_router(&router.name) {
            let Some(link) = self.topology.links.get(link_name) else {
                continue;
            };
            interfaces.push(Interface {
                name: format!("eth{}", interfaces.len()),
                link: Some(link_name.to_string()),
                network: link_name.to_string(),
                address,
                prefix_len: link.subnet.prefix_len(),
            });
        }
        interfaces
    }

    /// BGP sessions of a router ordered by (link, neighbor).
    pub fn peer_sessions(&self, router: &Router) -> Result<Vec<PeerSession>, GenerateError> {
        let declared: BTreeSet<(&str, &str)> = router
            .peers
            .iter()
            .map(|peer| (peer.link.as_str(), peer.neighbor.as_str()))
            .collect();

        let mut sessions = Vec::with_capacity(declared.len());
        for (link, neighbor) in declared {
            let unresolved = |what: &str| GenerateError::Render {
                artifact: format!("BGP session {} -> {}", router.name, neighbor),
                message: format!("no {} on link '{}'", what, link),
            };
            let local_address = self
                .plan
                .address_of(&router.name, link)
                .ok_or_else(|| unresolved("local address"))?;
            let remote_address = self
                .plan
                .address_of(neighbor, link)
                .ok_or_else(|| unresolved("neighbor address"))?;
            let neighbor_asn = self
                .topology
                .routers
                .get(neighbor)
                .map(|peer| peer.asn)
                .ok_or_else(|| unresolved("neighbor router"))?;

            sessions.push(PeerSession {
                neighbor: neighbor.to_string(),
                neighbor_asn,
                link: link.to_string(),
                local_address,
                remote_address,
            });
        }
        Ok(sessions)
    }

    /// Docker gateway of a link network: the highest usable host, when the
    /// allocator left it free.
    pub fn link_gateway(&self, link: &Link) -> Option<Ipv4Addr> {
        let attached = self.plan.for_link(&link.name).count() as u64;
        if attached >= usable_host_count(&link.subnet) {
            return None;
        }
        Some(Ipv4Addr::from(u32::from(link.subnet.broadcast()) - 1))
    }

    /// Docker gateway of the management network: the highest usable host
    /// no router uses as its management address.
    pub fn mgmt_gateway(&self) -> Option<Ipv4Addr> {
        let taken: BTreeSet<Ipv4Addr> = self
            .topology
            .routers
            .values()
            .map(|router| router.mgmt_ip)
            .collect();
        let first = u32::from(self.mgmt_network.network());
        let last = u32::from(self.mgmt_network.broadcast());
        if last.saturating_sub(first) < 2 {
            return None;
        }
        ((first + 1)..last)
            .rev()
            .map(Ipv4Addr::from)
            .find(|candidate| !taken.contains(candidate))
    }

    /// Render every artifact of the lab.
    pub fn render(&self) -> Result<ArtifactSet, GenerateError> {
        let mut artifacts = ArtifactSet::new();

        for router in self.topology.routers.values() {
            artifacts.insert(frr_conf_path(&router.name), frr::render_frr_conf(self, router)?);
            artifacts.insert(daemons_path(&router.name), frr::render_daemons());
        }
        artifacts.insert(COMPOSE_FILE, compose::render_compose(self)?);
        artifacts.insert(METADATA_FILE, metadata::render_metadata(self)?);

        debug!("Rendered {} artifacts", artifacts.len());
        Ok(artifacts)
    }
}
