//! Address plan.
//!
//! Side table produced by the allocator: which host address each router
//! holds on each link. It keeps both directions (router → links and
//! link → routers) and rejects any address handed out twice.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Resolved (router, link) → address assignments for one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPlan {
    /// router -> link -> address
    by_router: BTreeMap<String, BTreeMap<String, Ipv4Addr>>,
    /// link -> router -> address
    by_link: BTreeMap<String, BTreeMap<String, Ipv4Addr>>,
    /// address -> (router, link), for conflict detection
    owners: BTreeMap<Ipv4Addr, (String, String)>,
}

impl AddressPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an assignment.
    ///
    /// Re-recording the same assignment is a no-op; giving an address that
    /// is already held by another (router, link) pair is an error.
    pub fn assign(&mut self, router: &str, link: &str, address: Ipv4Addr) -> Result<(), String> {
        if let Some((owner_router, owner_link)) = self.owners.get(&address) {
            if owner_router == router && owner_link == link {
                return Ok(());
            }
            return Err(format!(
                "address {} is already assigned to router '{}' on link '{}'",
                address, owner_router, owner_link
            ));
        }
        if let Some(existing) = self.address_of(router, link) {
            return Err(format!(
                "router '{}' already holds {} on link '{}'",
                router, existing, link
            ));
        }

        self.owners
            .insert(address, (router.to_string(), link.to_string()));
        self.by_router
            .entry(router.to_string())
            .or_default()
            .insert(link.to_string(), address);
        self.by_link
            .entry(link.to_string())
            .or_default()
            .insert(router.to_string(), address);
        Ok(())
    }

    /// Address of `router` on `link`, if it is attached there
    pub fn address_of(&self, router: &str, link: &str) -> Option<Ipv4Addr> {
        self.by_router.get(router)?.get(link).copied()
    }

    /// Links and addresses of one router, in link-name order
    pub fn for_router(&self, router: &str) -> impl Iterator<Item = (&str, Ipv4Addr)> {
        self.by_router
            .get(router)
            .into_iter()
            .flat_map(|links| links.iter().map(|(link, ip)| (link.as_str(), *ip)))
    }

    /// Routers and addresses on one link, in router-name order
    pub fn for_link(&self, link: &str) -> impl Iterator<Item = (&str, Ipv4Addr)> {
        self.by_link
            .get(link)
            .into_iter()
            .flat_map(|routers| routers.iter().map(|(router, ip)| (router.as_str(), *ip)))
    }

    /// The (router, link) pair holding an address
    pub fn owner_of(&self, address: Ipv4Addr) -> Option<(&str, &str)> {
        self.owners
            .get(&address)
            .map(|(router, link)| (router.as_str(), link.as_str()))
    }

    /// Number of assignments
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
