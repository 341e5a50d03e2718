//! IP address allocation logic.
//!
//! Per link: the attached routers are sorted by name and paired with the
//! subnet's usable host addresses in ascending order. The network and
//! broadcast addresses are never handed out.

use super::registry::AddressPlan;
use crate::error::GenerateError;
use crate::topology::{Link, Topology};
use crate::utils::ip_utils::{usable_host_count, usable_hosts};
use log::{debug, info};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Assign an address to every router on every link it is attached to.
///
/// Capacity is checked again here even though the validator already
/// reports it, so an address plan never exists for an overfull link.
pub fn allocate(topology: &Topology) -> Result<AddressPlan, GenerateError> {
    let mut plan = AddressPlan::new();

    for (link_name, routers) in topology.attachments() {
        let Some(link) = topology.links.get(link_name) else {
            continue;
        };
        for (router, address) in allocate_link(link, &routers)? {
            plan.assign(router, link_name, address)
                .map_err(|message| GenerateError::AddressConflict {
                    link: link_name.to_string(),
                    message,
                })?;
        }
    }

    info!("Allocated {} link addresses across {} links", plan.len(), topology.links.len());
    Ok(plan)
}

/// Pair the attached routers of one link with its usable hosts.
///
/// The result is ordered by router name. Only the set of names matters:
/// the same set always yields the same assignment.
pub fn allocate_link<'a>(
    link: &Link,
    routers: &BTreeSet<&'a str>,
) -> Result<Vec<(&'a str, Ipv4Addr)>, GenerateError> {
    let usable = usable_host_count(&link.subnet);
    if routers.len() as u64 > usable {
        return Err(GenerateError::Capacity {
            link: link.name.clone(),
            subnet: link.subnet.to_string(),
            attached: routers.len(),
            usable,
        });
    }

    let assignments: Vec<(&str, Ipv4Addr)> = routers
        .iter()
        .copied()
        .zip(usable_hosts(&link.subnet))
        .collect();

    for (router, address) in &assignments {
        debug!("Assigned {} to router {} on link {}", address, router, link.name);
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipnet::Ipv4Net;

    fn link(name: &str, subnet: &str) -> Link {
        Link {
            name: name.to_string(),
            subnet: subnet.parse::<Ipv4Net>().unwrap(),
        }
    }

    #[test]
    fn test_three_routers_on_slash_29() {
        let fabric = link("fabric-a", "10.0.0.0/29");
        let routers: BTreeSet<&str> = ["r3", "r1", "r2"].into_iter().collect();

        let assigned = allocate_link(&fabric, &routers).unwrap();
        let rendered: Vec<(String, String)> = assigned
            .iter()
            .map(|(router, ip)| (router.to_string(), ip.to_string()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("r1".to_string(), "10.0.0.1".to_string()),
                ("r2".to_string(), "10.0.0.2".to_string()),
                ("r3".to_string(), "10.0.0.3".to_string()),
            ]
        );
    }

    #[test]
    fn test_capacity_law() {
        let full = link("fabric-a", "10.0.0.0/29");
        let six: BTreeSet<&str> = ["a", "b", "c", "d", "e", "f"].into_iter().collect();
        assert_eq!(allocate_link(&full, &six).unwrap().len(), 6);

        let seven: BTreeSet<&str> = ["a", "b", "c", "d", "e", "f", "g"].into_iter().collect();
        match allocate_link(&full, &seven) {
            Err(GenerateError::Capacity { attached, usable, .. }) => {
                assert_eq!(attached, 7);
                assert_eq!(usable, 6);
            }
            other => panic!("expected capacity error, got {:?}", other),
        }

        let point_to_point = link("p2p", "10.0.0.0/30");
        let three: BTreeSet<&str> = ["r1", "r2", "r3"].into_iter().collect();
        assert!(matches!(
            allocate_link(&point_to_point, &three),
            Err(GenerateError::Capacity { .. })
        ));
    }

    #[test]
    fn test_lexicographic_not_numeric_order() {
        let fabric = link("fabric-a", "192.168.5.0/28");
        let routers: BTreeSet<&str> = ["r10", "r9", "r2"].into_iter().collect();
        let assigned = allocate_link(&fabric, &routers).unwrap();
        let names: Vec<&str> = assigned.iter().map(|(router, _)| *router).collect();
        assert_eq!(names, vec!["r10", "r2", "r9"]);
        assert_eq!(assigned[0].1, Ipv4Addr::new(192, 168, 5, 1));
    }

    #[test]
    fn test_address_conflict_is_not_an_io_failure() {
        use crate::error::{ErrorKind, EXIT_VALIDATION};
        use crate::render::tests::{topology, LAB};

        // Validation rejects overlapping links; a hand-built topology can still carry them
        let mut topology = topology(LAB);
        let shared = topology.links["fabric-a"].subnet;
        if let Some(fabric) = topology.links.get_mut("fabric-b") {
            fabric.subnet = shared;
        }

        match allocate(&topology) {
            Err(err @ GenerateError::AddressConflict { .. }) => {
                assert_eq!(err.kind(), ErrorKind::Capacity);
                assert_eq!(err.exit_code(), EXIT_VALIDATION);
            }
            other => panic!("expected address conflict, got {:?}", other),
        }
    }
}
