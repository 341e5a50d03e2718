//! Lab configuration document.
//!
//! These types mirror `lab_config.yaml` one to one. Addresses and
//! prefixes stay textual here; the validator parses them and reports
//! malformed values together with every other defect.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Schema version understood by this generator
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Router image used when the metadata does not name one
pub const DEFAULT_ROUTER_IMAGE: &str = "quay.io/frrouting/frr:8.4.1";

/// Default name of the shared capture volume
pub const DEFAULT_SHARED_VOLUME: &str = "lab_state";

/// Keys present in the document that no field consumes
pub type ExtraKeys = BTreeMap<String, serde_yaml::Value>;

/// Intended advertisement reach of an owned prefix
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropagationScope {
    /// Advertised to every peer
    #[default]
    Full,
    /// Kept inside the neighbouring AS (`no-export`)
    Limited,
    /// Not advertised to any peer (`no-advertise`)
    #[serde(rename = "none")]
    Suppressed,
}

impl PropagationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationScope::Full => "full",
            PropagationScope::Limited => "limited",
            PropagationScope::Suppressed => "none",
        }
    }
}

/// Whole lab configuration, one field per top-level section
#[derive(Debug, Serialize, Clone)]
pub struct LabConfig {
    pub version: u32,
    pub metadata: Metadata,
    pub roles: BTreeMap<String, RoleConfig>,
    pub routers: Vec<RouterConfig>,
    pub links: BTreeMap<String, LinkConfig>,
    pub prefix_owners: Vec<PrefixOwnerConfig>,
    pub scenarios: BTreeMap<String, ScenarioConfig>,
    pub services: BTreeMap<String, ServiceConfig>,
    pub pcap_pipeline: PcapPipelineConfig,
}

impl LabConfig {
    /// Collect the dotted path of every key no field consumed.
    pub fn unknown_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        push_extra(&mut keys, "metadata", &self.metadata.extra);
        if let Some(range) = &self.metadata.asn_range {
            push_extra(&mut keys, "metadata.asn_range", &range.extra);
        }
        for (name, role) in &self.roles {
            push_extra(&mut keys, &format!("roles.{}", name), &role.extra);
        }
        for router in &self.routers {
            let prefix = format!("routers[{}]", router.name);
            push_extra(&mut keys, &prefix, &router.extra);
            for (index, peer) in router.peers.iter().enumerate() {
                push_extra(&mut keys, &format!("{}.peers[{}]", prefix, index), &peer.extra);
            }
        }
        for (name, link) in &self.links {
            push_extra(&mut keys, &format!("links.{}", name), &link.extra);
        }
        for (index, owner) in self.prefix_owners.iter().enumerate() {
            push_extra(&mut keys, &format!("prefix_owners[{}]", index), &owner.extra);
        }
        for (key, scenario) in &self.scenarios {
            push_extra(&mut keys, &format!("scenarios.{}", key), &scenario.extra);
        }
        for (name, service) in &self.services {
            push_extra(&mut keys, &format!("services.{}", name), &service.extra);
        }
        push_extra(&mut keys, "pcap_pipeline", &self.pcap_pipeline.extra);
        keys
    }
}

fn push_extra(keys: &mut Vec<String>, prefix: &str, extra: &ExtraKeys) {
    keys.extend(extra.keys().map(|key| format!("{}.{}", prefix, key)));
}

/// Lab-wide metadata
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// ASNs allowed besides the private ranges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn_range: Option<AsnRangeConfig>,
    /// Container image used for every router service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_image: Option<String>,
    /// Subnet of the management network, e.g. "172.30.0.0/24"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mgmt_subnet: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// Inclusive ASN range
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AsnRangeConfig {
    #[serde(deserialize_with = "deserialize_asn")]
    pub min: u64,
    #[serde(deserialize_with = "deserialize_asn")]
    pub max: u64,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// Routing-policy defaults shared by routers of one role
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoleConfig {
    #[serde(default = "default_local_pref")]
    pub local_pref: u32,
    pub export_policy: String,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

fn default_local_pref() -> u32 {
    100
}

/// One router of the lab
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RouterConfig {
    pub name: String,
    #[serde(deserialize_with = "deserialize_asn")]
    pub asn: u64,
    pub role: String,
    pub router_id: String,
    pub mgmt_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loopback: Option<String>,
    /// Prefixes announced with `network` statements
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// A BGP session towards `neighbor` over the shared segment `link`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeerConfig {
    pub neighbor: String,
    pub link: String,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// Shared layer-2 segment between routers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(alias = "subnet")]
    pub ipv4_subnet: String,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// Which router originates a prefix and how far it should travel
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrefixOwnerConfig {
    pub prefix: String,
    pub origin: String,
    #[serde(default)]
    pub scope: PropagationScope,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// Attack scenario exposed to the scenario executor
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub description: String,
    /// Executor routine; defaults to the scenario key
    #[serde(default, alias = "entrypoint", skip_serializing_if = "Option::is_none")]
    pub orchestrator_entrypoint: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// Platform service (controller, observer, ...) run next to the routers
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build context, relative to the generated compose file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Mount the shared capture volume into this service
    #[serde(default)]
    pub mount_state: bool,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

/// Packet-capture pipeline settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PcapPipelineConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_shared_volume")]
    pub shared_volume: String,
    #[serde(flatten)]
    pub extra: ExtraKeys,
}

impl Default for PcapPipelineConfig {
    fn default() -> Self {
        PcapPipelineConfig {
            enabled: false,
            shared_volume: default_shared_volume(),
            extra: ExtraKeys::new(),
        }
    }
}

fn default_shared_volume() -> String {
    DEFAULT_SHARED_VOLUME.to_string()
}

/// Accept an ASN written either as an integer or as an integer string.
fn deserialize_asn<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AsnValue {
        Number(u64),
        Text(String),
    }

    match AsnValue::deserialize(deserializer)? {
        AsnValue::Number(asn) => Ok(asn),
        AsnValue::Text(text) => text.trim().parse::<u64>().map_err(|_| {
            serde::de::Error::custom(format!("ASN '{}' is not an integer", text))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_asn_accepts_string() {
        let yaml = r#"
name: r1
asn: "65001"
role: victim
router_id: 1.1.1.1
mgmt_ip: 172.30.0.11
"#;
        let router: RouterConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(router.asn, 65001);
        assert!(router.peers.is_empty());
        assert!(router.loopback.is_none());
    }

    #[test]
    fn test_router_asn_rejects_garbage() {
        let yaml = r#"
name: r1
asn: "AS65001"
role: victim
router_id: 1.1.1.1
mgmt_ip: 172.30.0.11
"#;
        assert!(serde_yaml::from_str::<RouterConfig>(yaml).is_err());
    }

    #[test]
    fn test_scope_parsing() {
        let yaml = r#"
- { prefix: 10.10.1.0/24, origin: r1 }
- { prefix: 10.10.2.0/24, origin: r1, scope: limited }
- { prefix: 10.10.3.0/24, origin: r1, scope: none }
"#;
        let owners: Vec<PrefixOwnerConfig> = serde_yaml::from_str(yaml).unwrap();
        let scopes: Vec<_> = owners.iter().map(|o| o.scope).collect();
        assert_eq!(
            scopes,
            vec![PropagationScope::Full, PropagationScope::Limited, PropagationScope::Suppressed]
        );
    }

    #[test]
    fn test_extra_keys_are_kept() {
        let yaml = r#"
ipv4_subnet: 10.0.0.0/29
mtu: 9000
"#;
        let link: LinkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(link.ipv4_subnet, "10.0.0.0/29");
        assert!(link.extra.contains_key("mtu"));
    }

    #[test]
    fn test_pcap_defaults() {
        let pcap: PcapPipelineConfig = serde_yaml::from_str("enabled: true").unwrap();
        assert!(pcap.enabled);
        assert_eq!(pcap.shared_volume, DEFAULT_SHARED_VOLUME);
    }
}
