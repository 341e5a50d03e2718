use crate::config::{
    LabConfig, Metadata, PcapPipelineConfig, PrefixOwnerConfig, RoleConfig, RouterConfig,
    ScenarioConfig, ServiceConfig, LinkConfig, SUPPORTED_SCHEMA_VERSION,
};
use crate::error::GenerateError;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level sections every configuration must carry
pub const REQUIRED_SECTIONS: [&str; 7] = [
    "version",
    "metadata",
    "roles",
    "routers",
    "links",
    "prefix_owners",
    "scenarios",
];

/// Top-level sections that fall back to defaults when absent
pub const OPTIONAL_SECTIONS: [&str; 2] = ["services", "pcap_pipeline"];

/// A parsed configuration plus the non-fatal findings of the loader
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: LabConfig,
    pub warnings: Vec<String>,
}

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<LoadedConfig, GenerateError> {
    info!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(config_path)
        .map_err(|e| GenerateError::io("read configuration", config_path, e))?;

    parse_config(&content)
}

/// Parse configuration text into a [`LabConfig`].
///
/// Only structure and types are checked here. Cross references, ranges
/// and uniqueness belong to the validator.
pub fn parse_config(content: &str) -> Result<LoadedConfig, GenerateError> {
    let document: Value = serde_yaml::from_str(content)
        .map_err(|e| schema_error("<document>", format!("not valid YAML: {}", e)))?;

    let mut root = match document {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Err(schema_error("<document>", "configuration is empty")),
        _ => {
            return Err(schema_error(
                "<document>",
                "top level must be a mapping of sections",
            ))
        }
    };

    for section in REQUIRED_SECTIONS {
        if !root.contains_key(section) {
            return Err(schema_error(section, "required section is missing"));
        }
    }

    let version = check_version(take(&mut root, "version"))?;

    let metadata: Metadata = section(&mut root, "metadata")?;
    let roles: BTreeMap<String, RoleConfig> = section(&mut root, "roles")?;
    let routers: Vec<RouterConfig> = section(&mut root, "routers")?;
    let links: BTreeMap<String, LinkConfig> = section(&mut root, "links")?;
    let prefix_owners: Vec<PrefixOwnerConfig> = section(&mut root, "prefix_owners")?;
    let scenarios: BTreeMap<String, ScenarioConfig> = section(&mut root, "scenarios")?;
    let services: BTreeMap<String, ServiceConfig> = optional_section(&mut root, "services")?;
    let pcap_pipeline: PcapPipelineConfig = optional_section(&mut root, "pcap_pipeline")?;

    let config = LabConfig {
        version,
        metadata,
        roles,
        routers,
        links,
        prefix_owners,
        scenarios,
        services,
        pcap_pipeline,
    };

    // Everything left in the root mapping is unknown to this schema
    let mut warnings: Vec<String> = root
        .keys()
        .map(|key| format!("unknown top-level section '{}' ignored", key_name(key)))
        .collect();
    warnings.extend(
        config
            .unknown_keys()
            .into_iter()
            .map(|key| format!("unknown key '{}' ignored", key)),
    );
    for warning in &warnings {
        warn!("{}", warning);
    }

    info!(
        "Loaded lab '{}' with {} routers and {} links",
        config.metadata.name,
        config.routers.len(),
        config.links.len()
    );

    Ok(LoadedConfig { config, warnings })
}

fn check_version(value: Value) -> Result<u32, GenerateError> {
    let version = match &value {
        Value::Number(number) => number.as_u64(),
        _ => None,
    };
    match version {
        Some(v) if v == u64::from(SUPPORTED_SCHEMA_VERSION) => Ok(SUPPORTED_SCHEMA_VERSION),
        Some(v) => Err(schema_error(
            "version",
            format!("unsupported schema version {}", v),
        )),
        None => Err(schema_error(
            "version",
            format!("schema version must be an integer, found {}", describe(&value)),
        )),
    }
}

fn take(root: &mut Mapping, key: &str) -> Value {
    root.remove(key).unwrap_or(Value::Null)
}

fn section<T: DeserializeOwned>(root: &mut Mapping, name: &str) -> Result<T, GenerateError> {
    let value = take(root, name);
    serde_yaml::from_value(value).map_err(|e| schema_error(name, e.to_string()))
}

fn optional_section<T: DeserializeOwned + Default>(
    root: &mut Mapping,
    name: &str,
) -> Result<T, GenerateError> {
    match root.remove(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_yaml::from_value(value).map_err(|e| schema_error(name, e.to_string())),
    }
}

fn schema_error(section: &str, message: impl Into<String>) -> GenerateError {
    GenerateError::Schema {
        section: section.to_string(),
        expected_version: SUPPORTED_SCHEMA_VERSION,
        message: message.into(),
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => describe(other),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "nothing".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(_) => "a tagged value".to_string(),
    }
}
