//! Generation orchestrator.
//!
//! This module runs the pipeline end to end: load the configuration,
//! validate it, allocate link addresses, render the artifacts and write
//! them. Each call builds its own session; nothing is cached between runs.

use crate::config::LabConfig;
use crate::config_loader::{self, LoadedConfig};
use crate::error::GenerateError;
use crate::ip::allocate;
use crate::render::{ArtifactSet, GeneratorSession};
use crate::topology::Topology;
use crate::utils::validation::validate;
use crate::writer::{write_artifacts, WriteOptions, WriteSummary};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default location of the lab configuration
pub const DEFAULT_CONFIG_PATH: &str = "lab_config.yaml";
/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = "generated_lab";

/// Options of one `generate` run
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub output_dir: PathBuf,
    /// Stop after validation; nothing is written
    pub validate_only: bool,
    pub force: bool,
    pub metadata_targets: Vec<PathBuf>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            validate_only: false,
            force: false,
            metadata_targets: Vec::new(),
        }
    }
}

/// Result of a successful run
#[derive(Debug)]
pub struct GenerateReport {
    pub topology: Topology,
    /// Non-fatal findings of the loader
    pub warnings: Vec<String>,
    /// `None` in validate-only mode
    pub written: Option<WriteSummary>,
}

/// Router overview logged after loading
#[derive(Serialize, Debug)]
pub struct RouterSummary {
    pub name: String,
    pub asn: u64,
    pub role: String,
    pub prefixes: Vec<String>,
}

/// Summarize the routers of a configuration.
pub fn summarize(config: &LabConfig) -> Vec<RouterSummary> {
    config
        .routers
        .iter()
        .map(|router| RouterSummary {
            name: router.name.clone(),
            asn: router.asn,
            role: router.role.clone(),
            prefixes: router.networks.clone(),
        })
        .collect()
}

/// Load and validate a configuration file.
pub fn load_and_validate(config_path: &Path) -> Result<(Topology, Vec<String>), GenerateError> {
    let loaded = config_loader::load_config(config_path)?;
    validate_loaded(loaded)
}

fn validate_loaded(loaded: LoadedConfig) -> Result<(Topology, Vec<String>), GenerateError> {
    let LoadedConfig { config, warnings } = loaded;

    match serde_json::to_string(&summarize(&config)) {
        Ok(summary) => info!("Loaded {} routers: {}", config.routers.len(), summary),
        Err(e) => info!("Loaded {} routers (summary unavailable: {})", config.routers.len(), e),
    }

    let topology = validate(&config).map_err(GenerateError::Validation)?;
    info!(
        "Configuration is valid: {} routers, {} links, {} scenarios",
        topology.routers.len(),
        topology.links.len(),
        topology.scenarios.len()
    );
    Ok((topology, warnings))
}

/// Allocate addresses and render every artifact of a validated topology.
pub fn render_topology(topology: &Topology) -> Result<ArtifactSet, GenerateError> {
    let plan = allocate(topology)?;
    let session = GeneratorSession::new(topology, &plan);
    session.render()
}

/// Run the whole pipeline for a configuration file.
pub fn generate(config_path: &Path, options: &GenerateOptions) -> Result<GenerateReport, GenerateError> {
    info!("Generating lab from {}", config_path.display());
    let loaded = config_loader::load_config(config_path)?;
    run(loaded, options)
}

/// Run the whole pipeline for configuration text.
pub fn generate_from_str(yaml: &str, options: &GenerateOptions) -> Result<GenerateReport, GenerateError> {
    let loaded = config_loader::parse_config(yaml)?;
    run(loaded, options)
}

fn run(loaded: LoadedConfig, options: &GenerateOptions) -> Result<GenerateReport, GenerateError> {
    let (topology, warnings) = validate_loaded(loaded)?;

    if options.validate_only {
        info!("Validation only, no artifacts written");
        return Ok(GenerateReport {
            topology,
            warnings,
            written: None,
        });
    }

    let artifacts = render_topology(&topology)?;
    let write_options = WriteOptions {
        force: options.force,
        metadata_targets: options.metadata_targets.clone(),
    };
    let summary = write_artifacts(&artifacts, &options.output_dir, &write_options)?;

    Ok(GenerateReport {
        topology,
        warnings,
        written: Some(summary),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::render::tests::LAB;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn options(dir: &Path) -> GenerateOptions {
        GenerateOptions {
            output_dir: dir.join("lab"),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LAB.as_bytes()).unwrap();
        let root = TempDir::new().unwrap();

        let report = generate(file.path(), &options(root.path())).unwrap();
        let written = report.written.unwrap();
        assert_eq!(written.files.len(), 2 + 2 * 3);
        assert!(root.path().join("lab/frr/r2/frr.conf").exists());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_validate_only_writes_nothing() {
        let root = TempDir::new().unwrap();
        let opts = GenerateOptions {
            validate_only: true,
            ..options(root.path())
        };
        let report = generate_from_str(LAB, &opts).unwrap();
        assert!(report.written.is_none());
        assert!(!root.path().join("lab").exists());
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let root = TempDir::new().unwrap();
        let err = generate_from_str(&LAB.replace("asn: 65003", "asn: 70000"), &options(root.path()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(err.exit_code(), 1);
        assert!(!root.path().join("lab").exists());
    }

    #[test]
    fn test_summarize_lists_routers() {
        let loaded = config_loader::parse_config(LAB).unwrap();
        let summary = summarize(&loaded.config);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].name, "r1");
        assert_eq!(summary[0].prefixes, vec!["10.10.1.0/24", "10.10.2.0/24"]);
    }
}
