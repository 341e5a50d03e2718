//! # labgen - Topology generator for containerised BGP attack labs
//!
//! This library turns a declarative lab description into everything needed
//! to boot the lab: one FRR configuration per router, a Docker Compose file
//! wiring routers and platform services together, and a topology metadata
//! document for the tooling that drives and observes attack scenarios.
//!
//! ## Pipeline
//!
//! Generation runs five stages in order. Each stage only sees the output
//! of the one before it:
//!
//! 1. **Load** (`config_loader`): parse YAML into [`config::LabConfig`],
//!    reject missing sections and unsupported schema versions
//! 2. **Validate** (`utils::validation`): run every check, collect all
//!    diagnostics, and build the typed [`topology::Topology`]
//! 3. **Allocate** (`ip`): give each router an address on every link it
//!    peers over, deterministically
//! 4. **Render** (`render`): produce the text of every artifact
//! 5. **Write** (`writer`): stage the artifacts and move them into place
//!
//! ## Architecture
//!
//! - `config`: configuration document types and serde parsing
//! - `config_loader`: file loading, section and version checks
//! - `error`: error kinds, diagnostics and exit codes
//! - `topology`: validated topology model and scenario registry
//! - `utils`: ASN and IPv4 helpers, the validator
//! - `ip`: link address allocation and the resulting address plan
//! - `render`: FRR, Docker Compose and metadata rendering
//! - `writer`: staged output writing
//! - `orchestrator`: the whole pipeline behind one call
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use labgen::orchestrator::{self, GenerateOptions};
//! use std::path::Path;
//!
//! let options = GenerateOptions::default();
//! let report = orchestrator::generate(Path::new("lab_config.yaml"), &options)?;
//!
//! // generated_lab/ now contains:
//! // - docker-compose.yml
//! // - topology-metadata.json
//! // - frr/<router>/frr.conf and frr/<router>/daemons
//! println!("{} routers", report.topology.routers.len());
//! # Ok::<(), labgen::error::GenerateError>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! version: 1
//! metadata:
//!   name: bgp-attack-lab
//!   mgmt_subnet: 172.30.0.0/24
//! roles:
//!   victim: { local_pref: 100, export_policy: customer }
//! routers:
//!   - name: r1
//!     asn: 65001
//!     role: victim
//!     router_id: 1.1.1.1
//!     mgmt_ip: 172.30.0.11
//!     networks: [10.10.1.0/24]
//!     peers:
//!       - { neighbor: r2, link: fabric-a }
//!   - name: r2
//!     asn: 65002
//!     role: victim
//!     router_id: 2.2.2.2
//!     mgmt_ip: 172.30.0.12
//!     peers:
//!       - { neighbor: r1, link: fabric-a }
//! links:
//!   fabric-a: { ipv4_subnet: 10.0.0.0/29 }
//! prefix_owners:
//!   - { prefix: 10.10.1.0/24, origin: r1, scope: full }
//! scenarios:
//!   hijack: { description: exact prefix hijack }
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`error::GenerateError`]. Validation failures
//! carry a [`error::ValidationReport`] listing every problem with its
//! kind and location. `GenerateError::exit_code` maps a failure to the CLI
//! exit status.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod ip;
pub mod orchestrator;
pub mod render;
pub mod topology;
pub mod utils;
pub mod writer;
