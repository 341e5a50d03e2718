//! Validated lab topology.
//!
//! The validator turns a [`crate::config::LabConfig`] into a [`Topology`]
//! whose addresses, prefixes and scenario kinds are already parsed. The
//! allocator and the renderer only ever see this model.

pub mod types;
pub mod scenario;

// Re-export key types for easier access
pub use types::{LabInfo, Link, Peer, PcapPipeline, PlatformService, PrefixOwner, Role, Router, Topology};
pub use scenario::{Scenario, ScenarioKind, ScenarioRegistry, UnknownScenario};
pub use crate::config::PropagationScope;
