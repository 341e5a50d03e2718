//! IP address allocation module.
//!
//! This module assigns each router a host address on every link it is
//! attached to. Allocation depends only on router names and link subnets,
//! never on the order entities appear in the configuration.

pub mod registry;
pub mod allocator;

// Re-export commonly used types
pub use registry::AddressPlan;
pub use allocator::{allocate, allocate_link};
