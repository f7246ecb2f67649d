//! Mirror federation management
//!
//! This module owns the set of mirrors the crate may talk to:
//! - Discovering candidates from a public directory page
//! - Health-probing candidates in parallel
//! - Keeping the working subset and picking endpoints from it

mod discovery;
mod pool;
mod prober;

pub use discovery::{discover, parse_directory};
pub use pool::EndpointPool;
pub use prober::{HealthProber, Prober};
