//! Domain layer - Wire model and port definitions
//!
//! This module defines the data exchanged with OneFS and the traits
//! (ports) that the client, the dry-run wrapper and test doubles implement.

pub mod model;
pub mod ports;

pub use model::*;
pub use ports::*;
