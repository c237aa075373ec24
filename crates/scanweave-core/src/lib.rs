//! # Scanweave Core
//!
//! Network topology data model (nodes, edges, provenance) and the typed
//! parser definitions that drive reconnaissance imports.

pub mod definition;
pub mod model;

pub use definition::*;
pub use model::*;
