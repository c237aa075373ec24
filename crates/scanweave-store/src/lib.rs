//! # Scanweave Store
//!
//! Network node/edge store with provenance.
//! Nodes merge by (network, address), edges are existence-checked by
//! (network, source, target), and every write appends to the node's
//! provenance trail.

pub mod definitions;
pub mod events;
pub mod persistence;
pub mod provenance;
pub mod store;

pub use definitions::*;
pub use events::*;
pub use persistence::*;
pub use provenance::*;
pub use store::*;
