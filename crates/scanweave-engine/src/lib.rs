//! # Scanweave Engine
//!
//! Import orchestration and topology inference.
//! Resolves a parser definition for each upload, persists every accepted
//! record through the graph store, then runs the topology sweep.

pub mod config;
pub mod enrichment;
pub mod importer;
pub mod topology;

pub use config::*;
pub use enrichment::*;
pub use importer::*;
pub use topology::{plan_group, GroupPlan, ObservedTrace, SweepStats, TopologySweep};
