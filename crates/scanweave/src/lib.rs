//! # Scanweave
//!
//! Turns reconnaissance artifacts (nmap XML, JSON exports, delimited
//! inventories) into a per-network graph of hosts and links.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scanweave::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryGraphStore::new());
//!     let engine = ImportEngine::new(
//!         store.clone(),
//!         Arc::new(InMemoryDefinitionStore::new()),
//!         Arc::new(TracingEventPublisher),
//!     );
//!
//!     let payload = std::fs::read("scan.xml")?;
//!     let summary = engine.import(ImportRequest::new("lab", payload)).await?;
//!     println!("{} nodes created, {} edges", summary.nodes_created, summary.edges_created);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`scanweave-core`**: node/edge model and parser definitions
//! - **`scanweave-store`**: graph store, definition registry, events, snapshots
//! - **`scanweave-import`**: grammar sniffing, normalization, field mapping, rules
//! - **`scanweave-engine`**: import orchestration and topology inference
//! - **`scanweave-cli`**: command-line interface
//!
//! ## Feature Flags
//!
//! - `full` (default): all crates
//! - `core`, `store`, `import`, `engine`, `cli`: individual layers

#[cfg(feature = "scanweave-core")]
pub use scanweave_core::{definition, model};

#[cfg(feature = "scanweave-store")]
pub use scanweave_store as store;

#[cfg(feature = "scanweave-import")]
pub use scanweave_import as import;

#[cfg(feature = "scanweave-engine")]
pub use scanweave_engine as engine;

#[cfg(feature = "scanweave-cli")]
pub use scanweave_cli as cli;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "scanweave-core")]
    pub use scanweave_core::definition::{EdgeGenerationConfig, FieldMapping, Grammar, ParserDefinition};
    #[cfg(feature = "scanweave-core")]
    pub use scanweave_core::model::{DeviceType, NetworkEdge, NetworkNode, NodeStatus, NodeUpsert};

    #[cfg(feature = "scanweave-store")]
    pub use scanweave_store::{
        GraphStore, InMemoryDefinitionStore, MemoryGraphStore, ParserDefinitionStore, TracingEventPublisher,
    };

    #[cfg(feature = "scanweave-import")]
    pub use scanweave_import::{detect_grammar, nmap_definition};

    #[cfg(feature = "scanweave-engine")]
    pub use scanweave_engine::{EngineConfig, Enricher, ImportEngine, ImportError, ImportRequest, ImportSummary};

    // Common external types
    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
    pub use tokio;
}

/// Current version of Scanweave
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check function
///
/// Returns basic information to verify which layers are compiled in.
pub fn health_check() -> serde_json::Value {
    serde_json::json!({
        "status": "healthy",
        "version": VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "modules": {
            "core": cfg!(feature = "scanweave-core"),
            "store": cfg!(feature = "scanweave-store"),
            "import": cfg!(feature = "scanweave-import"),
            "engine": cfg!(feature = "scanweave-engine"),
            "cli": cfg!(feature = "scanweave-cli")
        }
    })
}
