//! Parser registry resolution and import orchestration
//!
//! An import run moves through `received -> normalizing -> per-record
//! extraction -> persisted -> topology sweep -> summarized`. Only definition
//! resolution and normalization can fail the run; everything after that is
//! counted in the summary instead.

use crate::config::EngineConfig;
use crate::topology::{to_payload, ObservedTrace, TopologySweep};
use scanweave_core::definition::{EdgeGenerationConfig, Grammar, ParserDefinition};
use scanweave_import::{
    detect_grammar, interpret, is_legacy_markup, nmap_definition, normalize, NormalizeError, RecordOutcome,
};
use scanweave_store::definitions::ParserDefinitionStore;
use scanweave_store::events::{EventPublisher, IMPORT_COMPLETED, NODE_CREATED, NODE_UPDATED};
use scanweave_store::store::{GraphStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One import request
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub network_id: String,
    pub payload: Vec<u8>,
    /// Explicit parser definition; sniffing and defaults are used when absent
    pub parser_id: Option<String>,
}

impl ImportRequest {
    pub fn new(network_id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            network_id: network_id.into(),
            payload: payload.into(),
            parser_id: None,
        }
    }

    pub fn with_parser(mut self, parser_id: impl Into<String>) -> Self {
        self.parser_id = Some(parser_id.into());
        self
    }
}

/// Aggregate outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub network_id: String,
    pub grammar: String,
    pub definition_id: String,
    /// Candidate records seen
    pub total_hosts: usize,
    /// Dropped by a skip condition or for lacking a usable address
    pub hosts_skipped: usize,
    /// Records whose node write failed
    pub records_failed: usize,
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub edges_created: usize,
    /// Nodes the sweep created for trace hops or pair endpoints
    pub inferred_nodes: usize,
    pub execution_time_ms: u64,
}

/// Fatal import errors; nothing has been persisted when one of these is returned
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Unsupported or undetectable format")]
    UnsupportedFormat,

    #[error("Parser definition not found: {0}")]
    ParserNotFound(String),

    #[error("Malformed document: {0}")]
    Malformed(NormalizeError),

    #[error("Document rejected: {0}")]
    LimitExceeded(NormalizeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<NormalizeError> for ImportError {
    fn from(error: NormalizeError) -> Self {
        match error {
            NormalizeError::DepthExceeded { .. } | NormalizeError::ElementLimitExceeded { .. } => {
                ImportError::LimitExceeded(error)
            }
            NormalizeError::Malformed { .. } | NormalizeError::InvalidOptions(_) => ImportError::Malformed(error),
        }
    }
}

impl ImportError {
    /// Stable category code for callers
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::PayloadTooLarge { .. } => "payload_too_large",
            ImportError::UnsupportedFormat => "unsupported_format",
            ImportError::ParserNotFound(_) => "parser_not_found",
            ImportError::Malformed(_) => "malformed_document",
            ImportError::LimitExceeded(_) => "limit_exceeded",
            ImportError::Store(_) => "store_failure",
        }
    }
}

/// Import orchestrator over injected collaborators
pub struct ImportEngine {
    store: Arc<dyn GraphStore>,
    definitions: Arc<dyn ParserDefinitionStore>,
    events: Arc<dyn EventPublisher>,
    config: EngineConfig,
}

impl ImportEngine {
    pub fn new(
        store: Arc<dyn GraphStore>,
        definitions: Arc<dyn ParserDefinitionStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::with_config(store, definitions, events, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn GraphStore>,
        definitions: Arc<dyn ParserDefinitionStore>,
        events: Arc<dyn EventPublisher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            definitions,
            events,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    /// Pick the definition for a payload: explicit id, default for the sniffed
    /// grammar, then the built-in nmap definition
    pub async fn resolve_definition(
        &self,
        payload: &[u8],
        parser_id: Option<&str>,
    ) -> Result<ParserDefinition, ImportError> {
        if let Some(id) = parser_id {
            return self
                .definitions
                .get_definition(id)
                .await?
                .ok_or_else(|| ImportError::ParserNotFound(id.to_string()));
        }

        let grammar = detect_grammar(payload).ok_or(ImportError::UnsupportedFormat)?;
        if let Some(definition) = self.definitions.default_for(grammar).await? {
            debug!(grammar = %grammar, definition = %definition.id, "using default definition");
            return Ok(definition);
        }

        if grammar == Grammar::Markup && is_legacy_markup(payload) {
            debug!("no default markup definition, falling back to built-in nmap");
            return Ok(nmap_definition());
        }

        Err(ImportError::UnsupportedFormat)
    }

    /// Run one import to completion
    pub async fn import(&self, request: ImportRequest) -> Result<ImportSummary, ImportError> {
        let start_time = std::time::Instant::now();
        let network_id = request.network_id.as_str();

        if request.payload.len() > self.config.max_upload_bytes {
            return Err(ImportError::PayloadTooLarge {
                size: request.payload.len(),
                limit: self.config.max_upload_bytes,
            });
        }

        let definition = self.resolve_definition(&request.payload, request.parser_id.as_deref()).await?;
        info!(
            network = network_id,
            grammar = %definition.grammar,
            definition = %definition.id,
            bytes = request.payload.len(),
            "starting import"
        );

        let document = normalize(
            &request.payload,
            definition.grammar,
            &definition.delimited,
            &self.config.limits,
        )?;

        let mut summary = ImportSummary {
            network_id: network_id.to_string(),
            grammar: definition.grammar.to_string(),
            definition_id: definition.id.clone(),
            ..Default::default()
        };

        let pair_fields = match &definition.edge_generation {
            Some(EdgeGenerationConfig::ConnectionPairs {
                source_field,
                target_field,
                ..
            }) => Some((source_field.as_str(), target_field.as_str())),
            _ => None,
        };

        let mut traces = Vec::new();
        let mut pairs = Vec::new();
        let source_tag = self.config.source_tag.as_str();

        for outcome in interpret(&document, &definition) {
            summary.total_hosts += 1;

            let record = match outcome {
                RecordOutcome::Skipped(_) => {
                    summary.hosts_skipped += 1;
                    continue;
                }
                RecordOutcome::Accepted(record) => record,
            };

            if let Some((source_field, target_field)) = pair_fields {
                if let (Some(from), Some(to)) = (record.text(source_field), record.text(target_field)) {
                    pairs.push((from, to));
                }
            }

            let Some(upsert) = record.to_upsert() else {
                debug!(network = network_id, record = summary.total_hosts, "record has no usable address");
                summary.hosts_skipped += 1;
                continue;
            };
            let address = upsert.address.clone();

            match self.store.upsert_node(network_id, upsert, source_tag).await {
                Ok(outcome) => {
                    let event = if outcome.created {
                        summary.nodes_created += 1;
                        NODE_CREATED
                    } else {
                        summary.nodes_updated += 1;
                        NODE_UPDATED
                    };
                    self.events.publish(event, to_payload(&outcome.node)).await;

                    traces.extend(record.traces.into_iter().map(|sequence| ObservedTrace {
                        target: outcome.node.address.clone(),
                        sequence,
                    }));
                }
                Err(e) => {
                    warn!(network = network_id, address = %address, error = %e, "failed to persist record");
                    summary.records_failed += 1;
                }
            }
        }

        let mut sweep = TopologySweep::new(
            self.store.as_ref(),
            self.events.as_ref(),
            &self.config.topology,
            network_id,
            source_tag,
        );
        sweep.trace_edges(&traces, &definition.edge_mappings).await;

        match &definition.edge_generation {
            Some(EdgeGenerationConfig::Subnet) if sweep.stats().trace_pairs == 0 => {
                if let Err(e) = sweep.subnet_edges().await {
                    warn!(network = network_id, error = %e, "subnet synthesis failed");
                }
            }
            Some(EdgeGenerationConfig::ConnectionPairs {
                kind, confidence, label, ..
            }) => {
                sweep.pair_edges(&pairs, *kind, *confidence, label.as_deref()).await;
            }
            _ => {}
        }
        sweep.log_summary();

        let stats = sweep.stats();
        summary.edges_created = stats.edges_created;
        summary.inferred_nodes = stats.nodes_created;
        summary.execution_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            network = network_id,
            grammar = %summary.grammar,
            total = summary.total_hosts,
            skipped = summary.hosts_skipped,
            created = summary.nodes_created,
            updated = summary.nodes_updated,
            edges = summary.edges_created,
            "import complete"
        );
        self.events.publish(IMPORT_COMPLETED, to_payload(&summary)).await;

        Ok(summary)
    }
}
