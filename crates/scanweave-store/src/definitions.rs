//! Parser definition lookup

use crate::store::StoreError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use scanweave_core::definition::{Grammar, ParserDefinition};
use std::path::Path;
use tokio::sync::RwLock;

/// Read-only view of stored parser definitions
#[async_trait]
pub trait ParserDefinitionStore: Send + Sync {
    async fn get_definition(&self, id: &str) -> Result<Option<ParserDefinition>, StoreError>;

    /// The definition flagged default for a grammar, if any
    async fn default_for(&self, grammar: Grammar) -> Result<Option<ParserDefinition>, StoreError>;
}

/// Definitions held in memory, in registration order
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    definitions: RwLock<Vec<ParserDefinition>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: Vec<ParserDefinition>) -> Self {
        Self {
            definitions: RwLock::new(definitions),
        }
    }

    /// Parse either a single definition object or an array of definitions
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).context("definition file is not valid JSON")?;
        let definitions = if value.is_array() {
            serde_json::from_value::<Vec<ParserDefinition>>(value)?
        } else {
            vec![serde_json::from_value::<ParserDefinition>(value)?]
        };
        Ok(Self::with_definitions(definitions))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read definitions from {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Register a definition, replacing any with the same id
    pub async fn insert(&self, definition: ParserDefinition) {
        let mut definitions = self.definitions.write().await;
        definitions.retain(|d| d.id != definition.id);
        definitions.push(definition);
    }

    pub async fn len(&self) -> usize {
        self.definitions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.definitions.read().await.is_empty()
    }
}

#[async_trait]
impl ParserDefinitionStore for InMemoryDefinitionStore {
    async fn get_definition(&self, id: &str) -> Result<Option<ParserDefinition>, StoreError> {
        let definitions = self.definitions.read().await;
        Ok(definitions.iter().find(|d| d.id == id).cloned())
    }

    async fn default_for(&self, grammar: Grammar) -> Result<Option<ParserDefinition>, StoreError> {
        let definitions = self.definitions.read().await;
        Ok(definitions
            .iter()
            .find(|d| d.is_default && d.grammar == grammar)
            .cloned())
    }
}
