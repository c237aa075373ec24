//! CLI command definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scanweave_core::model::{NetworkEdge, NetworkNode};
use scanweave_engine::{EngineConfig, ImportEngine, ImportRequest, ImportSummary};
use scanweave_import::{detect_grammar, is_legacy_markup, nmap_definition};
use scanweave_store::{
    load_snapshot, save_snapshot, GraphStore, InMemoryDefinitionStore, MemoryGraphStore, TracingEventPublisher,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "scanweave")]
#[command(about = "Import reconnaissance scans into network topology graphs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Import a scan file into a network
    Import {
        /// Target network identifier
        #[arg(short, long)]
        network: String,

        /// Scan file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Parser definition id; detected from the file when omitted
        #[arg(short, long)]
        parser: Option<String>,

        /// JSON file with one parser definition or an array of them
        #[arg(short, long)]
        definitions: Option<PathBuf>,

        /// Snapshot file holding graph state between runs
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Address ranges of the network (CIDR), repeatable
        #[arg(long = "subnet")]
        subnets: Vec<String>,

        /// Engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Report the grammar detected for a file
    Detect {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List nodes of a network
    Nodes {
        #[arg(short, long)]
        state: PathBuf,

        #[arg(short, long)]
        network: String,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List edges of a network
    Edges {
        #[arg(short, long)]
        state: PathBuf,

        #[arg(short, long)]
        network: String,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the built-in nmap parser definition
    Builtin,
}

/// Output format options
#[derive(Clone, Debug, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
}

/// Command execution result; `message` is what gets printed
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

fn render<T: serde::Serialize>(value: &T, format: &OutputFormat, text: impl FnOnce() -> String) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => text(),
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    })
}

/// Execute CLI commands
#[derive(Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> Result<CommandResult> {
        match command {
            Commands::Import {
                network,
                file,
                parser,
                definitions,
                state,
                subnets,
                config,
                format,
            } => {
                self.execute_import(ImportArgs {
                    network,
                    file,
                    parser,
                    definitions,
                    state,
                    subnets,
                    config,
                    format,
                })
                .await
            }
            Commands::Detect { file } => self.execute_detect(&file),
            Commands::Nodes { state, network, format } => self.execute_nodes(&state, &network, format).await,
            Commands::Edges { state, network, format } => self.execute_edges(&state, &network, format).await,
            Commands::Builtin => self.execute_builtin(),
        }
    }

    async fn execute_import(&self, args: ImportArgs) -> Result<CommandResult> {
        let payload = std::fs::read(&args.file).with_context(|| format!("failed to read {}", args.file.display()))?;

        let store = Arc::new(match &args.state {
            Some(path) => load_snapshot(path).await?,
            None => MemoryGraphStore::new(),
        });
        if !args.subnets.is_empty() {
            store.set_network_subnets(&args.network, args.subnets.clone()).await;
        }

        let definitions = match &args.definitions {
            Some(path) => InMemoryDefinitionStore::from_json_file(path)?,
            None => InMemoryDefinitionStore::new(),
        };
        let config = match &args.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };

        let engine = ImportEngine::with_config(
            store.clone(),
            Arc::new(definitions),
            Arc::new(TracingEventPublisher),
            config,
        );

        let mut request = ImportRequest::new(args.network.clone(), payload);
        request.parser_id = args.parser.clone();

        let summary = match engine.import(request).await {
            Ok(summary) => summary,
            Err(e) => {
                return Ok(CommandResult {
                    success: false,
                    message: format!("Import failed [{}]: {}", e.code(), e),
                    data: Some(serde_json::json!({ "error": e.code(), "message": e.to_string() })),
                })
            }
        };

        if let Some(path) = &args.state {
            save_snapshot(&store, path).await?;
            info!(path = %path.display(), "snapshot saved");
        }

        let message = render(&summary, &args.format, || summary_text(&summary))?;
        Ok(CommandResult {
            success: true,
            message,
            data: Some(serde_json::to_value(&summary)?),
        })
    }

    fn execute_detect(&self, file: &Path) -> Result<CommandResult> {
        let payload = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

        let Some(grammar) = detect_grammar(&payload) else {
            return Ok(CommandResult {
                success: false,
                message: format!("{}: unrecognized format", file.display()),
                data: None,
            });
        };

        let legacy = is_legacy_markup(&payload);
        let message = if legacy {
            format!("{}: {} (nmap)", file.display(), grammar)
        } else {
            format!("{}: {}", file.display(), grammar)
        };

        Ok(CommandResult {
            success: true,
            message,
            data: Some(serde_json::json!({ "grammar": grammar, "nmap": legacy })),
        })
    }

    async fn execute_nodes(&self, state: &Path, network: &str, format: OutputFormat) -> Result<CommandResult> {
        let store = load_snapshot(state).await?;
        let nodes = store.list_nodes(network).await?;

        let message = render(&nodes, &format, || {
            let mut output = format!("{} nodes in '{}':\n", nodes.len(), network);
            for node in &nodes {
                output.push_str(&node_line(node));
            }
            output
        })?;

        Ok(CommandResult {
            success: true,
            message,
            data: Some(serde_json::json!({ "count": nodes.len() })),
        })
    }

    async fn execute_edges(&self, state: &Path, network: &str, format: OutputFormat) -> Result<CommandResult> {
        let store = load_snapshot(state).await?;
        let nodes = store.list_nodes(network).await?;
        let edges = store.list_edges(network).await?;

        let addresses: HashMap<_, _> = nodes.iter().map(|n| (n.id, n.address.as_str())).collect();
        let message = render(&edges, &format, || {
            let mut output = format!("{} edges in '{}':\n", edges.len(), network);
            for edge in &edges {
                output.push_str(&edge_line(edge, &addresses));
            }
            output
        })?;

        Ok(CommandResult {
            success: true,
            message,
            data: Some(serde_json::json!({ "count": edges.len() })),
        })
    }

    fn execute_builtin(&self) -> Result<CommandResult> {
        let definition = nmap_definition();
        Ok(CommandResult {
            success: true,
            message: serde_json::to_string_pretty(&definition)?,
            data: Some(serde_json::to_value(&definition)?),
        })
    }
}

/// Arguments of the import command
struct ImportArgs {
    network: String,
    file: PathBuf,
    parser: Option<String>,
    definitions: Option<PathBuf>,
    state: Option<PathBuf>,
    subnets: Vec<String>,
    config: Option<PathBuf>,
    format: OutputFormat,
}

fn summary_text(summary: &ImportSummary) -> String {
    format!(
        "Imported into '{}' using {} ({})\n  records: {} total, {} skipped, {} failed\n  nodes:   {} created, {} updated, {} inferred\n  edges:   {} created",
        summary.network_id,
        summary.definition_id,
        summary.grammar,
        summary.total_hosts,
        summary.hosts_skipped,
        summary.records_failed,
        summary.nodes_created,
        summary.nodes_updated,
        summary.inferred_nodes,
        summary.edges_created,
    )
}

fn node_line(node: &NetworkNode) -> String {
    let ports: Vec<String> = node.services.iter().map(|s| s.port.to_string()).collect();
    format!(
        "  {:<16} {:<12} {:<11} {:<24} [{}]\n",
        node.address,
        node.device_type.as_str(),
        node.status.as_str(),
        node.hostname.as_deref().unwrap_or("-"),
        ports.join(",")
    )
}

fn edge_line(edge: &NetworkEdge, addresses: &HashMap<Uuid, &str>) -> String {
    let source = addresses.get(&edge.source_id).copied().unwrap_or("?");
    let target = addresses.get(&edge.target_id).copied().unwrap_or("?");
    format!(
        "  {} -> {} ({:.2}{})\n",
        source,
        target,
        edge.confidence,
        edge.label.as_deref().map(|l| format!(", {}", l)).unwrap_or_default()
    )
}
