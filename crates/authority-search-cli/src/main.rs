use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use authority_search_config::AuthorityConfig;
use authority_search_core::{
    CandidateRecord, OrderingMetadata, ResultOrderer, SearchResult, SortableResult,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "authq")]
#[command(about = "Linked-data authority result ordering CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Order a batch of search results with an authority's sort configuration.
    Order(OrderArgs),
    /// Inspect authority configuration documents.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the sort predicates an authority configuration declares.
    Show(ConfigSourceArgs),
}

#[derive(Debug, Args)]
struct ConfigSourceArgs {
    #[arg(long, conflicts_with_all = ["authority_dir", "authority"])]
    config: Option<PathBuf>,
    #[arg(long, requires = "authority")]
    authority_dir: Option<PathBuf>,
    #[arg(long, requires = "authority_dir")]
    authority: Option<String>,
}

impl ConfigSourceArgs {
    fn load(&self) -> Result<AuthorityConfig> {
        match (&self.config, &self.authority_dir, &self.authority) {
            (Some(path), _, _) => AuthorityConfig::load(path)
                .with_context(|| format!("failed to load authority config {}", path.display())),
            (None, Some(dir), Some(name)) => AuthorityConfig::load_authority(dir, name)
                .with_context(|| format!("failed to load authority `{name}`")),
            _ => Err(anyhow!("either --config or --authority-dir with --authority MUST be provided")),
        }
    }
}

#[derive(Debug, Args)]
struct OrderArgs {
    #[command(flatten)]
    source: ConfigSourceArgs,
    /// JSON array of records; read from stdin when omitted.
    #[arg(long)]
    records: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = InputFormat::Sortable)]
    input_format: InputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Records carry a resolved `sort` term list.
    Sortable,
    /// Records carry per-predicate `values` to resolve against the configuration.
    Candidates,
}

#[derive(Debug, Serialize)]
struct OrderResponse {
    determinism: OrderingMetadata,
    result_count: usize,
    results: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
struct ConfigShowResponse {
    supports_sort: bool,
    sort_predicates: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Versioned<'a, T> {
    contract_version: &'static str,
    #[serde(flatten)]
    payload: &'a T,
}

fn emit_json<T: Serialize>(payload: &T) -> Result<()> {
    let versioned = Versioned { contract_version: CLI_CONTRACT_VERSION, payload };
    println!("{}", serde_json::to_string_pretty(&versioned)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries the JSON contract, so logs go to stderr.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Order(args) => run_order(&args),
        Command::Config { command } => run_config(&command),
    }
}

fn run_order(args: &OrderArgs) -> Result<()> {
    let config = args.source.load()?;
    let orderer = ResultOrderer::new(config.sort_policy().context("invalid sort configuration")?);
    let body = read_records_body(args.records.as_deref())?;

    let results = match args.input_format {
        InputFormat::Sortable => {
            let records: Vec<SortableResult> =
                serde_json::from_str(&body).context("records MUST be a JSON array of results")?;
            orderer.order(records)
        }
        InputFormat::Candidates => {
            let records: Vec<CandidateRecord> = serde_json::from_str(&body)
                .context("records MUST be a JSON array of candidate records")?;
            orderer.order_candidates(records)
        }
    };
    tracing::info!("Ordered {} search results", results.len());

    let response =
        OrderResponse { determinism: orderer.determinism(), result_count: results.len(), results };
    emit_json(&response).context("failed to serialize ordered results")
}

fn run_config(command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show(source) => {
            let config = source.load()?;
            let policy = config.sort_policy().context("invalid sort configuration")?;
            let response = ConfigShowResponse {
                supports_sort: policy.is_enabled(),
                sort_predicates: policy
                    .predicates()
                    .iter()
                    .map(|predicate| predicate.as_str().to_string())
                    .collect(),
            };
            emit_json(&response).context("failed to serialize config")
        }
    }
}

fn read_records_body(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read records file {}", path.display())),
        None => {
            let mut body = String::new();
            io::stdin().read_to_string(&mut body).context("failed to read records from stdin")?;
            Ok(body)
        }
    }
}
