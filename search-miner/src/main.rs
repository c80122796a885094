use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::{error, info};

use search_miner::logging::init_logger;
use search_miner::{aggregations_from_body, Miner, Settings};
use search_miner_ingest::{DataLoader, LoadReport};
use search_miner_repository::Connector;

/// Hits printed in full by the query operation.
const PREVIEW_LIMIT: usize = 5;

#[derive(Parser)]
#[command(name = "search-miner")]
#[command(about = "Load, query, and export data in an Elasticsearch/OpenSearch index", long_about = None)]
struct Cli {
    /// Operation to perform
    #[arg(long, value_enum)]
    operation: Operation,

    /// Index name to work with (default: ES_INDEX)
    #[arg(long)]
    index: Option<String>,

    /// Query body as JSON (aggregations, optionally under `aggs`, for `aggregate`)
    #[arg(long)]
    query: Option<String>,

    /// Output file for exports (default: <index>_export.csv/.json)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Comma-separated fields to export (CSV only)
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,

    /// Input file for load operations
    #[arg(long)]
    input: Option<PathBuf>,

    /// CSV column used as the document id
    #[arg(long)]
    id_field: Option<String>,

    /// Number of sample products to generate
    #[arg(long, default_value = "1000")]
    count: usize,

    /// Documents listed by `query` when no --query is given
    #[arg(long, default_value = "1000")]
    size: usize,

    /// Log file path
    #[arg(long, default_value = "search_miner.log")]
    log_file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// Create the index if it does not exist
    #[value(name = "create_index")]
    CreateIndex,
    /// Export matching documents to CSV
    #[value(name = "export_csv")]
    ExportCsv,
    /// Export matching documents to JSON
    #[value(name = "export_json")]
    ExportJson,
    /// Run a query and preview the hits
    #[value(name = "query")]
    Query,
    /// Count the documents in the index
    #[value(name = "count")]
    Count,
    /// Delete the index if it exists
    #[value(name = "delete_index")]
    DeleteIndex,
    /// Load documents from a JSON file
    #[value(name = "load_json")]
    LoadJson,
    /// Load documents from a CSV file
    #[value(name = "load_csv")]
    LoadCsv,
    /// Create the product index and fill it with generated products
    #[value(name = "generate_sample")]
    GenerateSample,
    /// Run aggregations and print the result
    #[value(name = "aggregate")]
    Aggregate,
    /// Print the index mapping
    #[value(name = "mapping")]
    Mapping,
    /// Retrieve every document through a scroll
    #[value(name = "scan")]
    Scan,
}

/// Everything an operation needs, checked before any connection is opened.
struct Plan {
    operation: Operation,
    index: String,
    query: Option<Value>,
    output: Option<PathBuf>,
    fields: Option<Vec<String>>,
    input: Option<PathBuf>,
    id_field: Option<String>,
    count: usize,
    size: usize,
}

impl Plan {
    fn new(cli: Cli, settings: &Settings) -> Result<Self> {
        let mut query = cli
            .query
            .as_deref()
            .map(|raw| serde_json::from_str::<Value>(raw))
            .transpose()
            .context("Invalid JSON in --query")?;

        if cli.operation == Operation::Aggregate {
            let body = query
                .take()
                .ok_or_else(|| anyhow!("--query is required for the aggregate operation"))?;
            let aggs = aggregations_from_body(body).context("Invalid aggregation body in --query")?;
            query = Some(aggs);
        }

        let needs_input = matches!(cli.operation, Operation::LoadJson | Operation::LoadCsv);
        if needs_input && cli.input.is_none() {
            bail!("--input is required for load operations");
        }

        Ok(Self {
            operation: cli.operation,
            index: cli.index.unwrap_or_else(|| settings.index.clone()),
            query,
            output: cli.output,
            fields: cli.fields,
            input: cli.input,
            id_field: cli.id_field,
            count: cli.count,
            size: cli.size,
        })
    }

    fn output_or(&self, extension: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_export.{}", self.index, extension)))
    }

    fn input(&self) -> Result<&PathBuf> {
        self.input
            .as_ref()
            .ok_or_else(|| anyhow!("--input is required for load operations"))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let guard = match init_logger(cli.verbose, &cli.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        error!("Error executing operation: {:#}", e);
        eprintln!("\nError: {}", e);

        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {}", cause);
        }

        // Flush the file writer; exit skips destructors.
        drop(guard);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    let plan = Plan::new(cli, &settings)?;

    execute(plan, settings).await
}

async fn execute(plan: Plan, settings: Settings) -> Result<()> {
    let connector = Arc::new(
        Connector::connect(&settings.connection_config())
            .await
            .context("Failed to connect to search engine")?,
    );
    let miner = Miner::new(Arc::clone(&connector), plan.index.clone());
    let loader = DataLoader::new(Arc::clone(&connector), plan.index.clone());

    match plan.operation {
        Operation::CreateIndex => {
            let created = connector.create_index(&plan.index, None).await?;
            if created {
                info!("Index '{}' created successfully", plan.index);
            } else {
                info!("Index '{}' already exists", plan.index);
            }
        }
        Operation::DeleteIndex => {
            let deleted = connector.delete_index(&plan.index).await?;
            if deleted {
                info!("Index '{}' deleted successfully", plan.index);
            } else {
                info!("Index '{}' does not exist", plan.index);
            }
        }
        Operation::ExportCsv => {
            let output = plan.output_or("csv");
            let rows = miner
                .export_to_csv(&output, plan.query.clone(), plan.fields.as_deref())
                .await
                .with_context(|| format!("Failed to export to {}", output.display()))?;
            info!("Exported {} documents to CSV: {}", rows, output.display());
        }
        Operation::ExportJson => {
            let output = plan.output_or("json");
            let count = miner
                .export_to_json(&output, plan.query.clone())
                .await
                .with_context(|| format!("Failed to export to {}", output.display()))?;
            info!("Exported {} documents to JSON: {}", count, output.display());
        }
        Operation::Query => {
            let hits = match plan.query.clone() {
                Some(query) => miner.query_documents(query).await?,
                None => miner.get_all_documents(plan.size).await?,
            };
            let hits: Vec<Value> = hits
                .into_iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?;
            print_preview(&hits)?;
        }
        Operation::Count => {
            let count = miner.get_document_count().await?;
            println!("Total documents in index '{}': {}", plan.index, count);
        }
        Operation::LoadJson => {
            let input = plan.input()?;
            let report = loader
                .load_from_json(input)
                .await
                .with_context(|| format!("Failed to load {}", input.display()))?;
            finish_load(&report, &plan.index)?;
        }
        Operation::LoadCsv => {
            let input = plan.input()?;
            let report = loader
                .load_from_csv(input, plan.id_field.as_deref())
                .await
                .with_context(|| format!("Failed to load {}", input.display()))?;
            finish_load(&report, &plan.index)?;
        }
        Operation::GenerateSample => {
            let report = loader.generate_sample_products(plan.count).await?;
            finish_load(&report, &plan.index)?;
        }
        Operation::Aggregate => {
            let aggs = plan
                .query
                .clone()
                .ok_or_else(|| anyhow!("--query is required for the aggregate operation"))?;
            let aggregations = miner.aggregate_data(aggs).await?;
            println!("{}", serde_json::to_string_pretty(&aggregations)?);
        }
        Operation::Mapping => {
            let mapping = miner.get_index_mapping().await?;
            println!("{}", serde_json::to_string_pretty(&mapping)?);
        }
        Operation::Scan => {
            let hits = miner.scan_all_documents().await?;
            println!("Scanned {} documents from index '{}'", hits.len(), plan.index);
        }
    }

    Ok(())
}

fn print_preview(hits: &[Value]) -> Result<()> {
    println!("Found {} documents", hits.len());
    for (position, hit) in hits.iter().take(PREVIEW_LIMIT).enumerate() {
        println!("\nDocument {}:", position + 1);
        println!("{}", serde_json::to_string_pretty(hit)?);
    }
    if hits.len() > PREVIEW_LIMIT {
        println!("\n... and {} more documents", hits.len() - PREVIEW_LIMIT);
    }
    Ok(())
}

fn finish_load(report: &LoadReport, index: &str) -> Result<()> {
    if report.has_failures() {
        bail!(
            "{} of {} documents were rejected by index '{}'",
            report.failed(),
            report.documents,
            index
        );
    }
    println!("Loaded {} documents into index '{}'", report.documents, index);
    Ok(())
}
