//! Jobwatch CLI - Command-line interface for the Jobwatch daemon
//! Queries go over JSON-RPC; `reconcile` works offline on CSV files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use jobwatch_core::application::{JobQuery, ReconcileService};
use jobwatch_core::domain::{JobFields, JobRecord};
use jobwatch_core::port::time_provider::SystemTimeProvider;
use jobwatch_core::port::TimeProvider;
use jobwatch_infra_csv::CsvRecordStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9531";
const BUSY_CODE: i32 = 4002;
const TITLE_WIDTH: usize = 48;

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(about = "Jobwatch CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "JOBWATCH_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored postings
    List {
        /// Company (case-insensitive exact match)
        #[arg(short, long)]
        company: Option<String>,

        /// Source name
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        work_type: Option<String>,

        #[arg(long)]
        employment_type: Option<String>,

        /// Substring of title, company, description or requirements
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value = "first_seen",
              value_parser = ["first_seen", "last_updated", "title", "company", "location"])]
        sort: String,

        #[arg(long, default_value = "desc", value_parser = ["asc", "desc"])]
        order: String,

        #[arg(short, long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "20")]
        page_size: usize,
    },

    /// Show one posting
    Show {
        /// Identity key (as printed by `list`)
        key: String,
    },

    /// Store statistics
    Stats,

    /// Run a scrape cycle now
    Run,

    /// Show the last completed cycle
    Last,

    /// Show daemon status
    Status,

    /// Merge candidates from a JSON file into a store, without the daemon
    Reconcile {
        /// JSON array of candidate postings
        #[arg(short, long)]
        input: PathBuf,

        /// Store CSV file
        #[arg(long)]
        store: PathBuf,

        /// Delta CSV file (this run's new postings)
        #[arg(long)]
        delta: PathBuf,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error ({}): {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "First seen")]
    first_seen: String,
    company: String,
    title: String,
    location: String,
    source: String,
    key: String,
}

impl JobRow {
    fn from_entry(entry: &Value) -> Self {
        let text = |field: &str| entry[field].as_str().unwrap_or_default().to_string();
        Self {
            first_seen: text("firstSeenAt").chars().take(16).collect(),
            company: text("company"),
            title: truncate(&text("title"), TITLE_WIDTH),
            location: text("location"),
            source: text("sourceName"),
            key: text("identityKey"),
        }
    }
}

#[derive(Deserialize, Tabled)]
struct GroupRow {
    name: String,
    count: usize,
}

#[derive(Deserialize, Tabled)]
struct SourceRow {
    source: String,
    candidates: usize,
    #[tabled(rename = "ms")]
    #[serde(rename = "durationMs")]
    duration_ms: i64,
    #[tabled(display_with = "display_error")]
    error: Option<String>,
}

/// A refused trigger is not a failure: the running cycle will do the work
fn is_busy(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<JsonRpcError>(), Some(rpc) if rpc.code == BUSY_CODE)
}

fn display_error(error: &Option<String>) -> String {
    error.clone().unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        return Err(error.into());
    }

    // `null` is a valid result (e.g. no cycle yet)
    Ok(response.result.unwrap_or(Value::Null))
}

fn print_cycle(summary: &Value) {
    println!("  {} {}", "Cycle:".bold(), summary["cycleId"].as_str().unwrap_or("-"));
    println!("  {} {}", "Started:".bold(), summary["startedAt"].as_str().unwrap_or("-"));
    println!("  {} {}", "Finished:".bold(), summary["finishedAt"].as_str().unwrap_or("-"));
    println!(
        "  {} {} candidates, {} dropped, {} updated",
        "Input:".bold(),
        summary["candidates"],
        summary["dropped"],
        summary["updated"]
    );
    println!(
        "  {} {} new, {} total",
        "Store:".bold(),
        summary["newCount"].to_string().green().bold(),
        summary["totalRecords"]
    );
    if let Some(err) = summary["notificationError"].as_str() {
        println!("  {} {}", "Notification failed:".red().bold(), err);
    }

    if let Ok(sources) = serde_json::from_value::<Vec<SourceRow>>(summary["sources"].clone()) {
        if !sources.is_empty() {
            println!();
            println!("{}", Table::new(sources));
        }
    }

    if let Some(new_jobs) = summary["newJobs"].as_array() {
        if !new_jobs.is_empty() {
            println!();
            println!("{}", "New postings:".cyan().bold());
            for job in new_jobs {
                println!(
                    "  {} {} - {}",
                    "•".bold(),
                    job["company"].as_str().unwrap_or_default(),
                    job["title"].as_str().unwrap_or_default()
                );
            }
        }
    }
}

async fn reconcile_offline(input: PathBuf, store: PathBuf, delta: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let fields: Vec<JobFields> =
        serde_json::from_str(&raw).context("Input must be a JSON array of postings")?;

    let time_provider = Arc::new(SystemTimeProvider);
    let now = time_provider.now();
    let candidates: Vec<JobRecord> = fields
        .into_iter()
        .map(|f| JobRecord::create(f, now))
        .collect();

    let service = ReconcileService::new(
        Arc::new(CsvRecordStore::new(&store, time_provider.clone())),
        Arc::new(CsvRecordStore::new(&delta, time_provider.clone())),
        time_provider,
    );
    let outcome = service
        .reconcile(candidates)
        .await
        .context("Reconciliation failed")?;

    println!("{}", "✓ Reconciled".green().bold());
    println!("  {} {}", "Store:".bold(), store.display());
    println!("  {} {}", "Delta:".bold(), delta.display());
    println!(
        "  {} {} new, {} updated, {} dropped, {} total",
        "Result:".bold(),
        outcome.new_records.len().to_string().green().bold(),
        outcome.updated,
        outcome.dropped,
        outcome.all_records.len()
    );
    for record in &outcome.new_records {
        println!("  {} {} - {}", "•".bold(), record.company, record.title);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            company,
            source,
            location,
            work_type,
            employment_type,
            search,
            sort,
            order,
            page,
            page_size,
        } => {
            let query = JobQuery {
                company,
                source,
                location,
                work_type,
                employment_type,
                search,
                sort: serde_json::from_value(json!(sort))?,
                order: serde_json::from_value(json!(order))?,
                page,
                page_size,
            };
            let params = serde_json::to_value(&query)?;

            let result = call_rpc(&cli.rpc_url, "jobs.list.v1", params).await?;
            let items = result["items"].as_array().cloned().unwrap_or_default();

            if items.is_empty() {
                println!("{}", "No postings match".yellow());
            } else {
                let rows: Vec<JobRow> = items.iter().map(JobRow::from_entry).collect();
                println!("{}", Table::new(rows));
            }
            println!(
                "{}",
                format!(
                    "Page {}/{} ({} postings)",
                    result["page"], result["totalPages"], result["total"]
                )
                .dimmed()
            );
        }

        Commands::Show { key } => {
            let result = call_rpc(&cli.rpc_url, "jobs.get.v1", json!({ "identityKey": key })).await?;

            println!(
                "{}",
                format!(
                    "{} - {}",
                    result["company"].as_str().unwrap_or_default(),
                    result["title"].as_str().unwrap_or_default()
                )
                .cyan()
                .bold()
            );
            println!();
            for (label, field) in [
                ("Location", "location"),
                ("Job ID", "externalJobId"),
                ("Posted", "postedDate"),
                ("Work type", "workType"),
                ("Employment", "employmentType"),
                ("Salary", "salary"),
                ("Experience", "experience"),
                ("Link", "applyLink"),
                ("Source", "sourceName"),
                ("First seen", "firstSeenAt"),
                ("Last updated", "lastUpdatedAt"),
            ] {
                let value = result[field].as_str().unwrap_or_default();
                if !value.is_empty() {
                    println!("  {} {}", format!("{}:", label).bold(), value);
                }
            }
            for (label, field) in [("Description", "description"), ("Requirements", "requirements")] {
                let value = result[field].as_str().unwrap_or_default();
                if !value.is_empty() {
                    println!();
                    println!("{}", label.bold());
                    println!("{}", value);
                }
            }
        }

        Commands::Stats => {
            let stats = call_rpc(&cli.rpc_url, "jobs.stats.v1", json!({})).await?;

            println!("{}", "Store Statistics".cyan().bold());
            println!();
            println!("  {} {}", "Total postings:".bold(), stats["total"]);
            println!(
                "  {} {}",
                "Newest first seen:".bold(),
                stats["newestFirstSeen"].as_str().unwrap_or("-")
            );
            println!(
                "  {} {}",
                "Latest update:".bold(),
                stats["latestUpdate"].as_str().unwrap_or("-")
            );

            for (title, field) in [("By company", "byCompany"), ("By source", "bySource")] {
                let groups: Vec<GroupRow> =
                    serde_json::from_value(stats[field].clone()).unwrap_or_default();
                if !groups.is_empty() {
                    println!();
                    println!("{}", title.bold());
                    println!("{}", Table::new(groups));
                }
            }
        }

        Commands::Run => {
            println!("{}", "Running scrape cycle...".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "cycle.run.v1", json!({})).await {
                Ok(summary) => {
                    println!("{}", "✓ Cycle completed".green().bold());
                    print_cycle(&summary);
                }
                Err(e) if is_busy(&e) => {
                    println!("{}", "A cycle is already running, try again later".yellow());
                }
                Err(e) => {
                    println!("  {} Cycle failed", "✗".red());
                    return Err(e);
                }
            }
        }

        Commands::Last => {
            let summary = call_rpc(&cli.rpc_url, "cycle.last.v1", json!({})).await?;
            if summary.is_null() {
                println!("{}", "No cycle has completed since the daemon started".yellow());
            } else {
                println!("{}", "Last Cycle".cyan().bold());
                println!();
                print_cycle(&summary);
            }
        }

        Commands::Status => {
            println!("{}", "Daemon Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.health.v1", json!({})).await {
                Ok(health) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!("  {} {}", "Version:".bold(), health["version"].as_str().unwrap_or("-"));
                    println!("  {} {} seconds", "Uptime:".bold(), health["uptimeSeconds"]);
                    let running = health["cycleRunning"].as_bool().unwrap_or(false);
                    println!(
                        "  {} {}",
                        "Cycle:".bold(),
                        if running { "RUNNING".yellow() } else { "IDLE".normal() }
                    );
                    let sources: Vec<&str> = health["sources"]
                        .as_array()
                        .map(|a| a.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default();
                    println!("  {} {}", "Sources:".bold(), sources.join(", "));
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Reconcile {
            input,
            store,
            delta,
        } => reconcile_offline(input, store, delta).await?,
    }

    Ok(())
}
