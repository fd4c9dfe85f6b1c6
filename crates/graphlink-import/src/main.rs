//! CLI entry point for the graphlink relationship importer.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use graphlink_core::{EndpointMapping, RelationshipMapping};
use graphlink_graph::{DryRun, GraphClient, UpsertExecutor};

use graphlink_import::config::{self, ImportConfig};
use graphlink_import::engine::ImportEngine;
use graphlink_import::orchestrator::{ImportJob, ImportPlan, Orchestrator, RunReport};
use graphlink_import::source::CsvRowSource;

#[derive(Parser)]
#[command(name = "graphlink")]
#[command(about = "Create relationships between existing graph nodes from CSV files")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: graphlink).
    #[arg(short, long, default_value = "graphlink", global = true)]
    config: String,

    /// Also write the run report as JSON to this path.
    #[arg(long, global = true)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every enabled job from the configuration.
    Run {
        /// Classify rows without writing to the graph.
        #[arg(long)]
        dry_run: bool,
    },
    /// Import a single relationship type from one CSV file.
    Link {
        /// CSV file; the first record is the header.
        #[arg(long)]
        source: PathBuf,
        /// Source endpoint as Label:KeyProperty:column (column number or header name).
        #[arg(long)]
        from: EndpointMapping,
        /// Target endpoint as Label:KeyProperty:column.
        #[arg(long)]
        to: EndpointMapping,
        /// Relationship type to create.
        #[arg(long)]
        rel: String,
        /// Classify rows without writing to the graph.
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate configuration, sources and the graph connection.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "graphlink failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let cfg = config::load(&cli.config)?;
    let import = config::import_config(&cfg)?;

    let (plan, dry_run) = match cli.command {
        Command::Check => return check(&cfg, &import).await,
        Command::Run { dry_run } => (import.plan()?, dry_run),
        Command::Link {
            source,
            from,
            to,
            rel,
            dry_run,
        } => {
            let mapping = RelationshipMapping::new(from, to, rel)?;
            let plan = ImportPlan {
                jobs: vec![ImportJob { source, mapping }],
            };
            (plan, dry_run)
        }
    };

    if plan.jobs.is_empty() {
        anyhow::bail!("No enabled jobs: add [[import.jobs]] to the config or use `graphlink link`");
    }

    let shutdown = shutdown_signal();
    let report = if dry_run {
        tracing::info!("Dry run: no relationships will be written");
        execute(Arc::new(DryRun), &import, &plan, shutdown).await?
    } else {
        let graph = connect(&cfg).await?;
        execute(Arc::new(graph), &import, &plan, shutdown).await?
    };

    print!("{}", report.render());
    if let Some(path) = &cli.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!(path = %path.display(), "Run report written");
    }

    Ok(report.succeeded())
}

async fn execute<E: UpsertExecutor + 'static>(
    executor: Arc<E>,
    import: &ImportConfig,
    plan: &ImportPlan,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<RunReport> {
    let engine = ImportEngine::new(executor, import.engine_options()).with_shutdown(shutdown);
    let orchestrator = Orchestrator::new(engine, import.source_options()?);
    Ok(orchestrator.run(plan).await)
}

async fn connect(cfg: &::config::Config) -> anyhow::Result<GraphClient> {
    let graph_config = config::graph_config(cfg)?;
    let graph = GraphClient::connect(&graph_config).await?;
    graph.verify().await?;
    Ok(graph)
}

/// Validate everything a run needs without writing.
async fn check(cfg: &::config::Config, import: &ImportConfig) -> anyhow::Result<bool> {
    let plan = import.plan()?;
    let source_options = import.source_options()?;
    let mut ok = true;

    for job in &plan.jobs {
        match CsvRowSource::open(&job.source, &source_options) {
            Ok(_) => println!("ok      {} <- {}", job.mapping, job.source.display()),
            Err(e) => {
                ok = false;
                println!("error   {}: {e}", job.mapping);
            }
        }
    }

    match connect(cfg).await {
        Ok(_) => println!("ok      graph connection"),
        Err(e) => {
            ok = false;
            println!("error   graph connection: {e:#}");
        }
    }

    Ok(ok)
}

/// Flip to true on Ctrl-C; in-flight upserts are left to finish.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown requested, finishing in-flight upserts");
            let _ = tx.send(true);
        }
    });
    rx
}
