use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use flakescan::config::Config;
use flakescan::extract::{ExtractOptions, HistorySelection, PageSizes, Pagination, ResultExtractor};
use flakescan::model::OutcomeSummary;
use flakescan::project::{PackageFilter, Project};

#[derive(Parser)]
#[command(
    name = "flakescan",
    about = "Query Firebase Cloud ToolResults API for mobile test data",
    version,
    long_about = None
)]
struct Cli {
    /// Firebase project
    #[arg(long, value_enum)]
    project: Project,

    /// History name filter (application package)
    #[arg(long, value_enum)]
    filter_by_name: PackageFilter,

    /// Execution outcome to report on
    #[arg(long, default_value = "success")]
    outcome: OutcomeSummary,

    /// List recent (past 24h) executions with the outcome instead of test cases
    #[arg(long)]
    recent: bool,

    /// Print failed/flaky test names from failing steps of every matching history
    #[arg(long, conflicts_with = "recent")]
    summary: bool,

    /// Walk every matching history instead of the first when extracting records or recent executions
    #[arg(long)]
    all_histories: bool,

    /// Follow page tokens instead of reading the first page only
    #[arg(long)]
    all_pages: bool,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn options(&self, config: &Config) -> ExtractOptions {
        ExtractOptions {
            history_selection: if self.all_histories {
                HistorySelection::All
            } else {
                HistorySelection::First
            },
            pagination: if self.all_pages {
                Pagination::Exhaust
            } else {
                Pagination::SinglePage
            },
            page_sizes: PageSizes::from(&config.paging),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    let gateway = match flakescan::connect(cli.project, &config).await {
        Ok(gateway) => gateway,
        Err(e) if e.is_configuration() => {
            return Err(anyhow::Error::new(e).context(format!("project {} is not configured", cli.project)));
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to initialize client for project {}", cli.project)));
        }
    };
    let extractor = ResultExtractor::with_options(gateway, cli.options(&config));

    let project_id = cli.project.id();
    let filter = cli.filter_by_name.name();

    if cli.summary {
        tracing::info!(%project_id, %filter, "Running outcome summary");
        let lines = extractor.outcome_summaries(project_id, filter).await?;
        if lines.is_empty() {
            println!("No failed or flaky tests found");
        }
        for line in lines {
            println!("{}", line);
        }
    } else if cli.recent {
        let executions = extractor
            .filter_recent_executions(project_id, filter, cli.outcome)
            .await?;
        if executions.is_empty() {
            println!("No results found for {}", cli.outcome);
        }
        for execution in &executions {
            println!("{}", serde_json::to_string(execution)?);
        }
    } else {
        let records = extractor
            .extract_results(project_id, filter, cli.outcome)
            .await?;
        if records.is_empty() {
            println!("No results found for {}", cli.outcome);
        }
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    Ok(())
}
