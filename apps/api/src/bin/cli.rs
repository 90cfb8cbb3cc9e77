//! lifescore: command-line client for the LifeScore API.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use lifescore::client::render::{render_dashboard, render_history, render_report, DashboardSummary};
use lifescore::client::{ApiClient, PollConfig, DEFAULT_BASE_URL};

#[derive(Parser)]
#[command(name = "lifescore")]
#[command(author, version, about = "Upload health documents and read their AI analysis")]
#[command(propagate_version = true)]
struct Cli {
    /// API base URL
    #[arg(long, global = true, env = "LIFESCORE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF, JPEG or PNG health document
    Upload {
        file: PathBuf,

        /// Wait for the analysis and print it
        #[arg(long)]
        wait: bool,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// List all reports, newest first
    History,

    /// Show one report with its analysis
    Show { id: Uuid },

    /// Poll a report until its analysis is ready
    Watch {
        id: Uuid,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Summary of the latest report and totals
    Dashboard,
}

#[derive(clap::Args)]
struct PollArgs {
    /// Delay between polls in milliseconds
    #[arg(long, default_value_t = 3000)]
    interval_ms: u64,

    /// Stop after this many polls, at least 1 (default: keep polling)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,
}

impl PollArgs {
    fn config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = ApiClient::new(cli.base_url);

    match cli.command {
        Commands::Upload { file, wait, poll } => {
            let receipt = client.upload(&file).await?;
            println!("{} (report {})", receipt.message, receipt.report_id);
            if wait {
                eprintln!("Waiting for analysis...");
                let report = client.wait_for_analysis(receipt.report_id, poll.config()).await?;
                print!("{}", render_report(&report));
            }
        }
        Commands::History => {
            let reports = client.list_reports().await?;
            print!("{}", render_history(&reports));
        }
        Commands::Show { id } => match client.get_report(id).await? {
            Some(report) => print!("{}", render_report(&report)),
            None => anyhow::bail!("Report {id} not found"),
        },
        Commands::Watch { id, poll } => {
            let report = client.wait_for_analysis(id, poll.config()).await?;
            print!("{}", render_report(&report));
        }
        Commands::Dashboard => {
            let reports = client.list_reports().await?;
            print!("{}", render_dashboard(&DashboardSummary::from_reports(&reports)));
        }
    }
    Ok(())
}
