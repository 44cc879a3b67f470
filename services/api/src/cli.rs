use crate::infra::{
    parse_date, run_report, shutdown_on_ctrl_c, LiveRunner, ReportRunner, RunRequest,
};
use crate::{scheduler, server};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use csfa_report::config::credentials::diagnose_environment;
use csfa_report::config::{AppConfig, RunMode};
use csfa_report::error::AppError;
use csfa_report::telemetry;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "CSFA Daily Report",
    about = "Generate and deliver the daily field sales activity report",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one report and exit (default when RUN_MODE=once)
    Run(RunArgs),
    /// Wait for the weekday report time and generate a report each day
    Schedule,
    /// Start the HTTP service with the weekday scheduler alongside it
    Serve(ServeArgs),
    /// Report which platform credentials are present and well formed
    Diagnose,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Report on this day (YYYY-MM-DD) instead of today
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Write the report files but skip the email
    #[arg(long)]
    pub(crate) no_email: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve the HTTP endpoints without the weekday scheduler
    #[arg(long)]
    pub(crate) no_scheduler: bool,
}

impl From<RunArgs> for RunRequest {
    fn from(args: RunArgs) -> Self {
        Self {
            date: args.date,
            send_email: args.no_email.then_some(false),
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    if let Some(Command::Diagnose) = cli.command {
        return diagnose();
    }

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let command = cli.command.unwrap_or(match config.schedule.run_mode {
        RunMode::Once => Command::Run(RunArgs::default()),
        RunMode::Scheduled => Command::Schedule,
    });

    match command {
        Command::Run(args) => run_once(config, args.into()).await,
        Command::Schedule => {
            let report_time = config.schedule.report_time;
            let runner: Arc<dyn ReportRunner> = Arc::new(LiveRunner::new(config));
            scheduler::run_weekdays(runner, report_time, shutdown_on_ctrl_c()).await
        }
        Command::Serve(args) => server::run(config, args).await,
        Command::Diagnose => diagnose(),
    }
}

async fn run_once(config: AppConfig, request: RunRequest) -> Result<(), AppError> {
    let runner: Arc<dyn ReportRunner> = Arc::new(LiveRunner::new(config));
    let outcome = run_report(runner, request).await?;
    let rendered = serde_json::to_string_pretty(&outcome).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

fn diagnose() -> Result<(), AppError> {
    let diagnoses = diagnose_environment();
    for diagnosis in &diagnoses {
        println!("{diagnosis}");
    }

    let usable = diagnoses.iter().filter(|diagnosis| diagnosis.is_usable()).count();
    println!("{usable}/{} credentials usable", diagnoses.len());
    Ok(())
}
