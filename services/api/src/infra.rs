use chrono::{Local, NaiveDate};
use csfa_report::config::AppConfig;
use csfa_report::error::AppError;
use csfa_report::workflows::sales::{ReportDates, ReportError, ReportOutcome, ReportPipeline};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) runner: Arc<dyn ReportRunner>,
}

/// Options for a single report run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct RunRequest {
    /// Report day; today when absent. An explicit day ignores `ORDER_DATE` overrides.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) date: Option<NaiveDate>,
    /// Overrides `SEND_EMAIL` for this run only.
    #[serde(default)]
    pub(crate) send_email: Option<bool>,
}

/// Executes one report run on the calling (blocking) thread.
pub(crate) trait ReportRunner: Send + Sync {
    fn run(&self, request: RunRequest) -> Result<ReportOutcome, ReportError>;
}

/// Runs the pipeline against the live sales platform. Runs are serialized so the scheduler
/// and the HTTP trigger never write the same output files at once.
pub(crate) struct LiveRunner {
    config: AppConfig,
    in_flight: Mutex<()>,
}

impl LiveRunner {
    pub(crate) fn new(config: AppConfig) -> Self {
        Self {
            config,
            in_flight: Mutex::new(()),
        }
    }
}

impl ReportRunner for LiveRunner {
    fn run(&self, request: RunRequest) -> Result<ReportOutcome, ReportError> {
        let _guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        let mut config = self.config.clone();
        if let Some(send_email) = request.send_email {
            config.email.enabled = send_email;
        }

        let dates = match request.date {
            Some(day) => ReportDates::for_day(day),
            None => ReportDates::resolve(Local::now().date_naive(), &config.report),
        };

        ReportPipeline::from_config(&config)?.run(&dates)
    }
}

/// Runs the report on tokio's blocking pool; the HTTP client and SMTP transport are blocking.
pub(crate) async fn run_report(
    runner: Arc<dyn ReportRunner>,
    request: RunRequest,
) -> Result<ReportOutcome, AppError> {
    let outcome = tokio::task::spawn_blocking(move || runner.run(request))
        .await
        .map_err(|err| AppError::Task(err.to_string()))??;
    Ok(outcome)
}

/// Flips to `true` once ctrl-c arrives. Every long-running task (the HTTP server and the
/// scheduler) waits on a clone, so a single signal stops the whole process.
pub(crate) fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (sender, receiver) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(err) => error!(error = %err, "unable to listen for ctrl-c, shutting down"),
        }
        sender.send_replace(true);
    });
    receiver
}

/// Resolves once shutdown has been requested or its sender is gone.
pub(crate) async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
