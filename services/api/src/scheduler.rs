use crate::infra::{run_report, wait_for_shutdown, ReportRunner, RunRequest};
use chrono::{Local, NaiveTime};
use csfa_report::error::AppError;
use csfa_report::workflows::sales::schedule::next_weekday_run;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Runs the report at `report_time` every weekday until `shutdown` flips.
pub(crate) async fn run_weekdays(
    runner: Arc<dyn ReportRunner>,
    report_time: NaiveTime,
    shutdown: watch::Receiver<bool>,
) -> Result<(), AppError> {
    info!(%report_time, "weekday scheduler started");

    loop {
        let now = Local::now().naive_local();
        let next = next_weekday_run(now, report_time);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next, wait_secs = wait.as_secs(), "next report scheduled");

        tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown.clone()) => {
                info!("scheduler stopped");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match run_report(runner.clone(), RunRequest::default()).await {
            Ok(outcome) => info!(
                order_date = %outcome.dates.order_date,
                salespersons = outcome.salespersons,
                duration_ms = outcome.duration_ms,
                "scheduled report completed"
            ),
            Err(err) => error!(error = %err, "scheduled report failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::testing::StubRunner;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_stops_the_loop_without_running() {
        let runner = Arc::new(StubRunner::default());
        let (sender, receiver) = watch::channel(false);
        let report_time = NaiveTime::from_hms_opt(19, 0, 0).expect("valid time");

        sender.send_replace(true);

        let stopped = tokio::time::timeout(
            Duration::from_secs(1),
            run_weekdays(runner.clone(), report_time, receiver),
        )
        .await
        .expect("scheduler stops promptly");
        assert!(stopped.is_ok());
        assert!(runner.requests.lock().expect("requests mutex").is_empty());
    }
}
