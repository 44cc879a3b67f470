use crate::cli::ServeArgs;
use crate::infra::{shutdown_on_ctrl_c, wait_for_shutdown, AppState, LiveRunner, ReportRunner};
use crate::routes::router;
use crate::scheduler;
use axum_prometheus::PrometheusMetricLayer;
use csfa_report::config::AppConfig;
use csfa_report::error::AppError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut config: AppConfig, mut args: ServeArgs) -> Result<(), AppError> {
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let runner: Arc<dyn ReportRunner> = Arc::new(LiveRunner::new(config.clone()));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        runner: runner.clone(),
    };

    let app = router(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    let shutdown = shutdown_on_ctrl_c();
    if !args.no_scheduler {
        let report_time = config.schedule.report_time;
        let scheduler_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) =
                scheduler::run_weekdays(runner, report_time, scheduler_shutdown).await
            {
                error!(error = %err, "scheduler exited");
            }
        });
    }

    info!(?config.environment, %addr, "csfa report service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await?;
    info!("csfa report service stopped");
    Ok(())
}
