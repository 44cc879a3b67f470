use crate::infra::{run_report, AppState, RunRequest};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde_json::json;
use tracing::info;

pub(crate) fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/reports/run",
            axum::routing::post(run_report_endpoint),
        )
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Triggers a report run. An empty body reports on today; a body that is present must be a
/// valid run request.
pub(crate) async fn run_report_endpoint(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Response {
    let request = match parse_run_request(&body) {
        Ok(request) => request,
        Err(rejection) => {
            let status = rejection.status();
            return (status, Json(json!({ "error": rejection.body_text() }))).into_response();
        }
    };
    info!(?request, "report run requested over http");

    match run_report(state.runner.clone(), request).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => err.into_response(),
    }
}

fn parse_run_request(body: &[u8]) -> Result<RunRequest, JsonRejection> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RunRequest::default());
    }
    Json::<RunRequest>::from_bytes(body).map(|Json(request)| request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::testing::StubRunner;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(runner: Arc<StubRunner>, ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
            runner,
        }
    }

    fn post_run(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/reports/run")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let app = router(state(Arc::new(StubRunner::default()), false));
        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "initializing");
    }

    #[tokio::test]
    async fn run_endpoint_passes_date_and_email_override() {
        let runner = Arc::new(StubRunner::default());
        let app = router(state(runner.clone(), true));

        let response = app
            .oneshot(post_run(Body::from(
                r#"{"date":"2026-01-07","send_email":false}"#,
            )))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["dates"]["order_date"], "Wed+Jan+07+2026");
        assert_eq!(body["email"]["status"], "disabled");

        let requests = runner.requests.lock().expect("requests mutex");
        assert_eq!(
            *requests,
            vec![RunRequest {
                date: NaiveDate::from_ymd_opt(2026, 1, 7),
                send_email: Some(false),
            }]
        );
    }

    #[tokio::test]
    async fn run_endpoint_without_body_reports_on_today() {
        let runner = Arc::new(StubRunner::default());
        let app = router(state(runner.clone(), true));

        let response = app.oneshot(post_run(Body::empty())).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let requests = runner.requests.lock().expect("requests mutex");
        assert_eq!(*requests, vec![RunRequest::default()]);
    }

    #[tokio::test]
    async fn invalid_date_is_rejected_without_running() {
        let runner = Arc::new(StubRunner::default());
        let app = router(state(runner.clone(), true));

        let response = app
            .oneshot(post_run(Body::from(
                r#"{"date":"07/01/2026","send_email":false}"#,
            )))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("07/01/2026")));
        assert!(runner.requests.lock().expect("requests mutex").is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let runner = Arc::new(StubRunner::default());
        let app = router(state(runner.clone(), true));

        let response = app
            .oneshot(post_run(Body::from(r#"{"date":"#)))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(runner.requests.lock().expect("requests mutex").is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_bad_gateway() {
        let runner = Arc::new(StubRunner {
            fail: true,
            ..StubRunner::default()
        });
        let app = router(state(runner, true));

        let response = app.oneshot(post_run(Body::empty())).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("503")));
    }
}
