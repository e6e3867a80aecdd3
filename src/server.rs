//! HTTP exposition of availability, failure logs, metrics, and health

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::availability::AvailabilitySnapshot;
use crate::failure_log::FailureRecord;
use crate::monitor::Monitor;

/// Records returned by the logs endpoint when no limit is given.
pub const DEFAULT_LOG_LIMIT: usize = 20;

/// Largest limit the logs endpoint accepts.
pub const MAX_LOG_LIMIT: usize = 100;

/// Shared handle given to every handler.
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

#[derive(Serialize)]
struct AvailabilityResponse {
    availability_percent: f64,
}

#[derive(Serialize)]
struct LogsResponse {
    logs: Vec<FailureRecord>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    monitor_state: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

// Availability percentage over the lifetime of the process
async fn get_availability(data: web::Data<AppState>) -> impl Responder {
    let snapshot = data.monitor.availability();
    HttpResponse::Ok().json(AvailabilityResponse {
        availability_percent: snapshot.availability_percent,
    })
}

// Most recent failure records, oldest first
async fn get_logs(data: web::Data<AppState>, query: web::Query<LogsQuery>) -> impl Responder {
    let limit = match resolve_limit(query.limit) {
        Ok(limit) => limit,
        Err(message) => {
            return HttpResponse::BadRequest().json(ErrorResponse { error: message });
        }
    };

    let logs = data.monitor.recent_failures(limit).await;
    HttpResponse::Ok().json(LogsResponse { logs })
}

// Probe counters in the Prometheus text format
async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    let snapshot = data.monitor.availability();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(render_prometheus(&snapshot))
}

// Liveness plus the current scheduler state
async fn get_health(data: web::Data<AppState>) -> impl Responder {
    let state = data.monitor.state().await;
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        monitor_state: state.to_string(),
    })
}

/// Resolve the requested log limit, rejecting out-of-range values.
fn resolve_limit(requested: Option<usize>) -> std::result::Result<usize, String> {
    match requested {
        None => Ok(DEFAULT_LOG_LIMIT),
        Some(n) if n == 0 || n > MAX_LOG_LIMIT => {
            Err(format!("limit must be between 1 and {}", MAX_LOG_LIMIT))
        }
        Some(n) => Ok(n),
    }
}

/// Render the availability counters in the Prometheus text format.
pub fn render_prometheus(snapshot: &AvailabilitySnapshot) -> String {
    let mut out = String::new();

    out.push_str("# HELP webpage_requests_total Total number of probes issued\n");
    out.push_str("# TYPE webpage_requests_total counter\n");
    out.push_str(&format!("webpage_requests_total {}\n", snapshot.probes_total));

    out.push_str("# HELP webpage_requests_success Probes that returned the expected status\n");
    out.push_str("# TYPE webpage_requests_success counter\n");
    out.push_str(&format!(
        "webpage_requests_success {}\n",
        snapshot.probes_succeeded
    ));

    out.push_str("# HELP webpage_availability_percent Availability percentage since start\n");
    out.push_str("# TYPE webpage_availability_percent gauge\n");
    out.push_str(&format!(
        "webpage_availability_percent {:.2}\n",
        snapshot.availability_percent
    ));

    out
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/availability", web::get().to(get_availability))
        .route("/logs", web::get().to(get_logs))
        .route("/metrics", web::get().to(get_metrics))
        .route("/health", web::get().to(get_health));
}

/// Build the exposition server bound to `listen_addr`.
///
/// The returned server is not yet running; awaiting it serves until the
/// process receives SIGINT or SIGTERM.
pub fn build_server(
    monitor: Arc<Monitor>,
    listen_addr: &str,
) -> std::io::Result<actix_web::dev::Server> {
    info!("Exposition server binding to {}", listen_addr);

    let state = web::Data::new(AppState { monitor });
    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(listen_addr)?
        .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::AvailabilityTracker;
    use crate::config::Config;
    use crate::failure_log::FailureLogStore;
    use actix_web::http::{header, StatusCode};
    use actix_web::test as actix_test;
    use chrono::Utc;
    use tempfile::TempDir;

    struct Fixture {
        tracker: Arc<AvailabilityTracker>,
        failure_log: Arc<FailureLogStore>,
        state: web::Data<AppState>,
    }

    async fn fixture(dir: &TempDir) -> Fixture {
        let config = Config {
            target_url: "http://127.0.0.1:1".to_string(),
            check_interval_seconds: 1,
            timeout_seconds: 1,
            expected_status_code: 200,
            failure_log_path: dir.path().join("monitoring.log"),
            max_resident_failures: 30,
            ..Config::default()
        };

        let tracker = Arc::new(AvailabilityTracker::new());
        let failure_log = Arc::new(
            FailureLogStore::open(config.max_resident_failures, &config.failure_log_path).await,
        );
        let monitor = Arc::new(
            Monitor::new(config, Arc::clone(&tracker), Arc::clone(&failure_log)).unwrap(),
        );

        Fixture {
            tracker,
            failure_log,
            state: web::Data::new(AppState { monitor }),
        }
    }

    fn failure(n: usize) -> FailureRecord {
        FailureRecord {
            timestamp: Utc::now(),
            url: "http://127.0.0.1:1".to_string(),
            expected_status_code: 200,
            status_code: 500,
            error: format!("failure {}", n),
        }
    }

    #[actix_web::test]
    async fn availability_endpoint_reports_percentage() {
        let dir = TempDir::new().unwrap();
        let fx = fixture(&dir).await;
        fx.tracker.record(true);
        fx.tracker.record(true);
        fx.tracker.record(true);
        fx.tracker.record(false);

        let app =
            actix_test::init_service(App::new().app_data(fx.state.clone()).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri("/availability").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["availability_percent"], 75.0);
    }

    #[actix_web::test]
    async fn availability_endpoint_is_zero_before_any_probe() {
        let dir = TempDir::new().unwrap();
        let fx = fixture(&dir).await;

        let app =
            actix_test::init_service(App::new().app_data(fx.state.clone()).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri("/availability").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["availability_percent"], 0.0);
    }

    #[actix_web::test]
    async fn logs_endpoint_defaults_to_twenty_newest() {
        let dir = TempDir::new().unwrap();
        let fx = fixture(&dir).await;
        for n in 1..=25 {
            fx.failure_log.append(failure(n)).await;
        }

        let app =
            actix_test::init_service(App::new().app_data(fx.state.clone()).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri("/logs").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        let logs = body["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 20);
        assert_eq!(logs[0]["error"], "failure 6");
        assert_eq!(logs[19]["error"], "failure 25");
    }

    #[actix_web::test]
    async fn logs_endpoint_honors_explicit_limit() {
        let dir = TempDir::new().unwrap();
        let fx = fixture(&dir).await;
        for n in 1..=10 {
            fx.failure_log.append(failure(n)).await;
        }

        let app =
            actix_test::init_service(App::new().app_data(fx.state.clone()).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri("/logs?limit=3").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        let logs = body["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0]["error"], "failure 8");
        assert_eq!(logs[2]["error"], "failure 10");
    }

    #[actix_web::test]
    async fn logs_endpoint_rejects_out_of_range_limits() {
        let dir = TempDir::new().unwrap();
        let fx = fixture(&dir).await;

        let app =
            actix_test::init_service(App::new().app_data(fx.state.clone()).configure(routes)).await;

        for uri in ["/logs?limit=0", "/logs?limit=101"] {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body: serde_json::Value = actix_test::read_body_json(resp).await;
            assert!(body["error"].as_str().unwrap().contains("limit"));
        }
    }

    #[actix_web::test]
    async fn metrics_endpoint_serves_prometheus_text() {
        let dir = TempDir::new().unwrap();
        let fx = fixture(&dir).await;
        fx.tracker.record(true);
        fx.tracker.record(false);

        let app =
            actix_test::init_service(App::new().app_data(fx.state.clone()).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri("/metrics").to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("text/plain"));

        let body = actix_test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("webpage_requests_total 2"));
        assert!(text.contains("webpage_requests_success 1"));
        assert!(text.contains("webpage_availability_percent 50.00"));
    }

    #[actix_web::test]
    async fn health_endpoint_reports_monitor_state() {
        let dir = TempDir::new().unwrap();
        let fx = fixture(&dir).await;

        let app =
            actix_test::init_service(App::new().app_data(fx.state.clone()).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["monitor_state"], "idle");
    }

    #[test]
    fn render_includes_help_and_type_lines() {
        let snapshot = AvailabilitySnapshot {
            probes_total: 3,
            probes_succeeded: 2,
            availability_percent: 200.0 / 3.0,
        };
        let text = render_prometheus(&snapshot);

        assert!(text.contains("# HELP webpage_requests_total"));
        assert!(text.contains("# TYPE webpage_requests_total counter"));
        assert!(text.contains("webpage_requests_total 3"));
        assert!(text.contains("# TYPE webpage_availability_percent gauge"));
        assert!(text.contains("webpage_availability_percent 66.67"));
    }

    #[test]
    fn render_handles_the_empty_snapshot() {
        let snapshot = AvailabilitySnapshot {
            probes_total: 0,
            probes_succeeded: 0,
            availability_percent: 0.0,
        };
        let text = render_prometheus(&snapshot);

        assert!(text.contains("webpage_requests_total 0"));
        assert!(text.contains("webpage_requests_success 0"));
        assert!(text.contains("webpage_availability_percent 0.00"));
    }

    #[test]
    fn limit_resolution_bounds() {
        assert_eq!(resolve_limit(None), Ok(DEFAULT_LOG_LIMIT));
        assert_eq!(resolve_limit(Some(1)), Ok(1));
        assert_eq!(resolve_limit(Some(100)), Ok(100));
        assert!(resolve_limit(Some(0)).is_err());
        assert!(resolve_limit(Some(101)).is_err());
    }
}
