use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use sttf_guard::interceptor::detect::Detector;
use sttf_guard::monitoring::detection_metrics;
use sttf_guard::telemetry::{bus, notifier::Notifier, reporter::HttpReporter};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Optional manifest supplies the telemetry collector endpoint.
    let reporter = std::env::var("STTF_GUARD_MANIFEST")
        .ok()
        .and_then(|path| {
            sttf_guard::config::protection_loader::load_protection_manifest(&path).ok()
        })
        .and_then(|manifest| manifest.report_endpoint)
        .map(HttpReporter::new);

    // One sink: structured log + metrics, plus collector delivery if wired.
    bus::register_sink(move |event| {
        info!(
            event = "xs_leak_detected",
            vector = %event.vector,
            level = event.level.as_str(),
            path = event.path.as_deref().unwrap_or("-"),
            detail = event.detail.as_deref().unwrap_or(""),
        );
        detection_metrics::record_detection_telemetry(event);
        if let Some(reporter) = &reporter {
            reporter.report(event);
        }
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/scan", post(scan_url))
        .layer(axum::middleware::from_fn(
            sttf_guard::middleware::fragment_scan::scan_request,
        ));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    println!("STTF Guard listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "sttf-guard: ONLINE"
}

#[derive(Deserialize)]
struct ScanRequest {
    url: String,
    path: Option<String>,
}

#[derive(Serialize)]
struct ScanResponse {
    detected: bool,
    directives: Vec<String>,
}

async fn scan_url(Json(payload): Json<ScanRequest>) -> Json<ScanResponse> {
    let detector = Detector::new(Notifier::global());
    match detector.inspect(&payload.url, payload.path.as_deref()) {
        Some(set) => Json(ScanResponse {
            detected: true,
            directives: set.into_vec(),
        }),
        None => Json(ScanResponse {
            detected: false,
            directives: Vec::new(),
        }),
    }
}
