use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use set_decoder::app_state::AppState;
use set_decoder::config::AppConfig;
use set_decoder::routes;
use set_decoder::services::{
    audio::FfmpegSlicer,
    identify::AuddClient,
    job_store::JobStore,
    matching::TrackMatcher,
    pipeline::Pipeline,
    source::YtDlpSource,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing set-decoder server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("set_jobs_submitted_total", "Total identification jobs submitted");
    metrics::describe_counter!("set_jobs_completed_total", "Total identification jobs completed");
    metrics::describe_counter!("set_jobs_failed_total", "Total identification jobs that failed");
    metrics::describe_gauge!("set_jobs_active", "Identification jobs currently running");
    metrics::describe_histogram!(
        "set_job_processing_seconds",
        "Time from job start to its terminal status"
    );
    metrics::describe_counter!(
        "segment_identifications_total",
        "Samples sent for identification, by outcome"
    );

    tracing::info!(endpoint = %config.audd_endpoint, "Initializing AudD client");
    let identifier = AuddClient::new(
        &config.audd_endpoint,
        &config.audd_api_token,
        &config.audd_return,
        config.identify_timeout(),
    )
    .expect("Failed to initialize AudD client");

    let matcher =
        TrackMatcher::new(&config.match_config()).expect("Failed to compile track matcher");

    let mut pipeline = Pipeline::new(
        Arc::new(JobStore::new()),
        Arc::new(YtDlpSource::new(&config.yt_dlp_bin)),
        Arc::new(FfmpegSlicer::new(&config.ffmpeg_bin, &config.ffprobe_bin)),
        Arc::new(identifier),
        matcher,
        config.scan_settings(),
    );
    if let Some(dir) = &config.scratch_dir {
        tracing::info!(scratch_dir = %dir.display(), "Using scratch directory");
        pipeline = pipeline.with_scratch_root(dir.clone());
    }

    let state = AppState::new(pipeline);

    // Build API routes
    let app = routes::router(state, Some(prometheus_handle), config.max_body_bytes);

    tracing::info!("Starting set-decoder on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
