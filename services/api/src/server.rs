use crate::cli::ServeArgs;
use crate::infra::{AppState, LogNotifier};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use swapify::config::AppConfig;
use swapify::error::AppError;
use swapify::marketplace::{DefaultClock, InMemoryStore, Marketplace};
use swapify::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let marketplace = Arc::new(Marketplace::new(
        Arc::new(InMemoryStore::default()),
        Arc::new(LogNotifier),
        Arc::new(DefaultClock),
        config.marketplace.clone(),
    ));

    let app = with_marketplace_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        post_ttl_days = config.marketplace.post_ttl_days,
        credit_policy = ?config.marketplace.exchange_credit,
        "swapify marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
