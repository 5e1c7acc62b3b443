use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryProfileDirectory, InMemoryTourRequestStore, LoggingCacheInvalidator,
};
use crate::routes::with_tour_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tour_desk::config::AppConfig;
use tour_desk::error::AppError;
use tour_desk::telemetry;
use tour_desk::workflows::tours::TourSchedulingService;
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

    let store = Arc::new(InMemoryTourRequestStore::default());
    let profiles = Arc::new(InMemoryProfileDirectory::default());
    let cache = Arc::new(LoggingCacheInvalidator);
    let scheduling_service = Arc::new(TourSchedulingService::new(
        store,
        profiles,
        cache,
        config.scheduling.clone(),
    ));

    let app = with_tour_routes(scheduling_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tour scheduling service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
