use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_brotherhood_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lumen::brotherhood::{BrotherhoodService, InMemoryBrotherhood, InMemoryIdentityDirectory};
use lumen::config::AppConfig;
use lumen::error::AppError;
use lumen::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = BrotherhoodService::new(
        Arc::new(InMemoryBrotherhood::new()),
        Arc::new(InMemoryIdentityDirectory::new()),
    );

    if config.brotherhood.seed_reference_data {
        let summary = service.seed_reference_data()?;
        info!(
            roles = summary.roles_created,
            ceremony_types = summary.ceremony_types_created,
            "reference data seeded"
        );
    }
    if let Some(admin) = &config.brotherhood.admin {
        service.bootstrap_admin(&admin.username, &admin.password)?;
    }

    let app = with_brotherhood_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "brotherhood membership service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
