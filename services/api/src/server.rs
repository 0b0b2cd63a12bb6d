use crate::cli::ServeArgs;
use crate::infra::{AppState, Mailer};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use exhibit_registry::config::AppConfig;
use exhibit_registry::error::AppError;
use exhibit_registry::registrations::{
    registration_router, seed_federations_from_path, MemoryRecordStore, RecordStore,
    RegistrationApi, RegistrationWorkflow, SqliteRecordStore,
};
use exhibit_registry::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    match config.storage.database_path.clone() {
        Some(path) => {
            let store = SqliteRecordStore::open(&path)?;
            info!(path = %path.display(), "registry database opened");
            serve(config, Arc::new(store)).await
        }
        None => {
            warn!("DATABASE_PATH not set, registrations are kept in memory only");
            serve(config, Arc::new(MemoryRecordStore::new())).await
        }
    }
}

async fn serve<S>(config: AppConfig, store: Arc<S>) -> Result<(), AppError>
where
    S: RecordStore + 'static,
{
    if let Some(path) = &config.storage.federations_csv {
        let seeded = seed_federations_from_path(store.as_ref(), path)?;
        info!(count = seeded.len(), path = %path.display(), "federations seeded");
    }
    if config.storage.staff_token.is_none() {
        warn!("STAFF_TOKEN not set, staff endpoints are disabled");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let mailer = Arc::new(Mailer::from_config(&config.mail));
    let workflow = RegistrationWorkflow::new(
        store,
        mailer,
        config.exhibition.clone(),
        config.mail.clone(),
    );
    let api = Arc::new(RegistrationApi::new(
        workflow,
        config.storage.staff_token.clone(),
    ));

    let app = with_service_routes(registration_router(api))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        exhibition = %config.exhibition.name,
        "exhibit registry ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
