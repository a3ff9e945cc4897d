use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryIdentityProvider, InMemoryRecordStore};
use crate::routes::{cors_layer, with_diagnostic_routes};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gestor360::api::{DiagnosticService, ServiceSettings};
use gestor360::backend::{
    CompanyRepository, DiagnosticRepository, IdentityProvider, SupabaseClient, WhitelistDirectory,
};
use gestor360::config::AppConfig;
use gestor360::error::AppError;
use gestor360::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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

    telemetry::init(&config.telemetry, config.environment)?;

    let settings = ServiceSettings {
        preset: config.diagnostic.scoring_preset,
        scoring: config.diagnostic.scoring(),
        loss: config.diagnostic.loss(),
        whitelist_enforced: config.diagnostic.whitelist_enforced,
    };

    match config.backend.supabase.clone() {
        Some(supabase) => {
            let client = Arc::new(SupabaseClient::new(&supabase));
            serve(config, settings, client.clone(), client).await
        }
        None => {
            warn!("SUPABASE_URL not set; accounts and diagnostics are kept in memory");
            let identity = Arc::new(InMemoryIdentityProvider::default());
            let records = Arc::new(InMemoryRecordStore::with_whitelist(
                config.diagnostic.whitelist_seed.clone(),
            ));
            serve(config, settings, identity, records).await
        }
    }
}

async fn serve<I, R>(
    config: AppConfig,
    settings: ServiceSettings,
    identity: Arc<I>,
    records: Arc<R>,
) -> Result<(), AppError>
where
    I: IdentityProvider + 'static,
    R: CompanyRepository + DiagnosticRepository + WhitelistDirectory + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        backend: config.backend.label(),
    };

    let scoring_preset = settings.preset;
    let scale_factor = settings.scoring.scale_factor;
    let max_loss_fraction = settings.loss.max_loss_fraction;
    let service = Arc::new(DiagnosticService::new(identity, records, settings));

    let app = with_diagnostic_routes(service)
        .layer(Extension(app_state))
        .layer(cors_layer(&config.server.cors_origins))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        %scoring_preset,
        scale_factor,
        max_loss_fraction,
        backend = config.backend.label(),
        cors_origins = config.server.cors_origins.len(),
        "gestor 360 diagnostic api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
