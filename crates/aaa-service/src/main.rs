use aaa_service::app::AaaCore;
use aaa_service::config::Config;
use aaa_service::observability::metrics::init_metrics_recorder;
use aaa_service::routes;
use common::config::ObservabilityConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration before tracing so LOG_LEVEL/JSON_LOGS apply
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    init_tracing(&config.observability);

    info!("Starting AAA controller");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let bind_address = config.bind_address.clone();

    // Bootstrap user hashing and key derivation are CPU bound
    let core = tokio::task::spawn_blocking(move || AaaCore::from_config(config))
        .await?
        .map_err(|e| {
            error!("Failed to initialize AAA components: {}", e);
            e
        })?;
    let core = Arc::new(core);

    info!(
        auth_enabled = core.context.is_auth_enabled(),
        filters = ?core.pipeline.stage_names(),
        "AAA components initialized"
    );

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(Arc::clone(&core)));

    let app = routes::build_routes(Arc::clone(&core), metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("AAA controller listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    core.pipeline.destroy();
    info!("AAA controller shutdown complete");

    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&observability.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Re-read the filter configuration on every SIGHUP.
#[cfg(unix)]
async fn reload_on_hangup(core: Arc<AaaCore>) {
    let mut hangups = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to listen for SIGHUP: {}", e);
            return;
        }
    };

    while hangups.recv().await.is_some() {
        info!("Received SIGHUP, reloading filter chain");
        let core = Arc::clone(&core);
        match tokio::task::spawn_blocking(move || core.reload_filter_chain()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Filter chain reload failed, keeping previous chain: {}", e),
            Err(e) => error!("Filter chain reload task failed: {}", e),
        }
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
