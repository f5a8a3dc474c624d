mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use omnimap_messaging::GatewayClient;
use omnimap_places::PlacesClient;
use omnimap_session::{
    AccountDirectory, OpenAccounts, PgAccountDirectory, SessionDeps, SessionRegistry,
    SessionSettings,
};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = omnimap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting omnimap server");

    let http = config.http_settings();
    let places =
        PlacesClient::with_base_url(&config.places_api_key, &config.places_base_url, &http)?;
    let gateway = GatewayClient::new(&config.gateway_url, &http)?;

    let (accounts, pool) = match &config.database_url {
        Some(url) => {
            let pool = omnimap_session::connect_pool(url, config.db_max_connections).await?;
            let accounts: Arc<dyn AccountDirectory> =
                Arc::new(PgAccountDirectory::new(pool.clone()));
            (accounts, Some(pool))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set; billing gate disabled, every signed-in user counts as paid"
            );
            let accounts: Arc<dyn AccountDirectory> = Arc::new(OpenAccounts);
            (accounts, None)
        }
    };

    let registry = Arc::new(SessionRegistry::new(SessionDeps {
        places: Arc::new(places),
        gateway: Arc::new(gateway),
        accounts,
        settings: SessionSettings::from_config(&config),
    }));

    let idle_sweep = registry.spawn_idle_sweep(Duration::from_secs(60));

    let app = build_app(
        AppState {
            registry: Arc::clone(&registry),
            pool,
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    idle_sweep.abort();
    registry.close_all();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
