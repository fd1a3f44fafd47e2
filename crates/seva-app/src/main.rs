use std::sync::Arc;
use std::time::Duration;

use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use seva_app::app::api::routes;
use seva_app::config::ConfigHandler;
use seva_app::db_handler::DbProviderHandler;
use seva_app::redemption_handler::RedemptionPolicyHandler;
use seva_app::sweep::BadgeSweeper;
use seva_core::config::load_config;
use seva_db::db::connection::create_pool;
use seva_db::db::migrations::run_pending_migrations;
use seva_service::auth::casbin::{CasbinEnforcerHandler, init_casbin};
use seva_service::redemption::RedemptionPolicy;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Seva settlement server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    run_pending_migrations(&config.database.url).await?;

    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;

    tracing::info!("Database connection pool created.");

    let enforcer = init_casbin().await?;
    let policy = RedemptionPolicy::from_config(&config.redemption)?;

    if let Some(secs) = config.badges.sweep_interval_secs.filter(|s| *s > 0) {
        tracing::info!(interval_secs = secs, "Starting badge sweep");
        let _sweep = BadgeSweeper::new(Arc::new(pool.clone()), Duration::from_secs(secs)).spawn();
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(DbProviderHandler { provider: pool })
        .hoop(ConfigHandler {
            settings: config.clone(),
        })
        .hoop(CasbinEnforcerHandler {
            enforcer: Arc::new(enforcer),
        })
        .hoop(RedemptionPolicyHandler {
            policy: Arc::new(policy),
        })
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
