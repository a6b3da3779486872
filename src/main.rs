use ledgerguard::{routes::create_router, AppState, Config};
use migration::{Migrator, MigratorTrait};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ledgerguard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting credit ledger guard (ledgerguard)");

    let config = Config::load()?;

    tracing::info!(
        "Loaded configuration - Server: {}:{}, floors: general {} / campaign template {}",
        config.server.host,
        config.server.port,
        config.ledger.general_floor,
        config.ledger.campaign_template_floor
    );

    let state = AppState::new(config.clone()).await?;

    if config.database.run_migrations {
        Migrator::up(&state.db, None).await?;
        tracing::info!("Applied pending migrations");
    }

    tracing::info!("Initialized application state");

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
