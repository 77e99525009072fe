use exam_generator::{
    app::create_router,
    config::{get_config, init_config},
    database::pool::create_pool,
    utils::crypto,
    AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut args = std::env::args().skip(1);
    if let Some(command) = args.next() {
        match command.as_str() {
            "hash-password" => {
                let password = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("usage: exam-generator hash-password <password>"))?;
                println!("{}", crypto::hash_password(&password)?);
                return Ok(());
            }
            other => anyhow::bail!("unknown command '{}'", other),
        }
    }

    init_config()?;
    let config = get_config();

    let pool = create_pool(&config.database_url).await?;
    let app_state = AppState::new(pool, config.clone())?;

    match app_state.admin_service.normalize_image_paths().await {
        Ok(0) => {}
        Ok(updated) => info!("Normalized {} stored image paths", updated),
        Err(e) => tracing::warn!("Could not normalize image paths: {}", e),
    }

    if app_state.update_service.is_enabled() {
        let updates = app_state.update_service.clone();
        let startup_delay = Duration::from_secs(config.update.startup_delay_secs);
        let interval = Duration::from_secs(config.update.check_interval_hours.max(1) * 3600);
        tokio::spawn(async move {
            tokio::time::sleep(startup_delay).await;
            loop {
                match updates.check().await {
                    Ok(status) if status.update_available => info!(
                        "Version {} is available (running {}); install it from /api/updates/install",
                        status.latest_version, status.current_version
                    ),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Update check failed"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    } else {
        info!("UPDATE_FEED_URL not set; automatic update checks disabled");
    }

    let app = create_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Exam generator v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
