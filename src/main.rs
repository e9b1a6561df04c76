/// MedInventory expiry watcher
///
/// Restores (or opens) a session, keeps the expiry snapshot fresh and logs
/// alerts as they come due.
use medinventory::{
    config::{ClientConfig, LoggingConfig},
    context::AppContext,
    error::ClientResult,
    metrics,
    session::SessionPhase,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ClientResult<()> {
    let config = ClientConfig::from_env()?;
    init_logging(&config.logging);

    info!("MedInventory expiry watcher v{}", env!("CARGO_PKG_VERSION"));

    let ctx = AppContext::new(config).await?;

    let phase = ctx.session.restore().await;
    if phase != SessionPhase::Authenticated {
        if let Some(credentials) = ctx.config.credentials.clone() {
            if let Err(e) = ctx
                .session
                .login(&credentials.email, &credentials.password, credentials.remember_me)
                .await
            {
                error!("Login failed: {}", e.user_message());
                return Err(e);
            }
        } else {
            warn!("No stored session and no MEDINV_EMAIL/MEDINV_PASSWORD set; requests will fail until signed in");
        }
    }

    if let Some(user) = ctx.session.user() {
        info!("Watching expiry data as {} ({})", user.full_name(), user.role);
    }

    let poller = ctx.start_poller();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    poller.stop().await;
    info!(
        "Expired: {}, expiring soon: {}, alerts enabled: {}",
        ctx.store.expired_count(),
        ctx.store.expiring_soon_count(),
        ctx.store.alerts_enabled_count()
    );
    tracing::debug!("Final metrics:\n{}", metrics::gather_metrics());

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| EnvFilter::new("medinventory=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
