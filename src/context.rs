/// Application context and dependency injection
use crate::{
    client::{ApiClient, HttpExpiryBackend},
    config::ClientConfig,
    error::ClientResult,
    expiry::{AlertRuleEngine, ExpiryBackend, ExpiryStore},
    jobs::{tasks, ExpiryPoller, PollerHandle},
    session::{FileSessionStorage, SessionManager, SessionStorage},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Shared services, built once and passed to whatever needs them
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ClientConfig>,
    pub session: Arc<SessionManager>,
    pub store: Arc<ExpiryStore>,
    pub alerts: Arc<AlertRuleEngine>,
}

impl AppContext {
    /// Create a context with file-backed session storage
    pub async fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.storage.directory).await?;

        let storage = Arc::new(FileSessionStorage::new(config.storage.directory.clone()));
        Self::with_storage(config, storage)
    }

    /// Create a context over any session storage
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> ClientResult<Self> {
        config.validate()?;

        let api = ApiClient::new(&config.api)?;
        let session = Arc::new(SessionManager::new(api, storage));

        let backend: Arc<dyn ExpiryBackend> = Arc::new(HttpExpiryBackend::new(Arc::clone(&session)));
        let store = Arc::new(ExpiryStore::new(backend));
        let alerts = Arc::new(AlertRuleEngine::new(Arc::clone(&store)));

        info!("MedInventory client configured for {}", config.api.base_url);

        Ok(Self {
            config: Arc::new(config),
            session,
            store,
            alerts,
        })
    }

    /// Start polling with due alerts reported after every refresh
    pub fn start_poller(&self) -> PollerHandle {
        let alerts = Arc::clone(&self.alerts);
        ExpiryPoller::new(Arc::clone(&self.store), self.config.expiry.poll_interval())
            .on_refresh(move |_| {
                tasks::report_due_alerts(&alerts, Utc::now());
            })
            .start()
    }
}
