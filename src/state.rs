use crate::config::AppConfig;
use crate::db::{MemoryStore, PgStore, Store};
use crate::notify::{LogNotifier, Notifier, TwilioNotifier};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = if config.uses_memory_store() {
            warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new()) as Arc<dyn Store>
        } else {
            Arc::new(PgStore::connect(&config).await?) as Arc<dyn Store>
        };

        let notifier = match &config.sms {
            Some(sms) => {
                info!(from = %sms.from_number, "twilio sms enabled");
                Arc::new(TwilioNotifier::new(sms)?) as Arc<dyn Notifier>
            }
            None => {
                warn!("TWILIO_* not set; rental confirmations are only logged");
                Arc::new(LogNotifier) as Arc<dyn Notifier>
            }
        };

        Ok(Self::from_parts(store, notifier, config))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_notifier(Arc::new(LogNotifier))
    }

    #[cfg(test)]
    pub fn fake_with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "memory://".into(),
            max_connections: 1,
            country_code: "55".into(),
            sms: None,
        });
        Self::from_parts(Arc::new(MemoryStore::new()), notifier, config)
    }
}
