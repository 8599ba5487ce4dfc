use std::io;
use std::time::Instant;

use sitesmith::providers::configs::ProviderConfig;
use sitesmith::store::ProjectStore;

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider_config: ProviderConfig,
    pub store: ProjectStore,
    pub public_url: String,
    pub started: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> io::Result<Self> {
        let store = ProjectStore::new(&settings.store.root)?;
        Ok(Self {
            provider_config: settings.provider.into_config(),
            store,
            public_url: settings.store.public_url,
            started: Instant::now(),
        })
    }
}
