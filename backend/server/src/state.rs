use std::sync::Arc;

use crate::{
    completion::{CompletionProvider, init_completion},
    config::Config,
    database::{ActionStore, ProfileStore, Stores, init_stores},
};

/// Clients built once at startup and shared by every handler.
pub struct AppState {
    pub profiles: Arc<dyn ProfileStore>,
    pub actions: Arc<dyn ActionStore>,
    pub completion: Option<Arc<dyn CompletionProvider>>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Arc<Self>> {
        let Stores { profiles, actions } = init_stores(&config.store).await?;
        let completion = init_completion(config.completion.as_ref())?;

        Ok(Self::from_parts(profiles, actions, completion))
    }

    pub fn from_parts(
        profiles: Arc<dyn ProfileStore>,
        actions: Arc<dyn ActionStore>,
        completion: Option<Arc<dyn CompletionProvider>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            profiles,
            actions,
            completion,
        })
    }

    pub fn completion(&self) -> Option<&dyn CompletionProvider> {
        self.completion.as_deref()
    }
}
