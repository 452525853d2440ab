//! # Stores
//!
//! Remote relational store holding profiles and logged eco actions.
//!
//! Core purpose is to read and write the per-user `points` total and to append
//! and aggregate eco actions.
//!
//! ## Requirements
//!
//! - Point reads and writes by user id
//! - Conditional writes, so concurrent increments on one user do not lose updates
//! - Append-only action log, read back per user for aggregation
//!
//! ## Implementation
//!
//! - [`remote::RemoteStore`]: PostgREST over HTTP, `/rest/v1/<table>?col=eq.<value>`
//! - [`memory::MemoryStore`]: process-local maps, for tests and local runs
//! - Both are built once at startup and shared through [`crate::state::AppState`]
//! - Increments are a compare-and-swap: `PATCH ...?id=eq.<id>&points=eq.<old>`,
//!   an empty result means another writer got there first
use std::sync::Arc;

use async_trait::async_trait;
use ledger::{EcoAction, ImpactRow, NewEcoAction, Profile};
use reqwest::{StatusCode, header::InvalidHeaderValue};
use thiserror::Error;
use tracing::info;

pub mod memory;
pub mod remote;

use crate::config::StoreBackend;
use memory::MemoryStore;
use remote::RemoteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store responded {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Unexpected store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid store key: {0}")]
    InvalidKey(#[from] InvalidHeaderValue),

    #[error("Store returned no rows for {0}")]
    Empty(&'static str),

    #[error("Points for user {user_id} kept changing, gave up after {attempts} attempts")]
    Contended { user_id: String, attempts: u32 },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `None` when no profile has this id.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    /// Unconditional write. Returns the rows that matched.
    async fn set_points(&self, user_id: &str, points: i64) -> Result<Vec<Profile>, StoreError>;

    /// Writes `points` only while the stored value still equals `expected`
    /// (`None` matches a null column). Returns the rows that matched, so an
    /// empty result means the row is gone or was changed since it was read.
    async fn swap_points(
        &self,
        user_id: &str,
        expected: Option<i64>,
        points: i64,
    ) -> Result<Vec<Profile>, StoreError>;
}

#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Returns the inserted rows as stored.
    async fn insert_action(&self, action: &NewEcoAction) -> Result<Vec<EcoAction>, StoreError>;

    async fn list_impacts(&self, user_id: &str) -> Result<Vec<ImpactRow>, StoreError>;
}

pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub actions: Arc<dyn ActionStore>,
}

impl Stores {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ProfileStore + ActionStore + 'static,
    {
        Self {
            profiles: store.clone(),
            actions: store,
        }
    }
}

pub async fn init_stores(backend: &StoreBackend) -> Result<Stores, StoreError> {
    match backend {
        StoreBackend::Remote { url, key } => {
            info!("Using remote store at {url}");
            Ok(Stores::shared(Arc::new(RemoteStore::new(url, key)?)))
        }
        StoreBackend::Memory { profiles } => {
            info!("Using in-memory store seeded with {} profiles", profiles.len());

            let store = MemoryStore::new();
            for id in profiles {
                store.insert_profile(id, Some(0)).await;
            }

            Ok(Stores::shared(Arc::new(store)))
        }
    }
}
