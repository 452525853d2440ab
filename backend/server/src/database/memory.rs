use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use ledger::{EcoAction, ImpactRow, NewEcoAction, Profile, RowId};
use tokio::sync::Mutex;

use super::{ActionStore, ProfileStore, StoreError};

/// Process-local store with the same conditional-write semantics as the remote one.
#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<String, Option<i64>>>,
    actions: Mutex<Vec<EcoAction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, user_id: &str, points: Option<i64>) {
        self.profiles
            .lock()
            .await
            .insert(user_id.to_string(), points);
    }

    pub async fn actions_for(&self, user_id: &str) -> Vec<EcoAction> {
        self.actions
            .lock()
            .await
            .iter()
            .filter(|stored| stored.action.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn profile(user_id: &str, points: Option<i64>) -> Profile {
    Profile {
        id: user_id.to_string(),
        points,
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let profiles = self.profiles.lock().await;

        Ok(profiles.get(user_id).map(|points| profile(user_id, *points)))
    }

    async fn set_points(&self, user_id: &str, points: i64) -> Result<Vec<Profile>, StoreError> {
        let mut profiles = self.profiles.lock().await;

        Ok(match profiles.get_mut(user_id) {
            Some(stored) => {
                *stored = Some(points);
                vec![profile(user_id, *stored)]
            }
            None => Vec::new(),
        })
    }

    async fn swap_points(
        &self,
        user_id: &str,
        expected: Option<i64>,
        points: i64,
    ) -> Result<Vec<Profile>, StoreError> {
        let mut profiles = self.profiles.lock().await;

        Ok(match profiles.get_mut(user_id) {
            Some(stored) if *stored == expected => {
                *stored = Some(points);
                vec![profile(user_id, *stored)]
            }
            _ => Vec::new(),
        })
    }
}

#[async_trait]
impl ActionStore for MemoryStore {
    async fn insert_action(&self, action: &NewEcoAction) -> Result<Vec<EcoAction>, StoreError> {
        let mut actions = self.actions.lock().await;

        let stored = EcoAction {
            id: Some(RowId::Int(actions.len() as i64 + 1)),
            action: action.clone(),
            created_at: Some(Utc::now()),
        };
        actions.push(stored.clone());

        Ok(vec![stored])
    }

    async fn list_impacts(&self, user_id: &str) -> Result<Vec<ImpactRow>, StoreError> {
        let actions = self.actions.lock().await;

        Ok(actions
            .iter()
            .filter(|stored| stored.action.user_id == user_id)
            .map(|stored| ImpactRow::from(&stored.action))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_swap_requires_matching_value() {
        let store = MemoryStore::new();
        store.insert_profile("u1", Some(10)).await;

        assert!(store.swap_points("u1", Some(9), 20).await.unwrap().is_empty());
        assert_eq!(store.swap_points("u1", Some(10), 20).await.unwrap().len(), 1);
        assert_eq!(store.fetch_profile("u1").await.unwrap().unwrap().points, Some(20));
    }

    #[tokio::test]
    async fn test_swap_matches_null_points() {
        let store = MemoryStore::new();
        store.insert_profile("u1", None).await;

        assert!(store.swap_points("u1", Some(0), 5).await.unwrap().is_empty());
        assert_eq!(store.swap_points("u1", None, 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_matches_nothing() {
        let store = MemoryStore::new();

        assert!(store.fetch_profile("ghost").await.unwrap().is_none());
        assert!(store.set_points("ghost", 1).await.unwrap().is_empty());
        assert!(store.swap_points("ghost", None, 1).await.unwrap().is_empty());
        assert!(store.fetch_profile("ghost").await.unwrap().is_none());
    }
}
