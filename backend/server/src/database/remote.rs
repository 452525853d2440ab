use async_trait::async_trait;
use ledger::{
    EcoAction, ImpactRow, NewEcoAction, Profile,
    models::{ACTIONS_TABLE, IMPACT_COLUMNS, PROFILES_TABLE},
};
use reqwest::{
    Client, RequestBuilder,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{Level, event, instrument};

use super::{ActionStore, ProfileStore, StoreError};

const REST_PATH: &str = "rest/v1";
const API_KEY: HeaderName = HeaderName::from_static("apikey");
const PREFER: HeaderName = HeaderName::from_static("prefer");
const RETURN_ROWS: &str = "return=representation";

/// At or below PostgREST's default `max-rows`, so a short page means the end.
pub const PAGE_SIZE: usize = 1000;

/// PostgREST client for the `profiles` and `eco_actions` tables.
pub struct RemoteStore {
    client: Client,
    base_url: String,
}

impl RemoteStore {
    pub fn new(url: &str, key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY, HeaderValue::from_str(key)?);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{REST_PATH}/{table}", self.base_url)
    }

    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status { status, body: text });
        }
        event!(Level::TRACE, response = text);

        Ok(serde_json::from_str(&text)?)
    }
}

pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Requests `page_size` rows at a time until a page comes back short.
pub async fn collect_pages<T, F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<T>, StoreError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, StoreError>>,
{
    let mut rows = Vec::new();

    loop {
        let page = fetch(rows.len(), page_size).await?;
        let done = page.len() < page_size;
        rows.extend(page);

        if done {
            return Ok(rows);
        }
    }
}

/// Filter matching the previously read `points` value.
pub fn points_filter(expected: Option<i64>) -> String {
    match expected {
        Some(points) => eq(points),
        None => "is.null".to_string(),
    }
}

#[async_trait]
impl ProfileStore for RemoteStore {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let request = self
            .client
            .get(self.table_url(PROFILES_TABLE))
            .query(&[("select", "id,points".to_string()), ("id", eq(user_id))]);

        let rows: Vec<Profile> = self.rows(request).await?;

        Ok(rows.into_iter().next())
    }

    #[instrument(level = "debug", skip(self))]
    async fn set_points(&self, user_id: &str, points: i64) -> Result<Vec<Profile>, StoreError> {
        let request = self
            .client
            .patch(self.table_url(PROFILES_TABLE))
            .header(PREFER, RETURN_ROWS)
            .query(&[("id", eq(user_id))])
            .json(&json!({ "points": points }));

        self.rows(request).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn swap_points(
        &self,
        user_id: &str,
        expected: Option<i64>,
        points: i64,
    ) -> Result<Vec<Profile>, StoreError> {
        let request = self
            .client
            .patch(self.table_url(PROFILES_TABLE))
            .header(PREFER, RETURN_ROWS)
            .query(&[("id", eq(user_id)), ("points", points_filter(expected))])
            .json(&json!({ "points": points }));

        self.rows(request).await
    }
}

#[async_trait]
impl ActionStore for RemoteStore {
    #[instrument(level = "debug", skip(self, action), fields(user_id = %action.user_id))]
    async fn insert_action(&self, action: &NewEcoAction) -> Result<Vec<EcoAction>, StoreError> {
        let request = self
            .client
            .post(self.table_url(ACTIONS_TABLE))
            .header(PREFER, RETURN_ROWS)
            .json(action);

        self.rows(request).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_impacts(&self, user_id: &str) -> Result<Vec<ImpactRow>, StoreError> {
        let rows = collect_pages(PAGE_SIZE, move |offset, limit| {
            let request = self.client.get(self.table_url(ACTIONS_TABLE)).query(&[
                ("select", IMPACT_COLUMNS.to_string()),
                ("user_id", eq(user_id)),
                ("order", "id".to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ]);

            self.rows(request)
        })
        .await?;

        event!(Level::DEBUG, rows = rows.len(), "Listed impacts");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_filter() {
        assert_eq!(points_filter(Some(40)), "eq.40");
        assert_eq!(points_filter(Some(-3)), "eq.-3");
        assert_eq!(points_filter(None), "is.null");
    }

    #[tokio::test]
    async fn test_collect_pages_walks_past_the_cap() {
        let all: Vec<u32> = (0..2500).collect();
        let mut requested = Vec::new();

        let rows: Vec<u32> = collect_pages(PAGE_SIZE, |offset, limit| {
            requested.push(offset);
            let page = all.iter().skip(offset).take(limit).copied().collect();
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(rows, all);
        assert_eq!(requested, vec![0, 1000, 2000]);
    }

    #[tokio::test]
    async fn test_collect_pages_exact_multiple_ends_on_empty_page() {
        let mut calls = 0;

        let rows: Vec<u32> = collect_pages(2, |offset, _| {
            calls += 1;
            let page = if offset < 4 { vec![1, 1] } else { Vec::new() };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_error() {
        let result: Result<Vec<u32>, _> =
            collect_pages(2, |_, _| async { Err(StoreError::Empty("page")) }).await;

        assert!(matches!(result, Err(StoreError::Empty("page"))));
    }

    #[test]
    fn test_table_url_trims_slash() {
        let store = RemoteStore::new("https://abc.supabase.co/", "key").unwrap();
        assert_eq!(
            store.table_url(PROFILES_TABLE),
            "https://abc.supabase.co/rest/v1/profiles"
        );
    }

    #[test]
    fn test_rejects_unprintable_key() {
        assert!(matches!(
            RemoteStore::new("https://abc.supabase.co", "bad\nkey"),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
