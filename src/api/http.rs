use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{Draft, StoreConfig, UserId, UserRecord, UserStore};
use crate::error::{StoreError, StoreResult};

const USERS: &str = "/users";

fn user_path(id: UserId) -> String {
    format!("{USERS}/{id}")
}

/// [`UserStore`] backed by a JSON REST API exposing `/users`.
#[derive(Clone)]
pub struct HttpUserStore {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for HttpUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUserStore")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpUserStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!(%base_url, timeout_ms = config.timeout.as_millis() as u64, "user store ready");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, method: &'static str, path: &str, req: RequestBuilder) -> StoreResult<Response> {
        let response = req.send().await?;
        debug!(method, path, status = response.status().as_u16(), "request finished");
        Ok(response)
    }

    async fn json_or_status<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl UserStore for HttpUserStore {
    async fn list(&self) -> StoreResult<Vec<UserRecord>> {
        let req = self.client.get(self.url(USERS));
        let response = self.send("GET", USERS, req).await?;
        Self::json_or_status(response).await
    }

    async fn create(&self, draft: &Draft) -> StoreResult<UserRecord> {
        let req = self.client.post(self.url(USERS)).json(&draft.payload());
        let response = self.send("POST", USERS, req).await?;
        Self::json_or_status(response).await
    }

    async fn update(&self, id: UserId, record: &UserRecord) -> StoreResult<UserRecord> {
        let path = user_path(id);
        let req = self.client.patch(self.url(&path)).json(record);
        let response = self.send("PATCH", &path, req).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id));
        }
        Self::json_or_status(response).await
    }

    async fn delete(&self, id: UserId) -> StoreResult<u16> {
        let path = user_path(id);
        let req = self.client.delete(self.url(&path));
        let response = self.send("DELETE", &path, req).await?;
        Ok(response.status().as_u16())
    }
}
