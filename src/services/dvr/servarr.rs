//! HTTP plumbing shared by the Radarr and Sonarr clients (both speak the v3 API).

use reqwest::{Client as HttpClient, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{dvr::ServarrQueuePage, dvr::ServarrQueueRecord, QueueEntry},
    settings::ServiceProfile,
};

const QUEUE_PAGE_SIZE: &str = "1000";

#[derive(Clone)]
pub struct ServarrApi {
    http_client: HttpClient,
    api_url: String,
    api_key: String,
    service: &'static str,
}

impl ServarrApi {
    pub fn new(profile: &ServiceProfile, service: &'static str) -> Self {
        Self::with_url(profile.api_url(), profile.api_key.clone(), service)
    }

    pub fn with_url(api_url: String, api_key: String, service: &'static str) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            service,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.api_url, path))
            .header("X-Api-Key", &self.api_key)
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> AppResult<reqwest::Response> {
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                service = self.service,
                path = %path,
                status = %status,
                "DVR request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "{} API returned status {}: {}",
                self.service, status, body
            )));
        }

        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(&self, response: reqwest::Response) -> AppResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse {} response: {}", self.service, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let response = self
            .send(path, self.request(Method::GET, path).query(query))
            .await?;
        self.parse(response).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let response = self
            .send(path, self.request(Method::POST, path).json(body))
            .await?;
        self.parse(response).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> AppResult<()> {
        self.send(path, self.request(Method::DELETE, path).query(query))
            .await?;
        Ok(())
    }

    /// First page of the active queue, sized to hold every entry in practice
    pub async fn queue(&self) -> AppResult<Vec<QueueEntry>> {
        let page: ServarrQueuePage = self
            .get(
                "/queue",
                &[
                    ("page", "1".to_string()),
                    ("pageSize", QUEUE_PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        if page.total_records > page.records.len() as i64 {
            tracing::warn!(
                service = self.service,
                total = page.total_records,
                fetched = page.records.len(),
                "Queue has more entries than one page"
            );
        }

        Ok(page
            .records
            .into_iter()
            .filter_map(ServarrQueueRecord::into_entry)
            .collect())
    }

    pub async fn remove_queue_entry(&self, entry_id: i64) -> AppResult<()> {
        self.delete(
            &format!("/queue/{}", entry_id),
            &[
                ("removeFromClient", "true".to_string()),
                ("blocklist", "false".to_string()),
            ],
        )
        .await
    }
}

/// Reads a numeric `id` field from a lookup payload; `0` or absent means untracked
pub fn tracked_id(value: &serde_json::Value) -> Option<i64> {
    value.get("id").and_then(|id| id.as_i64()).filter(|id| *id > 0)
}
