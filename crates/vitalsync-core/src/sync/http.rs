//! HTTP implementation of [`RemoteStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::remote::{DeviceSummary, PlanSummary, RemoteStore, SyncRecord, TrendSummary, UserProfile};
use super::types::{SyncError, UploadResult};
use crate::date_codec::DateCodec;
use crate::error::ConfigError;
use crate::storage::RemoteConfig;

/// Remote store speaking the backend's JSON API.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    upload_timeout: Duration,
    request_timeout: Duration,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    syncs: Vec<SyncRecord>,
}

impl HttpRemoteStore {
    /// Build a store from the `[remote]` config section.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "remote.base_url".into(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "remote.base_url".into(),
                message: format!("not an http(s) base URL: {base_url}"),
            });
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SyncError> {
        let request = self.authorized(self.client.get(url).timeout(self.request_timeout));
        let text = send(request).await?;
        decode(&text)
    }
}

/// Send `request`, turning transport failures and non-2xx replies into errors.
async fn send(request: RequestBuilder) -> Result<String, SyncError> {
    let response = request
        .send()
        .await
        .map_err(|e| SyncError::NetworkError(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SyncError::NetworkError(e.to_string()))?;

    if !status.is_success() {
        return Err(SyncError::ServerError {
            status: status.as_u16(),
            message: error_detail(&text),
        });
    }
    Ok(text)
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, SyncError> {
    serde_json::from_str(text).map_err(|e| SyncError::DecodingFailed(e.to_string()))
}

/// The server's `detail` message when present, otherwise the raw body.
fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());
    match detail {
        Some(serde_json::Value::String(message)) => message,
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn upload(&self, body: Vec<u8>) -> Result<UploadResult, SyncError> {
        let url = self.endpoint(&["api", "healthkit", "sync"]);
        tracing::debug!(%url, bytes = body.len(), "uploading batch");
        let request = self.authorized(
            self.client
                .post(url)
                .timeout(self.upload_timeout)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
        );
        let text = send(request).await?;
        decode(&text)
    }

    async fn fetch_trend(
        &self,
        device_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TrendSummary, SyncError> {
        let mut url = self.endpoint(&["api", "lifestyle", "summary", device_id]);
        url.query_pairs_mut()
            .append_pair("start", &DateCodec::format_day(start))
            .append_pair("end", &DateCodec::format_day(end));
        self.get_json(url).await
    }

    async fn me(&self) -> Result<UserProfile, SyncError> {
        self.get_json(self.endpoint(&["api", "auth", "me"])).await
    }

    async fn exercise_plan(&self, user_id: &str) -> Result<Option<PlanSummary>, SyncError> {
        match self
            .get_json(self.endpoint(&["api", "plans", "exercise", user_id]))
            .await
        {
            Ok(plan) => Ok(Some(plan)),
            Err(SyncError::ServerError { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sync_history(&self, device_id: &str) -> Result<Vec<SyncRecord>, SyncError> {
        let response: HistoryResponse = self
            .get_json(self.endpoint(&["api", "healthkit", "history", device_id]))
            .await?;
        Ok(response.syncs)
    }

    async fn device_summary(&self, device_id: &str) -> Result<DeviceSummary, SyncError> {
        self.get_json(self.endpoint(&["api", "healthkit", "summary", device_id]))
            .await
    }
}
