//! REST implementation of the backend gateway

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{BackendGateway, BackendUserId, GatewayResult};
use crate::config::BackendConfig;
use crate::errors::GatewayError;
use crate::word_model::{HintType, Language, ProgressRecord, QueueFilters, Settings, SettingsPatch, StudyItem};

/// Backend gateway talking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Deserialize)]
struct UserBody {
    id: BackendUserId,
}

impl HttpBackend {
    /// Build a client with the configured request timeout
    pub fn new(base_url: &str, config: &BackendConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.detail)
            .unwrap_or(body);
        warn!(status = status.as_u16(), detail = %detail, "Backend rejected request");
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Unavailable(e.to_string())
            } else {
                GatewayError::Rejected {
                    status,
                    detail: format!("invalid response body: {e}"),
                }
            }
        })
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    match e.status() {
        Some(status) => GatewayError::Rejected {
            status: status.as_u16(),
            detail: e.to_string(),
        },
        None => GatewayError::Unavailable(e.to_string()),
    }
}

impl BackendGateway for HttpBackend {
    async fn health_check(&self) -> GatewayResult<()> {
        self.send(self.client.get(self.url("/health"))).await?;
        Ok(())
    }

    async fn resolve_user(&self, telegram_id: i64) -> GatewayResult<BackendUserId> {
        let body: UserBody = self
            .send_json(self.client.post(self.url(&format!("/users/telegram/{telegram_id}"))))
            .await?;
        debug!(telegram_id, backend_user_id = body.id, "Resolved backend user");
        Ok(body.id)
    }

    async fn list_languages(&self) -> GatewayResult<Vec<Language>> {
        self.send_json(self.client.get(self.url("/languages"))).await
    }

    async fn fetch_study_items(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        filters: QueueFilters,
        page_size: usize,
    ) -> GatewayResult<Vec<StudyItem>> {
        let request = self
            .client
            .get(self.url(&format!("/users/{user_id}/languages/{language_id}/words")))
            .query(&[
                ("start_word", filters.start_word.to_string()),
                ("skip_marked", filters.skip_marked.to_string()),
                ("use_check_date", filters.use_check_date.to_string()),
                ("limit", page_size.to_string()),
            ]);
        self.send_json(request).await
    }

    async fn get_settings(&self, user_id: BackendUserId, language_id: &str) -> GatewayResult<Settings> {
        self.send_json(
            self.client
                .get(self.url(&format!("/users/{user_id}/languages/{language_id}/settings"))),
        )
        .await
    }

    async fn put_settings(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        patch: &SettingsPatch,
    ) -> GatewayResult<Settings> {
        self.send_json(
            self.client
                .patch(self.url(&format!("/users/{user_id}/languages/{language_id}/settings")))
                .json(patch),
        )
        .await
    }

    async fn get_progress(&self, user_id: BackendUserId, word_id: i64) -> GatewayResult<Option<ProgressRecord>> {
        let request = self
            .client
            .get(self.url(&format!("/users/{user_id}/words/{word_id}/progress")));
        match self.send_json(request).await {
            Ok(record) => Ok(Some(record)),
            Err(GatewayError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_progress(
        &self,
        user_id: BackendUserId,
        word_id: i64,
        record: &ProgressRecord,
    ) -> GatewayResult<ProgressRecord> {
        self.send_json(
            self.client
                .put(self.url(&format!("/users/{user_id}/words/{word_id}/progress")))
                .json(record),
        )
        .await
    }

    async fn put_hint(
        &self,
        user_id: BackendUserId,
        word_id: i64,
        hint_type: HintType,
        text: &str,
    ) -> GatewayResult<()> {
        let body = serde_json::json!({ "text": text });
        self.send(
            self.client
                .put(self.url(&format!("/users/{user_id}/words/{word_id}/hints/{hint_type}")))
                .json(&body),
        )
        .await?;
        Ok(())
    }
}
