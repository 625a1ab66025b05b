//! HTTP client helpers for tests.

use std::time::Duration;

use serde_json::Value;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Status code and decoded envelope of one call.
#[derive(Debug)]
pub struct EnvelopeResponse {
    pub status: u16,
    pub body: Value,
}

impl EnvelopeResponse {
    pub fn code(&self) -> u64 {
        self.body["code"].as_u64().unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<EnvelopeResponse, TestClientError> {
        let resp = self.add_headers(builder).send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).map_err(|_| TestClientError::NotJson(status, text))?;
        Ok(EnvelopeResponse { status, body })
    }

    pub async fn embeddings(&self, body: Value) -> Result<EnvelopeResponse, TestClientError> {
        self.send(self.client.post(self.url("/v1/embeddings")).json(&body))
            .await
    }

    pub async fn rerank(&self, body: Value) -> Result<EnvelopeResponse, TestClientError> {
        self.send(self.client.post(self.url("/v1/rerank")).json(&body))
            .await
    }

    pub async fn get(&self, path: &str) -> Result<EnvelopeResponse, TestClientError> {
        self.send(self.client.get(self.url(path))).await
    }

    pub async fn post_raw(
        &self,
        path: &str,
        body: &'static str,
    ) -> Result<EnvelopeResponse, TestClientError> {
        self.send(
            self.client
                .post(self.url(path))
                .header("Content-Type", "application/json")
                .body(body),
        )
        .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Response with status {0} is not JSON: {1}")]
    NotJson(u16, String),
}
