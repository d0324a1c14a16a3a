//! HTTP implementation of [`ChatBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::ChatBackend;
use super::types::{ChatReply, ChatRequest, ClearReply, SetRoleReply, SetRoleRequest};
use crate::config::BackendConfig;
use crate::error::{Result, WidgetError};

/// HTTP client for the widget backend.
///
/// # Example
///
/// ```rust,no_run
/// use chat_widget::backend::{ChatBackend, ChatRequest, HttpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new("http://localhost:5000")?;
/// let reply = backend
///     .chat(&ChatRequest {
///         message: "What is a B-tree?".into(),
///         role: "default".into(),
///     })
///     .await?;
/// println!("{}", reply.response);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend client with default HTTP settings.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Create a backend client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { base_url, http })
    }

    /// Build from the `backend` config section.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_client(&config.base_url, http)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(WidgetError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let response = self
            .http
            .post(self.url("/chat")?)
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn clear(&self) -> Result<ClearReply> {
        let response = self
            .http
            .post(self.url("/clear")?)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn set_role(&self, request: &SetRoleRequest) -> Result<SetRoleReply> {
        let response = self
            .http
            .post(self.url("/set_role")?)
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }
}
