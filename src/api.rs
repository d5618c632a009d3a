// Directory clients: the two collaborators the search screen consumes, and
// their HTTP implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{time_slots_from_json, tutors_from_json, TimeSlot, Tutor};
use crate::schedule_search::SearchCriteria;

// Error types for directory calls
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Fixture error: {0}")]
    FixtureError(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

pub const BASE_URL_ENV: &str = "TUTOR_SEARCH_BASE_URL";
pub const API_TOKEN_ENV: &str = "TUTOR_SEARCH_API_TOKEN";
pub const TIMEOUT_ENV: &str = "TUTOR_SEARCH_TIMEOUT_MS";

// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
    pub tutors_path: String,
    pub time_slots_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_token: None,
            timeout_ms: 10_000,
            tutors_path: "/api/tutores".to_string(),
            time_slots_path: "/api/horarios/filtrar".to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `TUTOR_SEARCH_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }
        config.api_token = lookup(API_TOKEN_ENV).filter(|v| !v.is_empty());
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            config.timeout_ms = timeout.trim().parse().map_err(|_| {
                ClientError::ConfigError(format!("{} must be a number, got {:?}", TIMEOUT_ENV, timeout))
            })?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::ConfigError(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Lists every tutor on the marketplace
#[async_trait]
pub trait TutorDirectory: Send + Sync + 'static {
    async fn list_all_tutors(&self) -> Result<Vec<Tutor>, ApiError>;
}

// Filters bookable time slots. The result may contain `None` entries where
// the backend returned null.
#[async_trait]
pub trait ScheduleDirectory: Send + Sync + 'static {
    async fn filter_time_slots(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Option<TimeSlot>>, ApiError>;
}

/// HTTP client for both directories of the marketplace backend.
pub struct HttpDirectoryClient {
    client: Client,
    config: ClientConfig,
}

impl HttpDirectoryClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }

    // Reads a JSON array body. A null body counts as an empty list.
    async fn read_array(&self, response: Response) -> Result<Vec<Value>, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.timeout_ms)
            } else {
                ApiError::DecodeError(e.to_string())
            }
        })?;
        array_body(body)
    }
}

fn array_body(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(entries) => Ok(entries),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::DecodeError(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl TutorDirectory for HttpDirectoryClient {
    async fn list_all_tutors(&self) -> Result<Vec<Tutor>, ApiError> {
        let url = self.endpoint(&self.config.tutors_path);
        debug!(%url, "listing tutors");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Ok(tutors_from_json(self.read_array(response).await?))
    }
}

#[async_trait]
impl ScheduleDirectory for HttpDirectoryClient {
    async fn filter_time_slots(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Option<TimeSlot>>, ApiError> {
        let url = self.endpoint(&self.config.time_slots_path);
        debug!(%url, ?criteria, "filtering time slots");

        let response = self
            .authorize(self.client.post(&url).json(criteria))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Ok(time_slots_from_json(self.read_array(response).await?))
    }
}
