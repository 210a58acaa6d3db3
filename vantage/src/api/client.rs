use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

use super::anomaly_notifications::AnomalyNotification;
use super::budgets::Budget;
use super::common::{ApiErrorResponse, CollectionApi, Links};
use super::cost_reports::CostReport;
use super::error::ApiError;
use super::financial_commitment_reports::FinancialCommitmentReport;
use super::kubernetes_efficiency_reports::KubernetesEfficiencyReport;
use super::managed_accounts::ManagedAccount;
use super::resource_reports::ResourceReport;
use super::virtual_tag_configs::VirtualTagConfig;

pub const DEFAULT_HOST: &str = "https://api.vantage.sh";

/// Vantage API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based), doubling up to the cap
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 2_u64
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

/// An absolute http(s) URL with a host
pub fn validate_host(host: &str) -> Result<Url, ApiError> {
    let parsed = Url::parse(host).map_err(|_| ApiError::InvalidHost(host.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::InvalidHost(host.to_string()));
    }
    Ok(parsed)
}

#[derive(Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(host: &str, api_token: &str) -> Result<Self, ApiError> {
        Self::with_config(host, api_token, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        host: &str,
        api_token: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        validate_host(host)?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(retry_config.timeout_seconds))
            .user_agent(concat!("terraform-provider-vantage/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: host.trim_end_matches('/').to_string(),
                auth_header: format!("Bearer {}", api_token),
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn cost_reports(&self) -> CollectionApi<'_, CostReport> {
        CollectionApi::new(self)
    }

    pub fn budgets(&self) -> CollectionApi<'_, Budget> {
        CollectionApi::new(self)
    }

    pub fn virtual_tag_configs(&self) -> CollectionApi<'_, VirtualTagConfig> {
        CollectionApi::new(self)
    }

    pub fn kubernetes_efficiency_reports(&self) -> CollectionApi<'_, KubernetesEfficiencyReport> {
        CollectionApi::new(self)
    }

    pub fn resource_reports(&self) -> CollectionApi<'_, ResourceReport> {
        CollectionApi::new(self)
    }

    pub fn managed_accounts(&self) -> CollectionApi<'_, ManagedAccount> {
        CollectionApi::new(self)
    }

    pub fn anomaly_notifications(&self) -> CollectionApi<'_, AnomalyNotification> {
        CollectionApi::new(self)
    }

    pub fn financial_commitment_reports(&self) -> CollectionApi<'_, FinancialCommitmentReport> {
        CollectionApi::new(self)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        self.execute_with_retry(Method::Get, &url, None::<&()>).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        self.execute_with_retry(Method::Post, &url, Some(body)).await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        self.execute_with_retry(Method::Put, &url, Some(body)).await
    }

    /// Execute a DELETE request with retry logic; the response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        self.execute_with_retry::<serde_json::Value, ()>(Method::Delete, &url, None)
            .await
            .map(|_| ())
    }

    /// Fetch every page of a collection. Each page is
    /// `{"<key>": [...], "links": {"next": "<absolute url>"}}`.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut url = format!("{}{}", self.inner.base_url, path);
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(url.clone()) {
                return Err(ApiError::ParseError(format!(
                    "pagination of {} loops back to {}",
                    path, url
                )));
            }
            let mut page: serde_json::Map<String, serde_json::Value> = self
                .execute_with_retry(Method::Get, &url, None::<&()>)
                .await?;

            let batch = page.remove(key).unwrap_or_default();
            if !batch.is_null() {
                let batch: Vec<T> = serde_json::from_value(batch).map_err(|e| {
                    ApiError::ParseError(format!("invalid {:?} list: {}", key, e))
                })?;
                items.extend(batch);
            }

            let links: Links = page
                .remove("links")
                .and_then(|links| serde_json::from_value(links).ok())
                .unwrap_or_default();
            match links.next {
                Some(next) if !next.is_empty() => url = self.absolute(&next),
                _ => break,
            }
        }

        tracing::debug!(
            path,
            pages = visited.len(),
            count = items.len(),
            "listed collection"
        );
        Ok(items)
    }

    /// `next` links are normally absolute, but tolerate a bare path
    fn absolute(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}{}", self.inner.base_url, link)
        }
    }

    /// Execute request with retry logic
    async fn execute_with_retry<T, B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = self.inner.retry_config.backoff_ms(attempt);
                tracing::debug!(url, backoff_ms = backoff, attempt, "retrying request");
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            let http = &self.inner.http_client;
            let mut request = match method {
                Method::Get => http.get(url),
                Method::Post => http.post(url),
                Method::Put => http.put(url),
                Method::Delete => http.delete(url),
            }
            .header(AUTHORIZATION, &self.inner.auth_header)
            .header(ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!(url, status = status.as_u16(), "API response");

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }

                    match status {
                        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                            return Err(ApiError::AuthError)
                        }
                        reqwest::StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
                        reqwest::StatusCode::TOO_MANY_REQUESTS => {
                            last_error = Some(ApiError::RateLimited)
                        }
                        s if s.is_server_error() => last_error = Some(ApiError::ServiceUnavailable),
                        _ => return self.handle_error_response(response).await,
                    }
                }
                Err(e) if e.is_timeout() => {
                    return Err(ApiError::Timeout(self.inner.retry_config.timeout_seconds))
                }
                Err(e) => return Err(ApiError::Request(e)),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; an empty body reads as JSON null
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!(error = %e, body = text, "failed to deserialize response");
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let errors = serde_json::from_str::<ApiErrorResponse>(&text)
            .map(ApiErrorResponse::messages)
            .unwrap_or_default();

        Err(ApiError::Api {
            status,
            message: text,
            errors,
        })
    }
}
