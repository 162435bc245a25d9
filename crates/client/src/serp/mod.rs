//! Web search API client.
//!
//! ### Protocol
//!
//! - **Endpoint**: `https://serpapi.com/search` (configurable)
//! - **Authentication**: bearer token.
//! - **Request**: `engine`, `q`, `num`, `gl`, `hl`, plus optional `location`
//!   and `google_domain` as query parameters.
//! - **Response**: `organic_results` array of `{title, link, snippet}`; an
//!   `error` field reports failures, including quota exhaustion.
//! - **Normalization**: results become [`SearchResult`]s with absent fields
//!   rendered as empty strings. One call is one attempt; retries live in
//!   [`crate::RetryingClient`].

pub mod request;
pub mod response;

pub use request::SearchRequest;
pub use response::{OrganicResult, SerpApiResponse, is_no_results_message};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use sitelens_core::{AppConfig, SearchResult};

use crate::error::excerpt;
use crate::{ProviderError, SearchProvider, SearchQuery, credential_suffix, is_quota_message};

/// Default search endpoint.
const DEFAULT_BASE_URL: &str = "https://serpapi.com/search";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "sitelens/0.1";

/// Search client configuration.
#[derive(Clone)]
pub struct SerpConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub engine: String,
    pub country: String,
    pub language: String,
    pub location: Option<String>,
    pub domain: Option<String>,
}

impl std::fmt::Debug for SerpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl Default for SerpConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            engine: "google".into(),
            country: "us".into(),
            language: "en".into(),
            location: None,
            domain: None,
        }
    }
}

impl SerpConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.search_api_key.clone().unwrap_or_default(),
            base_url: config.search_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            engine: config.search_engine.clone(),
            country: config.search_country.clone(),
            language: config.search_language.clone(),
            location: config.search_location.clone(),
            domain: config.search_domain.clone(),
        }
    }
}

/// Web search API client.
#[derive(Debug, Clone)]
pub struct SerpClient {
    http: reqwest::Client,
    config: SerpConfig,
}

impl SerpClient {
    /// Create a client. Fails when no API key is configured.
    pub fn new(config: SerpConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { http, config })
    }

    /// Build the request parameters for a query.
    pub fn request_for(&self, query: &SearchQuery) -> SearchRequest {
        SearchRequest {
            engine: self.config.engine.clone(),
            q: query.q.clone(),
            num: query.num,
            gl: self.config.country.clone(),
            hl: self.config.language.clone(),
            location: self.config.location.clone(),
            google_domain: self.config.domain.clone(),
        }
    }

    /// Execute a single search attempt.
    pub async fn execute(&self, req: &SearchRequest) -> Result<Vec<SearchResult>, ProviderError> {
        req.validate()?;

        let start = Instant::now();
        tracing::debug!("searching: query={}", req.q);

        let http_response = self
            .http
            .get(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .query(req)
            .send()
            .await?;

        let status = http_response.status();
        let body = http_response.text().await?;
        tracing::debug!("search API response status: {}", status);

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let api_response: SerpApiResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if let Some(message) = api_response.error.as_deref() {
            if is_quota_message(message) {
                return Err(ProviderError::QuotaExhausted(excerpt(message)));
            }
            if is_no_results_message(message) {
                tracing::debug!("search returned no results: query={}", req.q);
                return Ok(Vec::new());
            }
            return Err(ProviderError::Malformed(excerpt(message)));
        }

        let results = api_response.into_results(req.num);
        tracing::debug!("search completed in {:?}, {} results", start.elapsed(), results.len());
        Ok(results)
    }
}

#[async_trait]
impl SearchProvider for SerpClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ProviderError> {
        self.execute(&self.request_for(query)).await
    }

    fn credential_suffix(&self) -> Option<String> {
        Some(credential_suffix(&self.config.api_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SerpClient {
        SerpClient::new(SerpConfig {
            api_key: "test-key-1234".into(),
            base_url: format!("{}/search", server.uri()),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_client_new_missing_key() {
        assert!(matches!(SerpClient::new(SerpConfig::default()), Err(ProviderError::MissingApiKey)));
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = SerpConfig { api_key: "secret-value".into(), ..Default::default() };
        assert!(!format!("{:?}", config).contains("secret-value"));
    }

    #[tokio::test]
    async fn test_search_sends_params_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Imminent Domain Nevada"))
            .and(query_param("engine", "google"))
            .and(query_param("num", "2"))
            .and(query_param("gl", "us"))
            .and(query_param("hl", "en"))
            .and(header_eq("authorization", "Bearer test-key-1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [
                    {"title": "Imminent Domain", "link": "https://example.com/a", "snippet": "A project"},
                    {"title": "Second", "link": "https://example.com/b"},
                    {"title": "Third"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client(&server).search(&SearchQuery::new("Imminent Domain Nevada", 2)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].link, "https://example.com/a");
        assert_eq!(results[1].snippet, "");
    }

    #[tokio::test]
    async fn test_quota_error_in_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({"error": "Your account has run out of searches."})),
            )
            .mount(&server)
            .await;

        let err = client(&server).search(&SearchQuery::new("q", 5)).await.unwrap_err();
        assert!(matches!(err, ProviderError::QuotaExhausted(_)));
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn test_quota_error_with_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "Your account has run out of searches."})),
            )
            .mount(&server)
            .await;

        let err = client(&server).search(&SearchQuery::new("q", 5)).await.unwrap_err();
        assert!(matches!(err, ProviderError::QuotaExhausted(_)));
    }

    #[tokio::test]
    async fn test_no_results_is_empty_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"error": "Google hasn't returned any results for this query."}),
            ))
            .mount(&server)
            .await;

        let results = client(&server).search(&SearchQuery::new("zzqx", 5)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        let err = client(&server).search(&SearchQuery::new("q", 5)).await.unwrap_err();
        assert!(matches!(err, ProviderError::HttpError { status: 503 }));
        assert!(!err.is_terminal());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = client(&server).search(&SearchQuery::new("q", 5)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_invalid_request_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let err = client(&server).search(&SearchQuery::new("", 5)).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn test_credential_suffix() {
        let client = SerpClient::new(SerpConfig { api_key: "abcdef9876".into(), ..Default::default() }).unwrap();
        assert_eq!(client.credential_suffix().as_deref(), Some("9876"));
    }
}
