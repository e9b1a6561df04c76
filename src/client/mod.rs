/// HTTP transport for the MedInventory REST API
///
/// `ApiClient` only knows how to send a request and map the response; token
/// handling and retries live in the session manager.
pub mod endpoints;
pub mod expiry;

pub use expiry::HttpExpiryBackend;

use crate::{
    config::ApiConfig,
    error::{ClientError, ClientResult, ErrorBody},
    metrics,
};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// A request that can be sent (and re-sent after a token refresh)
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Low-cardinality label for metrics and logs
    pub endpoint: &'static str,
}

impl ApiRequest {
    pub fn get(endpoint: &'static str, path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            endpoint,
        }
    }

    pub fn post<B: Serialize>(
        endpoint: &'static str,
        path: impl Into<String>,
        body: &B,
    ) -> ClientResult<Self> {
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(serde_json::to_value(body)?),
            endpoint,
        })
    }

    pub fn put<B: Serialize>(
        endpoint: &'static str,
        path: impl Into<String>,
        body: &B,
    ) -> ClientResult<Self> {
        Ok(Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(serde_json::to_value(body)?),
            endpoint,
        })
    }
}

/// Thin reqwest wrapper bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the raw body of a successful response
    pub async fn send(&self, request: &ApiRequest, access_token: Option<&str>) -> ClientResult<Vec<u8>> {
        let request_id = Uuid::new_v4();
        debug!(
            "{} {} ({}) request_id={}",
            request.method, request.path, request.endpoint, request_id
        );

        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .header("x-request-id", request_id.to_string());
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} {} failed: {}", request.method, request.path, e);
                metrics::record_api_request(request.endpoint, "transport_error");
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            metrics::record_api_request(request.endpoint, "success");
            return Ok(body.to_vec());
        }

        let detail = error_detail(status, &body);
        if status == StatusCode::UNAUTHORIZED {
            metrics::record_api_request(request.endpoint, "unauthorized");
            debug!("{} {} rejected with 401", request.method, request.path);
            return Err(ClientError::Unauthorized(detail));
        }

        metrics::record_api_request(request.endpoint, "error");
        warn!(
            "{} {} returned {}: {}",
            request.method, request.path, status, detail
        );
        Err(ClientError::Api { status, detail })
    }

    /// Send and decode the JSON body; an empty body decodes as `null`
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> ClientResult<T> {
        let body = self.send(request, access_token).await?;
        decode_body(&body)
    }
}

pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Server-provided `detail`, or the status reason when the body has none
fn error_detail(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .map(|body| body.message())
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
