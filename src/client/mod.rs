//! HTTP client for the Whisparr v3 REST API.
//!
//! Every entity is addressed the same way under `<base>/api/v3/<path>`, so
//! the client exposes generic list/get/create/update/delete operations over
//! any [`ApiResource`]. Each call is exactly one request; failures are
//! mapped onto [`ProviderError`] by status code.

#[allow(missing_docs)]
pub mod models;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use models::{ErrorBody, SystemStatus, ValidationFailure};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

const API_PREFIX: &str = "api/v3/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY: usize = 200;

/// An entity served by a Whisparr collection endpoint.
pub trait ApiResource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection path below `api/v3/`, e.g. `tag`.
    const PATH: &'static str;
    /// Whether writes pass `forceSave=true` to skip Whisparr's connection test.
    const FORCE_SAVE: bool = false;
}

/// Client for a single Whisparr instance.
#[derive(Clone)]
pub struct WhisparrClient {
    http: Client,
    base_url: Url,
}

impl std::fmt::Debug for WhisparrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisparrClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl WhisparrClient {
    /// Build a client from resolved configuration. No request is made.
    pub fn new(config: &ResolvedConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ProviderError::Configuration(format!("invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ProviderError::Configuration(format!("invalid value for header '{}': {}", name, e))
            })?;
            headers.insert(name, value);
        }

        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            ProviderError::Configuration("API key is not a valid header value".into())
        })?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, force_save: bool) -> Result<Url, ProviderError> {
        let mut url = self
            .base_url
            .join(&format!("{}{}", API_PREFIX, path))
            .map_err(|e| {
                ProviderError::Configuration(format!("invalid endpoint '{}': {}", path, e))
            })?;
        if force_save {
            url.query_pairs_mut().append_pair("forceSave", "true");
        }
        Ok(url)
    }

    /// `GET <path>`: every entity of a kind.
    pub async fn list<R: ApiResource>(&self) -> Result<Vec<R>, ProviderError> {
        let url = self.endpoint(R::PATH, false)?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// `GET <path>/<id>`.
    pub async fn get<R: ApiResource>(&self, id: i64) -> Result<R, ProviderError> {
        let url = self.endpoint(&format!("{}/{}", R::PATH, id), false)?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// `POST <path>`, returning the created entity.
    pub async fn create<R: ApiResource>(&self, body: &R) -> Result<R, ProviderError> {
        let url = self.endpoint(R::PATH, R::FORCE_SAVE)?;
        self.send(Method::POST, url, Some(body)).await
    }

    /// `PUT <path>/<id>`, returning the updated entity.
    pub async fn update<R: ApiResource>(&self, id: i64, body: &R) -> Result<R, ProviderError> {
        let url = self.endpoint(&format!("{}/{}", R::PATH, id), R::FORCE_SAVE)?;
        self.send(Method::PUT, url, Some(body)).await
    }

    /// `DELETE <path>/<id>`.
    pub async fn delete<R: ApiResource>(&self, id: i64) -> Result<(), ProviderError> {
        let url = self.endpoint(&format!("{}/{}", R::PATH, id), false)?;
        self.execute(self.http.delete(url.clone()), "DELETE", &url).await?;
        Ok(())
    }

    /// `GET system/status`.
    pub async fn system_status(&self) -> Result<SystemStatus, ProviderError> {
        let url = self.endpoint("system/status", false)?;
        self.send(Method::GET, url, None::<&()>).await
    }

    async fn send<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let verb = method.as_str().to_string();
        let mut request = self.http.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.execute(request, &verb, &url).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::Api(format!(
                "{} {} returned an unexpected body: {}",
                verb,
                url.path(),
                e
            ))
        })
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        verb: &str,
        url: &Url,
    ) -> Result<reqwest::Response, ProviderError> {
        debug!(method = verb, url = %url, "Whisparr request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::DeadlineExceeded(format!("{} {} timed out", verb, url.path()))
            } else {
                ProviderError::Http(e)
            }
        })?;

        let status = response.status();
        debug!(method = verb, url = %url, status = status.as_u16(), "Whisparr response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        warn!(method = verb, url = %url, status = status.as_u16(), "Whisparr request failed");
        Err(ProviderError::from_status(
            status,
            &format!("{} {}", verb, url.path()),
            &message,
        ))
    }
}

/// Extract a readable message from a Whisparr error body.
///
/// 400 responses carry an array of validation failures; other errors carry
/// `{"message": ...}`. Anything else is passed through, truncated.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }

    if let Ok(failures) = serde_json::from_str::<Vec<ValidationFailure>>(body) {
        return failures
            .into_iter()
            .map(|f| match f.property_name.filter(|p| !p.is_empty()) {
                Some(property) => format!("{}: {}", property, f.error_message),
                None => f.error_message,
            })
            .collect::<Vec<_>>()
            .join("; ");
    }

    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        return match error.description.filter(|d| !d.is_empty() && status.is_server_error()) {
            Some(description) => format!("{} ({})", error.message, description),
            None => error.message,
        };
    }

    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
