//! Provider configuration.
//!
//! The provider block accepts `url`, `api_key` and `extra_headers`. The
//! first two fall back to `WHISPARR_URL` and `WHISPARR_API_KEY` when unset, so
//! credentials can stay out of configuration files.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// Environment variable consulted when `url` is unset.
pub const URL_ENV: &str = "WHISPARR_URL";

/// Environment variable consulted when `api_key` is unset.
pub const API_KEY_ENV: &str = "WHISPARR_API_KEY";

/// Raw provider configuration as written by the user.
#[derive(Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Whisparr instance, e.g. `http://localhost:6969`.
    #[serde(default)]
    pub url: Option<String>,
    /// API key sent as `X-Api-Key`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Headers attached to every request.
    #[serde(default)]
    pub extra_headers: Option<BTreeMap<String, String>>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "extra_headers",
                &self.extra_headers.as_ref().map(|h| h.keys().collect::<Vec<_>>()),
            )
            .finish()
    }
}

/// Configuration with fallbacks applied and every value checked, ready to
/// build a client from.
#[derive(Clone)]
pub struct ResolvedConfig {
    /// Base URL, always ending in `/`.
    pub base_url: Url,
    /// API key.
    pub api_key: String,
    /// Extra request headers.
    pub extra_headers: BTreeMap<String, String>,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderConfig {
    /// Parse the provider block. A null block is an empty configuration.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Fill unset values from `lookup`, keyed by environment variable name.
    pub fn with_fallbacks(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !present(&self.url) {
            self.url = lookup(URL_ENV).filter(|s| !s.is_empty());
        }
        if !present(&self.api_key) {
            self.api_key = lookup(API_KEY_ENV).filter(|s| !s.is_empty());
        }
        self
    }

    /// Check the configuration, reporting every problem at once.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        match self.url.as_deref() {
            None | Some("") => diagnostics.push(
                Diagnostic::error("Missing Whisparr URL")
                    .with_detail(format!("Set `url` or the {} environment variable", URL_ENV))
                    .with_attribute("url"),
            ),
            Some(raw) => {
                if let Err(detail) = parse_base_url(raw) {
                    diagnostics.push(
                        Diagnostic::error("Invalid Whisparr URL")
                            .with_detail(detail)
                            .with_attribute("url"),
                    );
                }
            },
        }

        if self.api_key.as_deref().is_none_or(str::is_empty) {
            diagnostics.push(
                Diagnostic::error("Missing Whisparr API key")
                    .with_detail(format!(
                        "Set `api_key` or the {} environment variable",
                        API_KEY_ENV
                    ))
                    .with_attribute("api_key"),
            );
        }

        for (name, value) in self.extra_headers.iter().flatten() {
            let path = format!("extra_headers.{}", name);
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                diagnostics.push(
                    Diagnostic::error("Invalid header name")
                        .with_detail(format!("'{}' is not a valid HTTP header name", name))
                        .with_attribute(path),
                );
            } else if HeaderValue::from_str(value).is_err() {
                diagnostics.push(
                    Diagnostic::error("Invalid header value")
                        .with_detail(format!("The value of header '{}' is not valid", name))
                        .with_attribute(path),
                );
            }
        }

        diagnostics
    }

    /// Validate and convert into a [`ResolvedConfig`].
    pub fn resolve(self) -> Result<ResolvedConfig, ProviderError> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(Diagnostic::is_error)
            .map(|d| match d.detail {
                Some(detail) => format!("{}: {}", d.summary, detail),
                None => d.summary,
            })
            .collect();
        if !errors.is_empty() {
            return Err(ProviderError::Configuration(errors.join("; ")));
        }

        let raw_url = self.url.unwrap_or_default();
        let base_url = parse_base_url(&raw_url).map_err(ProviderError::Configuration)?;

        Ok(ResolvedConfig {
            base_url,
            api_key: self.api_key.unwrap_or_default(),
            extra_headers: self.extra_headers.unwrap_or_default(),
        })
    }
}

/// Parse a user supplied base URL. The result always ends in `/` so that
/// joining `api/v3/...` keeps any URL base Whisparr is served under.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| format!("'{}' is not a valid URL: {}", raw, e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "'{}' must use http or https, not {}",
            raw,
            url.scheme()
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("'{}' has no host", raw));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("'{}' must not carry a query or fragment", raw));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Schema of the provider block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("Manage the configuration of a Whisparr instance.")
        .with_attribute(
            "url",
            Attribute::optional_string().with_description(format!(
                "Full Whisparr URL including any URL base, e.g. `http://localhost:6969`. \
                 Falls back to {}.",
                URL_ENV
            )),
        )
        .with_attribute(
            "api_key",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!("Whisparr API key. Falls back to {}.", API_KEY_ENV)),
        )
        .with_attribute(
            "extra_headers",
            Attribute::optional(AttributeType::map(AttributeType::String))
                .with_description("Additional HTTP headers sent with every request."),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_from_value_null_is_empty() {
        let config = ProviderConfig::from_value(&Value::Null).unwrap();
        assert!(config.url.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_env_fallbacks_fill_missing_values() {
        let config = ProviderConfig::from_value(&json!({"url": null, "api_key": ""}))
            .unwrap()
            .with_fallbacks(|name| match name {
                URL_ENV => Some("http://whisparr:6969".to_string()),
                API_KEY_ENV => Some("abc123".to_string()),
                _ => None,
            });

        assert_eq!(config.url.as_deref(), Some("http://whisparr:6969"));
        assert_eq!(config.api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let config = ProviderConfig::from_value(&json!({"url": "http://a:1", "api_key": "k"}))
            .unwrap()
            .with_fallbacks(|_| Some("other".to_string()));

        assert_eq!(config.url.as_deref(), Some("http://a:1"));
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let config = ProviderConfig::from_value(&json!({
            "url": "ftp://whisparr",
            "extra_headers": {"bad header": "x"}
        }))
        .unwrap()
        .with_fallbacks(no_env);

        let diagnostics = config.validate();
        let attrs: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attrs, vec!["url", "api_key", "extra_headers.bad header"]);
    }

    #[test]
    fn test_resolve_normalizes_url_base() {
        let resolved = ProviderConfig::from_value(&json!({
            "url": "http://localhost:6969/whisparr",
            "api_key": "k",
            "extra_headers": {"X-Forwarded-User": "admin"}
        }))
        .unwrap()
        .resolve()
        .unwrap();

        assert_eq!(resolved.base_url.as_str(), "http://localhost:6969/whisparr/");
        assert_eq!(
            resolved.base_url.join("api/v3/tag").unwrap().as_str(),
            "http://localhost:6969/whisparr/api/v3/tag"
        );
        assert_eq!(resolved.extra_headers["X-Forwarded-User"], "admin");
    }

    #[test]
    fn test_resolve_missing_key_is_configuration_error() {
        let err = ProviderConfig::from_value(&json!({"url": "http://localhost:6969"}))
            .unwrap()
            .with_fallbacks(no_env)
            .resolve()
            .unwrap_err();

        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains("API key"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig {
            url: Some("http://localhost:6969".to_string()),
            api_key: Some("supersecret".to_string()),
            extra_headers: None,
        };
        assert!(!format!("{:?}", config).contains("supersecret"));
    }

    #[test]
    fn test_provider_schema_marks_api_key_sensitive() {
        let schema = provider_schema();
        assert!(schema.attribute("api_key").unwrap().flags.sensitive);
        assert!(schema.attribute("url").unwrap().flags.optional);
    }
}
