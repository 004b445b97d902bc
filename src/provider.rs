//! The Whisparr provider.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::client::WhisparrClient;
use crate::config::{self, ProviderConfig};
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::{self, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Provider managing one Whisparr instance.
pub struct WhisparrProvider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<String, Box<dyn DataSource>>,
    client: RwLock<Option<WhisparrClient>>,
    env: fn(&str) -> Option<String>,
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl WhisparrProvider {
    /// Create an unconfigured provider reading fallbacks from the process
    /// environment.
    pub fn new() -> Self {
        Self::with_env(process_env)
    }

    /// Create an unconfigured provider with a custom environment lookup.
    pub fn with_env(env: fn(&str) -> Option<String>) -> Self {
        Self {
            resources: resources::all()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
            client: RwLock::new(None),
            env,
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| {
                ProviderError::UnknownResource(format!("unknown resource type: {}", resource_type))
            })
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(|d| d.as_ref())
            .ok_or_else(|| {
                ProviderError::UnknownResource(format!(
                    "unknown data source type: {}",
                    data_source_type
                ))
            })
    }

    async fn client(&self) -> Result<WhisparrClient, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::FailedPrecondition("provider is not configured".to_string())
        })
    }

    fn load_config(&self, config: &Value) -> Result<ProviderConfig, ProviderError> {
        Ok(ProviderConfig::from_value(config)?.with_fallbacks(self.env))
    }
}

impl Default for WhisparrProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderService for WhisparrProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(config::provider_schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |schema, (name, r)| schema.with_resource(*name, r.schema()));
        self.data_sources
            .iter()
            .fold(schema, |schema, (name, d)| schema.with_data_source(name.clone(), d.schema()))
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&config::provider_schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }
        diagnostics.extend(self.load_config(&config)?.validate());
        Ok(diagnostics)
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = self.validate_provider_config(config.clone()).await?;
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let resolved = self.load_config(&config)?.resolve()?;
        let client = WhisparrClient::new(&resolved)?;
        info!(url = %client.base_url(), "configured");
        *self.client.write().await = Some(client);
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        debug!("client released");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let schema_version = self.resource(resource_type)?.schema().version as i64;
        if version > schema_version {
            return Err(ProviderError::FailedPrecondition(format!(
                "{} state version {} is newer than schema version {}",
                resource_type, version, schema_version
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource(resource_type)?.schema();
        Ok(plan_resource(&schema, prior_state.as_ref(), &proposed_state))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.create(&self.client().await?, planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.read(&self.client().await?, current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource
            .update(&self.client().await?, prior_state, planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.delete(&self.client().await?, current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let state = resource.import(&self.client().await?, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        data_source.read(&self.client().await?, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_with_key(name: &str) -> Option<String> {
        (name == config::API_KEY_ENV).then(|| "from-env".to_string())
    }

    #[test]
    fn test_schema_lists_everything() {
        let schema = WhisparrProvider::with_env(no_env).schema();
        assert_eq!(schema.resources.len(), 9);
        assert!(schema.data_sources.contains_key("whisparr_system_status"));
        assert!(schema.data_sources.contains_key("whisparr_download_clients"));
        assert!(schema.provider.attribute("api_key").unwrap().flags.sensitive);
    }

    #[tokio::test]
    async fn test_configure_requires_api_key() {
        let provider = WhisparrProvider::with_env(no_env);
        let diags = provider
            .configure(json!({"url": "http://whisparr:6969"}))
            .await
            .unwrap();
        assert!(diags.iter().any(|d| d.is_error()));
        assert_err!(provider.client().await);
    }

    #[tokio::test]
    async fn test_configure_uses_env_fallback() {
        let provider = WhisparrProvider::with_env(env_with_key);
        let diags = provider
            .configure(json!({"url": "http://whisparr:6969"}))
            .await
            .unwrap();
        assert!(diags.is_empty(), "{:?}", diags);
        let client = assert_ok!(provider.client().await);
        assert_eq!(client.base_url().as_str(), "http://whisparr:6969/");
    }

    #[tokio::test]
    async fn test_unconfigured_create_fails() {
        let provider = WhisparrProvider::with_env(no_env);
        let err = provider
            .create("whisparr_tag", json!({"id": null, "label": "vr"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = WhisparrProvider::with_env(no_env);
        assert!(matches!(
            provider.read("whisparr_movie", json!({})).await,
            Err(ProviderError::UnknownResource(_))
        ));
        assert!(matches!(
            provider.read_data_source("whisparr_scenes", json!({})).await,
            Err(ProviderError::UnknownResource(_))
        ));
    }

    #[tokio::test]
    async fn test_upgrade_passes_state_through() {
        let provider = WhisparrProvider::with_env(no_env);
        let state = json!({"id": 1, "label": "vr"});
        let upgraded = provider
            .upgrade_resource_state("whisparr_tag", 0, state.clone())
            .await
            .unwrap();
        assert_eq!(upgraded, state);
        assert_err!(provider.upgrade_resource_state("whisparr_tag", 3, state).await);
    }

    #[tokio::test]
    async fn test_stop_releases_client() {
        let provider = WhisparrProvider::with_env(env_with_key);
        provider
            .configure(json!({"url": "http://whisparr:6969"}))
            .await
            .unwrap();
        assert_ok!(provider.stop().await);
        assert_err!(provider.client().await);
    }
}
