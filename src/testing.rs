//! Drive a provider without a gRPC server.
//!
//! [`ProviderTester`] calls [`ProviderService`] methods directly and turns
//! error diagnostics into `Err`, so integration tests read as a sequence of
//! host calls:
//!
//! ```ignore
//! let tester = ProviderTester::new(WhisparrProvider::new());
//! tester.configure(json!({"url": server.uri(), "api_key": "key"})).await?;
//! let state = tester.lifecycle_create("whisparr_tag", json!({"label": "vr"})).await?;
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Test harness around a [`ProviderService`].
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Provider schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Validate the provider configuration; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration; error diagnostics become `Err`.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Raw diagnostics of a resource configuration, warnings included.
    pub async fn resource_diagnostics(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider
            .validate_resource_config(resource_type, config)
            .await
    }

    /// Plan a create. `config` is completed with nulls for every attribute
    /// of the resource schema it leaves out, as the host does.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let proposed = self.complete(resource_type, config);
        self.provider
            .plan(resource_type, None, proposed.clone(), proposed)
            .await
    }

    /// Plan an update of `prior_state` to `config`.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let proposed = self.complete(resource_type, config);
        self.provider
            .plan(resource_type, Some(prior_state), proposed.clone(), proposed)
            .await
    }

    /// Plan the destruction of `prior_state`.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a resource from a planned state.
    pub async fn create(
        &self,
        resource_type: &str,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned).await
    }

    /// Read a resource.
    pub async fn read(&self, resource_type: &str, current: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.update(resource_type, prior, planned).await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current).await
    }

    /// Import a resource by id.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Validate a data source configuration; error diagnostics become `Err`.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_data_source_config(data_source_type, config)
                .await?,
        )
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Plan and create, then read back.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan and update, then read back.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Plan the destruction, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Create, update and delete; returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone())
            .await?;
        Ok(updated)
    }

    fn complete(&self, resource_type: &str, config: Value) -> Value {
        let schema = self.provider.schema();
        let Some(schema) = schema.resources.get(resource_type) else {
            return config;
        };
        let mut map = match config {
            Value::Object(map) => map,
            other => return other,
        };
        for name in schema.block.attributes.keys().chain(schema.block.blocks.keys()) {
            map.entry(name.clone()).or_insert(Value::Null);
        }
        Value::Object(map)
    }
}

/// Failure of a tester call that reports diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// Error diagnostics were returned.
    Diagnostics(Vec<Diagnostic>),
    /// The provider failed.
    Provider(ProviderError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "{} error diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  {}", diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Build a JSON object from pairs, for terse test configs.
pub fn object<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<Map<_, _>>(),
    )
}

/// Assert the plan creates a resource.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "expected a create plan, got no changes");
    assert!(!plan.requires_replace, "a create plan must not require replacement");
}

/// Assert the plan has no changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "expected no changes, got {:?}",
        plan.changed_paths()
    );
}

/// Assert the plan replaces the resource.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(plan.requires_replace, "expected replacement, changes: {:?}", plan.changed_paths());
}

/// Assert the plan updates in place.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "expected changes");
    assert!(!plan.requires_replace, "expected an in-place update");
}

/// Assert the plan changes `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changed_paths().contains(&path),
        "expected '{}' among changes {:?}",
        path,
        plan.changed_paths()
    );
}

/// Assert the plan leaves `path` alone.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changed_paths().contains(&path),
        "'{}' unexpectedly changed",
        path
    );
}

/// Assert no error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

/// Assert at least one error diagnostic.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.iter().any(Diagnostic::is_error),
        "expected errors, got {:?}",
        diagnostics
    );
}

/// Assert an error diagnostic's summary or detail contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let found = diagnostics.iter().filter(|d| d.is_error()).any(|d| {
        d.summary.contains(substring)
            || d.detail.as_deref().is_some_and(|detail| detail.contains(substring))
    });
    assert!(
        found,
        "no error containing '{}' in {:?}",
        substring,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::WhisparrProvider;
    use serde_json::json;

    fn tester() -> ProviderTester<WhisparrProvider> {
        ProviderTester::new(WhisparrProvider::with_env(|_| None))
    }

    #[test]
    fn test_types() {
        let tester = tester();
        assert!(tester.resource_types().contains(&"whisparr_indexer".to_string()));
        assert!(tester.data_source_types().contains(&"whisparr_indexers".to_string()));
    }

    #[tokio::test]
    async fn test_plan_create_fills_defaults() {
        let plan = tester()
            .plan_create("whisparr_delay_profile", json!({"tags": [2]}))
            .await
            .unwrap();
        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "preferred_protocol");
        assert_plan_does_not_change_attribute(&plan, "id");
        assert_eq!(plan.planned_state["usenet_delay"], json!(0));
    }

    #[tokio::test]
    async fn test_plan_update_in_place() {
        let tester = tester();
        let mut prior = tester
            .plan_create("whisparr_delay_profile", json!({"tags": [2]}))
            .await
            .unwrap()
            .planned_state;
        prior["id"] = json!(3);
        prior["order"] = json!(1);

        let plan = tester
            .plan_update("whisparr_delay_profile", prior, json!({"tags": [2], "torrent_delay": 60}))
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "torrent_delay");
        assert_plan_does_not_change_attribute(&plan, "order");
        assert_eq!(plan.planned_state["id"], json!(3));
    }

    #[tokio::test]
    async fn test_root_folder_path_change_replaces() {
        let tester = tester();
        let prior = json!({
            "id": 1,
            "path": "/movies",
            "accessible": true,
            "unmapped_folders": []
        });
        let plan = tester
            .plan_update("whisparr_root_folder", prior.clone(), json!({"path": "/archive"}))
            .await
            .unwrap();
        assert_plan_replaces(&plan);

        let plan = tester
            .plan_update("whisparr_root_folder", prior, json!({"path": "/movies"}))
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let tester = tester();
        let err = tester
            .validate_resource_config("whisparr_tag", json!({"label": "Favorites"}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diags) => assert_error_contains(&diags, "lowercase"),
            other => panic!("unexpected {}", other),
        }

        let diags = tester
            .resource_diagnostics("whisparr_tag", json!({"label": "vr", "color": "red"}))
            .await
            .unwrap();
        assert_has_errors(&diags);

        let diags = tester
            .resource_diagnostics("whisparr_tag", json!({"label": "vr"}))
            .await
            .unwrap();
        assert_no_errors(&diags);
    }

    #[tokio::test]
    async fn test_configure_error_is_diagnostic() {
        let err = tester()
            .configure(object([("url", json!("ftp://whisparr"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Diagnostics(_)));
        assert!(err.to_string().contains("error diagnostic"));
    }
}
