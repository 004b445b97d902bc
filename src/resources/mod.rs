//! Managed Whisparr resources.
//!
//! Each entity module defines a state struct (the provider's view, one
//! field per schema attribute) implementing [`Model`]: its schema and the
//! conversions to and from the API model. [`ModelResource`] turns any model
//! into a [`Resource`] by mapping every lifecycle operation onto exactly
//! one REST call.

pub mod delay_profile;
pub mod download_client;
pub mod import_list;
pub mod indexer;
pub mod notification;
pub mod quality_profile;
pub mod remote_path_mapping;
pub mod root_folder;
pub mod tag;

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{ApiResource, WhisparrClient};
use crate::error::ProviderError;
use crate::fields::{settings_attributes, FieldSpec};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation;

/// Provider-side representation of one Whisparr entity.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The API model this state maps to.
    type Api: ApiResource;

    /// Resource type name, e.g. `whisparr_tag`.
    const TYPE_NAME: &'static str;
    /// Human readable entity name used in messages.
    const ENTITY: &'static str;
    /// Attribute used by the single-entity data source to find the entity.
    const LOOKUP_KEY: &'static str;
    /// Attribute of the listing data source, e.g. `tags` for `whisparr_tags`.
    const LISTING: &'static str;
    /// Whether the entity can be modified in place.
    const UPDATABLE: bool = true;

    /// Resource schema.
    fn schema() -> Schema;

    /// Semantic checks beyond what the schema expresses.
    fn check(&self) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Build the API request body.
    fn to_api(&self) -> Result<Self::Api, ProviderError>;

    /// Build state from an API response. `prior` is the state the request
    /// was made from, if any.
    fn from_api(api: Self::Api, prior: Option<&Self>) -> Self;

    /// Whisparr id, once assigned.
    fn id(&self) -> Option<i64>;
}

/// The id attribute every resource carries.
pub(crate) fn id_attribute() -> Attribute {
    Attribute::computed_int64().with_description("Whisparr identifier.")
}

/// The tags attribute every taggable resource carries.
pub(crate) fn tags_attribute() -> Attribute {
    Attribute::optional_int64_set()
        .with_default(Value::Array(Vec::new()))
        .with_description("Ids of the tags applied.")
}

/// Add the attributes of a settings table to a schema.
pub(crate) fn with_settings(schema: Schema, specs: &[FieldSpec]) -> Schema {
    settings_attributes(specs)
        .into_iter()
        .fold(schema, |schema, (name, attr)| schema.with_attribute(name, attr))
}

/// Check that `value`, when set, is one of `allowed`.
pub(crate) fn check_one_of(
    attribute: &str,
    value: Option<&str>,
    allowed: &[&str],
) -> Option<Diagnostic> {
    let value = value?;
    if allowed.contains(&value) {
        return None;
    }
    Some(
        Diagnostic::error("Invalid attribute value")
            .with_detail(format!(
                "'{}' is not one of: {}",
                value,
                allowed.join(", ")
            ))
            .with_attribute(attribute),
    )
}

/// Decode provider state into a model.
pub fn decode<M: Model>(state: Value) -> Result<M, ProviderError> {
    serde_json::from_value(state).map_err(|e| {
        ProviderError::InvalidRequest(format!("invalid {} state: {}", M::TYPE_NAME, e))
    })
}

/// Encode a model as provider state.
pub fn encode<M: Model>(model: &M) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

fn require_id<M: Model>(model: &M) -> Result<i64, ProviderError> {
    model.id().ok_or_else(|| {
        ProviderError::InvalidRequest(format!("{} state has no id", M::TYPE_NAME))
    })
}

/// Parse an import id.
pub fn parse_import_id(type_name: &str, id: &str) -> Result<i64, ProviderError> {
    id.trim().parse().map_err(|_| {
        ProviderError::InvalidRequest(format!(
            "{} import id must be a numeric Whisparr id, got '{}'",
            type_name, id
        ))
    })
}

/// A managed resource type, as the provider dispatches to it.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name.
    fn type_name(&self) -> &'static str;

    /// Resource schema.
    fn schema(&self) -> Schema;

    /// Validate a resource configuration.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;

    /// Create the entity described by `planned`.
    async fn create(&self, client: &WhisparrClient, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh `current` from Whisparr.
    async fn read(&self, client: &WhisparrClient, current: Value) -> Result<Value, ProviderError>;

    /// Apply `planned` to the entity recorded in `prior`.
    async fn update(
        &self,
        client: &WhisparrClient,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the entity recorded in `current`.
    async fn delete(&self, client: &WhisparrClient, current: Value) -> Result<(), ProviderError>;

    /// Fetch an existing entity by id.
    async fn import(&self, client: &WhisparrClient, id: &str) -> Result<Value, ProviderError>;
}

/// [`Resource`] implementation shared by every [`Model`].
pub struct ModelResource<M>(PhantomData<fn() -> M>);

impl<M: Model> ModelResource<M> {
    /// Create the resource.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M: Model> Default for ModelResource<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Model> Resource for ModelResource<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        M::schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validation::validate(&M::schema(), config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return diagnostics;
        }
        if let Ok(model) = serde_json::from_value::<M>(config.clone()) {
            diagnostics.extend(model.check());
        }
        diagnostics
    }

    async fn create(
        &self,
        client: &WhisparrClient,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let planned: M = decode(planned)?;
        let created = client.create(&planned.to_api()?).await?;
        let state = M::from_api(created, Some(&planned));
        debug!(resource_type = M::TYPE_NAME, id = ?state.id(), "created");
        encode(&state)
    }

    async fn read(&self, client: &WhisparrClient, current: Value) -> Result<Value, ProviderError> {
        let current: M = decode(current)?;
        let api = client.get::<M::Api>(require_id(&current)?).await?;
        encode(&M::from_api(api, Some(&current)))
    }

    async fn update(
        &self,
        client: &WhisparrClient,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        if !M::UPDATABLE {
            return Err(ProviderError::Unimplemented(format!(
                "{} cannot be updated in place",
                M::TYPE_NAME
            )));
        }
        let id = require_id(&decode::<M>(prior)?)?;
        let planned: M = decode(planned)?;
        let updated = client.update(id, &planned.to_api()?).await?;
        encode(&M::from_api(updated, Some(&planned)))
    }

    async fn delete(&self, client: &WhisparrClient, current: Value) -> Result<(), ProviderError> {
        let current: M = decode(current)?;
        client.delete::<M::Api>(require_id(&current)?).await
    }

    async fn import(&self, client: &WhisparrClient, id: &str) -> Result<Value, ProviderError> {
        let id = parse_import_id(M::TYPE_NAME, id)?;
        let api = client.get::<M::Api>(id).await?;
        encode(&M::from_api(api, None))
    }
}

/// Every resource the provider manages.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(ModelResource::<tag::TagState>::new()),
        Box::new(ModelResource::<root_folder::RootFolderState>::new()),
        Box::new(ModelResource::<delay_profile::DelayProfileState>::new()),
        Box::new(ModelResource::<remote_path_mapping::RemotePathMappingState>::new()),
        Box::new(ModelResource::<quality_profile::QualityProfileState>::new()),
        Box::new(ModelResource::<indexer::IndexerState>::new()),
        Box::new(ModelResource::<download_client::DownloadClientState>::new()),
        Box::new(ModelResource::<notification::NotificationState>::new()),
        Box::new(ModelResource::<import_list::ImportListState>::new()),
    ]
}
