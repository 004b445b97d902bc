//! Read-only data sources.
//!
//! Every resource model gets two data sources for free: a single-entity
//! lookup (`whisparr_tag`) keyed on [`Model::LOOKUP_KEY`] and a listing
//! (`whisparr_tags`). Both are served by one list call.

pub mod system_status;

use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::WhisparrClient;
use crate::error::ProviderError;
use crate::plan::equivalent;
use crate::resources::{
    delay_profile, download_client, encode, import_list, indexer, notification, quality_profile,
    remote_path_mapping, root_folder, tag, Model,
};
use crate::schema::{AttributeType, Diagnostic, Schema};
use crate::validation;

/// A data source type, as the provider dispatches to it.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Data source type name.
    fn type_name(&self) -> String;

    /// Data source schema.
    fn schema(&self) -> Schema;

    /// Validate a data source configuration.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Read the data source.
    async fn read(&self, client: &WhisparrClient, config: Value) -> Result<Value, ProviderError>;
}

/// Finds a single entity by its lookup key.
pub struct Lookup<M>(PhantomData<fn() -> M>);

impl<M: Model> Lookup<M> {
    /// Create the data source.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M: Model> Default for Lookup<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Model> DataSource for Lookup<M> {
    fn type_name(&self) -> String {
        M::TYPE_NAME.to_string()
    }

    fn schema(&self) -> Schema {
        M::schema().as_lookup(
            M::LOOKUP_KEY,
            format!("Looks up a single {} by {}.", M::ENTITY, M::LOOKUP_KEY),
        )
    }

    async fn read(&self, client: &WhisparrClient, config: Value) -> Result<Value, ProviderError> {
        let wanted = config.get(M::LOOKUP_KEY).cloned().unwrap_or(Value::Null);
        if wanted.is_null() {
            return Err(ProviderError::InvalidRequest(format!(
                "{} is required",
                M::LOOKUP_KEY
            )));
        }
        let key_type = M::schema()
            .attribute(M::LOOKUP_KEY)
            .map(|attr| attr.attr_type.clone())
            .unwrap_or(AttributeType::String);

        for api in client.list::<M::Api>().await? {
            let state = encode(&M::from_api(api, None))?;
            let found = state
                .get(M::LOOKUP_KEY)
                .is_some_and(|value| equivalent(&key_type, value, &wanted));
            if found {
                return Ok(state);
            }
        }

        let shown = match &wanted {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Err(ProviderError::NotFound(format!("{} '{}' not found", M::ENTITY, shown)))
    }
}

/// Lists every entity of a kind.
pub struct Listing<M>(PhantomData<fn() -> M>);

impl<M: Model> Listing<M> {
    /// Create the data source.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M: Model> Default for Listing<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Model> DataSource for Listing<M> {
    fn type_name(&self) -> String {
        format!("whisparr_{}", M::LISTING)
    }

    fn schema(&self) -> Schema {
        M::schema().as_listing(M::LISTING, format!("Lists every {}.", M::ENTITY))
    }

    async fn read(&self, client: &WhisparrClient, _config: Value) -> Result<Value, ProviderError> {
        let items = client
            .list::<M::Api>()
            .await?
            .into_iter()
            .map(|api| encode(&M::from_api(api, None)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = Map::new();
        state.insert(M::LISTING.to_string(), Value::Array(items));
        Ok(Value::Object(state))
    }
}

fn pair<M: Model>() -> [Box<dyn DataSource>; 2] {
    [Box::new(Lookup::<M>::new()), Box::new(Listing::<M>::new())]
}

/// Every data source the provider serves.
pub fn all() -> Vec<Box<dyn DataSource>> {
    let mut sources: Vec<Box<dyn DataSource>> = Vec::new();
    sources.extend(pair::<tag::TagState>());
    sources.extend(pair::<root_folder::RootFolderState>());
    sources.extend(pair::<delay_profile::DelayProfileState>());
    sources.extend(pair::<remote_path_mapping::RemotePathMappingState>());
    sources.extend(pair::<quality_profile::QualityProfileState>());
    sources.extend(pair::<indexer::IndexerState>());
    sources.extend(pair::<download_client::DownloadClientState>());
    sources.extend(pair::<notification::NotificationState>());
    sources.extend(pair::<import_list::ImportListState>());
    sources.push(Box::new(system_status::SystemStatusSource));
    sources
}
