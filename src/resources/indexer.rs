//! `whisparr_indexer`

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{check_one_of, id_attribute, tags_attribute, with_settings, Model};
use crate::client::models::Indexer;
use crate::error::ProviderError;
use crate::fields::{fields_to_settings, settings_to_fields, FieldSpec};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

const PROTOCOLS: &[&str] = &["usenet", "torrent"];

/// Settings shared by the Newznab, Torznab and tracker specific indexers.
pub const SETTINGS: &[FieldSpec] = &[
    FieldSpec::string("base_url", "baseUrl"),
    FieldSpec::string("api_path", "apiPath"),
    FieldSpec::secret("api_key", "apiKey"),
    FieldSpec::int_set("categories", "categories"),
    FieldSpec::string("additional_parameters", "additionalParameters"),
    FieldSpec::int_set("multi_languages", "multiLanguages"),
    FieldSpec::int_set("required_flags", "requiredFlags"),
    FieldSpec::bool("remove_year", "removeYear"),
    FieldSpec::int("minimum_seeders", "minimumSeeders"),
    FieldSpec::float("seed_ratio", "seedCriteria.seedRatio"),
    FieldSpec::int("seed_time", "seedCriteria.seedTime"),
    FieldSpec::bool(
        "reject_blocklisted_torrent_hashes_while_grabbing",
        "rejectBlocklistedTorrentHashesWhileGrabbing",
    ),
    FieldSpec::bool("ranked_only", "rankedOnly"),
    FieldSpec::bool("allow_zero_size", "allowZeroSize"),
    FieldSpec::string("username", "username"),
    FieldSpec::secret("passkey", "passkey"),
    FieldSpec::secret("cookie", "cookie"),
];

/// State of an indexer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexerState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Implementation, e.g. `Newznab`.
    pub implementation: String,
    /// Settings contract, e.g. `NewznabSettings`.
    pub config_contract: String,
    /// `usenet` or `torrent`.
    pub protocol: Option<String>,
    /// Use for RSS sync.
    pub enable_rss: Option<bool>,
    /// Use for automatic searches.
    pub enable_automatic_search: Option<bool>,
    /// Use for interactive searches.
    pub enable_interactive_search: Option<bool>,
    /// Priority, 1 (highest) to 50.
    pub priority: Option<i64>,
    /// Download client to send grabs to, 0 for any.
    pub download_client_id: Option<i64>,
    /// Tag ids.
    pub tags: Option<Vec<i64>>,
    /// Implementation settings, keyed by attribute name.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Model for IndexerState {
    type Api = Indexer;

    const TYPE_NAME: &'static str = "whisparr_indexer";
    const ENTITY: &'static str = "indexer";
    const LOOKUP_KEY: &'static str = "name";
    const LISTING: &'static str = "indexers";

    fn schema() -> Schema {
        let schema = Schema::v0()
            .with_description("Indexer searched for releases.")
            .with_attribute("id", id_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("implementation", Attribute::required_string().with_force_new())
            .with_attribute("config_contract", Attribute::required_string().with_force_new())
            .with_attribute(
                "protocol",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("Either `usenet` or `torrent`."),
            )
            .with_attribute("enable_rss", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute(
                "enable_automatic_search",
                Attribute::optional_bool().with_default(json!(true)),
            )
            .with_attribute(
                "enable_interactive_search",
                Attribute::optional_bool().with_default(json!(true)),
            )
            .with_attribute("priority", Attribute::optional_int64().with_default(json!(25)))
            .with_attribute(
                "download_client_id",
                Attribute::optional_int64().with_default(json!(0)),
            )
            .with_attribute("tags", tags_attribute());
        with_settings(schema, SETTINGS)
    }

    fn check(&self) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<_> =
            check_one_of("protocol", self.protocol.as_deref(), PROTOCOLS)
                .into_iter()
                .collect();
        if self.priority.is_some_and(|p| !(1..=50).contains(&p)) {
            diagnostics.push(
                Diagnostic::error("Priority out of range")
                    .with_detail("Indexer priority must be between 1 and 50")
                    .with_attribute("priority"),
            );
        }
        diagnostics
    }

    fn to_api(&self) -> Result<Indexer, ProviderError> {
        Ok(Indexer {
            id: self.id,
            name: self.name.clone(),
            implementation: self.implementation.clone(),
            config_contract: self.config_contract.clone(),
            protocol: self.protocol.clone(),
            enable_rss: self.enable_rss.unwrap_or(true),
            enable_automatic_search: self.enable_automatic_search.unwrap_or(true),
            enable_interactive_search: self.enable_interactive_search.unwrap_or(true),
            priority: self.priority.unwrap_or(25),
            download_client_id: self.download_client_id.unwrap_or_default(),
            tags: self.tags.clone().unwrap_or_default(),
            fields: settings_to_fields(&self.settings, SETTINGS)?,
        })
    }

    fn from_api(api: Indexer, prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            name: api.name,
            implementation: api.implementation,
            config_contract: api.config_contract,
            protocol: api.protocol,
            enable_rss: Some(api.enable_rss),
            enable_automatic_search: Some(api.enable_automatic_search),
            enable_interactive_search: Some(api.enable_interactive_search),
            priority: Some(api.priority),
            download_client_id: Some(api.download_client_id),
            tags: Some(api.tags),
            settings: fields_to_settings(&api.fields, SETTINGS, prior.map(|p| &p.settings)),
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::Field;
    use crate::fields::MASKED_VALUE;

    fn newznab() -> IndexerState {
        serde_json::from_value(json!({
            "id": null,
            "name": "NZBgeek",
            "implementation": "Newznab",
            "config_contract": "NewznabSettings",
            "protocol": "usenet",
            "priority": 10,
            "tags": [1],
            "base_url": "https://api.nzbgeek.info",
            "api_key": "geek-key",
            "categories": [5030, 5040],
            "seed_ratio": null
        }))
        .unwrap()
    }

    #[test]
    fn test_state_settings_become_fields() {
        let api = newznab().to_api().unwrap();
        assert_eq!(api.priority, 10);
        assert!(api.enable_rss);
        assert_eq!(
            api.fields,
            vec![
                Field::new("baseUrl", json!("https://api.nzbgeek.info")),
                Field::new("apiKey", json!("geek-key")),
                Field::new("categories", json!([5030, 5040])),
            ]
        );
    }

    #[test]
    fn test_from_api_keeps_masked_key_and_fills_settings() {
        let prior = newznab();
        let mut api = prior.to_api().unwrap();
        api.id = Some(7);
        api.fields = vec![
            Field::new("baseUrl", json!("https://api.nzbgeek.info")),
            Field::new("apiPath", json!("/api")),
            Field::new("apiKey", json!(MASKED_VALUE)),
            Field::new("categories", json!([5030, 5040])),
            Field::new("additionalParameters", json!("")),
        ];

        let state = IndexerState::from_api(api, Some(&prior));
        assert_eq!(state.id, Some(7));
        assert_eq!(state.settings["api_key"], json!("geek-key"));
        assert_eq!(state.settings["api_path"], json!("/api"));
        assert!(state.settings["additional_parameters"].is_null());
        assert_eq!(state.settings.len(), SETTINGS.len());

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["base_url"], json!("https://api.nzbgeek.info"));
        assert!(value.get("settings").is_none());
    }

    #[test]
    fn test_check_priority_and_protocol() {
        let mut state = newznab();
        state.priority = Some(0);
        state.protocol = Some("carrier-pigeon".to_string());
        assert_eq!(state.check().len(), 2);
    }

    #[test]
    fn test_schema_includes_settings() {
        let schema = IndexerState::schema();
        assert!(schema.attribute("api_key").unwrap().flags.sensitive);
        assert!(schema.attribute("implementation").unwrap().force_new);
        assert!(schema.attribute("seed_ratio").is_some());
    }
}
