//! `whisparr_download_client`

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{check_one_of, id_attribute, tags_attribute, with_settings, Model};
use crate::client::models::DownloadClient;
use crate::error::ProviderError;
use crate::fields::{fields_to_settings, settings_to_fields, FieldSpec};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

const PROTOCOLS: &[&str] = &["usenet", "torrent"];

/// Settings of the usenet, torrent and blackhole clients.
pub const SETTINGS: &[FieldSpec] = &[
    FieldSpec::string("host", "host"),
    FieldSpec::int("port", "port"),
    FieldSpec::bool("use_ssl", "useSsl"),
    FieldSpec::string("url_base", "urlBase"),
    FieldSpec::string("username", "username"),
    FieldSpec::secret("password", "password"),
    FieldSpec::secret("api_key", "apiKey"),
    FieldSpec::string("movie_category", "movieCategory"),
    FieldSpec::string("movie_imported_category", "movieImportedCategory"),
    FieldSpec::string("movie_directory", "movieDirectory"),
    FieldSpec::int("recent_movie_priority", "recentMoviePriority"),
    FieldSpec::int("older_movie_priority", "olderMoviePriority"),
    FieldSpec::bool("add_paused", "addPaused"),
    FieldSpec::bool("add_stopped", "addStopped"),
    FieldSpec::int("initial_state", "initialState"),
    FieldSpec::bool("sequential_order", "sequentialOrder"),
    FieldSpec::bool("first_and_last", "firstAndLast"),
    FieldSpec::string("destination", "destination"),
    FieldSpec::string("category", "category"),
    FieldSpec::string("nzb_folder", "nzbFolder"),
    FieldSpec::string("torrent_folder", "torrentFolder"),
    FieldSpec::string("watch_folder", "watchFolder"),
    FieldSpec::string("magnet_file_extension", "magnetFileExtension"),
    FieldSpec::bool("save_magnet_files", "saveMagnetFiles"),
    FieldSpec::bool("read_only", "readOnly"),
    FieldSpec::string_set("field_tags", "tags"),
    FieldSpec::string_set("post_import_tags", "postImportTags"),
];

/// State of a download client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadClientState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Implementation, e.g. `Transmission`.
    pub implementation: String,
    /// Settings contract, e.g. `TransmissionSettings`.
    pub config_contract: String,
    /// `usenet` or `torrent`.
    pub protocol: Option<String>,
    /// Whether the client is used.
    pub enable: Option<bool>,
    /// Priority among clients of the same protocol, 1 (highest) to 50.
    pub priority: Option<i64>,
    /// Remove downloads once imported.
    pub remove_completed_downloads: Option<bool>,
    /// Remove failed downloads.
    pub remove_failed_downloads: Option<bool>,
    /// Tag ids.
    pub tags: Option<Vec<i64>>,
    /// Implementation settings, keyed by attribute name.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Model for DownloadClientState {
    type Api = DownloadClient;

    const TYPE_NAME: &'static str = "whisparr_download_client";
    const ENTITY: &'static str = "download client";
    const LOOKUP_KEY: &'static str = "name";
    const LISTING: &'static str = "download_clients";

    fn schema() -> Schema {
        let schema = Schema::v0()
            .with_description("Download client grabs are sent to.")
            .with_attribute("id", id_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("implementation", Attribute::required_string().with_force_new())
            .with_attribute("config_contract", Attribute::required_string().with_force_new())
            .with_attribute(
                "protocol",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("Either `usenet` or `torrent`."),
            )
            .with_attribute("enable", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("priority", Attribute::optional_int64().with_default(json!(1)))
            .with_attribute(
                "remove_completed_downloads",
                Attribute::optional_bool().with_default(json!(true)),
            )
            .with_attribute(
                "remove_failed_downloads",
                Attribute::optional_bool().with_default(json!(true)),
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
                    .with_detail("Download client priority must be between 1 and 50")
                    .with_attribute("priority"),
            );
        }
        if let Some(port) = self.settings.get("port").and_then(Value::as_i64) {
            if !(1..=65535).contains(&port) {
                diagnostics.push(
                    Diagnostic::error("Port out of range").with_attribute("port"),
                );
            }
        }
        diagnostics
    }

    fn to_api(&self) -> Result<DownloadClient, ProviderError> {
        Ok(DownloadClient {
            id: self.id,
            name: self.name.clone(),
            implementation: self.implementation.clone(),
            config_contract: self.config_contract.clone(),
            protocol: self.protocol.clone(),
            enable: self.enable.unwrap_or(true),
            priority: self.priority.unwrap_or(1),
            remove_completed_downloads: self.remove_completed_downloads.unwrap_or(true),
            remove_failed_downloads: self.remove_failed_downloads.unwrap_or(true),
            tags: self.tags.clone().unwrap_or_default(),
            fields: settings_to_fields(&self.settings, SETTINGS)?,
        })
    }

    fn from_api(api: DownloadClient, prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            name: api.name,
            implementation: api.implementation,
            config_contract: api.config_contract,
            protocol: api.protocol,
            enable: Some(api.enable),
            priority: Some(api.priority),
            remove_completed_downloads: Some(api.remove_completed_downloads),
            remove_failed_downloads: Some(api.remove_failed_downloads),
            tags: Some(api.tags),
            settings: fields_to_settings(&api.fields, SETTINGS, prior.map(|p| &p.settings)),
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}
