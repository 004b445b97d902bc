//! Wire models of the Whisparr v3 API.
//!
//! Field names follow the API (`camelCase`). Everything the API may omit
//! is an `Option` and is left out of request bodies when unset.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiResource;

/// Generic key/value setting carried by indexers, download clients,
/// notifications and import lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Setting name, e.g. `baseUrl`.
    pub name: String,
    /// Setting value; absent when the setting is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Field {
    /// Create a field with a value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
        }
    }
}

/// A tag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
}

impl ApiResource for Tag {
    const PATH: &'static str = "tag";
}

/// A folder under a root folder that no movie maps to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedFolder {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// A root folder movies are stored under.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootFolder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_space: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped_folders: Vec<UnmappedFolder>,
}

impl ApiResource for RootFolder {
    const PATH: &'static str = "rootfolder";
}

/// A delay profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub enable_usenet: bool,
    #[serde(default)]
    pub enable_torrent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_protocol: Option<String>,
    #[serde(default)]
    pub usenet_delay: i64,
    #[serde(default)]
    pub torrent_delay: i64,
    #[serde(default)]
    pub bypass_if_highest_quality: bool,
    #[serde(default)]
    pub bypass_if_above_custom_format_score: bool,
    #[serde(default)]
    pub minimum_custom_format_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default)]
    pub tags: Vec<i64>,
}

impl ApiResource for DelayProfile {
    const PATH: &'static str = "delayprofile";
}

/// A remote path mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePathMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub host: String,
    pub remote_path: String,
    pub local_path: String,
}

impl ApiResource for RemotePathMapping {
    const PATH: &'static str = "remotepathmapping";
}

/// A quality definition as referenced from a quality profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quality {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<i64>,
}

/// An entry of a quality profile: either a single quality or a named group
/// of qualities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfileItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(default)]
    pub items: Vec<QualityProfileItem>,
    #[serde(default)]
    pub allowed: bool,
}

/// Score of a custom format within a quality profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatItem {
    pub format: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub score: i64,
}

/// A quality profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub upgrade_allowed: bool,
    #[serde(default)]
    pub cutoff: i64,
    #[serde(default)]
    pub min_format_score: i64,
    #[serde(default)]
    pub cutoff_format_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_upgrade_format_score: Option<i64>,
    #[serde(default)]
    pub items: Vec<QualityProfileItem>,
    #[serde(default)]
    pub format_items: Vec<FormatItem>,
}

impl ApiResource for QualityProfile {
    const PATH: &'static str = "qualityprofile";
}

/// An indexer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indexer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub implementation: String,
    pub config_contract: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub enable_rss: bool,
    #[serde(default)]
    pub enable_automatic_search: bool,
    #[serde(default)]
    pub enable_interactive_search: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub download_client_id: i64,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ApiResource for Indexer {
    const PATH: &'static str = "indexer";
    const FORCE_SAVE: bool = true;
}

/// A download client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadClient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub implementation: String,
    pub config_contract: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub remove_completed_downloads: bool,
    #[serde(default)]
    pub remove_failed_downloads: bool,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ApiResource for DownloadClient {
    const PATH: &'static str = "downloadclient";
    const FORCE_SAVE: bool = true;
}

/// A notification (connection).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub implementation: String,
    pub config_contract: String,
    #[serde(default)]
    pub on_grab: bool,
    #[serde(default)]
    pub on_download: bool,
    #[serde(default)]
    pub on_upgrade: bool,
    #[serde(default)]
    pub on_rename: bool,
    #[serde(default)]
    pub on_movie_added: bool,
    #[serde(default)]
    pub on_movie_delete: bool,
    #[serde(default)]
    pub on_movie_file_delete: bool,
    #[serde(default)]
    pub on_movie_file_delete_for_upgrade: bool,
    #[serde(default)]
    pub on_health_issue: bool,
    #[serde(default)]
    pub on_health_restored: bool,
    #[serde(default)]
    pub on_application_update: bool,
    #[serde(default)]
    pub on_manual_interaction_required: bool,
    #[serde(default)]
    pub include_health_warnings: bool,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ApiResource for Notification {
    const PATH: &'static str = "notification";
    const FORCE_SAVE: bool = true;
}

/// An import list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub implementation: String,
    pub config_contract: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub enable_auto: bool,
    #[serde(default)]
    pub should_monitor: bool,
    #[serde(default)]
    pub search_on_add: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder_path: Option<String>,
    #[serde(default)]
    pub quality_profile_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_order: Option<i64>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ApiResource for ImportList {
    const PATH: &'static str = "importlist";
    const FORCE_SAVE: bool = true;
}

/// Response of `GET /api/v3/system/status`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub build_time: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub is_debug: bool,
    #[serde(default)]
    pub is_production: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_user_interactive: bool,
    #[serde(default)]
    pub is_docker: bool,
    #[serde(default)]
    pub is_linux: bool,
    #[serde(default)]
    pub is_osx: bool,
    #[serde(default)]
    pub is_windows: bool,
    #[serde(default)]
    pub os_name: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub runtime_name: Option<String>,
    #[serde(default)]
    pub runtime_version: Option<String>,
    #[serde(default)]
    pub startup_path: Option<String>,
    #[serde(default)]
    pub app_data: Option<String>,
    #[serde(default)]
    pub url_base: Option<String>,
    #[serde(default)]
    pub authentication: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub database_type: Option<String>,
    #[serde(default)]
    pub database_version: Option<String>,
    #[serde(default)]
    pub migration_version: Option<i64>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
    #[serde(default)]
    pub package_author: Option<String>,
    #[serde(default)]
    pub package_update_mechanism: Option<String>,
}

/// One entry of the array Whisparr returns for a failed validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidationFailure {
    #[serde(default)]
    pub property_name: Option<String>,
    pub error_message: String,
}

/// Generic error body, `{"message": "...", "description": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_omits_unset_id() {
        let tag = Tag {
            id: None,
            label: "vr".to_string(),
        };
        assert_eq!(serde_json::to_value(&tag).unwrap(), json!({"label": "vr"}));
    }

    #[test]
    fn test_indexer_decodes_with_missing_optionals() {
        let indexer: Indexer = serde_json::from_value(json!({
            "id": 3,
            "name": "NZBgeek",
            "implementation": "Newznab",
            "configContract": "NewznabSettings",
            "enableRss": true,
            "fields": [
                {"name": "baseUrl", "value": "https://api.nzbgeek.info"},
                {"name": "apiPath"}
            ]
        }))
        .unwrap();

        assert_eq!(indexer.id, Some(3));
        assert!(indexer.enable_rss);
        assert!(!indexer.enable_interactive_search);
        assert!(indexer.tags.is_empty());
        assert_eq!(indexer.fields[1].value, None);
    }

    #[test]
    fn test_quality_profile_nested_items() {
        let profile: QualityProfile = serde_json::from_value(json!({
            "id": 1,
            "name": "HD-1080p",
            "upgradeAllowed": true,
            "cutoff": 1001,
            "items": [
                {
                    "quality": {"id": 1, "name": "SDTV", "source": "television", "resolution": 480},
                    "items": [],
                    "allowed": false
                },
                {"id": 1001, "name": "WEB 1080p", "items": [
                    {"quality": {"id": 3, "name": "WEBDL-1080p"}, "items": [], "allowed": true}
                ], "allowed": true}
            ]
        }))
        .unwrap();

        assert_eq!(profile.items.len(), 2);
        assert_eq!(profile.items[1].items[0].quality.as_ref().unwrap().id, 3);
    }

    #[test]
    fn test_system_status_tolerates_unknown_fields() {
        let status: SystemStatus = serde_json::from_value(json!({
            "appName": "Whisparr",
            "version": "2.0.0.548",
            "isDocker": true,
            "someFutureField": 1
        }))
        .unwrap();

        assert_eq!(status.app_name.as_deref(), Some("Whisparr"));
        assert!(status.is_docker);
    }
}
