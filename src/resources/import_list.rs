//! `whisparr_import_list`

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{check_one_of, id_attribute, tags_attribute, with_settings, Model};
use crate::client::models::ImportList;
use crate::error::ProviderError;
use crate::fields::{fields_to_settings, settings_to_fields, FieldSpec};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

const AVAILABILITIES: &[&str] = &["tba", "announced", "inCinemas", "released", "deleted"];

/// Settings of the Whisparr, Plex, Trakt, TMDb, StashDB and RSS lists.
pub const SETTINGS: &[FieldSpec] = &[
    FieldSpec::string("base_url", "baseUrl"),
    FieldSpec::string("url", "url"),
    FieldSpec::secret("api_key", "apiKey"),
    FieldSpec::secret("access_token", "accessToken"),
    FieldSpec::secret("refresh_token", "refreshToken"),
    FieldSpec::string("expires", "expires"),
    FieldSpec::string("auth_user", "authUser"),
    FieldSpec::string("username", "username"),
    FieldSpec::string("list_id", "listId"),
    FieldSpec::string("list_name", "listname"),
    FieldSpec::int("trakt_list_type", "traktListType"),
    FieldSpec::string("rating", "rating"),
    FieldSpec::string("certification", "certification"),
    FieldSpec::string("genres", "genres"),
    FieldSpec::string("years", "years"),
    FieldSpec::int("limit", "limit"),
    FieldSpec::string("trakt_additional_parameters", "traktAdditionalParameters"),
    FieldSpec::int_set("profile_ids", "profileIds"),
    FieldSpec::int_set("tag_ids", "tagIds"),
    FieldSpec::string_set("root_folder_paths", "rootFolderPaths"),
];

/// State of an import list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportListState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Implementation, e.g. `WhisparrImport`.
    pub implementation: String,
    /// Settings contract, e.g. `WhisparrSettings`.
    pub config_contract: String,
    /// Whether the list is synced.
    pub enabled: Option<bool>,
    /// Add movies from the list without review.
    pub enable_auto: Option<bool>,
    /// Monitor added movies.
    pub should_monitor: Option<bool>,
    /// Search for added movies right away.
    pub search_on_add: Option<bool>,
    /// Availability a movie needs before it is searched for.
    pub minimum_availability: Option<String>,
    /// Root folder movies are added under.
    pub root_folder_path: String,
    /// Quality profile of added movies.
    pub quality_profile_id: i64,
    /// Kind of list, reported by Whisparr.
    pub list_type: Option<String>,
    /// Position among lists of the same kind, reported by Whisparr.
    pub list_order: Option<i64>,
    /// Tag ids.
    pub tags: Option<Vec<i64>>,
    /// Implementation settings, keyed by attribute name.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Model for ImportListState {
    type Api = ImportList;

    const TYPE_NAME: &'static str = "whisparr_import_list";
    const ENTITY: &'static str = "import list";
    const LOOKUP_KEY: &'static str = "name";
    const LISTING: &'static str = "import_lists";

    fn schema() -> Schema {
        let schema = Schema::v0()
            .with_description("List movies are imported from.")
            .with_attribute("id", id_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("implementation", Attribute::required_string().with_force_new())
            .with_attribute("config_contract", Attribute::required_string().with_force_new())
            .with_attribute("enabled", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("enable_auto", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("should_monitor", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("search_on_add", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute(
                "minimum_availability",
                Attribute::optional_string()
                    .with_default(json!("released"))
                    .with_description("One of `tba`, `announced`, `inCinemas`, `released`."),
            )
            .with_attribute("root_folder_path", Attribute::required_string())
            .with_attribute("quality_profile_id", Attribute::required_int64())
            .with_attribute("list_type", Attribute::computed_string())
            .with_attribute("list_order", Attribute::computed(AttributeType::Int64))
            .with_attribute("tags", tags_attribute());
        with_settings(schema, SETTINGS)
    }

    fn check(&self) -> Vec<Diagnostic> {
        check_one_of(
            "minimum_availability",
            self.minimum_availability.as_deref(),
            AVAILABILITIES,
        )
        .into_iter()
        .collect()
    }

    fn to_api(&self) -> Result<ImportList, ProviderError> {
        Ok(ImportList {
            id: self.id,
            name: self.name.clone(),
            implementation: self.implementation.clone(),
            config_contract: self.config_contract.clone(),
            enabled: self.enabled.unwrap_or(true),
            enable_auto: self.enable_auto.unwrap_or(true),
            should_monitor: self.should_monitor.unwrap_or(true),
            search_on_add: self.search_on_add.unwrap_or(true),
            minimum_availability: Some(
                self.minimum_availability
                    .clone()
                    .unwrap_or_else(|| "released".into()),
            ),
            root_folder_path: Some(self.root_folder_path.clone()),
            quality_profile_id: self.quality_profile_id,
            list_type: self.list_type.clone(),
            list_order: self.list_order,
            tags: self.tags.clone().unwrap_or_default(),
            fields: settings_to_fields(&self.settings, SETTINGS)?,
        })
    }

    fn from_api(api: ImportList, prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            name: api.name,
            implementation: api.implementation,
            config_contract: api.config_contract,
            enabled: Some(api.enabled),
            enable_auto: Some(api.enable_auto),
            should_monitor: Some(api.should_monitor),
            search_on_add: Some(api.search_on_add),
            minimum_availability: api.minimum_availability,
            root_folder_path: api.root_folder_path.unwrap_or_default(),
            quality_profile_id: api.quality_profile_id,
            list_type: api.list_type,
            list_order: api.list_order,
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
    use crate::fields::FieldKind;

    fn upstream() -> ImportListState {
        serde_json::from_value(json!({
            "name": "Upstream",
            "implementation": "WhisparrImport",
            "config_contract": "WhisparrSettings",
            "root_folder_path": "/movies",
            "quality_profile_id": 1,
            "base_url": "http://upstream:6969",
            "api_key": "k",
            "profile_ids": [1, 2]
        }))
        .unwrap()
    }

    #[test]
    fn test_check_availability() {
        let mut state = upstream();
        assert!(state.check().is_empty());

        state.minimum_availability = Some("someday".to_string());
        let attrs: Vec<_> = state.check().into_iter().filter_map(|d| d.attribute).collect();
        assert_eq!(attrs, vec!["minimum_availability"]);
    }

    #[test]
    fn test_to_api_defaults() {
        let api = upstream().to_api().unwrap();
        assert!(api.enabled && api.enable_auto && api.should_monitor && api.search_on_add);
        assert_eq!(api.minimum_availability.as_deref(), Some("released"));
        assert_eq!(api.fields.len(), 3);
    }

    #[test]
    fn test_root_folder_paths_are_strings() {
        let mut state = upstream();
        state
            .settings
            .insert("root_folder_paths".to_string(), json!(["/movies", "/archive"]));

        let mut api = state.to_api().unwrap();
        assert!(api
            .fields
            .contains(&Field::new("rootFolderPaths", json!(["/movies", "/archive"]))));

        api.id = Some(4);
        let read = ImportListState::from_api(api, Some(&state));
        assert_eq!(read.settings["root_folder_paths"], json!(["/movies", "/archive"]));
    }

    #[test]
    fn test_list_settings_survive_a_read() {
        let lists: Vec<_> = SETTINGS
            .iter()
            .filter(|s| matches!(s.kind, FieldKind::StringSet | FieldKind::IntSet))
            .collect();
        assert_eq!(lists.len(), 3);

        let mut state = upstream();
        for spec in &lists {
            let value = match spec.kind {
                FieldKind::StringSet => json!(["/movies", "/archive"]),
                _ => json!([3, 5]),
            };
            state.settings.insert(spec.attribute.to_string(), value);
        }

        let api = state.to_api().unwrap();
        let read = ImportListState::from_api(api, None);
        for spec in &lists {
            assert_eq!(
                read.settings[spec.attribute], state.settings[spec.attribute],
                "{}",
                spec.attribute
            );
        }
    }
}
