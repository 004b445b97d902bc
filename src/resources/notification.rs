//! `whisparr_notification`

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{id_attribute, tags_attribute, with_settings, Model};
use crate::client::models::Notification;
use crate::error::ProviderError;
use crate::fields::{fields_to_settings, settings_to_fields, FieldSpec};
use crate::schema::{Attribute, Diagnostic, Schema};

/// Settings of the webhook, chat, mail and media server connections.
pub const SETTINGS: &[FieldSpec] = &[
    FieldSpec::string("url", "url"),
    FieldSpec::int("method", "method"),
    FieldSpec::string("host", "host"),
    FieldSpec::int("port", "port"),
    FieldSpec::bool("use_ssl", "useSsl"),
    FieldSpec::string("path", "path"),
    FieldSpec::string("username", "username"),
    FieldSpec::secret("password", "password"),
    FieldSpec::secret("api_key", "apiKey"),
    FieldSpec::secret("token", "token"),
    FieldSpec::secret("bot_token", "botToken"),
    FieldSpec::secret("web_hook_url", "webHookUrl"),
    FieldSpec::string("chat_id", "chatId"),
    FieldSpec::int("topic_id", "topicId"),
    FieldSpec::string("channel", "channel"),
    FieldSpec::bool("send_silently", "sendSilently"),
    FieldSpec::int("priority", "priority"),
    FieldSpec::string("server", "server"),
    FieldSpec::string("from", "from"),
    FieldSpec::string_set("to", "to"),
    FieldSpec::string_set("cc", "cc"),
    FieldSpec::string_set("bcc", "bcc"),
    FieldSpec::string("author", "author"),
    FieldSpec::string("avatar", "avatar"),
    FieldSpec::int_set("grab_fields", "grabFields"),
    FieldSpec::int_set("import_fields", "importFields"),
    FieldSpec::bool("update_library", "updateLibrary"),
    FieldSpec::bool("notify", "notify"),
    FieldSpec::bool("clean_library", "cleanLibrary"),
];

/// Event flags, in the order they appear in the schema.
const EVENTS: &[&str] = &[
    "on_grab",
    "on_download",
    "on_upgrade",
    "on_rename",
    "on_movie_added",
    "on_movie_delete",
    "on_movie_file_delete",
    "on_movie_file_delete_for_upgrade",
    "on_health_issue",
    "on_health_restored",
    "on_application_update",
    "on_manual_interaction_required",
];

/// State of a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Implementation, e.g. `Discord`.
    pub implementation: String,
    /// Settings contract, e.g. `DiscordSettings`.
    pub config_contract: String,
    /// Notify on release grab.
    pub on_grab: Option<bool>,
    /// Notify on import.
    pub on_download: Option<bool>,
    /// Notify on upgrade.
    pub on_upgrade: Option<bool>,
    /// Notify on rename.
    pub on_rename: Option<bool>,
    /// Notify when a movie is added.
    pub on_movie_added: Option<bool>,
    /// Notify when a movie is deleted.
    pub on_movie_delete: Option<bool>,
    /// Notify when a movie file is deleted.
    pub on_movie_file_delete: Option<bool>,
    /// Notify when a movie file is deleted for an upgrade.
    pub on_movie_file_delete_for_upgrade: Option<bool>,
    /// Notify on health issues.
    pub on_health_issue: Option<bool>,
    /// Notify when a health issue is resolved.
    pub on_health_restored: Option<bool>,
    /// Notify on application updates.
    pub on_application_update: Option<bool>,
    /// Notify when manual interaction is required.
    pub on_manual_interaction_required: Option<bool>,
    /// Include health warnings in health notifications.
    pub include_health_warnings: Option<bool>,
    /// Tag ids.
    pub tags: Option<Vec<i64>>,
    /// Implementation settings, keyed by attribute name.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Model for NotificationState {
    type Api = Notification;

    const TYPE_NAME: &'static str = "whisparr_notification";
    const ENTITY: &'static str = "notification";
    const LOOKUP_KEY: &'static str = "name";
    const LISTING: &'static str = "notifications";

    fn schema() -> Schema {
        let schema = EVENTS.iter().fold(
            Schema::v0()
                .with_description("Connection notified of Whisparr events.")
                .with_attribute("id", id_attribute())
                .with_attribute("name", Attribute::required_string())
                .with_attribute("implementation", Attribute::required_string().with_force_new())
                .with_attribute("config_contract", Attribute::required_string().with_force_new()),
            |schema, event| {
                schema.with_attribute(*event, Attribute::optional_bool().with_default(json!(false)))
            },
        );
        let schema = schema
            .with_attribute(
                "include_health_warnings",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("tags", tags_attribute());
        with_settings(schema, SETTINGS)
    }

    fn check(&self) -> Vec<Diagnostic> {
        let events = [
            self.on_grab,
            self.on_download,
            self.on_upgrade,
            self.on_rename,
            self.on_movie_added,
            self.on_movie_delete,
            self.on_movie_file_delete,
            self.on_movie_file_delete_for_upgrade,
            self.on_health_issue,
            self.on_health_restored,
            self.on_application_update,
            self.on_manual_interaction_required,
        ];
        let mut diagnostics = Vec::new();
        if events.iter().all(|e| *e != Some(true)) {
            diagnostics.push(
                Diagnostic::warning("Notification has no events enabled")
                    .with_detail("Enable at least one on_* flag for the connection to fire"),
            );
        }
        if self.include_health_warnings == Some(true) && self.on_health_issue != Some(true) {
            diagnostics.push(
                Diagnostic::warning("include_health_warnings has no effect")
                    .with_detail("It only applies when on_health_issue is enabled")
                    .with_attribute("include_health_warnings"),
            );
        }
        diagnostics
    }

    fn to_api(&self) -> Result<Notification, ProviderError> {
        let flag = |v: Option<bool>| v.unwrap_or_default();
        Ok(Notification {
            id: self.id,
            name: self.name.clone(),
            implementation: self.implementation.clone(),
            config_contract: self.config_contract.clone(),
            on_grab: flag(self.on_grab),
            on_download: flag(self.on_download),
            on_upgrade: flag(self.on_upgrade),
            on_rename: flag(self.on_rename),
            on_movie_added: flag(self.on_movie_added),
            on_movie_delete: flag(self.on_movie_delete),
            on_movie_file_delete: flag(self.on_movie_file_delete),
            on_movie_file_delete_for_upgrade: flag(self.on_movie_file_delete_for_upgrade),
            on_health_issue: flag(self.on_health_issue),
            on_health_restored: flag(self.on_health_restored),
            on_application_update: flag(self.on_application_update),
            on_manual_interaction_required: flag(self.on_manual_interaction_required),
            include_health_warnings: flag(self.include_health_warnings),
            tags: self.tags.clone().unwrap_or_default(),
            fields: settings_to_fields(&self.settings, SETTINGS)?,
        })
    }

    fn from_api(api: Notification, prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            name: api.name,
            implementation: api.implementation,
            config_contract: api.config_contract,
            on_grab: Some(api.on_grab),
            on_download: Some(api.on_download),
            on_upgrade: Some(api.on_upgrade),
            on_rename: Some(api.on_rename),
            on_movie_added: Some(api.on_movie_added),
            on_movie_delete: Some(api.on_movie_delete),
            on_movie_file_delete: Some(api.on_movie_file_delete),
            on_movie_file_delete_for_upgrade: Some(api.on_movie_file_delete_for_upgrade),
            on_health_issue: Some(api.on_health_issue),
            on_health_restored: Some(api.on_health_restored),
            on_application_update: Some(api.on_application_update),
            on_manual_interaction_required: Some(api.on_manual_interaction_required),
            include_health_warnings: Some(api.include_health_warnings),
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

    fn discord() -> NotificationState {
        serde_json::from_value(json!({
            "name": "Discord",
            "implementation": "Discord",
            "config_contract": "DiscordSettings",
            "on_grab": true,
            "on_download": true,
            "web_hook_url": "https://discord.com/api/webhooks/1/abc",
            "grab_fields": [0, 1, 2]
        }))
        .unwrap()
    }

    #[test]
    fn test_schema_has_every_event() {
        let schema = NotificationState::schema();
        for event in EVENTS {
            assert!(schema.attribute(event).is_some(), "{}", event);
        }
        assert!(schema.attribute("web_hook_url").unwrap().flags.sensitive);
    }

    #[test]
    fn test_round_trip_keeps_masked_webhook() {
        let prior = discord();
        let mut api = prior.to_api().unwrap();
        assert!(api.on_grab && !api.on_rename);

        api.id = Some(3);
        for field in &mut api.fields {
            if field.name == "webHookUrl" {
                field.value = Some(json!(MASKED_VALUE));
            }
        }

        let state = NotificationState::from_api(api, Some(&prior));
        assert_eq!(
            state.settings["web_hook_url"],
            json!("https://discord.com/api/webhooks/1/abc")
        );
        assert_eq!(state.settings["grab_fields"], json!([0, 1, 2]));
        assert_eq!(state.on_rename, Some(false));
    }

    #[test]
    fn test_check_warns_without_events() {
        let state: NotificationState = serde_json::from_value(json!({
            "name": "Silent",
            "implementation": "Webhook",
            "config_contract": "WebhookSettings",
            "include_health_warnings": true
        }))
        .unwrap();
        let diagnostics = state.check();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| !d.is_error()));
    }

    #[test]
    fn test_unset_settings_produce_no_fields() {
        let api = discord().to_api().unwrap();
        let names: Vec<_> = api.fields.iter().map(|f: &Field| f.name.as_str()).collect();
        assert_eq!(names, vec!["webHookUrl", "grabFields"]);
    }
}
