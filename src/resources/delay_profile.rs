//! `whisparr_delay_profile`

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_one_of, id_attribute, tags_attribute, Model};
use crate::client::models::DelayProfile;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

const PROTOCOLS: &[&str] = &["usenet", "torrent"];

/// State of a delay profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayProfileState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Allow usenet releases.
    pub enable_usenet: Option<bool>,
    /// Allow torrent releases.
    pub enable_torrent: Option<bool>,
    /// Protocol preferred when both are allowed.
    pub preferred_protocol: Option<String>,
    /// Minutes to wait before grabbing a usenet release.
    pub usenet_delay: Option<i64>,
    /// Minutes to wait before grabbing a torrent release.
    pub torrent_delay: Option<i64>,
    /// Skip the delay when the release has the highest quality.
    pub bypass_if_highest_quality: Option<bool>,
    /// Skip the delay above a custom format score.
    pub bypass_if_above_custom_format_score: Option<bool>,
    /// Score used by `bypass_if_above_custom_format_score`.
    pub minimum_custom_format_score: Option<i64>,
    /// Evaluation order, assigned by Whisparr.
    pub order: Option<i64>,
    /// Tag ids the profile applies to.
    pub tags: Option<Vec<i64>>,
}

impl Model for DelayProfileState {
    type Api = DelayProfile;

    const TYPE_NAME: &'static str = "whisparr_delay_profile";
    const ENTITY: &'static str = "delay profile";
    const LOOKUP_KEY: &'static str = "id";
    const LISTING: &'static str = "delay_profiles";

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Delay before grabbing a release, per protocol.")
            .with_attribute("id", id_attribute())
            .with_attribute("enable_usenet", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute("enable_torrent", Attribute::optional_bool().with_default(json!(true)))
            .with_attribute(
                "preferred_protocol",
                Attribute::optional_string()
                    .with_default(json!("usenet"))
                    .with_description("Either `usenet` or `torrent`."),
            )
            .with_attribute("usenet_delay", Attribute::optional_int64().with_default(json!(0)))
            .with_attribute("torrent_delay", Attribute::optional_int64().with_default(json!(0)))
            .with_attribute(
                "bypass_if_highest_quality",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute(
                "bypass_if_above_custom_format_score",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute(
                "minimum_custom_format_score",
                Attribute::optional_int64().with_default(json!(0)),
            )
            .with_attribute(
                "order",
                Attribute::optional_computed(AttributeType::Int64)
                    .with_description("Evaluation order. Assigned by Whisparr when unset."),
            )
            .with_attribute("tags", tags_attribute())
    }

    fn check(&self) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<_> =
            check_one_of("preferred_protocol", self.preferred_protocol.as_deref(), PROTOCOLS)
                .into_iter()
                .collect();

        if self.enable_usenet == Some(false) && self.enable_torrent == Some(false) {
            diagnostics.push(
                Diagnostic::error("No protocol enabled")
                    .with_detail("At least one of enable_usenet and enable_torrent must be true"),
            );
        }
        for (attribute, value) in [
            ("usenet_delay", self.usenet_delay),
            ("torrent_delay", self.torrent_delay),
        ] {
            if value.is_some_and(|v| v < 0) {
                diagnostics.push(
                    Diagnostic::error("Delay must not be negative").with_attribute(attribute),
                );
            }
        }
        diagnostics
    }

    fn to_api(&self) -> Result<DelayProfile, ProviderError> {
        Ok(DelayProfile {
            id: self.id,
            enable_usenet: self.enable_usenet.unwrap_or(true),
            enable_torrent: self.enable_torrent.unwrap_or(true),
            preferred_protocol: Some(
                self.preferred_protocol
                    .clone()
                    .unwrap_or_else(|| "usenet".to_string()),
            ),
            usenet_delay: self.usenet_delay.unwrap_or_default(),
            torrent_delay: self.torrent_delay.unwrap_or_default(),
            bypass_if_highest_quality: self.bypass_if_highest_quality.unwrap_or_default(),
            bypass_if_above_custom_format_score: self
                .bypass_if_above_custom_format_score
                .unwrap_or_default(),
            minimum_custom_format_score: self.minimum_custom_format_score.unwrap_or_default(),
            order: self.order,
            tags: self.tags.clone().unwrap_or_default(),
        })
    }

    fn from_api(api: DelayProfile, _prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            enable_usenet: Some(api.enable_usenet),
            enable_torrent: Some(api.enable_torrent),
            preferred_protocol: api.preferred_protocol,
            usenet_delay: Some(api.usenet_delay),
            torrent_delay: Some(api.torrent_delay),
            bypass_if_highest_quality: Some(api.bypass_if_highest_quality),
            bypass_if_above_custom_format_score: Some(api.bypass_if_above_custom_format_score),
            minimum_custom_format_score: Some(api.minimum_custom_format_score),
            order: api.order,
            tags: Some(api.tags),
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_protocols() {
        let state = DelayProfileState {
            enable_usenet: Some(false),
            enable_torrent: Some(false),
            preferred_protocol: Some("ftp".to_string()),
            usenet_delay: Some(-5),
            ..Default::default()
        };
        let diagnostics = state.check();
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("preferred_protocol"));
        assert_eq!(diagnostics[2].attribute.as_deref(), Some("usenet_delay"));
    }

    #[test]
    fn test_to_api_applies_defaults() {
        let body = DelayProfileState {
            tags: Some(vec![1]),
            ..Default::default()
        }
        .to_api()
        .unwrap();

        assert!(body.enable_usenet && body.enable_torrent);
        assert_eq!(body.preferred_protocol.as_deref(), Some("usenet"));
        assert_eq!(body.tags, vec![1]);
        assert!(body.id.is_none());
    }
}
