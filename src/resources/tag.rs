//! `whisparr_tag`

use serde::{Deserialize, Serialize};

use super::{id_attribute, Model};
use crate::client::models::Tag;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// State of a tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Tag label, lowercase.
    pub label: String,
}

impl Model for TagState {
    type Api = Tag;

    const TYPE_NAME: &'static str = "whisparr_tag";
    const ENTITY: &'static str = "tag";
    const LOOKUP_KEY: &'static str = "label";
    const LISTING: &'static str = "tags";

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Tag used to link movies, indexers, download clients and profiles.")
            .with_attribute("id", id_attribute())
            .with_attribute(
                "label",
                Attribute::required_string().with_description("Tag label. Must be lowercase."),
            )
    }

    fn check(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if self.label.trim().is_empty() {
            diagnostics.push(
                Diagnostic::error("Empty tag label")
                    .with_attribute("label"),
            );
        } else if self.label != self.label.to_lowercase() {
            diagnostics.push(
                Diagnostic::error("Tag label must be lowercase")
                    .with_detail(format!(
                        "Whisparr stores labels lowercase; use '{}'",
                        self.label.to_lowercase()
                    ))
                    .with_attribute("label"),
            );
        }
        diagnostics
    }

    fn to_api(&self) -> Result<Tag, ProviderError> {
        Ok(Tag {
            id: self.id,
            label: self.label.clone(),
        })
    }

    fn from_api(api: Tag, _prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            label: api.label,
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uppercase_label_rejected() {
        let state = TagState {
            id: None,
            label: "Favorites".to_string(),
        };
        let diagnostics = state.check();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("label"));
    }

    #[test]
    fn test_state_shape() {
        let state = TagState::from_api(
            Tag {
                id: Some(2),
                label: "vr".to_string(),
            },
            None,
        );
        assert_eq!(serde_json::to_value(&state).unwrap(), json!({"id": 2, "label": "vr"}));
        assert!(state.check().is_empty());
    }
}
