//! `whisparr_root_folder`
//!
//! Whisparr has no update endpoint for root folders: the path forces a new
//! folder and everything else is read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{id_attribute, Model};
use crate::client::models::RootFolder;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// A folder inside the root folder that no movie uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnmappedFolderState {
    /// Folder name.
    pub name: Option<String>,
    /// Absolute folder path.
    pub path: Option<String>,
}

/// State of a root folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootFolderState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Absolute path on the Whisparr host.
    pub path: String,
    /// Whether Whisparr can access the path.
    pub accessible: Option<bool>,
    /// Folders under the path not mapped to a movie.
    pub unmapped_folders: Option<Vec<UnmappedFolderState>>,
}

impl Model for RootFolderState {
    type Api = RootFolder;

    const TYPE_NAME: &'static str = "whisparr_root_folder";
    const ENTITY: &'static str = "root folder";
    const LOOKUP_KEY: &'static str = "path";
    const LISTING: &'static str = "root_folders";
    const UPDATABLE: bool = false;

    fn schema() -> Schema {
        let unmapped = AttributeType::object(BTreeMap::from([
            ("name".to_string(), AttributeType::String),
            ("path".to_string(), AttributeType::String),
        ]));

        Schema::v0()
            .with_description("Root folder movies are stored under.")
            .with_attribute("id", id_attribute())
            .with_attribute(
                "path",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Absolute path on the Whisparr host."),
            )
            .with_attribute(
                "accessible",
                Attribute::computed_bool()
                    .with_description("Whether Whisparr can access the path."),
            )
            .with_attribute(
                "unmapped_folders",
                Attribute::computed(AttributeType::set(unmapped))
                    .with_description("Folders not mapped to a movie."),
            )
    }

    fn check(&self) -> Vec<Diagnostic> {
        let absolute = self.path.starts_with('/')
            || self.path.starts_with("\\\\")
            || self.path.get(1..3) == Some(":\\");
        if absolute {
            Vec::new()
        } else {
            vec![Diagnostic::error("Root folder path must be absolute")
                .with_detail(format!("'{}' is relative", self.path))
                .with_attribute("path")]
        }
    }

    fn to_api(&self) -> Result<RootFolder, ProviderError> {
        Ok(RootFolder {
            id: self.id,
            path: self.path.clone(),
            ..Default::default()
        })
    }

    fn from_api(api: RootFolder, _prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            path: api.path,
            accessible: api.accessible,
            unmapped_folders: Some(
                api.unmapped_folders
                    .into_iter()
                    .map(|f| UnmappedFolderState {
                        name: f.name,
                        path: f.path,
                    })
                    .collect(),
            ),
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::UnmappedFolder;

    #[test]
    fn test_relative_path_rejected() {
        let state = RootFolderState {
            path: "movies".to_string(),
            ..Default::default()
        };
        assert_eq!(state.check().len(), 1);

        for path in ["/movies", "C:\\Movies", "\\\\nas\\movies"] {
            let state = RootFolderState {
                path: path.to_string(),
                ..Default::default()
            };
            assert!(state.check().is_empty(), "{}", path);
        }
    }

    #[test]
    fn test_from_api_maps_unmapped_folders() {
        let state = RootFolderState::from_api(
            RootFolder {
                id: Some(1),
                path: "/movies".to_string(),
                accessible: Some(true),
                free_space: Some(1024),
                unmapped_folders: vec![UnmappedFolder {
                    name: Some("Show".to_string()),
                    path: Some("/movies/Scene".to_string()),
                }],
            },
            None,
        );

        assert_eq!(state.accessible, Some(true));
        assert_eq!(state.unmapped_folders.unwrap()[0].path.as_deref(), Some("/movies/Scene"));
    }

    #[test]
    fn test_to_api_sends_only_path() {
        let state = RootFolderState {
            path: "/movies".to_string(),
            accessible: Some(false),
            ..Default::default()
        };
        let body = serde_json::to_value(state.to_api().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"path": "/movies"}));
    }
}
