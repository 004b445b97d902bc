//! `whisparr_remote_path_mapping`

use serde::{Deserialize, Serialize};

use super::{id_attribute, Model};
use crate::client::models::RemotePathMapping;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// State of a remote path mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePathMappingState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Download client host the mapping applies to.
    pub host: String,
    /// Path as reported by the download client.
    pub remote_path: String,
    /// Same path as seen by Whisparr.
    pub local_path: String,
}

impl Model for RemotePathMappingState {
    type Api = RemotePathMapping;

    const TYPE_NAME: &'static str = "whisparr_remote_path_mapping";
    const ENTITY: &'static str = "remote path mapping";
    const LOOKUP_KEY: &'static str = "id";
    const LISTING: &'static str = "remote_path_mappings";

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Translate download client paths into paths Whisparr can reach.")
            .with_attribute("id", id_attribute())
            .with_attribute(
                "host",
                Attribute::required_string()
                    .with_description("Host as configured on the download client."),
            )
            .with_attribute("remote_path", Attribute::required_string())
            .with_attribute("local_path", Attribute::required_string())
    }

    fn check(&self) -> Vec<Diagnostic> {
        [
            ("host", &self.host),
            ("remote_path", &self.remote_path),
            ("local_path", &self.local_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(attribute, _)| {
            Diagnostic::error("Value must not be empty").with_attribute(attribute)
        })
        .collect()
    }

    fn to_api(&self) -> Result<RemotePathMapping, ProviderError> {
        Ok(RemotePathMapping {
            id: self.id,
            host: self.host.clone(),
            remote_path: self.remote_path.clone(),
            local_path: self.local_path.clone(),
        })
    }

    fn from_api(api: RemotePathMapping, _prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            host: api.host,
            remote_path: api.remote_path,
            local_path: api.local_path,
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
    fn test_api_uses_camel_case() {
        let state = RemotePathMappingState {
            id: Some(1),
            host: "transmission".to_string(),
            remote_path: "/downloads/".to_string(),
            local_path: "/data/downloads/".to_string(),
        };
        let body = serde_json::to_value(state.to_api().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "id": 1,
                "host": "transmission",
                "remotePath": "/downloads/",
                "localPath": "/data/downloads/"
            })
        );
    }

    #[test]
    fn test_blank_values_rejected() {
        let state = RemotePathMappingState {
            host: " ".to_string(),
            remote_path: "/r".to_string(),
            ..Default::default()
        };
        let attrs: Vec<_> = state
            .check()
            .into_iter()
            .filter_map(|d| d.attribute)
            .collect();
        assert_eq!(attrs, vec!["host", "local_path"]);
    }
}
