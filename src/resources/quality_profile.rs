//! `whisparr_quality_profile`
//!
//! The API models profile entries as a tree: a single quality, or a named
//! group holding qualities. State flattens that into `quality_groups`, each
//! listing the quality ids it holds; a group of one unnamed quality is a
//! single quality entry. Entry order is ranking order, lowest first.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{id_attribute, Model};
use crate::client::models::{FormatItem, Quality, QualityProfile, QualityProfileItem};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Block, Diagnostic, NestedBlock, Schema};

/// One ranked entry of a quality profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityGroupState {
    /// Group id. Set together with `name` for groups.
    pub id: Option<i64>,
    /// Group name. Set together with `id` for groups.
    pub name: Option<String>,
    /// Whether releases in this entry are wanted.
    pub allowed: bool,
    /// Quality ids held by the entry.
    pub qualities: Vec<i64>,
}

/// Custom format score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatItemState {
    /// Custom format id.
    pub format: i64,
    /// Score added when the format matches.
    pub score: i64,
}

/// State of a quality profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityProfileState {
    /// Whisparr id.
    pub id: Option<i64>,
    /// Profile name.
    pub name: String,
    /// Keep upgrading until the cutoff is met.
    pub upgrade_allowed: Option<bool>,
    /// Quality or group id upgrades stop at.
    pub cutoff: i64,
    /// Minimum custom format score a release needs.
    pub min_format_score: Option<i64>,
    /// Custom format score upgrades stop at.
    pub cutoff_format_score: Option<i64>,
    /// Minimum score increase for an upgrade.
    pub min_upgrade_format_score: Option<i64>,
    /// Ranked entries.
    pub quality_groups: Option<Vec<QualityGroupState>>,
    /// Custom format scores. Formats scoring zero are omitted.
    pub format_items: Option<Vec<FormatItemState>>,
}

fn group_to_api(group: &QualityGroupState) -> QualityProfileItem {
    let single = group.qualities.len() == 1 && group.id.is_none() && group.name.is_none();
    let quality = |id: i64| Quality {
        id,
        ..Default::default()
    };

    if single {
        return QualityProfileItem {
            quality: Some(quality(group.qualities[0])),
            allowed: group.allowed,
            ..Default::default()
        };
    }

    QualityProfileItem {
        id: group.id,
        name: group.name.clone(),
        quality: None,
        items: group
            .qualities
            .iter()
            .map(|&id| QualityProfileItem {
                quality: Some(quality(id)),
                allowed: group.allowed,
                ..Default::default()
            })
            .collect(),
        allowed: group.allowed,
    }
}

fn group_from_api(item: QualityProfileItem) -> QualityGroupState {
    match item.quality {
        Some(quality) if item.items.is_empty() => QualityGroupState {
            id: None,
            name: None,
            allowed: item.allowed,
            qualities: vec![quality.id],
        },
        _ => QualityGroupState {
            id: item.id,
            name: item.name,
            allowed: item.allowed,
            qualities: item
                .items
                .into_iter()
                .filter_map(|i| i.quality.map(|q| q.id))
                .collect(),
        },
    }
}

impl Model for QualityProfileState {
    type Api = QualityProfile;

    const TYPE_NAME: &'static str = "whisparr_quality_profile";
    const ENTITY: &'static str = "quality profile";
    const LOOKUP_KEY: &'static str = "name";
    const LISTING: &'static str = "quality_profiles";

    fn schema() -> Schema {
        let group = Block::new()
            .with_attribute("id", Attribute::optional_int64())
            .with_attribute("name", Attribute::optional_string())
            .with_attribute("allowed", Attribute::required_bool())
            .with_attribute(
                "qualities",
                Attribute::required(AttributeType::set(AttributeType::Int64))
                    .with_description("Quality ids held by the entry."),
            );
        let format_item = Block::new()
            .with_attribute("format", Attribute::required_int64())
            .with_attribute("score", Attribute::required_int64());

        Schema::v0()
            .with_description("Qualities wanted for a movie and how upgrades proceed.")
            .with_attribute("id", id_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "upgrade_allowed",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute(
                "cutoff",
                Attribute::required_int64()
                    .with_description("Id of the quality or group upgrades stop at."),
            )
            .with_attribute("min_format_score", Attribute::optional_int64().with_default(json!(0)))
            .with_attribute(
                "cutoff_format_score",
                Attribute::optional_int64().with_default(json!(0)),
            )
            .with_attribute(
                "min_upgrade_format_score",
                Attribute::optional_computed(AttributeType::Int64),
            )
            .with_block(
                "quality_groups",
                NestedBlock::list(group).with_min_items(1),
            )
            .with_block("format_items", NestedBlock::set(format_item))
    }

    fn check(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let groups = self.quality_groups.as_deref().unwrap_or_default();

        for (index, group) in groups.iter().enumerate() {
            let path = format!("quality_groups[{}]", index);
            if group.qualities.is_empty() {
                diagnostics.push(
                    Diagnostic::error("Quality group holds no qualities")
                        .with_attribute(format!("{}.qualities", path)),
                );
            }
            let is_group = group.qualities.len() > 1 || group.id.is_some() || group.name.is_some();
            if is_group && (group.id.is_none() || group.name.is_none()) {
                diagnostics.push(
                    Diagnostic::error("Quality group needs an id and a name")
                        .with_detail(
                            "Entries holding more than one quality, or carrying an id or a \
                             name, are groups",
                        )
                        .with_attribute(path),
                );
            }
        }

        let cutoff_known = groups.iter().any(|g| match g.id {
            Some(id) => id == self.cutoff,
            None => g.qualities.first() == Some(&self.cutoff),
        });
        if !groups.is_empty() && !cutoff_known {
            diagnostics.push(
                Diagnostic::error("Cutoff is not part of the profile")
                    .with_detail(format!(
                        "{} is neither a group id nor a single quality id of quality_groups",
                        self.cutoff
                    ))
                    .with_attribute("cutoff"),
            );
        }
        diagnostics
    }

    fn to_api(&self) -> Result<QualityProfile, ProviderError> {
        Ok(QualityProfile {
            id: self.id,
            name: self.name.clone(),
            upgrade_allowed: self.upgrade_allowed.unwrap_or_default(),
            cutoff: self.cutoff,
            min_format_score: self.min_format_score.unwrap_or_default(),
            cutoff_format_score: self.cutoff_format_score.unwrap_or_default(),
            min_upgrade_format_score: self.min_upgrade_format_score,
            items: self
                .quality_groups
                .iter()
                .flatten()
                .map(group_to_api)
                .collect(),
            format_items: self
                .format_items
                .iter()
                .flatten()
                .map(|f| FormatItem {
                    format: f.format,
                    name: None,
                    score: f.score,
                })
                .collect(),
        })
    }

    fn from_api(api: QualityProfile, _prior: Option<&Self>) -> Self {
        Self {
            id: api.id,
            name: api.name,
            upgrade_allowed: Some(api.upgrade_allowed),
            cutoff: api.cutoff,
            min_format_score: Some(api.min_format_score),
            cutoff_format_score: Some(api.cutoff_format_score),
            min_upgrade_format_score: api.min_upgrade_format_score,
            quality_groups: Some(api.items.into_iter().map(group_from_api).collect()),
            format_items: Some(
                api.format_items
                    .into_iter()
                    .filter(|f| f.score != 0)
                    .map(|f| FormatItemState {
                        format: f.format,
                        score: f.score,
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
    use serde_json::json;

    fn api_profile() -> QualityProfile {
        serde_json::from_value(json!({
            "id": 4,
            "name": "HD-1080p",
            "upgradeAllowed": true,
            "cutoff": 1001,
            "items": [
                {"quality": {"id": 1, "name": "SDTV"}, "items": [], "allowed": false},
                {"id": 1001, "name": "WEB 1080p", "allowed": true, "items": [
                    {"quality": {"id": 3, "name": "WEBDL-1080p"}, "items": [], "allowed": true},
                    {"quality": {"id": 15, "name": "WEBRip-1080p"}, "items": [], "allowed": true}
                ]}
            ],
            "formatItems": [
                {"format": 1, "name": "x265", "score": 0},
                {"format": 2, "name": "DV", "score": 100}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_from_api_flattens_items() {
        let state = QualityProfileState::from_api(api_profile(), None);
        let groups = state.quality_groups.unwrap();

        assert_eq!(
            groups[0],
            QualityGroupState {
                id: None,
                name: None,
                allowed: false,
                qualities: vec![1]
            }
        );
        assert_eq!(groups[1].id, Some(1001));
        assert_eq!(groups[1].qualities, vec![3, 15]);
        assert_eq!(
            state.format_items.unwrap(),
            vec![FormatItemState {
                format: 2,
                score: 100
            }]
        );
    }

    #[test]
    fn test_to_api_rebuilds_tree() {
        let state = QualityProfileState::from_api(api_profile(), None);
        let api = state.to_api().unwrap();

        assert!(api.items[0].quality.is_some());
        assert!(api.items[0].items.is_empty());
        assert_eq!(api.items[1].name.as_deref(), Some("WEB 1080p"));
        assert_eq!(api.items[1].items.len(), 2);
        assert!(api.items[1].items.iter().all(|i| i.allowed));
    }

    #[test]
    fn test_check_cutoff_and_groups() {
        let state = QualityProfileState {
            name: "Any".to_string(),
            cutoff: 99,
            quality_groups: Some(vec![
                QualityGroupState {
                    allowed: true,
                    qualities: vec![3, 15],
                    ..Default::default()
                },
                QualityGroupState {
                    allowed: true,
                    qualities: vec![],
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let attrs: Vec<_> = state.check().into_iter().filter_map(|d| d.attribute).collect();
        assert_eq!(
            attrs,
            vec!["quality_groups[0]", "quality_groups[1].qualities", "cutoff"]
        );

        let valid = QualityProfileState::from_api(api_profile(), None);
        assert!(valid.check().is_empty());
    }

    #[test]
    fn test_named_single_quality_needs_group_id() {
        let mut state = QualityProfileState {
            name: "Remux".to_string(),
            cutoff: 30,
            quality_groups: Some(vec![QualityGroupState {
                name: Some("Remux".to_string()),
                allowed: true,
                qualities: vec![30],
                ..Default::default()
            }]),
            ..Default::default()
        };
        let attrs: Vec<_> = state.check().into_iter().filter_map(|d| d.attribute).collect();
        assert_eq!(attrs, vec!["quality_groups[0]"]);

        if let Some(groups) = state.quality_groups.as_mut() {
            groups[0].id = Some(1010);
        }
        state.cutoff = 1010;
        assert!(state.check().is_empty());

        let api = state.to_api().unwrap();
        assert_eq!(api.items[0].id, Some(1010));
        assert_eq!(api.items[0].items.len(), 1);
    }
}
