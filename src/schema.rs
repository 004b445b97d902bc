//! Schema types for describing provider, resource and data source structure.
//!
//! Schemas drive validation, planning and the `GetSchema` response. Maps are
//! ordered so plans and diagnostics come out in a stable attribute order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A 64-bit floating point number.
    Float64,
    /// A boolean value.
    Bool,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// A set of unique values of a single type.
    Set(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(BTreeMap<String, AttributeType>),
    /// A dynamic type that can hold any value.
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Create an object type.
    pub fn object(attributes: BTreeMap<String, AttributeType>) -> Self {
        Self::Object(attributes)
    }

    /// Whether values of this type compare without regard to element order.
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider (read-only).
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs/UI.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Create flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Create flags for a computed attribute (read-only, set by provider).
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional+computed attribute (can be set, but has default from provider).
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Mark the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Whether only the provider may set this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// If set, changing this attribute forces resource replacement.
    #[serde(default)]
    pub force_new: bool,
    /// Default value applied at plan time when the configuration leaves the
    /// attribute null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
        }
    }

    /// Create a required attribute of any type.
    pub fn required(attr_type: AttributeType) -> Self {
        Self::new(attr_type, AttributeFlags::required())
    }

    /// Create an optional attribute of any type.
    pub fn optional(attr_type: AttributeType) -> Self {
        Self::new(attr_type, AttributeFlags::optional())
    }

    /// Create a computed attribute of any type.
    pub fn computed(attr_type: AttributeType) -> Self {
        Self::new(attr_type, AttributeFlags::computed())
    }

    /// Create an optional attribute the provider fills when unset.
    pub fn optional_computed(attr_type: AttributeType) -> Self {
        Self::new(attr_type, AttributeFlags::optional_computed())
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::required(AttributeType::String)
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::optional(AttributeType::String)
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::computed(AttributeType::String)
    }

    /// Create a required int64 attribute.
    pub fn required_int64() -> Self {
        Self::required(AttributeType::Int64)
    }

    /// Create an optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::optional(AttributeType::Int64)
    }

    /// Create a computed int64 attribute.
    pub fn computed_int64() -> Self {
        Self::computed(AttributeType::Int64)
    }

    /// Create an optional float64 attribute.
    pub fn optional_float64() -> Self {
        Self::optional(AttributeType::Float64)
    }

    /// Create a required bool attribute.
    pub fn required_bool() -> Self {
        Self::required(AttributeType::Bool)
    }

    /// Create an optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::optional(AttributeType::Bool)
    }

    /// Create a computed bool attribute.
    pub fn computed_bool() -> Self {
        Self::computed(AttributeType::Bool)
    }

    /// Create an optional set of int64, the shape of every `tags` attribute.
    pub fn optional_int64_set() -> Self {
        Self::optional(AttributeType::set(AttributeType::Int64))
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing resource replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set a default value for this attribute.
    ///
    /// An attribute with a default is also computed, since the provider
    /// fills it in when the configuration leaves it unset.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self.flags.computed = true;
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// The nesting mode for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// A single nested block (at most one).
    #[default]
    Single,
    /// A list of nested blocks (zero or more, ordered).
    List,
    /// A set of nested blocks (zero or more, unordered, unique).
    Set,
    /// A map of nested blocks keyed by string.
    Map,
}

/// A group of attributes, either the root of a schema or a nested block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// The attributes within this block.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks within this block.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocks: BTreeMap<String, NestedBlock>,
    /// Human-readable description of the block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// Create a new empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to this block.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block to this block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Set the description for this block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The object type equivalent to this block's values.
    pub fn object_type(&self) -> AttributeType {
        let mut fields: BTreeMap<String, AttributeType> = self
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.attr_type.clone()))
            .collect();
        for (name, nested) in &self.blocks {
            let inner = nested.block.object_type();
            let ty = match nested.nesting_mode {
                BlockNestingMode::Single => inner,
                BlockNestingMode::List => AttributeType::list(inner),
                BlockNestingMode::Set => AttributeType::set(inner),
                BlockNestingMode::Map => AttributeType::map(inner),
            };
            fields.insert(name.clone(), ty);
        }
        AttributeType::Object(fields)
    }

    /// Copy of this block where every attribute is computed-only and
    /// nothing forces replacement.
    fn all_computed(&self) -> Block {
        Block {
            attributes: self
                .attributes
                .iter()
                .map(|(name, attr)| {
                    let mut attr = attr.clone();
                    attr.flags = AttributeFlags {
                        sensitive: attr.flags.sensitive,
                        ..AttributeFlags::computed()
                    };
                    attr.force_new = false;
                    attr.default = None;
                    (name.clone(), attr)
                })
                .collect(),
            blocks: self
                .blocks
                .iter()
                .map(|(name, nested)| {
                    let mut nested = nested.clone();
                    nested.block = nested.block.all_computed();
                    nested.min_items = 0;
                    (name.clone(), nested)
                })
                .collect(),
            description: self.description.clone(),
        }
    }
}

/// A nested block with its nesting mode and constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The block definition.
    #[serde(flatten)]
    pub block: Block,
    /// How the block is nested (single, list, set, map).
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Minimum number of blocks required.
    #[serde(default)]
    pub min_items: u32,
    /// Maximum number of blocks allowed (0 = unlimited).
    #[serde(default)]
    pub max_items: u32,
}

impl NestedBlock {
    /// Create a single nested block (0 or 1 allowed).
    pub fn single(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Single,
            min_items: 0,
            max_items: 1,
        }
    }

    /// Create a list of nested blocks.
    pub fn list(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::List,
            min_items: 0,
            max_items: 0,
        }
    }

    /// Create a set of nested blocks.
    pub fn set(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Set,
            min_items: 0,
            max_items: 0,
        }
    }

    /// Set the minimum number of blocks required.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum number of blocks allowed.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// Schema for a resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    #[serde(default)]
    pub version: u64,
    /// The root block containing all attributes and nested blocks.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block to the schema.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// Set the description of the schema's root block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Look up a top-level attribute.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }

    /// Derive a lookup data source schema from a resource schema.
    ///
    /// Every attribute becomes computed except `key`, which becomes the
    /// required search attribute.
    pub fn as_lookup(&self, key: &str, description: impl Into<String>) -> Schema {
        let mut block = self.block.all_computed();
        if let Some(attr) = block.attributes.get_mut(key) {
            attr.flags = AttributeFlags::required();
        }
        block.description = Some(description.into());
        Schema {
            version: self.version,
            block,
        }
    }

    /// Derive a listing data source schema holding every entity of a
    /// resource under the attribute `name`.
    pub fn as_listing(&self, name: &str, description: impl Into<String>) -> Schema {
        Schema::v0()
            .with_attribute(
                name,
                Attribute::computed(AttributeType::set(self.block.object_type())),
            )
            .with_description(description)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schema for the provider configuration, resources and data sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
    /// Schemas for each data source type.
    #[serde(default)]
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A diagnostic message from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tag_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_int64())
            .with_attribute("label", Attribute::required_string().with_force_new())
            .with_attribute("api_key", Attribute::optional_string().sensitive())
    }

    #[test]
    fn test_attribute_flags() {
        let computed = AttributeFlags::computed();
        assert!(computed.is_computed_only());

        let optional_computed = AttributeFlags::optional_computed();
        assert!(!optional_computed.is_computed_only());

        let sensitive = AttributeFlags::required().sensitive();
        assert!(sensitive.sensitive);
    }

    #[test]
    fn test_with_default_marks_computed() {
        let attr = Attribute::optional_bool().with_default(json!(true));
        assert!(attr.flags.optional);
        assert!(attr.flags.computed);
        assert_eq!(attr.default, Some(json!(true)));
    }

    #[test]
    fn test_as_lookup() {
        let lookup = tag_schema().as_lookup("label", "Single tag");

        let label = lookup.attribute("label").unwrap();
        assert!(label.flags.required);
        assert!(!label.force_new);

        let id = lookup.attribute("id").unwrap();
        assert!(id.flags.is_computed_only());

        let api_key = lookup.attribute("api_key").unwrap();
        assert!(api_key.flags.is_computed_only());
        assert!(api_key.flags.sensitive);
        assert_eq!(lookup.block.description.as_deref(), Some("Single tag"));
    }

    #[test]
    fn test_as_listing() {
        let listing = tag_schema().as_listing("tags", "All tags");
        let attr = listing.attribute("tags").unwrap();
        assert!(attr.flags.is_computed_only());

        match &attr.attr_type {
            AttributeType::Set(inner) => match inner.as_ref() {
                AttributeType::Object(fields) => {
                    assert_eq!(fields.get("id"), Some(&AttributeType::Int64));
                    assert_eq!(fields.get("label"), Some(&AttributeType::String));
                },
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected set, got {:?}", other),
        }
    }

    #[test]
    fn test_object_type_includes_nested_blocks() {
        let block = Block::new()
            .with_attribute("name", Attribute::required_string())
            .with_block(
                "qualities",
                NestedBlock::set(Block::new().with_attribute("id", Attribute::required_int64())),
            );

        let AttributeType::Object(fields) = block.object_type() else {
            panic!("expected object type");
        };
        assert!(matches!(fields.get("qualities"), Some(AttributeType::Set(_))));
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("The label must be lowercase")
            .with_attribute("label");

        assert!(err.is_error());
        assert_eq!(err.summary, "Invalid configuration");
        assert_eq!(err.attribute, Some("label".to_string()));
        assert!(!Diagnostic::warning("deprecated").is_error());
    }
}
