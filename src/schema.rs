//! Schema types for describing the provider, its resources, and data sources.
//!
//! Schemas drive config validation, plan computation (which attributes are
//! computed, which force replacement), and are published over the plugin
//! protocol so the host can check configurations before calling us.

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
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider.
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs/UI.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Flags for a computed attribute (read-only, set by provider).
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Flags for an optional+computed attribute (user may set it, API fills it otherwise).
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Whether the user can never set this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Checks applied to configured string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringValidator {
    /// Non-empty, no leading or trailing whitespace.
    ValidName,
    /// One of a fixed set of values.
    OneOf(Vec<String>),
    /// Looks like an email address.
    Email,
}

impl StringValidator {
    /// Build a [`StringValidator::OneOf`] from string literals.
    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| v.to_string()).collect())
    }
}

/// How nested attributes are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    /// A single nested object.
    #[default]
    Single,
    /// An ordered list of objects.
    List,
    /// An unordered set of objects.
    Set,
    /// A map of objects keyed by string.
    Map,
}

/// Nested attributes of an object-valued attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedAttributes {
    /// How the nested objects are grouped.
    pub nesting: NestingMode,
    /// The attributes of each nested object.
    pub attributes: BTreeMap<String, Attribute>,
}

impl NestedAttributes {
    /// The wire type of the nested attribute.
    pub fn attribute_type(&self) -> AttributeType {
        let object = AttributeType::Object(
            self.attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.attr_type.clone()))
                .collect(),
        );
        match self.nesting {
            NestingMode::Single => object,
            NestingMode::List => AttributeType::list(object),
            NestingMode::Set => AttributeType::set(object),
            NestingMode::Map => AttributeType::map(object),
        }
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
    /// Changing this attribute forces resource replacement.
    #[serde(default)]
    pub force_new: bool,
    /// Keep the prior state value instead of planning an unknown.
    #[serde(default)]
    pub use_state_for_unknown: bool,
    /// Default value used when the attribute is not configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Nested attribute definitions for object-valued attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedAttributes>,
    /// Validators for configured string values.
    #[serde(skip)]
    pub validators: Vec<StringValidator>,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            use_state_for_unknown: false,
            default: None,
            nested: None,
            validators: Vec::new(),
        }
    }

    /// Create an attribute made of nested attributes.
    pub fn nested(
        nesting: NestingMode,
        attributes: BTreeMap<String, Attribute>,
        flags: AttributeFlags,
    ) -> Self {
        let nested = NestedAttributes {
            nesting,
            attributes,
        };
        let mut attr = Self::new(nested.attribute_type(), flags);
        attr.nested = Some(nested);
        attr
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create an optional+computed string attribute.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    /// Create the conventional `id` attribute: computed and stable across updates.
    pub fn id() -> Self {
        Self::computed_string()
            .with_description("Unique identifier")
            .with_use_state_for_unknown()
    }

    /// Create the conventional `organization` attribute.
    pub fn organization() -> Self {
        Self::optional_computed_string()
            .with_description("Organization ID")
            .with_force_new()
            .with_use_state_for_unknown()
    }

    /// Create an optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Create an optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Create an optional+computed bool attribute.
    pub fn optional_computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional_computed())
    }

    /// Create a computed bool attribute.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// Create a set-of-strings attribute.
    pub fn string_set(flags: AttributeFlags) -> Self {
        Self::new(AttributeType::set(AttributeType::String), flags)
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

    /// Keep the prior state value during planning when the attribute is unconfigured.
    pub fn with_use_state_for_unknown(mut self) -> Self {
        self.use_state_for_unknown = true;
        self
    }

    /// Set a default value for this attribute.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Add a validator for configured string values.
    pub fn with_validator(mut self, validator: StringValidator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// Schema for a resource, data source, or the provider block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    #[serde(default)]
    pub version: u64,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Top-level attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            description: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Paths of sensitive attributes, one level of nesting deep.
    pub fn sensitive_paths(&self) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        for (name, attr) in &self.attributes {
            if attr.flags.sensitive {
                paths.push(vec![name.clone()]);
            }
            if let Some(nested) = attr.nested.as_ref().filter(|n| n.nesting == NestingMode::Single)
            {
                for (child, child_attr) in &nested.attributes {
                    if child_attr.flags.sensitive {
                        paths.push(vec![name.clone(), child.clone()]);
                    }
                }
            }
        }
        paths
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schemas for the whole provider.
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
    /// A warning that doesn't prevent the operation.
    Warning,
}

/// A diagnostic message returned from a provider operation.
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

/// Whether any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_attributes() {
        let id = Attribute::id();
        assert!(id.flags.is_computed_only());
        assert!(id.use_state_for_unknown);
        assert!(!id.force_new);

        let org = Attribute::organization();
        assert!(org.flags.optional && org.flags.computed);
        assert!(org.force_new);
    }

    #[test]
    fn test_nested_attribute_type() {
        let attr = Attribute::nested(
            NestingMode::Set,
            BTreeMap::from([
                ("id".to_string(), Attribute::required_string()),
                ("enabled".to_string(), Attribute::optional_computed_bool()),
            ]),
            AttributeFlags::optional_computed(),
        );

        let expected = AttributeType::set(AttributeType::Object(BTreeMap::from([
            ("enabled".to_string(), AttributeType::Bool),
            ("id".to_string(), AttributeType::String),
        ])));
        assert_eq!(attr.attr_type, expected);
        assert_eq!(attr.nested.unwrap().nesting, NestingMode::Set);
    }

    #[test]
    fn test_sensitive_paths_include_nested_single() {
        let schema = Schema::v0()
            .with_attribute("token", Attribute::optional_string().sensitive())
            .with_attribute(
                "configuration",
                Attribute::nested(
                    NestingMode::Single,
                    BTreeMap::from([
                        ("host".to_string(), Attribute::required_string()),
                        (
                            "password".to_string(),
                            Attribute::optional_string().sensitive(),
                        ),
                    ]),
                    AttributeFlags::required(),
                ),
            );

        let paths = schema.sensitive_paths();
        assert_eq!(
            paths,
            vec![
                vec!["configuration".to_string(), "password".to_string()],
                vec!["token".to_string()],
            ]
        );
    }

    #[test]
    fn test_schema_serializes_without_validators() {
        let schema = Schema::v0().with_attribute(
            "name",
            Attribute::required_string().with_validator(StringValidator::ValidName),
        );
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["attributes"]["name"]["type"], "string");
        assert_eq!(json["attributes"]["name"]["required"], true);
        assert!(json["attributes"]["name"].get("validators").is_none());
    }

    #[test]
    fn test_diagnostic_builders() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("The value must be positive")
            .with_attribute("count");

        assert!(err.is_error());
        assert_eq!(err.detail.as_deref(), Some("The value must be positive"));
        assert_eq!(err.attribute.as_deref(), Some("count"));
        assert!(has_errors(&[Diagnostic::warning("w"), err]));
        assert!(!has_errors(&[Diagnostic::warning("w")]));
    }
}
