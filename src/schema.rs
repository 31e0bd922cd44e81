//! The attribute model shared by the provider config, every Fivetran
//! resource and every data source. Schemas drive validation, planning and
//! state upgrades, and are sent to the host as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int64,
    Float64,
    Bool,
    List(Box<AttributeType>),
    /// Compared without regard to order.
    Set(Box<AttributeType>),
    /// String keys only.
    Map(Box<AttributeType>),
    Object(BTreeMap<String, AttributeType>),
    /// Free-form JSON; used for service-specific `config` and `auth` bags.
    Dynamic,
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: AttributeType) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        Self::Map(Box::new(element))
    }

    /// Object type from `(field, type)` pairs.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(name, ty)| (name.into(), ty)).collect())
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

/// Who may set an attribute, and whether its value is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    pub required: bool,
    pub optional: bool,
    /// Filled in by the provider from the API response.
    pub computed: bool,
    /// Redacted in plan output and never logged.
    pub sensitive: bool,
}

impl AttributeFlags {
    pub fn required() -> Self {
        Self { required: true, ..Self::default() }
    }

    pub fn optional() -> Self {
        Self { optional: true, ..Self::default() }
    }

    pub fn computed() -> Self {
        Self { computed: true, ..Self::default() }
    }

    /// May be set; upstream picks a value when it is not.
    pub fn optional_computed() -> Self {
        Self { optional: true, computed: true, ..Self::default() }
    }

    pub fn is_computed_only(&self) -> bool {
        self.computed && !(self.optional || self.required)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(flatten)]
    pub flags: AttributeFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change to this attribute replaces the resource.
    #[serde(default)]
    pub force_new: bool,
    /// Filled into the plan when configuration leaves the attribute out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Attribute {
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
        }
    }

    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    pub fn optional_computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional_computed())
    }

    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    pub fn optional_computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional_computed())
    }

    /// Names such as `disabled_schemas` or webhook `events`.
    pub fn optional_string_set() -> Self {
        Self::new(AttributeType::set(AttributeType::String), AttributeFlags::optional())
    }

    pub fn optional_string_map() -> Self {
        Self::new(AttributeType::map(AttributeType::String), AttributeFlags::optional())
    }

    pub fn optional_dynamic() -> Self {
        Self::new(AttributeType::Dynamic, AttributeFlags::optional())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// At most one, e.g. `timeouts`.
    #[default]
    Single,
    List,
    /// Unordered and unique, e.g. membership entries.
    Set,
    Map,
}

/// Attributes plus nested blocks. Both the root of a schema and every
/// nested block use this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocks: BTreeMap<String, NestedBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    #[serde(flatten)]
    pub block: Block,
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    #[serde(default)]
    pub min_items: u32,
    /// 0 means unbounded.
    #[serde(default)]
    pub max_items: u32,
}

impl NestedBlock {
    fn nested(block: Block, nesting_mode: BlockNestingMode, max_items: u32) -> Self {
        Self {
            block,
            nesting_mode,
            min_items: 0,
            max_items,
        }
    }

    pub fn single(block: Block) -> Self {
        Self::nested(block, BlockNestingMode::Single, 1)
    }

    pub fn list(block: Block) -> Self {
        Self::nested(block, BlockNestingMode::List, 0)
    }

    pub fn set(block: Block) -> Self {
        Self::nested(block, BlockNestingMode::Set, 0)
    }

    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }
}

/// Schema of one resource type, data source or the provider config.
/// `version` is bumped whenever the state layout changes and an upgrade
/// step is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub version: u64,
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    pub fn v0() -> Self {
        Self::new(0)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block = self.block.with_attribute(name, attr);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block = self.block.with_block(name, block);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block = self.block.with_description(description);
        self
    }

    /// Add the pass-through `timeouts` block (`create`, `read`, `update`,
    /// `delete` durations). The host enforces them; the provider only
    /// accepts and stores them.
    pub fn with_timeouts(self) -> Self {
        let timeouts = ["create", "read", "update", "delete"]
            .into_iter()
            .fold(Block::new(), |block, op| block.with_attribute(op, Attribute::optional_string()));
        self.with_block("timeouts", NestedBlock::single(timeouts))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Everything the host learns from `GetSchema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: Schema,
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// The operation failed.
    Error,
    /// The operation went through, but something needs attention, e.g. a
    /// compensation that could not be undone.
    Warning,
}

/// One message for the host. Every failure crosses the plugin boundary
/// as a list of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path such as `destination_schema.prefix`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_flags() {
        let computed = AttributeFlags::computed();
        assert!(computed.is_computed_only());

        let optional_computed = AttributeFlags::optional_computed();
        assert!(optional_computed.optional);
        assert!(optional_computed.computed);
        assert!(!optional_computed.is_computed_only());
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::required_string()
            .with_description("ID of the group the destination belongs to")
            .with_force_new();

        assert_eq!(attr.attr_type, AttributeType::String);
        assert!(attr.flags.required);
        assert!(attr.force_new);

        let secret = Attribute::optional_dynamic().sensitive();
        assert_eq!(secret.attr_type, AttributeType::Dynamic);
        assert!(secret.flags.sensitive);

        let events = Attribute::optional_string_set();
        assert!(events.attr_type.is_set());
    }

    #[test]
    fn test_object_type_builder() {
        let ty = AttributeType::object([
            ("name", AttributeType::String),
            ("table", AttributeType::String),
        ]);
        match ty {
            AttributeType::Object(fields) => {
                assert_eq!(fields.len(), 2);
                assert!(fields.contains_key("table"));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_with_timeouts() {
        let schema = Schema::new(1)
            .with_attribute("id", Attribute::computed_string())
            .with_timeouts();

        assert_eq!(schema.version, 1);
        assert!(schema.attribute("id").is_some());
        let timeouts = &schema.block.blocks["timeouts"];
        assert_eq!(timeouts.nesting_mode, BlockNestingMode::Single);
        assert!(timeouts.block.attributes.contains_key("create"));
    }

    #[test]
    fn test_provider_schema() {
        let provider_schema = ProviderSchema::new()
            .with_provider_config(
                Schema::v0().with_attribute("api_key", Attribute::optional_string().sensitive()),
            )
            .with_resource(
                "fivetran_group",
                Schema::v0().with_attribute("name", Attribute::required_string()),
            )
            .with_data_source(
                "fivetran_groups",
                Schema::v0().with_attribute("groups", Attribute::computed_string()),
            );

        assert!(provider_schema.provider.attribute("api_key").is_some());
        assert!(provider_schema.resources.contains_key("fivetran_group"));
        assert!(provider_schema.data_sources.contains_key("fivetran_groups"));
    }

    #[test]
    fn test_diagnostics() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("disabled_schemas and enabled_schemas are mutually exclusive")
            .with_attribute("enabled_schemas");

        assert!(err.is_error());
        assert_eq!(err.attribute.as_deref(), Some("enabled_schemas"));
        assert!(has_errors(&[Diagnostic::warning("w"), err]));
        assert!(!has_errors(&[Diagnostic::warning("w")]));
    }
}
