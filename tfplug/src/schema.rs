//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas: attribute types, nested attributes, and the recursive type check
//! applied to values crossing the protocol boundary.

use crate::defaults::DefaultValue;
use crate::error::{Result, TfplugError};
use crate::plan_modifier::PlanModifier;
use crate::types::{AttributePath, Diagnostic, Dynamic};
use crate::validator::Validator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn set(element: AttributeType) -> Self {
        AttributeType::Set(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    pub fn object<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (S, AttributeType)>,
        S: Into<String>,
    {
        AttributeType::Object(
            attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }

    /// Check a value against this type, recursing into collections and objects.
    /// Null and unknown conform to every type.
    pub fn check(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.check_into(value, path, &mut diagnostics);
        diagnostics
    }

    fn check_into(&self, value: &Dynamic, path: &AttributePath, diags: &mut Vec<Diagnostic>) {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => {}
            (AttributeType::String, Dynamic::String(_))
            | (AttributeType::Number, Dynamic::Number(_))
            | (AttributeType::Bool, Dynamic::Bool(_)) => {}
            (AttributeType::List(element), Dynamic::List(items))
            | (AttributeType::Set(element), Dynamic::List(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    element.check_into(item, &path.clone().index(idx as i64), diags);
                }
            }
            (AttributeType::Map(element), Dynamic::Map(entries)) => {
                for (key, item) in entries {
                    element.check_into(item, &path.clone().key(key), diags);
                }
            }
            (AttributeType::Object(attributes), Dynamic::Map(entries)) => {
                let mut names: Vec<&String> = attributes.keys().collect();
                names.sort();
                for name in names {
                    let attr_path = path.clone().attribute(name);
                    match entries.get(name) {
                        Some(item) => attributes[name].check_into(item, &attr_path, diags),
                        None => diags.push(
                            Diagnostic::error(
                                "Missing attribute",
                                format!("object is missing attribute {:?}", name),
                            )
                            .with_attribute(attr_path),
                        ),
                    }
                }

                let mut extra: Vec<&String> = entries
                    .keys()
                    .filter(|k| !attributes.contains_key(*k))
                    .collect();
                extra.sort();
                for name in extra {
                    diags.push(
                        Diagnostic::error(
                            "Unexpected attribute",
                            format!("object has unexpected attribute {:?}", name),
                        )
                        .with_attribute(path.clone().attribute(name)),
                    );
                }
            }
            (expected, actual) => diags.push(
                Diagnostic::error(
                    "Invalid attribute type",
                    format!("expected {}, got {}", expected, actual.kind()),
                )
                .with_attribute(path.clone()),
            ),
        }
    }

    /// cty type constraint as JSON, the form Terraform expects in schemas
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Map, Value};
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(element) => json!(["list", element.to_json()]),
            AttributeType::Set(element) => json!(["set", element.to_json()]),
            AttributeType::Map(element) => json!(["map", element.to_json()]),
            AttributeType::Object(attributes) => {
                let fields: Map<String, Value> = attributes
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_type_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.to_json())
            .map_err(|e| TfplugError::EncodingError(format!("type encoding failed: {}", e)))
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Number => write!(f, "number"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::List(element) => write!(f, "list of {}", element),
            AttributeType::Set(element) => write!(f, "set of {}", element),
            AttributeType::Map(element) => write!(f, "map of {}", element),
            AttributeType::Object(_) => write!(f, "object"),
        }
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// The object type every value of this schema must conform to
    pub fn object_type(&self) -> AttributeType {
        attributes_type(&self.block.attributes)
    }

    /// An object with every attribute set to null
    pub fn null_value(&self) -> Dynamic {
        Dynamic::Map(
            self.block
                .attributes
                .iter()
                .map(|a| (a.name.clone(), Dynamic::Null))
                .collect(),
        )
    }

    /// Bring a stored value into this schema's shape: attributes missing from
    /// the value become null and attributes the schema does not declare are
    /// dropped. Nested objects are normalized recursively.
    pub fn normalize(&self, value: &Dynamic) -> Dynamic {
        normalize_attributes(&self.block.attributes, value)
    }

    /// Run attribute validators over a configuration value
    pub fn validate(&self, config: &Dynamic) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        validate_attributes(
            &self.block.attributes,
            config,
            &AttributePath::root(),
            &mut diagnostics,
        );
        diagnostics
    }
}

fn attributes_type(attributes: &[Attribute]) -> AttributeType {
    AttributeType::Object(
        attributes
            .iter()
            .map(|a| (a.name.clone(), a.r#type.clone()))
            .collect(),
    )
}

fn normalize_attributes(attributes: &[Attribute], value: &Dynamic) -> Dynamic {
    let Dynamic::Map(entries) = value else {
        return value.clone();
    };

    let normalized = attributes
        .iter()
        .map(|attr| {
            let item = entries.get(&attr.name).unwrap_or(&Dynamic::Null);
            let item = match (&attr.nested_type, item) {
                (Some(nested), Dynamic::Map(_)) if nested.nesting == ObjectNestingMode::Single => {
                    normalize_attributes(&nested.attributes, item)
                }
                (Some(nested), Dynamic::List(items)) if nested.nesting == ObjectNestingMode::List => {
                    Dynamic::List(
                        items
                            .iter()
                            .map(|i| normalize_attributes(&nested.attributes, i))
                            .collect(),
                    )
                }
                _ => item.clone(),
            };
            (attr.name.clone(), item)
        })
        .collect();

    Dynamic::Map(normalized)
}

fn validate_attributes(
    attributes: &[Attribute],
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Dynamic::Map(entries) = value else {
        return;
    };

    for attr in attributes {
        let Some(item) = entries.get(&attr.name) else {
            continue;
        };
        if item.is_null() || item.is_unknown() {
            continue;
        }
        let attr_path = path.clone().attribute(&attr.name);

        for validator in &attr.validators {
            validator.validate(item, &attr_path, diagnostics);
        }

        match (&attr.nested_type, item) {
            (Some(nested), Dynamic::Map(_)) if nested.nesting == ObjectNestingMode::Single => {
                validate_attributes(&nested.attributes, item, &attr_path, diagnostics);
            }
            (Some(nested), Dynamic::List(items)) if nested.nesting == ObjectNestingMode::List => {
                for (idx, element) in items.iter().enumerate() {
                    validate_attributes(
                        &nested.attributes,
                        element,
                        &attr_path.clone().index(idx as i64),
                        diagnostics,
                    );
                }
            }
            _ => {}
        }
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn DefaultValue>>,
    pub nested_type: Option<NestedType>,
    pub deprecated: bool,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.as_ref().map(|d| d.description()))
            .field("nested_type", &self.nested_type)
            .finish()
    }
}

/// NestedType for attributes with nested structures
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: ObjectNestingMode,
}

impl NestedType {
    pub fn single(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            nesting: ObjectNestingMode::Single,
        }
    }

    pub fn list(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            nesting: ObjectNestingMode::List,
        }
    }

    pub fn attribute_type(&self) -> AttributeType {
        let object = attributes_type(&self.attributes);
        match self.nesting {
            ObjectNestingMode::Single | ObjectNestingMode::Invalid => object,
            ObjectNestingMode::List => AttributeType::list(object),
            ObjectNestingMode::Set => AttributeType::set(object),
            ObjectNestingMode::Map => AttributeType::map(object),
        }
    }
}

/// ObjectNestingMode for nested attribute objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectNestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                nested_type: None,
                deprecated: false,
            },
        }
    }

    /// Create an attribute whose value is a nested object or list of objects
    pub fn nested(name: &str, nested: NestedType) -> Self {
        let mut builder = Self::new(name, nested.attribute_type());
        builder.attribute.nested_type = Some(nested);
        builder
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    /// Default applied at plan time when the configuration leaves the attribute null
    pub fn default(mut self, default: Box<dyn DefaultValue>) -> Self {
        self.attribute.default = Some(Arc::from(default));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
