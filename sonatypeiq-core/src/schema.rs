//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource and data source type,
//! enabling validation before any network call is made.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use regex::Regex;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Build an enum type from string slices
    pub fn one_of(variants: &[&str]) -> Self {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            // References resolve at apply time; their type is checked then
            (_, Value::ResourceRef(_, _)) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' must be at least {min} characters long")]
    TooShort { name: String, min: usize },

    #[error("Attribute '{name}' requires '{requires}' to be set")]
    MissingDependency { name: String, requires: String },

    #[error("Exactly one of {} must be set", names.join(", "))]
    ExactlyOneOf { names: Vec<String> },

    #[error("Attribute '{name}': {inner}")]
    InAttribute { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::ResourceRef(binding, attr) => format!("ResourceRef({}.{})", binding, attr),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the provider; when not also optional, users may not set it
    pub computed: bool,
    /// Optional attribute that the provider may also fill in
    pub optional: bool,
    pub sensitive: bool,
    /// Never returned by the server; the last written value is kept in state
    pub write_only: bool,
    /// Changing this attribute forces delete + create
    pub requires_replace: bool,
    pub default: Option<Value>,
    pub min_length: Option<usize>,
    /// Attributes that must be set whenever this one is
    pub also_requires: Vec<String>,
    pub description: Option<String>,
    /// Server-side property name (JSON field in the IQ Server API)
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            optional: true,
            sensitive: false,
            write_only: false,
            requires_replace: false,
            default: None,
            min_length: None,
            also_requires: Vec::new(),
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Computed-only attribute
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self
    }

    /// Optional attribute the provider fills in when unset
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.optional = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn also_requires(mut self, other: impl Into<String>) -> Self {
        self.also_requires.push(other.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// True for attributes only the provider sets
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    fn validate_value(&self, value: &Value) -> Result<(), TypeError> {
        self.attr_type
            .validate(value)
            .map_err(|e| TypeError::InAttribute {
                name: self.name.clone(),
                inner: Box::new(e),
            })?;

        if let (Some(min), Value::String(s)) = (self.min_length, value)
            && s.chars().count() < min
        {
            return Err(TypeError::TooShort {
                name: self.name.clone(),
                min,
            });
        }

        Ok(())
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    /// Groups of attributes of which exactly one must be set
    pub exactly_one_of: Vec<Vec<String>>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            exactly_one_of: Vec::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.exactly_one_of
            .push(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Attribute names sorted for stable output
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.sensitive)
    }

    pub fn is_write_only(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.write_only)
    }

    pub fn forces_replacement(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.requires_replace)
    }

    /// Fill unset attributes that have a default value
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !attributes.contains_key(name)
            {
                attributes.insert(name.clone(), default.clone());
            }
        }
    }

    /// Carry write-only values from a prior state into refreshed attributes
    ///
    /// The server never returns them, so without this every refresh would
    /// report them as removed.
    pub fn carry_write_only(
        &self,
        prior: &HashMap<String, Value>,
        refreshed: &mut HashMap<String, Value>,
    ) {
        for (name, schema) in &self.attributes {
            if schema.write_only
                && !refreshed.contains_key(name)
                && let Some(value) = prior.get(name)
            {
                refreshed.insert(name.clone(), value.clone());
            }
        }
    }

    /// Validate user-supplied attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        let mut required: Vec<_> = self
            .attributes
            .values()
            .filter(|s| s.required && s.default.is_none())
            .collect();
        required.sort_by(|a, b| a.name.cmp(&b.name));
        for schema in required {
            if !attributes.contains_key(&schema.name) {
                errors.push(TypeError::MissingRequired {
                    name: schema.name.clone(),
                });
            }
        }

        let mut names: Vec<&String> = attributes.keys().collect();
        names.sort();
        for name in names {
            // Internal attributes (starting with _) are not part of the schema
            if name.starts_with('_') {
                continue;
            }
            let value = &attributes[name];
            match self.attributes.get(name) {
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
                Some(schema) if schema.is_computed_only() => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.validate_value(value) {
                        errors.push(e);
                    }
                    for dependency in &schema.also_requires {
                        if !attributes.contains_key(dependency) {
                            errors.push(TypeError::MissingDependency {
                                name: name.clone(),
                                requires: dependency.clone(),
                            });
                        }
                    }
                }
            }
        }

        for group in &self.exactly_one_of {
            let set = group.iter().filter(|n| attributes.contains_key(*n)).count();
            if set != 1 {
                errors.push(TypeError::ExactlyOneOf {
                    names: group.clone(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// TCP port number
    pub fn port() -> AttributeType {
        AttributeType::Custom {
            name: "Port".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (1..=65535).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Port {} is out of range 1-65535", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Absolute URL (e.g., "https://iq.example.com")
    pub fn url() -> AttributeType {
        AttributeType::Custom {
            name: "Url".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_url(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Document that looks like XML (`<...>` with surrounding whitespace)
    pub fn xml_document() -> AttributeType {
        AttributeType::Custom {
            name: "XmlDocument".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_xml_document(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Standard base64 encoded payload
    pub fn base64() -> AttributeType {
        AttributeType::Custom {
            name: "Base64".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_base64(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }
}

/// Validate an absolute URL with a host
pub fn validate_url(s: &str) -> Result<(), String> {
    match url::Url::parse(s) {
        Ok(u) if u.has_host() => Ok(()),
        Ok(_) => Err(format!("Invalid URL '{}': missing host", s)),
        Err(e) => Err(format!("Invalid URL '{}': {}", s, e)),
    }
}

/// Validate that the content is an XML document
pub fn validate_xml_document(s: &str) -> Result<(), String> {
    let re = Regex::new(r"(?s)^\s*<.*>\s*$").map_err(|e| e.to_string())?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err("must be an XML document".to_string())
    }
}

/// Validate standard base64 encoding
pub fn validate_base64(s: &str) -> Result<(), String> {
    base64::engine::general_purpose::STANDARD
        .decode(s.trim())
        .map(|_| ())
        .map_err(|e| format!("Invalid base64 data: {}", e))
}
