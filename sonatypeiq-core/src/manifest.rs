//! Manifest - Load the desired configuration from JSON
//!
//! A manifest lists a provider block, managed resources and data sources.
//! Whole-string values of the form `${type.name.attr}` or
//! `${data.type.name.attr}` become references; `${env.NAME}` is replaced with
//! the environment variable at load time.

use std::collections::{HashMap, HashSet};
use std::env;

use serde::Deserialize;

use crate::binding::referenced_bindings;
use crate::resource::{Resource, Value};

/// Manifest error
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Duplicate definition: {0}")]
    Duplicate(String),

    #[error("Invalid reference '{0}': expected ${{type.name.attribute}}")]
    InvalidReference(String),

    #[error("Reference to undefined object: {0}")]
    UndefinedReference(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Dependency cycle involving {0}")]
    DependencyCycle(String),

    #[error("Invalid name '{0}': names may not be empty or contain '.'")]
    InvalidName(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    provider: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    resources: Vec<RawBlock>,
    #[serde(default)]
    data: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBlock {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

/// Parsed manifest
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Provider configuration (url, username, password)
    pub provider: HashMap<String, Value>,
    /// Resources and data sources, ordered so that dependencies come first
    pub resources: Vec<Resource>,
}

impl Manifest {
    /// Managed resources only
    pub fn managed(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| !r.is_data_source())
    }

    /// Data sources only
    pub fn data_sources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| r.is_data_source())
    }

    pub fn provider_string(&self, key: &str) -> Option<&str> {
        self.provider.get(key).and_then(Value::as_str)
    }
}

/// Parse a manifest from JSON text
pub fn parse(content: &str) -> Result<Manifest, ManifestError> {
    let raw: RawManifest = serde_json::from_str(content)?;

    let mut provider = HashMap::new();
    for (key, value) in &raw.provider {
        if let Some(v) = convert(value)? {
            provider.insert(key.clone(), v);
        }
    }

    let mut resources = Vec::new();
    let mut seen = HashSet::new();
    let blocks = raw
        .resources
        .iter()
        .map(|b| (b, false))
        .chain(raw.data.iter().map(|b| (b, true)));

    for (block, read_only) in blocks {
        if block.name.is_empty() || block.name.contains('.') {
            return Err(ManifestError::InvalidName(block.name.clone()));
        }
        let mut resource =
            Resource::new(&block.resource_type, &block.name).with_read_only(read_only);
        for (key, value) in &block.attributes {
            if let Some(v) = convert(value)? {
                resource.attributes.insert(key.clone(), v);
            }
        }
        if !seen.insert(resource.binding()) {
            return Err(ManifestError::Duplicate(resource.binding()));
        }
        resources.push(resource);
    }

    let resources = sort_by_dependencies(resources)?;

    Ok(Manifest {
        provider,
        resources,
    })
}

/// Convert a JSON value, expanding references and environment variables
fn convert(value: &serde_json::Value) -> Result<Option<Value>, ManifestError> {
    match value {
        serde_json::Value::String(s) => parse_string(s).map(Some),
        serde_json::Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                if let Some(v) = convert(item)? {
                    out.push(v);
                }
            }
            Ok(Some(Value::List(out)))
        }
        serde_json::Value::Object(map) => {
            let mut out = HashMap::new();
            for (k, v) in map {
                if let Some(v) = convert(v)? {
                    out.insert(k.clone(), v);
                }
            }
            Ok(Some(Value::Map(out)))
        }
        other => Ok(Value::from_json(other)),
    }
}

fn parse_string(s: &str) -> Result<Value, ManifestError> {
    let Some(inner) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) else {
        return Ok(Value::String(s.to_string()));
    };

    if let Some(var) = inner.strip_prefix("env.") {
        return env::var(var)
            .map(Value::String)
            .map_err(|_| ManifestError::EnvVarNotSet(var.to_string()));
    }

    let parts: Vec<&str> = inner.split('.').collect();
    let valid = match parts.first() {
        Some(&"data") => parts.len() == 4,
        _ => parts.len() == 3,
    };
    if !valid || parts.iter().any(|p| p.is_empty()) {
        return Err(ManifestError::InvalidReference(s.to_string()));
    }

    let (binding, attribute) = inner
        .rsplit_once('.')
        .ok_or_else(|| ManifestError::InvalidReference(s.to_string()))?;
    Ok(Value::ResourceRef(binding.to_string(), attribute.to_string()))
}

/// Order resources so that every referenced binding comes before its referrers
fn sort_by_dependencies(resources: Vec<Resource>) -> Result<Vec<Resource>, ManifestError> {
    let index: HashMap<String, usize> = resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.binding(), i))
        .collect();

    for resource in &resources {
        for dep in referenced_bindings(resource) {
            if !index.contains_key(&dep) {
                return Err(ManifestError::UndefinedReference(dep));
            }
        }
    }

    let mut sorted = Vec::with_capacity(resources.len());
    let mut visited: HashSet<usize> = HashSet::new();
    let mut visiting: HashSet<usize> = HashSet::new();

    fn visit(
        i: usize,
        resources: &[Resource],
        index: &HashMap<String, usize>,
        visited: &mut HashSet<usize>,
        visiting: &mut HashSet<usize>,
        sorted: &mut Vec<usize>,
    ) -> Result<(), ManifestError> {
        if visited.contains(&i) {
            return Ok(());
        }
        if !visiting.insert(i) {
            return Err(ManifestError::DependencyCycle(resources[i].binding()));
        }

        for dep in referenced_bindings(&resources[i]) {
            if let Some(&j) = index.get(&dep) {
                visit(j, resources, index, visited, visiting, sorted)?;
            }
        }

        visiting.remove(&i);
        visited.insert(i);
        sorted.push(i);
        Ok(())
    }

    let mut order = Vec::with_capacity(resources.len());
    for i in 0..resources.len() {
        visit(i, &resources, &index, &mut visited, &mut visiting, &mut order)?;
    }

    let mut slots: Vec<Option<Resource>> = resources.into_iter().map(Some).collect();
    for i in order {
        if let Some(resource) = slots[i].take() {
            sorted.push(resource);
        }
    }
    Ok(sorted)
}
