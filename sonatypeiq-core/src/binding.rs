//! Binding - Resolve references between resources
//!
//! Every resource and data source is reachable under a binding name
//! (`type.name` or `data.type.name`). Attribute values of the form
//! `Value::ResourceRef(binding, attribute)` are replaced with the value
//! recorded for that binding once it is known.

use std::collections::HashMap;

use crate::resource::{Resource, Value};

#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, HashMap<String, Value>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or merge into) the attributes known for a binding
    pub fn insert(&mut self, binding: impl Into<String>, attributes: &HashMap<String, Value>) {
        let entry = self.values.entry(binding.into()).or_default();
        for (k, v) in attributes {
            entry.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, binding: &str, attribute: &str) -> Option<&Value> {
        self.values.get(binding).and_then(|attrs| attrs.get(attribute))
    }

    /// Resolve references inside a value; unknown references are left as-is
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::ResourceRef(binding, attribute) => match self.get(binding, attribute) {
                Some(resolved) => self.resolve_value(resolved),
                None => value.clone(),
            },
            Value::List(items) => {
                Value::List(items.iter().map(|v| self.resolve_value(v)).collect())
            }
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Resolve every attribute of a resource
    pub fn resolve(&self, resource: &Resource) -> Resource {
        let mut resolved = resource.clone();
        for (key, value) in &resource.attributes {
            resolved
                .attributes
                .insert(key.clone(), self.resolve_value(value));
        }
        resolved
    }
}

/// Collect `binding.attribute` strings of references that are still unresolved
pub fn unresolved_references(resource: &Resource) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::ResourceRef(binding, attribute) => {
                out.push(format!("{}.{}", binding, attribute))
            }
            Value::List(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Map(map) => map.values().for_each(|v| collect(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    for value in resource.attributes.values() {
        collect(value, &mut out);
    }
    out.sort();
    out
}

/// Bindings referenced by a resource's attributes
pub fn referenced_bindings(resource: &Resource) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::ResourceRef(binding, _) => {
                if !out.contains(binding) {
                    out.push(binding.clone());
                }
            }
            Value::List(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Map(map) => map.values().for_each(|v| collect(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    for value in resource.attributes.values() {
        collect(value, &mut out);
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(binding: &str, attribute: &str) -> Value {
        Value::ResourceRef(binding.to_string(), attribute.to_string())
    }

    #[test]
    fn resolves_known_references() {
        let mut bindings = Bindings::new();
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), Value::string("org-123"));
        bindings.insert("organization.eng", &attrs);

        let app = Resource::new("application", "billing")
            .with_attribute("organization_id", reference("organization.eng", "id"))
            .with_attribute("name", Value::string("Billing"));

        let resolved = bindings.resolve(&app);
        assert_eq!(
            resolved.attributes.get("organization_id"),
            Some(&Value::string("org-123"))
        );
        assert!(unresolved_references(&resolved).is_empty());
    }

    #[test]
    fn unknown_references_are_kept() {
        let bindings = Bindings::new();
        let app = Resource::new("application", "billing")
            .with_attribute("organization_id", reference("organization.eng", "id"));

        let resolved = bindings.resolve(&app);
        assert_eq!(
            unresolved_references(&resolved),
            vec!["organization.eng.id".to_string()]
        );
        assert_eq!(
            referenced_bindings(&resolved),
            vec!["organization.eng".to_string()]
        );
    }

    #[test]
    fn resolves_inside_lists() {
        let mut bindings = Bindings::new();
        let mut attrs = HashMap::new();
        attrs.insert("hostname".to_string(), Value::string("proxy.internal"));
        bindings.insert("data.system_config.current", &attrs);

        let value = Value::List(vec![
            Value::string("localhost"),
            reference("data.system_config.current", "hostname"),
        ]);
        assert_eq!(
            bindings.resolve_value(&value),
            Value::List(vec![
                Value::string("localhost"),
                Value::string("proxy.internal")
            ])
        );
    }
}
