//! State file structures for persisting what was applied to IQ Server

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use sonatypeiq_core::resource::{
    ResourceId, State, attributes_from_json, attributes_to_json,
};

/// The state file persisted by a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of the tool that last wrote this state
    pub tool_version: String,
    /// Tracked objects, in the order they were first applied
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and stamp the tool version before a write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == id.resource_type && r.name == id.name)
    }

    /// Add or replace the entry for a refreshed or applied object
    ///
    /// A state that no longer exists removes the entry instead.
    pub fn record(&mut self, state: &State) {
        if !state.exists {
            self.remove_resource(&state.id);
            return;
        }

        let entry = ResourceState::from_state(state);
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == entry.resource_type && r.name == entry.name)
        {
            Some(existing) => *existing = entry,
            None => self.resources.push(entry),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == id.resource_type && r.name == id.name)?;
        Some(self.resources.remove(pos))
    }

    /// Tracked objects as core states
    pub fn states(&self) -> Vec<State> {
        self.resources.iter().map(ResourceState::to_state).collect()
    }

    /// Tracked object addresses (`type.name`)
    pub fn addresses(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.id().to_string()).collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted state of a single managed object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "application", "config_mail")
    pub resource_type: String,
    /// Manifest name of the object
    pub name: String,
    /// Server-side identifier used to refresh the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// All attributes of the object as JSON values
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            identifier: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn from_state(state: &State) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier: state.identifier.clone(),
            attributes: attributes_to_json(&state.attributes),
        }
    }

    pub fn to_state(&self) -> State {
        let state = State::existing(self.id(), attributes_from_json(&self.attributes));
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier),
            None => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sonatypeiq_core::resource::Value;

    fn application_state(name: &str, display_name: &str) -> State {
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), Value::string("4bb67dcfc86344e3a483832f8c496419"));
        attrs.insert("name".to_string(), Value::string(display_name));
        State::existing(ResourceId::new("application", name), attrs)
            .with_identifier("4bb67dcfc86344e3a483832f8c496419")
    }

    #[test]
    fn new_state_file() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn record_replaces_existing_entry() {
        let mut file = StateFile::new();
        file.record(&application_state("billing", "Billing"));
        file.record(&application_state("billing", "Billing v2"));

        assert_eq!(file.resources.len(), 1);
        assert_eq!(
            file.resources[0].attributes.get("name"),
            Some(&json!("Billing v2"))
        );
        assert_eq!(
            file.resources[0].identifier.as_deref(),
            Some("4bb67dcfc86344e3a483832f8c496419")
        );
    }

    #[test]
    fn recording_a_vanished_object_removes_it() {
        let mut file = StateFile::new();
        file.record(&application_state("billing", "Billing"));
        file.record(&State::not_found(ResourceId::new("application", "billing")));
        assert!(file.resources.is_empty());
    }

    #[test]
    fn remove_resource() {
        let mut file = StateFile::new();
        file.record(&application_state("billing", "Billing"));

        assert!(
            file.remove_resource(&ResourceId::new("application", "billing"))
                .is_some()
        );
        assert!(
            file.remove_resource(&ResourceId::new("application", "other"))
                .is_none()
        );
    }

    #[test]
    fn converts_back_to_core_state() {
        let entry = ResourceState::new("config_mail", "smtp")
            .with_identifier("config_mail")
            .with_attribute("port", json!(465))
            .with_attribute("username", json!(null));

        let state = entry.to_state();
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("config_mail"));
        assert_eq!(state.attributes.get("port"), Some(&Value::Int(465)));
        assert!(!state.attributes.contains_key("username"));
    }

    #[test]
    fn serialization() {
        let mut file = StateFile::new();
        file.record(&application_state("billing", "Billing"));

        let json = serde_json::to_string_pretty(&file).unwrap();
        let deserialized: StateFile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.lineage, file.lineage);
        assert_eq!(deserialized.resources, file.resources);
        assert_eq!(deserialized.addresses(), vec!["application.billing".to_string()]);
    }
}
