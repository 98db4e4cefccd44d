//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in the manifest with the "current state"
//! refreshed through the Provider, and generates a list of required Effects (Plan).

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists and a changed attribute cannot be updated in place
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let replace = schema.is_some_and(|s| changed.iter().any(|name| s.forces_replacement(name)));
    if replace {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    // Optional attributes the user removed from the manifest
    if let Some(schema) = schema {
        for (key, attr) in &schema.attributes {
            if !attr.computed && !desired.contains_key(key) && current.contains_key(key) {
                changed.push(key.clone());
            }
        }
    }

    changed.sort();
    changed
}

/// Compute Diff for multiple resources and generate a Plan
///
/// `orphans` are objects tracked in state that no longer appear in the
/// manifest; they are deleted first, in reverse order of tracking.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
    orphans: &[State],
) -> Plan {
    let mut plan = Plan::new();

    for orphan in orphans.iter().rev() {
        if orphan.exists {
            plan.add(Effect::Delete(orphan.clone()));
        }
    }

    for resource in desired {
        if resource.is_data_source() {
            continue;
        }

        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let d = diff(
            resource,
            &current,
            schemas.get(&resource.id.resource_type),
        );

        match d {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::Replace {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Replace {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType};

    fn membership_schema() -> ResourceSchema {
        ResourceSchema::new("application_role_membership")
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("role_id", AttributeType::String)
                    .required()
                    .requires_replace(),
            )
            .attribute(AttributeSchema::new("user_name", AttributeType::String).requires_replace())
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("application", "test");
        let current = State::not_found(ResourceId::new("application", "test"));

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired = Resource::new("application", "test")
            .with_attribute("name", Value::string("Billing"));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::string("Billing"));
        attrs.insert("id".to_string(), Value::string("abc123"));
        let current = State::existing(ResourceId::new("application", "test"), attrs);

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired = Resource::new("application", "test")
            .with_attribute("name", Value::string("Billing v2"));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::string("Billing"));
        let current = State::existing(ResourceId::new("application", "test"), attrs);

        let result = diff(&desired, &current, None);
        match result {
            Diff::Update {
                changed_attributes, ..
            } => {
                assert_eq!(changed_attributes, vec!["name".to_string()]);
            }
            _ => panic!("Expected Update"),
        }
    }

    #[test]
    fn diff_replace_when_attribute_forces_it() {
        let schema = membership_schema();
        let desired = Resource::new("application_role_membership", "dev")
            .with_attribute("role_id", Value::string("role-2"))
            .with_attribute("user_name", Value::string("alice"));

        let mut attrs = HashMap::new();
        attrs.insert("role_id".to_string(), Value::string("role-1"));
        attrs.insert("user_name".to_string(), Value::string("alice"));
        attrs.insert("id".to_string(), Value::string("app_role-1_user_alice"));
        let current = State::existing(desired.id.clone(), attrs);

        let result = diff(&desired, &current, Some(&schema));
        assert!(matches!(result, Diff::Replace { .. }));
    }

    #[test]
    fn removed_optional_attribute_is_a_change() {
        let schema = membership_schema();
        let desired = Resource::new("application_role_membership", "dev")
            .with_attribute("role_id", Value::string("role-1"));

        let mut attrs = HashMap::new();
        attrs.insert("role_id".to_string(), Value::string("role-1"));
        attrs.insert("user_name".to_string(), Value::string("alice"));
        attrs.insert("id".to_string(), Value::string("x"));
        let current = State::existing(desired.id.clone(), attrs);

        match diff(&desired, &current, Some(&schema)) {
            Diff::Replace {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["user_name".to_string()]),
            other => panic!("Expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn create_plan_from_resources() {
        let resources = vec![
            Resource::new("application", "new-app"),
            Resource::new("application", "existing-app")
                .with_attribute("name", Value::string("Renamed")),
            Resource::new("role", "dev").with_read_only(true),
        ];

        let mut current_states = HashMap::new();
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::string("Original"));
        current_states.insert(
            ResourceId::new("application", "existing-app"),
            State::existing(ResourceId::new("application", "existing-app"), attrs),
        );

        let orphan = State::existing(ResourceId::new("user", "bob"), HashMap::new());

        let plan = create_plan(&resources, &current_states, &HashMap::new(), &[orphan]);

        assert_eq!(plan.effects().len(), 3);
        assert!(matches!(plan.effects()[0], Effect::Delete(_)));
        assert!(matches!(plan.effects()[1], Effect::Create(_)));
        assert!(matches!(plan.effects()[2], Effect::Update { .. }));
    }
}
