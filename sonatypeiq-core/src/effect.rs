//! Effect - A side effect expressed as a value
//!
//! Effects describe what should happen to a resource. Nothing is executed
//! until an Interpreter runs them against a Provider.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Read a data source
    Read(Resource),
    Create(Resource),
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Delete the existing object, then create it again
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    Delete(State),
}

impl Effect {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(r) | Effect::Create(r) => &r.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } => id,
            Effect::Delete(state) => &state.id,
        }
    }

    /// Whether this Effect changes anything on the server
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    /// One-character marker used in plan output
    pub fn symbol(&self) -> &'static str {
        match self {
            Effect::Read(_) => "<=",
            Effect::Create(_) => "+",
            Effect::Update { .. } => "~",
            Effect::Replace { .. } => "-/+",
            Effect::Delete(_) => "-",
        }
    }
}
