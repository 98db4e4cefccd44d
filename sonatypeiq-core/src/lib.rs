//! sonatypeiq core
//!
//! Provider-neutral model for declaratively managing IQ Server objects:
//! values, schemas, manifests, diffs and plans that treat side effects as values

pub mod binding;
pub mod differ;
pub mod effect;
pub mod interpreter;
pub mod manifest;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
