//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific server (IQ Server).
//! It is responsible for converting Effects into actual API calls.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Diagnostic, Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Render as an error diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string(), "")
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource (or data source) types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Type name (e.g., "application")
    fn name(&self) -> &'static str;

    /// Attribute schema for this type
    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
    }
}

/// Main Provider trait
///
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "sonatypeiq")
    fn name(&self) -> &'static str;

    /// Managed resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Data source types this Provider can read
    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        Vec::new()
    }

    /// Refresh a previously stored state
    ///
    /// Returns `State::not_found()` if the object vanished on the server.
    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource, returning any warnings raised on the way
    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<Vec<Diagnostic>>>;

    /// Adopt an existing server object identified by `import_id`
    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let import_id = import_id.to_string();
        Box::pin(async move {
            Err(ProviderError::new(format!(
                "Import is not supported (identifier '{}')",
                import_id
            ))
            .for_resource(id))
        })
    }

    /// Read a data source
    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let id = resource.id.clone();
        Box::pin(async move {
            Err(ProviderError::new(format!("Unknown data source type: {}", id.resource_type))
                .for_resource(id))
        })
    }

    /// Schema of a managed resource type
    fn resource_schema(&self, resource_type: &str) -> Option<ResourceSchema> {
        self.resource_types()
            .into_iter()
            .find(|t| t.name() == resource_type)
            .map(|t| t.schema())
    }

    /// Schema of a data source type
    fn data_source_schema(&self, data_source_type: &str) -> Option<ResourceSchema> {
        self.data_source_types()
            .into_iter()
            .find(|t| t.name() == data_source_type)
            .map(|t| t.schema())
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).data_source_types()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(current)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, from, to)
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<Vec<Diagnostic>>> {
        (**self).delete(current)
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, import_id)
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read_data_source(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
            let id = current.id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let attrs = to.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs)) })
        }

        fn delete(&self, _current: &State) -> BoxFuture<'_, ProviderResult<Vec<Diagnostic>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[tokio::test]
    async fn mock_provider_read_returns_not_found() {
        let provider = MockProvider;
        let current = State::existing(ResourceId::new("test", "example"), Default::default());
        let state = provider.read(&current).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn mock_provider_create_returns_existing() {
        let provider = MockProvider;
        let resource = Resource::new("test", "example");
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock-id-123".to_string()));
    }

    #[tokio::test]
    async fn default_import_is_unsupported() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        let err = provider
            .import(&ResourceId::new("test", "example"), "abc")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[test.example] Import is not supported (identifier 'abc')"
        );
    }
}
