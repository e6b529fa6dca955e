//! Named dependency container
//!
//! Three namespaces, searched in priority order on every lookup:
//! singletons, then services, then factories. Factories run on each `get`.
//! Values are stored type-erased and downcast on retrieval, so a lookup
//! names both the dependency and the type it expects back.
//!
//! ```rust
//! use std::sync::Arc;
//! use waav_agent::container::DependencyContainer;
//!
//! let container = DependencyContainer::new();
//! container.register_singleton("greeting", Arc::new(String::from("hello")));
//! let greeting: Arc<String> = container.get("greeting").unwrap();
//! assert_eq!(greeting.as_str(), "hello");
//! ```

use parking_lot::RwLock;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::DependencyError;

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;

#[derive(Default)]
struct Namespaces {
    singletons: HashMap<String, Instance>,
    services: HashMap<String, Instance>,
    factories: HashMap<String, Factory>,
}

/// Holds named singletons, services and factories
///
/// The container owns no domain data; it only hands out shared handles.
#[derive(Default)]
pub struct DependencyContainer {
    inner: RwLock<Namespaces>,
}

enum Resolved {
    Instance(Instance),
    Factory(Factory),
}

impl DependencyContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_singleton<T: Any + Send + Sync>(&self, name: impl Into<String>, instance: Arc<T>) {
        let name = name.into();
        tracing::debug!(name = %name, "Singleton registered");
        self.inner.write().singletons.insert(name, instance);
    }

    pub fn register_service<T: Any + Send + Sync>(&self, name: impl Into<String>, service: Arc<T>) {
        let name = name.into();
        tracing::debug!(name = %name, "Service registered");
        self.inner.write().services.insert(name, service);
    }

    /// Register a factory that is invoked on every lookup of `name`
    pub fn register_factory<T, F>(&self, name: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let name = name.into();
        let erased: Factory = Arc::new(move || -> Instance { factory() });
        tracing::debug!(name = %name, "Factory registered");
        self.inner.write().factories.insert(name, erased);
    }

    fn resolve(&self, name: &str) -> Option<Resolved> {
        let inner = self.inner.read();
        if let Some(instance) = inner.singletons.get(name) {
            return Some(Resolved::Instance(instance.clone()));
        }
        if let Some(service) = inner.services.get(name) {
            return Some(Resolved::Instance(service.clone()));
        }
        inner
            .factories
            .get(name)
            .map(|factory| Resolved::Factory(factory.clone()))
    }

    /// Look up `name` and downcast it to `T`
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, DependencyError> {
        let instance = match self.resolve(name) {
            Some(Resolved::Instance(instance)) => instance,
            // Lock released before running user code
            Some(Resolved::Factory(factory)) => {
                tracing::debug!(name = %name, "Instance created via factory");
                factory()
            }
            None => return Err(DependencyError::NotFound(name.to_string())),
        };

        instance
            .downcast::<T>()
            .map_err(|_| DependencyError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Like [`get`](Self::get), but `None` instead of an error
    pub fn get_optional<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.get(name) {
            Ok(value) => Some(value),
            Err(DependencyError::NotFound(_)) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Optional dependency has an unexpected type");
                None
            }
        }
    }

    /// Whether `name` exists in any namespace
    pub fn is_registered(&self, name: &str) -> bool {
        let inner = self.inner.read();
        inner.singletons.contains_key(name)
            || inner.services.contains_key(name)
            || inner.factories.contains_key(name)
    }

    /// Empty all three namespaces
    pub fn clear(&self) {
        *self.inner.write() = Namespaces::default();
        tracing::info!("Dependency container cleared");
    }
}
