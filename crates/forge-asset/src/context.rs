//! Generation context: injected services and cancellation

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::GenerateError;

/// Type map of collaborators available to generators
///
/// Services are looked up by concrete type. Trait-object services are
/// registered as `Arc<dyn Trait>`:
///
/// ```rust,ignore
/// let services = Services::new()
///     .with::<Arc<dyn ReleaseResolver>>(Arc::new(StaticReleaseResolver::new(spec)));
/// let resolver = ctx.service::<Arc<dyn ReleaseResolver>>()?;
/// ```
#[derive(Clone, Default)]
pub struct Services {
    inner: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    /// Empty service map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    /// Insert or replace the service of type `T`
    pub fn insert<T: Any + Send + Sync>(&mut self, service: T) {
        self.inner.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Look up the service of type `T`
    ///
    /// # Errors
    /// Returns [`GenerateError::MissingService`] if none was registered.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<&T, GenerateError> {
        self.inner
            .get(&TypeId::of::<T>())
            .and_then(|service| service.downcast_ref::<T>())
            .ok_or(GenerateError::MissingService(type_name::<T>()))
    }

    /// Whether a service of type `T` is registered
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.inner.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered services
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no service is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.inner.len())
            .finish()
    }
}

/// Everything a generator may reach besides its parents
///
/// Cheap to clone; the store hands the same context to every `generate`.
#[derive(Debug, Clone, Default)]
pub struct GenerateContext {
    services: Arc<Services>,
    cancel: CancellationToken,
}

impl GenerateContext {
    /// Context over the given services with a fresh cancellation token
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Injected services
    #[inline]
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Shorthand for `services().get::<T>()`
    ///
    /// # Errors
    /// Returns [`GenerateError::MissingService`] if none was registered.
    #[inline]
    pub fn service<T: Any + Send + Sync>(&self) -> Result<&T, GenerateError> {
        self.services.get::<T>()
    }

    /// Cancellation token shared with the store
    #[inline]
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with [`GenerateError::Cancelled`] if cancellation was requested
    ///
    /// # Errors
    /// Returns [`GenerateError::Cancelled`] once the token fired.
    pub fn ensure_active(&self) -> Result<(), GenerateError> {
        if self.cancel.is_cancelled() {
            Err(GenerateError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn services_lookup_by_type() {
        let services = Services::new().with(42_u32).with(String::from("forge"));
        assert_eq!(*services.get::<u32>().unwrap(), 42);
        assert_eq!(services.get::<String>().unwrap(), "forge");
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn trait_object_services() {
        let services = Services::new().with::<Arc<dyn Greeter>>(Arc::new(English));
        let greeter = services.get::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn missing_service_names_type() {
        let services = Services::new();
        let err = services.get::<u64>().unwrap_err();
        assert!(matches!(err, GenerateError::MissingService(name) if name.contains("u64")));
    }

    #[test]
    fn context_reports_cancellation() {
        let token = CancellationToken::new();
        let ctx = GenerateContext::new(Services::new()).with_cancellation(token.clone());
        assert!(ctx.ensure_active().is_ok());
        token.cancel();
        assert!(matches!(ctx.ensure_active(), Err(GenerateError::Cancelled)));
    }
}
