//! The live service registry.
//!
//! Maps instance ids to [`Service`] values for the duration of a run. All
//! mutation happens on the engine's control path during start and stop;
//! uplink servers only read, so the interior lock is a `RwLock` and readers
//! observe at-least-monotonic growth while startup is in flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::CoreError;
use crate::schema::Contract;
use crate::service::Service;

/// Id → service map with uniqueness and optional contract validation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tapestry_core::{AnyContract, ServiceFn, ServiceRegistry};
/// use serde_json::json;
///
/// let registry = ServiceRegistry::new();
/// let clock = Arc::new(ServiceFn::new(|_method, _args| Ok(json!(0))));
/// registry.register("clock", &AnyContract, clock, true).expect("register clock");
/// assert!(registry.has("clock"));
/// assert!(registry.get("missing").is_err());
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<dyn Service>>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under the given id.
    ///
    /// When `validate` is `false` the contract is not consulted; the engine
    /// uses this for worker-backed proxies whose method shapes cannot be
    /// introspected.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateService`] if the id is taken, or
    /// [`CoreError::ContractViolation`] if validation is requested and the
    /// contract rejects the value.
    pub fn register(
        &self,
        service_id: &str,
        contract: &dyn Contract,
        service: Arc<dyn Service>,
        validate: bool,
    ) -> Result<(), CoreError> {
        if validate {
            contract
                .validate(service.as_ref())
                .map_err(|violation| CoreError::ContractViolation {
                    service_id: service_id.to_owned(),
                    reason: violation.to_string(),
                })?;
        }

        let mut services = self
            .services
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if services.contains_key(service_id) {
            return Err(CoreError::duplicate_service(service_id));
        }
        services.insert(service_id.to_owned(), service);
        Ok(())
    }

    /// Registers a host-provided service without contract validation.
    ///
    /// Used to pre-seed the registry with externally supplied services that
    /// instances may wire against without those targets being part of the
    /// plugin graph.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateService`] if the id is taken.
    pub fn register_external(
        &self,
        service_id: &str,
        service: Arc<dyn Service>,
    ) -> Result<(), CoreError> {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if services.contains_key(service_id) {
            return Err(CoreError::duplicate_service(service_id));
        }
        services.insert(service_id.to_owned(), service);
        Ok(())
    }

    /// Fetches the service registered under `service_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownService`] if no such service exists.
    pub fn get(&self, service_id: &str) -> Result<Arc<dyn Service>, CoreError> {
        self.services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(service_id)
            .cloned()
            .ok_or_else(|| CoreError::unknown_service(service_id))
    }

    /// Returns whether a service is registered under `service_id`.
    #[must_use]
    pub fn has(&self, service_id: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(service_id)
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services = self
            .services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f.debug_struct("ServiceRegistry")
            .field("services", &services.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::schema::{AnyContract, SchemaViolation};
    use crate::service::ServiceFn;

    fn noop() -> Arc<dyn Service> {
        Arc::new(ServiceFn::new(|_method, _args| Ok(json!(null))))
    }

    /// A contract that rejects every service.
    struct RejectAll;

    impl Contract for RejectAll {
        fn validate(&self, _service: &dyn Service) -> Result<(), SchemaViolation> {
            Err(SchemaViolation::new("shape mismatch"))
        }
    }

    #[rstest]
    fn register_get_has() {
        let registry = ServiceRegistry::new();
        registry
            .register("logger", &AnyContract, noop(), true)
            .expect("register");

        assert!(registry.has("logger"));
        assert!(registry.get("logger").is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[rstest]
    fn register_rejects_duplicate_id() {
        let registry = ServiceRegistry::new();
        registry
            .register("logger", &AnyContract, noop(), true)
            .expect("first register");
        let err = registry
            .register("logger", &AnyContract, noop(), true)
            .expect_err("duplicate should fail");
        assert!(matches!(err, CoreError::DuplicateService { .. }));
    }

    #[rstest]
    fn contract_violation_blocks_registration() {
        let registry = ServiceRegistry::new();
        let err = registry
            .register("logger", &RejectAll, noop(), true)
            .expect_err("rejected by contract");
        assert!(
            matches!(err, CoreError::ContractViolation { ref reason, .. } if reason.contains("shape mismatch"))
        );
        assert!(!registry.has("logger"));
    }

    #[rstest]
    fn validate_false_skips_the_contract() {
        let registry = ServiceRegistry::new();
        registry
            .register("proxy", &RejectAll, noop(), false)
            .expect("ghost registration skips validation");
        assert!(registry.has("proxy"));
    }

    #[rstest]
    fn get_unknown_service_fails() {
        let registry = ServiceRegistry::new();
        let err = registry.get("ghost").expect_err("unknown service");
        assert!(matches!(err, CoreError::UnknownService { service_id } if service_id == "ghost"));
    }

    #[rstest]
    fn external_registration_skips_validation_but_not_uniqueness() {
        let registry = ServiceRegistry::new();
        registry
            .register_external("ext-logger", noop())
            .expect("external register");
        let err = registry
            .register_external("ext-logger", noop())
            .expect_err("duplicate external");
        assert!(matches!(err, CoreError::DuplicateService { .. }));
    }
}
