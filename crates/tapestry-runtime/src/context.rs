//! Setup contexts for the host and for workers.

use std::sync::Arc;

use tapestry_core::{CoreError, Service, ServiceRegistry, SetupContext};

/// The host-side context: backed by the engine's live service registry.
pub struct RegistryContext {
    registry: Arc<ServiceRegistry>,
}

impl RegistryContext {
    /// Creates a context over the given registry.
    #[must_use]
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }
}

impl SetupContext for RegistryContext {
    fn register_service(
        &mut self,
        instance_id: &str,
        service: Arc<dyn Service>,
    ) -> Result<(), CoreError> {
        self.registry.register_external(instance_id, service)
    }

    fn get_service(&self, instance_id: &str) -> Result<Arc<dyn Service>, CoreError> {
        self.registry.get(instance_id)
    }
}

/// The worker-side context: captures at most one registered service.
///
/// Workers have no local registry, so `get_service` always fails fast; the
/// captured value (if any) becomes the service the downlink server exposes,
/// taking precedence over a value returned from `setup`.
#[derive(Default)]
pub struct CaptureContext {
    captured: Option<Arc<dyn Service>>,
}

impl CaptureContext {
    /// Creates an empty capture context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the context, yielding the captured service if one was
    /// registered.
    #[must_use]
    pub fn into_captured(self) -> Option<Arc<dyn Service>> {
        self.captured
    }
}

impl SetupContext for CaptureContext {
    fn register_service(
        &mut self,
        instance_id: &str,
        service: Arc<dyn Service>,
    ) -> Result<(), CoreError> {
        if self.captured.is_some() {
            return Err(CoreError::duplicate_service(instance_id));
        }
        self.captured = Some(service);
        Ok(())
    }

    fn get_service(&self, instance_id: &str) -> Result<Arc<dyn Service>, CoreError> {
        Err(CoreError::unknown_service(instance_id))
    }
}
