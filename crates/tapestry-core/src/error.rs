//! Structural errors raised by the stores and the service registry.
//!
//! All errors use `thiserror`-derived enums with structured context so
//! callers can inspect the failure programmatically rather than matching on
//! message text.

use thiserror::Error;

use crate::service::ServiceError;

/// Errors arising from registration and lookup operations.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// The definition store has been locked against further registration.
    #[error("definition store is locked; cannot register type '{type_id}'")]
    RegistryLocked {
        /// Type id whose registration was refused.
        type_id: String,
    },

    /// A plugin type with the same id is already registered.
    #[error("plugin type '{type_id}' is already registered")]
    DuplicateType {
        /// The contested type id.
        type_id: String,
    },

    /// A plugin instance with the same id is already registered.
    #[error("plugin instance '{instance_id}' is already registered")]
    DuplicateInstance {
        /// The contested instance id.
        instance_id: String,
    },

    /// An instance references a type id that is not in the definition store.
    #[error("plugin instance '{instance_id}' references unknown type '{type_id}'")]
    UnknownType {
        /// Instance whose registration failed.
        instance_id: String,
        /// The missing type id.
        type_id: String,
    },

    /// A service with the same id is already registered.
    #[error("service '{service_id}' is already registered")]
    DuplicateService {
        /// The contested service id.
        service_id: String,
    },

    /// No service is registered under the requested id.
    #[error("no service registered under '{service_id}'")]
    UnknownService {
        /// The id that was looked up.
        service_id: String,
    },

    /// A service value failed validation against its contract.
    #[error("service '{service_id}' violates its contract: {reason}")]
    ContractViolation {
        /// The service being registered.
        service_id: String,
        /// Description of the violation from the validator.
        reason: String,
    },

    /// A wiring map declares the same requirement name twice.
    #[error("wiring declares requirement '{requirement}' more than once")]
    DuplicateWiring {
        /// The repeated requirement name.
        requirement: String,
    },
}

impl CoreError {
    /// Creates an `UnknownService` error.
    #[must_use]
    pub fn unknown_service(service_id: impl Into<String>) -> Self {
        Self::UnknownService {
            service_id: service_id.into(),
        }
    }

    /// Creates a `DuplicateService` error.
    #[must_use]
    pub fn duplicate_service(service_id: impl Into<String>) -> Self {
        Self::DuplicateService {
            service_id: service_id.into(),
        }
    }

    /// Returns the stable kind name of this error.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegistryLocked { .. } => "RegistryLocked",
            Self::DuplicateType { .. } => "DuplicateType",
            Self::DuplicateInstance { .. } => "DuplicateInstance",
            Self::UnknownType { .. } => "UnknownType",
            Self::DuplicateService { .. } => "DuplicateService",
            Self::UnknownService { .. } => "UnknownService",
            Self::ContractViolation { .. } => "ContractViolation",
            Self::DuplicateWiring { .. } => "DuplicateWiring",
        }
    }
}

impl From<CoreError> for ServiceError {
    /// Flattens a registry failure into the uniform service error shape so
    /// setup hooks can propagate context operations with `?`.
    fn from(error: CoreError) -> Self {
        ServiceError::new(error.name(), error.to_string())
    }
}
