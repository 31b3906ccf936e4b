//! Capability traits for the external schema validator.
//!
//! Config and service-shape validation is not implemented here; the engine
//! only assumes two narrow capabilities. A [`Schema`] handle can parse a raw
//! config value into its validated form, and a [`Contract`] handle can vet a
//! service value at registration time. Hosts plug in whatever validator they
//! use; the permissive [`AnySchema`] and [`AnyContract`] implementations
//! accept everything.

use serde_json::Value;
use thiserror::Error;

use crate::service::Service;

/// A validation failure reported by a schema or contract handle.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SchemaViolation {
    message: String,
}

impl SchemaViolation {
    /// Creates a violation with the given description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the violation description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Parses raw config values into their validated form.
///
/// Implementations may normalise the value (fill defaults, coerce types);
/// the engine always feeds the *returned* value to `setup`, never the raw
/// input.
pub trait Schema: Send + Sync {
    /// Validates `value`, returning the (possibly normalised) config.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaViolation`] describing why the value was rejected.
    fn parse(&self, value: &Value) -> Result<Value, SchemaViolation>;
}

/// Validates the shape of a service value at registration time.
pub trait Contract: Send + Sync {
    /// Checks `service` against the contract.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaViolation`] describing the shape mismatch.
    fn validate(&self, service: &dyn Service) -> Result<(), SchemaViolation>;
}

/// A schema that accepts any value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySchema;

impl Schema for AnySchema {
    fn parse(&self, value: &Value) -> Result<Value, SchemaViolation> {
        Ok(value.clone())
    }
}

/// A contract that accepts any service.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyContract;

impl Contract for AnyContract {
    fn validate(&self, _service: &dyn Service) -> Result<(), SchemaViolation> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::service::ServiceFn;

    #[rstest]
    fn any_schema_returns_value_unchanged() {
        let value = json!({"level": "debug", "retries": 3});
        let parsed = AnySchema.parse(&value).expect("parse succeeds");
        assert_eq!(parsed, value);
    }

    #[rstest]
    fn any_contract_accepts_any_service() {
        let service = ServiceFn::new(|_method, _args| Ok(json!(null)));
        assert!(AnyContract.validate(&service).is_ok());
    }

    #[rstest]
    fn violation_preserves_message() {
        let violation = SchemaViolation::new("expected string, got number");
        assert_eq!(violation.message(), "expected string, got number");
        assert_eq!(violation.to_string(), "expected string, got number");
    }
}
