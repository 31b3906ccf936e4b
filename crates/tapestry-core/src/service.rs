//! The dynamically dispatched service surface.
//!
//! A [`Service`] is the runtime value an instance exposes to its consumers.
//! Real objects (main-mode plugins) and RPC proxies (worker-mode plugins)
//! implement the same trait, which is what makes inter-plugin calls
//! location-transparent: a consumer invokes `call(method, args)` without
//! knowing whether the provider lives in-process or behind a channel.
//!
//! [`ServiceError`] is both the local invocation error and the wire error
//! shape: the `{name, message, stack}` fields serialise verbatim into error
//! frames and are reconstructed on the far side.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A callable service value keyed by method name.
pub trait Service: Send + Sync {
    /// Invokes `method` with `args`, returning the result value.
    ///
    /// Method names are not filtered here; implementations decide which
    /// names they answer and should return
    /// [`ServiceError::unknown_method`] for the rest.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] describing the failure.
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ServiceError>;
}

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service").finish_non_exhaustive()
    }
}

/// A service backed by a closure, for adapters and tests.
///
/// # Example
///
/// ```
/// use tapestry_core::{Service, ServiceFn};
/// use serde_json::json;
///
/// let echo = ServiceFn::new(|method, args| Ok(json!({ "method": method, "args": args })));
/// let reply = echo.call("ping", vec![json!(1)]).expect("call succeeds");
/// assert_eq!(reply["method"], "ping");
/// ```
pub struct ServiceFn<F> {
    func: F,
}

impl<F> ServiceFn<F>
where
    F: Fn(&str, Vec<Value>) -> Result<Value, ServiceError> + Send + Sync,
{
    /// Wraps a closure as a service.
    #[must_use]
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Service for ServiceFn<F>
where
    F: Fn(&str, Vec<Value>) -> Result<Value, ServiceError> + Send + Sync,
{
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ServiceError> {
        (self.func)(method, args)
    }
}

/// A structured service invocation failure.
///
/// Travels across channels as `{name, message, stack}`; receivers rebuild a
/// local value preserving all three fields. The shape stays open to additive
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{name}: {message}")]
pub struct ServiceError {
    name: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl ServiceError {
    /// Creates an error with the given name and message.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Attaches a captured stack trace.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Creates the conventional error for an unrecognised method name.
    #[must_use]
    pub fn unknown_method(method: &str) -> Self {
        Self::new("UnknownMethod", format!("no method named '{method}'"))
    }

    /// Returns the error name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the captured stack trace, if any.
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn service_fn_dispatches_to_closure() {
        let adder = ServiceFn::new(|method, args| match method {
            "add" => {
                let sum: i64 = args.iter().filter_map(serde_json::Value::as_i64).sum();
                Ok(json!(sum))
            }
            other => Err(ServiceError::unknown_method(other)),
        });

        assert_eq!(
            adder.call("add", vec![json!(1), json!(2)]).expect("add"),
            json!(3)
        );
        let err = adder.call("mul", vec![]).expect_err("unknown method");
        assert_eq!(err.name(), "UnknownMethod");
        assert!(err.message().contains("mul"));
    }

    #[rstest]
    fn error_serialises_without_empty_stack() {
        let err = ServiceError::new("QueryFailed", "relation does not exist");
        let wire = serde_json::to_value(&err).expect("serialise");
        assert_eq!(
            wire,
            json!({"name": "QueryFailed", "message": "relation does not exist"})
        );
    }

    #[rstest]
    fn error_round_trips_with_stack() {
        let err = ServiceError::new("Boom", "it broke").with_stack("at line 7");
        let wire = serde_json::to_string(&err).expect("serialise");
        let back: ServiceError = serde_json::from_str(&wire).expect("deserialise");
        assert_eq!(back, err);
        assert_eq!(back.stack(), Some("at line 7"));
    }
}
