//! Data model and registries for the Tapestry plugin orchestration runtime.
//!
//! The `tapestry-core` crate defines the vocabulary the rest of the workspace
//! speaks: plugin *types* (a [`Plugin`] implementation describing a config
//! schema, named requirements, and lifecycle hooks), plugin *instances*
//! (a [`PluginInstance`] wiring a type to concrete dependency targets), and
//! the three registries the engine consults at start time:
//!
//! - [`DefinitionStore`] holds plugin types and enforces the one-way
//!   registration lock.
//! - [`InstanceStore`] holds configured instances in registration order so
//!   dependency resolution stays deterministic.
//! - [`ServiceRegistry`] maps instance ids to live [`Service`] values during
//!   a run, with optional contract validation at registration.
//!
//! Validation of config values and service shapes is delegated to an external
//! validator reached through the narrow [`Schema`] and [`Contract`]
//! capability traits; the crate ships permissive implementations for hosts
//! that do not validate.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tapestry_core::{AnyContract, ServiceFn, ServiceRegistry};
//! use serde_json::json;
//!
//! let registry = ServiceRegistry::new();
//! let greeter = Arc::new(ServiceFn::new(|method, _args| Ok(json!(format!("hello from {method}")))));
//! registry.register("greeter", &AnyContract, greeter, true).expect("registration succeeds");
//! assert!(registry.has("greeter"));
//! ```

pub mod definition;
pub mod error;
pub mod instance;
pub mod registry;
pub mod schema;
pub mod service;
pub mod stores;

pub use self::definition::{Dependencies, Plugin, Requirement, SetupContext, SetupOutcome};
pub use self::error::CoreError;
pub use self::instance::{ExecutionMode, PluginInstance, Wiring};
pub use self::registry::ServiceRegistry;
pub use self::schema::{AnyContract, AnySchema, Contract, Schema, SchemaViolation};
pub use self::service::{Service, ServiceError, ServiceFn};
pub use self::stores::{DefinitionStore, InstanceStore};
