//! Shared fixtures for the engine integration suites: a thread-safe event
//! log and the logger/database/api plugin types used across scenarios.

// Each suite compiles its own copy; not every suite uses every fixture.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once, PoisonError};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

use tapestry_core::{
    AnyContract, AnySchema, Dependencies, Plugin, Requirement, Schema, Service, ServiceError,
    ServiceFn, SetupContext, SetupOutcome,
};

static TRACING: Once = Once::new();

/// Installs a test-writer tracing subscriber honouring `RUST_LOG`.
/// Idempotent across suites and threads.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Entry point under which the database type is published for workers.
pub const DATABASE_MODULE: &str = "modules/database";

/// Entry point for the type whose setup always fails.
pub const FLAKY_MODULE: &str = "modules/flaky";

/// Shared, thread-safe event recorder.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of occurrences of an exact event.
    pub fn count_of(&self, event: &str) -> usize {
        self.events().iter().filter(|seen| *seen == event).count()
    }

    /// Position of the first occurrence of an exact event.
    pub fn position_of(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|seen| seen == event)
    }
}

fn first_text(args: &[Value]) -> String {
    args.first()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Type `logger`: no requirements, produces an `info` service that records
/// every message.
pub struct LoggerPlugin {
    log: EventLog,
    schema: AnySchema,
}

impl LoggerPlugin {
    pub fn shared(log: &EventLog) -> Arc<dyn Plugin> {
        Arc::new(Self {
            log: log.clone(),
            schema: AnySchema,
        })
    }
}

impl Plugin for LoggerPlugin {
    fn id(&self) -> &str {
        "logger"
    }

    fn config_schema(&self) -> &dyn Schema {
        &self.schema
    }

    fn setup(
        &self,
        _ctx: &mut dyn SetupContext,
        _config: Value,
        _deps: &Dependencies,
        instance_id: &str,
    ) -> Result<SetupOutcome, ServiceError> {
        self.log.push(format!("setup:{instance_id}"));
        let log = self.log.clone();
        let service: Arc<dyn Service> = Arc::new(ServiceFn::new(move |method, args| match method {
            "info" => {
                log.push(format!("logger.info:{}", first_text(&args)));
                Ok(json!(null))
            }
            other => Err(ServiceError::unknown_method(other)),
        }));
        Ok(SetupOutcome::Produced(service))
    }

    fn teardown(&self, instance_id: &str) -> Result<(), ServiceError> {
        self.log.push(format!("teardown:{instance_id}"));
        Ok(())
    }
}

/// Type `database`: requires `logger`, publishable as a worker module,
/// produces a `query` service. Optional delays make setup and teardown
/// observable for readiness and escalation tests.
pub struct DatabasePlugin {
    log: EventLog,
    schema: AnySchema,
    requirements: Vec<Requirement>,
    setup_delay: Duration,
    teardown_delay: Duration,
}

impl DatabasePlugin {
    pub fn shared(log: &EventLog) -> Arc<dyn Plugin> {
        Self::with_delays(log, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_delays(
        log: &EventLog,
        setup_delay: Duration,
        teardown_delay: Duration,
    ) -> Arc<dyn Plugin> {
        Arc::new(Self {
            log: log.clone(),
            schema: AnySchema,
            requirements: vec![Requirement::new("logger", Arc::new(AnyContract))],
            setup_delay,
            teardown_delay,
        })
    }
}

impl Plugin for DatabasePlugin {
    fn id(&self) -> &str {
        "database"
    }

    fn config_schema(&self) -> &dyn Schema {
        &self.schema
    }

    fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    fn entry_point(&self) -> Option<&str> {
        Some(DATABASE_MODULE)
    }

    fn setup(
        &self,
        _ctx: &mut dyn SetupContext,
        _config: Value,
        deps: &Dependencies,
        instance_id: &str,
    ) -> Result<SetupOutcome, ServiceError> {
        if !self.setup_delay.is_zero() {
            thread::sleep(self.setup_delay);
        }
        self.log.push(format!("setup:{instance_id}"));
        deps.require("logger")?
            .call("info", vec![json!("database started")])?;

        let log = self.log.clone();
        let service: Arc<dyn Service> = Arc::new(ServiceFn::new(move |method, args| match method {
            "query" => {
                log.push(format!("db.query:{}", first_text(&args)));
                Ok(json!([{ "one": 1 }]))
            }
            "slow" => {
                thread::sleep(Duration::from_millis(500));
                Ok(json!(null))
            }
            other => Err(ServiceError::unknown_method(other)),
        }));
        Ok(SetupOutcome::Produced(service))
    }

    fn teardown(&self, instance_id: &str) -> Result<(), ServiceError> {
        if !self.teardown_delay.is_zero() {
            thread::sleep(self.teardown_delay);
        }
        self.log.push(format!("teardown:{instance_id}"));
        Ok(())
    }
}

/// Type `api`: requires `logger` and `db`, queries the database during
/// setup.
pub struct ApiPlugin {
    log: EventLog,
    schema: AnySchema,
    requirements: Vec<Requirement>,
}

impl ApiPlugin {
    pub fn shared(log: &EventLog) -> Arc<dyn Plugin> {
        Arc::new(Self {
            log: log.clone(),
            schema: AnySchema,
            requirements: vec![
                Requirement::new("logger", Arc::new(AnyContract)),
                Requirement::new("db", Arc::new(AnyContract)),
            ],
        })
    }
}

impl Plugin for ApiPlugin {
    fn id(&self) -> &str {
        "api"
    }

    fn config_schema(&self) -> &dyn Schema {
        &self.schema
    }

    fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    fn setup(
        &self,
        _ctx: &mut dyn SetupContext,
        _config: Value,
        deps: &Dependencies,
        instance_id: &str,
    ) -> Result<SetupOutcome, ServiceError> {
        self.log.push(format!("setup:{instance_id}"));
        deps.require("db")?.call("query", vec![json!("SELECT 1")])?;
        deps.require("logger")?
            .call("info", vec![json!("api started")])?;

        let service: Arc<dyn Service> = Arc::new(ServiceFn::new(|method, _args| match method {
            "status" => Ok(json!("ok")),
            other => Err(ServiceError::unknown_method(other)),
        }));
        Ok(SetupOutcome::Produced(service))
    }

    fn teardown(&self, instance_id: &str) -> Result<(), ServiceError> {
        self.log.push(format!("teardown:{instance_id}"));
        Ok(())
    }
}

/// A minimal type with a configurable id and requirement names; exposes no
/// service. Used to build cycles and wiring defects.
pub struct NodePlugin {
    id: String,
    schema: AnySchema,
    requirements: Vec<Requirement>,
}

impl NodePlugin {
    pub fn shared(id: &str, requirements: &[&str]) -> Arc<dyn Plugin> {
        Arc::new(Self {
            id: id.to_owned(),
            schema: AnySchema,
            requirements: requirements
                .iter()
                .map(|name| Requirement::new(*name, Arc::new(AnyContract)))
                .collect(),
        })
    }
}

impl Plugin for NodePlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn config_schema(&self) -> &dyn Schema {
        &self.schema
    }

    fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    fn setup(
        &self,
        _ctx: &mut dyn SetupContext,
        _config: Value,
        _deps: &Dependencies,
        _instance_id: &str,
    ) -> Result<SetupOutcome, ServiceError> {
        Ok(SetupOutcome::NoService)
    }
}

/// Type `flaky`: a worker module whose setup always fails, standing in for
/// a crashing worker.
pub struct FlakyPlugin {
    schema: AnySchema,
}

impl FlakyPlugin {
    pub fn shared() -> Arc<dyn Plugin> {
        Arc::new(Self { schema: AnySchema })
    }
}

impl Plugin for FlakyPlugin {
    fn id(&self) -> &str {
        "flaky"
    }

    fn config_schema(&self) -> &dyn Schema {
        &self.schema
    }

    fn entry_point(&self) -> Option<&str> {
        Some(FLAKY_MODULE)
    }

    fn setup(
        &self,
        _ctx: &mut dyn SetupContext,
        _config: Value,
        _deps: &Dependencies,
        _instance_id: &str,
    ) -> Result<SetupOutcome, ServiceError> {
        Err(ServiceError::new("SetupFailed", "simulated crash"))
    }
}
