//! The start sequence: resolution, validation, setup, and worker spawning.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use tapestry_core::{
    AnyContract, Dependencies, ExecutionMode, Plugin, PluginInstance, Service, SetupOutcome,
};
use tapestry_rpc::{Channel, DownlinkClient, RemoteService, channel_pair};

use crate::context::RegistryContext;
use crate::engine::{ENGINE_TARGET, Orchestrator, StartOptions};
use crate::error::RuntimeError;
use crate::uplink_server::spawn_uplink_server;
use crate::worker::{WorkerBundle, WorkerRecord};

impl Orchestrator {
    /// Starts every registered instance in dependency order.
    ///
    /// For each instance in resolved order: validate the config against the
    /// type's schema, check wiring completeness, then either run `setup`
    /// in-process (main mode) or spawn a worker and register its proxy
    /// (worker mode). The engine does not wait for workers to become ready;
    /// proxy calls queue until they are.
    ///
    /// With `dry_run`, the order is resolved and the wiring diagram logged,
    /// and the engine returns without invoking any setup.
    ///
    /// # Errors
    ///
    /// Cycle, config, wiring, spawn, and setup errors abort startup;
    /// instances already started are torn down in reverse before the error
    /// is returned.
    pub fn start(&mut self, options: StartOptions) -> Result<(), RuntimeError> {
        let order = self.resolve_order()?;

        if options.is_dry_run() {
            info!(
                target: ENGINE_TARGET,
                instances = order.len(),
                order = ?order,
                "dry run; no setup will be invoked"
            );
            info!(target: ENGINE_TARGET, diagram = %self.mermaid(), "wiring diagram");
            return Ok(());
        }

        for instance_id in order {
            if let Err(error) = self.start_instance(&instance_id) {
                warn!(
                    target: ENGINE_TARGET,
                    %instance_id,
                    %error,
                    "startup aborted; tearing down started instances"
                );
                self.teardown_started();
                return Err(error);
            }
            self.started.push(instance_id);
        }
        Ok(())
    }

    /// Brings one instance up.
    fn start_instance(&mut self, instance_id: &str) -> Result<(), RuntimeError> {
        let Some(instance) = self.instances.get(instance_id).cloned() else {
            debug!(target: ENGINE_TARGET, instance_id, "resolver emitted unknown instance; skipping");
            return Ok(());
        };
        let Some(plugin) = self.definitions.get(instance.type_id()).cloned() else {
            debug!(target: ENGINE_TARGET, instance_id, "instance references unregistered type; skipping");
            return Ok(());
        };

        let config = plugin
            .config_schema()
            .parse(instance.config())
            .map_err(|violation| RuntimeError::ConfigInvalid {
                instance_id: instance.id().to_owned(),
                reason: violation.to_string(),
            })?;

        // Wiring completeness holds for both modes: every declared
        // requirement must map to a non-empty target.
        let mut wired = Vec::with_capacity(plugin.requirements().len());
        for requirement in plugin.requirements() {
            match instance.wiring().get(requirement.name()) {
                Some(target) if !target.is_empty() => {
                    wired.push((requirement.name().to_owned(), target.to_owned()));
                }
                _ => {
                    return Err(RuntimeError::WiringMissing {
                        instance_id: instance.id().to_owned(),
                        requirement: requirement.name().to_owned(),
                    });
                }
            }
        }

        match instance.mode() {
            ExecutionMode::Main => self.start_local(&plugin, &instance, config, &wired),
            ExecutionMode::Worker => self.start_isolated(&plugin, &instance, config),
        }
    }

    /// Runs a main-mode instance's setup in-process.
    fn start_local(
        &mut self,
        plugin: &Arc<dyn Plugin>,
        instance: &PluginInstance,
        config: Value,
        wired: &[(String, String)],
    ) -> Result<(), RuntimeError> {
        let mut deps = Dependencies::new();
        for (requirement, target) in wired {
            deps.insert(requirement.clone(), self.registry.get(target)?);
        }

        debug!(
            target: ENGINE_TARGET,
            instance_id = instance.id(),
            type_id = instance.type_id(),
            "running setup"
        );
        let mut ctx = RegistryContext::new(Arc::clone(&self.registry));
        let outcome = plugin
            .setup(&mut ctx, config, &deps, instance.id())
            .map_err(|source| RuntimeError::SetupFailed {
                instance_id: instance.id().to_owned(),
                source,
            })?;

        if let SetupOutcome::Produced(service) = outcome {
            // A service registered through the context wins over the
            // returned value; only fill the gap when nothing was
            // registered under this id.
            if !self.registry.has(instance.id()) {
                self.registry.register_external(instance.id(), service)?;
            }
        }
        Ok(())
    }

    /// Spawns a worker for an isolated instance and registers its proxy.
    fn start_isolated(
        &mut self,
        plugin: &Arc<dyn Plugin>,
        instance: &PluginInstance,
        config: Value,
    ) -> Result<(), RuntimeError> {
        let Some(entry_point) = plugin.entry_point() else {
            return Err(RuntimeError::MissingEntryPoint {
                instance_id: instance.id().to_owned(),
                type_id: instance.type_id().to_owned(),
            });
        };

        let (downlink_host, downlink_worker) = channel_pair();
        let (uplink_host, uplink_worker) = channel_pair();

        // The uplink server snapshots the wiring at spawn; instances are
        // immutable after registration so the snapshot cannot drift.
        let uplink_host: Arc<dyn Channel> = Arc::new(uplink_host);
        let _uplink_thread = spawn_uplink_server(
            Arc::clone(&uplink_host),
            Arc::clone(&self.registry),
            instance.wiring().clone(),
            instance.id().to_owned(),
        );

        debug!(
            target: ENGINE_TARGET,
            instance_id = instance.id(),
            type_id = instance.type_id(),
            entry_point,
            "spawning worker"
        );
        let bundle = WorkerBundle::new(instance.id(), instance.type_id(), entry_point, config);
        let handle = self
            .spawner
            .spawn(bundle, Box::new(downlink_worker), Box::new(uplink_worker))?;

        let downlink_host: Arc<dyn Channel> = Arc::new(downlink_host);
        let (client, events) =
            DownlinkClient::connect(Arc::clone(&downlink_host), self.config.rpc_timeout());

        // The proxy is a ghost object: no contract validation is possible,
        // and callers may use it before the worker signals readiness.
        let proxy: Arc<dyn Service> = Arc::new(RemoteService::new(client.clone()));
        self.registry
            .register(instance.id(), &AnyContract, proxy, false)?;

        self.workers.insert(
            instance.id().to_owned(),
            WorkerRecord::new(
                instance.id(),
                client,
                events,
                downlink_host,
                uplink_host,
                handle,
            ),
        );
        Ok(())
    }
}
