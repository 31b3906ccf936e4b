//! The stop sequence: reverse-order teardown with graceful→forced
//! escalation for workers.

use tracing::{debug, info, warn};

use crate::engine::{ENGINE_TARGET, Orchestrator, StopOptions};
use crate::worker::WorkerState;

impl Orchestrator {
    /// Stops every started instance in reverse start order.
    ///
    /// Teardown errors are logged and suppressed so every instance gets a
    /// chance to shut down. Workers are asked to tear down cooperatively
    /// within the configured deadline and forcibly terminated on timeout;
    /// either way the hard terminate runs afterwards to release the
    /// channels and remove the worker record.
    ///
    /// With `dry_run`, the reverse order is logged and nothing is touched.
    pub fn stop(&mut self, options: StopOptions) {
        if options.is_dry_run() {
            match self.resolve_order() {
                Ok(mut order) => {
                    order.reverse();
                    info!(
                        target: ENGINE_TARGET,
                        order = ?order,
                        "dry run; no teardown will be invoked"
                    );
                }
                Err(error) => {
                    warn!(target: ENGINE_TARGET, %error, "dry run could not resolve the graph");
                }
            }
            return;
        }
        self.teardown_started();
    }

    /// Tears down every started instance in reverse order. Shared by
    /// `stop()` and the abort path of `start()`.
    pub(crate) fn teardown_started(&mut self) {
        let order: Vec<String> = self.started.drain(..).rev().collect();
        for instance_id in &order {
            self.stop_instance(instance_id);
        }
    }

    /// Brings one instance down, never propagating its failure.
    fn stop_instance(&mut self, instance_id: &str) {
        if let Some(mut record) = self.workers.remove(instance_id) {
            record.refresh_state();
            if record.state() == WorkerState::Terminated {
                debug!(target: ENGINE_TARGET, instance_id, "worker already terminated");
            } else {
                record.begin_teardown();
                match record.client().teardown(self.config.teardown_timeout()) {
                    Ok(()) => {
                        debug!(target: ENGINE_TARGET, instance_id, "worker tore down cooperatively");
                    }
                    Err(error) => {
                        warn!(
                            target: ENGINE_TARGET,
                            instance_id,
                            %error,
                            "graceful teardown failed; forcing termination"
                        );
                    }
                }
            }
            // Hard terminate on both paths: releases the channels and the
            // record.
            record.force_terminate();
            return;
        }

        let Some(instance) = self.instances.get(instance_id) else {
            return;
        };
        let Some(plugin) = self.definitions.get(instance.type_id()) else {
            return;
        };
        debug!(target: ENGINE_TARGET, instance_id, "running teardown");
        if let Err(error) = plugin.teardown(instance_id) {
            warn!(
                target: ENGINE_TARGET,
                instance_id,
                %error,
                "teardown failed; continuing"
            );
        }
    }
}
