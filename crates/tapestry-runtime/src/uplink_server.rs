//! Host-side uplink server: answers a worker's dependency calls.

use std::sync::Arc;
use std::thread;

use serde_json::Value;
use tracing::debug;

use tapestry_core::{ServiceError, ServiceRegistry, Wiring};
use tapestry_rpc::{Channel, Frame};

/// Tracing target for uplink server operations.
const UPLINK_SERVER_TARGET: &str = "tapestry_runtime::uplink_server";

/// Starts the uplink server for one worker on its own thread.
///
/// The server holds a snapshot of the owning instance's wiring and a handle
/// to the live registry, and is stateless beyond that. It exits when the
/// channel closes. The returned handle is detached by callers; the thread
/// cannot outlive `stop()` because forced termination closes the channel.
pub(crate) fn spawn_uplink_server(
    channel: Arc<dyn Channel>,
    registry: Arc<ServiceRegistry>,
    wiring: Wiring,
    instance_id: String,
) -> thread::JoinHandle<()> {
    thread::spawn(move || serve_uplink(&*channel, &registry, &wiring, &instance_id))
}

/// Routes `UPLINK_CALL` frames until the channel closes.
fn serve_uplink(
    channel: &dyn Channel,
    registry: &ServiceRegistry,
    wiring: &Wiring,
    instance_id: &str,
) {
    loop {
        match channel.recv() {
            Ok(Frame::UplinkCall {
                id,
                service_name,
                method,
                args,
            }) => {
                debug!(
                    target: UPLINK_SERVER_TARGET,
                    instance_id,
                    id,
                    %service_name,
                    %method,
                    "routing uplink call"
                );
                let frame = match invoke(registry, wiring, &service_name, &method, args) {
                    Ok(result) => Frame::UplinkResponse { id, result },
                    Err(error) => Frame::UplinkError { id, error },
                };
                if channel.send(frame).is_err() {
                    break;
                }
            }
            Ok(frame) => {
                debug!(target: UPLINK_SERVER_TARGET, instance_id, ?frame, "ignoring unexpected frame");
            }
            Err(_) => break,
        }
    }
}

/// Resolves a requirement name through the wiring and invokes the backing
/// service.
fn invoke(
    registry: &ServiceRegistry,
    wiring: &Wiring,
    service_name: &str,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, ServiceError> {
    let Some(target) = wiring.get(service_name) else {
        return Err(ServiceError::new(
            "WiringMissing",
            format!("wiring missing for '{service_name}'"),
        ));
    };
    let service = registry
        .get(target)
        .map_err(|error| ServiceError::new("UnknownService", error.to_string()))?;
    service.call(method, args)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use serde_json::json;

    use tapestry_core::ServiceFn;
    use tapestry_rpc::channel_pair;

    use super::*;

    fn registry_with_logger() -> Arc<ServiceRegistry> {
        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register_external(
                "sys-logger",
                Arc::new(ServiceFn::new(|method, args| match method {
                    "info" => Ok(json!({ "logged": args })),
                    other => Err(ServiceError::unknown_method(other)),
                })),
            )
            .expect("seed logger");
        registry
    }

    #[rstest]
    fn resolves_requirement_names_through_the_wiring() {
        let registry = registry_with_logger();
        let wiring = Wiring::from_pairs([("logger", "sys-logger")]).expect("wiring");
        let (host_end, worker_end) = channel_pair();
        let _server = spawn_uplink_server(Arc::new(host_end), registry, wiring, "db".into());

        worker_end
            .send(Frame::UplinkCall {
                id: 1,
                service_name: "logger".into(),
                method: "info".into(),
                args: vec![json!("database started")],
            })
            .expect("send uplink call");

        let Ok(Frame::UplinkResponse { id: 1, result }) = worker_end.recv() else {
            panic!("expected an uplink response");
        };
        assert_eq!(result, json!({ "logged": ["database started"] }));
        worker_end.close();
    }

    #[rstest]
    fn absent_wiring_answers_with_wiring_missing() {
        let registry = registry_with_logger();
        let (host_end, worker_end) = channel_pair();
        let _server =
            spawn_uplink_server(Arc::new(host_end), registry, Wiring::new(), "db".into());

        worker_end
            .send(Frame::UplinkCall {
                id: 7,
                service_name: "metrics".into(),
                method: "observe".into(),
                args: vec![],
            })
            .expect("send uplink call");

        let Ok(Frame::UplinkError { id: 7, error }) = worker_end.recv() else {
            panic!("expected an uplink error");
        };
        assert_eq!(error.name(), "WiringMissing");
        assert!(error.message().contains("metrics"));
        worker_end.close();
    }

    #[rstest]
    fn unknown_target_answers_with_unknown_service() {
        let registry = Arc::new(ServiceRegistry::new());
        let wiring = Wiring::from_pairs([("logger", "ghost")]).expect("wiring");
        let (host_end, worker_end) = channel_pair();
        let _server = spawn_uplink_server(Arc::new(host_end), registry, wiring, "db".into());

        worker_end
            .send(Frame::UplinkCall {
                id: 2,
                service_name: "logger".into(),
                method: "info".into(),
                args: vec![],
            })
            .expect("send uplink call");

        let Ok(Frame::UplinkError { id: 2, error }) = worker_end.recv() else {
            panic!("expected an uplink error");
        };
        assert_eq!(error.name(), "UnknownService");
        worker_end.close();
    }

    #[rstest]
    fn server_thread_exits_when_the_channel_closes() {
        let registry = registry_with_logger();
        let (host_end, worker_end) = channel_pair();
        let server = spawn_uplink_server(
            Arc::new(host_end),
            registry,
            Wiring::new(),
            "db".into(),
        );

        worker_end.close();
        // Join with a grace period: a hung server would fail the test via
        // the harness timeout, but give it a moment to observe closure.
        std::thread::sleep(Duration::from_millis(50));
        assert!(server.is_finished());
        server.join().expect("server thread exits");
    }
}
