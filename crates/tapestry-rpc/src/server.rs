//! Worker-side downlink serve loop.

use std::sync::Arc;

use tracing::debug;

use tapestry_core::{Service, ServiceError};

use crate::channel::Channel;
use crate::frame::Frame;

/// Tracing target for the serve loop.
const SERVER_TARGET: &str = "tapestry_rpc::server";

/// Serves `CALL` frames against a service value until teardown.
///
/// Each call is invoked inline and answered with `RESPONSE` or `ERROR`;
/// method names are not filtered, the service implementation is trusted to
/// reject what it does not know. A `TEARDOWN` frame runs `on_teardown`,
/// answers `TEARDOWN_COMPLETE` (carrying the error on failure), and ends
/// the loop. Channel closure ends the loop without running teardown —
/// that is the forced-termination path.
///
/// Instances that expose no service answer every call with an error rather
/// than stalling the caller until its timeout.
pub fn serve(
    channel: &dyn Channel,
    service: Option<&Arc<dyn Service>>,
    on_teardown: impl FnOnce() -> Result<(), ServiceError>,
) {
    let teardown_id = loop {
        match channel.recv() {
            Ok(Frame::Call { id, method, args }) => {
                let reply = match service {
                    Some(service) => service.call(&method, args),
                    None => Err(ServiceError::new(
                        "UnknownService",
                        "this instance exposes no service",
                    )),
                };
                let frame = match reply {
                    Ok(result) => Frame::Response { id, result },
                    Err(error) => Frame::Error { id, error },
                };
                if channel.send(frame).is_err() {
                    break None;
                }
            }
            Ok(Frame::Teardown { id }) => break Some(id),
            Ok(frame) => {
                debug!(target: SERVER_TARGET, ?frame, "ignoring unexpected frame");
            }
            Err(_) => break None,
        }
    };

    if let Some(id) = teardown_id {
        let error = on_teardown().err();
        let _ = channel.send(Frame::TeardownComplete { id, error });
    }
}
