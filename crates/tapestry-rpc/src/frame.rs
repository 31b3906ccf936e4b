//! Wire frames exchanged over the downlink and uplink channels.
//!
//! Frames are structured values; the in-process channel passes them as-is
//! and byte-oriented transports serialise them. The serde representation
//! pins the exact wire shape: a `kind` discriminator in screaming snake
//! case and camel-cased payload fields, with the error payload as
//! `{name, message, stack?}`. Receivers ignore frames they do not expect
//! and drop unknown correlation ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tapestry_core::ServiceError;

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Frame {
    /// Host → worker: invoke `method` on the worker's service.
    #[serde(rename = "CALL", rename_all = "camelCase")]
    Call {
        /// Correlation id, unique among outstanding requests on the channel.
        id: u64,
        /// Method name to invoke.
        method: String,
        /// Positional arguments.
        args: Vec<Value>,
    },

    /// Worker → host: successful reply to a `CALL`.
    #[serde(rename = "RESPONSE", rename_all = "camelCase")]
    Response {
        /// Correlation id of the originating call.
        id: u64,
        /// The method's return value.
        result: Value,
    },

    /// Worker → host: failed reply to a `CALL`.
    #[serde(rename = "ERROR", rename_all = "camelCase")]
    Error {
        /// Correlation id of the originating call.
        id: u64,
        /// The serialised failure.
        error: ServiceError,
    },

    /// Host → worker: run the user teardown and shut down.
    #[serde(rename = "TEARDOWN", rename_all = "camelCase")]
    Teardown {
        /// Correlation id for the handshake.
        id: u64,
    },

    /// Worker → host: the teardown handshake completed.
    #[serde(rename = "TEARDOWN_COMPLETE", rename_all = "camelCase")]
    TeardownComplete {
        /// Correlation id of the `TEARDOWN` request.
        id: u64,
        /// Present when the user teardown failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ServiceError>,
    },

    /// Worker → host, unsolicited: setup finished and the service is live.
    #[serde(rename = "WORKER_READY", rename_all = "camelCase")]
    WorkerReady {
        /// The instance the worker is running.
        instance_id: String,
    },

    /// Worker → host: invoke a method on one of the worker's declared
    /// dependencies. `service_name` is a requirement name from the owning
    /// instance's wiring, not a global service id.
    #[serde(rename = "UPLINK_CALL", rename_all = "camelCase")]
    UplinkCall {
        /// Correlation id, independent of the downlink id space.
        id: u64,
        /// Requirement name to resolve through the wiring.
        service_name: String,
        /// Method name to invoke on the backing service.
        method: String,
        /// Positional arguments.
        args: Vec<Value>,
    },

    /// Host → worker: successful reply to an `UPLINK_CALL`.
    #[serde(rename = "UPLINK_RESPONSE", rename_all = "camelCase")]
    UplinkResponse {
        /// Correlation id of the originating uplink call.
        id: u64,
        /// The dependency method's return value.
        result: Value,
    },

    /// Host → worker: failed reply to an `UPLINK_CALL`.
    #[serde(rename = "UPLINK_ERROR", rename_all = "camelCase")]
    UplinkError {
        /// Correlation id of the originating uplink call.
        id: u64,
        /// The serialised failure.
        error: ServiceError,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn call_frame_uses_exact_wire_names() {
        let frame = Frame::Call {
            id: 7,
            method: "query".into(),
            args: vec![json!("SELECT 1")],
        };
        let wire = serde_json::to_value(&frame).expect("serialise");
        assert_eq!(
            wire,
            json!({"kind": "CALL", "id": 7, "method": "query", "args": ["SELECT 1"]})
        );
    }

    #[rstest]
    fn worker_ready_uses_camel_case_instance_id() {
        let frame = Frame::WorkerReady {
            instance_id: "db".into(),
        };
        let wire = serde_json::to_value(&frame).expect("serialise");
        assert_eq!(wire, json!({"kind": "WORKER_READY", "instanceId": "db"}));
    }

    #[rstest]
    fn uplink_call_uses_camel_case_service_name() {
        let frame = Frame::UplinkCall {
            id: 3,
            service_name: "logger".into(),
            method: "info".into(),
            args: vec![json!("hello")],
        };
        let wire = serde_json::to_value(&frame).expect("serialise");
        assert_eq!(
            wire,
            json!({
                "kind": "UPLINK_CALL",
                "id": 3,
                "serviceName": "logger",
                "method": "info",
                "args": ["hello"],
            })
        );
    }

    #[rstest]
    fn teardown_complete_omits_absent_error() {
        let frame = Frame::TeardownComplete { id: 9, error: None };
        let wire = serde_json::to_value(&frame).expect("serialise");
        assert_eq!(wire, json!({"kind": "TEARDOWN_COMPLETE", "id": 9}));
    }

    #[rstest]
    fn error_frame_round_trips_the_error_shape() {
        let frame = Frame::Error {
            id: 4,
            error: ServiceError::new("QueryFailed", "no such table").with_stack("at db.rs:12"),
        };
        let wire = serde_json::to_string(&frame).expect("serialise");
        assert!(wire.contains(r#""kind":"ERROR""#));
        assert!(wire.contains(r#""name":"QueryFailed""#));

        let back: Frame = serde_json::from_str(&wire).expect("deserialise");
        assert_eq!(back, frame);
    }
}
