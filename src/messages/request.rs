//! Provides the [`CallRequest`] struct.

use crate::{
    clock::{deserialize_lenient, ClockSnapshot},
    operations::Method,
};
use serde_json::Value;

/// A single call of a server method.
///
/// The server responds with a [`CallResponse`][super::CallResponse].
///
/// `x`, `y` and `clock` are kept loosely typed on the wire: operand validation is the job of
/// [`operations::evaluate`][crate::operations::evaluate], and a missing or malformed clock
/// decodes to `None` instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CallRequest {
    /// Name of the method to invoke, e.g. `add`.
    pub method: String,
    /// First operand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Value>,
    /// Second operand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Value>,
    /// The caller's clock, taken right after its pre-send increment.
    #[serde(
        default,
        alias = "vector_clock",
        deserialize_with = "deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub clock: Option<ClockSnapshot>,
}

impl CallRequest {
    /// Creates a well-formed request for `method` with the given operands and clock.
    ///
    /// JSON has no representation for NaN or infinity, so non-finite operands are sent as
    /// strings (`"NaN"`, `"inf"`). The server parses those and rejects the call with
    /// [`NonFiniteResult`][crate::RpcError::NonFiniteResult].
    pub fn new(method: Method, x: f64, y: f64, clock: ClockSnapshot) -> Self {
        Self {
            method: method.as_str().to_owned(),
            x: Some(operand_value(x)),
            y: Some(operand_value(y)),
            clock: Some(clock),
        }
    }
}

fn operand_value(operand: f64) -> Value {
    if operand.is_finite() {
        Value::from(operand)
    } else {
        Value::from(operand.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{operations, RpcError};

    #[test]
    fn non_finite_operands_are_sent_as_strings() {
        let request = CallRequest::new(
            Method::Add,
            f64::NAN,
            f64::NEG_INFINITY,
            ClockSnapshot::default(),
        );
        assert_eq!(request.x, Some(Value::from("NaN")));
        assert_eq!(request.y, Some(Value::from("-inf")));

        let request = CallRequest::new(Method::Multiply, f64::INFINITY, 2.0, ClockSnapshot::default());
        assert_eq!(
            operations::evaluate(Method::Multiply, request.x.as_ref(), request.y.as_ref()),
            Err(RpcError::NonFiniteResult)
        );
    }

    #[test]
    fn missing_clock_decodes_as_none() {
        let request: CallRequest = serde_json::from_str(r#"{"method": "add", "x": 1, "y": 2}"#)
            .unwrap();
        assert_eq!(request.clock, None);
    }

    #[test]
    fn malformed_clock_does_not_fail_the_frame() {
        let request: CallRequest = serde_json::from_str(
            r#"{"method": "add", "x": 1, "y": 2, "clock": {"c": "one"}}"#,
        )
        .unwrap();
        assert_eq!(request.clock, None);
        assert_eq!(request.x, Some(Value::from(1)));
    }

    #[test]
    fn accepts_legacy_field_name() {
        let request: CallRequest = serde_json::from_str(
            r#"{"method": "add", "x": 1, "y": 2, "vector_clock": {"c": 4}}"#,
        )
        .unwrap();
        assert_eq!(request.clock.map(|c| c.get("c")), Some(4));
    }
}
