//! Provides the [`CallResponse`] struct and the attached [`CausalityReport`].

use crate::{
    clock::{deserialize_lenient, CausalityRelation, ClockSnapshot},
    RpcError,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Number, Value};

/// A response to a [`CallRequest`][super::CallRequest].
///
/// Exactly one of `result` and `error` is set. The `clock` is always the server's snapshot,
/// taken after merging the request clock and incrementing its own entry, so failed calls
/// still propagate causality.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CallResponse {
    /// The value computed by the method.
    #[serde(default)]
    pub result: Option<Number>,
    /// Set if the method could not be executed.
    #[serde(default)]
    pub error: Option<RpcError>,
    /// The server's clock after processing the request.
    #[serde(
        default,
        alias = "vector_clock",
        deserialize_with = "deserialize_lenient"
    )]
    pub clock: Option<ClockSnapshot>,
    /// How the server's clock relates to the caller's, for logging on the caller side.
    ///
    /// Informational only, so an unreadable report decodes to `None`.
    #[serde(default, deserialize_with = "deserialize_optional_report")]
    pub causality: Option<CausalityReport>,
}

impl CallResponse {
    /// Creates a successful response.
    pub fn success(result: Number, clock: ClockSnapshot, causality: CausalityReport) -> Self {
        Self {
            result: Some(result),
            error: None,
            clock: Some(clock),
            causality: Some(causality),
        }
    }

    /// Creates a failed response.
    pub fn failure(
        error: RpcError,
        clock: ClockSnapshot,
        causality: Option<CausalityReport>,
    ) -> Self {
        Self {
            result: None,
            error: Some(error),
            clock: Some(clock),
            causality,
        }
    }
}

/// Relation between the server's clock and the clock the caller sent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CausalityReport {
    /// The server's clock after merge and increment.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub server_clock: Option<ClockSnapshot>,
    /// The clock that came with the request, `None` if it was absent or malformed.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub client_clock: Option<ClockSnapshot>,
    /// `compare(server_clock, client_clock)`, `None` without a client clock or if the
    /// server sent a relation name this node does not know.
    #[serde(default, deserialize_with = "deserialize_optional_report")]
    pub relationship: Option<CausalityRelation>,
}

impl CausalityReport {
    /// Builds a report for the given clocks.
    pub fn new(server_clock: ClockSnapshot, client_clock: Option<ClockSnapshot>) -> Self {
        let relationship = client_clock
            .as_ref()
            .map(|client| server_clock.compare(client));
        Self {
            server_clock: Some(server_clock),
            client_clock,
            relationship,
        }
    }
}

/// Decodes an optional report field, replacing anything unreadable with `None`.
fn deserialize_optional_report<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            log::warn!("ignoring causality report field `{}`: {}", value, err);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot(entries: &[(&str, u64)]) -> ClockSnapshot {
        entries.iter().map(|&(n, c)| (n, c)).collect()
    }

    #[test]
    fn report_compares_server_against_client() {
        let report = CausalityReport::new(
            snapshot(&[("c", 1), ("s", 1)]),
            Some(snapshot(&[("c", 1)])),
        );
        assert_eq!(report.relationship, Some(CausalityRelation::HappensAfter));

        let report = CausalityReport::new(snapshot(&[("s", 1)]), None);
        assert_eq!(report.relationship, None);
    }

    #[test]
    fn success_layout() {
        let clock = snapshot(&[("c", 1), ("s", 1)]);
        let report = CausalityReport::new(clock.clone(), Some(snapshot(&[("c", 1)])));
        let response = CallResponse::success(Number::from(5), clock, report);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "result": 5,
                "error": null,
                "clock": {"c": 1, "s": 1},
                "causality": {
                    "server_clock": {"c": 1, "s": 1},
                    "client_clock": {"c": 1},
                    "relationship": "happens-after",
                },
            })
        );
    }

    #[test]
    fn garbage_clock_in_response_is_dropped() {
        let response: CallResponse =
            serde_json::from_str(r#"{"result": 5, "clock": [1, 2, 3]}"#).unwrap();
        assert_eq!(response.result, Some(Number::from(5)));
        assert_eq!(response.clock, None);
        assert_eq!(response.causality, None);
    }

    #[test]
    fn unknown_relationship_keeps_the_rest_of_the_report() {
        let response: CallResponse = serde_json::from_str(
            r#"{"result": 5, "clock": {"c": 1, "s": 1},
                "causality": {"server_clock": {"c": 1, "s": 1}, "relationship": "no_client_clock"}}"#,
        )
        .unwrap();
        assert_eq!(response.result, Some(Number::from(5)));
        assert_eq!(response.clock, Some(snapshot(&[("c", 1), ("s", 1)])));
        let report = response.causality.unwrap();
        assert_eq!(report.server_clock, Some(snapshot(&[("c", 1), ("s", 1)])));
        assert_eq!(report.client_clock, None);
        assert_eq!(report.relationship, None);
    }

    #[test]
    fn unreadable_report_is_dropped() {
        for causality in [json!("n/a"), json!(42), json!([1, 2])] {
            let raw = json!({"result": 5, "clock": {"c": 1, "s": 1}, "causality": causality});
            let response: CallResponse = serde_json::from_value(raw).unwrap();
            assert_eq!(response.result, Some(Number::from(5)));
            assert_eq!(response.clock, Some(snapshot(&[("c", 1), ("s", 1)])));
            assert_eq!(response.causality, None);
        }
    }
}
