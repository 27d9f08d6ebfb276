//! Defines the message types that are sent between client and server nodes.

pub use self::{
    request::CallRequest,
    response::{CallResponse, CausalityReport},
};

pub mod request;
pub mod response;

/// The message type that nodes send over TCP.
///
/// Each variant is one length-prefixed frame, see
/// [`send_tcp_message`][crate::nodes::send_tcp_message].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TcpMessage {
    /// Health check.
    ///
    /// The receiver should respond with a `Pong` message. Clocks are not involved.
    Ping {
        /// The payload that the receiver should respond with.
        payload: Vec<u8>,
    },
    /// Reply to a `Ping` message.
    Pong {
        /// Sends back the payload given in the `Ping` message.
        payload: Vec<u8>,
    },
    /// A [`CallRequest`] message.
    Request(CallRequest),
    /// A [`CallResponse`] message.
    Response(CallResponse),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ClockSnapshot, operations::Method};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_frame_layout() {
        let clock: ClockSnapshot = [("c", 1)].into_iter().collect();
        let message = TcpMessage::Request(CallRequest::new(Method::Add, 2.0, 3.0, clock));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"Request": {"method": "add", "x": 2.0, "y": 3.0, "clock": {"c": 1}}})
        );
    }

    #[test]
    fn ping_round_trips() {
        let raw = serde_json::to_vec(&TcpMessage::Ping { payload: vec![1, 2] }).unwrap();
        let parsed: TcpMessage = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed, TcpMessage::Ping { payload: vec![1, 2] });
    }
}
