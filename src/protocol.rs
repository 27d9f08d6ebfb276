//! Propagation of vector clocks across remote calls.
//!
//! Every node owns exactly one [`NodeClock`], created at startup and shared (behind an
//! [`Arc`][std::sync::Arc]) with everything that sends or handles calls. All reads and
//! writes of the clock go through it.
//!
//! ## Caller side
//!
//! ```text
//!          begin_call()                    complete(response clock)
//!   Idle ───────────────▶ AwaitingResponse ─────────────────────────▶ Idle
//!    ▲   increment own entry,      │          merge only, no increment
//!    │   snapshot for the request  │
//!    └─────────────────────────────┘
//!          abandon() on timeout or transport failure, increment is kept
//! ```
//!
//! The `AwaitingResponse` state is a live [`PendingCall`]. It is consumed by exactly one of
//! [`PendingCall::complete`] or [`PendingCall::abandon`].
//!
//! ## Responder side
//!
//! [`NodeClock::receive_request`] merges the caller's snapshot, then increments the local
//! entry, then snapshots, all under one lock acquisition.

use crate::clock::{CausalityRelation, ClockSnapshot, NodeId, VectorClock};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The clock of a single node, guarded for concurrent use.
///
/// `increment`, `merge` and `snapshot` each hold the lock for the whole map, so a snapshot
/// never observes a half-applied merge and concurrent increments are never lost.
#[derive(Debug)]
pub struct NodeClock {
    node_id: NodeId,
    clock: Mutex<VectorClock>,
}

impl NodeClock {
    /// Creates the clock for node `node_id`, seeded with `{node_id: 0}`.
    pub fn new(node_id: NodeId) -> Self {
        let clock = VectorClock::seeded(&node_id);
        Self {
            node_id,
            clock: Mutex::new(clock),
        }
    }

    /// The id of the node owning this clock.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> ClockSnapshot {
        self.lock().snapshot()
    }

    /// Records a local event: increments the own entry and returns the resulting state.
    pub fn increment(&self) -> ClockSnapshot {
        let mut clock = self.lock();
        clock.increment(&self.node_id);
        clock.snapshot()
    }

    /// Folds a snapshot received from another node into the clock and returns the result.
    pub fn merge(&self, snapshot: &ClockSnapshot) -> ClockSnapshot {
        let mut clock = self.lock();
        clock.merge_snapshot(snapshot);
        clock.snapshot()
    }

    /// Starts an outgoing call: increments the own entry and captures the snapshot that
    /// must be attached to the request.
    pub fn begin_call(&self) -> PendingCall<'_> {
        let sent = self.increment();
        log::debug!("[{}] sending call with clock {}", self.node_id, sent);
        PendingCall { node: self, sent }
    }

    /// Handles the clock part of an inbound request.
    ///
    /// A missing snapshot is treated as the empty clock. The merge happens strictly before
    /// the increment, so the local event is ordered after everything learned from the
    /// caller.
    pub fn receive_request(&self, incoming: Option<&ClockSnapshot>) -> ReceivedCall {
        let outgoing = {
            let mut clock = self.lock();
            if let Some(incoming) = incoming {
                clock.merge_snapshot(incoming);
            }
            clock.increment(&self.node_id);
            clock.snapshot()
        };

        let relation = incoming.map(|incoming| outgoing.compare(incoming));
        if let (Some(incoming), Some(relation)) = (incoming, relation) {
            log::info!(
                "[{}] merged request clock {} -> {} ({})",
                self.node_id,
                incoming,
                outgoing,
                relation
            );
        } else {
            log::info!(
                "[{}] request without clock, advanced to {}",
                self.node_id,
                outgoing
            );
        }

        ReceivedCall {
            incoming: incoming.cloned(),
            outgoing,
            relation,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VectorClock> {
        // every critical section leaves the map consistent, so a panic elsewhere does not
        // invalidate it
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An outgoing call that was sent and has not been answered yet.
#[derive(Debug)]
#[must_use = "a pending call must be completed or abandoned"]
pub struct PendingCall<'a> {
    node: &'a NodeClock,
    sent: ClockSnapshot,
}

impl<'a> PendingCall<'a> {
    /// The snapshot to attach to the outgoing request.
    pub fn sent(&self) -> &ClockSnapshot {
        &self.sent
    }

    /// Handles the response: merges its snapshot (a missing one is treated as empty)
    /// without incrementing the own entry again.
    pub fn complete(self, response: Option<&ClockSnapshot>) -> CallCompletion {
        let clock_after = match response {
            Some(response) => self.node.merge(response),
            None => self.node.snapshot(),
        };
        let relation = self.sent.compare(&clock_after);
        log::info!(
            "[{}] merged response clock: {} -> {} ({})",
            self.node.node_id,
            self.sent,
            clock_after,
            relation
        );

        CallCompletion {
            sent: self.sent,
            received: response.cloned(),
            clock_after,
            relation,
        }
    }

    /// Gives up on the call. The increment applied by `begin_call` is not rolled back.
    pub fn abandon(self) -> ClockSnapshot {
        let clock = self.node.snapshot();
        log::info!(
            "[{}] abandoned call sent with {}, clock stays at {}",
            self.node.node_id,
            self.sent,
            clock
        );
        clock
    }
}

/// Clock state after a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallCompletion {
    /// The snapshot that was attached to the request.
    pub sent: ClockSnapshot,
    /// The snapshot that came with the response, if any.
    pub received: Option<ClockSnapshot>,
    /// The local clock right after the merge.
    pub clock_after: ClockSnapshot,
    /// `compare(sent, clock_after)`.
    pub relation: CausalityRelation,
}

/// Clock state after a responder processed an inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedCall {
    /// The caller's snapshot, `None` if absent or malformed.
    pub incoming: Option<ClockSnapshot>,
    /// The merged and incremented local clock, to attach to the response.
    pub outgoing: ClockSnapshot,
    /// `compare(outgoing, incoming)` if there was an incoming snapshot.
    pub relation: Option<CausalityRelation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{sync::Arc, thread};

    fn snapshot(entries: &[(&str, u64)]) -> ClockSnapshot {
        entries.iter().map(|&(n, c)| (n, c)).collect()
    }

    #[test]
    fn round_trip_between_client_and_server() {
        let client = NodeClock::new("c".into());
        let server = NodeClock {
            node_id: "s".into(),
            clock: Mutex::new(VectorClock::new()),
        };
        assert_eq!(client.snapshot(), snapshot(&[("c", 0)]));
        assert!(server.snapshot().as_clock().is_empty());

        let pending = client.begin_call();
        assert_eq!(pending.sent(), &snapshot(&[("c", 1)]));

        let received = server.receive_request(Some(pending.sent()));
        assert_eq!(received.outgoing, snapshot(&[("c", 1), ("s", 1)]));
        assert_eq!(received.relation, Some(CausalityRelation::HappensAfter));

        let completion = pending.complete(Some(&received.outgoing));
        assert_eq!(completion.clock_after, snapshot(&[("c", 1), ("s", 1)]));
        assert_eq!(completion.relation, CausalityRelation::HappensBefore);
        assert_eq!(client.snapshot(), snapshot(&[("c", 1), ("s", 1)]));
    }

    #[test]
    fn independent_clients_are_concurrent() {
        let server = NodeClock::new("s".into());
        let c1 = NodeClock::new("c1".into());
        let c2 = NodeClock::new("c2".into());

        let call1 = c1.begin_call();
        let reply1 = server.receive_request(Some(call1.sent()));
        let done1 = call1.complete(Some(&reply1.outgoing));

        let call2 = c2.begin_call();
        let reply2 = server.receive_request(Some(call2.sent()));
        let done2 = call2.complete(Some(&reply2.outgoing));

        assert_eq!(done1.clock_after, snapshot(&[("c1", 1), ("s", 1)]));
        assert_eq!(reply2.outgoing, snapshot(&[("c1", 1), ("c2", 1), ("s", 2)]));
        assert_eq!(done2.clock_after, reply2.outgoing);

        // neither client saw the other's send before issuing its own
        assert_eq!(done2.sent.compare(&done1.sent), CausalityRelation::Concurrent);
        assert_eq!(
            done1.clock_after.compare(&done2.sent),
            CausalityRelation::Concurrent
        );
        // c2 learned about c1 through the server
        assert_eq!(
            done1.clock_after.compare(&done2.clock_after),
            CausalityRelation::HappensBefore
        );
    }

    #[test]
    fn abandoned_call_keeps_increment() {
        let client = NodeClock::new("c".into());
        let pending = client.begin_call();
        assert_eq!(pending.abandon(), snapshot(&[("c", 1)]));
        assert_eq!(client.snapshot(), snapshot(&[("c", 1)]));
    }

    #[test]
    fn response_without_clock_only_keeps_local_state() {
        let client = NodeClock::new("c".into());
        let completion = client.begin_call().complete(None);
        assert_eq!(completion.clock_after, snapshot(&[("c", 1)]));
        assert_eq!(completion.relation, CausalityRelation::Equal);
    }

    #[test]
    fn request_without_clock_still_increments() {
        let server = NodeClock::new("s".into());
        let received = server.receive_request(None);
        assert_eq!(received.outgoing, snapshot(&[("s", 1)]));
        assert_eq!(received.relation, None);
    }

    #[test]
    fn stale_request_does_not_lower_entries() {
        let server = NodeClock::new("s".into());
        server.merge(&snapshot(&[("c", 5)]));
        let received = server.receive_request(Some(&snapshot(&[("c", 2)])));
        assert_eq!(received.outgoing, snapshot(&[("c", 5), ("s", 1)]));
        assert_eq!(received.relation, Some(CausalityRelation::HappensAfter));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let server = Arc::new(NodeClock::new("s".into()));
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let server = server.clone();
                thread::spawn(move || {
                    let caller = snapshot(&[(["a", "b", "c", "d"][i % 4], i as u64)]);
                    for _ in 0..250 {
                        server.receive_request(Some(&caller));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(server.snapshot().get("s"), 2000);
        assert_eq!(server.snapshot().get("d"), 7);
    }
}
