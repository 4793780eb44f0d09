//! Single-in-flight request discipline for the analysis endpoint.
//!
//! `begin()` hands out a permit stamped with a monotonically increasing
//! token; the gate rejects new requests while a permit is alive, so
//! overlapping result sets can never land out of order. The pending flag is
//! released in the permit's `Drop`, so a handler future dropped mid-await
//! (client disconnect) still frees the gate. A result may only be applied
//! while its token is still the latest issued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Token stamped onto one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

#[derive(Debug, Default)]
pub struct RequestGate {
    latest: AtomicU64,
    in_flight: AtomicBool,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate. Returns `None` while a previous request is pending.
    pub fn begin(&self) -> Option<RequestPermit<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let token = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        Some(RequestPermit {
            gate: self,
            token: RequestToken(token),
        })
    }

    /// Whether `token` is still the latest issued. A stale token means the
    /// result belongs to a superseded request and must be discarded.
    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }
}

/// Exclusive claim on the gate for one request. Dropping it reopens the
/// gate, whether the request completed, failed, or was abandoned.
#[derive(Debug)]
pub struct RequestPermit<'a> {
    gate: &'a RequestGate,
    token: RequestToken,
}

impl RequestPermit<'_> {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Whether this permit's result may still be applied.
    pub fn is_latest(&self) -> bool {
        self.gate.is_latest(self.token)
    }
}

impl Drop for RequestPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_while_pending_is_refused() {
        let gate = RequestGate::new();

        let permit = gate.begin().expect("first begin must succeed");
        assert!(gate.begin().is_none());

        drop(permit);
        assert!(gate.begin().is_some());
    }

    #[test]
    fn test_dropped_permit_reopens_the_gate() {
        let gate = RequestGate::new();

        // An abandoned request (handler future dropped mid-await) must not
        // leave the gate held.
        {
            let _permit = gate.begin().unwrap();
        }
        assert!(gate.begin().is_some());
    }

    #[test]
    fn test_tokens_strictly_increase() {
        let gate = RequestGate::new();

        let first = gate.begin().unwrap().token();
        let second = gate.begin().unwrap().token();

        assert_ne!(first, second);
        assert!(gate.is_latest(second));
        assert!(!gate.is_latest(first));
    }

    #[test]
    fn test_stale_token_is_detected() {
        let gate = RequestGate::new();

        let stale = gate.begin().unwrap().token();
        let current = gate.begin().unwrap();

        // A late completion of the first request must not be applied.
        assert!(!gate.is_latest(stale));
        assert!(current.is_latest());
    }

    #[test]
    fn test_live_permit_is_latest() {
        let gate = RequestGate::new();

        let permit = gate.begin().unwrap();
        assert!(permit.is_latest());
        assert!(gate.is_latest(permit.token()));
    }
}
