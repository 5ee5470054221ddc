//! Request broker - timed, one-inbound-per-recipient offers
//!
//! Shared by invites, join requests, teleport requests, sector gifts and
//! surrender offers. Expiry is checked lazily on every read; `sweep` only
//! bounds memory. Accepting or denying removes the entry before the caller
//! runs any side effect, so a second accept finds nothing.

use std::hash::Hash;

use ahash::AHashMap;

use crate::core::types::Timestamp;

/// Result of a broker operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Sent,
    /// The same sender already has a live request to this recipient
    AlreadyPending,
    /// Another sender holds the recipient's inbound slot
    Busy,
    /// Nothing pending, or it expired
    NoRequest,
    Accepted,
    Denied,
}

impl RequestOutcome {
    pub fn message_key(self) -> &'static str {
        match self {
            RequestOutcome::Sent => "request.sent",
            RequestOutcome::AlreadyPending => "request.already_pending",
            RequestOutcome::Busy => "request.busy",
            RequestOutcome::NoRequest => "request.none",
            RequestOutcome::Accepted => "request.accepted",
            RequestOutcome::Denied => "request.denied",
        }
    }
}

/// A single pending request
#[derive(Debug, Clone, PartialEq)]
pub struct Request<R, S, P> {
    pub to: R,
    pub from: S,
    pub payload: P,
    pub created_at: Timestamp,
    /// Lifetime in ms; 0 never expires
    pub timeout: Timestamp,
}

impl<R, S, P> Request<R, S, P> {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.timeout > 0 && now >= self.created_at.saturating_add(self.timeout)
    }
}

/// Pending requests keyed by recipient
#[derive(Debug, Clone)]
pub struct RequestBroker<R, S, P>
where
    R: Eq + Hash + Clone,
    S: PartialEq + Clone,
{
    inbound: AHashMap<R, Request<R, S, P>>,
    timeout: Timestamp,
}

impl<R, S, P> RequestBroker<R, S, P>
where
    R: Eq + Hash + Clone,
    S: PartialEq + Clone,
{
    pub fn new(timeout: Timestamp) -> Self {
        Self {
            inbound: AHashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Timestamp {
        self.timeout
    }

    /// Offer `payload` from `from` to `to`
    pub fn send(&mut self, to: R, from: S, payload: P, now: Timestamp) -> RequestOutcome {
        if let Some(existing) = self.inbound.get(&to) {
            if !existing.is_expired(now) {
                return if existing.from == from {
                    RequestOutcome::AlreadyPending
                } else {
                    RequestOutcome::Busy
                };
            }
        }
        self.inbound.insert(
            to.clone(),
            Request {
                to,
                from,
                payload,
                created_at: now,
                timeout: self.timeout,
            },
        );
        RequestOutcome::Sent
    }

    /// The live inbound request for `to`
    pub fn pending(&self, to: &R, now: Timestamp) -> Option<&Request<R, S, P>> {
        self.inbound.get(to).filter(|r| !r.is_expired(now))
    }

    /// Remove and return the live request for `to`. Expired entries are
    /// dropped and reported as absent.
    pub fn take(&mut self, to: &R, now: Timestamp) -> Option<Request<R, S, P>> {
        let request = self.inbound.remove(to)?;
        if request.is_expired(now) {
            return None;
        }
        Some(request)
    }

    /// Remove the request for `to` only if it came from `from`
    pub fn take_from(&mut self, to: &R, from: &S, now: Timestamp) -> Option<Request<R, S, P>> {
        match self.pending(to, now) {
            Some(r) if &r.from == from => self.take(to, now),
            _ => None,
        }
    }

    /// True if `from` has any live outbound request
    pub fn has_outbound(&self, from: &S, now: Timestamp) -> bool {
        self.inbound.values().any(|r| &r.from == from && !r.is_expired(now))
    }

    /// Drop every request sent by `from`
    pub fn cancel_from(&mut self, from: &S) -> usize {
        let before = self.inbound.len();
        self.inbound.retain(|_, r| &r.from != from);
        before - self.inbound.len()
    }

    /// Drop the request addressed to `to`
    pub fn cancel_to(&mut self, to: &R) -> bool {
        self.inbound.remove(to).is_some()
    }

    /// Drop requests whose payload matches
    pub fn cancel_where(&mut self, mut matches: impl FnMut(&Request<R, S, P>) -> bool) -> usize {
        let before = self.inbound.len();
        self.inbound.retain(|_, r| !matches(r));
        before - self.inbound.len()
    }

    /// Remove expired entries; returns how many were dropped
    pub fn sweep(&mut self, now: Timestamp) -> usize {
        let before = self.inbound.len();
        self.inbound.retain(|_, r| !r.is_expired(now));
        before - self.inbound.len()
    }

    /// Move the request addressed to `old` so it is addressed to `new`
    pub fn rekey_recipient(&mut self, old: &R, new: R) {
        if let Some(mut request) = self.inbound.remove(old) {
            request.to = new.clone();
            self.inbound.insert(new, request);
        }
    }

    /// Rewrite the sender on every request from `old`
    pub fn rekey_sender(&mut self, old: &S, new: S) {
        for request in self.inbound.values_mut() {
            if &request.from == old {
                request.from = new.clone();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inbound.is_empty()
    }
}
