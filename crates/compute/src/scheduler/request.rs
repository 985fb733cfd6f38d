use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use flowfield_core::{
    CollectedField, CostProviderId, FlowField, FlowFieldError, GridPos, RequestId, Result,
};
use parking_lot::Mutex;

use super::gate::CompletionGate;

/// Outcome of one tick for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decay {
    /// Still counting down, nothing to do.
    Pending,
    /// Deadline reached: the caller must block until the field is ready.
    Deadline,
    /// Grace period over, result never collected.
    Expired,
}

/// A client request for one flow field.
///
/// Shared between the request table and every job working on it. The table
/// entry can disappear (collect, cancel, expiry) while jobs still hold it.
#[derive(Debug)]
pub(crate) struct Request {
    id: RequestId,
    cost_provider: CostProviderId,
    origin: GridPos,
    /// Ticks left before a forced wait; negative while in the grace period.
    decay: AtomicI64,
    result: Mutex<Option<FlowField>>,
    gate: CompletionGate,
    cancelled: AtomicBool,
}

impl Request {
    pub(crate) fn new(
        id: RequestId,
        cost_provider: CostProviderId,
        origin: GridPos,
        max_iterations: u32,
    ) -> Self {
        Self {
            id,
            cost_provider,
            origin,
            decay: AtomicI64::new(max_iterations as i64),
            result: Mutex::new(None),
            gate: CompletionGate::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> RequestId {
        self.id
    }

    pub(crate) fn cost_provider(&self) -> CostProviderId {
        self.cost_provider
    }

    pub(crate) fn decay(&self) -> i64 {
        self.decay.load(Ordering::Acquire)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Mark cancelled and release anyone blocked on the deadline.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.gate.open();
    }

    /// Store the finished field. Called once, by the last flow-part finisher.
    pub(crate) fn complete(&self, field: FlowField) {
        *self.result.lock() = Some(field);
        self.decay.store(0, Ordering::Release);
        self.gate.open();
    }

    pub(crate) fn wait_for_completion(&self) {
        self.gate.wait();
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.gate.is_open()
    }

    fn take_result(&self) -> Option<FlowField> {
        self.result.lock().take()
    }

    /// Count down one tick.
    pub(crate) fn tick(&self, expiration_limit: u32) -> Decay {
        let previous = self.decay.fetch_sub(1, Ordering::AcqRel);
        match previous {
            p if p > 1 => Decay::Pending,
            1 => Decay::Deadline,
            p if p - 1 <= -(expiration_limit as i64 + 1) => Decay::Expired,
            _ => Decay::Pending,
        }
    }
}

/// Result of advancing every live request by one tick.
#[derive(Debug, Default)]
pub(crate) struct TickOutcome {
    /// Requests whose deadline arrived; the caller waits on each.
    pub deadline: Vec<Arc<Request>>,
    /// Requests dropped from the table uncollected.
    pub expired: Vec<RequestId>,
}

#[derive(Debug, Default)]
struct TableInner {
    next_id: RequestId,
    requests: HashMap<RequestId, Arc<Request>>,
}

/// Every live request, keyed by id.
#[derive(Debug, Default)]
pub(crate) struct RequestTable {
    inner: Mutex<TableInner>,
}

impl RequestTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &self,
        cost_provider: CostProviderId,
        origin: GridPos,
        max_iterations: u32,
    ) -> Arc<Request> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let request = Arc::new(Request::new(id, cost_provider, origin, max_iterations));
        inner.requests.insert(id, Arc::clone(&request));
        request
    }

    pub(crate) fn remove(&self, id: RequestId) -> Option<Arc<Request>> {
        self.inner.lock().requests.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Take the finished field and drop the entry. `Ok(None)` while the
    /// field is still being computed.
    pub(crate) fn collect(&self, id: RequestId) -> Result<Option<CollectedField>> {
        let mut inner = self.inner.lock();
        let request = inner
            .requests
            .get(&id)
            .ok_or(FlowFieldError::RequestNotFound(id))?;

        let Some(field) = request.take_result() else {
            return Ok(None);
        };
        let origin = request.origin;
        inner.requests.remove(&id);
        Ok(Some(CollectedField { field, origin }))
    }

    /// Tick every request, removing the expired ones.
    pub(crate) fn tick_all(&self, expiration_limit: u32) -> TickOutcome {
        let mut inner = self.inner.lock();
        let mut outcome = TickOutcome::default();
        for request in inner.requests.values() {
            match request.tick(expiration_limit) {
                Decay::Pending => {}
                Decay::Deadline => outcome.deadline.push(Arc::clone(request)),
                Decay::Expired => outcome.expired.push(request.id),
            }
        }
        for id in &outcome.expired {
            inner.requests.remove(id);
        }
        outcome
    }
}
