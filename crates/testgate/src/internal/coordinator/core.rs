use std::time::Instant;

use tokio::sync::mpsc::WeakUnboundedSender;

use crate::internal::common::resources::{ResourcePool, ResourceSet};
use crate::internal::config::{CoordinatorConfig, QueueOrder};
use crate::internal::coordinator::events::{CoordinatorEvent, GrantToken, Rejection, WakeSender};
use crate::internal::coordinator::queue::WaitQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    /// New requests are rejected, releases of held grants are still accepted.
    ShuttingDown,
}

/// State of a coordinator observed between two events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub total: ResourceSet,
    pub unallocated: ResourceSet,
    /// Identities of pending requests, sorted.
    pub pending: Vec<String>,
    /// Number of grants delivered to tasks.
    pub granted: u64,
    /// Number of processed release events.
    pub released: u64,
    pub phase: Phase,
}

impl PoolSnapshot {
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.total == self.unallocated
    }
}

/// Pool and wait queue of one admission coordinator.
///
/// Owned by exactly one control loop, which is the only place where its state changes.
pub struct Coordinator {
    pool: ResourcePool,
    queue: WaitQueue,
    config: CoordinatorConfig,
    phase: Phase,
    granted: u64,
    released: u64,
    // Weak, so that the coordinator does not keep its own channel open
    event_sender: WeakUnboundedSender<CoordinatorEvent>,
}

impl Coordinator {
    pub(crate) fn new(
        total: ResourceSet,
        config: CoordinatorConfig,
        event_sender: WeakUnboundedSender<CoordinatorEvent>,
    ) -> Self {
        Coordinator {
            pool: ResourcePool::new(total),
            queue: WaitQueue::default(),
            config,
            phase: Phase::Running,
            granted: 0,
            released: 0,
            event_sender,
        }
    }

    #[inline]
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn queue_order(&self) -> QueueOrder {
        self.config.queue_order
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.queue.next_deadline()
    }

    /// Applies one event and then runs an admission pass.
    pub(crate) fn handle_event(&mut self, event: CoordinatorEvent, now: Instant) {
        match event {
            CoordinatorEvent::Enqueue {
                identity,
                demand,
                wake,
            } => self.enqueue(identity, demand, wake, now),
            CoordinatorEvent::Release { identity, amount } => self.release(&identity, &amount),
            CoordinatorEvent::Shutdown => self.shutdown(),
            CoordinatorEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
        let granted = trace_time!("coordinator", "admission_pass", self.run_admission_pass());
        if granted > 0 {
            log::debug!(
                "Admission pass granted {granted} request(s), {} pending, unallocated: {}",
                self.queue.len(),
                self.pool.unallocated()
            );
        }
        self.expire_requests(now);
    }

    fn enqueue(&mut self, identity: String, demand: ResourceSet, wake: WakeSender, now: Instant) {
        if self.phase == Phase::ShuttingDown {
            log::debug!("Rejecting '{identity}', coordinator is shutting down");
            let _ = wake.send(Err(Rejection::ShuttingDown));
            return;
        }
        log::trace!("Enqueuing '{identity}' demanding {demand}");
        // A timeout beyond the representable range means no deadline
        let deadline = self
            .config
            .admission_timeout
            .and_then(|timeout| now.checked_add(timeout));
        if let Some(displaced) = self.queue.insert(identity.clone(), demand, wake, deadline) {
            log::warn!("Request '{identity}' replaced a pending request with the same identity");
            let _ = displaced.wake.send(Err(Rejection::Displaced));
        }
    }

    fn release(&mut self, identity: &str, amount: &ResourceSet) {
        log::trace!("Releasing {amount} held by '{identity}'");
        self.pool.release(amount);
        self.released += 1;
    }

    /// Rejects every pending request and every future one.
    pub(crate) fn shutdown(&mut self) {
        if self.phase == Phase::ShuttingDown {
            return;
        }
        log::debug!(
            "Admission coordinator shutting down, rejecting {} pending request(s)",
            self.queue.len()
        );
        self.phase = Phase::ShuttingDown;
        for (_, request) in self.queue.drain() {
            let _ = request.wake.send(Err(Rejection::ShuttingDown));
        }
    }

    /// Grants every pending request that fits into the unallocated capacity.
    /// A request that does not fit does not stop the scan.
    pub(crate) fn run_admission_pass(&mut self) -> usize {
        if self.queue.is_empty() {
            return 0;
        }
        let mut granted = 0;
        for identity in self.queue.scan(self.config.queue_order) {
            let Some(request) = self.queue.get(&identity) else {
                continue;
            };
            if request.wake.is_closed() {
                log::debug!("Dropping pending request '{identity}', its waiter is gone");
                self.queue.remove(&identity);
                continue;
            }
            if !self.pool.try_reserve(&request.demand) {
                continue;
            }
            let Some(request) = self.queue.remove(&identity) else {
                continue;
            };
            if self.grant(identity, request.demand, request.wake) {
                granted += 1;
            }
        }
        granted
    }

    fn grant(&mut self, identity: String, demand: ResourceSet, wake: WakeSender) -> bool {
        let Some(sender) = self.event_sender.upgrade() else {
            // Nobody can send the release anymore, the waiter observes a stopped coordinator
            self.pool.release(&demand);
            return false;
        };
        let token = GrantToken::new(identity, demand, sender);
        match wake.send(Ok(token)) {
            Ok(()) => {
                self.granted += 1;
                true
            }
            Err(Ok(token)) => {
                if let Some(grant) = token.claim() {
                    log::debug!("Waiter of '{}' is gone, returning its grant", grant.identity);
                    self.pool.release(&grant.demand);
                }
                false
            }
            Err(Err(_)) => false,
        }
    }

    pub(crate) fn expire_requests(&mut self, now: Instant) -> usize {
        let Some(timeout) = self.config.admission_timeout else {
            return 0;
        };
        let expired = self.queue.expired(now);
        for identity in &expired {
            if let Some(request) = self.queue.remove(identity) {
                log::debug!("Admission of '{identity}' timed out");
                let _ = request.wake.send(Err(Rejection::TimedOut(timeout)));
            }
        }
        expired.len()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let mut pending: Vec<String> = self.queue.identities().map(|id| id.to_string()).collect();
        pending.sort_unstable();
        PoolSnapshot {
            total: self.pool.total().clone(),
            unallocated: self.pool.unallocated().clone(),
            pending,
            granted: self.granted,
            released: self.released,
            phase: self.phase,
        }
    }
}
