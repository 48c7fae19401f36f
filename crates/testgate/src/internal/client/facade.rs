use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::RecvError;

use crate::internal::client::host::TaskHost;
use crate::internal::common::error::GateError;
use crate::internal::common::resources::{ResourceSet, check_feasibility};
use crate::internal::coordinator::core::PoolSnapshot;
use crate::internal::coordinator::events::{
    CoordinatorEvent, EventSender, GrantToken, Rejection, WakeReceiver,
};

/// Outcome of an admission request.
#[derive(Debug)]
pub enum Admission {
    /// The demand is reserved until the guard is released or dropped.
    Granted(AdmissionGuard),
    /// The demand exceeds the declared capacity; the task should not run.
    Skipped(String),
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted(_))
    }

    pub fn into_guard(self) -> Option<AdmissionGuard> {
        match self {
            Admission::Granted(guard) => Some(guard),
            Admission::Skipped(_) => None,
        }
    }
}

/// Handle used by tasks to talk to one coordinator. Cheap to clone.
#[derive(Clone)]
pub struct AdmissionClient {
    total: Arc<ResourceSet>,
    sender: EventSender,
}

struct Waiting {
    identity: String,
    receiver: WakeReceiver,
}

impl AdmissionClient {
    pub(crate) fn new(total: ResourceSet, sender: EventSender) -> Self {
        AdmissionClient {
            total: Arc::new(total),
            sender,
        }
    }

    /// Declared capacity of the coordinator.
    #[inline]
    pub fn total(&self) -> &ResourceSet {
        &self.total
    }

    /// Waits until `demand` is reserved for the task.
    ///
    /// A demand that does not fit into the declared capacity is skipped right away,
    /// a demand that only does not fit into the currently free capacity waits.
    pub async fn request_admission(
        &self,
        host: &impl TaskHost,
        demand: ResourceSet,
    ) -> crate::Result<Admission> {
        match self.submit(host, demand)? {
            Ok(waiting) => {
                let outcome = waiting.receiver.await;
                self.finish(waiting.identity, outcome)
            }
            Err(reason) => Ok(Admission::Skipped(reason)),
        }
    }

    /// Blocking variant of [`AdmissionClient::request_admission`].
    ///
    /// # Panics
    /// When called from within an asynchronous execution context.
    pub fn request_admission_blocking(
        &self,
        host: &impl TaskHost,
        demand: ResourceSet,
    ) -> crate::Result<Admission> {
        match self.submit(host, demand)? {
            Ok(waiting) => {
                let outcome = waiting.receiver.blocking_recv();
                self.finish(waiting.identity, outcome)
            }
            Err(reason) => Ok(Admission::Skipped(reason)),
        }
    }

    fn submit(
        &self,
        host: &impl TaskHost,
        demand: ResourceSet,
    ) -> crate::Result<Result<Waiting, String>> {
        let identity = host.identity();
        if let Err(infeasible) = check_feasibility(&self.total, &demand) {
            let reason = infeasible.to_string();
            host.skip(&reason);
            return Ok(Err(reason));
        }
        host.mark_parallel();

        let (wake, receiver) = oneshot::channel();
        self.sender
            .send(CoordinatorEvent::Enqueue {
                identity: identity.clone(),
                demand,
                wake,
            })
            .map_err(|_| GateError::CoordinatorStopped)?;
        log::info!("+++ ALLOC {identity}");
        trace_admission!(identity, "request");
        Ok(Ok(Waiting { identity, receiver }))
    }

    fn finish(
        &self,
        identity: String,
        outcome: Result<Result<GrantToken, Rejection>, RecvError>,
    ) -> crate::Result<Admission> {
        let token = match outcome {
            Ok(Ok(token)) => token,
            Ok(Err(rejection)) => return Err(rejection.into_error(identity)),
            Err(_) => return Err(GateError::CoordinatorStopped),
        };
        let Some(grant) = token.claim() else {
            return Err(GateError::CoordinatorStopped);
        };
        log::info!("+++ SCHED {identity}");
        trace_admission!(identity, "grant");
        Ok(Admission::Granted(AdmissionGuard {
            identity,
            demand: grant.demand,
            sender: grant.sender,
            start: Instant::now(),
            released: false,
        }))
    }

    /// Current state of the coordinator, taken between two events.
    pub async fn snapshot(&self) -> crate::Result<PoolSnapshot> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(CoordinatorEvent::Snapshot(reply))
            .map_err(|_| GateError::CoordinatorStopped)?;
        receiver.await.map_err(|_| GateError::CoordinatorStopped)
    }

    pub fn snapshot_blocking(&self) -> crate::Result<PoolSnapshot> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(CoordinatorEvent::Snapshot(reply))
            .map_err(|_| GateError::CoordinatorStopped)?;
        receiver
            .blocking_recv()
            .map_err(|_| GateError::CoordinatorStopped)
    }

    /// Rejects all pending and future requests. Held grants can still be released.
    pub fn shutdown(&self) -> crate::Result<()> {
        self.sender
            .send(CoordinatorEvent::Shutdown)
            .map_err(|_| GateError::CoordinatorStopped)
    }
}

/// Reservation held by a running task.
///
/// The reservation is returned exactly once, by [`AdmissionGuard::release`] or
/// when the guard is dropped (including during unwinding of a failed test).
#[derive(Debug)]
pub struct AdmissionGuard {
    identity: String,
    demand: ResourceSet,
    sender: EventSender,
    start: Instant,
    released: bool,
}

impl AdmissionGuard {
    #[inline]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[inline]
    pub fn demand(&self) -> &ResourceSet {
        &self.demand
    }

    /// Time since the grant.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        log::info!(
            "+++ END   {} ({:.2}s)",
            self.identity,
            self.start.elapsed().as_secs_f64()
        );
        trace_admission!(self.identity, "release");
        let event = CoordinatorEvent::Release {
            identity: self.identity.clone(),
            amount: std::mem::take(&mut self.demand),
        };
        if self.sender.send(event).is_err() {
            log::debug!(
                "Coordinator is gone, release of '{}' was dropped",
                self.identity
            );
        }
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}
