use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use crate::internal::common::error::GateError;
use crate::internal::common::resources::ResourceSet;
use crate::internal::coordinator::core::PoolSnapshot;

pub(crate) type EventSender = UnboundedSender<CoordinatorEvent>;
pub(crate) type WakeSender = oneshot::Sender<Result<GrantToken, Rejection>>;
pub(crate) type WakeReceiver = oneshot::Receiver<Result<GrantToken, Rejection>>;

/// Everything that changes coordinator state arrives through a single channel,
/// so all mutations are totally ordered.
pub(crate) enum CoordinatorEvent {
    Enqueue {
        identity: String,
        demand: ResourceSet,
        wake: WakeSender,
    },
    Release {
        identity: String,
        amount: ResourceSet,
    },
    Shutdown,
    Snapshot(oneshot::Sender<PoolSnapshot>),
}

/// Reason why a pending request was woken without a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    ShuttingDown,
    TimedOut(Duration),
    Displaced,
}

impl Rejection {
    pub fn into_error(self, identity: String) -> GateError {
        match self {
            Rejection::ShuttingDown => GateError::ShuttingDown,
            Rejection::TimedOut(timeout) => GateError::AdmissionTimeout { identity, timeout },
            Rejection::Displaced => GateError::Displaced { identity },
        }
    }
}

/// Reserved capacity in flight between the coordinator and the woken task.
///
/// If the token is dropped before the task claims it, e.g. because the waiting
/// future was cancelled, the reservation is returned to the coordinator.
pub(crate) struct GrantToken {
    inner: Option<GrantInner>,
}

pub(crate) struct GrantInner {
    pub identity: String,
    pub demand: ResourceSet,
    pub sender: EventSender,
}

impl GrantToken {
    pub fn new(identity: String, demand: ResourceSet, sender: EventSender) -> Self {
        GrantToken {
            inner: Some(GrantInner {
                identity,
                demand,
                sender,
            }),
        }
    }

    pub fn claim(mut self) -> Option<GrantInner> {
        self.inner.take()
    }
}

impl Drop for GrantToken {
    fn drop(&mut self) {
        if let Some(GrantInner {
            identity,
            demand,
            sender,
        }) = self.inner.take()
        {
            log::debug!("Grant of '{identity}' was not claimed, returning {demand}");
            let _ = sender.send(CoordinatorEvent::Release {
                identity,
                amount: demand,
            });
        }
    }
}
