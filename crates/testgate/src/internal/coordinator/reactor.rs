use std::time::Instant;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::internal::coordinator::core::Coordinator;
use crate::internal::coordinator::events::CoordinatorEvent;

/// Consumes events one at a time until every sender is gone.
pub(crate) async fn coordinator_loop(
    mut core: Coordinator,
    mut receiver: UnboundedReceiver<CoordinatorEvent>,
) {
    log::debug!(
        "Admission coordinator started, capacity: {}, queue order: {:?}",
        core.pool().total(),
        core.queue_order()
    );
    loop {
        let deadline = core.next_deadline();
        tokio::select! {
            event = receiver.recv() => {
                let Some(event) = event else {
                    break;
                };
                core.handle_event(event, Instant::now());
            }
            () = sleep_until_deadline(deadline) => {
                core.expire_requests(Instant::now());
            }
        }
    }
    log::debug!(
        "Admission coordinator stopped, {} request(s) left pending",
        core.pending_count()
    );
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => futures::future::pending().await,
    }
}
