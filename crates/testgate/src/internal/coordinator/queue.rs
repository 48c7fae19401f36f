use std::time::Instant;

use crate::internal::common::Map;
use crate::internal::common::resources::ResourceSet;
use crate::internal::config::QueueOrder;
use crate::internal::coordinator::events::WakeSender;

pub(crate) struct PendingRequest {
    pub demand: ResourceSet,
    pub wake: WakeSender,
    pub sequence: u64,
    pub deadline: Option<Instant>,
}

/// Pending requests keyed by identity.
#[derive(Default)]
pub(crate) struct WaitQueue {
    requests: Map<String, PendingRequest>,
    next_sequence: u64,
}

impl WaitQueue {
    /// Returns the request previously stored under the same identity.
    pub fn insert(
        &mut self,
        identity: String,
        demand: ResourceSet,
        wake: WakeSender,
        deadline: Option<Instant>,
    ) -> Option<PendingRequest> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.requests.insert(
            identity,
            PendingRequest {
                demand,
                wake,
                sequence,
                deadline,
            },
        )
    }

    #[inline]
    pub fn remove(&mut self, identity: &str) -> Option<PendingRequest> {
        self.requests.remove(identity)
    }

    #[inline]
    pub fn get(&self, identity: &str) -> Option<&PendingRequest> {
        self.requests.get(identity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Identities in the order an admission pass visits them.
    pub fn scan(&self, order: QueueOrder) -> Vec<String> {
        match order {
            QueueOrder::Unordered => self.requests.keys().cloned().collect(),
            QueueOrder::Fifo => {
                let mut entries: Vec<(&String, u64)> = self
                    .requests
                    .iter()
                    .map(|(identity, rq)| (identity, rq.sequence))
                    .collect();
                entries.sort_unstable_by_key(|(_, sequence)| *sequence);
                entries
                    .into_iter()
                    .map(|(identity, _)| identity.clone())
                    .collect()
            }
        }
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.requests.keys().map(|id| id.as_str())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.requests.values().filter_map(|rq| rq.deadline).min()
    }

    pub fn expired(&self, now: Instant) -> Vec<String> {
        self.requests
            .iter()
            .filter(|(_, rq)| rq.deadline.is_some_and(|deadline| deadline <= now))
            .map(|(identity, _)| identity.clone())
            .collect()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (String, PendingRequest)> + '_ {
        self.requests.drain()
    }
}
