use std::sync::{Mutex, Once, OnceLock};
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record};

use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::sync::oneshot::error::TryRecvError;

use crate::internal::common::resources::{ResourceAmount, ResourceSet};
use crate::internal::config::CoordinatorConfig;
use crate::internal::coordinator::core::Coordinator;
use crate::internal::coordinator::events::{
    CoordinatorEvent, EventSender, GrantInner, GrantToken, Rejection, WakeReceiver,
};

/// Forwards records to env_logger and keeps the messages of this crate at info level and above.
struct CapturingLogger {
    inner: env_logger::Logger,
    lines: Mutex<Vec<String>>,
}

impl CapturingLogger {
    fn new() -> Self {
        CapturingLogger {
            inner: env_logger::Builder::from_default_env().is_test(true).build(),
            lines: Mutex::new(Vec::new()),
        }
    }

    fn captures(metadata: &Metadata) -> bool {
        metadata.level() <= log::Level::Info && metadata.target().starts_with("testgate")
    }
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        Self::captures(metadata) || self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if Self::captures(record.metadata()) {
            self.lines.lock().unwrap().push(record.args().to_string());
        }
        if self.inner.matches(record) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static LOGGER: OnceLock<CapturingLogger> = OnceLock::new();

pub(crate) fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let logger = LOGGER.get_or_init(CapturingLogger::new);
        if log::set_logger(logger).is_ok() {
            log::set_max_level(logger.inner.filter().max(LevelFilter::Info));
        }
    });
}

/// Captured `+++` lifecycle lines that mention `identity`, in emission order.
pub(crate) fn lifecycle_lines(identity: &str) -> Vec<String> {
    let Some(logger) = LOGGER.get() else {
        return Vec::new();
    };
    logger
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.starts_with("+++") && line.contains(identity))
        .cloned()
        .collect()
}

pub(crate) fn cpu_mem(cpu: u64, mem: u64) -> ResourceSet {
    ResourceSet::new().with("cpu", cpu).with("memory", mem)
}

pub(crate) fn cpus(cpu: u64) -> ResourceSet {
    ResourceSet::new().with("cpu", cpu)
}

/// Drives a [`Coordinator`] synchronously, without a control loop.
pub(crate) struct TestCoordinator {
    pub core: Coordinator,
    // Keeps the event channel open for grant tokens
    _sender: EventSender,
    receiver: UnboundedReceiver<CoordinatorEvent>,
    pub now: Instant,
}

impl TestCoordinator {
    pub fn new(total: ResourceSet) -> Self {
        Self::with_config(total, CoordinatorConfig::default())
    }

    pub fn with_config(total: ResourceSet, config: CoordinatorConfig) -> Self {
        init_logging();
        let (sender, receiver) = unbounded_channel();
        TestCoordinator {
            core: Coordinator::new(total, config, sender.downgrade()),
            _sender: sender,
            receiver,
            now: Instant::now(),
        }
    }

    pub fn enqueue(&mut self, identity: &str, demand: ResourceSet) -> WakeReceiver {
        let (wake, receiver) = tokio::sync::oneshot::channel();
        self.core.handle_event(
            CoordinatorEvent::Enqueue {
                identity: identity.to_string(),
                demand,
                wake,
            },
            self.now,
        );
        receiver
    }

    pub fn release(&mut self, grant: GrantInner) {
        self.core.handle_event(
            CoordinatorEvent::Release {
                identity: grant.identity,
                amount: grant.demand,
            },
            self.now,
        );
    }

    pub fn shutdown(&mut self) {
        self.core.handle_event(CoordinatorEvent::Shutdown, self.now);
    }

    /// Feeds events produced outside of the test, e.g. by dropped grant tokens.
    pub fn flush(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.core.handle_event(event, self.now);
            count += 1;
        }
        count
    }

    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
        self.core.expire_requests(self.now);
    }

    pub fn unallocated(&self, name: &str) -> ResourceAmount {
        self.core.pool().unallocated().amount(name)
    }
}

pub(crate) fn assert_granted(receiver: &mut WakeReceiver) -> GrantInner {
    match receiver.try_recv() {
        Ok(Ok(token)) => claim(token),
        Ok(Err(rejection)) => panic!("Request was rejected: {rejection:?}"),
        Err(e) => panic!("Request was not granted: {e:?}"),
    }
}

pub(crate) fn claim(token: GrantToken) -> GrantInner {
    token.claim().expect("Token already claimed")
}

pub(crate) fn assert_waiting(receiver: &mut WakeReceiver) {
    match receiver.try_recv() {
        Err(TryRecvError::Empty) => {}
        Ok(Ok(_)) => panic!("Request was granted"),
        Ok(Err(rejection)) => panic!("Request was rejected: {rejection:?}"),
        Err(TryRecvError::Closed) => panic!("Request was dropped"),
    }
}

pub(crate) fn assert_rejected(receiver: &mut WakeReceiver, expected: Rejection) {
    match receiver.try_recv() {
        Ok(Err(rejection)) => assert_eq!(rejection, expected),
        Ok(Ok(_)) => panic!("Request was granted"),
        Err(e) => panic!("Request was not rejected: {e:?}"),
    }
}

/// `unallocated + held == total` and `unallocated <= total` for every declared type.
pub(crate) fn assert_capacity_invariant<'a>(
    core: &Coordinator,
    held: impl IntoIterator<Item = &'a ResourceSet>,
) {
    let held: Vec<&ResourceSet> = held.into_iter().collect();
    let pool = core.pool();
    for (name, total) in pool.total().iter() {
        let unallocated = pool.unallocated().amount(name);
        let in_use: ResourceAmount = held.iter().map(|demand| demand.amount(name)).sum();
        assert!(unallocated <= total, "{name}: {unallocated} > {total}");
        assert_eq!(
            unallocated + in_use,
            total,
            "{name}: unallocated {unallocated} + held {in_use} != total {total}"
        );
    }
}

/// Polls `condition` on coordinator snapshots until it holds.
pub(crate) async fn wait_for_snapshot(
    client: &crate::internal::client::facade::AdmissionClient,
    condition: impl Fn(&crate::internal::coordinator::core::PoolSnapshot) -> bool,
) -> crate::internal::coordinator::core::PoolSnapshot {
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = client.snapshot().await.unwrap();
            if condition(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    result.expect("Snapshot condition was not reached")
}
