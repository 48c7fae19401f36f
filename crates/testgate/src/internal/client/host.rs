/// What the admission client needs from the test runner hosting a task.
pub trait TaskHost {
    /// Identity of the task, used as the key of its pending request.
    fn identity(&self) -> String;

    /// Hands the task over to the runner's own parallel scheduling.
    fn mark_parallel(&self) {}

    /// Called when the task can never be admitted.
    fn skip(&self, reason: &str);

    fn fail(&self, reason: &str) -> ! {
        panic!("{}: {reason}", self.identity())
    }
}

/// Host for tests run by the built-in libtest harness.
///
/// Libtest runs every test on a thread named after the test path and runs tests
/// in parallel by default, so nothing has to be done to mark a test parallel.
/// With `--test-threads=1` tests run on the main thread and share one identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibtestHost;

impl TaskHost for LibtestHost {
    fn identity(&self) -> String {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => name.to_string(),
            None => format!("{:?}", thread.id()),
        }
    }

    fn skip(&self, reason: &str) {
        log::warn!("Skipping {}: {reason}", self.identity());
    }
}

/// Host with an explicit identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTask {
    name: String,
}

impl NamedTask {
    pub fn new(name: impl Into<String>) -> Self {
        NamedTask { name: name.into() }
    }
}

impl TaskHost for NamedTask {
    fn identity(&self) -> String {
        self.name.clone()
    }

    fn skip(&self, reason: &str) {
        log::info!("Skipping {}: {reason}", self.name);
    }
}
