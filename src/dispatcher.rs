// src/dispatcher.rs
use crate::{
    Job, JobHandle, JobObserver, QueueConfig, QueueError, QueueOptions, Result, RunnerStats,
    SequentialRunner,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tracing::info;

/// Builder for fluent dispatcher configuration
#[derive(Default)]
pub struct DispatcherBuilder {
    options: QueueOptions,
    observer: Option<Arc<dyn JobObserver>>,
    runtime: Option<Handle>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: QueueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_delay_between_messages_ms(mut self, ms: i64) -> Self {
        self.options.delay_between_messages_ms = ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Runtime the drain tasks are spawned on. Defaults to the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<KeyedDispatcher> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| QueueError::Runtime(e.to_string()))?,
        };

        Ok(KeyedDispatcher {
            config: Arc::new(QueueConfig::from(&self.options)),
            observer: self.observer,
            runtime,
            runners: Mutex::new(HashMap::new()),
        })
    }
}

/// Routes jobs to one [`SequentialRunner`] per key.
///
/// Jobs under the same key run one at a time in submission order; different
/// keys never wait on each other. Lanes are created on first use and live
/// as long as the dispatcher. Dropping the dispatcher does not cancel jobs
/// that were already submitted.
pub struct KeyedDispatcher {
    config: Arc<QueueConfig>,
    observer: Option<Arc<dyn JobObserver>>,
    runtime: Handle,
    runners: Mutex<HashMap<String, Arc<SequentialRunner>>>,
}

impl KeyedDispatcher {
    /// Dispatcher on the current Tokio runtime.
    pub fn new(options: QueueOptions) -> Result<Self> {
        DispatcherBuilder::new().with_options(options).build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Queue `job` on the lane for `key`. Returns without waiting; the
    /// outcome is only reported through logs and the observer.
    pub fn submit<J: Job>(&self, key: &str, job: J) {
        self.runner(key).enqueue(job);
    }

    /// Queue `job` on the lane for `key` and get a handle to await its outcome.
    pub fn submit_tracked<J: Job>(&self, key: &str, job: J) -> JobHandle {
        self.runner(key).enqueue_tracked(job)
    }

    fn runner(&self, key: &str) -> Arc<SequentialRunner> {
        let mut runners = self.lock_runners();
        if let Some(runner) = runners.get(key) {
            return Arc::clone(runner);
        }

        info!(key = %key, "Creating lane");
        let runner = Arc::new(SequentialRunner::new(
            key,
            Arc::clone(&self.config),
            self.observer.clone(),
            self.runtime.clone(),
        ));
        runners.insert(key.to_string(), Arc::clone(&runner));
        runner
    }

    /// The lane for `key`, if anything was ever submitted under it.
    pub fn lane(&self, key: &str) -> Option<Arc<SequentialRunner>> {
        self.lock_runners().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock_runners().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock_runners().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn lane_count(&self) -> usize {
        self.lock_runners().len()
    }

    pub fn stats(&self, key: &str) -> Option<RunnerStats> {
        self.lane(key).map(|runner| runner.stats())
    }

    fn lock_runners(&self) -> MutexGuard<'_, HashMap<String, Arc<SequentialRunner>>> {
        self.runners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for KeyedDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedDispatcher")
            .field("config", &self.config)
            .field("lanes", &self.lane_count())
            .finish_non_exhaustive()
    }
}
