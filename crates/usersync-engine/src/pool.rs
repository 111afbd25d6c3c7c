//! Bounded partition pool
//!
//! Runs partitions through a worker with at most `concurrency` partitions in
//! flight. Mutations on the same project are serialized through a per-project
//! lock. Events are buffered per partition and merged in partition order.
//!
//! ## Failure handling
//!
//! - **Strict** (failures not tolerated): the first failing partition cancels
//!   all outstanding work and its error is returned.
//! - **Tolerant**: a failing partition contributes one `error` event and its
//!   siblings carry on.
//!
//! With a concurrency of 1 partitions run inline, one after another.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use usersync_core::domain::ResultEvent;

use crate::partition::Partition;
use crate::SyncError;

type ProjectLock = Arc<tokio::sync::Mutex<()>>;

/// Executes partitions with bounded concurrency
pub struct PartitionPool {
    concurrency: usize,
    tolerant: bool,
    locks: Mutex<HashMap<String, ProjectLock>>,
}

impl PartitionPool {
    /// Creates a pool; a concurrency of 0 is treated as 1
    pub fn new(concurrency: usize, tolerant: bool) -> Self {
        Self {
            concurrency: concurrency.max(1),
            tolerant,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn lock_for(&self, pid: &str) -> ProjectLock {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(pid.to_string()).or_default())
    }

    fn absorb(&self, key: &str, err: SyncError) -> Result<Vec<ResultEvent>, SyncError> {
        if self.tolerant {
            warn!(partition = %key, error = %err, "Partition failed, continuing");
            Ok(vec![ResultEvent::error(key, err.to_string()).with_partition(key)])
        } else {
            Err(err)
        }
    }

    /// Runs every partition through `worker`
    ///
    /// # Errors
    /// In strict mode, the first partition failure.
    pub async fn run<F, Fut>(
        &self,
        partitions: Vec<Partition>,
        worker: F,
    ) -> Result<Vec<ResultEvent>, SyncError>
    where
        F: Fn(Partition) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<ResultEvent>, SyncError>> + Send + 'static,
    {
        if self.concurrency == 1 || partitions.len() <= 1 {
            return self.run_sequential(partitions, worker).await;
        }

        let total = partitions.len();
        let worker = Arc::new(worker);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let token = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for (index, partition) in partitions.into_iter().enumerate() {
            let worker = Arc::clone(&worker);
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();
            let lock = self.lock_for(partition.target.pid().as_str());
            let key = partition.key.clone();

            tasks.spawn(async move {
                let result = tokio::select! {
                    _ = token.cancelled() => Err(SyncError::Cancelled),
                    result = async {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|_| SyncError::Cancelled)?;
                        let _guard = lock.lock().await;
                        worker(partition).await
                    } => result,
                };
                (index, key, result)
            });
        }

        let mut buffers: Vec<Option<Vec<ResultEvent>>> = vec![None; total];
        let mut first_error: Option<SyncError> = None;

        while let Some(joined) = tasks.join_next().await {
            let (index, key, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let err = SyncError::TaskFailed(e.to_string());
                    if self.tolerant {
                        warn!(error = %err, "Partition task failed, continuing");
                    } else if first_error.is_none() {
                        token.cancel();
                        first_error = Some(err);
                    }
                    continue;
                }
            };

            match result {
                Ok(events) => buffers[index] = Some(events),
                Err(SyncError::Cancelled) => debug!(partition = %key, "Partition cancelled"),
                Err(err) => match self.absorb(&key, err) {
                    Ok(events) => buffers[index] = Some(events),
                    Err(err) => {
                        if first_error.is_none() {
                            token.cancel();
                            first_error = Some(err);
                        }
                    }
                },
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        Ok(buffers.into_iter().flatten().flatten().collect())
    }

    async fn run_sequential<F, Fut>(
        &self,
        partitions: Vec<Partition>,
        worker: F,
    ) -> Result<Vec<ResultEvent>, SyncError>
    where
        F: Fn(Partition) -> Fut,
        Fut: Future<Output = Result<Vec<ResultEvent>, SyncError>>,
    {
        let mut events = Vec::new();
        for partition in partitions {
            let key = partition.key.clone();
            match worker(partition).await {
                Ok(partition_events) => events.extend(partition_events),
                Err(err) => events.extend(self.absorb(&key, err)?),
            }
        }
        Ok(events)
    }
}
