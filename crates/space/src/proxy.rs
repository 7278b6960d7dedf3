//! Coordinator-side agent for one worker.
//!
//! The proxy pulls ready tasks from the Space and hands them to its worker,
//! remembering each one until the worker reports back. If handing over fails,
//! every remembered task goes back on the ready queue and the worker is
//! dropped from the pool for good. A worker holding every slot is pinged
//! periodically so that a crash is noticed even when nothing is dispatched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::{
    Computer, CoreError, ProxyId, Shared, SpaceLink, Task, TaskContainer, TaskId, TaskResult,
};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::space::Space;

/// How long the proxy waits for a free slot before checking that the worker
/// holding all of them is still alive.
const SATURATED_CHECK_INTERVAL: Duration = Duration::from_millis(250);

struct InFlight {
    task: Task,
    _slot: OwnedSemaphorePermit,
}

pub struct ComputerProxy {
    id: ProxyId,
    computer: Arc<dyn Computer>,
    space: Arc<Space>,
    slots: Arc<Semaphore>,
    in_flight: Mutex<HashMap<TaskId, InFlight>>,
}

impl ComputerProxy {
    pub(crate) fn new(computer: Arc<dyn Computer>, space: Arc<Space>, capacity: usize) -> Self {
        Self {
            id: ProxyId::new(),
            computer,
            space,
            slots: Arc::new(Semaphore::new(capacity.max(1))),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> ProxyId {
        self.id
    }

    pub fn computer(&self) -> &Arc<dyn Computer> {
        &self.computer
    }

    pub fn in_flight_len(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<TaskId, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget a task whose outcome has come back, freeing its slot.
    fn complete(&self, origin: TaskId) {
        if self.cache().remove(&origin).is_none() {
            debug!(proxy_id = %self.id, task_id = %origin, "outcome for task not in flight");
        }
    }

    /// Dispatch loop. Ends on shutdown or on the first failed hand-over.
    pub(crate) async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        debug!(proxy_id = %self.id, "proxy started");
        loop {
            let next = tokio::select! {
                next = self.next_task() => next,
                _ = shutdown.wait_for(|stopped| *stopped) => break,
            };
            let (task, slot) = match next {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(error) => {
                    warn!(proxy_id = %self.id, %error, "saturated worker failed liveness check");
                    self.recover();
                    break;
                }
            };

            let task_id = task.id;
            self.cache().insert(
                task_id,
                InFlight {
                    task: task.clone(),
                    _slot: slot,
                },
            );
            debug!(proxy_id = %self.id, %task_id, level = task.level, "dispatching task");

            if let Err(error) = self.computer.enqueue(task).await {
                warn!(proxy_id = %self.id, %task_id, %error, "worker unreachable");
                self.recover();
                break;
            }
        }
        debug!(proxy_id = %self.id, "proxy stopped");
    }

    /// A free slot, then a task. `None` if the semaphore was closed. An
    /// error means the worker did not answer while it held every slot.
    async fn next_task(&self) -> Result<Option<(Task, OwnedSemaphorePermit)>, CoreError> {
        let slot = loop {
            let acquire = Arc::clone(&self.slots).acquire_owned();
            match tokio::time::timeout(SATURATED_CHECK_INTERVAL, acquire).await {
                Ok(Ok(slot)) => break slot,
                Ok(Err(_)) => return Ok(None),
                Err(_) => {
                    self.computer.get_shared().await?;
                }
            }
        };
        let task = self.space.take_task().await;
        Ok(Some((task, slot)))
    }

    /// Return every in-flight task to the ready queue and leave the pool.
    /// Returns how many tasks were requeued.
    pub fn recover(&self) -> usize {
        let orphans: Vec<Task> = self.cache().drain().map(|(_, entry)| entry.task).collect();
        let requeued = orphans.len();
        for task in orphans {
            self.space.put(task);
        }
        self.slots.close();
        self.space.deregister(self.id);
        info!(proxy_id = %self.id, requeued, "worker dropped, in-flight tasks requeued");
        requeued
    }
}

#[async_trait]
impl SpaceLink for ComputerProxy {
    async fn put_generated_tasks(
        &self,
        container: TaskContainer,
        origin: TaskId,
    ) -> Result<(), CoreError> {
        self.complete(origin);
        self.space.put_generated_tasks(container);
        Ok(())
    }

    async fn put_results(&self, result: TaskResult, origin: TaskId) -> Result<(), CoreError> {
        self.complete(origin);
        self.space.put_result(result);
        Ok(())
    }

    async fn set_shared(&self, shared: Shared) -> Result<(), CoreError> {
        self.space.set_shared(shared).await;
        Ok(())
    }
}
