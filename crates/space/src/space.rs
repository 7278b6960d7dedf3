//! The coordinator.
//!
//! Owns the ready queue, the table of successors waiting on children, the
//! registry of worker proxies and the queue of final results. Every non-final
//! result passes through a single intake loop, so delivering an argument and
//! retiring a ready successor never race with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::{
    ComputeSpace, Computer, CoreError, JoinProgress, ProxyId, Shared, SharedCell, SuccessorId,
    SuccessorTask, Task, TaskContainer, TaskResult,
};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::executor::SuccessorExecutor;
use crate::proxy::ComputerProxy;
use crate::queue::ReadyQueue;

pub struct Space {
    ready: ReadyQueue,
    intake: mpsc::UnboundedSender<TaskResult>,
    waiting: Mutex<HashMap<SuccessorId, Arc<SuccessorTask>>>,
    finals_tx: mpsc::UnboundedSender<TaskResult>,
    finals_rx: AsyncMutex<mpsc::UnboundedReceiver<TaskResult>>,
    executor: SuccessorExecutor,
    proxies: RwLock<HashMap<ProxyId, Arc<ComputerProxy>>>,
    shared: SharedCell,
    broadcasts: mpsc::UnboundedSender<()>,
    shutdown: watch::Sender<bool>,
}

impl Space {
    /// Create a Space and start its intake, executor and broadcaster tasks.
    /// Must be called inside a Tokio runtime.
    pub fn new() -> Arc<Self> {
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        let (finals_tx, finals_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let executor = SuccessorExecutor::spawn(intake_tx.clone());

        let space = Arc::new(Self {
            ready: ReadyQueue::new(),
            intake: intake_tx,
            waiting: Mutex::new(HashMap::new()),
            finals_tx,
            finals_rx: AsyncMutex::new(finals_rx),
            executor,
            proxies: RwLock::new(HashMap::new()),
            shared: SharedCell::new(),
            broadcasts: broadcast_tx,
            shutdown,
        });

        tokio::spawn(Self::intake_loop(Arc::downgrade(&space), intake_rx));
        tokio::spawn(Self::broadcast_loop(Arc::downgrade(&space), broadcast_rx));
        space
    }

    // ── Task intake ─────────────────────────────────────────────────

    pub fn put(&self, task: Task) {
        debug!(task_id = %task.id, level = task.level, "task queued");
        self.ready.push(task);
    }

    /// Next ready task for a proxy.
    pub async fn take_task(&self) -> Task {
        self.ready.take().await
    }

    /// A worker's leaf result.
    pub fn put_result(&self, result: TaskResult) {
        if self.intake.send(result).is_err() {
            warn!("result intake closed, dropping result");
        }
    }

    /// A worker's decomposition. The successor is registered before any
    /// child becomes takeable, so no child result can arrive ahead of it.
    pub fn put_generated_tasks(&self, container: TaskContainer) {
        let (successor, children) = container.into_parts();
        if children.is_empty() {
            self.put_pruned_result(successor);
            return;
        }

        debug!(
            successor_id = %successor.join_id(),
            children = children.len(),
            level = successor.level(),
            "successor waiting"
        );
        self.waiting_map().insert(successor.join_id(), Arc::new(successor));
        for child in children {
            self.ready.push(child);
        }
    }

    /// A successor created with nothing to join composes straight away,
    /// yielding a placeholder for its parent.
    pub fn put_pruned_result(&self, successor: SuccessorTask) {
        debug!(successor_id = %successor.join_id(), "branch pruned");
        self.executor.submit(Arc::new(successor));
    }

    fn waiting_map(&self) -> std::sync::MutexGuard<'_, HashMap<SuccessorId, Arc<SuccessorTask>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn intake_loop(space: Weak<Space>, mut intake_rx: mpsc::UnboundedReceiver<TaskResult>) {
        while let Some(result) = intake_rx.recv().await {
            let Some(space) = space.upgrade() else {
                break;
            };
            space.route(result);
        }
        debug!("result intake loop ended");
    }

    fn route(&self, result: TaskResult) {
        if result.is_final() {
            debug!(successor_id = %result.successor_id(), "final result ready");
            if self.finals_tx.send(result).is_err() {
                warn!("final result queue closed");
            }
            return;
        }

        let target = result.successor_id();
        let Some(successor) = self.waiting_map().get(&target).cloned() else {
            warn!(
                successor_id = %target,
                level = result.level(),
                "result for unknown successor dropped"
            );
            return;
        };

        match successor.put_argument(result) {
            Ok(JoinProgress::Ready) => {
                self.waiting_map().remove(&target);
                self.executor.submit(successor);
            }
            Ok(JoinProgress::Waiting(remaining)) => {
                debug!(successor_id = %target, remaining, "argument delivered");
            }
            Err(error) => warn!(successor_id = %target, %error, "argument rejected"),
        }
    }

    // ── Final results ───────────────────────────────────────────────

    /// Wait for the next final result.
    pub async fn take(&self) -> Result<TaskResult, CoreError> {
        self.finals_rx.lock().await.recv().await.ok_or(CoreError::Shutdown)
    }

    /// Like [`Space::take`], giving up after `wait`.
    pub async fn take_timeout(&self, wait: Duration) -> Result<Option<TaskResult>, CoreError> {
        match tokio::time::timeout(wait, self.take()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    // ── Shared value ────────────────────────────────────────────────

    pub fn shared(&self) -> Option<Shared> {
        self.shared.get()
    }

    /// Adopt `shared` if it improves on the current value, then broadcast it.
    /// The first value reaches every worker before this returns; later ones
    /// are broadcast in the background.
    pub async fn set_shared(&self, shared: Shared) {
        let first = self.shared.get().is_none();
        if !self.shared.offer(shared) {
            return;
        }
        info!(bound = shared.get(), "shared value adopted");
        if first {
            self.broadcast(shared).await;
        } else if self.broadcasts.send(()).is_err() {
            warn!("shared broadcaster stopped");
        }
    }

    async fn broadcast(&self, shared: Shared) {
        for proxy in self.registered() {
            if let Err(error) = proxy.computer().set_shared(shared, true).await {
                warn!(proxy_id = %proxy.id(), %error, "shared broadcast failed");
            }
        }
    }

    async fn broadcast_loop(space: Weak<Space>, mut broadcast_rx: mpsc::UnboundedReceiver<()>) {
        while broadcast_rx.recv().await.is_some() {
            // Later signals are covered by broadcasting the current value.
            while broadcast_rx.try_recv().is_ok() {}
            let Some(space) = space.upgrade() else {
                break;
            };
            if let Some(shared) = space.shared.get() {
                space.broadcast(shared).await;
            }
        }
    }

    // ── Worker registry ─────────────────────────────────────────────

    /// Add a worker and start its proxy. At most `capacity` tasks are in
    /// flight to it at once.
    pub async fn register(
        self: &Arc<Self>,
        computer: Arc<dyn Computer>,
        capacity: usize,
    ) -> Arc<ComputerProxy> {
        if let Some(shared) = self.shared.get() {
            if let Err(error) = computer.set_shared(shared, true).await {
                warn!(%error, "could not seed shared value on new worker");
            }
        }

        let proxy = Arc::new(ComputerProxy::new(computer, Arc::clone(self), capacity));
        self.proxies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(proxy.id(), Arc::clone(&proxy));
        info!(proxy_id = %proxy.id(), capacity, "worker registered");

        tokio::spawn(Arc::clone(&proxy).run(self.shutdown.subscribe()));
        proxy
    }

    pub fn deregister(&self, proxy_id: ProxyId) -> bool {
        let removed = self
            .proxies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&proxy_id)
            .is_some();
        if removed {
            info!(proxy_id = %proxy_id, "worker deregistered");
        }
        removed
    }

    pub fn proxy(&self, proxy_id: ProxyId) -> Option<Arc<ComputerProxy>> {
        self.proxies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&proxy_id)
            .cloned()
    }

    pub fn registered(&self) -> Vec<Arc<ComputerProxy>> {
        self.proxies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Ask every worker to stop, forget them, and signal shutdown.
    pub async fn shutdown(&self) {
        let proxies: Vec<_> = self
            .proxies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, proxy)| proxy)
            .collect();
        info!(workers = proxies.len(), "space shutting down");

        for proxy in proxies {
            if let Err(error) = proxy.computer().shutdown().await {
                debug!(proxy_id = %proxy.id(), %error, "worker shutdown call failed");
            }
        }
        self.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once [`Space::shutdown`] has run.
    pub async fn closed(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives in `self`, so this only errors if it is dropped.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    // ── Observability ───────────────────────────────────────────────

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting_map().len()
    }

    pub fn registered_len(&self) -> usize {
        self.proxies.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ComputeSpace for Space {
    async fn put(&self, task: Task) -> Result<(), CoreError> {
        Space::put(self, task);
        Ok(())
    }

    async fn take(&self) -> Result<TaskResult, CoreError> {
        Space::take(self).await
    }

    async fn compute(&self, task: Task, seed: Option<Shared>) -> Result<TaskResult, CoreError> {
        if let Some(shared) = seed {
            self.set_shared(shared).await;
        }
        Space::put(self, task);
        Space::take(self).await
    }

    async fn shutdown(&self) -> Result<(), CoreError> {
        Space::shutdown(self).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fanout_core::{Composer, Fibonacci, ResultValue, Workload, FINAL_LEVEL};

    use super::*;

    #[tokio::test]
    async fn final_result_reaches_take() {
        let space = Space::new();
        let id = SuccessorId::new();
        space.put_result(TaskResult::new(Some(ResultValue::Fibonacci(3)), FINAL_LEVEL, id));

        let result = space.take_timeout(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(result.successor_id(), id);
    }

    #[tokio::test]
    async fn successor_registered_before_children_are_visible() {
        let space = Space::new();
        let task = Task::new(Workload::Fibonacci(Fibonacci::new(3)));
        let container = task.generate(SuccessorId::new(), &SharedCell::new()).unwrap();

        space.put_generated_tasks(container);
        assert_eq!(space.waiting_len(), 1);
        assert_eq!(space.ready_len(), 2);
    }

    #[tokio::test]
    async fn pruned_container_yields_placeholder_at_parent_level() {
        let space = Space::new();
        let parent = SuccessorId::new();
        let successor = SuccessorTask::new(SuccessorId::new(), parent, 0, Composer::TspMinimum, 0);
        let container = TaskContainer::new(successor, Vec::new()).unwrap();

        space.put_generated_tasks(container);
        let result = space.take_timeout(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(result.level(), FINAL_LEVEL);
        assert_eq!(result.successor_id(), parent);
        assert_eq!(result.value(), None);
        assert_eq!(space.waiting_len(), 0);
    }

    #[tokio::test]
    async fn set_shared_keeps_the_smaller_bound() {
        let space = Space::new();
        space.set_shared(Shared::new(10.0)).await;
        space.set_shared(Shared::new(12.0)).await;
        space.set_shared(Shared::new(7.5)).await;
        assert_eq!(space.shared(), Some(Shared::new(7.5)));
    }

    #[tokio::test]
    async fn take_times_out_when_nothing_is_final() {
        let space = Space::new();
        assert_eq!(space.take_timeout(Duration::from_millis(50)).await, Ok(None));
    }
}
