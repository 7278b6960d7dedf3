//! The worker.
//!
//! Tasks handed over by the proxy run on a fixed rayon pool. Each one either
//! decomposes or executes, and its outcome is queued for the link back to
//! the proxy. A drain task owns that link, so a slow or failing link never
//! blocks execution threads.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use fanout_core::{
    Computer, CoreError, Shared, SharedAccess, SharedCell, SpaceLink, SuccessorId, Task,
    TaskContainer, TaskId, TaskResult,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::error::ComputerError;

/// Notifications from the worker to its proxy.
#[derive(Debug)]
enum Outbound {
    Generated { container: TaskContainer, origin: TaskId },
    Result { result: TaskResult, origin: TaskId },
    SetShared(Shared),
}

/// State visible to running tasks.
struct ExecutionContext {
    shared: SharedCell,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ExecutionContext {
    fn notify(&self, outbound: Outbound) {
        if self.outbound.send(outbound).is_err() {
            debug!("outbound queue closed, dropping notification");
        }
    }

    fn process(&self, task: Task) {
        let origin = task.id;
        if task.is_decomposable() {
            match task.generate(SuccessorId::new(), self) {
                Ok(container) => {
                    debug!(
                        task_id = %origin,
                        children = container.children().len(),
                        level = task.level,
                        "task decomposed"
                    );
                    self.notify(Outbound::Generated { container, origin });
                }
                Err(error) => warn!(task_id = %origin, %error, "task decomposition failed"),
            }
        } else {
            match task.execute(self) {
                Ok(result) => {
                    debug!(task_id = %origin, level = task.level, "task executed");
                    self.notify(Outbound::Result { result, origin });
                }
                Err(error) => warn!(task_id = %origin, %error, "task execution failed"),
            }
        }
    }
}

impl SharedAccess for ExecutionContext {
    fn shared(&self) -> Option<Shared> {
        self.shared.get()
    }

    /// Adopt locally first; the coordinator hears about it asynchronously.
    fn propose(&self, candidate: Shared) -> bool {
        let adopted = self.shared.offer(candidate);
        if adopted {
            self.notify(Outbound::SetShared(candidate));
        }
        adopted
    }
}

pub struct LocalComputer {
    context: Arc<ExecutionContext>,
    pool: rayon::ThreadPool,
    threads: usize,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl LocalComputer {
    pub fn new(threads: usize) -> Result<Self, ComputerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fanout-exec-{i}"))
            .panic_handler(|_| error!("task panicked on execution pool"))
            .build()?;
        let threads = pool.current_num_threads();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        info!(threads, "worker pool ready");

        Ok(Self {
            context: Arc::new(ExecutionContext {
                shared: SharedCell::new(),
                outbound,
            }),
            pool,
            threads,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// In-flight budget advertised to the proxy.
    pub fn capacity(&self) -> usize {
        self.threads * 2
    }

    /// Start delivering outcomes through `link`. Outcomes produced before
    /// this call are buffered. Returns false if a link is already attached.
    pub fn attach(&self, link: Arc<dyn SpaceLink>) -> bool {
        let Some(outbound_rx) = self
            .outbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("worker already attached to a space link");
            return false;
        };
        tokio::spawn(Self::drain(outbound_rx, link, Arc::clone(&self.shutdown)));
        true
    }

    /// Deliver outcomes in order. An outcome that cannot be delivered would
    /// leave its task in flight on the proxy forever, so the worker stops
    /// instead; the proxy's next call then fails and it requeues everything.
    async fn drain(
        mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
        link: Arc<dyn SpaceLink>,
        shutdown: Arc<watch::Sender<bool>>,
    ) {
        while let Some(outbound) = outbound_rx.recv().await {
            match outbound {
                Outbound::Generated { container, origin } => {
                    if let Err(error) = link.put_generated_tasks(container, origin).await {
                        error!(task_id = %origin, %error, "lost decomposition, stopping worker");
                        shutdown.send_replace(true);
                        break;
                    }
                }
                Outbound::Result { result, origin } => {
                    if let Err(error) = link.put_results(result, origin).await {
                        error!(task_id = %origin, %error, "lost result, stopping worker");
                        shutdown.send_replace(true);
                        break;
                    }
                }
                Outbound::SetShared(shared) => {
                    if let Err(error) = link.set_shared(shared).await {
                        warn!(bound = shared.get(), %error, "failed to publish shared value");
                    }
                }
            }
        }
        debug!("outbound drain ended");
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once the worker has been told to shut down.
    pub async fn closed(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    fn ensure_running(&self) -> Result<(), CoreError> {
        if self.is_shut_down() {
            Err(CoreError::Shutdown)
        } else {
            Ok(())
        }
    }

    /// Run `job` on the pool and await its output.
    async fn on_pool<T, F>(&self, job: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&ExecutionContext) -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let context = Arc::clone(&self.context);
        self.pool.spawn(move || {
            let _ = tx.send(job(context.as_ref()));
        });
        rx.await.map_err(|_| CoreError::Shutdown)
    }
}

#[async_trait]
impl Computer for LocalComputer {
    async fn enqueue(&self, task: Task) -> Result<(), CoreError> {
        self.ensure_running()?;
        let context = Arc::clone(&self.context);
        self.pool.spawn(move || context.process(task));
        Ok(())
    }

    async fn execute(&self, task: Task) -> Result<TaskResult, CoreError> {
        self.ensure_running()?;
        self.on_pool(move |context| task.execute(context)).await?
    }

    async fn generate(
        &self,
        task: Task,
        successor_id: SuccessorId,
    ) -> Result<TaskContainer, CoreError> {
        self.ensure_running()?;
        self.on_pool(move |context| task.generate(successor_id, context)).await?
    }

    async fn set_shared(&self, shared: Shared, from_space: bool) -> Result<(), CoreError> {
        let adopted = self.context.shared.offer(shared);
        debug!(bound = shared.get(), from_space, adopted, "shared value offered");
        if adopted && !from_space {
            self.context.notify(Outbound::SetShared(shared));
        }
        Ok(())
    }

    /// Also serves as the proxy's liveness check, so it fails once stopped.
    async fn get_shared(&self) -> Result<Option<Shared>, CoreError> {
        self.ensure_running()?;
        Ok(self.context.shared.get())
    }

    async fn shutdown(&self) -> Result<(), CoreError> {
        info!("worker shutting down");
        self.shutdown.send_replace(true);
        Ok(())
    }
}
