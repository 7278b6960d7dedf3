//! Typed stubs for calling a remote Space or a remote worker.
//!
//! Each stub owns a DEALER connection and implements the matching seam
//! trait from `fanout_core`, so the Space cannot tell a remote worker from a
//! local one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::{
    ComputeSpace, Computer, CoreError, ProxyId, Shared, SpaceLink, SuccessorId, Task,
    TaskContainer, TaskId, TaskResult,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use crate::config::FanoutConfig;
use crate::error::WireError;
use crate::message::Message;
use crate::messages::{topics, ComputerReply, ComputerRequest, SpaceReply, SpaceRequest};
use crate::reqrep::ZmqRequestClient;
use crate::traits::RequestSender;
use crate::transport::Transport;

async fn call<Req: Serialize, Rep: DeserializeOwned>(
    client: &ZmqRequestClient,
    topic: &str,
    request: &Req,
    timeout: Duration,
) -> Result<Rep, WireError> {
    let msg = Message::new(topic, request)?;
    let reply = client.request(msg, timeout).await?;
    Ok(reply.decode()?)
}

fn unexpected(reply: impl std::fmt::Debug) -> WireError {
    WireError::UnexpectedReply(format!("{reply:?}"))
}

// ── Space ───────────────────────────────────────────────────────────

/// Connection to a Space service, used by clients and by workers.
pub struct SpaceClient {
    client: ZmqRequestClient,
    call_timeout: Duration,
    take_wait: Duration,
}

impl SpaceClient {
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(
        transport: &Transport,
        call_timeout: Duration,
        take_wait: Duration,
    ) -> Result<Self, WireError> {
        Ok(Self {
            client: ZmqRequestClient::connect(transport).await?,
            call_timeout,
            take_wait,
        })
    }

    pub async fn from_config(config: &FanoutConfig) -> Result<Self, WireError> {
        Self::connect(
            &config.space_transport()?,
            config.space_call_timeout(),
            config.take_wait(),
        )
        .await
    }

    async fn call(&self, request: &SpaceRequest) -> Result<SpaceReply, WireError> {
        match call(&self.client, topics::SPACE_REQUEST, request, self.call_timeout).await? {
            SpaceReply::Error { message } => Err(WireError::Remote(message)),
            reply => Ok(reply),
        }
    }

    async fn call_ack(&self, request: &SpaceRequest) -> Result<(), WireError> {
        match self.call(request).await? {
            SpaceReply::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Announce a worker listening on `endpoint`; returns its proxy id.
    pub async fn register(&self, endpoint: &str, capacity: usize) -> Result<ProxyId, WireError> {
        let request = SpaceRequest::Register {
            endpoint: endpoint.to_string(),
            capacity,
        };
        match self.call(&request).await? {
            SpaceReply::Registered { proxy_id } => Ok(proxy_id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn set_shared(&self, shared: Shared) -> Result<(), WireError> {
        self.call_ack(&SpaceRequest::SetShared { shared }).await
    }

    /// One long-poll; `None` if nothing became final within the wait.
    pub async fn try_take(&self) -> Result<Option<TaskResult>, WireError> {
        let wait_ms = u64::try_from(self.take_wait.as_millis()).unwrap_or(u64::MAX);
        match self.call(&SpaceRequest::Take { wait_ms }).await? {
            SpaceReply::Result(result) => Ok(Some(result)),
            SpaceReply::Empty => Ok(None),
            other => Err(unexpected(other)),
        }
    }
}

#[async_trait]
impl ComputeSpace for SpaceClient {
    async fn put(&self, task: Task) -> Result<(), CoreError> {
        Ok(self.call_ack(&SpaceRequest::Put { task }).await?)
    }

    async fn take(&self) -> Result<TaskResult, CoreError> {
        loop {
            if let Some(result) = self.try_take().await? {
                return Ok(result);
            }
            debug!("no final result yet, polling again");
        }
    }

    async fn compute(&self, task: Task, seed: Option<Shared>) -> Result<TaskResult, CoreError> {
        if let Some(shared) = seed {
            self.set_shared(shared).await?;
        }
        self.put(task).await?;
        self.take().await
    }

    async fn shutdown(&self) -> Result<(), CoreError> {
        Ok(self.call_ack(&SpaceRequest::Shutdown).await?)
    }
}

/// A worker's path back to its proxy in a remote Space.
pub struct ProxyLink {
    space: Arc<SpaceClient>,
    proxy_id: ProxyId,
}

impl ProxyLink {
    pub fn new(space: Arc<SpaceClient>, proxy_id: ProxyId) -> Self {
        Self { space, proxy_id }
    }

    pub fn proxy_id(&self) -> ProxyId {
        self.proxy_id
    }
}

#[async_trait]
impl SpaceLink for ProxyLink {
    async fn put_generated_tasks(
        &self,
        container: TaskContainer,
        origin: TaskId,
    ) -> Result<(), CoreError> {
        let request = SpaceRequest::PutGenerated {
            proxy_id: self.proxy_id,
            container,
            origin,
        };
        Ok(self.space.call_ack(&request).await?)
    }

    async fn put_results(&self, result: TaskResult, origin: TaskId) -> Result<(), CoreError> {
        let request = SpaceRequest::PutResult {
            proxy_id: self.proxy_id,
            result,
            origin,
        };
        Ok(self.space.call_ack(&request).await?)
    }

    async fn set_shared(&self, shared: Shared) -> Result<(), CoreError> {
        Ok(self.space.set_shared(shared).await?)
    }
}

// ── Computer ────────────────────────────────────────────────────────

/// Connection from the Space to one worker's service.
pub struct ComputerClient {
    client: ZmqRequestClient,
    call_timeout: Duration,
}

impl ComputerClient {
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport, call_timeout: Duration) -> Result<Self, WireError> {
        Ok(Self {
            client: ZmqRequestClient::connect(transport).await?,
            call_timeout,
        })
    }

    async fn call(&self, request: &ComputerRequest) -> Result<ComputerReply, WireError> {
        match call(&self.client, topics::COMPUTER_REQUEST, request, self.call_timeout).await? {
            ComputerReply::Error { message } => Err(WireError::Remote(message)),
            reply => Ok(reply),
        }
    }

    async fn call_ack(&self, request: &ComputerRequest) -> Result<(), CoreError> {
        match self.call(request).await? {
            ComputerReply::Ack => Ok(()),
            other => Err(unexpected(other).into()),
        }
    }
}

#[async_trait]
impl Computer for ComputerClient {
    async fn enqueue(&self, task: Task) -> Result<(), CoreError> {
        self.call_ack(&ComputerRequest::Enqueue { task }).await
    }

    async fn execute(&self, task: Task) -> Result<TaskResult, CoreError> {
        match self.call(&ComputerRequest::Execute { task }).await? {
            ComputerReply::Result(result) => Ok(result),
            other => Err(unexpected(other).into()),
        }
    }

    async fn generate(
        &self,
        task: Task,
        successor_id: SuccessorId,
    ) -> Result<TaskContainer, CoreError> {
        match self.call(&ComputerRequest::Generate { task, successor_id }).await? {
            ComputerReply::Container(container) => Ok(container),
            other => Err(unexpected(other).into()),
        }
    }

    async fn set_shared(&self, shared: Shared, from_space: bool) -> Result<(), CoreError> {
        self.call_ack(&ComputerRequest::SetShared { shared, from_space }).await
    }

    async fn get_shared(&self) -> Result<Option<Shared>, CoreError> {
        match self.call(&ComputerRequest::GetShared).await? {
            ComputerReply::Shared(shared) => Ok(shared),
            other => Err(unexpected(other).into()),
        }
    }

    async fn shutdown(&self) -> Result<(), CoreError> {
        self.call_ack(&ComputerRequest::Shutdown).await
    }
}
