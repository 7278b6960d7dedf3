//! Exposes a [`Space`] on a ROUTER socket.
//!
//! Each request is handled on its own task, so a long `Take` poll does not
//! hold up workers reporting results.

use std::sync::Arc;
use std::time::Duration;

use fanout_core::{CoreError, SpaceLink};
use fanout_wire::{
    topics, ComputerClient, Message, ReplyToken, RequestHandler, SpaceReply, SpaceRequest,
    Transport, WireError, ZmqRequestServer,
};
use tracing::{debug, info, instrument, warn};

use crate::space::Space;

pub struct SpaceService {
    space: Arc<Space>,
    server: Arc<ZmqRequestServer>,
    computer_call_timeout: Duration,
}

impl SpaceService {
    /// Bind the service. `computer_call_timeout` applies to calls made to
    /// workers that register through it.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(
        space: Arc<Space>,
        transport: &Transport,
        computer_call_timeout: Duration,
    ) -> Result<Self, WireError> {
        let server = ZmqRequestServer::bind(transport).await?;
        info!("space service listening");
        Ok(Self {
            space,
            server: Arc::new(server),
            computer_call_timeout,
        })
    }

    pub fn space(&self) -> &Arc<Space> {
        &self.space
    }

    /// Serve until the Space shuts down.
    pub async fn run(&self) -> Result<(), WireError> {
        loop {
            let (token, msg) = tokio::select! {
                request = self.server.recv_request() => request?,
                _ = self.space.closed() => break,
            };
            let space = Arc::clone(&self.space);
            let server = Arc::clone(&self.server);
            let timeout = self.computer_call_timeout;
            tokio::spawn(async move {
                Self::handle(space, server, token, msg, timeout).await;
            });
        }
        info!("space service stopped");
        Ok(())
    }

    async fn handle(
        space: Arc<Space>,
        server: Arc<ZmqRequestServer>,
        token: ReplyToken,
        msg: Message,
        computer_call_timeout: Duration,
    ) {
        let request = match msg.decode::<SpaceRequest>() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, topic = %msg.topic, "undecodable space request");
                let reply = SpaceReply::Error {
                    message: format!("bad request: {e}"),
                };
                Self::reply(&server, token, &msg, &reply).await;
                return;
            }
        };

        let is_shutdown = matches!(request, SpaceRequest::Shutdown);
        let reply = match Self::dispatch(&space, request, computer_call_timeout).await {
            Ok(reply) => reply,
            Err(error) => SpaceReply::Error {
                message: error.to_string(),
            },
        };
        Self::reply(&server, token, &msg, &reply).await;

        // Acknowledge first so the caller is not left waiting on a dead peer.
        if is_shutdown {
            space.shutdown().await;
        }
    }

    async fn dispatch(
        space: &Arc<Space>,
        request: SpaceRequest,
        computer_call_timeout: Duration,
    ) -> Result<SpaceReply, CoreError> {
        match request {
            SpaceRequest::Register { endpoint, capacity } => {
                let transport = Transport::parse(&endpoint)?;
                let computer = ComputerClient::connect(&transport, computer_call_timeout).await?;
                let proxy = space.register(Arc::new(computer), capacity).await;
                Ok(SpaceReply::Registered { proxy_id: proxy.id() })
            }
            SpaceRequest::Put { task } => {
                space.put(task);
                Ok(SpaceReply::Ack)
            }
            SpaceRequest::Take { wait_ms } => {
                match space.take_timeout(Duration::from_millis(wait_ms)).await? {
                    Some(result) => Ok(SpaceReply::Result(result)),
                    None => Ok(SpaceReply::Empty),
                }
            }
            SpaceRequest::SetShared { shared } => {
                space.set_shared(shared).await;
                Ok(SpaceReply::Ack)
            }
            SpaceRequest::PutResult { proxy_id, result, origin } => {
                match space.proxy(proxy_id) {
                    Some(proxy) => proxy.put_results(result, origin).await?,
                    None => {
                        debug!(%proxy_id, "result from deregistered worker");
                        space.put_result(result);
                    }
                }
                Ok(SpaceReply::Ack)
            }
            SpaceRequest::PutGenerated { proxy_id, container, origin } => {
                match space.proxy(proxy_id) {
                    Some(proxy) => proxy.put_generated_tasks(container, origin).await?,
                    None => {
                        debug!(%proxy_id, "decomposition from deregistered worker");
                        space.put_generated_tasks(container);
                    }
                }
                Ok(SpaceReply::Ack)
            }
            SpaceRequest::Shutdown => Ok(SpaceReply::Ack),
        }
    }

    async fn reply(
        server: &ZmqRequestServer,
        token: ReplyToken,
        request: &Message,
        reply: &SpaceReply,
    ) {
        let msg = match request.reply(topics::SPACE_REPLY, reply) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "failed to encode space reply");
                return;
            }
        };
        if let Err(e) = server.send_reply(token, msg).await {
            warn!(error = %e, "failed to send space reply");
        }
    }
}
