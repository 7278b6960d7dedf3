//! Exposes a [`LocalComputer`] to its proxy on a ROUTER socket.

use std::sync::Arc;

use fanout_core::{Computer, CoreError};
use fanout_wire::{
    topics, ComputerReply, ComputerRequest, Message, ReplyToken, RequestHandler, Transport,
    WireError, ZmqRequestServer,
};
use tracing::{info, instrument, warn};

use crate::computer::LocalComputer;

pub struct ComputerService {
    computer: Arc<LocalComputer>,
    server: Arc<ZmqRequestServer>,
}

impl ComputerService {
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(
        computer: Arc<LocalComputer>,
        transport: &Transport,
    ) -> Result<Self, WireError> {
        let server = ZmqRequestServer::bind(transport).await?;
        info!("computer service listening");
        Ok(Self {
            computer,
            server: Arc::new(server),
        })
    }

    pub fn computer(&self) -> &Arc<LocalComputer> {
        &self.computer
    }

    /// Serve until the worker shuts down.
    pub async fn run(&self) -> Result<(), WireError> {
        loop {
            let (token, msg) = tokio::select! {
                request = self.server.recv_request() => request?,
                _ = self.computer.closed() => break,
            };
            let computer = Arc::clone(&self.computer);
            let server = Arc::clone(&self.server);
            tokio::spawn(async move {
                Self::handle(computer, server, token, msg).await;
            });
        }
        info!("computer service stopped");
        Ok(())
    }

    async fn handle(
        computer: Arc<LocalComputer>,
        server: Arc<ZmqRequestServer>,
        token: ReplyToken,
        msg: Message,
    ) {
        let reply = match msg.decode::<ComputerRequest>() {
            Ok(request) => match Self::dispatch(&computer, request).await {
                Ok(reply) => reply,
                Err(error) => ComputerReply::Error {
                    message: error.to_string(),
                },
            },
            Err(e) => {
                warn!(error = %e, topic = %msg.topic, "undecodable computer request");
                ComputerReply::Error {
                    message: format!("bad request: {e}"),
                }
            }
        };

        match msg.reply(topics::COMPUTER_REPLY, &reply) {
            Ok(out) => {
                if let Err(e) = server.send_reply(token, out).await {
                    warn!(error = %e, "failed to send computer reply");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode computer reply"),
        }
    }

    async fn dispatch(
        computer: &LocalComputer,
        request: ComputerRequest,
    ) -> Result<ComputerReply, CoreError> {
        match request {
            ComputerRequest::Enqueue { task } => {
                computer.enqueue(task).await?;
                Ok(ComputerReply::Ack)
            }
            ComputerRequest::Execute { task } => {
                Ok(ComputerReply::Result(computer.execute(task).await?))
            }
            ComputerRequest::Generate { task, successor_id } => Ok(ComputerReply::Container(
                computer.generate(task, successor_id).await?,
            )),
            ComputerRequest::SetShared { shared, from_space } => {
                computer.set_shared(shared, from_space).await?;
                Ok(ComputerReply::Ack)
            }
            ComputerRequest::GetShared => Ok(ComputerReply::Shared(computer.get_shared().await?)),
            // The reply is queued before the loop notices the shutdown.
            ComputerRequest::Shutdown => {
                computer.shutdown().await?;
                Ok(ComputerReply::Ack)
            }
        }
    }
}
