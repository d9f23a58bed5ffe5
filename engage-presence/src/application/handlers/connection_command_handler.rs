//! 连接命令处理器：ConnectUser / DisconnectUser

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::application::commands::{ConnectUserCommand, DisconnectUserCommand};
use crate::domain::event::{
    CommercialConnectedEvent, CommercialDisconnectedEvent, ConnectedEvent, DisconnectedEvent,
    PresenceEvent,
};
use crate::domain::model::Connection;
use crate::domain::repository::{
    AccountCompanyLookup, ConnectionRepository, EventPublisher, PresenceSignal, RoleBroadcaster,
};
use crate::domain::value_object::Role;
use crate::error::PresenceResult;

pub struct ConnectionCommandHandler {
    connections: Arc<dyn ConnectionRepository>,
    accounts: Arc<dyn AccountCompanyLookup>,
    publisher: Arc<dyn EventPublisher>,
    broadcaster: Arc<dyn RoleBroadcaster>,
}

impl ConnectionCommandHandler {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        accounts: Arc<dyn AccountCompanyLookup>,
        publisher: Arc<dyn EventPublisher>,
        broadcaster: Arc<dyn RoleBroadcaster>,
    ) -> Self {
        Self {
            connections,
            accounts,
            publisher,
            broadcaster,
        }
    }

    /// 处理连接命令
    ///
    /// 同一 user_id 重复连接时替换套接字，始终只保留一条记录
    #[instrument(skip(self, command), fields(user_id = %command.user_id, socket_id = %command.socket_id))]
    pub async fn handle_connect(&self, command: ConnectUserCommand) -> PresenceResult<Connection> {
        let ConnectUserCommand {
            user_id,
            roles,
            socket_id,
            company_id,
        } = command;

        let mut connection = match self.connections.find_by_id(&user_id).await? {
            Some(existing) => existing,
            None => {
                let company_id = match company_id {
                    Some(company_id) => company_id,
                    None => self.accounts.company_of(&user_id).await?,
                };
                Connection::new(user_id.clone(), roles.iter().copied(), company_id)?
            }
        };

        if let Some(previous) = connection.connect(socket_id) {
            debug!(previous_socket = %previous, "Replacing previous socket");
        }
        self.connections.save(&connection).await?;
        info!("User connected");

        self.publish(
            ConnectedEvent {
                connection: connection.clone(),
                occurred_at: Utc::now(),
            }
            .into(),
        )
        .await;

        self.broadcast(PresenceSignal::UserConnected {
            user_id: user_id.clone(),
        })
        .await;

        // 重连沿用已保存的角色，只有注册表里的商务连接才触发分配
        if roles.contains(&Role::Commercial) && !connection.has_role(Role::Commercial) {
            warn!("Connect requested commercial role not held by stored connection, ignoring");
        }
        if connection.has_role(Role::Commercial) {
            match self.connections.find_by_id(&user_id).await {
                Ok(Some(saved)) => {
                    self.publish(
                        CommercialConnectedEvent {
                            connection: saved,
                            occurred_at: Utc::now(),
                        }
                        .into(),
                    )
                    .await;
                }
                Ok(None) => warn!("Commercial connection missing right after save, skipping event"),
                Err(err) => warn!(error = %err, "Failed to re-read commercial connection"),
            }
        }

        Ok(connection)
    }

    /// 处理断开命令（幂等）
    #[instrument(skip(self, command), fields(user_id = %command.user_id))]
    pub async fn handle_disconnect(&self, command: DisconnectUserCommand) -> PresenceResult<()> {
        let user_id = command.user_id;

        match self.connections.find_by_id(&user_id).await? {
            None => {
                info!("Disconnect for unknown connection");
            }
            Some(mut connection) => {
                connection.disconnect();
                self.connections.save(&connection).await?;
                info!("User disconnected");

                let now = Utc::now();
                let is_commercial = connection.has_role(Role::Commercial);
                self.publish(
                    DisconnectedEvent {
                        connection: connection.clone(),
                        occurred_at: now,
                    }
                    .into(),
                )
                .await;
                if is_commercial {
                    self.publish(
                        CommercialDisconnectedEvent {
                            connection,
                            occurred_at: now,
                        }
                        .into(),
                    )
                    .await;
                }
            }
        }

        self.broadcast(PresenceSignal::UserDisconnected { user_id }).await;
        Ok(())
    }

    async fn publish(&self, event: PresenceEvent) {
        if let Err(err) = self.publisher.publish(event).await {
            warn!(error = %err, "Failed to publish connection event");
        }
    }

    async fn broadcast(&self, signal: PresenceSignal) {
        if let Err(err) = self
            .broadcaster
            .broadcast_to_role(Role::Commercial, signal)
            .await
        {
            warn!(error = %err, "Failed to broadcast presence signal to commercials");
        }
    }
}

