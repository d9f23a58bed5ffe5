//! 传输层连接生命周期
//!
//! 套接字建立：验证令牌 → 取消待执行的断开 → ConnectUser
//! 套接字关闭：按套接字反查用户 → 安排宽限期断开

use std::sync::Arc;

use tracing::{debug, instrument};

use super::DisconnectScheduler;
use crate::application::commands::ConnectUserCommand;
use crate::application::handlers::{ConnectionCommandHandler, PresenceQueryHandler};
use crate::application::queries::FindConnectionBySocketIdQuery;
use crate::domain::model::Connection;
use crate::domain::repository::TokenVerifier;
use crate::domain::value_object::SocketId;
use crate::error::PresenceResult;

pub struct TransportLifecycle {
    verifier: Arc<dyn TokenVerifier>,
    commands: Arc<ConnectionCommandHandler>,
    queries: Arc<PresenceQueryHandler>,
    scheduler: Arc<DisconnectScheduler>,
}

impl TransportLifecycle {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        commands: Arc<ConnectionCommandHandler>,
        queries: Arc<PresenceQueryHandler>,
        scheduler: Arc<DisconnectScheduler>,
    ) -> Self {
        Self {
            verifier,
            commands,
            queries,
            scheduler,
        }
    }

    #[instrument(skip(self, token), fields(socket_id = %socket_id))]
    pub async fn on_socket_open(&self, socket_id: SocketId, token: &str) -> PresenceResult<Connection> {
        let subject = self.verifier.verify(token).await?;

        if self.scheduler.cancel(&subject.subject_id) {
            debug!(user_id = %subject.subject_id, "Reconnected within grace period");
        }

        self.commands
            .handle_connect(ConnectUserCommand {
                user_id: subject.subject_id,
                roles: subject.roles,
                socket_id,
                company_id: subject.company_id,
            })
            .await
    }

    /// 未知套接字（已被新连接替换或从未注册）直接忽略
    #[instrument(skip(self), fields(socket_id = %socket_id))]
    pub async fn on_socket_close(&self, socket_id: &SocketId) -> PresenceResult<()> {
        let query = FindConnectionBySocketIdQuery {
            socket_id: socket_id.clone(),
        };
        let connection = match self.queries.handle_find_by_socket_id(query).await {
            Ok(connection) => connection,
            Err(err) if err.is_not_found() => {
                debug!("Closed socket not bound to any connection");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.scheduler.schedule(connection.user_id().clone());
        Ok(())
    }

    pub fn scheduler(&self) -> &Arc<DisconnectScheduler> {
        &self.scheduler
    }
}
