use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::repository::{PresenceSignal, RoleBroadcaster};
use crate::domain::value_object::Role;
use crate::error::PresenceResult;

/// 角色频道上的一条信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSignal {
    pub role: Role,
    pub signal: PresenceSignal,
}

/// 基于 `tokio::sync::broadcast` 的进程内角色频道
///
/// 传输层为每个连接订阅后按角色过滤
pub struct BroadcastRoleBroadcaster {
    sender: broadcast::Sender<RoleSignal>,
}

impl BroadcastRoleBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoleSignal> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastRoleBroadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl RoleBroadcaster for BroadcastRoleBroadcaster {
    async fn broadcast_to_role(&self, role: Role, signal: PresenceSignal) -> PresenceResult<()> {
        // 没有订阅者时发送失败，视为无人接收
        if self.sender.send(RoleSignal { role, signal }).is_err() {
            trace!(role = %role, "No subscribers on role channel");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::UserId;

    #[tokio::test]
    async fn test_subscribers_receive_signal() {
        let broadcaster = BroadcastRoleBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        let user_id = UserId::new("agent-1").unwrap();
        broadcaster
            .broadcast_to_role(
                Role::Commercial,
                PresenceSignal::UserConnected {
                    user_id: user_id.clone(),
                },
            )
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.role, Role::Commercial);
        assert_eq!(received.signal, PresenceSignal::UserConnected { user_id });
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_ok() {
        let broadcaster = BroadcastRoleBroadcaster::default();
        let signal = PresenceSignal::UserDisconnected {
            user_id: UserId::new("x").unwrap(),
        };
        assert!(broadcaster.broadcast_to_role(Role::Admin, signal).await.is_ok());
    }
}
