use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::json;
use tracing::debug;

use crate::domain::repository::{PresenceSignal, RoleBroadcaster};
use crate::domain::value_object::Role;
use crate::error::PresenceResult;
use crate::infrastructure::persistence::redis::RedisStore;

const SIGNAL_CHANNEL_PREFIX: &str = "signal";

/// 通过 Redis Pub/Sub 向 `signal:role:<role>` 频道发布信号
pub struct RedisRoleBroadcaster {
    store: Arc<RedisStore>,
}

impl RedisRoleBroadcaster {
    pub fn new(store: Arc<RedisStore>) -> Self {
        Self { store }
    }

    pub fn role_channel(role: Role) -> String {
        format!("{}:role:{}", SIGNAL_CHANNEL_PREFIX, role.as_str())
    }
}

#[async_trait]
impl RoleBroadcaster for RedisRoleBroadcaster {
    async fn broadcast_to_role(&self, role: Role, signal: PresenceSignal) -> PresenceResult<()> {
        let mut conn = self.store.connection().await?;
        let channel = Self::role_channel(role);

        let message = json!({
            "payload": signal,
            "timestamp": chrono::Utc::now().timestamp(),
        });

        let receivers: i64 = conn.publish(&channel, message.to_string()).await?;
        debug!(channel = %channel, receivers, "Role signal published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_channel_names() {
        assert_eq!(
            RedisRoleBroadcaster::role_channel(Role::Commercial),
            "signal:role:commercial"
        );
        assert_eq!(RedisRoleBroadcaster::role_channel(Role::Visitor), "signal:role:visitor");
    }
}
