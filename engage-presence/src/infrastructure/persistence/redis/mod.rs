//! Redis 存储实现
//!
//! 所有键共享同一个命名空间前缀，连接通过 `ConnectionManager` 复用

mod connection_repository;
mod presence_cache;
mod visitor_repository;

pub use connection_repository::RedisConnectionRepository;
pub use presence_cache::RedisPresenceCache;
pub use visitor_repository::RedisVisitorRepository;

use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use crate::error::PresenceResult;

/// 共享的 Redis 客户端与命名空间
pub struct RedisStore {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
    namespace: String,
}

impl RedisStore {
    pub fn new(client: redis::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            manager: OnceCell::new(),
            namespace: namespace.into(),
        }
    }

    pub fn open(url: &str, namespace: impl Into<String>) -> PresenceResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self::new(client, namespace))
    }

    /// 首次调用时建立连接，之后复用同一个 `ConnectionManager`
    pub async fn connection(&self) -> PresenceResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(manager.clone())
    }

    pub fn key(&self, parts: &[&str]) -> String {
        let mut key = self.namespace.clone();
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        key
    }
}
