//! 进程内事件总线
//!
//! 按事件类型订阅；一次发布内同类型处理器按订阅顺序依次执行，
//! 某个处理器失败只记录日志，不影响其余处理器。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::domain::event::{DomainEvent, PresenceEvent};
use crate::domain::repository::{EventHandler, EventPublisher};
use crate::error::PresenceResult;

#[derive(Default)]
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<&'static str, Vec<Arc<dyn EventHandler>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为处理器声明的每个事件类型注册订阅
    pub async fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        for event_type in handler.event_types() {
            debug!(handler = handler.name(), event_type, "Handler subscribed");
            handlers
                .entry(*event_type)
                .or_default()
                .push(Arc::clone(&handler));
        }
    }

    pub async fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: PresenceEvent) -> PresenceResult<()> {
        let event_type = event.event_type();
        // 复制处理器列表后释放锁，处理器内可再次发布
        let handlers = match self.handlers.read().await.get(event_type) {
            Some(handlers) => handlers.clone(),
            None => {
                debug!(event_type, "No handlers for event");
                return Ok(());
            }
        };

        for handler in handlers {
            if let Err(err) = handler.handle(&event).await {
                error!(
                    handler = handler.name(),
                    event_type,
                    error = %err,
                    "Event handler failed"
                );
            }
        }
        Ok(())
    }
}
