//! 访客状态相关的事件处理器

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::commit_visitor;
use crate::domain::event::{
    PresenceChangedEvent, PresenceEvent,
    connection_events::{CONNECTED, DISCONNECTED},
    visitor_events::{SESSION_ENDED, VISITOR_CONNECTION_CHANGED},
};
use crate::domain::model::{Connection, VisitorConnectionStatus};
use crate::domain::repository::{EventHandler, EventPublisher, PresenceCache, VisitorRepository};
use crate::domain::value_object::{Role, VisitorId};
use crate::error::PresenceResult;

pub const SUBJECT_TYPE_VISITOR: &str = "visitor";

/// 将访客连接状态同步到在线缓存
pub struct PresenceCacheSyncHandler {
    cache: Arc<dyn PresenceCache>,
}

impl PresenceCacheSyncHandler {
    pub fn new(cache: Arc<dyn PresenceCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventHandler for PresenceCacheSyncHandler {
    fn name(&self) -> &'static str {
        "PresenceCacheSyncHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[VISITOR_CONNECTION_CHANGED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let PresenceEvent::VisitorConnectionChanged(event) = event else {
            return Ok(());
        };

        match event.new_connection {
            VisitorConnectionStatus::Offline => self.cache.remove(&event.visitor_id).await?,
            status => {
                self.cache.set_status(&event.visitor_id, status).await?;
                if status == VisitorConnectionStatus::Online
                    && event.previous_connection != VisitorConnectionStatus::Online
                {
                    self.cache
                        .touch_last_user_activity(&event.visitor_id, event.occurred_at)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// 解析租户并对外广播在线状态变化
pub struct PresenceRebroadcastHandler {
    visitors: Arc<dyn VisitorRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl PresenceRebroadcastHandler {
    pub fn new(visitors: Arc<dyn VisitorRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            visitors,
            publisher,
        }
    }
}

#[async_trait]
impl EventHandler for PresenceRebroadcastHandler {
    fn name(&self) -> &'static str {
        "PresenceRebroadcastHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[VISITOR_CONNECTION_CHANGED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let PresenceEvent::VisitorConnectionChanged(event) = event else {
            return Ok(());
        };

        let Some(visitor) = self.visitors.find_by_id(&event.visitor_id).await? else {
            warn!(visitor_id = %event.visitor_id, "Visitor vanished before presence broadcast");
            return Ok(());
        };

        self.publisher
            .publish(
                PresenceChangedEvent {
                    subject_id: event.visitor_id.to_string(),
                    subject_type: SUBJECT_TYPE_VISITOR.to_string(),
                    previous_status: event.previous_connection,
                    new_status: event.new_connection,
                    tenant_id: visitor.tenant_id().clone(),
                    occurred_at: event.occurred_at,
                }
                .into(),
            )
            .await
    }
}

/// 会话关闭后若访客不再有活跃会话，将其置为离线
pub struct SessionClosedSagaHandler {
    visitors: Arc<dyn VisitorRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl SessionClosedSagaHandler {
    pub fn new(visitors: Arc<dyn VisitorRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            visitors,
            publisher,
        }
    }
}

#[async_trait]
impl EventHandler for SessionClosedSagaHandler {
    fn name(&self) -> &'static str {
        "SessionClosedSagaHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[SESSION_ENDED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let PresenceEvent::SessionEnded(event) = event else {
            return Ok(());
        };

        let Some(mut visitor) = self.visitors.find_by_id(&event.visitor_id).await? else {
            return Ok(());
        };
        if visitor.active_session_count() > 0
            || visitor.connection_status() == VisitorConnectionStatus::Offline
        {
            return Ok(());
        }

        debug!(visitor_id = %event.visitor_id, "Last session closed, marking visitor offline");
        visitor.go_offline(Utc::now())?;
        commit_visitor(self.visitors.as_ref(), self.publisher.as_ref(), &mut visitor).await
    }
}

/// 访客传输连接事件 → 访客状态机
///
/// 访客连接的 user_id 即访客ID
pub struct VisitorConnectionBridgeHandler {
    visitors: Arc<dyn VisitorRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl VisitorConnectionBridgeHandler {
    pub fn new(visitors: Arc<dyn VisitorRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            visitors,
            publisher,
        }
    }

    fn visitor_id_of(connection: &Connection) -> Option<VisitorId> {
        if !connection.has_role(Role::Visitor) {
            return None;
        }
        match VisitorId::from_string(connection.user_id().as_str()) {
            Ok(id) => Some(id),
            Err(_) => {
                debug!(user_id = %connection.user_id(), "Visitor connection without visitor id");
                None
            }
        }
    }
}

#[async_trait]
impl EventHandler for VisitorConnectionBridgeHandler {
    fn name(&self) -> &'static str {
        "VisitorConnectionBridgeHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[CONNECTED, DISCONNECTED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let (connection, online) = match event {
            PresenceEvent::Connected(e) => (&e.connection, true),
            PresenceEvent::Disconnected(e) => (&e.connection, false),
            _ => return Ok(()),
        };
        let Some(visitor_id) = Self::visitor_id_of(connection) else {
            return Ok(());
        };
        let Some(mut visitor) = self.visitors.find_by_id(&visitor_id).await? else {
            debug!(visitor_id = %visitor_id, "Connected visitor not identified yet");
            return Ok(());
        };

        let now = Utc::now();
        if online {
            if visitor.connection_status() != VisitorConnectionStatus::Offline {
                return Ok(());
            }
            visitor.go_online(now)?;
        } else {
            visitor.go_offline(now)?;
        }
        commit_visitor(self.visitors.as_ref(), self.publisher.as_ref(), &mut visitor).await
    }
}
