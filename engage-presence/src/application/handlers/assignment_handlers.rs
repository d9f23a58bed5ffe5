//! 分配级联（Assignment Cascade）
//!
//! 让"哪些客服可以认领待分配聊天"与实时在线状态保持同步。
//! 每个处理器在自身边界捕获并记录错误，不影响总线上的其他处理器。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::domain::event::{
    ChatCommercialsAssignedEvent, ChatCommercialsUnassignedEvent, PresenceEvent,
    connection_events::{COMMERCIAL_CONNECTED, COMMERCIAL_DISCONNECTED},
    inbound_events::{COMMERCIAL_CLAIM_RELEASED, NEW_CHAT_CREATED},
};
use crate::domain::model::{ChatField, ChatStatus, Connection, Criteria};
use crate::domain::repository::{ChatRepository, EventHandler, EventPublisher};
use crate::domain::service::CommercialLookupService;
use crate::domain::value_object::{ChatId, CompanyId, Role, UserId};
use crate::error::PresenceResult;

fn user_ids(connections: Vec<Connection>) -> Vec<UserId> {
    connections
        .into_iter()
        .map(|c| c.user_id().clone())
        .collect()
}

/// 查询在线客服并发布完整的可认领集合；无人在线时返回 false
async fn assign_connected_commercials(
    lookup: &CommercialLookupService,
    publisher: &dyn EventPublisher,
    chat_id: &ChatId,
    company_id: Option<&CompanyId>,
) -> PresenceResult<bool> {
    let commercials = lookup.get_connected_commercials(company_id).await?;
    if commercials.is_empty() {
        return Ok(false);
    }

    publisher
        .publish(
            ChatCommercialsAssignedEvent {
                chat_id: chat_id.clone(),
                commercial_ids: user_ids(commercials),
                occurred_at: Utc::now(),
            }
            .into(),
        )
        .await?;
    Ok(true)
}

/// 新聊天创建：分配给公司内全部在线客服
pub struct NewChatCreatedHandler {
    lookup: Arc<CommercialLookupService>,
    publisher: Arc<dyn EventPublisher>,
}

impl NewChatCreatedHandler {
    pub fn new(lookup: Arc<CommercialLookupService>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { lookup, publisher }
    }
}

#[async_trait]
impl EventHandler for NewChatCreatedHandler {
    fn name(&self) -> &'static str {
        "NewChatCreatedHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[NEW_CHAT_CREATED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let PresenceEvent::NewChatCreated(event) = event else {
            return Ok(());
        };

        match assign_connected_commercials(
            &self.lookup,
            self.publisher.as_ref(),
            &event.chat_id,
            Some(&event.company_id),
        )
        .await
        {
            Ok(true) => debug!(chat_id = %event.chat_id, "New chat offered to connected commercials"),
            Ok(false) => debug!(chat_id = %event.chat_id, "No connected commercials for new chat"),
            Err(err) => error!(chat_id = %event.chat_id, error = %err, "Failed to assign new chat"),
        }
        Ok(())
    }
}

/// 客服上线：把每个待分配聊天重新分配给全部在线客服
pub struct CommercialConnectedHandler {
    lookup: Arc<CommercialLookupService>,
    chats: Arc<dyn ChatRepository>,
    publisher: Arc<dyn EventPublisher>,
    scope_by_company: bool,
}

impl CommercialConnectedHandler {
    pub fn new(
        lookup: Arc<CommercialLookupService>,
        chats: Arc<dyn ChatRepository>,
        publisher: Arc<dyn EventPublisher>,
        scope_by_company: bool,
    ) -> Self {
        Self {
            lookup,
            chats,
            publisher,
            scope_by_company,
        }
    }

    async fn reassign_pending(&self, connection: &Connection) -> PresenceResult<usize> {
        let company_id = self.scope_by_company.then(|| connection.company_id());

        let mut criteria = Criteria::equals(ChatField::Status, ChatStatus::Pending.as_str());
        if let Some(company_id) = company_id {
            criteria = criteria.and(Criteria::equals(ChatField::CompanyId, company_id.as_str()));
        }

        let pending = self.chats.find_by_criteria(&criteria).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let commercial_ids = user_ids(self.lookup.get_connected_commercials(company_id).await?);
        if commercial_ids.is_empty() {
            return Ok(0);
        }

        for chat in &pending {
            self.publisher
                .publish(
                    ChatCommercialsAssignedEvent {
                        chat_id: chat.id.clone(),
                        commercial_ids: commercial_ids.clone(),
                        occurred_at: Utc::now(),
                    }
                    .into(),
                )
                .await?;
        }
        Ok(pending.len())
    }
}

#[async_trait]
impl EventHandler for CommercialConnectedHandler {
    fn name(&self) -> &'static str {
        "CommercialConnectedHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[COMMERCIAL_CONNECTED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let PresenceEvent::CommercialConnected(event) = event else {
            return Ok(());
        };
        let connection = &event.connection;
        if !connection.has_role(Role::Commercial) {
            return Ok(());
        }

        match self.reassign_pending(connection).await {
            Ok(count) => info!(
                commercial_id = %connection.user_id(),
                pending_chats = count,
                "Pending chats reassigned after commercial connected"
            ),
            Err(err) => error!(
                commercial_id = %connection.user_id(),
                error = %err,
                "Failed to reassign pending chats"
            ),
        }
        Ok(())
    }
}

/// 客服离线：从其参与的待分配聊天上移除该客服
pub struct CommercialDisconnectedHandler {
    chats: Arc<dyn ChatRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl CommercialDisconnectedHandler {
    pub fn new(chats: Arc<dyn ChatRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { chats, publisher }
    }

    async fn unassign(&self, commercial_id: &UserId) -> PresenceResult<usize> {
        let criteria = Criteria::equals(ChatField::Participants, commercial_id.as_str())
            .and(Criteria::equals(ChatField::Status, ChatStatus::Pending.as_str()));

        let chats = self.chats.find_by_criteria(&criteria).await?;
        let mut unassigned = 0;
        // 外部存储的查询结果可能过期，逐个确认参与者
        for chat in chats.iter().filter(|c| c.is_pending() && c.has_participant(commercial_id)) {
            self.publisher
                .publish(
                    ChatCommercialsUnassignedEvent {
                        chat_id: chat.id.clone(),
                        commercial_ids: vec![commercial_id.clone()],
                        occurred_at: Utc::now(),
                    }
                    .into(),
                )
                .await?;
            unassigned += 1;
        }
        Ok(unassigned)
    }
}

#[async_trait]
impl EventHandler for CommercialDisconnectedHandler {
    fn name(&self) -> &'static str {
        "CommercialDisconnectedHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[COMMERCIAL_DISCONNECTED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let PresenceEvent::CommercialDisconnected(event) = event else {
            return Ok(());
        };
        let connection = &event.connection;
        if !connection.has_role(Role::Commercial) {
            return Ok(());
        }

        match self.unassign(connection.user_id()).await {
            Ok(count) => info!(
                commercial_id = %connection.user_id(),
                chats = count,
                "Commercial unassigned from pending chats"
            ),
            Err(err) => error!(
                commercial_id = %connection.user_id(),
                error = %err,
                "Failed to unassign commercial from pending chats"
            ),
        }
        Ok(())
    }
}

/// 客服释放认领：聊天重新开放给公司内全部在线客服
pub struct CommercialClaimReleasedHandler {
    lookup: Arc<CommercialLookupService>,
    publisher: Arc<dyn EventPublisher>,
}

impl CommercialClaimReleasedHandler {
    pub fn new(lookup: Arc<CommercialLookupService>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { lookup, publisher }
    }
}

#[async_trait]
impl EventHandler for CommercialClaimReleasedHandler {
    fn name(&self) -> &'static str {
        "CommercialClaimReleasedHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[COMMERCIAL_CLAIM_RELEASED]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        let PresenceEvent::CommercialClaimReleased(event) = event else {
            return Ok(());
        };

        match assign_connected_commercials(
            &self.lookup,
            self.publisher.as_ref(),
            &event.chat_id,
            Some(&event.company_id),
        )
        .await
        {
            Ok(true) => debug!(chat_id = %event.chat_id, "Released chat reopened to commercials"),
            Ok(false) => info!(
                chat_id = %event.chat_id,
                released_by = %event.commercial_id,
                "No connected commercials to take released chat"
            ),
            Err(err) => error!(chat_id = %event.chat_id, error = %err, "Failed to reassign released chat"),
        }
        Ok(())
    }
}
