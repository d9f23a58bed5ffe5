//! 从聊天子系统消费的事件

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DomainEvent;
use crate::domain::value_object::{ChatId, CompanyId, UserId};

pub const NEW_CHAT_CREATED: &str = "NewChatCreated";
pub const COMMERCIAL_CLAIM_RELEASED: &str = "CommercialClaimReleased";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatCreatedEvent {
    pub chat_id: ChatId,
    pub company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for NewChatCreatedEvent {
    fn event_type(&self) -> &'static str {
        NEW_CHAT_CREATED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// 客服放弃已认领的聊天，聊天回到待分配状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommercialClaimReleasedEvent {
    pub chat_id: ChatId,
    pub commercial_id: UserId,
    pub company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for CommercialClaimReleasedEvent {
    fn event_type(&self) -> &'static str {
        COMMERCIAL_CLAIM_RELEASED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
