use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DomainEvent;
use crate::domain::value_object::{ChatId, UserId};

pub const CHAT_COMMERCIALS_ASSIGNED: &str = "ChatCommercialsAssigned";
pub const CHAT_COMMERCIALS_UNASSIGNED: &str = "ChatCommercialsUnassigned";

/// 待分配聊天的可认领客服集合
///
/// `commercial_ids` 始终是当前完整的在线客服列表，而不是增量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCommercialsAssignedEvent {
    pub chat_id: ChatId,
    pub commercial_ids: Vec<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for ChatCommercialsAssignedEvent {
    fn event_type(&self) -> &'static str {
        CHAT_COMMERCIALS_ASSIGNED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// 客服离线后从待分配聊天上移除（增量，仅含离开的客服）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCommercialsUnassignedEvent {
    pub chat_id: ChatId,
    pub commercial_ids: Vec<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for ChatCommercialsUnassignedEvent {
    fn event_type(&self) -> &'static str {
        CHAT_COMMERCIALS_UNASSIGNED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
