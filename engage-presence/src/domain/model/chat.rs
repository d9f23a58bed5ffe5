use serde::{Deserialize, Serialize};

use super::criteria::{FieldValue, Filterable};
use crate::domain::value_object::{ChatId, CompanyId, UserId};

/// 聊天状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// 尚未被任何客服认领
    Pending,
    Assigned,
    Closed,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Pending => "pending",
            ChatStatus::Assigned => "assigned",
            ChatStatus::Closed => "closed",
        }
    }
}

/// 聊天快照（由外部聊天存储提供的只读模型）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub company_id: CompanyId,
    pub status: ChatStatus,
    /// 当前挂在该聊天上的客服
    pub participants: Vec<UserId>,
}

/// 聊天存储可查询的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatField {
    Id,
    CompanyId,
    Status,
    Participants,
}

impl Chat {
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChatStatus::Pending
    }
}

impl Filterable for Chat {
    type Field = ChatField;

    fn field_value(&self, field: ChatField) -> FieldValue<'_> {
        match field {
            ChatField::Id => FieldValue::Scalar(Some(self.id.as_str())),
            ChatField::CompanyId => FieldValue::Scalar(Some(self.company_id.as_str())),
            ChatField::Status => FieldValue::Scalar(Some(self.status.as_str())),
            ChatField::Participants => {
                FieldValue::Set(self.participants.iter().map(UserId::as_str).collect())
            }
        }
    }
}
