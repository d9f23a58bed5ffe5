use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::model::{Chat, ChatField, Criteria};
use crate::domain::repository::ChatRepository;
use crate::domain::value_object::ChatId;
use crate::error::PresenceResult;

/// 内存聊天存储（外部聊天子系统的替身）
#[derive(Default)]
pub struct InMemoryChatRepository {
    chats: RwLock<HashMap<ChatId, Chat>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, chat: Chat) {
        self.chats.write().await.insert(chat.id.clone(), chat);
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn find_by_criteria(&self, criteria: &Criteria<ChatField>) -> PresenceResult<Vec<Chat>> {
        let chats = self.chats.read().await;
        let mut matched: Vec<Chat> = chats
            .values()
            .filter(|c| criteria.matches(*c))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }
}
