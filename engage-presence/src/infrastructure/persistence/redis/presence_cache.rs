//! Redis 在线缓存
//!
//! - `presence:{visitor}`               → 连接状态（带 TTL）
//! - `presence:{visitor}:last_activity` → 最近用户活动（毫秒时间戳，带 TTL）

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redis::AsyncCommands;

use super::RedisStore;
use crate::domain::model::VisitorConnectionStatus;
use crate::domain::repository::PresenceCache;
use crate::domain::value_object::VisitorId;
use crate::error::PresenceResult;

pub struct RedisPresenceCache {
    store: Arc<RedisStore>,
    ttl_seconds: u64,
}

impl RedisPresenceCache {
    pub fn new(store: Arc<RedisStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    fn status_key(&self, visitor_id: &VisitorId) -> String {
        self.store.key(&["presence", visitor_id.as_str()])
    }

    fn activity_key(&self, visitor_id: &VisitorId) -> String {
        self.store
            .key(&["presence", visitor_id.as_str(), "last_activity"])
    }
}

#[async_trait]
impl PresenceCache for RedisPresenceCache {
    async fn set_status(
        &self,
        visitor_id: &VisitorId,
        status: VisitorConnectionStatus,
    ) -> PresenceResult<()> {
        let mut conn = self.store.connection().await?;
        let _: () = conn
            .set_ex(self.status_key(visitor_id), status.as_str(), self.ttl_seconds)
            .await?;
        Ok(())
    }

    async fn remove(&self, visitor_id: &VisitorId) -> PresenceResult<()> {
        let mut conn = self.store.connection().await?;
        let _: usize = conn
            .del(vec![self.status_key(visitor_id), self.activity_key(visitor_id)])
            .await?;
        Ok(())
    }

    async fn get_status(
        &self,
        visitor_id: &VisitorId,
    ) -> PresenceResult<Option<VisitorConnectionStatus>> {
        let mut conn = self.store.connection().await?;
        let raw: Option<String> = conn.get(self.status_key(visitor_id)).await?;
        raw.map(|s| VisitorConnectionStatus::parse(&s)).transpose()
    }

    async fn touch_last_user_activity(
        &self,
        visitor_id: &VisitorId,
        at: DateTime<Utc>,
    ) -> PresenceResult<()> {
        let mut conn = self.store.connection().await?;
        let _: () = conn
            .set_ex(
                self.activity_key(visitor_id),
                at.timestamp_millis(),
                self.ttl_seconds,
            )
            .await?;
        Ok(())
    }

    async fn last_user_activity(
        &self,
        visitor_id: &VisitorId,
    ) -> PresenceResult<Option<DateTime<Utc>>> {
        let mut conn = self.store.connection().await?;
        let millis: Option<i64> = conn.get(self.activity_key(visitor_id)).await?;
        Ok(millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }
}
