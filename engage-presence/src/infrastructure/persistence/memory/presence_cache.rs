use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::model::VisitorConnectionStatus;
use crate::domain::repository::PresenceCache;
use crate::domain::value_object::VisitorId;
use crate::error::PresenceResult;

struct Entry<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T: Copy> Entry<T> {
    fn live(&self, now: Instant) -> Option<T> {
        match self.expires_at {
            Some(at) if at <= now => None,
            _ => Some(self.value),
        }
    }
}

/// 内存在线缓存，条目按 TTL 惰性过期
pub struct InMemoryPresenceCache {
    ttl: Option<Duration>,
    statuses: DashMap<VisitorId, Entry<VisitorConnectionStatus>>,
    last_activity: DashMap<VisitorId, Entry<DateTime<Utc>>>,
}

impl InMemoryPresenceCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            statuses: DashMap::new(),
            last_activity: DashMap::new(),
        }
    }

    fn entry<T>(&self, value: T) -> Entry<T> {
        Entry {
            value,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        }
    }
}

impl Default for InMemoryPresenceCache {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl PresenceCache for InMemoryPresenceCache {
    async fn set_status(
        &self,
        visitor_id: &VisitorId,
        status: VisitorConnectionStatus,
    ) -> PresenceResult<()> {
        self.statuses.insert(visitor_id.clone(), self.entry(status));
        Ok(())
    }

    async fn remove(&self, visitor_id: &VisitorId) -> PresenceResult<()> {
        self.statuses.remove(visitor_id);
        self.last_activity.remove(visitor_id);
        Ok(())
    }

    async fn get_status(
        &self,
        visitor_id: &VisitorId,
    ) -> PresenceResult<Option<VisitorConnectionStatus>> {
        let now = Instant::now();
        let status = self.statuses.get(visitor_id).and_then(|e| e.live(now));
        if status.is_none() {
            self.statuses.remove_if(visitor_id, |_, e| e.live(now).is_none());
        }
        Ok(status)
    }

    async fn touch_last_user_activity(
        &self,
        visitor_id: &VisitorId,
        at: DateTime<Utc>,
    ) -> PresenceResult<()> {
        self.last_activity.insert(visitor_id.clone(), self.entry(at));
        Ok(())
    }

    async fn last_user_activity(
        &self,
        visitor_id: &VisitorId,
    ) -> PresenceResult<Option<DateTime<Utc>>> {
        Ok(self
            .last_activity
            .get(visitor_id)
            .and_then(|e| e.live(Instant::now())))
    }
}
