//! Redis 访客仓储
//!
//! - `visitor:{id}`                    → 访客 JSON 快照
//! - `visitor:fp:{site}:{fingerprint}` → 访客ID
//! - `visitor:session:{session}`       → 访客ID
//! - `visitor:active`                  → 有活跃会话的访客集合

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::RedisStore;
use crate::domain::aggregate::Visitor;
use crate::domain::repository::VisitorRepository;
use crate::domain::value_object::{SessionId, SiteId, TenantId, VisitorId};
use crate::error::PresenceResult;

pub struct RedisVisitorRepository {
    store: Arc<RedisStore>,
}

impl RedisVisitorRepository {
    pub fn new(store: Arc<RedisStore>) -> Self {
        Self { store }
    }

    fn visitor_key(&self, visitor_id: &str) -> String {
        self.store.key(&["visitor", visitor_id])
    }

    fn fingerprint_key(&self, site_id: &SiteId, fingerprint: &str) -> String {
        self.store
            .key(&["visitor", "fp", site_id.as_str(), fingerprint])
    }

    fn session_key(&self, session_id: &SessionId) -> String {
        self.store.key(&["visitor", "session", session_id.as_str()])
    }

    fn active_key(&self) -> String {
        self.store.key(&["visitor", "active"])
    }

    async fn load(&self, visitor_id: &str) -> PresenceResult<Option<Visitor>> {
        let mut conn = self.store.connection().await?;
        let raw: Option<String> = conn.get(self.visitor_key(visitor_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn load_indexed(&self, index_key: String) -> PresenceResult<Option<Visitor>> {
        let mut conn = self.store.connection().await?;
        let visitor_id: Option<String> = conn.get(index_key).await?;
        match visitor_id {
            Some(id) => self.load(&id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl VisitorRepository for RedisVisitorRepository {
    async fn save(&self, visitor: &Visitor) -> PresenceResult<()> {
        let id = visitor.id().as_str();
        let json = serde_json::to_string(visitor)?;
        let mut conn = self.store.connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.set(self.visitor_key(id), json).ignore();
        pipe.set(
            self.fingerprint_key(visitor.site_id(), visitor.fingerprint()),
            id,
        )
        .ignore();
        for session in visitor.sessions() {
            pipe.set(self.session_key(session.id()), id).ignore();
        }
        if visitor.active_session_count() > 0 {
            pipe.sadd(self.active_key(), id).ignore();
        } else {
            pipe.srem(self.active_key(), id).ignore();
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn find_by_id(&self, visitor_id: &VisitorId) -> PresenceResult<Option<Visitor>> {
        self.load(visitor_id.as_str()).await
    }

    async fn find_by_fingerprint(
        &self,
        site_id: &SiteId,
        fingerprint: &str,
    ) -> PresenceResult<Option<Visitor>> {
        self.load_indexed(self.fingerprint_key(site_id, fingerprint))
            .await
    }

    async fn find_by_session_id(&self, session_id: &SessionId) -> PresenceResult<Option<Visitor>> {
        self.load_indexed(self.session_key(session_id)).await
    }

    async fn find_with_active_sessions(
        &self,
        after: Option<&VisitorId>,
        limit: usize,
        tenant_id: Option<&TenantId>,
    ) -> PresenceResult<Vec<Visitor>> {
        let mut conn = self.store.connection().await?;
        let mut ids: Vec<String> = conn.smembers(self.active_key()).await?;
        ids.sort_unstable();

        let mut batch = Vec::new();
        for id in ids
            .into_iter()
            .filter(|id| after.is_none_or(|cursor| id.as_str() > cursor.as_str()))
        {
            if batch.len() >= limit {
                break;
            }
            let Some(visitor) = self.load(&id).await? else {
                continue;
            };
            if visitor.active_session_count() == 0 {
                continue;
            }
            if tenant_id.is_some_and(|t| visitor.tenant_id() != t) {
                continue;
            }
            batch.push(visitor);
        }
        Ok(batch)
    }
}
