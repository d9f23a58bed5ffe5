use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::aggregate::Visitor;
use crate::domain::repository::VisitorRepository;
use crate::domain::value_object::{SessionId, SiteId, TenantId, VisitorId};
use crate::error::PresenceResult;

#[derive(Default)]
pub struct InMemoryVisitorRepository {
    visitors: RwLock<HashMap<VisitorId, Visitor>>,
}

impl InMemoryVisitorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitorRepository for InMemoryVisitorRepository {
    async fn save(&self, visitor: &Visitor) -> PresenceResult<()> {
        // 存储快照不携带待发布事件
        let mut stored = visitor.clone();
        stored.take_events();
        self.visitors
            .write()
            .await
            .insert(stored.id().clone(), stored);
        Ok(())
    }

    async fn find_by_id(&self, visitor_id: &VisitorId) -> PresenceResult<Option<Visitor>> {
        Ok(self.visitors.read().await.get(visitor_id).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        site_id: &SiteId,
        fingerprint: &str,
    ) -> PresenceResult<Option<Visitor>> {
        Ok(self
            .visitors
            .read()
            .await
            .values()
            .find(|v| v.site_id() == site_id && v.fingerprint() == fingerprint)
            .cloned())
    }

    async fn find_by_session_id(&self, session_id: &SessionId) -> PresenceResult<Option<Visitor>> {
        Ok(self
            .visitors
            .read()
            .await
            .values()
            .find(|v| v.has_session(session_id))
            .cloned())
    }

    async fn find_with_active_sessions(
        &self,
        after: Option<&VisitorId>,
        limit: usize,
        tenant_id: Option<&TenantId>,
    ) -> PresenceResult<Vec<Visitor>> {
        let visitors = self.visitors.read().await;
        let mut page: Vec<&Visitor> = visitors
            .values()
            .filter(|v| after.is_none_or(|cursor| v.id() > cursor))
            .filter(|v| v.active_session_count() > 0)
            .filter(|v| tenant_id.is_none_or(|t| v.tenant_id() == t))
            .collect();
        page.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(page.into_iter().take(limit).cloned().collect())
    }
}
