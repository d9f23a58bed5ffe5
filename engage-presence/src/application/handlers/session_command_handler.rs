//! 访客会话命令处理器

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::commit_visitor;
use crate::application::commands::{
    ActivityKind, AdvanceLifecycleTierCommand, ChangeVisitorConnectionCommand, EndSessionCommand,
    IdentifyVisitorCommand, StartSessionCommand, UpdateSessionHeartbeatCommand,
};
use crate::domain::aggregate::Visitor;
use crate::domain::model::VisitorConnectionStatus;
use crate::domain::repository::{EventPublisher, PresenceCache, VisitorRepository};
use crate::domain::value_object::{SessionId, VisitorId};
use crate::error::{PresenceError, PresenceResult};

/// 访客识别结果
#[derive(Debug, Clone)]
pub struct IdentifiedVisitor {
    pub visitor_id: VisitorId,
    pub session_id: SessionId,
    /// 本次识别是否新建了访客
    pub created: bool,
}

pub struct SessionCommandHandler {
    visitors: Arc<dyn VisitorRepository>,
    presence_cache: Arc<dyn PresenceCache>,
    publisher: Arc<dyn EventPublisher>,
}

impl SessionCommandHandler {
    pub fn new(
        visitors: Arc<dyn VisitorRepository>,
        presence_cache: Arc<dyn PresenceCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            visitors,
            presence_cache,
            publisher,
        }
    }

    #[instrument(skip(self, command), fields(site_id = %command.site_id))]
    pub async fn handle_identify(
        &self,
        command: IdentifyVisitorCommand,
    ) -> PresenceResult<IdentifiedVisitor> {
        let now = Utc::now();
        let existing = self
            .visitors
            .find_by_fingerprint(&command.site_id, &command.fingerprint)
            .await?;

        let created = existing.is_none();
        let mut visitor = match existing {
            Some(visitor) => visitor,
            None => Visitor::identify(command.tenant_id, command.site_id, command.fingerprint, now)?,
        };

        let session_id = visitor.start_session(now);
        self.commit(&mut visitor).await?;
        info!(visitor_id = %visitor.id(), session_id = %session_id, created, "Visitor identified");

        Ok(IdentifiedVisitor {
            visitor_id: visitor.id().clone(),
            session_id,
            created,
        })
    }

    #[instrument(skip(self, command), fields(visitor_id = %command.visitor_id))]
    pub async fn handle_start_session(&self, command: StartSessionCommand) -> PresenceResult<SessionId> {
        let mut visitor = self.require_visitor(&command.visitor_id).await?;
        let session_id = visitor.start_session(Utc::now());
        self.commit(&mut visitor).await?;
        Ok(session_id)
    }

    /// 结束会话；已结束时返回 `Ok(false)` 且不重复发布事件
    #[instrument(skip(self, command), fields(session_id = %command.session_id))]
    pub async fn handle_end_session(&self, command: EndSessionCommand) -> PresenceResult<bool> {
        let mut visitor = self
            .load_by_session(command.visitor_id.as_ref(), &command.session_id)
            .await?;

        let ended = visitor.end_session(&command.session_id, command.reason, Utc::now())?;
        if !ended {
            debug!("Session already ended");
            return Ok(false);
        }
        self.commit(&mut visitor).await?;
        Ok(true)
    }

    #[instrument(skip(self, command), fields(session_id = %command.session_id, kind = ?command.activity_kind))]
    pub async fn handle_heartbeat(&self, command: UpdateSessionHeartbeatCommand) -> PresenceResult<()> {
        let now = Utc::now();
        let mut visitor = self
            .load_by_session(command.visitor_id.as_ref(), &command.session_id)
            .await?;

        visitor.record_activity(&command.session_id, now)?;

        if command.activity_kind == ActivityKind::Interaction {
            match visitor.connection_status() {
                VisitorConnectionStatus::Away => visitor.return_from_away(now)?,
                VisitorConnectionStatus::Offline => visitor.go_online(now)?,
                _ => {}
            }
        }

        self.commit(&mut visitor).await?;

        if command.activity_kind == ActivityKind::Interaction {
            if let Err(err) = self
                .presence_cache
                .touch_last_user_activity(visitor.id(), now)
                .await
            {
                warn!(error = %err, "Failed to record last user activity");
            }
        }
        Ok(())
    }

    #[instrument(skip(self, command), fields(visitor_id = %command.visitor_id, transition = ?command.transition))]
    pub async fn handle_change_connection(
        &self,
        command: ChangeVisitorConnectionCommand,
    ) -> PresenceResult<VisitorConnectionStatus> {
        let mut visitor = self.require_visitor(&command.visitor_id).await?;
        visitor.apply_transition(command.transition, Utc::now())?;
        self.commit(&mut visitor).await?;
        Ok(visitor.connection_status())
    }

    #[instrument(skip(self, command), fields(visitor_id = %command.visitor_id, tier = %command.tier))]
    pub async fn handle_advance_tier(&self, command: AdvanceLifecycleTierCommand) -> PresenceResult<()> {
        let mut visitor = self.require_visitor(&command.visitor_id).await?;
        visitor.advance_tier(command.tier, Utc::now())?;
        self.commit(&mut visitor).await
    }

    async fn require_visitor(&self, visitor_id: &VisitorId) -> PresenceResult<Visitor> {
        self.visitors
            .find_by_id(visitor_id)
            .await?
            .ok_or_else(|| PresenceError::not_found("visitor", visitor_id.as_str()))
    }

    async fn load_by_session(
        &self,
        visitor_id: Option<&VisitorId>,
        session_id: &SessionId,
    ) -> PresenceResult<Visitor> {
        let visitor = match visitor_id {
            Some(visitor_id) => Some(self.require_visitor(visitor_id).await?),
            None => self.visitors.find_by_session_id(session_id).await?,
        };

        visitor
            .filter(|v| v.has_session(session_id))
            .ok_or_else(|| PresenceError::not_found("session", session_id.as_str()))
    }

    async fn commit(&self, visitor: &mut Visitor) -> PresenceResult<()> {
        commit_visitor(self.visitors.as_ref(), self.publisher.as_ref(), visitor).await
    }
}
