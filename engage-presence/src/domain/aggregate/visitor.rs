//! Visitor 聚合根
//!
//! 职责：管理访客的生命周期层级、连接状态机与多标签页会话
//!
//! 聚合根特性：
//! 1. 所有状态修改通过方法完成，非法迁移返回 Validation 错误
//! 2. 状态变化写入待发布事件缓冲区，应用层在保存成功后 `take_events` 发布
//! 3. 会话只属于所属访客，外部通过访客访问会话

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::session::VisitorSession;
use crate::domain::event::{
    PresenceEvent, SessionEndedEvent, SessionStartedEvent, VisitorConnectionChangedEvent,
};
use crate::domain::model::{ConnectionTransition, LifecycleTier, VisitorConnectionStatus};
use crate::domain::value_object::{SessionId, SiteId, TenantId, VisitorId};
use crate::error::{PresenceError, PresenceResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visitor {
    // === 聚合根标识 ===
    id: VisitorId,
    tenant_id: TenantId,
    site_id: SiteId,
    fingerprint: String,

    // === 状态 ===
    lifecycle_tier: LifecycleTier,
    connection_status: VisitorConnectionStatus,
    sessions: Vec<VisitorSession>,

    // === 生命周期 ===
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    // === 领域事件（未提交的事件）===
    #[serde(skip)]
    pending_events: Vec<PresenceEvent>,
}

impl Visitor {
    // ==================== 工厂方法 ====================

    /// 首次识别访客（按站点 + 指纹）
    ///
    /// 新访客为 anon 层级、offline 状态，尚无会话
    pub fn identify(
        tenant_id: TenantId,
        site_id: SiteId,
        fingerprint: impl Into<String>,
        now: DateTime<Utc>,
    ) -> PresenceResult<Self> {
        let fingerprint = fingerprint.into();
        if fingerprint.trim().is_empty() {
            return Err(PresenceError::validation("Visitor fingerprint cannot be empty"));
        }

        Ok(Self {
            id: VisitorId::new(),
            tenant_id,
            site_id,
            fingerprint,
            lifecycle_tier: LifecycleTier::Anon,
            connection_status: VisitorConnectionStatus::Offline,
            sessions: Vec::new(),
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        })
    }

    /// 从持久化数据重建聚合根（仓储专用，不产生事件）
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: VisitorId,
        tenant_id: TenantId,
        site_id: SiteId,
        fingerprint: String,
        lifecycle_tier: LifecycleTier,
        connection_status: VisitorConnectionStatus,
        sessions: Vec<VisitorSession>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            site_id,
            fingerprint,
            lifecycle_tier,
            connection_status,
            sessions,
            created_at,
            updated_at,
            pending_events: Vec::new(),
        }
    }

    // ==================== 会话 ====================

    /// 开启新会话（多标签页可同时活跃）
    pub fn start_session(&mut self, now: DateTime<Utc>) -> SessionId {
        let session = VisitorSession::start(now);
        let session_id = session.id().clone();
        self.sessions.push(session);
        self.updated_at = now;

        self.pending_events.push(
            SessionStartedEvent {
                visitor_id: self.id.clone(),
                session_id: session_id.clone(),
                tenant_id: self.tenant_id.clone(),
                occurred_at: now,
            }
            .into(),
        );
        session_id
    }

    /// 结束会话
    ///
    /// 已结束的会话返回 `Ok(false)`，不产生重复事件
    pub fn end_session(
        &mut self,
        session_id: &SessionId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> PresenceResult<bool> {
        let session = self.session_mut(session_id)?;
        if !session.close(reason.clone(), now) {
            return Ok(false);
        }
        let duration_ms = session.duration(now).num_milliseconds();

        self.record_session_ended(session_id.clone(), reason, duration_ms, now);
        Ok(true)
    }

    /// 记录会话活动（心跳）
    pub fn record_activity(&mut self, session_id: &SessionId, now: DateTime<Utc>) -> PresenceResult<()> {
        let session = self.session_mut(session_id)?;
        if !session.is_active() {
            return Err(PresenceError::validation(format!(
                "Session {} already ended",
                session_id
            )));
        }
        session.touch(now);
        self.updated_at = now;
        Ok(())
    }

    /// 关闭空闲超过 `timeout` 的全部活跃会话，返回被关闭的会话ID
    pub fn close_idle_sessions(
        &mut self,
        timeout: Duration,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Vec<SessionId> {
        let reason = Some(reason.to_string());
        let mut closed = Vec::new();
        for session in self.sessions.iter_mut() {
            if session.idle_for(now) > timeout && session.close(reason.clone(), now) {
                closed.push((session.id().clone(), session.duration(now).num_milliseconds()));
            }
        }

        closed
            .into_iter()
            .map(|(session_id, duration_ms)| {
                self.record_session_ended(session_id.clone(), reason.clone(), duration_ms, now);
                session_id
            })
            .collect()
    }

    fn record_session_ended(
        &mut self,
        session_id: SessionId,
        reason: Option<String>,
        duration_ms: i64,
        now: DateTime<Utc>,
    ) {
        self.updated_at = now;
        self.pending_events.push(
            SessionEndedEvent {
                visitor_id: self.id.clone(),
                session_id,
                reason,
                ended_at: now,
                duration_ms,
            }
            .into(),
        );
    }

    fn session_mut(&mut self, session_id: &SessionId) -> PresenceResult<&mut VisitorSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id() == session_id)
            .ok_or_else(|| PresenceError::not_found("session", session_id.as_str()))
    }

    pub fn session(&self, session_id: &SessionId) -> Option<&VisitorSession> {
        self.sessions.iter().find(|s| s.id() == session_id)
    }

    pub fn has_session(&self, session_id: &SessionId) -> bool {
        self.session(session_id).is_some()
    }

    pub fn active_sessions(&self) -> impl Iterator<Item = &VisitorSession> {
        self.sessions.iter().filter(|s| s.is_active())
    }

    pub fn active_session_count(&self) -> usize {
        self.active_sessions().count()
    }

    // ==================== 连接状态机 ====================

    pub fn go_online(&mut self, now: DateTime<Utc>) -> PresenceResult<()> {
        self.apply_transition(ConnectionTransition::GoOnline, now)
    }

    pub fn start_chatting(&mut self, now: DateTime<Utc>) -> PresenceResult<()> {
        self.apply_transition(ConnectionTransition::StartChatting, now)
    }

    pub fn stop_chatting(&mut self, now: DateTime<Utc>) -> PresenceResult<()> {
        self.apply_transition(ConnectionTransition::StopChatting, now)
    }

    pub fn go_away(&mut self, now: DateTime<Utc>) -> PresenceResult<()> {
        self.apply_transition(ConnectionTransition::GoAway, now)
    }

    pub fn return_from_away(&mut self, now: DateTime<Utc>) -> PresenceResult<()> {
        self.apply_transition(ConnectionTransition::ReturnFromAway, now)
    }

    /// 任意状态均可离线；已离线时为空操作
    pub fn go_offline(&mut self, now: DateTime<Utc>) -> PresenceResult<()> {
        self.apply_transition(ConnectionTransition::GoOffline, now)
    }

    pub fn apply_transition(
        &mut self,
        transition: ConnectionTransition,
        now: DateTime<Utc>,
    ) -> PresenceResult<()> {
        let previous = self.connection_status;
        let next = transition.apply(previous)?;
        if next == previous {
            return Ok(());
        }

        self.connection_status = next;
        self.updated_at = now;
        self.pending_events.push(
            VisitorConnectionChangedEvent {
                visitor_id: self.id.clone(),
                previous_connection: previous,
                new_connection: next,
                occurred_at: now,
            }
            .into(),
        );
        Ok(())
    }

    // ==================== 生命周期层级 ====================

    pub fn advance_tier(&mut self, tier: LifecycleTier, now: DateTime<Utc>) -> PresenceResult<()> {
        if !self.lifecycle_tier.can_transition_to(tier) {
            return Err(PresenceError::validation(format!(
                "Lifecycle tier cannot move from {} to {}",
                self.lifecycle_tier, tier
            )));
        }
        self.lifecycle_tier = tier;
        self.updated_at = now;
        Ok(())
    }

    // ==================== 领域事件 ====================

    /// 取出待发布事件（保存成功后调用）
    pub fn take_events(&mut self) -> Vec<PresenceEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn pending_events(&self) -> &[PresenceEvent] {
        &self.pending_events
    }

    // ==================== 访问器 ====================

    pub fn id(&self) -> &VisitorId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn lifecycle_tier(&self) -> LifecycleTier {
        self.lifecycle_tier
    }

    pub fn connection_status(&self) -> VisitorConnectionStatus {
        self.connection_status
    }

    pub fn sessions(&self) -> &[VisitorSession] {
        &self.sessions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::DomainEvent;

    fn visitor(now: DateTime<Utc>) -> Visitor {
        Visitor::identify(
            TenantId::new("tenant").unwrap(),
            SiteId::new("site").unwrap(),
            "fp-1",
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_end_session_twice_emits_once() {
        let now = Utc::now();
        let mut v = visitor(now);
        let sid = v.start_session(now);
        v.take_events();

        let later = now + Duration::seconds(90);
        assert!(v.end_session(&sid, Some("closed".into()), later).unwrap());
        assert!(!v.end_session(&sid, None, later).unwrap());

        let events = v.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PresenceEvent::SessionEnded(e) => {
                assert_eq!(e.duration_ms, 90_000);
                assert_eq!(e.reason.as_deref(), Some("closed"));
            }
            other => panic!("unexpected event {}", other.event_type()),
        }
        assert_eq!(v.session(&sid).unwrap().end_reason(), Some("closed"));
    }

    #[test]
    fn test_close_idle_sessions_emits_one_event_per_closed_session() {
        let now = Utc::now();
        let mut v = visitor(now);
        let idle_a = v.start_session(now);
        let idle_b = v.start_session(now);
        let busy = v.start_session(now);
        let ended = v.start_session(now);
        v.end_session(&ended, Some("closed".into()), now).unwrap();
        let later = now + Duration::minutes(10);
        v.record_activity(&busy, later).unwrap();
        v.take_events();

        let closed = v.close_idle_sessions(Duration::minutes(5), "timeout", later);

        assert_eq!(closed, vec![idle_a.clone(), idle_b.clone()]);
        assert_eq!(v.active_session_count(), 1);
        assert_eq!(v.updated_at(), later);
        assert_eq!(v.session(&ended).unwrap().end_reason(), Some("closed"));

        let events = v.take_events();
        assert_eq!(events.len(), 2);
        for (event, expected) in events.iter().zip([&idle_a, &idle_b]) {
            match event {
                PresenceEvent::SessionEnded(e) => {
                    assert_eq!(&e.session_id, expected);
                    assert_eq!(e.reason.as_deref(), Some("timeout"));
                    assert_eq!(e.duration_ms, 600_000);
                }
                other => panic!("unexpected event {}", other.event_type()),
            }
        }
    }

    #[test]
    fn test_end_unknown_session_is_not_found() {
        let mut v = visitor(Utc::now());
        let err = v.end_session(&SessionId::new(), None, Utc::now()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_transitions_emit_change_events() {
        let now = Utc::now();
        let mut v = visitor(now);

        v.go_online(now).unwrap();
        v.start_chatting(now).unwrap();
        assert!(v.go_away(now).is_err());
        v.go_offline(now).unwrap();
        // 已离线，不产生事件
        v.go_offline(now).unwrap();

        let changes: Vec<_> = v
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                PresenceEvent::VisitorConnectionChanged(c) => {
                    Some((c.previous_connection, c.new_connection))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            changes,
            vec![
                (VisitorConnectionStatus::Offline, VisitorConnectionStatus::Online),
                (VisitorConnectionStatus::Online, VisitorConnectionStatus::Chatting),
                (VisitorConnectionStatus::Chatting, VisitorConnectionStatus::Offline),
            ]
        );
    }

    #[test]
    fn test_heartbeat_on_ended_session_rejected() {
        let now = Utc::now();
        let mut v = visitor(now);
        let sid = v.start_session(now);
        v.end_session(&sid, None, now).unwrap();
        assert!(matches!(
            v.record_activity(&sid, now),
            Err(PresenceError::Validation(_))
        ));
    }

    #[test]
    fn test_tier_is_forward_only() {
        let now = Utc::now();
        let mut v = visitor(now);
        v.advance_tier(LifecycleTier::Lead, now).unwrap();
        assert!(v.advance_tier(LifecycleTier::Engaged, now).is_err());
        assert_eq!(v.lifecycle_tier(), LifecycleTier::Lead);
    }

    #[test]
    fn test_snapshot_does_not_carry_pending_events() {
        let now = Utc::now();
        let mut v = visitor(now);
        v.start_session(now);
        let json = serde_json::to_string(&v).unwrap();
        let restored: Visitor = serde_json::from_str(&json).unwrap();
        assert!(restored.pending_events().is_empty());
        assert_eq!(restored.active_session_count(), 1);
    }
}
