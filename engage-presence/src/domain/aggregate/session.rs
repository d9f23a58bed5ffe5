//! 访客会话（Visitor 聚合内的子实体）

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::SessionId;

/// 超时清理关闭会话时使用的结束原因
pub const END_REASON_TIMEOUT: &str = "timeout";

/// 单个浏览器标签页的会话
///
/// 活跃当且仅当 `ended_at` 未设置，关闭后不可重新打开
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorSession {
    id: SessionId,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    end_reason: Option<String>,
}

impl VisitorSession {
    pub(super) fn start(now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            started_at: now,
            last_activity_at: now,
            ended_at: None,
            end_reason: None,
        }
    }

    pub fn reconstitute(
        id: SessionId,
        started_at: DateTime<Utc>,
        last_activity_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        end_reason: Option<String>,
    ) -> Self {
        Self {
            id,
            started_at,
            last_activity_at,
            ended_at,
            end_reason,
        }
    }

    /// 关闭会话，已关闭时返回 false
    pub(super) fn close(&mut self, reason: Option<String>, now: DateTime<Utc>) -> bool {
        if self.ended_at.is_some() {
            return false;
        }
        self.ended_at = Some(now);
        self.end_reason = reason;
        true
    }

    pub(super) fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity_at
    }

    /// 会话时长（未关闭时按 `now` 计算）
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.unwrap_or(now) - self.started_at
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }
}
