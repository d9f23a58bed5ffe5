//! 按生命周期层级自适应的会话超时策略

use chrono::{DateTime, Duration, Utc};

use crate::domain::aggregate::{END_REASON_TIMEOUT, Visitor};
use crate::domain::model::LifecycleTier;
use crate::domain::value_object::SessionId;

/// 各层级的空闲超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTimeouts {
    pub anon: Duration,
    pub engaged: Duration,
    pub lead: Duration,
    pub converted: Duration,
}

impl Default for TierTimeouts {
    fn default() -> Self {
        Self {
            anon: Duration::minutes(5),
            engaged: Duration::minutes(15),
            lead: Duration::minutes(30),
            converted: Duration::minutes(60),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionTimeoutPolicy {
    timeouts: TierTimeouts,
}

impl SessionTimeoutPolicy {
    pub fn new(timeouts: TierTimeouts) -> Self {
        Self { timeouts }
    }

    pub fn determine_timeout(&self, visitor: &Visitor) -> Duration {
        match visitor.lifecycle_tier() {
            LifecycleTier::Anon => self.timeouts.anon,
            LifecycleTier::Engaged => self.timeouts.engaged,
            LifecycleTier::Lead => self.timeouts.lead,
            LifecycleTier::Converted => self.timeouts.converted,
        }
    }

    /// 存在空闲时间超过预算的活跃会话
    pub fn has_expired_sessions(&self, visitor: &Visitor, now: DateTime<Utc>) -> bool {
        let timeout = self.determine_timeout(visitor);
        visitor.active_sessions().any(|s| s.idle_for(now) > timeout)
    }

    /// 关闭全部过期会话（幂等），返回本次关闭的会话
    pub fn clean_expired_sessions(&self, visitor: &mut Visitor, now: DateTime<Utc>) -> Vec<SessionId> {
        let timeout = self.determine_timeout(visitor);
        visitor.close_idle_sessions(timeout, END_REASON_TIMEOUT, now)
    }

    /// 没有活跃会话且自上次更新起已超时，或全部活跃会话均已超时
    pub fn should_be_marked_as_inactive(&self, visitor: &Visitor, now: DateTime<Utc>) -> bool {
        let timeout = self.determine_timeout(visitor);
        let mut active = visitor.active_sessions().peekable();
        if active.peek().is_none() {
            return now - visitor.updated_at() > timeout;
        }
        active.all(|s| s.idle_for(now) > timeout)
    }
}
