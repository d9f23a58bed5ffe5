use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DomainEvent;
use crate::domain::model::VisitorConnectionStatus;
use crate::domain::value_object::{SessionId, TenantId, VisitorId};

pub const VISITOR_CONNECTION_CHANGED: &str = "VisitorConnectionChanged";
pub const SESSION_STARTED: &str = "SessionStarted";
pub const SESSION_ENDED: &str = "SessionEnded";
pub const PRESENCE_CHANGED: &str = "PresenceChanged";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorConnectionChangedEvent {
    pub visitor_id: VisitorId,
    pub previous_connection: VisitorConnectionStatus,
    pub new_connection: VisitorConnectionStatus,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for VisitorConnectionChangedEvent {
    fn event_type(&self) -> &'static str {
        VISITOR_CONNECTION_CHANGED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartedEvent {
    pub visitor_id: VisitorId,
    pub session_id: SessionId,
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for SessionStartedEvent {
    fn event_type(&self) -> &'static str {
        SESSION_STARTED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndedEvent {
    pub visitor_id: VisitorId,
    pub session_id: SessionId,
    pub reason: Option<String>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl DomainEvent for SessionEndedEvent {
    fn event_type(&self) -> &'static str {
        SESSION_ENDED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.ended_at
    }
}

/// 对外广播的在线状态变化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceChangedEvent {
    pub subject_id: String,
    pub subject_type: String,
    pub previous_status: VisitorConnectionStatus,
    pub new_status: VisitorConnectionStatus,
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for PresenceChangedEvent {
    fn event_type(&self) -> &'static str {
        PRESENCE_CHANGED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
