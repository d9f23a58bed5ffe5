use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DomainEvent;
use crate::domain::model::Connection;

pub const CONNECTED: &str = "Connected";
pub const DISCONNECTED: &str = "Disconnected";
pub const COMMERCIAL_CONNECTED: &str = "CommercialConnected";
pub const COMMERCIAL_DISCONNECTED: &str = "CommercialDisconnected";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedEvent {
    pub connection: Connection,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for ConnectedEvent {
    fn event_type(&self) -> &'static str {
        CONNECTED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectedEvent {
    pub connection: Connection,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for DisconnectedEvent {
    fn event_type(&self) -> &'static str {
        DISCONNECTED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// 持有 commercial 角色的连接上线（携带重新读取后的连接快照）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommercialConnectedEvent {
    pub connection: Connection,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for CommercialConnectedEvent {
    fn event_type(&self) -> &'static str {
        COMMERCIAL_CONNECTED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommercialDisconnectedEvent {
    pub connection: Connection,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for CommercialDisconnectedEvent {
    fn event_type(&self) -> &'static str {
        COMMERCIAL_DISCONNECTED
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
