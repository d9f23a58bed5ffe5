//! 领域事件（Domain Events）
//!
//! 连接注册表、分配级联与访客会话在状态变化时发布的事件，
//! 以及从聊天子系统消费的事件。所有事件统一包装为 `PresenceEvent` 在总线上传递。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait DomainEvent: Send + Sync {
    fn event_type(&self) -> &'static str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

pub mod assignment_events;
pub mod connection_events;
pub mod inbound_events;
pub mod visitor_events;

pub use assignment_events::{ChatCommercialsAssignedEvent, ChatCommercialsUnassignedEvent};
pub use connection_events::{
    CommercialConnectedEvent, CommercialDisconnectedEvent, ConnectedEvent, DisconnectedEvent,
};
pub use inbound_events::{CommercialClaimReleasedEvent, NewChatCreatedEvent};
pub use visitor_events::{
    PresenceChangedEvent, SessionEndedEvent, SessionStartedEvent, VisitorConnectionChangedEvent,
};

/// 总线上传递的事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PresenceEvent {
    Connected(ConnectedEvent),
    Disconnected(DisconnectedEvent),
    CommercialConnected(CommercialConnectedEvent),
    CommercialDisconnected(CommercialDisconnectedEvent),
    ChatCommercialsAssigned(ChatCommercialsAssignedEvent),
    ChatCommercialsUnassigned(ChatCommercialsUnassignedEvent),
    VisitorConnectionChanged(VisitorConnectionChangedEvent),
    SessionStarted(SessionStartedEvent),
    SessionEnded(SessionEndedEvent),
    PresenceChanged(PresenceChangedEvent),
    NewChatCreated(NewChatCreatedEvent),
    CommercialClaimReleased(CommercialClaimReleasedEvent),
}

impl PresenceEvent {
    fn inner(&self) -> &dyn DomainEvent {
        match self {
            PresenceEvent::Connected(e) => e,
            PresenceEvent::Disconnected(e) => e,
            PresenceEvent::CommercialConnected(e) => e,
            PresenceEvent::CommercialDisconnected(e) => e,
            PresenceEvent::ChatCommercialsAssigned(e) => e,
            PresenceEvent::ChatCommercialsUnassigned(e) => e,
            PresenceEvent::VisitorConnectionChanged(e) => e,
            PresenceEvent::SessionStarted(e) => e,
            PresenceEvent::SessionEnded(e) => e,
            PresenceEvent::PresenceChanged(e) => e,
            PresenceEvent::NewChatCreated(e) => e,
            PresenceEvent::CommercialClaimReleased(e) => e,
        }
    }
}

impl DomainEvent for PresenceEvent {
    fn event_type(&self) -> &'static str {
        self.inner().event_type()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.inner().occurred_at()
    }
}

macro_rules! into_presence_event {
    ($($event:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$event> for PresenceEvent {
                fn from(event: $event) -> Self {
                    PresenceEvent::$variant(event)
                }
            }
        )*
    };
}

into_presence_event! {
    ConnectedEvent => Connected,
    DisconnectedEvent => Disconnected,
    CommercialConnectedEvent => CommercialConnected,
    CommercialDisconnectedEvent => CommercialDisconnected,
    ChatCommercialsAssignedEvent => ChatCommercialsAssigned,
    ChatCommercialsUnassignedEvent => ChatCommercialsUnassigned,
    VisitorConnectionChangedEvent => VisitorConnectionChanged,
    SessionStartedEvent => SessionStarted,
    SessionEndedEvent => SessionEnded,
    PresenceChangedEvent => PresenceChanged,
    NewChatCreatedEvent => NewChatCreated,
    CommercialClaimReleasedEvent => CommercialClaimReleased,
}
