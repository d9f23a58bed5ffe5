//! 访客连接状态机
//!
//! ```text
//! offline  -> online    (GoOnline)
//! online   -> chatting  (StartChatting)
//! chatting -> online    (StopChatting)
//! online   -> away      (GoAway)
//! away     -> online    (ReturnFromAway)
//! any      -> offline   (GoOffline)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PresenceError, PresenceResult};

/// 访客连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitorConnectionStatus {
    Offline,
    Online,
    Chatting,
    Away,
}

impl VisitorConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorConnectionStatus::Offline => "offline",
            VisitorConnectionStatus::Online => "online",
            VisitorConnectionStatus::Chatting => "chatting",
            VisitorConnectionStatus::Away => "away",
        }
    }

    pub fn parse(value: &str) -> PresenceResult<Self> {
        match value {
            "offline" => Ok(Self::Offline),
            "online" => Ok(Self::Online),
            "chatting" => Ok(Self::Chatting),
            "away" => Ok(Self::Away),
            other => Err(PresenceError::validation(format!(
                "Invalid visitor connection status: {}",
                other
            ))),
        }
    }
}

impl Default for VisitorConnectionStatus {
    fn default() -> Self {
        Self::Offline
    }
}

impl fmt::Display for VisitorConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionTransition {
    GoOnline,
    StartChatting,
    StopChatting,
    GoAway,
    ReturnFromAway,
    GoOffline,
}

impl ConnectionTransition {
    /// 合法的源状态，`None` 表示任意状态
    pub fn source(&self) -> Option<VisitorConnectionStatus> {
        use VisitorConnectionStatus::*;
        match self {
            ConnectionTransition::GoOnline => Some(Offline),
            ConnectionTransition::StartChatting => Some(Online),
            ConnectionTransition::StopChatting => Some(Chatting),
            ConnectionTransition::GoAway => Some(Online),
            ConnectionTransition::ReturnFromAway => Some(Away),
            ConnectionTransition::GoOffline => None,
        }
    }

    pub fn target(&self) -> VisitorConnectionStatus {
        use VisitorConnectionStatus::*;
        match self {
            ConnectionTransition::GoOnline => Online,
            ConnectionTransition::StartChatting => Chatting,
            ConnectionTransition::StopChatting => Online,
            ConnectionTransition::GoAway => Away,
            ConnectionTransition::ReturnFromAway => Online,
            ConnectionTransition::GoOffline => Offline,
        }
    }

    /// 校验并计算迁移后的状态
    pub fn apply(&self, current: VisitorConnectionStatus) -> PresenceResult<VisitorConnectionStatus> {
        match self.source() {
            Some(expected) if expected != current => Err(PresenceError::validation(format!(
                "Cannot {:?} from {}: expected {}",
                self, current, expected
            ))),
            _ => Ok(self.target()),
        }
    }
}
