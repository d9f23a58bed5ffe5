//! SessionId 值对象
//!
//! 访客会话ID的强类型封装，确保ID格式有效

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PresenceError, PresenceResult};

/// 会话ID值对象
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// 创建新的会话ID（使用UUID v4）
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// 从字符串创建会话ID（带验证）
    pub fn from_string(id: impl Into<String>) -> PresenceResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(PresenceError::validation("SessionId cannot be empty"));
        }

        if uuid::Uuid::parse_str(&id).is_err() {
            return Err(PresenceError::validation(format!(
                "Invalid UUID format: {}",
                id
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
