//! UserId 值对象
//!
//! 用户ID的强类型封装（客服与访客共用同一连接注册表）

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PresenceError, PresenceResult};

/// 用户ID值对象
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// 从字符串创建用户ID（带验证）
    pub fn new(id: impl Into<String>) -> PresenceResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PresenceError::validation("UserId cannot be empty"));
        }

        if id.len() > 128 {
            return Err(PresenceError::validation(
                "UserId too long (max 128 characters)",
            ));
        }

        Ok(Self(id))
    }

    /// 获取内部值的引用
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 消费自身，返回内部值
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
