//! Role 值对象
//!
//! 连接的角色标签。统一为 visitor / commercial / admin 三值集合，
//! 构造时校验，非法字符串直接返回 Validation 错误。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PresenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 站点访客
    Visitor,
    /// 客服 / 销售
    Commercial,
    /// 管理员
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Visitor, Role::Commercial, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Visitor => "visitor",
            Role::Commercial => "commercial",
            Role::Admin => "admin",
        }
    }

    /// 批量解析角色标签，任一非法即整体失败
    pub fn parse_all<I, S>(tags: I) -> Result<Vec<Role>, PresenceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter().map(|tag| tag.as_ref().parse()).collect()
    }
}

impl FromStr for Role {
    type Err = PresenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visitor" => Ok(Role::Visitor),
            "commercial" => Ok(Role::Commercial),
            "admin" => Ok(Role::Admin),
            other => Err(PresenceError::validation(format!(
                "Invalid role: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
