//! 轻量字符串标识符
//!
//! 公司、租户、站点、会话（聊天）与连接套接字标识只要求非空，统一由宏生成

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PresenceError, PresenceResult};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> PresenceResult<Self> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(PresenceError::validation(concat!($label, " cannot be empty")));
                }
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// 传输层套接字ID（连接在线当且仅当持有套接字）
    SocketId,
    "SocketId"
);
string_id!(
    /// 客服所属公司ID
    CompanyId,
    "CompanyId"
);
string_id!(
    /// 访客所属租户ID
    TenantId,
    "TenantId"
);
string_id!(
    /// 访客所在站点ID
    SiteId,
    "SiteId"
);
string_id!(
    /// 聊天会话ID
    ChatId,
    "ChatId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_reject_blank() {
        assert!(SocketId::new("").is_err());
        assert!(CompanyId::new(" ").is_err());
        assert!(ChatId::new("chat-1").is_ok());
        assert_eq!(TenantId::new("t1").unwrap().to_string(), "t1");
    }
}
