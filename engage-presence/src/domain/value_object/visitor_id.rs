//! VisitorId 值对象

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PresenceError, PresenceResult};

/// 访客ID值对象（UUID v4）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisitorId(String);

impl VisitorId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> PresenceResult<Self> {
        let id = id.into();
        if uuid::Uuid::parse_str(&id).is_err() {
            return Err(PresenceError::validation(format!(
                "Invalid visitor id: {}",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VisitorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VisitorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
