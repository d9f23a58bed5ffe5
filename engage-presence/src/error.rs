//! 在线与分配服务错误类型定义

use thiserror::Error;

/// 在线与分配服务错误类型
#[derive(Debug, Error)]
pub enum PresenceError {
    /// 查询未命中（连接、访客、会话等）
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// 违反契约：非法状态迁移、无效角色、格式错误的标识
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 存储层失败
    #[error("Repository error: {0}")]
    Repository(#[source] anyhow::Error),
}

/// 在线与分配服务结果类型
pub type PresenceResult<T> = Result<T, PresenceError>;

impl PresenceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 包装存储层错误，保留原始错误链
    pub fn repository<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Repository(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<redis::RedisError> for PresenceError {
    fn from(err: redis::RedisError) -> Self {
        Self::Repository(anyhow::Error::new(err).context("redis command failed"))
    }
}

impl From<serde_json::Error> for PresenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Repository(anyhow::Error::new(err).context("failed to (de)serialize record"))
    }
}
