//! 仓储与外部协作者接口
//!
//! 领域层只依赖这些 trait，具体实现位于 infrastructure 层，
//! 由 `service::wire` 以 `Arc<dyn Trait>` 注入。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregate::Visitor;
use crate::domain::event::PresenceEvent;
use crate::domain::model::{Chat, ChatField, Connection, ConnectionField, Criteria, VisitorConnectionStatus};
use crate::domain::value_object::{CompanyId, Role, SessionId, SiteId, TenantId, UserId, VisitorId};
use crate::error::{PresenceError, PresenceResult};

// Rust 2024: 对于需要作为 trait 对象使用的 trait（Arc<dyn Trait>），
// 如果方法参数包含引用，需要保留 async-trait 宏

/// 连接注册表
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 按 user_id 插入或覆盖
    async fn save(&self, connection: &Connection) -> PresenceResult<()>;
    async fn remove(&self, connection: &Connection) -> PresenceResult<()>;
    /// 无匹配时返回空列表
    async fn find(&self, criteria: &Criteria<ConnectionField>) -> PresenceResult<Vec<Connection>>;
    async fn find_by_id(&self, user_id: &UserId) -> PresenceResult<Option<Connection>>;

    /// 无匹配时返回 NotFound
    async fn find_one(&self, criteria: &Criteria<ConnectionField>) -> PresenceResult<Connection> {
        self.find(criteria)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PresenceError::not_found("connection", format!("{:?}", criteria)))
    }
}

/// 访客仓储
#[async_trait]
pub trait VisitorRepository: Send + Sync {
    async fn save(&self, visitor: &Visitor) -> PresenceResult<()>;
    async fn find_by_id(&self, visitor_id: &VisitorId) -> PresenceResult<Option<Visitor>>;
    async fn find_by_fingerprint(
        &self,
        site_id: &SiteId,
        fingerprint: &str,
    ) -> PresenceResult<Option<Visitor>>;
    async fn find_by_session_id(&self, session_id: &SessionId) -> PresenceResult<Option<Visitor>>;
    /// 至少有一个活跃会话的访客，按访客ID升序返回 `after` 之后的一页
    ///
    /// 返回数量少于 `limit` 表示已扫描到末尾
    async fn find_with_active_sessions(
        &self,
        after: Option<&VisitorId>,
        limit: usize,
        tenant_id: Option<&TenantId>,
    ) -> PresenceResult<Vec<Visitor>>;
}

/// 外部聊天存储（只读）
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn find_by_criteria(&self, criteria: &Criteria<ChatField>) -> PresenceResult<Vec<Chat>>;
}

/// 账号 → 公司 解析
#[async_trait]
pub trait AccountCompanyLookup: Send + Sync {
    /// 账号不存在时返回 NotFound
    async fn company_of(&self, user_id: &UserId) -> PresenceResult<CompanyId>;
}

/// 访客在线缓存（短期，带过期时间）
#[async_trait]
pub trait PresenceCache: Send + Sync {
    async fn set_status(
        &self,
        visitor_id: &VisitorId,
        status: VisitorConnectionStatus,
    ) -> PresenceResult<()>;
    async fn remove(&self, visitor_id: &VisitorId) -> PresenceResult<()>;
    async fn get_status(&self, visitor_id: &VisitorId)
    -> PresenceResult<Option<VisitorConnectionStatus>>;
    async fn touch_last_user_activity(
        &self,
        visitor_id: &VisitorId,
        at: DateTime<Utc>,
    ) -> PresenceResult<()>;
    async fn last_user_activity(&self, visitor_id: &VisitorId)
    -> PresenceResult<Option<DateTime<Utc>>>;

    /// 缓存条目存在即视为在线
    async fn is_connected(&self, visitor_id: &VisitorId) -> PresenceResult<bool> {
        Ok(self.get_status(visitor_id).await?.is_some())
    }
}

/// 事件发布接口
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: PresenceEvent) -> PresenceResult<()>;

    async fn publish_all(&self, events: Vec<PresenceEvent>) -> PresenceResult<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// 事件处理器
///
/// 订阅 `event_types` 中列出的事件类型，同一次发布内按订阅顺序依次执行
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn event_types(&self) -> &'static [&'static str];
    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()>;
}

/// 角色频道广播的通用信号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum PresenceSignal {
    UserConnected { user_id: UserId },
    UserDisconnected { user_id: UserId },
}

/// 角色频道广播（尽力而为）
#[async_trait]
pub trait RoleBroadcaster: Send + Sync {
    async fn broadcast_to_role(&self, role: Role, signal: PresenceSignal) -> PresenceResult<()>;
}

/// 令牌验证结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubject {
    pub subject_id: UserId,
    pub roles: Vec<Role>,
    pub company_id: Option<CompanyId>,
}

/// 令牌验证
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> PresenceResult<VerifiedSubject>;
}
