//! 命令结构体定义（Command DTO）

use serde::{Deserialize, Serialize};

use crate::domain::model::{ConnectionTransition, LifecycleTier};
use crate::domain::value_object::{CompanyId, Role, SessionId, SiteId, SocketId, TenantId, UserId, VisitorId};

/// 连接命令
#[derive(Debug, Clone)]
pub struct ConnectUserCommand {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub socket_id: SocketId,
    /// 缺省时通过账号目录解析
    pub company_id: Option<CompanyId>,
}

/// 断开命令
#[derive(Debug, Clone)]
pub struct DisconnectUserCommand {
    pub user_id: UserId,
}

/// 识别访客命令（按站点 + 指纹查找或创建，并开启新会话）
#[derive(Debug, Clone)]
pub struct IdentifyVisitorCommand {
    pub tenant_id: TenantId,
    pub site_id: SiteId,
    pub fingerprint: String,
}

/// 为已识别访客开启新会话（新标签页）
#[derive(Debug, Clone)]
pub struct StartSessionCommand {
    pub visitor_id: VisitorId,
}

/// 结束会话命令
#[derive(Debug, Clone)]
pub struct EndSessionCommand {
    pub session_id: SessionId,
    /// 缺省时按会话ID反查访客
    pub visitor_id: Option<VisitorId>,
    pub reason: Option<String>,
}

/// 心跳类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// 定时心跳，只延长会话活动时间
    Timer,
    /// 用户交互，同时刷新"最近用户活动"并唤醒离开/离线的访客
    Interaction,
}

/// 会话心跳命令
#[derive(Debug, Clone)]
pub struct UpdateSessionHeartbeatCommand {
    pub session_id: SessionId,
    pub visitor_id: Option<VisitorId>,
    pub activity_kind: ActivityKind,
}

/// 显式访客状态迁移命令
#[derive(Debug, Clone)]
pub struct ChangeVisitorConnectionCommand {
    pub visitor_id: VisitorId,
    pub transition: ConnectionTransition,
}

/// 推进生命周期层级命令
#[derive(Debug, Clone)]
pub struct AdvanceLifecycleTierCommand {
    pub visitor_id: VisitorId,
    pub tier: LifecycleTier,
}
