//! 值对象（Value Objects）
//!
//! 不可变、按值比较的领域概念

mod identifiers;
mod role;
mod session_id;
mod user_id;
mod visitor_id;

pub use identifiers::{ChatId, CompanyId, SiteId, SocketId, TenantId};
pub use role::Role;
pub use session_id::SessionId;
pub use user_id::UserId;
pub use visitor_id::VisitorId;
