//! 事件总线与角色频道广播

mod event_bus;
mod redis_role_broadcaster;
mod role_broadcaster;

pub use event_bus::InMemoryEventBus;
pub use redis_role_broadcaster::RedisRoleBroadcaster;
pub use role_broadcaster::{BroadcastRoleBroadcaster, RoleSignal};
