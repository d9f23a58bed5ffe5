//! 基础设施层：存储、消息、鉴权与目录适配器

pub mod auth;
pub mod directory;
pub mod messaging;
pub mod persistence;
