//! 应用层：命令、查询、事件处理器与后台服务的编排

pub mod commands;
pub mod handlers;
pub mod queries;
pub mod services;
