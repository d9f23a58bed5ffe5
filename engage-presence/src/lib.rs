//! Engage 在线与分配引擎
//!
//! 跟踪客服与访客的实时连接，把待分配聊天同步给在线客服，
//! 并按访客生命周期层级管理会话超时。

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interface;
pub mod service;

pub use config::PresenceConfig;
pub use error::{PresenceError, PresenceResult};
