//! Engage Core 公共库
//!
//! 提供统一的配置加载与日志初始化功能，供各服务 crate 复用

pub mod config;
pub mod tracing;

pub use config::{
    ConfigManager, EngageAppConfig, LoggingConfig, PresenceServiceConfig, RedisPoolConfig,
    ServiceInfoConfig, app_config, load_config, load_config_from_path,
};
pub use self::tracing::init_tracing_from_config;
