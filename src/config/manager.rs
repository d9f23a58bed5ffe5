//! 配置管理器 - 负责处理不同环境下的配置选择和覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 从环境变量读取当前环境名称
//! - 加载环境特定配置片段

use std::env;
use std::path::Path;

use anyhow::Result;
use toml::Value;
use tracing::debug;

use super::load_toml_value;

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取当前环境名称
    ///
    /// 从环境变量 ENGAGE_ENV 获取当前环境名称，
    /// 如果未设置则默认为 "development"
    pub fn get_environment() -> String {
        env::var("ENGAGE_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 加载环境特定配置
    ///
    /// 读取 `{root}/environments/{environment}.toml`，文件不存在时返回 `None`
    ///
    /// # 参数
    /// * `root` - 配置根目录
    pub fn load_environment_overlay(root: &Path) -> Result<Option<Value>> {
        let environment = Self::get_environment();
        let path = root
            .join("environments")
            .join(format!("{}.toml", environment));

        if !path.exists() {
            return Ok(None);
        }

        debug!(
            environment = %environment,
            path = %path.display(),
            "Loading environment configuration overlay"
        );
        load_toml_value(&path).map(Some)
    }
}
