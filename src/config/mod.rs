//! Engage Core 配置模块
//!
//! 该模块提供应用程序配置管理功能，包括：
//! - 配置文件 / 配置目录的加载和解析
//! - 环境特定配置覆盖（`config/environments/{env}.toml`）
//! - Redis 连接配置与各服务配置定义

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<EngageAppConfig> = OnceLock::new();

/// Redis 连接池配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RedisPoolConfig {
    /// Redis 服务器地址
    pub url: String,
    /// 命名空间前缀
    #[serde(default)]
    pub namespace: Option<String>,
    /// 数据库编号
    #[serde(default)]
    pub database: Option<u32>,
    /// 过期时间（秒）
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

/// 服务基础信息
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfoConfig {
    /// 服务名称
    #[serde(default = "default_service_name")]
    pub name: String,
    /// 服务版本
    #[serde(default = "default_service_version")]
    pub version: String,
}

impl Default for ServiceInfoConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            version: default_service_version(),
        }
    }
}

fn default_service_name() -> String {
    "engage-core".to_string()
}

fn default_service_version() -> String {
    "0.1.0".to_string()
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否输出 target
    #[serde(default)]
    pub with_target: bool,
    /// 是否输出线程ID
    #[serde(default)]
    pub with_thread_ids: bool,
    /// 是否输出文件名
    #[serde(default)]
    pub with_file: bool,
    /// 是否输出行号
    #[serde(default)]
    pub with_line_number: bool,
    /// 是否以 JSON 格式输出
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
            with_thread_ids: true,
            with_file: true,
            with_line_number: true,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 在线与分配服务配置
///
/// 所有字段均为可选，缺省值由服务 crate 决定
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PresenceServiceConfig {
    /// 存储后端（memory / redis）
    #[serde(default)]
    pub store: Option<String>,
    /// Redis 配置名称（引用 `[redis.<name>]`）
    #[serde(default)]
    pub redis: Option<String>,
    /// Redis 键前缀
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// 在线缓存过期时间（秒）
    #[serde(default)]
    pub presence_ttl_seconds: Option<u64>,
    /// 断线宽限期（毫秒）
    #[serde(default)]
    pub grace_period_ms: Option<u64>,
    /// 会话清理间隔（秒）
    #[serde(default)]
    pub sweep_interval_seconds: Option<u64>,
    /// 会话清理批大小
    #[serde(default)]
    pub sweep_batch_size: Option<usize>,
    /// 会话清理租户过滤
    #[serde(default)]
    pub sweep_tenant: Option<String>,
    /// anon 访客超时（分钟）
    #[serde(default)]
    pub timeout_anon_minutes: Option<i64>,
    /// engaged 访客超时（分钟）
    #[serde(default)]
    pub timeout_engaged_minutes: Option<i64>,
    /// lead 访客超时（分钟）
    #[serde(default)]
    pub timeout_lead_minutes: Option<i64>,
    /// converted 访客超时（分钟）
    #[serde(default)]
    pub timeout_converted_minutes: Option<i64>,
    /// 令牌密钥
    #[serde(default)]
    pub token_secret: Option<String>,
    /// 客服上线时是否只按其公司查询待分配会话
    #[serde(default)]
    pub scope_pending_chats_by_company: Option<bool>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 在线与分配服务配置
    #[serde(default)]
    pub presence: Option<PresenceServiceConfig>,
}

/// Engage 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngageAppConfig {
    /// 服务信息
    #[serde(default)]
    pub service: ServiceInfoConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Redis 配置映射
    #[serde(default)]
    pub redis: HashMap<String, RedisPoolConfig>,
    /// 服务配置
    #[serde(default)]
    pub services: ServicesConfig,
}

impl EngageAppConfig {
    /// 获取 Redis 配置
    pub fn redis_profile(&self, name: &str) -> Option<&RedisPoolConfig> {
        self.redis.get(name)
    }

    /// 获取在线与分配服务配置
    pub fn presence_service(&self) -> PresenceServiceConfig {
        self.services.presence.clone().unwrap_or_default()
    }
}

/// 加载配置
///
/// 未指定路径时依次尝试 `config/` 目录与 `config.toml`，均失败则使用默认配置
pub fn load_config(path: Option<&str>) -> &'static EngageAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| load_with_fallback(&candidates))
}

/// 获取应用配置
pub fn app_config() -> Result<&'static EngageAppConfig> {
    APP_CONFIG
        .get()
        .ok_or_else(|| anyhow!("configuration not initialised"))
}

/// 从指定路径加载配置（不写入全局实例）
pub fn load_config_from_path(path: &Path) -> Result<EngageAppConfig> {
    let mut merged = load_config_value(path)?;

    let env_root = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    if let Some(overlay) = ConfigManager::load_environment_overlay(&env_root)? {
        merge_value(&mut merged, overlay);
    }

    merged
        .try_into()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> EngageAppConfig {
    for path in candidates {
        match load_config_from_path(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err:#}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    EngageAppConfig::default()
}

/// 从文件或目录加载原始 TOML 值
fn load_config_value(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_directory_value(path)
    } else {
        load_toml_value(path)
    }
}

/// 从目录加载配置
///
/// 目录结构：`base.toml` + `shared/*.toml` + `services/*.toml` + `overrides/*.toml`
fn load_directory_value(path: &Path) -> Result<Value> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("services"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    Ok(merged)
}

/// 合并目录中的配置
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

/// 加载 TOML 值
pub(crate) fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 合并值（overlay 中的表逐键覆盖 base，其余类型整体替换）
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "engage-core-config-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_single_file() {
        let dir = scratch_dir("file");
        let file = dir.join("config.toml");
        fs::write(
            &file,
            r#"
[service]
name = "engage-presence"

[redis.presence]
url = "redis://127.0.0.1:6379/2"
ttl_seconds = 120

[services.presence]
store = "redis"
redis = "presence"
grace_period_ms = 1500
"#,
        )
        .unwrap();

        let cfg = load_config_from_path(&file).unwrap();
        assert_eq!(cfg.service.name, "engage-presence");
        assert_eq!(cfg.logging.level, "info");

        let presence = cfg.presence_service();
        assert_eq!(presence.store.as_deref(), Some("redis"));
        assert_eq!(presence.grace_period_ms, Some(1500));

        let redis = cfg.redis_profile("presence").unwrap();
        assert_eq!(redis.ttl_seconds, Some(120));
    }

    #[test]
    fn test_load_directory_merges_fragments() {
        let dir = scratch_dir("dir");
        fs::write(
            dir.join("base.toml"),
            "[logging]\nlevel = \"debug\"\n\n[services.presence]\nstore = \"memory\"\n",
        )
        .unwrap();
        fs::create_dir_all(dir.join("services")).unwrap();
        fs::write(
            dir.join("services").join("presence.toml"),
            "[services.presence]\nsweep_batch_size = 50\n",
        )
        .unwrap();
        fs::create_dir_all(dir.join("overrides")).unwrap();
        fs::write(
            dir.join("overrides").join("local.toml"),
            "[services.presence]\nstore = \"redis\"\n",
        )
        .unwrap();

        let cfg = load_config_from_path(&dir).unwrap();
        let presence = cfg.presence_service();
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(presence.store.as_deref(), Some("redis"));
        assert_eq!(presence.sweep_batch_size, Some(50));
    }

    #[test]
    fn test_directory_without_base_is_rejected() {
        let dir = scratch_dir("nobase");
        assert!(load_config_from_path(&dir).is_err());
    }

    #[test]
    fn test_merge_value_overrides_scalars() {
        let mut base: Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: Value = toml::from_str("[t]\ny = 3\nz = 4\n").unwrap();
        merge_value(&mut base, overlay);

        let table = base.get("t").unwrap();
        assert_eq!(table.get("x").and_then(Value::as_integer), Some(1));
        assert_eq!(table.get("y").and_then(Value::as_integer), Some(3));
        assert_eq!(table.get("z").and_then(Value::as_integer), Some(4));
        assert_eq!(base.get("a").and_then(Value::as_integer), Some(1));
    }
}
