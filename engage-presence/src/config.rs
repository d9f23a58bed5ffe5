use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, bail};
use engage_core::config::{EngageAppConfig, RedisPoolConfig};

use crate::domain::service::TierTimeouts;

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => bail!("unknown presence store backend: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub store: StoreBackend,
    pub redis_url: String,
    pub redis_namespace: String,
    pub presence_ttl_seconds: u64,
    pub grace_period: Duration,
    pub sweep_interval: Duration,
    pub sweep_batch_size: usize,
    pub sweep_tenant: Option<String>,
    pub tier_timeouts: TierTimeouts,
    pub token_secret: String,
    pub scope_pending_chats_by_company: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1/".to_string(),
            redis_namespace: "engage:presence".to_string(),
            presence_ttl_seconds: 120,
            grace_period: Duration::from_millis(3000),
            sweep_interval: Duration::from_secs(60),
            sweep_batch_size: 500,
            sweep_tenant: None,
            tier_timeouts: TierTimeouts::default(),
            token_secret: "insecure-secret".to_string(),
            scope_pending_chats_by_company: false,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse::<T>().ok())
}

impl PresenceConfig {
    pub fn from_app_config(app: &EngageAppConfig) -> Result<Self> {
        let service = app.presence_service();
        let defaults = Self::default();

        let redis_profile: Option<RedisPoolConfig> = service
            .redis
            .as_deref()
            .and_then(|name| app.redis_profile(name))
            .cloned();

        let store = match env::var("ENGAGE_PRESENCE_STORE").ok().or(service.store) {
            Some(raw) => raw.parse()?,
            None => defaults.store,
        };

        let redis_url = env::var("ENGAGE_PRESENCE_REDIS_URL")
            .ok()
            .or_else(|| redis_profile.as_ref().map(|p| p.url.clone()))
            .unwrap_or(defaults.redis_url);

        let redis_namespace = service
            .key_prefix
            .or_else(|| redis_profile.as_ref().and_then(|p| p.namespace.clone()))
            .unwrap_or(defaults.redis_namespace);

        let presence_ttl_seconds = env_parse("ENGAGE_PRESENCE_TTL_SECONDS")
            .or(service.presence_ttl_seconds)
            .or_else(|| redis_profile.as_ref().and_then(|p| p.ttl_seconds))
            .unwrap_or(defaults.presence_ttl_seconds);

        let grace_period = env_parse("ENGAGE_PRESENCE_GRACE_PERIOD_MS")
            .or(service.grace_period_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.grace_period);

        let sweep_interval = env_parse("ENGAGE_PRESENCE_SWEEP_INTERVAL_SECONDS")
            .or(service.sweep_interval_seconds)
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);

        let sweep_batch_size = env_parse("ENGAGE_PRESENCE_SWEEP_BATCH_SIZE")
            .or(service.sweep_batch_size)
            .unwrap_or(defaults.sweep_batch_size);
        if sweep_batch_size == 0 {
            bail!("sweep batch size must be positive");
        }

        let minutes = |value: Option<i64>, fallback: chrono::Duration| {
            value.map(chrono::Duration::minutes).unwrap_or(fallback)
        };
        let fallback = defaults.tier_timeouts;
        let tier_timeouts = TierTimeouts {
            anon: minutes(service.timeout_anon_minutes, fallback.anon),
            engaged: minutes(service.timeout_engaged_minutes, fallback.engaged),
            lead: minutes(service.timeout_lead_minutes, fallback.lead),
            converted: minutes(service.timeout_converted_minutes, fallback.converted),
        };

        let token_secret = env::var("ENGAGE_PRESENCE_TOKEN_SECRET")
            .ok()
            .or(service.token_secret)
            .unwrap_or(defaults.token_secret);

        let scope_pending_chats_by_company = env_parse("ENGAGE_PRESENCE_SCOPE_PENDING_BY_COMPANY")
            .or(service.scope_pending_chats_by_company)
            .unwrap_or(defaults.scope_pending_chats_by_company);

        Ok(Self {
            store,
            redis_url,
            redis_namespace,
            presence_ttl_seconds,
            grace_period,
            sweep_interval,
            sweep_batch_size,
            sweep_tenant: env::var("ENGAGE_PRESENCE_SWEEP_TENANT")
                .ok()
                .or(service.sweep_tenant),
            tier_timeouts,
            token_secret,
            scope_pending_chats_by_company,
        })
    }
}
