//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序构建存储、领域服务、应用层处理器，并把全部事件处理器订阅到总线

use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use tracing::info;

use crate::application::handlers::{
    CommercialClaimReleasedHandler, CommercialConnectedHandler, CommercialDisconnectedHandler,
    ConnectionCommandHandler, NewChatCreatedHandler, PresenceCacheSyncHandler,
    PresenceQueryHandler, PresenceRebroadcastHandler, SessionClosedSagaHandler,
    SessionCommandHandler, VisitorConnectionBridgeHandler,
};
use crate::application::services::{SessionSweepConfig, SessionSweepService};
use crate::config::{PresenceConfig, StoreBackend};
use crate::domain::repository::{
    AccountCompanyLookup, ChatRepository, ConnectionRepository, EventHandler, EventPublisher,
    PresenceCache, RoleBroadcaster, TokenVerifier, VisitorRepository,
};
use crate::domain::service::{CommercialLookupService, SessionTimeoutPolicy};
use crate::domain::value_object::TenantId;
use crate::infrastructure::auth::JwtTokenVerifier;
use crate::infrastructure::messaging::{
    BroadcastRoleBroadcaster, InMemoryEventBus, RedisRoleBroadcaster,
};
use crate::infrastructure::persistence::memory::{
    InMemoryConnectionRepository, InMemoryPresenceCache, InMemoryVisitorRepository,
};
use crate::infrastructure::persistence::redis::{
    RedisConnectionRepository, RedisPresenceCache, RedisStore, RedisVisitorRepository,
};
use crate::interface::{DisconnectScheduler, TransportLifecycle};

/// 由宿主提供的外部协作者
pub struct Collaborators {
    pub chats: Arc<dyn ChatRepository>,
    pub accounts: Arc<dyn AccountCompanyLookup>,
    /// 缺省使用配置中的密钥构建 HS256 验证器
    pub token_verifier: Option<Arc<dyn TokenVerifier>>,
}

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub config: Arc<PresenceConfig>,
    pub event_bus: Arc<InMemoryEventBus>,
    pub connections: Arc<dyn ConnectionRepository>,
    pub visitors: Arc<dyn VisitorRepository>,
    pub presence_cache: Arc<dyn PresenceCache>,
    pub connection_commands: Arc<ConnectionCommandHandler>,
    pub session_commands: Arc<SessionCommandHandler>,
    pub queries: Arc<PresenceQueryHandler>,
    pub transport: Arc<TransportLifecycle>,
    pub sweep: Arc<SessionSweepService>,
}

struct Stores {
    connections: Arc<dyn ConnectionRepository>,
    visitors: Arc<dyn VisitorRepository>,
    presence_cache: Arc<dyn PresenceCache>,
    broadcaster: Arc<dyn RoleBroadcaster>,
}

fn build_stores(config: &PresenceConfig) -> Result<Stores> {
    match config.store {
        StoreBackend::Memory => Ok(Stores {
            connections: Arc::new(InMemoryConnectionRepository::new()),
            visitors: Arc::new(InMemoryVisitorRepository::new()),
            presence_cache: Arc::new(InMemoryPresenceCache::new(Some(
                std::time::Duration::from_secs(config.presence_ttl_seconds),
            ))),
            broadcaster: Arc::new(BroadcastRoleBroadcaster::default()),
        }),
        StoreBackend::Redis => {
            let store = Arc::new(
                RedisStore::open(&config.redis_url, config.redis_namespace.clone())
                    .with_context(|| "Failed to create Redis client")?,
            );
            Ok(Stores {
                connections: Arc::new(RedisConnectionRepository::new(store.clone())),
                visitors: Arc::new(RedisVisitorRepository::new(store.clone())),
                presence_cache: Arc::new(RedisPresenceCache::new(
                    store.clone(),
                    config.presence_ttl_seconds,
                )),
                broadcaster: Arc::new(RedisRoleBroadcaster::new(store)),
            })
        }
    }
}

/// 构建应用上下文
///
/// # 参数
/// * `config` - 在线与分配服务配置
/// * `collaborators` - 聊天存储、账号目录等外部协作者
pub async fn initialize(
    config: PresenceConfig,
    collaborators: Collaborators,
) -> Result<ApplicationContext> {
    let config = Arc::new(config);

    // 1. 存储与事件总线
    let stores = build_stores(&config)?;
    let event_bus = Arc::new(InMemoryEventBus::new());
    let publisher: Arc<dyn EventPublisher> = event_bus.clone();

    // 2. 领域服务
    let commercial_lookup = Arc::new(CommercialLookupService::new(stores.connections.clone()));
    let policy = SessionTimeoutPolicy::new(config.tier_timeouts);

    // 3. 应用层 handlers
    let connection_commands = Arc::new(ConnectionCommandHandler::new(
        stores.connections.clone(),
        collaborators.accounts,
        publisher.clone(),
        stores.broadcaster,
    ));
    let session_commands = Arc::new(SessionCommandHandler::new(
        stores.visitors.clone(),
        stores.presence_cache.clone(),
        publisher.clone(),
    ));
    let queries = Arc::new(PresenceQueryHandler::new(
        stores.connections.clone(),
        commercial_lookup.clone(),
    ));

    // 4. 事件订阅
    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(NewChatCreatedHandler::new(
            commercial_lookup.clone(),
            publisher.clone(),
        )),
        Arc::new(CommercialConnectedHandler::new(
            commercial_lookup.clone(),
            collaborators.chats.clone(),
            publisher.clone(),
            config.scope_pending_chats_by_company,
        )),
        Arc::new(CommercialDisconnectedHandler::new(
            collaborators.chats,
            publisher.clone(),
        )),
        Arc::new(CommercialClaimReleasedHandler::new(
            commercial_lookup,
            publisher.clone(),
        )),
        Arc::new(PresenceCacheSyncHandler::new(stores.presence_cache.clone())),
        Arc::new(PresenceRebroadcastHandler::new(
            stores.visitors.clone(),
            publisher.clone(),
        )),
        Arc::new(SessionClosedSagaHandler::new(
            stores.visitors.clone(),
            publisher.clone(),
        )),
        Arc::new(VisitorConnectionBridgeHandler::new(
            stores.visitors.clone(),
            publisher.clone(),
        )),
    ];
    for handler in handlers {
        event_bus.subscribe(handler).await;
    }

    // 5. 传输层适配与后台清理
    let token_verifier: Arc<dyn TokenVerifier> = match collaborators.token_verifier {
        Some(verifier) => verifier,
        None => Arc::new(JwtTokenVerifier::new(config.token_secret.as_bytes())),
    };
    let scheduler = Arc::new(DisconnectScheduler::new(
        config.grace_period,
        connection_commands.clone(),
    ));
    let transport = Arc::new(TransportLifecycle::new(
        token_verifier,
        connection_commands.clone(),
        queries.clone(),
        scheduler,
    ));

    let sweep_tenant = config
        .sweep_tenant
        .clone()
        .map(TenantId::new)
        .transpose()
        .with_context(|| "Invalid sweep tenant")?;
    let sweep = Arc::new(SessionSweepService::new(
        stores.visitors.clone(),
        stores.connections.clone(),
        stores.presence_cache.clone(),
        publisher,
        policy,
        SessionSweepConfig {
            interval: config.sweep_interval,
            batch_size: config.sweep_batch_size,
            tenant_id: sweep_tenant,
        },
    ));

    info!(store = ?config.store, "Presence engine initialized");

    Ok(ApplicationContext {
        config,
        event_bus,
        connections: stores.connections,
        visitors: stores.visitors,
        presence_cache: stores.presence_cache,
        connection_commands,
        session_commands,
        queries,
        transport,
        sweep,
    })
}
