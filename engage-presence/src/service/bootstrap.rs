//! 应用启动器 - 负责依赖注入和服务启动

use std::sync::Arc;

use anyhow::{Context, Result};
use engage_core::EngageAppConfig;
use tracing::{info, warn};

use crate::config::PresenceConfig;
use crate::infrastructure::directory::InMemoryAccountDirectory;
use crate::infrastructure::persistence::memory::InMemoryChatRepository;
use crate::service::wire::{self, ApplicationContext, Collaborators};

/// 应用启动器
pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点
    pub async fn run(app_config: &'static EngageAppConfig) -> Result<()> {
        let context = Self::create_context(app_config).await?;
        Self::serve(context).await
    }

    /// 创建应用上下文（独立部署时使用内存版聊天存储与账号目录）
    pub async fn create_context(app_config: &EngageAppConfig) -> Result<ApplicationContext> {
        let config = PresenceConfig::from_app_config(app_config)
            .context("Failed to load presence service configuration")?;

        let collaborators = Collaborators {
            chats: Arc::new(InMemoryChatRepository::new()),
            accounts: Arc::new(InMemoryAccountDirectory::new()),
            token_verifier: None,
        };

        wire::initialize(config, collaborators).await
    }

    /// 启动后台清理任务并等待退出信号
    pub async fn serve(context: ApplicationContext) -> Result<()> {
        let sweep = context.sweep.clone().spawn();

        info!(
            grace_period_ms = context.config.grace_period.as_millis() as u64,
            "Presence engine running"
        );

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;

        info!("Shutdown signal received");
        sweep.abort();
        if context.transport.scheduler().pending_count() > 0 {
            warn!(
                pending = context.transport.scheduler().pending_count(),
                "Dropping pending delayed disconnects on shutdown"
            );
        }
        Ok(())
    }
}
