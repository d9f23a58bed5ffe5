//! 会话超时清理
//!
//! 周期性扫描有活跃会话的访客，按生命周期层级关闭空闲会话。
//! 连接注册表或在线缓存显示仍在线的访客跳过；单个访客保存失败只记录日志，不中断批次。
//! 扫描按访客ID分页推进，游标跨轮次保留，保证批次之外的访客最终会被扫到。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::application::handlers::commit_visitor;
use crate::domain::aggregate::Visitor;
use crate::domain::repository::{ConnectionRepository, EventPublisher, PresenceCache, VisitorRepository};
use crate::domain::service::SessionTimeoutPolicy;
use crate::domain::value_object::{TenantId, UserId, VisitorId};
use crate::error::PresenceResult;

/// 清理任务配置
#[derive(Debug, Clone)]
pub struct SessionSweepConfig {
    /// 扫描间隔
    pub interval: Duration,
    /// 每批最多处理的访客数
    pub batch_size: usize,
    /// 租户过滤
    pub tenant_id: Option<TenantId>,
}

impl Default for SessionSweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 500,
            tenant_id: None,
        }
    }
}

/// 单次清理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub skipped_live: usize,
    pub visitors_cleaned: usize,
    pub sessions_closed: usize,
    pub failures: usize,
}

pub struct SessionSweepService {
    visitors: Arc<dyn VisitorRepository>,
    connections: Arc<dyn ConnectionRepository>,
    presence_cache: Arc<dyn PresenceCache>,
    publisher: Arc<dyn EventPublisher>,
    policy: SessionTimeoutPolicy,
    config: SessionSweepConfig,
    /// 上次扫描停下的位置，扫到末尾后归零
    cursor: Mutex<Option<VisitorId>>,
}

impl SessionSweepService {
    pub fn new(
        visitors: Arc<dyn VisitorRepository>,
        connections: Arc<dyn ConnectionRepository>,
        presence_cache: Arc<dyn PresenceCache>,
        publisher: Arc<dyn EventPublisher>,
        policy: SessionTimeoutPolicy,
        config: SessionSweepConfig,
    ) -> Self {
        Self {
            visitors,
            connections,
            presence_cache,
            publisher,
            policy,
            config,
            cursor: Mutex::new(None),
        }
    }

    /// 执行一次清理
    ///
    /// 在线访客不占用批次额度；本次处理满 `batch_size` 个离线访客后停下，
    /// 下次从停下的位置继续。
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> PresenceResult<SweepReport> {
        let batch_size = self.config.batch_size.max(1);
        let mut cursor = self.cursor.lock().await;
        let mut report = SweepReport::default();
        let mut processed = 0;

        'pages: loop {
            let page = self
                .visitors
                .find_with_active_sessions(cursor.as_ref(), batch_size, self.config.tenant_id.as_ref())
                .await?;
            let exhausted = page.len() < batch_size;

            for mut visitor in page {
                *cursor = Some(visitor.id().clone());
                report.scanned += 1;

                match self.is_live(&visitor).await {
                    Ok(true) => {
                        report.skipped_live += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(visitor_id = %visitor.id(), error = %err, "Connection registry lookup failed, skipping visitor");
                        report.failures += 1;
                        continue;
                    }
                }

                processed += 1;
                if self.policy.has_expired_sessions(&visitor, now) {
                    let closed = self.policy.clean_expired_sessions(&mut visitor, now);
                    match commit_visitor(self.visitors.as_ref(), self.publisher.as_ref(), &mut visitor).await {
                        Ok(()) => {
                            debug!(visitor_id = %visitor.id(), closed = closed.len(), "Expired sessions closed");
                            report.visitors_cleaned += 1;
                            report.sessions_closed += closed.len();
                        }
                        Err(err) => {
                            error!(visitor_id = %visitor.id(), error = %err, "Failed to persist swept visitor");
                            report.failures += 1;
                        }
                    }
                }

                if processed >= batch_size {
                    break 'pages;
                }
            }

            if exhausted {
                *cursor = None;
                break;
            }
        }

        Ok(report)
    }

    /// 连接注册表中仍在线，或在线缓存仍存活
    async fn is_live(&self, visitor: &Visitor) -> PresenceResult<bool> {
        let user_id = UserId::new(visitor.id().as_str())?;
        if self
            .connections
            .find_by_id(&user_id)
            .await?
            .is_some_and(|connection| connection.is_connected())
        {
            return Ok(true);
        }

        match self.presence_cache.is_connected(visitor.id()).await {
            Ok(live) => Ok(live),
            Err(err) => {
                warn!(visitor_id = %visitor.id(), error = %err, "Presence cache lookup failed, relying on connection registry");
                Ok(false)
            }
        }
    }

    /// 启动周期性清理任务
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "Session sweep started"
        );

        tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.sweep_once(Utc::now()).await {
                    Ok(report) if report.sessions_closed > 0 || report.failures > 0 => {
                        info!(?report, "Session sweep finished");
                    }
                    Ok(_) => {}
                    Err(err) => error!(error = %err, "Session sweep failed"),
                }
            }
        })
    }
}
