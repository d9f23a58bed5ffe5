//! 断线宽限期调度
//!
//! 套接字关闭后延迟执行 DisconnectUser；宽限期内重连则取消。
//! 每个用户最多一个待执行任务，只保存在进程内存中。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::application::commands::DisconnectUserCommand;
use crate::application::handlers::ConnectionCommandHandler;
use crate::domain::value_object::UserId;

struct PendingDisconnect {
    generation: u64,
    abort: Option<AbortHandle>,
}

pub struct DisconnectScheduler {
    grace_period: Duration,
    commands: Arc<ConnectionCommandHandler>,
    pending: Arc<DashMap<UserId, PendingDisconnect>>,
    next_generation: AtomicU64,
}

impl DisconnectScheduler {
    pub fn new(grace_period: Duration, commands: Arc<ConnectionCommandHandler>) -> Self {
        Self {
            grace_period,
            commands,
            pending: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// 安排延迟断开，替换该用户之前的待执行任务
    pub fn schedule(&self, user_id: UserId) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let previous = self.pending.insert(
            user_id.clone(),
            PendingDisconnect {
                generation,
                abort: None,
            },
        );
        if let Some(abort) = previous.and_then(|p| p.abort) {
            abort.abort();
        }

        let pending = Arc::clone(&self.pending);
        let commands = Arc::clone(&self.commands);
        let grace_period = self.grace_period;
        let task_user = user_id.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;

            // 只有仍是当前代次的任务才执行，已取消或被替换则退出
            if pending
                .remove_if(&task_user, |_, p| p.generation == generation)
                .is_none()
            {
                return;
            }

            debug!(user_id = %task_user, "Grace period elapsed, disconnecting");
            if let Err(err) = commands
                .handle_disconnect(DisconnectUserCommand {
                    user_id: task_user.clone(),
                })
                .await
            {
                warn!(user_id = %task_user, error = %err, "Delayed disconnect failed");
            }
        });

        if let Some(mut entry) = self.pending.get_mut(&user_id) {
            if entry.generation == generation {
                entry.abort = Some(task.abort_handle());
            }
        }
    }

    /// 取消待执行的断开，返回是否存在待执行任务
    pub fn cancel(&self, user_id: &UserId) -> bool {
        match self.pending.remove(user_id) {
            Some((_, pending)) => {
                if let Some(abort) = pending.abort {
                    abort.abort();
                }
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, user_id: &UserId) -> bool {
        self.pending.contains_key(user_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }
}
