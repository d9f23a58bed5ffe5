//! 应用服务（后台任务）

mod session_sweep_service;

pub use session_sweep_service::{SessionSweepConfig, SessionSweepService, SweepReport};
