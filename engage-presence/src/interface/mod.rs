//! 接口层：传输层连接生命周期适配

mod disconnect_scheduler;
mod transport_lifecycle;

pub use disconnect_scheduler::DisconnectScheduler;
pub use transport_lifecycle::TransportLifecycle;
