//! 领域服务

mod commercial_lookup_service;
mod session_timeout_policy;

pub use commercial_lookup_service::CommercialLookupService;
pub use session_timeout_policy::{SessionTimeoutPolicy, TierTimeouts};
