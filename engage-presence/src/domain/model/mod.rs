mod chat;
mod connection;
pub mod criteria;
mod lifecycle_tier;
mod visitor_status;

pub use chat::{Chat, ChatField, ChatStatus};
pub use connection::{Connection, ConnectionField};
pub use criteria::{Criteria, FieldValue, Filter, Filterable, Operator};
pub use lifecycle_tier::LifecycleTier;
pub use visitor_status::{ConnectionTransition, VisitorConnectionStatus};
