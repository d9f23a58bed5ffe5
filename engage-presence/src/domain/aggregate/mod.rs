//! 聚合根（Aggregates）

mod session;
mod visitor;

pub use session::{END_REASON_TIMEOUT, VisitorSession};
pub use visitor::Visitor;
