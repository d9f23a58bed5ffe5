//! 命令处理器、查询处理器与事件处理器

mod assignment_handlers;
mod connection_command_handler;
mod query_handler;
mod session_command_handler;
mod visitor_handlers;

pub use assignment_handlers::{
    CommercialClaimReleasedHandler, CommercialConnectedHandler, CommercialDisconnectedHandler,
    NewChatCreatedHandler,
};
pub use connection_command_handler::ConnectionCommandHandler;
pub use query_handler::PresenceQueryHandler;
pub use session_command_handler::{IdentifiedVisitor, SessionCommandHandler};
pub use visitor_handlers::{
    PresenceCacheSyncHandler, PresenceRebroadcastHandler, SUBJECT_TYPE_VISITOR,
    SessionClosedSagaHandler, VisitorConnectionBridgeHandler,
};

use tracing::warn;

use crate::domain::aggregate::Visitor;
use crate::domain::repository::{EventPublisher, VisitorRepository};
use crate::error::PresenceResult;

/// 保存访客，成功后发布其缓冲的事件
///
/// 发布失败只记录日志，保存失败原样返回
pub(crate) async fn commit_visitor(
    visitors: &dyn VisitorRepository,
    publisher: &dyn EventPublisher,
    visitor: &mut Visitor,
) -> PresenceResult<()> {
    visitors.save(visitor).await?;
    let events = visitor.take_events();
    if events.is_empty() {
        return Ok(());
    }
    if let Err(err) = publisher.publish_all(events).await {
        warn!(visitor_id = %visitor.id(), error = %err, "Failed to publish visitor events");
    }
    Ok(())
}
