//! 查询处理器

use std::sync::Arc;

use tracing::instrument;

use crate::application::queries::{FindConnectedCommercialsQuery, FindConnectionBySocketIdQuery};
use crate::domain::model::{Connection, ConnectionField, Criteria};
use crate::domain::repository::ConnectionRepository;
use crate::domain::service::CommercialLookupService;
use crate::error::PresenceResult;

pub struct PresenceQueryHandler {
    connections: Arc<dyn ConnectionRepository>,
    commercial_lookup: Arc<CommercialLookupService>,
}

impl PresenceQueryHandler {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        commercial_lookup: Arc<CommercialLookupService>,
    ) -> Self {
        Self {
            connections,
            commercial_lookup,
        }
    }

    /// 未找到时返回 NotFound
    #[instrument(skip(self, query), fields(socket_id = %query.socket_id))]
    pub async fn handle_find_by_socket_id(
        &self,
        query: FindConnectionBySocketIdQuery,
    ) -> PresenceResult<Connection> {
        let criteria = Criteria::equals(ConnectionField::SocketId, query.socket_id.into_inner());
        self.connections.find_one(&criteria).await
    }

    #[instrument(skip(self))]
    pub async fn handle_find_connected_commercials(
        &self,
        query: FindConnectedCommercialsQuery,
    ) -> PresenceResult<Vec<Connection>> {
        self.commercial_lookup
            .get_connected_commercials(query.company_id.as_ref())
            .await
    }
}
