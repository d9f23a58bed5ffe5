use std::sync::Arc;

use crate::domain::model::{Connection, ConnectionField, Criteria};
use crate::domain::repository::ConnectionRepository;
use crate::domain::value_object::{CompanyId, Role};
use crate::error::{PresenceError, PresenceResult};

/// 在线客服查询服务
pub struct CommercialLookupService {
    repository: Arc<dyn ConnectionRepository>,
}

impl CommercialLookupService {
    pub fn new(repository: Arc<dyn ConnectionRepository>) -> Self {
        Self { repository }
    }

    /// 查询当前在线（持有套接字）的客服，可按公司过滤
    ///
    /// 存储失败包装为 Repository 错误返回调用方
    pub async fn get_connected_commercials(
        &self,
        company_id: Option<&CompanyId>,
    ) -> PresenceResult<Vec<Connection>> {
        let mut criteria = Criteria::equals(ConnectionField::Roles, Role::Commercial.as_str());
        if let Some(company_id) = company_id {
            criteria = criteria.and(Criteria::equals(
                ConnectionField::CompanyId,
                company_id.as_str(),
            ));
        }

        let connections = self.repository.find(&criteria).await.map_err(|err| match err {
            PresenceError::Repository(_) => err,
            other => PresenceError::repository(other),
        })?;

        Ok(connections
            .into_iter()
            .filter(|c| c.is_connected() && c.has_role(Role::Commercial))
            .collect())
    }
}
