use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::criteria::{FieldValue, Filterable};
use crate::domain::value_object::{CompanyId, Role, SocketId, UserId};
use crate::error::{PresenceError, PresenceResult};

/// 连接记录（Connection）
///
/// 职责：表示一个客服或访客在传输层的连接
/// 设计要点：
/// - `user_id` 唯一，同一用户重连会替换旧套接字
/// - 在线当且仅当持有 `socket_id`，断开只清空套接字，不删除记录
/// - 角色集合非空，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    user_id: UserId,
    socket_id: Option<SocketId>,
    roles: BTreeSet<Role>,
    company_id: CompanyId,
}

/// 连接注册表可查询的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionField {
    UserId,
    SocketId,
    Roles,
    CompanyId,
}

impl Connection {
    /// 创建新连接（尚未绑定套接字）
    pub fn new(
        user_id: UserId,
        roles: impl IntoIterator<Item = Role>,
        company_id: CompanyId,
    ) -> PresenceResult<Self> {
        let roles: BTreeSet<Role> = roles.into_iter().collect();
        if roles.is_empty() {
            return Err(PresenceError::validation(format!(
                "Connection {} must hold at least one role",
                user_id
            )));
        }

        Ok(Self {
            user_id,
            socket_id: None,
            roles,
            company_id,
        })
    }

    /// 从持久化数据重建（仓储专用）
    pub fn reconstitute(
        user_id: UserId,
        socket_id: Option<SocketId>,
        roles: BTreeSet<Role>,
        company_id: CompanyId,
    ) -> Self {
        Self {
            user_id,
            socket_id,
            roles,
            company_id,
        }
    }

    /// 绑定套接字，返回被替换的旧套接字
    pub fn connect(&mut self, socket_id: SocketId) -> Option<SocketId> {
        self.socket_id.replace(socket_id)
    }

    /// 清空套接字（幂等），返回被清除的套接字
    pub fn disconnect(&mut self) -> Option<SocketId> {
        self.socket_id.take()
    }

    pub fn is_connected(&self) -> bool {
        self.socket_id.is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn socket_id(&self) -> Option<&SocketId> {
        self.socket_id.as_ref()
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.company_id
    }
}

impl Filterable for Connection {
    type Field = ConnectionField;

    fn field_value(&self, field: ConnectionField) -> FieldValue<'_> {
        match field {
            ConnectionField::UserId => FieldValue::Scalar(Some(self.user_id.as_str())),
            ConnectionField::SocketId => {
                FieldValue::Scalar(self.socket_id.as_ref().map(SocketId::as_str))
            }
            ConnectionField::Roles => {
                FieldValue::Set(self.roles.iter().map(Role::as_str).collect())
            }
            ConnectionField::CompanyId => FieldValue::Scalar(Some(self.company_id.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Criteria;

    fn commercial(user: &str) -> Connection {
        Connection::new(
            UserId::new(user).unwrap(),
            [Role::Commercial],
            CompanyId::new("acme").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_connected_iff_socket_present() {
        let mut conn = commercial("agent-1");
        assert!(!conn.is_connected());

        assert_eq!(conn.connect(SocketId::new("s1").unwrap()), None);
        assert!(conn.is_connected());

        let previous = conn.connect(SocketId::new("s2").unwrap());
        assert_eq!(previous.unwrap().as_str(), "s1");
        assert_eq!(conn.socket_id().unwrap().as_str(), "s2");

        assert!(conn.disconnect().is_some());
        assert!(!conn.is_connected());
        // 重复断开是空操作
        assert!(conn.disconnect().is_none());
        assert_eq!(conn.is_connected(), conn.socket_id().is_some());
    }

    #[test]
    fn test_roles_must_not_be_empty() {
        let result = Connection::new(
            UserId::new("u").unwrap(),
            Vec::<Role>::new(),
            CompanyId::new("acme").unwrap(),
        );
        assert!(matches!(result, Err(PresenceError::Validation(_))));
    }

    #[test]
    fn test_role_criteria_uses_membership() {
        let conn = Connection::new(
            UserId::new("boss").unwrap(),
            [Role::Commercial, Role::Admin],
            CompanyId::new("acme").unwrap(),
        )
        .unwrap();

        assert!(Criteria::equals(ConnectionField::Roles, "commercial").matches(&conn));
        assert!(Criteria::equals(ConnectionField::Roles, "admin").matches(&conn));
        assert!(!Criteria::equals(ConnectionField::Roles, "visitor").matches(&conn));
        assert!(Criteria::is_null(ConnectionField::SocketId).matches(&conn));
    }
}
