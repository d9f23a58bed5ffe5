use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::model::{Connection, ConnectionField, Criteria};
use crate::domain::repository::ConnectionRepository;
use crate::domain::value_object::UserId;
use crate::error::PresenceResult;

/// 内存连接注册表，查询条件在进程内求值
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: RwLock<HashMap<UserId, Connection>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn save(&self, connection: &Connection) -> PresenceResult<()> {
        self.connections
            .write()
            .await
            .insert(connection.user_id().clone(), connection.clone());
        Ok(())
    }

    async fn remove(&self, connection: &Connection) -> PresenceResult<()> {
        self.connections.write().await.remove(connection.user_id());
        Ok(())
    }

    async fn find(&self, criteria: &Criteria<ConnectionField>) -> PresenceResult<Vec<Connection>> {
        let connections = self.connections.read().await;
        let mut matched: Vec<Connection> = connections
            .values()
            .filter(|c| criteria.matches(*c))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.user_id().cmp(b.user_id()));
        Ok(matched)
    }

    async fn find_by_id(&self, user_id: &UserId) -> PresenceResult<Option<Connection>> {
        Ok(self.connections.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{CompanyId, Role, SocketId};

    fn connection(user: &str, role: Role, socket: Option<&str>) -> Connection {
        let mut conn = Connection::new(
            UserId::new(user).unwrap(),
            [role],
            CompanyId::new("acme").unwrap(),
        )
        .unwrap();
        if let Some(socket) = socket {
            conn.connect(SocketId::new(socket).unwrap());
        }
        conn
    }

    #[tokio::test]
    async fn test_find_by_socket_and_role() {
        let repo = InMemoryConnectionRepository::new();
        repo.save(&connection("agent-1", Role::Commercial, Some("s1")))
            .await
            .unwrap();
        repo.save(&connection("visitor-1", Role::Visitor, Some("s2")))
            .await
            .unwrap();

        let by_socket = repo
            .find_one(&Criteria::equals(ConnectionField::SocketId, "s2"))
            .await
            .unwrap();
        assert_eq!(by_socket.user_id().as_str(), "visitor-1");

        let commercials = repo
            .find(&Criteria::equals(ConnectionField::Roles, "commercial"))
            .await
            .unwrap();
        assert_eq!(commercials.len(), 1);

        let missing = repo
            .find_one(&Criteria::equals(ConnectionField::SocketId, "nope"))
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
        assert!(
            repo.find(&Criteria::equals(ConnectionField::UserId, "nobody"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_save_upserts_by_user_id() {
        let repo = InMemoryConnectionRepository::new();
        repo.save(&connection("agent-1", Role::Commercial, Some("s1")))
            .await
            .unwrap();
        repo.save(&connection("agent-1", Role::Commercial, Some("s9")))
            .await
            .unwrap();

        let all = repo.find(&Criteria::And(vec![])).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].socket_id().unwrap().as_str(), "s9");

        repo.remove(&all[0]).await.unwrap();
        assert!(
            repo.find_by_id(&UserId::new("agent-1").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }
}
