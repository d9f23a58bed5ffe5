//! Redis 连接注册表
//!
//! 键布局：
//! - `conn:user:{user}:socket`  → 套接字ID
//! - `conn:socket:{socket}`     → 用户ID
//! - `conn:user:{user}:roles`   → 角色集合
//! - `conn:user:{user}:company` → 公司ID
//! - `conn:users`               → 全部已知用户ID

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::warn;

use super::RedisStore;
use crate::domain::model::{Connection, ConnectionField, Criteria};
use crate::domain::repository::ConnectionRepository;
use crate::domain::value_object::{CompanyId, Role, SocketId, UserId};
use crate::error::{PresenceError, PresenceResult};

pub struct RedisConnectionRepository {
    store: Arc<RedisStore>,
}

impl RedisConnectionRepository {
    pub fn new(store: Arc<RedisStore>) -> Self {
        Self { store }
    }

    fn socket_key(&self, user_id: &str) -> String {
        self.store.key(&["conn", "user", user_id, "socket"])
    }

    fn socket_index_key(&self, socket_id: &str) -> String {
        self.store.key(&["conn", "socket", socket_id])
    }

    fn roles_key(&self, user_id: &str) -> String {
        self.store.key(&["conn", "user", user_id, "roles"])
    }

    fn company_key(&self, user_id: &str) -> String {
        self.store.key(&["conn", "user", user_id, "company"])
    }

    fn users_key(&self) -> String {
        self.store.key(&["conn", "users"])
    }

    async fn load(&self, user_id: &str) -> PresenceResult<Option<Connection>> {
        let mut conn = self.store.connection().await?;
        let (socket, roles, company): (Option<String>, Vec<String>, Option<String>) = redis::pipe()
            .get(self.socket_key(user_id))
            .smembers(self.roles_key(user_id))
            .get(self.company_key(user_id))
            .query_async(&mut conn)
            .await?;

        let Some(company) = company else {
            return Ok(None);
        };

        let roles: BTreeSet<Role> = Role::parse_all(&roles)?.into_iter().collect();
        Ok(Some(Connection::reconstitute(
            UserId::new(user_id)?,
            socket.map(SocketId::new).transpose()?,
            roles,
            CompanyId::new(company)?,
        )))
    }

    async fn user_for_socket(&self, socket_id: &str) -> PresenceResult<Option<String>> {
        let mut conn = self.store.connection().await?;
        Ok(conn.get(self.socket_index_key(socket_id)).await?)
    }
}

#[async_trait]
impl ConnectionRepository for RedisConnectionRepository {
    async fn save(&self, connection: &Connection) -> PresenceResult<()> {
        let user_id = connection.user_id().as_str();
        let mut conn = self.store.connection().await?;
        let previous_socket: Option<String> = conn.get(self.socket_key(user_id)).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();

        if let Some(previous) = previous_socket.as_deref() {
            if connection.socket_id().map(SocketId::as_str) != Some(previous) {
                pipe.del(self.socket_index_key(previous)).ignore();
            }
        }
        match connection.socket_id() {
            Some(socket) => {
                pipe.set(self.socket_key(user_id), socket.as_str()).ignore();
                pipe.set(self.socket_index_key(socket.as_str()), user_id)
                    .ignore();
            }
            None => {
                pipe.del(self.socket_key(user_id)).ignore();
            }
        }

        let roles: Vec<&str> = connection.roles().iter().map(Role::as_str).collect();
        pipe.del(self.roles_key(user_id)).ignore();
        pipe.sadd(self.roles_key(user_id), roles).ignore();
        pipe.set(self.company_key(user_id), connection.company_id().as_str())
            .ignore();
        pipe.sadd(self.users_key(), user_id).ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn remove(&self, connection: &Connection) -> PresenceResult<()> {
        let user_id = connection.user_id().as_str();
        let mut conn = self.store.connection().await?;
        let socket: Option<String> = conn.get(self.socket_key(user_id)).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(socket) = socket.as_deref() {
            pipe.del(self.socket_index_key(socket)).ignore();
        }
        pipe.del(vec![
            self.socket_key(user_id),
            self.roles_key(user_id),
            self.company_key(user_id),
        ])
        .ignore();
        pipe.srem(self.users_key(), user_id).ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn find(&self, criteria: &Criteria<ConnectionField>) -> PresenceResult<Vec<Connection>> {
        let candidates: Vec<String> = if let Some(user_id) = criteria.equals_value(ConnectionField::UserId) {
            vec![user_id.to_string()]
        } else if let Some(socket_id) = criteria.equals_value(ConnectionField::SocketId) {
            self.user_for_socket(socket_id).await?.into_iter().collect()
        } else {
            let mut conn = self.store.connection().await?;
            conn.smembers(self.users_key()).await?
        };

        let mut matched = Vec::new();
        for user_id in candidates {
            match self.load(&user_id).await {
                Ok(Some(connection)) if criteria.matches(&connection) => matched.push(connection),
                Ok(_) => {}
                Err(err) if !matches!(err, PresenceError::Repository(_)) => {
                    warn!(user_id = %user_id, error = %err, "Skipping malformed connection record");
                }
                Err(err) => return Err(err),
            }
        }
        matched.sort_by(|a, b| a.user_id().cmp(b.user_id()));
        Ok(matched)
    }

    async fn find_by_id(&self, user_id: &UserId) -> PresenceResult<Option<Connection>> {
        self.load(user_id.as_str()).await
    }
}
