use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::repository::AccountCompanyLookup;
use crate::domain::value_object::{CompanyId, UserId};
use crate::error::{PresenceError, PresenceResult};

/// 内存账号目录：user_id → company_id
#[derive(Default)]
pub struct InMemoryAccountDirectory {
    accounts: DashMap<UserId, CompanyId>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: UserId, company_id: CompanyId) {
        self.accounts.insert(user_id, company_id);
    }
}

#[async_trait]
impl AccountCompanyLookup for InMemoryAccountDirectory {
    async fn company_of(&self, user_id: &UserId) -> PresenceResult<CompanyId> {
        self.accounts
            .get(user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PresenceError::not_found("account", user_id.as_str()))
    }
}
