#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use engage_presence::PresenceConfig;
use engage_presence::domain::event::PresenceEvent;
use engage_presence::domain::event::assignment_events::{
    CHAT_COMMERCIALS_ASSIGNED, CHAT_COMMERCIALS_UNASSIGNED,
};
use engage_presence::domain::event::visitor_events::PRESENCE_CHANGED;
use engage_presence::domain::aggregate::Visitor;
use engage_presence::domain::model::{Chat, ChatField, Connection, ConnectionField, Criteria};
use engage_presence::domain::repository::{
    ChatRepository, ConnectionRepository, EventHandler, TokenVerifier, VerifiedSubject,
    VisitorRepository,
};
use engage_presence::domain::value_object::{
    CompanyId, Role, SessionId, SiteId, TenantId, UserId, VisitorId,
};
use engage_presence::error::{PresenceError, PresenceResult};
use engage_presence::infrastructure::directory::InMemoryAccountDirectory;
use engage_presence::infrastructure::persistence::memory::{
    InMemoryChatRepository, InMemoryVisitorRepository,
};
use engage_presence::service::wire::{self, ApplicationContext, Collaborators};

/// 记录分配与在线广播事件
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<PresenceEvent>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<PresenceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn assigned(&self) -> Vec<(String, Vec<String>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenceEvent::ChatCommercialsAssigned(a) => Some((
                    a.chat_id.to_string(),
                    a.commercial_ids.iter().map(|id| id.to_string()).collect(),
                )),
                _ => None,
            })
            .collect()
    }

    pub fn unassigned(&self) -> Vec<(String, Vec<String>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenceEvent::ChatCommercialsUnassigned(a) => Some((
                    a.chat_id.to_string(),
                    a.commercial_ids.iter().map(|id| id.to_string()).collect(),
                )),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    fn name(&self) -> &'static str {
        "EventRecorder"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[
            CHAT_COMMERCIALS_ASSIGNED,
            CHAT_COMMERCIALS_UNASSIGNED,
            PRESENCE_CHANGED,
        ]
    }

    async fn handle(&self, event: &PresenceEvent) -> PresenceResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// 令牌即用户ID的验证器
#[derive(Default)]
pub struct StaticTokenVerifier {
    subjects: Mutex<HashMap<String, VerifiedSubject>>,
}

impl StaticTokenVerifier {
    pub fn register(&self, token: &str, user: &str, roles: &[Role], company: Option<&str>) {
        self.subjects.lock().unwrap().insert(
            token.to_string(),
            VerifiedSubject {
                subject_id: UserId::new(user).unwrap(),
                roles: roles.to_vec(),
                company_id: company.map(|c| CompanyId::new(c).unwrap()),
            },
        );
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> PresenceResult<VerifiedSubject> {
        self.subjects
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| PresenceError::validation("unknown token"))
    }
}

/// 忽略查询条件、原样返回固定结果的聊天存储（模拟过期的外部索引）
pub struct FixedChatRepository {
    pub chats: Vec<Chat>,
}

#[async_trait]
impl ChatRepository for FixedChatRepository {
    async fn find_by_criteria(&self, _criteria: &Criteria<ChatField>) -> PresenceResult<Vec<Chat>> {
        Ok(self.chats.clone())
    }
}

/// 任何查询都失败的聊天存储
pub struct FailingChatRepository;

#[async_trait]
impl ChatRepository for FailingChatRepository {
    async fn find_by_criteria(&self, _criteria: &Criteria<ChatField>) -> PresenceResult<Vec<Chat>> {
        Err(PresenceError::repository(anyhow::anyhow!("chat store unavailable")))
    }
}

/// 查询返回固定错误的连接注册表
pub struct FailingConnectionRepository {
    pub error: fn() -> PresenceError,
}

#[async_trait]
impl ConnectionRepository for FailingConnectionRepository {
    async fn save(&self, _connection: &Connection) -> PresenceResult<()> {
        Err((self.error)())
    }

    async fn remove(&self, _connection: &Connection) -> PresenceResult<()> {
        Err((self.error)())
    }

    async fn find(&self, _criteria: &Criteria<ConnectionField>) -> PresenceResult<Vec<Connection>> {
        Err((self.error)())
    }

    async fn find_by_id(&self, _user_id: &UserId) -> PresenceResult<Option<Connection>> {
        Err((self.error)())
    }
}

/// 对指定访客保存失败，其余操作委托给内存仓储
pub struct FlakyVisitorRepository {
    pub inner: InMemoryVisitorRepository,
    pub failing: Mutex<Option<VisitorId>>,
}

impl FlakyVisitorRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryVisitorRepository::new(),
            failing: Mutex::new(None),
        }
    }

    pub fn fail_saves_for(&self, visitor_id: &VisitorId) {
        *self.failing.lock().unwrap() = Some(visitor_id.clone());
    }
}

#[async_trait]
impl VisitorRepository for FlakyVisitorRepository {
    async fn save(&self, visitor: &Visitor) -> PresenceResult<()> {
        if self.failing.lock().unwrap().as_ref() == Some(visitor.id()) {
            return Err(PresenceError::repository(anyhow::anyhow!("write rejected")));
        }
        self.inner.save(visitor).await
    }

    async fn find_by_id(&self, visitor_id: &VisitorId) -> PresenceResult<Option<Visitor>> {
        self.inner.find_by_id(visitor_id).await
    }

    async fn find_by_fingerprint(
        &self,
        site_id: &SiteId,
        fingerprint: &str,
    ) -> PresenceResult<Option<Visitor>> {
        self.inner.find_by_fingerprint(site_id, fingerprint).await
    }

    async fn find_by_session_id(&self, session_id: &SessionId) -> PresenceResult<Option<Visitor>> {
        self.inner.find_by_session_id(session_id).await
    }

    async fn find_with_active_sessions(
        &self,
        after: Option<&VisitorId>,
        limit: usize,
        tenant_id: Option<&TenantId>,
    ) -> PresenceResult<Vec<Visitor>> {
        self.inner
            .find_with_active_sessions(after, limit, tenant_id)
            .await
    }
}

/// 统计收到的指定类型事件
pub struct CountingHandler {
    event_types: &'static [&'static str],
    count: AtomicUsize,
}

impl CountingHandler {
    pub fn new(event_types: &'static [&'static str]) -> Self {
        Self {
            event_types,
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for CountingHandler {
    fn name(&self) -> &'static str {
        "CountingHandler"
    }

    fn event_types(&self) -> &'static [&'static str] {
        self.event_types
    }

    async fn handle(&self, _event: &PresenceEvent) -> PresenceResult<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub context: ApplicationContext,
    pub chats: Arc<InMemoryChatRepository>,
    pub accounts: Arc<InMemoryAccountDirectory>,
    pub tokens: Arc<StaticTokenVerifier>,
    pub recorder: Arc<EventRecorder>,
}

pub fn test_config() -> PresenceConfig {
    PresenceConfig {
        grace_period: Duration::from_millis(50),
        ..PresenceConfig::default()
    }
}

pub async fn harness() -> Harness {
    harness_with(test_config(), None).await
}

pub async fn harness_with(
    config: PresenceConfig,
    chat_override: Option<Arc<dyn ChatRepository>>,
) -> Harness {
    let chats = Arc::new(InMemoryChatRepository::new());
    let accounts = Arc::new(InMemoryAccountDirectory::new());
    let tokens = Arc::new(StaticTokenVerifier::default());

    let chat_repository: Arc<dyn ChatRepository> = match chat_override {
        Some(repository) => repository,
        None => chats.clone(),
    };
    let verifier: Arc<dyn TokenVerifier> = tokens.clone();

    let context = wire::initialize(
        config,
        Collaborators {
            chats: chat_repository,
            accounts: accounts.clone(),
            token_verifier: Some(verifier),
        },
    )
    .await
    .unwrap();

    let recorder = Arc::new(EventRecorder::default());
    context.event_bus.subscribe(recorder.clone()).await;

    Harness {
        context,
        chats,
        accounts,
        tokens,
        recorder,
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn company(id: &str) -> CompanyId {
    CompanyId::new(id).unwrap()
}
