mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{
    CountingHandler, FailingChatRepository, FailingConnectionRepository, FlakyVisitorRepository,
    company, harness_with, test_config, user,
};
use engage_presence::application::commands::{ConnectUserCommand, DisconnectUserCommand};
use engage_presence::application::services::{SessionSweepConfig, SessionSweepService};
use engage_presence::domain::aggregate::Visitor;
use engage_presence::domain::event::connection_events::COMMERCIAL_CONNECTED;
use engage_presence::domain::repository::VisitorRepository;
use engage_presence::domain::service::{CommercialLookupService, SessionTimeoutPolicy};
use engage_presence::domain::value_object::{Role, SiteId, SocketId, TenantId};
use engage_presence::error::PresenceError;
use engage_presence::infrastructure::messaging::InMemoryEventBus;
use engage_presence::infrastructure::persistence::memory::{
    InMemoryConnectionRepository, InMemoryPresenceCache,
};

fn validation_error() -> PresenceError {
    PresenceError::validation("unsupported criteria")
}

fn storage_error() -> PresenceError {
    PresenceError::repository(anyhow::anyhow!("connection refused"))
}

fn missing_error() -> PresenceError {
    PresenceError::not_found("connection", "agent-1")
}

#[tokio::test]
async fn sweep_continues_after_a_failed_save() {
    let visitors = Arc::new(FlakyVisitorRepository::new());
    let now = Utc::now();

    let mut ids = Vec::new();
    for fingerprint in ["fp-ok", "fp-broken"] {
        let mut visitor = Visitor::identify(
            TenantId::new("tenant-1").unwrap(),
            SiteId::new("site-1").unwrap(),
            fingerprint,
            now,
        )
        .unwrap();
        visitor.start_session(now);
        visitor.take_events();
        visitors.save(&visitor).await.unwrap();
        ids.push(visitor.id().clone());
    }
    visitors.fail_saves_for(&ids[1]);

    let sweep = SessionSweepService::new(
        visitors.clone(),
        Arc::new(InMemoryConnectionRepository::new()),
        Arc::new(InMemoryPresenceCache::new(None)),
        Arc::new(InMemoryEventBus::new()),
        SessionTimeoutPolicy::default(),
        SessionSweepConfig::default(),
    );

    let report = sweep.sweep_once(now + Duration::minutes(6)).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.failures, 1);
    assert_eq!(report.visitors_cleaned, 1);
    assert_eq!(report.sessions_closed, 1);

    let cleaned = visitors.find_by_id(&ids[0]).await.unwrap().unwrap();
    assert_eq!(cleaned.active_session_count(), 0);
    let untouched = visitors.find_by_id(&ids[1]).await.unwrap().unwrap();
    assert_eq!(untouched.active_session_count(), 1);
}

#[tokio::test]
async fn commercial_lookup_reports_store_failures_as_repository_errors() {
    for error in [validation_error, storage_error, missing_error] {
        let lookup = CommercialLookupService::new(Arc::new(FailingConnectionRepository { error }));

        let err = lookup
            .get_connected_commercials(Some(&company("acme")))
            .await
            .unwrap_err();
        assert!(matches!(err, PresenceError::Repository(_)), "got {err}");
    }
}

#[tokio::test]
async fn failing_chat_store_does_not_block_other_handlers() {
    let h = harness_with(test_config(), Some(Arc::new(FailingChatRepository))).await;
    let commercial_connected = Arc::new(CountingHandler::new(&[COMMERCIAL_CONNECTED]));
    h.context
        .event_bus
        .subscribe(commercial_connected.clone())
        .await;

    let connection = h
        .context
        .connection_commands
        .handle_connect(ConnectUserCommand {
            user_id: user("agent-1"),
            roles: vec![Role::Commercial],
            socket_id: SocketId::new("s1").unwrap(),
            company_id: Some(company("acme")),
        })
        .await
        .unwrap();
    assert!(connection.is_connected());
    assert_eq!(commercial_connected.count(), 1);
    assert!(h.recorder.assigned().is_empty());

    h.context
        .connection_commands
        .handle_disconnect(DisconnectUserCommand {
            user_id: user("agent-1"),
        })
        .await
        .unwrap();
    assert!(h.recorder.unassigned().is_empty());
}
