mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{
    CountingHandler, FixedChatRepository, company, harness, harness_with, test_config, user,
};
use engage_presence::application::commands::{ConnectUserCommand, DisconnectUserCommand};
use engage_presence::application::queries::FindConnectedCommercialsQuery;
use engage_presence::domain::event::connection_events::COMMERCIAL_CONNECTED;
use engage_presence::domain::event::{CommercialClaimReleasedEvent, NewChatCreatedEvent};
use engage_presence::domain::model::{Chat, ChatStatus};
use engage_presence::domain::repository::EventPublisher;
use engage_presence::domain::value_object::{ChatId, Role, SocketId};

fn connect(user_id: &str, roles: &[Role], socket: &str, company_id: &str) -> ConnectUserCommand {
    ConnectUserCommand {
        user_id: user(user_id),
        roles: roles.to_vec(),
        socket_id: SocketId::new(socket).unwrap(),
        company_id: Some(company(company_id)),
    }
}

fn chat(id: &str, company_id: &str, participants: &[&str]) -> Chat {
    Chat {
        id: ChatId::new(id).unwrap(),
        company_id: company(company_id),
        status: ChatStatus::Pending,
        participants: participants.iter().map(|p| user(p)).collect(),
    }
}

#[tokio::test]
async fn commercial_connecting_is_offered_every_pending_chat() {
    let h = harness().await;
    h.chats.upsert(chat("chat-1", "acme", &[])).await;
    h.chats.upsert(chat("chat-2", "acme", &[])).await;
    h.chats
        .upsert(Chat {
            status: ChatStatus::Assigned,
            ..chat("chat-3", "acme", &["someone"])
        })
        .await;

    h.context
        .connection_commands
        .handle_connect(connect("agent-1", &[Role::Commercial], "s1", "acme"))
        .await
        .unwrap();

    let assigned = h.recorder.assigned();
    assert_eq!(
        assigned,
        vec![
            ("chat-1".to_string(), vec!["agent-1".to_string()]),
            ("chat-2".to_string(), vec!["agent-1".to_string()]),
        ]
    );
}

#[tokio::test]
async fn assigned_event_carries_full_connected_set() {
    let h = harness().await;
    h.context
        .connection_commands
        .handle_connect(connect("agent-1", &[Role::Commercial], "s1", "acme"))
        .await
        .unwrap();
    h.chats.upsert(chat("chat-1", "acme", &[])).await;

    h.context
        .connection_commands
        .handle_connect(connect("agent-2", &[Role::Commercial], "s2", "acme"))
        .await
        .unwrap();

    assert_eq!(
        h.recorder.assigned(),
        vec![(
            "chat-1".to_string(),
            vec!["agent-1".to_string(), "agent-2".to_string()]
        )]
    );
}

#[tokio::test]
async fn visitor_connecting_does_not_trigger_assignment() {
    let h = harness().await;
    h.chats.upsert(chat("chat-1", "acme", &[])).await;

    h.context
        .connection_commands
        .handle_connect(connect("visitor-x", &[Role::Visitor], "s1", "acme"))
        .await
        .unwrap();

    assert!(h.recorder.assigned().is_empty());
}

#[tokio::test]
async fn reconnect_with_unheld_commercial_role_is_not_assigned() {
    let h = harness().await;
    let commercial_connected = Arc::new(CountingHandler::new(&[COMMERCIAL_CONNECTED]));
    h.context
        .event_bus
        .subscribe(commercial_connected.clone())
        .await;
    h.chats.upsert(chat("chat-1", "acme", &[])).await;

    let commands = &h.context.connection_commands;
    commands
        .handle_connect(connect("agent-9", &[Role::Visitor], "s1", "acme"))
        .await
        .unwrap();
    commands
        .handle_disconnect(DisconnectUserCommand {
            user_id: user("agent-9"),
        })
        .await
        .unwrap();

    // 注册表中的连接仍只有访客角色
    let connection = commands
        .handle_connect(connect("agent-9", &[Role::Commercial], "s2", "acme"))
        .await
        .unwrap();

    assert!(!connection.has_role(Role::Commercial));
    assert_eq!(commercial_connected.count(), 0);
    assert!(h.recorder.assigned().is_empty());
}

#[tokio::test]
async fn disconnect_unassigns_only_confirmed_participation() {
    // 外部索引返回 X 与 Y，但只有 X 的参与者列表包含该客服
    let stale = Arc::new(FixedChatRepository {
        chats: vec![
            chat("chat-x", "acme", &["agent-1"]),
            chat("chat-y", "acme", &["agent-2"]),
        ],
    });
    let h = harness_with(test_config(), Some(stale)).await;

    h.context
        .connection_commands
        .handle_connect(connect("agent-1", &[Role::Commercial], "s1", "acme"))
        .await
        .unwrap();
    h.recorder.clear();

    h.context
        .connection_commands
        .handle_disconnect(DisconnectUserCommand {
            user_id: user("agent-1"),
        })
        .await
        .unwrap();

    assert_eq!(
        h.recorder.unassigned(),
        vec![("chat-x".to_string(), vec!["agent-1".to_string()])]
    );
}

#[tokio::test]
async fn new_chat_without_connected_commercials_is_not_assigned() {
    let h = harness().await;
    // 已断开的客服不计入
    h.context
        .connection_commands
        .handle_connect(connect("agent-1", &[Role::Commercial], "s1", "acme"))
        .await
        .unwrap();
    h.context
        .connection_commands
        .handle_disconnect(DisconnectUserCommand {
            user_id: user("agent-1"),
        })
        .await
        .unwrap();

    h.context
        .event_bus
        .publish(
            NewChatCreatedEvent {
                chat_id: ChatId::new("chat-new").unwrap(),
                company_id: company("acme"),
                occurred_at: Utc::now(),
            }
            .into(),
        )
        .await
        .unwrap();

    assert!(h.recorder.assigned().is_empty());
}

#[tokio::test]
async fn new_chat_is_offered_within_its_company() {
    let h = harness().await;
    for (agent, socket, company_id) in [("a1", "s1", "acme"), ("a2", "s2", "globex")] {
        h.context
            .connection_commands
            .handle_connect(connect(agent, &[Role::Commercial], socket, company_id))
            .await
            .unwrap();
    }

    h.context
        .event_bus
        .publish(
            NewChatCreatedEvent {
                chat_id: ChatId::new("chat-new").unwrap(),
                company_id: company("globex"),
                occurred_at: Utc::now(),
            }
            .into(),
        )
        .await
        .unwrap();

    assert_eq!(
        h.recorder.assigned(),
        vec![("chat-new".to_string(), vec!["a2".to_string()])]
    );
}

#[tokio::test]
async fn released_claim_is_reoffered() {
    let h = harness().await;
    h.context
        .connection_commands
        .handle_connect(connect("a1", &[Role::Commercial], "s1", "acme"))
        .await
        .unwrap();

    h.context
        .event_bus
        .publish(
            CommercialClaimReleasedEvent {
                chat_id: ChatId::new("chat-9").unwrap(),
                commercial_id: user("a1"),
                company_id: company("acme"),
                occurred_at: Utc::now(),
            }
            .into(),
        )
        .await
        .unwrap();

    assert_eq!(
        h.recorder.assigned(),
        vec![("chat-9".to_string(), vec!["a1".to_string()])]
    );
}

#[tokio::test]
async fn connected_commercials_query_excludes_offline_and_other_roles() {
    let h = harness().await;
    let commands = &h.context.connection_commands;
    commands
        .handle_connect(connect("a1", &[Role::Commercial], "s1", "acme"))
        .await
        .unwrap();
    commands
        .handle_connect(connect("a2", &[Role::Commercial, Role::Admin], "s2", "acme"))
        .await
        .unwrap();
    commands
        .handle_connect(connect("admin", &[Role::Admin], "s3", "acme"))
        .await
        .unwrap();
    commands
        .handle_disconnect(DisconnectUserCommand { user_id: user("a1") })
        .await
        .unwrap();

    let connected = h
        .context
        .queries
        .handle_find_connected_commercials(FindConnectedCommercialsQuery::default())
        .await
        .unwrap();

    let ids: Vec<_> = connected.iter().map(|c| c.user_id().to_string()).collect();
    assert_eq!(ids, vec!["a2".to_string()]);
    assert!(
        connected
            .iter()
            .all(|c| c.is_connected() && c.has_role(Role::Commercial))
    );
}
