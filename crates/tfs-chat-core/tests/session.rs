use httpmock::prelude::*;
use serde_json::json;
use tfs_chat_core::{
    ActivityHistory, ApiClient, Block, Capability, ChatRole, ChatSession, MemoryStore,
};

async fn mock_status(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/status");
            then.status(200).json_body(json!({
                "status": "healthy",
                "services": {
                    "tfs": { "name": "TFS/Azure DevOps", "description": "Задачи", "available": true },
                    "confluence": { "name": "Confluence", "description": "Wiki", "available": true }
                }
            }));
        })
        .await;
}

fn new_session() -> ChatSession {
    ChatSession::new(ActivityHistory::load(Box::new(MemoryStore::new())))
}

#[tokio::test]
async fn preview_then_confirmation_round_trip() {
    let server = MockServer::start_async().await;
    mock_status(&server).await;

    let preview = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/change-chain-chat")
                .body_contains("TDD");
            then.status(200).json_body(json!({
                "success": true,
                "needs_confirmation": true,
                "message": "Найдены User Stories",
                "data": { "preview": {
                    "user_stories_count": 1,
                    "team": "Foxtrot",
                    "area_path": "Houston\\Foxtrot",
                    "iteration_path": "Houston\\Foxtrot",
                    "parent_ticket": "4512",
                    "wiki_link": "http://wiki/tdd",
                    "user_stories": [{
                        "title": "Выгрузка отчёта",
                        "description": "<p>Я, как аналитик хочу выгрузку чтобы сверять данные</p>",
                        "acceptance_criteria": [],
                        "given_conditions": "Есть данные",
                        "when_actions": "Нажата кнопка",
                        "then_results": "Файл скачан"
                    }]
                }}
            }));
        })
        .await;

    let confirm = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/change-chain-chat")
                .json_body(json!({ "message": "Да" }));
            then.status(200).json_body(json!({
                "success": true,
                "message": "✅ User Stories созданы успешно",
                "created_stories": [{ "id": 9001, "title": "Выгрузка отчёта", "url": "http://tfs/9001" }],
                "data": { "parent_ticket": "4512", "confluence_url": "http://wiki/tdd" }
            }));
        })
        .await;

    let client = ApiClient::new(&server.url("/api/v1"));
    let mut session = new_session();

    let reply = session
        .submit(&client, "Создай UserStory в TFS по статье TDD")
        .await
        .unwrap();
    assert_eq!(reply.role, ChatRole::Assistant);
    assert!(reply.content.blocks.iter().any(|b| matches!(b, Block::Story(_))));
    assert_eq!(session.status().available_count(), 2);

    let reply = session.submit(&client, "Да").await.unwrap();
    assert!(reply.plain_text().contains("User Story: #9001"));

    preview.assert_async().await;
    confirm.assert_async().await;

    assert_eq!(session.conversation().len(), 4);
    let kinds: Vec<Capability> = session.history().list().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![Capability::ChangeChain, Capability::ChangeChain]);
    assert_eq!(session.history().list()[0].message, "Да");
}

#[tokio::test]
async fn checklist_request_goes_to_checklist_endpoint() {
    let server = MockServer::start_async().await;
    mock_status(&server).await;
    let checklist = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/checklist-chat");
            then.status(200).json_body(json!({
                "success": true,
                "work_item_id": 42,
                "checklist": "1. Проверить БД\n2. Согласовать"
            }));
        })
        .await;

    let client = ApiClient::new(&server.url("/api/v1"));
    let mut session = new_session();
    let reply = session
        .submit(&client, "Создай чек-лист БДК ЗЗЛ #42")
        .await
        .unwrap();

    checklist.assert_async().await;
    assert_eq!(
        reply.content.blocks[1],
        Block::Preformatted("1. Проверить БД\n2. Согласовать".into())
    );
    assert_eq!(session.history().list()[0].kind, Capability::Checklist);
}

#[tokio::test]
async fn unreachable_backend_yields_error_turn_and_empty_status() {
    // Nothing listens on the reserved discard port.
    let client = ApiClient::new("http://127.0.0.1:9/api/v1");
    let mut session = new_session();

    let reply = session.submit(&client, "цепочка для #1").await.unwrap();

    assert_eq!(reply.role, ChatRole::Error);
    assert!(reply.plain_text().starts_with("Ошибка: "));
    assert!(session.status().is_empty());
    assert!(!session.history().list()[0].success);
    assert!(!session.is_processing());
}
