//! View models against a mock backend

use roommatch::api::ApiClient;
use roommatch::chat::ConversationId;
use roommatch::config::ApiConfig;
use roommatch::session::{MemoryStorage, SessionManager};
use roommatch::views::{ChatView, MatchListView, ViewHandle};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SLOW: Duration = Duration::from_millis(500);

async fn logged_in(server: &MockServer) -> ApiClient {
    let session = Arc::new(SessionManager::new(Arc::new(MemoryStorage::new())));
    session.login("t1", "1").await.unwrap();
    ApiClient::new(ApiConfig::with_base_url(server.uri()), session).unwrap()
}

/// Unmount shortly after the request has gone out
fn unmount_soon(handle: ViewHandle) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.unmount();
    });
}

#[tokio::test]
async fn test_match_list_ignores_results_after_unmount() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/match-results"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "matchId": 2, "match": "b@x.edu", "score": 0.9 }]))
                .set_delay(SLOW),
        )
        .mount(&server)
        .await;
    let client = logged_in(&server).await;

    let mut view = MatchListView::new();
    unmount_soon(view.scope().handle());

    assert!(!view.load(&client).await);
    assert!(view.matches().is_empty());
    assert!(view.error().is_none());
    assert!(!view.is_loading());
    assert!(!view.scope().is_mounted());
}

#[tokio::test]
async fn test_match_list_loads_while_mounted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/match-results"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "matchId": 2, "match": "b@x.edu", "score": 0.9 }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user-profile/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "b@x.edu" })))
        .mount(&server)
        .await;
    let client = logged_in(&server).await;

    let mut view = MatchListView::new();
    view.expand("2");
    assert!(view.load(&client).await);
    assert_eq!(view.matches().len(), 1);
    assert!(view.is_expanded("2"));
}

#[tokio::test]
async fn test_chat_view_ignores_results_after_unmount() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user-profile/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "email": "b@x.edu" }))
                .set_delay(SLOW),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chat/messages/1/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    { "sender": 2, "content": "hi", "timestamp": "2024-03-01T10:00:00" }
                ]))
                .set_delay(SLOW),
        )
        .mount(&server)
        .await;
    let client = logged_in(&server).await;

    let mut view = ChatView::new(ConversationId::new("1", "2"));
    unmount_soon(view.scope().handle());

    assert!(!view.load(&client).await);
    assert!(view.peer().is_none());
    assert!(view.history().is_empty());
    assert!(view.error().is_none());
}
