//! API client tests against a mock backend

use roommatch::api::{ApiClient, ApiError, ValidationError};
use roommatch::config::ApiConfig;
use roommatch::session::{MemoryStorage, SessionManager, SessionState, ACCESS_TOKEN_KEY};
use roommatch::SessionStorage;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, ApiClient, Arc<SessionManager>, Arc<MemoryStorage>) {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let session = Arc::new(SessionManager::new(storage.clone()));
    session.rehydrate().await;
    let client = ApiClient::new(ApiConfig::with_base_url(server.uri()), Arc::clone(&session)).unwrap();
    (server, client, session, storage)
}

async fn logged_in() -> (MockServer, ApiClient, Arc<SessionManager>, Arc<MemoryStorage>) {
    let (server, client, session, storage) = setup().await;
    session.login("t1", "42").await.unwrap();
    (server, client, session, storage)
}

#[tokio::test]
async fn test_login_scenario() {
    let (server, client, session, _) = setup().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("username=a%40x.edu"))
        .and(body_string_contains("password=pw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "t1",
            "user_id": "42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let s = client.authenticate("a@x.edu", "pw").await.unwrap();
    assert_eq!(s.token, "t1");
    assert_eq!(s.user_id, "42");
    assert!(!s.is_admin);

    // Stable until logout
    for _ in 0..3 {
        assert_eq!(session.current_session(), SessionState::Authenticated(s.clone()));
    }

    session.logout().await;
    assert_eq!(session.current_session(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_bad_credentials_do_not_touch_session() {
    let (server, client, session, _) = setup().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Incorrect username or password" })),
        )
        .mount(&server)
        .await;

    let err = client.authenticate("a@x.edu", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 401, .. }));
    assert_eq!(err.user_message(), "Incorrect username or password");
    assert_eq!(session.current_session(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_register_surfaces_server_message() {
    let (server, client, _, _) = setup().await;

    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "Email already registered"
        })))
        .mount(&server)
        .await;

    let err = client
        .register("a@x.edu", "pw", "Pomona College")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Email already registered");
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let (server, client, _, _) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/user-profile"))
        .and(header("authorization", "Bearer t1"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "a@x.edu",
            "school": "Pomona College",
            "hometown": "Claremont",
            "major": "CS",
            "graduation_year": "2027",
            "interests": "climbing",
            "profile_picture": "/static/profile_pics/default-avatar.png",
            "prompts": [
                { "prompt": "My ideal weekend", "response": "Hiking" },
                { "prompt": "", "response": "" },
                { "prompt": "", "response": "" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = client.fetch_profile().await.unwrap();
    assert_eq!(profile.school, "Pomona College");
    assert_eq!(profile.prompts.len(), 3);
    assert_eq!(
        client.resolve_asset_url(profile.profile_picture.as_deref().unwrap()),
        format!("{}/static/profile_pics/default-avatar.png", server.uri())
    );
}

#[tokio::test]
async fn test_unauthorized_clears_session() {
    let (server, client, session, storage) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/user-profile"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Could not validate credentials" })),
        )
        .mount(&server)
        .await;

    let err = client.fetch_profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(err.requires_login());
    assert_eq!(session.current_session(), SessionState::Anonymous);
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_late_unauthorized_keeps_newer_session() {
    let (server, client, session, storage) = setup().await;
    session.login("old", "1").await.unwrap();

    Mock::given(method("GET"))
        .and(path("/user-profile"))
        .and(header("authorization", "Bearer old"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Could not validate credentials" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.fetch_profile().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    session.logout().await;
    session.login("new", "2").await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 401, .. }));
    assert!(!err.requires_login());

    let state = session.current_session();
    assert_eq!(state.token(), Some("new"));
    assert_eq!(state.user_id(), Some("2"));
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("new"));
}

#[tokio::test]
async fn test_null_stored_answer_uses_default() {
    let (server, client, _, _) = logged_in().await;

    let mut stored = serde_json::Map::new();
    for n in 1..=25 {
        stored.insert(format!("question{}", n), json!(6));
    }
    stored.insert("question5".to_string(), serde_json::Value::Null);

    Mock::given(method("GET"))
        .and(path("/questionnaire/get-responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Object(stored)))
        .mount(&server)
        .await;

    let answers = client.fetch_responses().await.unwrap().unwrap();
    assert_eq!(answers.as_slice()[0], 6);
    assert_eq!(answers.as_slice()[4], 4);
    assert_eq!(answers.as_slice()[24], 6);
}

#[tokio::test]
async fn test_short_questionnaire_never_sent() {
    let (server, client, _, _) = logged_in().await;

    Mock::given(method("POST"))
        .and(path("/questionnaire/submit-questionnaire"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.submit_questionnaire(&[4; 24]).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::IncompleteQuestionnaire {
            expected: 25,
            actual: 24
        })
    ));
}

#[tokio::test]
async fn test_questionnaire_form_body() {
    let (server, client, _, _) = logged_in().await;

    Mock::given(method("POST"))
        .and(path("/questionnaire/submit-questionnaire"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Responses submitted successfully" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let answers: Vec<u8> = (0..25).map(|i| (i % 7) as u8 + 1).collect();
    client.submit_questionnaire(&answers).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    let pairs: Vec<&str> = body.split('&').collect();

    assert_eq!(pairs.len(), 25);
    assert_eq!(pairs[0], "question1=1");
    assert_eq!(pairs[6], "question7=7");
    assert_eq!(pairs[24], "question25=4");
}

#[tokio::test]
async fn test_missing_responses_is_none() {
    let (server, client, _, _) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/questionnaire/get-responses"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "No questionnaire responses found" })),
        )
        .mount(&server)
        .await;

    assert_eq!(client.fetch_responses().await.unwrap(), None);
}

#[tokio::test]
async fn test_match_list_degrades_failed_profile() {
    let (server, client, _, _) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/match-results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "matchId": 2, "match": "b@x.edu", "score": 0.912 },
            { "matchId": 3, "match": "c@x.edu", "score": 0.5 },
            { "matchId": 4, "match": "d@x.edu", "score": 0.333 }
        ])))
        .mount(&server)
        .await;

    for id in ["2", "4"] {
        Mock::given(method("GET"))
            .and(path(format!("/user-profile/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": format!("user{}@x.edu", id)
            })))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/user-profile/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let matches = client.list_matches().await.unwrap();
    assert_eq!(matches.len(), 3);

    let ids: Vec<&str> = matches.iter().map(|m| m.match_id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3", "4"]);

    assert_eq!(matches[0].profile.as_ref().unwrap().email, "user2@x.edu");
    assert!(matches[1].profile.is_none());
    assert_eq!(matches[2].profile.as_ref().unwrap().email, "user4@x.edu");

    assert_eq!(matches[0].score_label(), "0.91");
    assert!(matches.iter().all(|m| m.user_id == "42"));
}

#[tokio::test]
async fn test_no_matches_is_empty() {
    let (server, client, _, _) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/match-results"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "No match found" })))
        .mount(&server)
        .await;

    assert!(client.list_matches().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_messages() {
    let (server, client, _, _) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/chat/messages/42/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "sender": 42, "content": "hey", "timestamp": "2024-03-01T10:00:00" },
            { "sender": 7, "content": "hi!", "timestamp": "2024-03-01T10:01:00" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/messages/42/7"))
        .and(body_string_contains("\"content\":\"see you\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Message sent" })))
        .expect(1)
        .mount(&server)
        .await;

    let messages = client.list_messages("42", "7").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, "42");
    assert_eq!(messages[1].sender, "7");

    let reply = client.send_message("42", "7", "see you").await.unwrap();
    assert_eq!(reply.message, "Message sent");
}

#[tokio::test]
async fn test_admin_forbidden_from_server() {
    let (server, client, session, _) = setup().await;

    // Claims are not verified client-side; the server has the final word
    let payload = base64_url(r#"{"sub":"a@x.edu","is_admin":true}"#);
    session
        .login(format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", payload), "1")
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/admin/user-status"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "detail": "Admin access required" })))
        .mount(&server)
        .await;

    let err = client.admin_user_status().await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 403, .. }));
    assert!(session.current_session().is_authenticated());
}

#[tokio::test]
async fn test_admin_match_run() {
    let (server, client, session, _) = setup().await;
    let payload = base64_url(r#"{"is_admin":true}"#);
    session.login(format!("h.{}.s", payload), "1").await.unwrap();

    Mock::given(method("POST"))
        .and(path("/admin/match-users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{ "user1": 1, "user2": 2 }, { "user1": 3, "user2": 4 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pairings = client.admin_match_users().await.unwrap();
    assert_eq!(pairings.len(), 2);
    assert_eq!(pairings[1].user1, "3");
}

#[tokio::test]
async fn test_unreachable_backend() {
    let session = Arc::new(SessionManager::new(Arc::new(MemoryStorage::new())));
    session.login("t1", "42").await.unwrap();
    let client = ApiClient::new(ApiConfig::with_base_url("http://127.0.0.1:9"), session.clone()).unwrap();

    let err = client.fetch_profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Unreachable(_)));
    assert_eq!(err.user_message(), "Server error. Please try again.");
    assert!(session.current_session().is_authenticated());
}

#[tokio::test]
async fn test_sign_out_is_best_effort() {
    let (server, client, session, _) = logged_in().await;

    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    client.sign_out().await;
    assert_eq!(session.current_session(), SessionState::Anonymous);
}

fn base64_url(json: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}
