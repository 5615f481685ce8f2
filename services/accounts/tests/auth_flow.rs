//! Router level tests over the in-memory stores

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use accounts::{
    AppState,
    config::{AuthSettings, HashingSettings, Settings, SigningSecret},
    jwt::TokenCodec,
    middleware::RequestLogger,
    models::{Account, ProfileFields},
    repositories::{
        AccountDirectory, MemoryAccountDirectory, MemoryCollaborationStore, RepositoryError,
        RepositoryResult,
    },
    routes::create_router,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "router-test-secret-0123456789abcdefgh";
const TTL_SECS: u64 = 3_600;

#[derive(Default)]
struct RecordingLogger {
    entries: Mutex<Vec<(Method, String, StatusCode)>>,
}

impl RecordingLogger {
    fn entries(&self) -> Vec<(Method, String, StatusCode)> {
        self.entries.lock().unwrap().clone()
    }
}

impl RequestLogger for RecordingLogger {
    fn log_request(&self, method: &Method, path: &str, status: StatusCode, _latency: Duration) {
        self.entries
            .lock()
            .unwrap()
            .push((method.clone(), path.to_string(), status));
    }
}

/// Directory whose backing store is down
struct UnavailableDirectory;

impl UnavailableDirectory {
    fn outage<T>() -> RepositoryResult<T> {
        Err(RepositoryError::Storage(
            "connection refused (10.0.0.7:5432)".to_string(),
        ))
    }
}

#[async_trait]
impl AccountDirectory for UnavailableDirectory {
    async fn create_account(&self, _account: &Account) -> RepositoryResult<Account> {
        Self::outage()
    }

    async fn find_by_username(&self, _username: &str) -> RepositoryResult<Account> {
        Self::outage()
    }

    async fn find_by_id(&self, _id: Uuid) -> RepositoryResult<Account> {
        Self::outage()
    }

    async fn update_profile(&self, _id: Uuid, _fields: &ProfileFields) -> RepositoryResult<Account> {
        Self::outage()
    }

    async fn delete_account(&self, _id: Uuid) -> RepositoryResult<()> {
        Self::outage()
    }

    async fn search_by_username(&self, _fragment: &str, _limit: i64) -> RepositoryResult<Vec<Account>> {
        Self::outage()
    }
}

struct TestApp {
    router: Router,
    logger: Arc<RecordingLogger>,
    codec: TokenCodec,
}

fn auth_settings(secret: &str) -> AuthSettings {
    AuthSettings {
        signing_secret: SigningSecret::new(secret),
        token_ttl_secs: TTL_SECS,
    }
}

fn test_app() -> TestApp {
    test_app_with(Arc::new(MemoryAccountDirectory::new()))
}

fn test_app_with(directory: Arc<dyn AccountDirectory>) -> TestApp {
    let settings = Settings {
        auth: auth_settings(SECRET),
        hashing: HashingSettings {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
        ..Default::default()
    };
    let logger = Arc::new(RecordingLogger::default());

    let state = AppState::new(
        &settings,
        directory,
        Arc::new(MemoryCollaborationStore::new()),
        logger.clone(),
    )
    .unwrap();

    TestApp {
        router: create_router(state),
        logger,
        codec: TokenCodec::new(&settings.auth).unwrap(),
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn register(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": password,
            })),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Register and log in, returning the account id and token
    async fn sign_up(&self, username: &str) -> (Uuid, String) {
        let (status, profile) = self.register(username, "Str0ng!Pass").await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, login) = self.login(username, "Str0ng!Pass").await;
        assert_eq!(status, StatusCode::OK);

        let id = profile["id"].as_str().unwrap().parse().unwrap();
        (id, login["access_token"].as_str().unwrap().to_string())
    }
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = test_app();

    let (status, profile) = app.register("alice", "Str0ng!Pass").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["username"], "alice");
    assert!(profile.get("password_hash").is_none());
    assert!(profile.get("password").is_none());

    let (status, login) = app.login("alice", "Str0ng!Pass").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["token_type"], "Bearer");
    assert_eq!(login["expires_in"], TTL_SECS);
    let token = login["access_token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);

    let (status, me) = app.send(Method::GET, "/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["id"], profile["id"]);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = test_app();
    let (alice, _) = app.sign_up("alice").await;

    let expired = app
        .codec
        .issue_at(alice, "alice", Utc::now() - chrono::Duration::seconds(TTL_SECS as i64 + 60))
        .unwrap()
        .token;

    let (status, body) = app.send(Method::GET, "/me", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let app = test_app();
    app.sign_up("alice").await;

    let wrong_password = app.login("alice", "Wr0ng!Pass").await;
    let unknown_user = app.login("bob", "Str0ng!Pass").await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(
        wrong_password.1,
        json!({ "error": "Invalid username or password" })
    );
}

#[tokio::test]
async fn test_every_gate_rejection_is_the_same_401() {
    let app = test_app();
    let (alice, token) = app.sign_up("alice").await;

    let foreign = TokenCodec::new(&auth_settings("another-secret-0123456789abcdefghijk"))
        .unwrap()
        .issue(alice, "alice")
        .unwrap()
        .token;
    let expired = app
        .codec
        .issue_at(alice, "alice", Utc::now() - chrono::Duration::days(1))
        .unwrap()
        .token;

    let mut responses = Vec::new();

    let no_header = Request::builder().uri("/me").body(Body::empty()).unwrap();
    responses.push(app.dispatch(no_header).await);

    for value in [format!("Token {}", token), token.clone(), "Bearer".to_string()] {
        let request = Request::builder()
            .uri("/me")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();
        responses.push(app.dispatch(request).await);
    }

    for bad in [foreign.as_str(), expired.as_str(), "not.a.jwt"] {
        responses.push(app.send(Method::GET, "/me", Some(bad), None).await);
    }

    let expected = (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }));
    for response in responses {
        assert_eq!(response, expected);
    }
}

#[tokio::test]
async fn test_deleted_account_token_stops_working() {
    let app = test_app();
    let (alice, token) = app.sign_up("alice").await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/users/{}", alice), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_each_request_is_logged_once() {
    let app = test_app();
    let (_, token) = app.sign_up("alice").await;

    app.send(Method::GET, "/me", Some(&token), None).await;
    app.send(Method::GET, "/me", None, None).await;

    let entries = app.logger.entries();
    assert_eq!(
        entries,
        vec![
            (Method::POST, "/auth/register".to_string(), StatusCode::CREATED),
            (Method::POST, "/auth/login".to_string(), StatusCode::OK),
            (Method::GET, "/me".to_string(), StatusCode::OK),
            (Method::GET, "/me".to_string(), StatusCode::UNAUTHORIZED),
        ]
    );
}

#[tokio::test]
async fn test_registration_errors() {
    let app = test_app();

    let (status, body) = app.register("alice", "password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Password must contain at least one uppercase letter" })
    );

    let (status, _) = app.register("alice", "Str0ng!Pass").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.register("alice", "An0ther!Pass").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "error": "Username is already taken" }));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.dispatch(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_profile_reads_and_self_only_writes() {
    let app = test_app();
    let (alice, alice_token) = app.sign_up("alice").await;
    let (bob, bob_token) = app.sign_up("bob").await;

    let (status, body) = app
        .send(Method::GET, &format!("/users/{}", bob), Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");

    let (status, body) = app
        .send(Method::GET, "/usernames/alice", Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], alice.to_string());

    let (status, body) = app
        .send(Method::GET, "/users?username=BO", Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/users/{}", alice),
            Some(&bob_token),
            Some(json!({ "first_name": "Mallory" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/users/{}", alice),
            Some(&alice_token),
            Some(json!({ "first_name": "Alice", "username": "root" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Alice");
    assert_eq!(body["username"], "alice");

    let (status, body) = app
        .send(Method::GET, &format!("/users/{}", Uuid::new_v4()), Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Account not found" }));
}

#[tokio::test]
async fn test_collaboration_flow() {
    let app = test_app();
    let (alice, alice_token) = app.sign_up("alice").await;
    let (bob, bob_token) = app.sign_up("bob").await;
    let (_, carol_token) = app.sign_up("carol").await;

    let (status, collaboration) = app
        .send(
            Method::POST,
            "/collaborations",
            Some(&alice_token),
            Some(json!({ "project_id": 42, "name": "Roadmap" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(collaboration["members"], json!([alice.to_string()]));
    let id = collaboration["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::GET, &format!("/collaborations/{}", id), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(
            Method::POST,
            &format!("/collaborations/{}/members", id),
            Some(&alice_token),
            Some(json!({ "account_id": bob })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["members"], json!([alice.to_string(), bob.to_string()]));

    let (status, document) = app
        .send(
            Method::POST,
            &format!("/collaborations/{}/documents", id),
            Some(&bob_token),
            Some(json!({ "name": "plan.md", "content": "Q1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(document["name"], "plan.md");

    let (status, documents) = app
        .send(
            Method::GET,
            &format!("/collaborations/{}/documents", id),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(documents.as_array().unwrap().len(), 1);

    let (status, listed) = app
        .send(Method::GET, "/projects/42/collaborations", Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, listed) = app
        .send(Method::GET, "/collaborations", Some(&carol_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/collaborations/{}/members/{}", id, bob),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/collaborations/{}/documents", id),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_directory_outage_in_gate_is_a_server_error() {
    let app = test_app_with(Arc::new(UnavailableDirectory));
    let token = app.codec.issue(Uuid::new_v4(), "alice").unwrap().token;

    let (status, body) = app.send(Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));

    let entries = app.logger.entries();
    assert_eq!(
        entries,
        vec![(
            Method::GET,
            "/me".to_string(),
            StatusCode::INTERNAL_SERVER_ERROR
        )]
    );
}

#[tokio::test]
async fn test_directory_outage_during_login_is_not_invalid_credentials() {
    let app = test_app_with(Arc::new(UnavailableDirectory));

    let (status, body) = app.login("alice", "Str0ng!Pass").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));

    let (status, body) = app.register("alice", "Str0ng!Pass").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn test_undecodable_username_path_is_a_json_error() {
    let app = test_app();
    let (_, token) = app.sign_up("alice").await;

    let (status, body) = app
        .send(Method::GET, "/usernames/%FF", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
