//! An in-process stand-in for the REST backend.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{Value, json};
use sickoscoop_client::{
    Client,
    gateway::{Gateway, GatewayConfig},
    session::{
        context::SessionContext,
        storage::{MemoryStorage, SessionPersistence, SessionStorage},
    },
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "secret123";
pub const TOKEN: &str = "token-ada";
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

type BearerHeader = TypedHeader<Authorization<Bearer>>;

pub struct BackendState {
    pub posts: Mutex<Vec<Value>>,
    pub conversations: Mutex<Vec<Value>>,
    pub verify_status: Mutex<StatusCode>,
    pub fail_likes: AtomicBool,
    pub refuse_posts: AtomicBool,
    pub like_calls: AtomicUsize,
    pub comment_calls: AtomicUsize,
    pub seen_tokens: Mutex<Vec<Option<String>>>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            posts: Mutex::new(vec![
                post_json("p1", "u2", "2025-06-01T12:00:00Z", &[]),
                post_json("p2", "u1", "2025-06-02T12:00:00Z", &["u2"]),
            ]),
            conversations: Mutex::new(vec![json!({
                "_id": "c1",
                "participants": [{ "_id": "u2", "name": "bob" }],
                "messages": [],
            })]),
            verify_status: Mutex::new(StatusCode::OK),
            fail_likes: AtomicBool::new(false),
            refuse_posts: AtomicBool::new(false),
            like_calls: AtomicUsize::new(0),
            comment_calls: AtomicUsize::new(0),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }
}

pub fn user_json() -> Value {
    json!({ "_id": "u1", "name": "ada", "verified": true })
}

pub fn post_json(id: &str, author_id: &str, created_at: &str, likes: &[&str]) -> Value {
    json!({
        "_id": id,
        "author": { "_id": author_id, "name": format!("user-{author_id}") },
        "content": format!("post {id}"),
        "likes": likes,
        "comments": [],
        "createdAt": created_at,
    })
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        Json(json!({ "token": TOKEN, "user": user_json() })).into_response()
    } else {
        message(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return message(StatusCode::BAD_REQUEST, "User already exists");
    }

    Json(json!({
        "token": "token-new",
        "user": { "_id": "u-new", "name": body["name"] },
    }))
    .into_response()
}

async fn verify(State(state): State<Arc<BackendState>>, bearer: Option<BearerHeader>) -> Response {
    let status = *state.verify_status.lock().unwrap();
    if bearer.is_none() || status == StatusCode::UNAUTHORIZED {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    if !status.is_success() {
        return message(status, "Verification unavailable");
    }

    Json(json!({ "user": user_json() })).into_response()
}

async fn posts(State(state): State<Arc<BackendState>>, bearer: Option<BearerHeader>) -> Response {
    let token = bearer.map(|TypedHeader(header)| header.token().to_owned());
    state.seen_tokens.lock().unwrap().push(token.clone());

    if token.is_none() {
        return message(StatusCode::UNAUTHORIZED, "No token provided");
    }
    if state.refuse_posts.load(Ordering::SeqCst) {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    }

    let posts = state.posts.lock().unwrap().clone();
    Json(json!({ "posts": posts })).into_response()
}

async fn public_posts(State(state): State<Arc<BackendState>>) -> Json<Value> {
    Json(Value::Array(state.posts.lock().unwrap().clone()))
}

async fn create_post(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut created = post_json("srv-1", "u1", "2025-06-03T12:00:00Z", &[]);
    created["content"] = body["content"].clone();
    (StatusCode::CREATED, Json(json!({ "post": created })))
}

async fn like(State(state): State<Arc<BackendState>>, Path(id): Path<String>) -> Response {
    state.like_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_likes.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Could not like {id}") })),
        )
            .into_response();
    }

    Json(json!({ "liked": true })).into_response()
}

async fn comment(State(state): State<Arc<BackendState>>) -> StatusCode {
    state.comment_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::CREATED
}

async fn conversations(State(state): State<Arc<BackendState>>) -> Json<Value> {
    Json(json!({ "data": state.conversations.lock().unwrap().clone() }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({}))
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "<html>down</html>")
}

fn routes() -> Router<Arc<BackendState>> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/posts", get(posts).post(create_post))
        .route("/posts/public", get(public_posts))
        .route("/posts/{id}/like", post(like))
        .route("/posts/{id}/comments", post(comment))
        .route("/conversations", get(conversations))
        .route("/slow", get(slow))
        .route("/empty", get(empty))
        .route("/unavailable", get(unavailable))
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .nest("/api", routes())
        .with_state(Arc::clone(&state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{address}/api"),
        state,
        server,
    }
}

/// A base url nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}/api")
}

pub fn gateway(
    base_url: &str,
    timeout: Duration,
    storage: Arc<dyn SessionStorage>,
) -> (Gateway, Arc<SessionContext>) {
    let session = Arc::new(SessionContext::new());
    let gateway = Gateway::new(
        GatewayConfig::new(base_url).with_timeout(timeout),
        Arc::clone(&session),
        SessionPersistence::new(storage),
    )
    .unwrap();
    (gateway, session)
}

pub fn client(base_url: &str, storage: Arc<dyn SessionStorage>) -> Client {
    let (gateway, session) = gateway(base_url, Duration::from_secs(1), Arc::clone(&storage));
    Client::with_remote(
        session,
        SessionPersistence::new(storage),
        Arc::new(gateway),
        Duration::from_secs(5),
    )
}

pub fn memory_storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}
