mod support;

use axum::http::StatusCode;
use sickoscoop_client::{
    connectivity::ApiStatus,
    engine::MutationState,
    router::View,
    session::{
        context::SyncMode,
        controller::{RestoreOutcome, SESSION_EXPIRED_MESSAGE, SessionError},
        storage::{
            AUTH_TOKEN_KEY, MemoryStorage, SessionPersistence, SessionStorage, USER_DATA_KEY,
        },
    },
    store::FeedType,
};
use sickoscoop_common::model::auth::AuthToken;
use std::sync::{Arc, atomic::Ordering};
use support::{EMAIL, PASSWORD, TOKEN, client, dead_url, memory_storage, spawn_backend, user_json};

fn persist_session(storage: &Arc<MemoryStorage>) {
    let user = serde_json::from_value(user_json()).unwrap();
    SessionPersistence::new(storage.clone()).save(&AuthToken::new(TOKEN), &user);
}

#[tokio::test]
async fn wrong_password_surfaces_backend_message() {
    let backend = spawn_backend().await;
    let client = client(&backend.base_url, memory_storage());

    let err = client.controller().login(EMAIL, "wrong").await.unwrap_err();
    assert!(matches!(&err, SessionError::Credentials(message) if message == "Invalid email or password"));
    assert_eq!(
        client.notices().current().as_deref(),
        Some("Invalid email or password")
    );
    assert!(!client.session().is_logged_in());
    assert_eq!(client.router().current().view, View::Landing);
}

#[tokio::test]
async fn login_persists_and_loads_with_fresh_token() {
    let backend = spawn_backend().await;
    let storage = memory_storage();
    let client = client(&backend.base_url, storage.clone());

    let established = client.controller().login(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(established.user.id.get(), "u1");
    assert!(client.session().is_logged_in());
    assert_eq!(client.router().current().view, View::Feed);
    assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some(TOKEN));
    assert!(storage.get(USER_DATA_KEY).unwrap().is_some());

    established.initial_load.await.unwrap();
    assert_eq!(client.store().posts().len(), 2);
    assert_eq!(client.store().chats().len(), 1);

    let seen = backend.state.seen_tokens.lock().unwrap().clone();
    assert_eq!(seen, [Some(TOKEN.to_owned())]);
}

#[tokio::test]
async fn refused_post_load_keeps_session() {
    let backend = spawn_backend().await;
    backend.state.refuse_posts.store(true, Ordering::SeqCst);
    let storage = memory_storage();
    let client = client(&backend.base_url, storage.clone());

    let established = client.controller().login(EMAIL, PASSWORD).await.unwrap();
    established.initial_load.await.unwrap();

    assert!(client.session().is_logged_in());
    assert_eq!(client.router().current().view, View::Feed);
    assert!(client.store().posts().is_empty());
    assert_eq!(client.store().chats().len(), 1);
    assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some(TOKEN));
    assert_eq!(client.notices().current(), None);
}

#[tokio::test]
async fn register_reports_conflicts() {
    let backend = spawn_backend().await;
    let client = client(&backend.base_url, memory_storage());

    let err = client
        .controller()
        .register("ada", "taken@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User already exists");
    assert!(!client.session().is_logged_in());

    let established = client
        .controller()
        .register("grace", "grace@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(established.user.username.get(), "grace");
    assert_eq!(client.session().token(), Some(AuthToken::new("token-new")));
}

#[tokio::test]
async fn unreachable_backend_blocks_login() {
    let client = client(&dead_url().await, memory_storage());

    let err = client.controller().login(EMAIL, PASSWORD).await.unwrap_err();
    assert!(matches!(err, SessionError::Unreachable));
    assert!(!client.session().is_logged_in());
    assert_eq!(client.session().connectivity().status(), ApiStatus::Disconnected);
}

#[tokio::test]
async fn restore_tolerates_failing_verification() {
    let backend = spawn_backend().await;
    *backend.state.verify_status.lock().unwrap() = StatusCode::INTERNAL_SERVER_ERROR;
    let storage = memory_storage();
    persist_session(&storage);
    let client = client(&backend.base_url, storage.clone());

    let outcome = client.controller().restore_from_persistence().await;
    assert_eq!(outcome, RestoreOutcome::Degraded);
    assert!(client.session().is_logged_in());
    assert_eq!(client.session().connectivity().status(), ApiStatus::Disconnected);
    assert_eq!(client.session().sync_mode(), SyncMode::LocalOnly);
    assert!(storage.get(AUTH_TOKEN_KEY).unwrap().is_some());

    let submission = client.engine().submit_post("offline", Vec::new()).await.unwrap();
    assert_eq!(submission.state, MutationState::Confirmed);
    assert_eq!(client.store().posts()[0].content, "offline");
}

#[tokio::test]
async fn restore_survives_unreachable_backend() {
    let storage = memory_storage();
    persist_session(&storage);
    let client = client(&dead_url().await, storage);

    let outcome = client.controller().restore_from_persistence().await;
    assert_eq!(outcome, RestoreOutcome::Degraded);
    assert!(client.session().is_logged_in());
    assert!(client.session().connectivity().is_disconnected());
}

#[tokio::test]
async fn restore_with_rejected_token_tears_down() {
    let backend = spawn_backend().await;
    *backend.state.verify_status.lock().unwrap() = StatusCode::UNAUTHORIZED;
    let storage = memory_storage();
    persist_session(&storage);
    let client = client(&backend.base_url, storage.clone());

    let outcome = client.controller().restore_from_persistence().await;
    assert_eq!(outcome, RestoreOutcome::Rejected);
    assert!(!client.session().is_logged_in());
    assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), None);
    assert_eq!(client.router().current().view, View::Landing);
    assert_eq!(
        client.notices().current().as_deref(),
        Some(SESSION_EXPIRED_MESSAGE)
    );
}

#[tokio::test]
async fn restore_verifies_and_loads() {
    let backend = spawn_backend().await;
    let storage = memory_storage();
    persist_session(&storage);
    let client = client(&backend.base_url, storage);

    assert_eq!(
        client.controller().restore_from_persistence().await,
        RestoreOutcome::Verified
    );
    assert_eq!(client.store().posts().len(), 2);
    assert_eq!(client.session().connectivity().status(), ApiStatus::Connected);
}

#[tokio::test]
async fn nothing_persisted_means_visitor() {
    let backend = spawn_backend().await;
    let client = client(&backend.base_url, memory_storage());

    assert_eq!(
        client.controller().restore_from_persistence().await,
        RestoreOutcome::Absent
    );
    assert_eq!(client.controller().load_public_feed().await.unwrap(), 2);
    assert_eq!(client.visible_posts().len(), 2);
    assert!(!client.session().is_logged_in());
}

#[tokio::test]
async fn logout_clears_everything() {
    let backend = spawn_backend().await;
    let storage = memory_storage();
    let client = client(&backend.base_url, storage.clone());

    let established = client.controller().login(EMAIL, PASSWORD).await.unwrap();
    established.initial_load.await.unwrap();
    client.set_feed_type(FeedType::Personal);
    client.router().navigate("/post/p1");
    assert!(client.router().focused_post().is_some());

    client.controller().logout();

    assert!(!client.session().is_logged_in());
    assert_eq!(client.session().token(), None);
    assert!(client.store().posts().is_empty());
    assert!(client.store().chats().is_empty());
    assert_eq!(client.store().feed_type(), FeedType::Public);
    assert_eq!(client.router().current().view, View::Landing);
    assert!(client.router().focused_post().is_none());
    assert_eq!(client.router().back(), None);
    assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(USER_DATA_KEY).unwrap(), None);
}

#[tokio::test]
async fn router_falls_back_for_unknown_posts() {
    let backend = spawn_backend().await;
    let client = client(&backend.base_url, memory_storage());
    let established = client.controller().login(EMAIL, PASSWORD).await.unwrap();
    established.initial_load.await.unwrap();

    assert_eq!(client.router().navigate("/post/doesnotexist").view, View::Feed);
    assert_eq!(client.router().navigate("/post/p1").view, View::PostDetail);
}

#[tokio::test]
async fn mutations_reconcile_against_backend() {
    let backend = spawn_backend().await;
    let client = client(&backend.base_url, memory_storage());
    let established = client.controller().login(EMAIL, PASSWORD).await.unwrap();
    established.initial_load.await.unwrap();

    let submission = client.engine().submit_post("hello", Vec::new()).await.unwrap();
    assert_eq!(submission.state, MutationState::Confirmed);
    assert_eq!(submission.server_post.unwrap().id.get(), "srv-1");
    let posts = client.store().posts();
    assert_eq!(posts[0].content, "hello");
    assert!(posts[0].id.is_local());
    assert!(posts[0].likes.is_empty());

    let liked = client.engine().toggle_like(&"p1".into()).await.unwrap();
    assert_eq!(liked.state, MutationState::Confirmed);

    backend.state.fail_likes.store(true, Ordering::SeqCst);
    let unliked = client.engine().toggle_like(&"p1".into()).await.unwrap();
    assert_eq!(unliked.state, MutationState::RolledBack);
    assert!(client
        .store()
        .post(&"p1".into())
        .unwrap()
        .is_liked_by(&"u1".into()));
    assert_eq!(backend.state.like_calls.load(Ordering::SeqCst), 2);

    let receipt = client
        .engine()
        .add_comment(&"p1".into(), "nice")
        .unwrap()
        .unwrap();
    assert_eq!(receipt.settled().await, MutationState::Confirmed);
    assert_eq!(backend.state.comment_calls.load(Ordering::SeqCst), 1);
}
