//! E2E tests for sign-up, sign-in, sign-out and startup

mod common;

use common::{TestClient, USERS, ann, credentials};
use reactgram::auth::{Destination, SessionState};
use reactgram::error::AppError;

#[tokio::test]
async fn test_sign_up_creates_account_user_and_session() {
    let client = TestClient::new();

    let destination = client.state.sign_up(ann()).await.unwrap();
    assert_eq!(destination, Destination::Feed);
    assert!(client.backend.has_session());

    let users = client.backend.documents(USERS);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "ann1");
    assert_eq!(users[0]["email"], "ann@x.com");
    assert!(
        users[0]["imageUrl"]
            .as_str()
            .unwrap()
            .contains("avatars/initials?name=Ann")
    );

    let user = client.state.session.user().expect("authenticated user");
    assert_eq!(user.name, "Ann");
    assert_eq!(user.id, users[0]["$id"]);
}

#[tokio::test]
async fn test_sign_up_populates_current_user_cache() {
    let client = TestClient::new();
    client.state.sign_up(ann()).await.unwrap();

    let cached = client.state.queries.cached_current_user().unwrap();
    assert_eq!(cached.username, "ann1");
    assert_eq!(client.backend.calls("get_account"), 1);
}

#[tokio::test]
async fn test_duplicate_sign_up_fails_without_session() {
    let client = TestClient::new();
    client.state.sign_up(ann()).await.unwrap();
    client.state.sign_out().await.unwrap();

    let error = client.state.sign_up(ann()).await.unwrap_err();
    assert!(matches!(error, AppError::Conflict(_)));
    assert!(!client.backend.has_session());
    assert_eq!(client.backend.documents(USERS).len(), 1);
    assert_eq!(client.backend.calls("create_email_password_session"), 1);
}

#[tokio::test]
async fn test_invalid_sign_up_form_never_reaches_platform() {
    let client = TestClient::new();
    let mut user = ann();
    user.password = "short".to_string();

    let error = client.state.sign_up(user).await.unwrap_err();
    assert!(matches!(error, AppError::Validation(_)));
    assert_eq!(client.backend.calls("create_account"), 0);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let client = TestClient::new();
    client.state.sign_up(ann()).await.unwrap();
    client.state.sign_out().await.unwrap();

    let mut wrong = credentials(&ann());
    wrong.password = "password9".to_string();

    let error = client.state.sign_in(wrong).await.unwrap_err();
    assert!(matches!(error, AppError::Unauthorized));
    assert_eq!(client.state.session.current(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_sign_out_then_sign_in_again() {
    let client = TestClient::new();
    client.state.sign_up(ann()).await.unwrap();

    let mut states = client.state.session.subscribe();
    assert_eq!(client.state.sign_out().await.unwrap(), Destination::SignIn);
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), SessionState::Anonymous);
    assert!(!client.backend.has_session());

    let destination = client.state.sign_in(credentials(&ann())).await.unwrap();
    assert_eq!(destination, Destination::Feed);
    assert!(client.state.session.is_authenticated());
}

#[tokio::test]
async fn test_sign_out_forgets_previous_user() {
    let client = TestClient::new();
    client.state.sign_up(ann()).await.unwrap();
    assert!(client.state.queries.cached_current_user().is_some());

    client.state.sign_out().await.unwrap();

    assert!(client.state.queries.cached_current_user().is_none());
    let state = client.state.queries.current_user().await;
    assert_eq!(state.data.as_deref(), Some(&None));
}

#[tokio::test]
async fn test_bootstrap_without_session_goes_to_sign_in() {
    let client = TestClient::new();

    assert_eq!(client.state.bootstrap().await.unwrap(), Destination::SignIn);
    assert_eq!(client.backend.calls("get_account"), 1);
    assert!(!client.state.session.is_authenticated());
}

#[tokio::test]
async fn test_bootstrap_with_live_session_goes_to_feed() {
    let client = TestClient::new();
    client.state.sign_up(ann()).await.unwrap();
    client.state.session.mark_signed_out();

    assert_eq!(client.state.bootstrap().await.unwrap(), Destination::Feed);
    assert!(client.state.session.is_authenticated());
}

#[tokio::test]
async fn test_bootstrap_with_signed_out_flag_skips_round_trip() {
    let client = TestClient::new();
    client.state.fallback.mark_signed_out().await.unwrap();
    client.backend.set_latency(std::time::Duration::from_secs(60));

    let destination = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        client.state.bootstrap(),
    )
    .await
    .expect("bootstrap must not wait for the platform")
    .unwrap();
    assert_eq!(destination, Destination::SignIn);
}
