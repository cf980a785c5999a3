use api_lib::{
    config::Config,
    web::{api_router, state::AppState},
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use trivia_core::{DifficultyTier, InMemoryStore, Question, QuestionBank};
use uuid::Uuid;

fn app(store: Arc<InMemoryStore>) -> Router {
    let questions = (1..=3)
        .map(|i| Question {
            id: format!("h-{:02}", i),
            text: format!("Hard question {}", i),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option_index: 1,
            tier: DifficultyTier::Hard,
            time_limit_seconds: 20,
        })
        .collect();
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".into(),
        db_max_connections: 1,
        log_level: tracing::Level::INFO,
        round_feedback_delay: Duration::from_millis(10),
        cors_origin: "http://localhost:3000".into(),
    };
    let state = AppState::new(
        Arc::new(config),
        Arc::new(QuestionBank::new(questions).unwrap()),
        store.clone(),
        store.clone(),
        store,
    );
    api_router(Arc::new(state))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Uuid,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user.to_string());
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn new_players_start_at_easy() {
    let app = app(Arc::new(InMemoryStore::new()));
    let (status, body) = call(&app, "GET", "/solo/progress", Uuid::new_v4(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_tier"], "easy");
    assert_eq!(body["questions_answered"], 0);
}

#[tokio::test]
async fn challenge_lifecycle_over_rest() {
    let store = Arc::new(InMemoryStore::new());
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    store.add_friendship(alice, bob).await;
    let app = app(store);

    let (status, _) = call(
        &app,
        "POST",
        "/challenges",
        alice,
        Some(json!({ "opponent_id": carol, "tier": "hard", "question_count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = call(
        &app,
        "POST",
        "/challenges",
        alice,
        Some(json!({ "opponent_id": bob, "tier": "hard", "question_count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "GET", &format!("/challenges/{}", id), carol, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "POST", &format!("/challenges/{}/start", id), alice, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "POST", &format!("/challenges/{}/accept", id), alice, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let accept_uri = format!("/challenges/{}/accept", id);
    let (status, accepted) = call(&app, "POST", &accept_uri, bob, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let start_uri = format!("/challenges/{}/start", id);
    let (status, started) = call(&app, "POST", &start_uri, alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "active");

    let (status, listed) = call(&app, "GET", "/challenges", bob, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn unknown_challenges_are_not_found() {
    let app = app(Arc::new(InMemoryStore::new()));
    let (status, _) = call(
        &app,
        "GET",
        &format!("/challenges/{}", Uuid::new_v4()),
        Uuid::new_v4(),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_question_counts_are_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    store.add_friendship(alice, bob).await;
    let app = app(store);

    let (status, _) = call(
        &app,
        "POST",
        "/challenges",
        alice,
        Some(json!({ "opponent_id": bob, "tier": "hard", "question_count": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
