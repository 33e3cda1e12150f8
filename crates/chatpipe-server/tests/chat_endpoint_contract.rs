//! Contract tests for the HTTP chat surface, with a stub completion backend
//! and no search provider configured.
//!
//! The stub replies with a marker depending on which instruction it saw, so
//! tests can assert which prompt branch fired without parsing model output.

use axum::routing::post;
use axum::Router;
use chatpipe_local::openai_compat::OpenAiCompatClient;
use chatpipe_local::pipeline::{ChatPipeline, PipelineConfig};
use chatpipe_server::http::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;

/// Completion stub: inspects the prompt and answers with a branch marker.
async fn openai_stub() -> SocketAddr {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|body: String| async move {
            let reply = if body.contains("prédire l'avenir") {
                "[future-instructed]"
            } else if body.contains("n'invente aucun chiffre") {
                "[uncertainty]"
            } else if body.contains("Résultats :") {
                "[search-summary]"
            } else {
                "[plain]"
            };
            axum::Json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": reply}}]
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_cfg() -> PipelineConfig {
    PipelineConfig {
        advisory: false,
        llm_rewrite: false,
        ..PipelineConfig::default()
    }
}

async fn serve_chat(llm_addr: SocketAddr) -> SocketAddr {
    let llm = OpenAiCompatClient::new(
        reqwest::Client::new(),
        format!("http://{llm_addr}"),
        None,
        "gpt-4o".to_string(),
    );
    let pipeline = Arc::new(ChatPipeline::new(Arc::new(llm), None, test_cfg()));
    let app = router(AppState { pipeline });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

#[tokio::test]
async fn greeting_is_answered_plainly_without_search_or_boilerplate() {
    let llm = openai_stub().await;
    let addr = serve_chat(llm).await;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&serde_json::json!({"message": "Salut"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp["reply"], "[plain]");
    assert_eq!(resp["used_search"], false);
    assert_eq!(resp["volatile"], false);
    assert_eq!(resp["mode_label"], "chat");
}

#[tokio::test]
async fn future_question_gets_the_cannot_predict_instruction() {
    let llm = openai_stub().await;
    let addr = serve_chat(llm).await;

    let year = 2039;
    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&serde_json::json!({"message": format!("Qui sera président en {year} ?")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp["reply"], "[future-instructed]");
    assert_eq!(resp["used_search"], false);
    assert_eq!(resp["mode_label"], "future");
}

#[tokio::test]
async fn volatile_question_without_a_provider_stays_a_plain_chat() {
    let llm = openai_stub().await;
    let addr = serve_chat(llm).await;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&serde_json::json!({"message": "combien coûte l'abonnement Netflix ?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // No provider configured: no search attempted, but the topic is still
    // reported volatile.
    assert_eq!(resp["used_search"], false);
    assert_eq!(resp["volatile"], true);
    assert_eq!(resp["mode_label"], "chat");
    assert_eq!(resp["reply"], "[plain]");
}

#[tokio::test]
async fn empty_message_is_a_bad_request() {
    let llm = openai_stub().await;
    let addr = serve_chat(llm).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&serde_json::json!({"message": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completion_failure_is_the_only_user_visible_error() {
    // A stub that always 500s: the pipeline has no further fallback.
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let llm_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let addr = serve_chat(llm_addr).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&serde_json::json!({"message": "Salut"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn healthz_answers_ok() {
    let llm = openai_stub().await;
    let addr = serve_chat(llm).await;
    let body = reqwest::get(format!("http://{addr}/healthz"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}
