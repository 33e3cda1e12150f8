//! Inbound HTTP surface: `POST /api/chat` plus a health probe.
//!
//! The caller key is derived from the peer network address. That is a weak
//! identity (shared NAT, proxies) accepted as a limitation: there is no
//! authenticated-session concept to hang a better key on.

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chatpipe_core::Error;
use chatpipe_local::pipeline::{ChatOutcome, ChatPipeline};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub used_search: bool,
    pub volatile: bool,
    pub mode_label: String,
    pub domain: Option<String>,
    pub country: String,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(o: ChatOutcome) -> Self {
        Self {
            reply: o.reply,
            used_search: o.used_search,
            volatile: o.volatile,
            mode_label: o.mode_label,
            domain: o.domain,
            country: o.country,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    // Port excluded on purpose: one caller, many ephemeral ports.
    let caller = addr.ip().to_string();

    match state.pipeline.handle_message(&caller, &req.message).await {
        Ok(outcome) => {
            info!(
                used_search = outcome.used_search,
                mode = %outcome.mode_label,
                "chat exchange completed"
            );
            Ok(Json(outcome.into()))
        }
        Err(Error::InvalidRequest(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "message manquant",
            }),
        )),
        Err(e) => {
            // The only terminal class: the primary completion call failed
            // after its retry. Keep the body neutral.
            error!(error = %e, "chat pipeline failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: "une erreur technique est survenue",
                }),
            ))
        }
    }
}

pub async fn serve(bind: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "chatpipe server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
