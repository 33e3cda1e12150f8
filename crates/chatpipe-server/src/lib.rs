//! `chatpipe-server` crate (library surface).
//!
//! The primary entrypoint for end users is the `chatpipe-server` binary
//! (CLI + HTTP server). This library module exists so the HTTP surface and
//! pipeline wiring can be exercised by integration tests and embedders.

use anyhow::Result;
use chatpipe_local::openai_compat::OpenAiCompatClient;
use chatpipe_local::pipeline::{ChatPipeline, PipelineConfig};
use chatpipe_local::search::{BraveSearchProvider, SerpApiSearchProvider};
use std::sync::Arc;
use tracing::warn;

pub mod http;

/// Optional env-file loader (opt-in).
///
/// Server environments often aren't interactive shells, so users want a single
/// place to keep keys without exporting them manually.
///
/// Safety:
/// - opt-in only (CHATPIPE_ENV_FILE)
/// - sets vars only if not already set in the process environment
/// - does not log values
pub fn load_env_file() {
    if let Ok(p) = std::env::var("CHATPIPE_ENV_FILE") {
        let p = p.trim();
        if !p.is_empty() {
            if let Ok(txt) = std::fs::read_to_string(p) {
                for raw in txt.lines() {
                    let s = raw.trim();
                    if s.is_empty() || s.starts_with('#') {
                        continue;
                    }
                    let Some((k, v)) = s.split_once('=') else {
                        continue;
                    };
                    let k = k.trim();
                    let v = v.trim();
                    if k.is_empty() {
                        continue;
                    }
                    // Don't override explicit process env.
                    if std::env::var_os(k).is_none() {
                        std::env::set_var(k, v);
                    }
                }
            }
        }
    }
}

/// Wire the pipeline from the environment: the completion client is
/// mandatory, the search provider optional (SerpAPI preferred, Brave next,
/// none means every volatile question takes the uncertainty branch).
pub fn build_pipeline(cfg: PipelineConfig) -> Result<ChatPipeline> {
    let client = reqwest::Client::builder()
        .user_agent("chatpipe/0.1")
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;

    let llm = OpenAiCompatClient::from_env(client.clone())?;

    let search: Option<Arc<dyn chatpipe_core::SearchProvider>> =
        match SerpApiSearchProvider::from_env(client.clone()) {
            Ok(p) => Some(Arc::new(p)),
            Err(_) => match BraveSearchProvider::from_env(client) {
                Ok(p) => Some(Arc::new(p)),
                Err(_) => {
                    warn!("no search provider configured, web lookups are disabled");
                    None
                }
            },
        };

    Ok(ChatPipeline::new(Arc::new(llm), search, cfg))
}
