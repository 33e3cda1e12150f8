use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// An advisory classification layer was unable to produce a usable verdict.
///
/// This is deliberately NOT an [`Error`]: advisory failures (transport, non-2xx,
/// malformed JSON, missing credentials) must fall back one layer down instead of
/// propagating. Callers pattern-match on this type, which makes the
/// mandatory-fallback contract type-checked rather than convention-based.
#[derive(thiserror::Error, Debug, Clone)]
#[error("classifier unavailable: {reason}")]
pub struct ClassificationUnavailable {
    pub reason: String,
}

impl ClassificationUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
    /// Search-language hint (e.g. "fr").
    pub language: Option<String>,
    /// Interface-language hint (e.g. "fr" for SerpAPI `hl`).
    pub interface_language: Option<String>,
    /// Geographic code (e.g. "fr" for SerpAPI `gl`, Brave `country`).
    pub country: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub provider: String,
    pub timings_ms: BTreeMap<String, u128>,
}

/// A search result with its relevance score. Ordering is by score descending;
/// ties keep the provider's original order (stable sort).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult {
    pub result: SearchResult,
    pub score: i32,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub timeout_ms: u64,
    /// Ask the backend to stream; implementations consume the stream to
    /// completion and return the concatenated text.
    pub stream: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            timeout_ms: 30_000,
            stream: false,
        }
    }
}

#[async_trait::async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], opts: &CompletionOptions) -> Result<String>;
}

/// Closed domain enumeration used by the advisory classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    TechProduct,
    Finance,
    Sports,
    Politics,
    Culture,
    CurrentAffairs,
    RealEstate,
    Entertainment,
    Health,
    Other,
}

impl Domain {
    /// Lenient label parsing for model output. Unknown labels are rejected so
    /// a hallucinated domain degrades to "classifier unavailable" upstream.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tech_product" | "tech" | "technology" => Some(Domain::TechProduct),
            "finance" | "economy" => Some(Domain::Finance),
            "sports" | "sport" => Some(Domain::Sports),
            "politics" | "politique" => Some(Domain::Politics),
            "culture" => Some(Domain::Culture),
            "current_affairs" | "news" | "actualite" => Some(Domain::CurrentAffairs),
            "real_estate" | "immobilier" => Some(Domain::RealEstate),
            "entertainment" | "divertissement" => Some(Domain::Entertainment),
            "health" | "sante" => Some(Domain::Health),
            "other" | "autre" => Some(Domain::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::TechProduct => "tech_product",
            Domain::Finance => "finance",
            Domain::Sports => "sports",
            Domain::Politics => "politics",
            Domain::Culture => "culture",
            Domain::CurrentAffairs => "current_affairs",
            Domain::RealEstate => "real_estate",
            Domain::Entertainment => "entertainment",
            Domain::Health => "health",
            Domain::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    High,
    Medium,
    Low,
}

impl Volatility {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "haute" => Some(Volatility::High),
            "medium" | "moyenne" => Some(Volatility::Medium),
            "low" | "basse" | "faible" => Some(Volatility::Low),
            _ => None,
        }
    }
}

/// Verdict produced by either the deterministic keyword path or the advisory
/// model path. Request-scoped, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub domain: Domain,
    pub needs_web: bool,
    pub volatility: Volatility,
    /// "france" or a free-form label from the model.
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikelyDomain {
    Sport,
    Politics,
    Business,
    Entertainment,
    Other,
}

/// Advisory entity/intent extraction ("X vs Y" duel detection and a likely
/// domain). May be absent; never load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIntent {
    pub entities: Vec<Entity>,
    pub is_vs_pattern: bool,
    pub likely_domain: LikelyDomain,
}

/// The (language, interface-language, geography) triple controlling which
/// national version of the search engine is queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLocale {
    pub language: String,
    pub interface_language: String,
    pub geo_code: String,
    pub target_country: String,
}

impl SearchLocale {
    pub fn french() -> Self {
        Self {
            language: "fr".to_string(),
            interface_language: "fr".to_string(),
            geo_code: "fr".to_string(),
            target_country: "france".to_string(),
        }
    }

    pub fn english_us() -> Self {
        Self {
            language: "en".to_string(),
            interface_language: "en".to_string(),
            geo_code: "us".to_string(),
            target_country: "usa".to_string(),
        }
    }

    pub fn is_french(&self) -> bool {
        self.language == "fr"
    }
}
