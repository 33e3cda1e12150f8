use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;
use chatpipe_core::{Error, Result, SearchProvider, SearchQuery, SearchResponse, SearchResult};

fn timeout_ms_from_query(q: &SearchQuery) -> u64 {
    // Provider requests can hang indefinitely without an explicit timeout.
    // Keep a conservative cap even if callers pass something huge.
    q.timeout_ms.unwrap_or(20_000).clamp(1_000, 60_000)
}

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn serpapi_api_key_from_env() -> Option<String> {
    env("CHATPIPE_SERPAPI_API_KEY")
        .or_else(|| env("SERPAPI_API_KEY"))
        .or_else(|| env("SERP_API_KEY"))
}

pub fn brave_api_key_from_env() -> Option<String> {
    env("CHATPIPE_BRAVE_API_KEY").or_else(|| env("BRAVE_SEARCH_API_KEY"))
}

fn serpapi_endpoint_from_env() -> Option<String> {
    env("CHATPIPE_SERPAPI_ENDPOINT")
}

fn brave_endpoint_from_env() -> Option<String> {
    env("CHATPIPE_BRAVE_ENDPOINT")
}

#[derive(Debug, Clone)]
pub struct SerpApiSearchProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Clone)]
pub struct BraveSearchProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SerpApiSearchProvider {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        let endpoint = serpapi_endpoint_from_env()
            .unwrap_or_else(|| "https://serpapi.com/search".to_string());
        Self {
            client,
            api_key,
            endpoint,
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = serpapi_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured(
                "missing CHATPIPE_SERPAPI_API_KEY (or SERPAPI_API_KEY / SERP_API_KEY)".to_string(),
            )
        })?;
        Ok(Self::new(client, api_key))
    }
}

impl BraveSearchProvider {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        let endpoint = brave_endpoint_from_env()
            .unwrap_or_else(|| "https://api.search.brave.com/res/v1/web/search".to_string());
        Self {
            client,
            api_key,
            endpoint,
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = brave_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured(
                "missing CHATPIPE_BRAVE_API_KEY (or BRAVE_SEARCH_API_KEY)".to_string(),
            )
        })?;
        Ok(Self::new(client, api_key))
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiSearchResponse {
    organic_results: Option<Vec<SerpApiOrganicResult>>,
}

#[derive(Debug, Deserialize)]
struct SerpApiOrganicResult {
    link: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for SerpApiSearchProvider {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let max_results = q.max_results.unwrap_or(5).min(20);
        let timeout_ms = timeout_ms_from_query(q);

        let mut req = self
            .client
            .get(self.endpoint.as_str())
            .query(&[("engine", "google"), ("q", q.query.as_str())])
            .query(&[("num", max_results.to_string())])
            .query(&[("api_key", self.api_key.as_str())]);

        if let Some(hl) = q.interface_language.as_deref() {
            req = req.query(&[("hl", hl)]);
        }
        if let Some(gl) = q.country.as_deref() {
            req = req.query(&[("gl", gl)]);
        }

        let resp = req
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("serpapi search HTTP {status}")));
        }

        let parsed: SerpApiSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let mut out = Vec::new();
        if let Some(rs) = parsed.organic_results {
            for r in rs.into_iter().take(max_results) {
                let Some(url) = r.link else { continue };
                out.push(SearchResult {
                    url,
                    title: r.title,
                    snippet: r.snippet,
                    source: "serpapi".to_string(),
                });
            }
        }

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());

        Ok(SearchResponse {
            results: out,
            provider: "serpapi".to_string(),
            timings_ms,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BraveWebSearchResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    results: Option<Vec<BraveWebResult>>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResult {
    url: String,
    title: Option<String>,
    #[serde(rename = "description")]
    description: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for BraveSearchProvider {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let timeout_ms = timeout_ms_from_query(q);

        let mut req = self
            .client
            .get(self.endpoint.as_str())
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", q.query.as_str())]);

        if let Some(n) = q.max_results {
            // Brave uses `count` for result count.
            req = req.query(&[("count", n.to_string())]);
        }
        if let Some(lang) = q.language.as_deref() {
            // Best-effort hints; Brave treats these as optional knobs.
            req = req.query(&[("search_lang", lang)]);
        }
        if let Some(country) = q.country.as_deref() {
            req = req.query(&[("country", country)]);
        }

        let resp = req
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("brave search HTTP {status}")));
        }

        let parsed: BraveWebSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let mut out = Vec::new();
        if let Some(web) = parsed.web {
            if let Some(results) = web.results {
                for r in results {
                    out.push(SearchResult {
                        url: r.url,
                        title: r.title,
                        snippet: r.description,
                        source: "brave".to_string(),
                    });
                }
            }
        }

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());

        Ok(SearchResponse {
            results: out,
            provider: "brave".to_string(),
            timings_ms,
        })
    }
}
