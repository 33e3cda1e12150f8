//! End-to-end request handling: effective-question resolution, search
//! decision, locale + query routing, scoring/filtering, prompt assembly and
//! the completion call.
//!
//! Policy reminders enforced here:
//! - advisory layers may only ADD search-worthiness, never subtract it
//! - future questions never search, whatever else fired
//! - an empty filter output after an attempted search always swaps in the
//!   explicit "no reliable info" instruction: the model must not invent
//!   prices, scores, office-holders or dates

use crate::classify;
use crate::filter::{filter_results, DEFAULT_SCORE_MARGIN};
use crate::locale::route_locale;
use crate::memory::{MemoryStore, DEFAULT_MAX_CALLERS, DEFAULT_MAX_TURNS};
use crate::rewrite::{fallback_query, rewrite_query, versus_query};
use crate::score::{score_results, ScoreWeights};
use crate::topics;
use chatpipe_core::{
    ChatCompletion, ChatMessage, ClassificationVerdict, CompletionOptions, Domain, EntityIntent,
    Error, LikelyDomain, Result, ScoredResult, SearchProvider, SearchQuery, Volatility,
};
use chrono::Datelike;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "\
Tu es un assistant conversationnel francophone.

Règles importantes :
- L'utilisateur est en France. Pour les prix, abonnements et tarifs, réponds en euros pour la France.
- Utilise l'historique uniquement si la nouvelle question a un lien logique clair avec les derniers messages. Si la question est sans rapport, traite-la comme un nouveau sujet.
- Si les résultats web sont contradictoires, incomplets ou flous : dis que tu n'es pas sûr et propose de vérifier sur le site officiel plutôt que d'inventer.
- Pour les prix : donne un montant clair (mensuel ou annuel). Pas de fourchettes US.
- Par défaut, si tu parles d'un prix, c'est la France, sauf si l'utilisateur demande explicitement un autre pays.";

const NO_RELIABLE_INFO_INSTRUCTION: &str = "\
Aucune source web fiable et à jour n'a été trouvée pour cette question.
Dis explicitement que tu n'as pas d'information fiable et récente, propose de vérifier sur le site officiel, et n'invente aucun chiffre, prix, score, date ou nom.";

const FUTURE_QUESTION_INSTRUCTION: &str = "\
La question porte sur un événement futur qui n'a pas encore eu lieu.
Dis clairement que tu ne peux pas prédire l'avenir, et ne spécule pas sur un résultat.";

/// Model-classifier domains considered volatile enough to justify a search on
/// their own.
const HIGH_VOLATILITY_DOMAINS: &[Domain] = &[
    Domain::Finance,
    Domain::Sports,
    Domain::Politics,
    Domain::CurrentAffairs,
];

/// Number of raw results requested from the provider.
const MAX_RAW_RESULTS: usize = 5;

/// Number of filtered results handed to the summarizer.
const MAX_SUMMARIZED_RESULTS: usize = 3;

#[derive(Debug, Clone)]
pub struct SearchDecision {
    pub should_search: bool,
    pub volatile: bool,
    pub future_question: bool,
}

/// Final "do we search" policy: a disjunction of the advisory and keyword
/// signals, gated by the future-question hard override. Pure and total.
pub fn decide_search(
    text: &str,
    verdict: Option<&ClassificationVerdict>,
    intent: Option<&EntityIntent>,
    current_year: i32,
) -> SearchDecision {
    let future_question = topics::is_future_question(text, current_year);
    let regex_volatile = topics::is_volatile_topic(text);
    let model_volatile = verdict
        .map(|v| matches!(v.volatility, Volatility::High | Volatility::Medium))
        .unwrap_or(false);
    let model_needs_web = verdict.map(|v| v.needs_web).unwrap_or(false);
    let model_hot_domain = verdict
        .map(|v| HIGH_VOLATILITY_DOMAINS.contains(&v.domain))
        .unwrap_or(false);
    let versus_sports = intent
        .map(|i| i.is_vs_pattern && i.likely_domain == LikelyDomain::Sport)
        .unwrap_or(false)
        || (topics::detect_versus(text).is_some() && topics::is_sports_like_question(text));

    let wants_search = model_needs_web
        || model_volatile
        || regex_volatile
        || topics::suggests_web_search(text)
        || model_hot_domain
        || versus_sports;

    SearchDecision {
        // Never search for things that have not happened; never search for a
        // bare greeting.
        should_search: wants_search && !future_question && !topics::is_greeting(text),
        volatile: regex_volatile || model_volatile,
        future_question,
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub score_margin: i32,
    pub max_callers: usize,
    pub max_history_turns: usize,
    pub search_timeout_ms: u64,
    pub llm_timeout_ms: u64,
    pub advisory_timeout_ms: u64,
    /// Model-assisted classifier + entity router (advisory layer).
    pub advisory: bool,
    /// LLM query rewriting; when off, the deterministic fallback template is
    /// used directly.
    pub llm_rewrite: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            score_margin: DEFAULT_SCORE_MARGIN,
            max_callers: DEFAULT_MAX_CALLERS,
            max_history_turns: DEFAULT_MAX_TURNS,
            search_timeout_ms: 20_000,
            llm_timeout_ms: 45_000,
            advisory_timeout_ms: 10_000,
            advisory: true,
            llm_rewrite: true,
        }
    }
}

/// Reply plus the metadata flags surfaced to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub used_search: bool,
    pub volatile: bool,
    pub mode_label: String,
    pub domain: Option<String>,
    pub country: String,
}

pub struct ChatPipeline {
    llm: Arc<dyn ChatCompletion>,
    search: Option<Arc<dyn SearchProvider>>,
    memory: MemoryStore,
    weights: ScoreWeights,
    cfg: PipelineConfig,
}

impl ChatPipeline {
    pub fn new(
        llm: Arc<dyn ChatCompletion>,
        search: Option<Arc<dyn SearchProvider>>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            search,
            memory: MemoryStore::new(cfg.max_callers, cfg.max_history_turns),
            weights: ScoreWeights::default(),
            cfg,
        }
    }

    pub fn has_search_provider(&self) -> bool {
        self.search.is_some()
    }

    /// Handle one inbound message for `caller` (a network-address-derived
    /// key). The only error surfaced to callers is a terminal completion
    /// failure; every optional subsystem degrades silently.
    pub async fn handle_message(&self, caller: &str, message: &str) -> Result<ChatOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidRequest("empty message".to_string()));
        }
        let current_year = chrono::Utc::now().year();

        // Effective question: a follow-up trigger resolves to the stored
        // last-question; anything else becomes the new last-question. Never
        // a blend of the two.
        let effective = if topics::is_followup_trigger(message) {
            match self.memory.last_question(caller) {
                Some(q) => {
                    debug!("follow-up trigger, reusing previous question");
                    q
                }
                None => message.to_string(),
            }
        } else {
            self.memory.set_last_question(caller, message);
            message.to_string()
        };

        let greeting = topics::is_greeting(&effective);
        let (verdict, intent) = if self.cfg.advisory && !greeting {
            (
                match classify::classify_domain(
                    self.llm.as_ref(),
                    &effective,
                    self.cfg.advisory_timeout_ms,
                )
                .await
                {
                    Ok(v) => Some(v),
                    Err(u) => {
                        debug!(reason = %u.reason, "domain classifier unavailable, keyword path only");
                        None
                    }
                },
                match classify::route_entities(
                    self.llm.as_ref(),
                    &effective,
                    self.cfg.advisory_timeout_ms,
                )
                .await
                {
                    Ok(i) => Some(i),
                    Err(u) => {
                        debug!(reason = %u.reason, "entity router unavailable");
                        None
                    }
                },
            )
        } else {
            (None, None)
        };

        let decision = decide_search(&effective, verdict.as_ref(), intent.as_ref(), current_year);
        let locale = route_locale(&effective, verdict.as_ref());

        let mut kept: Vec<ScoredResult> = Vec::new();
        let mut search_attempted = false;
        if decision.should_search {
            if let Some(provider) = &self.search {
                search_attempted = true;
                let query = match topics::detect_versus(&effective) {
                    Some((a, b)) if topics::is_sports_like_question(&effective) => {
                        versus_query(&a, &b, &locale, current_year)
                    }
                    _ if self.cfg.llm_rewrite => {
                        rewrite_query(
                            self.llm.as_ref(),
                            &effective,
                            &locale,
                            current_year,
                            self.cfg.advisory_timeout_ms,
                        )
                        .await
                    }
                    _ => fallback_query(&effective, current_year),
                };
                debug!(provider = provider.name(), query = %query, geo = %locale.geo_code, "searching");

                let sq = SearchQuery {
                    query,
                    max_results: Some(MAX_RAW_RESULTS),
                    language: Some(locale.language.clone()),
                    interface_language: Some(locale.interface_language.clone()),
                    country: Some(locale.geo_code.clone()),
                    timeout_ms: Some(self.cfg.search_timeout_ms),
                };
                match provider.search(&sq).await {
                    Ok(resp) => {
                        let scored =
                            score_results(&effective, &resp.results, current_year, &self.weights);
                        kept = filter_results(scored, self.cfg.score_margin);
                        info!(
                            raw = resp.results.len(),
                            kept = kept.len(),
                            provider = provider.name(),
                            "search results filtered"
                        );
                    }
                    Err(e) => {
                        // Upstream failure is "no usable results", never a
                        // user-visible error.
                        warn!(error = %e, "search failed, continuing without results");
                    }
                }
            } else {
                debug!("search wanted but no provider configured");
            }
        }

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(self.memory.history(caller));
        messages.push(ChatMessage::user(effective.clone()));
        if decision.future_question {
            messages.push(ChatMessage::system(FUTURE_QUESTION_INSTRUCTION));
        } else if !kept.is_empty() {
            messages.push(ChatMessage::system(search_summary_message(&kept)));
        } else if search_attempted {
            messages.push(ChatMessage::system(NO_RELIABLE_INFO_INSTRUCTION));
        }

        let opts = CompletionOptions {
            temperature: Some(0.3),
            max_tokens: Some(600),
            timeout_ms: self.cfg.llm_timeout_ms,
            stream: true,
        };
        let reply = self.llm.complete(&messages, &opts).await?;
        let reply = if reply.trim().is_empty() {
            "Je n'ai pas réussi à formuler une réponse.".to_string()
        } else {
            reply.trim().to_string()
        };

        self.memory.record_exchange(caller, message, &reply);

        let mode_label = if decision.future_question {
            "future"
        } else if !kept.is_empty() {
            "search"
        } else if search_attempted {
            "search-empty"
        } else {
            "chat"
        };

        Ok(ChatOutcome {
            reply,
            used_search: !kept.is_empty(),
            volatile: decision.volatile,
            mode_label: mode_label.to_string(),
            domain: verdict.as_ref().map(|v| v.domain.as_str().to_string()),
            country: locale.target_country,
        })
    }
}

/// System message carrying the numbered top results to the summarizer, with
/// the anti-invention instructions.
fn search_summary_message(kept: &[ScoredResult]) -> String {
    let summary = kept
        .iter()
        .take(MAX_SUMMARIZED_RESULTS)
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}\n{}",
                i + 1,
                r.result.title.as_deref().unwrap_or(&r.result.url),
                r.result.snippet.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Voici des résultats de recherche web.\n\
         - Donne 1 prix clair en euros pour la France quand la question porte sur un prix.\n\
         - Si les infos sont contradictoires : dis-le.\n\
         - Ne mélange pas avec un ancien sujet.\n\n\
         Résultats :\n{summary}"
    )
}
