//! Query rewriting: turn a free-form user question into a crisp search-engine
//! query string.
//!
//! Two paths, in order of precision:
//! - structural "X vs Y" sports pattern → deterministic template, no model call
//! - everything else → constrained completion call with worked examples,
//!   falling back to the trivial "`question` `year`" template
//!
//! Hard contract either way: the returned query is never empty.

use chatpipe_core::{ChatCompletion, ChatMessage, CompletionOptions, SearchLocale};
use tracing::debug;

const REWRITE_SYSTEM_FR: &str = "\
Tu réécris une question d'utilisateur en requête de moteur de recherche.
Règles :
- garde le sujet central, supprime les mots de remplissage
- ajoute l'année en cours pour les sujets sensibles au temps (prix, résultats, actualité)
- réponds avec la requête seule, sans guillemets, sans explication
Exemples :
- \"combien coûte l'abonnement Netflix par mois ?\" -> \"prix abonnement Netflix {year}\"
- \"qui a gagné le dernier match du PSG ?\" -> \"résultat dernier match PSG {year}\"
- \"c'est quoi la dernière loi votée ?\" -> \"dernière loi votée Assemblée Nationale {year}\"";

const REWRITE_SYSTEM_EN: &str = "\
Rewrite a user question into a search engine query.
Rules:
- keep the core subject, strip filler words
- append the current year for time-sensitive topics (prices, results, news)
- answer with the bare query only, no quotes, no explanation
Examples:
- \"how much is Netflix per month?\" -> \"Netflix subscription price {year}\"
- \"who won the last UFC fight?\" -> \"last UFC fight result {year}\"";

/// Templated query for the "X vs Y" sports duel pattern. This structural case
/// is higher-precision than free-form rewriting, so it bypasses the model.
pub fn versus_query(a: &str, b: &str, locale: &SearchLocale, current_year: i32) -> String {
    if locale.is_french() {
        format!("{a} vs {b} résultat {current_year}")
    } else {
        format!("{a} vs {b} result {current_year}")
    }
}

/// Trivial fallback: the raw question plus the current year.
pub fn fallback_query(question: &str, current_year: i32) -> String {
    format!("{} {current_year}", question.trim())
}

/// Reject model output that is unusable as a query: empty, multi-line beyond
/// the first, wrapped in quotes/fences, or absurdly long.
fn sanitize_rewrite(raw: &str) -> Option<String> {
    let line = raw.lines().find(|l| !l.trim().is_empty())?;
    let cleaned = line
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if cleaned.is_empty() || cleaned.chars().count() > 200 {
        return None;
    }
    Some(cleaned.to_string())
}

/// Rewrite via the completion capability; on any failure fall back to
/// [`fallback_query`]. Never returns an empty string.
pub async fn rewrite_query(
    llm: &dyn ChatCompletion,
    question: &str,
    locale: &SearchLocale,
    current_year: i32,
    timeout_ms: u64,
) -> String {
    let system = if locale.is_french() {
        REWRITE_SYSTEM_FR
    } else {
        REWRITE_SYSTEM_EN
    }
    .replace("{year}", &current_year.to_string());

    let messages = [ChatMessage::system(system), ChatMessage::user(question)];
    let opts = CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(80),
        timeout_ms,
        stream: false,
    };

    match llm.complete(&messages, &opts).await {
        Ok(raw) => match sanitize_rewrite(&raw) {
            Some(q) => q,
            None => {
                debug!("rewrite output unusable, using fallback query");
                fallback_query(question, current_year)
            }
        },
        Err(e) => {
            debug!(error = %e, "rewrite call failed, using fallback query");
            fallback_query(question, current_year)
        }
    }
}
