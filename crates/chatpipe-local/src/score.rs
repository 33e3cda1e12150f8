//! Hand-tuned relevance scoring of search results against the question.
//!
//! This is an explicit, inspectable linear function of
//! (question, result, current_year) → integer, not a learned model. Every
//! bonus/penalty lives in [`ScoreWeights`] so each rule can be toggled
//! independently in tests. Scoring is deterministic; ordering downstream is a
//! stable sort.

use crate::textprep::{extract_keywords, normalize, scrub};
use crate::topics;
use chatpipe_core::{ScoredResult, SearchResult};

/// Price cues on the result side (the question side uses
/// [`topics::is_price_question`]). The euro sign is matched on normalized
/// text since scrubbing drops it.
pub const PRICE_CUE_WORDS: &[&str] = &[
    "prix",
    "tarif",
    "tarifs",
    "abonnement",
    "euro",
    "euros",
    "eur",
    "mois",
    "par mois",
    "offre",
    "promotion",
    "price",
    "subscription",
    "month",
];

pub const SPORTS_TEXT_WORDS: &[&str] = &[
    "match",
    "ligue",
    "league",
    "championnat",
    "championship",
    "ufc",
    "mma",
    "nba",
    "football",
    "soccer",
    "rugby",
    "tennis",
    "boxe",
    "boxing",
    "playoff",
    "finale",
    "mercato",
];

pub const POLITICS_TEXT_WORDS: &[&str] = &[
    "election",
    "elections",
    "president",
    "senat",
    "senate",
    "parlement",
    "parliament",
    "gouvernement",
    "government",
    "politique",
    "politics",
    "ministre",
    "minister",
    "loi",
    "assemblee",
];

pub const REALESTATE_TEXT_WORDS: &[&str] = &[
    "immobilier",
    "appartement",
    "maison",
    "loyer",
    "notaire",
    "real estate",
    "property",
    "rent",
    "mortgage",
];

pub const ENTERTAINMENT_TEXT_WORDS: &[&str] = &[
    "serie",
    "series",
    "saison",
    "season",
    "episode",
    "film",
    "movie",
    "casting",
    "bande annonce",
    "trailer",
    "acteur",
    "actrice",
];

/// Authoritative domains: encyclopedia, official government portals,
/// legal-text portals, major known e-commerce/brand domains.
pub const TRUSTED_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "service-public.fr",
    "legifrance.gouv.fr",
    "gouvernement.fr",
    "economie.gouv.fr",
    "impots.gouv.fr",
    "insee.fr",
    "amazon.fr",
    "fnac.com",
    "netflix.com",
    "apple.com",
    "spotify.com",
];

/// All bonus/penalty knobs, independently toggleable (set a field to 0 to
/// disable that rule).
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub per_keyword: i32,
    pub zero_overlap_penalty: i32,
    pub product_bonus: i32,
    pub price_bonus: i32,
    pub role_bonus: i32,
    pub sports_bonus: i32,
    pub sports_mismatch_penalty: i32,
    pub politics_bonus: i32,
    pub politics_mismatch_penalty: i32,
    pub realestate_bonus: i32,
    pub realestate_mismatch_penalty: i32,
    pub entertainment_bonus: i32,
    pub entertainment_mismatch_penalty: i32,
    pub future_year_penalty: i32,
    pub fresh_year_bonus: i32,
    pub trusted_domain_bonus: i32,
    pub domestic_tld_price_bonus: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            per_keyword: 2,
            zero_overlap_penalty: -4,
            product_bonus: 4,
            price_bonus: 3,
            role_bonus: 3,
            sports_bonus: 2,
            sports_mismatch_penalty: -5,
            politics_bonus: 2,
            politics_mismatch_penalty: -4,
            realestate_bonus: 2,
            realestate_mismatch_penalty: -5,
            entertainment_bonus: 2,
            entertainment_mismatch_penalty: -5,
            future_year_penalty: -3,
            fresh_year_bonus: 1,
            trusted_domain_bonus: 2,
            domestic_tld_price_bonus: 1,
        }
    }
}

fn has_term(scrubbed: &str, term: &str) -> bool {
    format!(" {scrubbed} ").contains(&format!(" {term} "))
}

fn has_any(scrubbed: &str, table: &[&str]) -> bool {
    table.iter().any(|t| has_term(scrubbed, t))
}

/// Crude host extraction, enough for allowlist matching. No URL parsing
/// crate: hosts in search results are well-formed or the match just misses.
fn host_of(url: &str) -> &str {
    let rest = url.split("://").nth(1).unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

fn host_matches(host: &str, pat: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    let pat = pat.trim().to_ascii_lowercase();
    host == pat || host.ends_with(&format!(".{pat}"))
}

fn question_is_politics(question: &str) -> bool {
    topics::is_recent_law_or_politics_question(question)
        || has_any(&scrub(question), topics::POLITICS_CRISIS_WORDS)
}

fn question_is_realestate(question: &str) -> bool {
    has_any(&scrub(question), REALESTATE_TEXT_WORDS)
}

fn question_is_entertainment(question: &str) -> bool {
    has_any(&scrub(question), ENTERTAINMENT_TEXT_WORDS)
}

/// Score one result against the question.
pub fn score_result(
    question: &str,
    result: &SearchResult,
    current_year: i32,
    w: &ScoreWeights,
) -> i32 {
    let raw_text = format!(
        "{} {} {}",
        result.title.as_deref().unwrap_or(""),
        result.snippet.as_deref().unwrap_or(""),
        result.url
    );
    let text = scrub(&raw_text);
    let text_normalized = normalize(&raw_text);
    let mut score = 0i32;

    // Keyword overlap, the backbone signal. Zero lexical overlap is a strong
    // relevance-negative signal even before topical rules.
    let keywords = extract_keywords(question);
    let mut overlap = 0usize;
    for kw in &keywords {
        if has_term(&text, kw) {
            overlap += 1;
        }
    }
    if !keywords.is_empty() && overlap == 0 {
        score += w.zero_overlap_penalty;
    } else {
        score += w.per_keyword * overlap as i32;
    }

    // Topical bonus/penalty pairs, keyed off (question-side, text-side).
    if topics::is_product_or_service_question(question) && has_any(&text, topics::PRODUCT_WORDS) {
        score += w.product_bonus;
    }
    let text_has_price_cue = has_any(&text, PRICE_CUE_WORDS) || text_normalized.contains('€');
    if topics::is_price_question(question) && text_has_price_cue {
        score += w.price_bonus;
    }
    if topics::is_person_in_role_question(question) && has_any(&text, topics::ROLE_WORDS) {
        score += w.role_bonus;
    }

    let text_sports = has_any(&text, SPORTS_TEXT_WORDS);
    if topics::is_sports_like_question(question) {
        if text_sports {
            score += w.sports_bonus;
        }
    } else if text_sports {
        score += w.sports_mismatch_penalty;
    }

    let text_politics = has_any(&text, POLITICS_TEXT_WORDS);
    if question_is_politics(question) {
        if text_politics {
            score += w.politics_bonus;
        }
    } else if text_politics {
        score += w.politics_mismatch_penalty;
    }

    let text_realestate = has_any(&text, REALESTATE_TEXT_WORDS);
    if question_is_realestate(question) {
        if text_realestate {
            score += w.realestate_bonus;
        }
    } else if text_realestate {
        score += w.realestate_mismatch_penalty;
    }

    let text_entertainment = has_any(&text, ENTERTAINMENT_TEXT_WORDS);
    if question_is_entertainment(question) {
        if text_entertainment {
            score += w.entertainment_bonus;
        }
    } else if text_entertainment {
        score += w.entertainment_mismatch_penalty;
    }

    // Year adjustment: future-dated content is likely speculative; current or
    // immediately preceding year is a freshness signal. Applied once each.
    let years = topics::year_tokens(&raw_text);
    if years.iter().any(|y| *y > current_year + 1) {
        score += w.future_year_penalty;
    }
    if years.iter().any(|y| *y == current_year || *y == current_year - 1) {
        score += w.fresh_year_bonus;
    }

    // Trusted-domain bonus, plus a small domestic-TLD nudge on price questions.
    let host = host_of(&result.url);
    if TRUSTED_DOMAINS.iter().any(|d| host_matches(host, d)) {
        score += w.trusted_domain_bonus;
    }
    if topics::is_price_question(question) && host.to_ascii_lowercase().ends_with(".fr") {
        score += w.domestic_tld_price_bonus;
    }

    score
}

/// Score a whole result list, preserving provider order (ties are broken by
/// original order downstream).
pub fn score_results(
    question: &str,
    results: &[SearchResult],
    current_year: i32,
    w: &ScoreWeights,
) -> Vec<ScoredResult> {
    results
        .iter()
        .map(|r| ScoredResult {
            result: r.clone(),
            score: score_result(question, r, current_year, w),
        })
        .collect()
}
