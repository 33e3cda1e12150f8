//! Volatile-topic detection: named keyword tables consumed by pure predicates.
//!
//! Every predicate here is stateless, total, case/diacritic-insensitive and
//! order-independent (no detector depends on another firing first). Matching
//! is token-boundary substring search over [`crate::textprep::scrub`] output,
//! so the tables are written in scrubbed form ("aujourd hui", not
//! "aujourd'hui").

use crate::textprep::scrub;

/// Price/cost/subscription/tariff vocabulary.
pub const PRICE_WORDS: &[&str] = &[
    "prix",
    "tarif",
    "tarifs",
    "abonnement",
    "abonnements",
    "abo",
    "cout",
    "couts",
    "coute",
    "coutent",
    "combien",
    "euros",
    "payant",
    "gratuit",
    "promo",
    "promotion",
    "reduction",
];

/// Named commercial brands/products/services (streaming, retail, consumer
/// electronics). Deliberately a data table so it can grow without touching
/// control flow.
pub const PRODUCT_WORDS: &[&str] = &[
    "netflix",
    "spotify",
    "disney",
    "disney plus",
    "amazon",
    "amazon prime",
    "prime video",
    "canal",
    "deezer",
    "youtube premium",
    "apple",
    "icloud",
    "iphone",
    "samsung",
    "playstation",
    "xbox",
    "nintendo",
    "orange",
    "sfr",
    "bouygues",
    "free mobile",
    "uber",
    "airbnb",
    "deliveroo",
    "fnac",
    "darty",
    "leclerc",
    "carrefour",
    "tesla",
    "chatgpt",
];

/// Titles denoting an incumbent office-holder.
pub const ROLE_WORDS: &[&str] = &[
    "president",
    "presidente",
    "ministre",
    "premier ministre",
    "ceo",
    "pdg",
    "directeur general",
    "roi",
    "reine",
    "monarque",
    "maire",
    "pape",
    "chancelier",
    "entraineur",
    "selectionneur",
];

/// Legislative vocabulary. A hit here alone is NOT enough to flag a
/// recent-law question; see [`is_recent_law_or_politics_question`].
pub const LAW_WORDS: &[&str] = &[
    "loi",
    "lois",
    "decret",
    "reforme",
    "legislation",
    "vote",
    "votee",
    "amendement",
    "projet de loi",
];

/// Recency markers ("latest", "new", "currently", ...).
pub const RECENCY_WORDS: &[&str] = &[
    "derniere",
    "dernier",
    "dernieres",
    "derniers",
    "recent",
    "recente",
    "recemment",
    "nouvelle",
    "nouveau",
    "nouvelles",
    "actuel",
    "actuelle",
    "actuellement",
    "aujourd hui",
    "hier",
    "cette semaine",
    "ce mois",
    "cette annee",
    "en ce moment",
    "maintenant",
];

/// Government/France context markers.
pub const GOV_CONTEXT_WORDS: &[&str] = &[
    "assemblee",
    "assemblee nationale",
    "senat",
    "gouvernement",
    "parlement",
    "france",
    "francais",
    "francaise",
    "conseil constitutionnel",
    "elysee",
    "matignon",
];

/// Political/crisis vocabulary for the generic current-affairs detector.
pub const POLITICS_CRISIS_WORDS: &[&str] = &[
    "election",
    "elections",
    "guerre",
    "conflit",
    "crise",
    "greve",
    "manifestation",
    "sondage",
    "scandale",
    "demission",
];

/// Results/scores vocabulary.
pub const RESULTS_WORDS: &[&str] = &[
    "resultat",
    "resultats",
    "score",
    "scores",
    "classement",
    "vainqueur",
    "gagnant",
    "gagne",
    "perdu",
    "qualifie",
    "elimine",
];

/// "Last match/fight/episode/season" phrasing.
pub const LAST_EVENT_PHRASES: &[&str] = &[
    "dernier match",
    "dernier combat",
    "dernier episode",
    "derniere saison",
    "derniere journee",
    "dernier grand prix",
];

/// Weather vocabulary.
pub const WEATHER_WORDS: &[&str] = &[
    "meteo",
    "temperature",
    "canicule",
    "tempete",
    "orage",
    "pluie",
];

/// Macroeconomic-statistics vocabulary.
pub const MACRO_WORDS: &[&str] = &[
    "inflation",
    "chomage",
    "pib",
    "taux d interet",
    "croissance",
    "smic",
];

/// Sport/combat vocabulary.
pub const SPORT_WORDS: &[&str] = &[
    "foot",
    "football",
    "ligue",
    "match",
    "championnat",
    "coupe",
    "tournoi",
    "ufc",
    "mma",
    "boxe",
    "combat",
    "tennis",
    "rugby",
    "basket",
    "nba",
    "formule 1",
    "grand prix",
    "olympique",
    "mercato",
    "transfert",
];

/// "Faced/played against" phrasing.
pub const FACED_PHRASES: &[&str] = &[
    "affronte",
    "affronter",
    "joue contre",
    "a joue contre",
    "s est battu contre",
];

/// AI/dev/SaaS/growth/crypto vocabulary: signals a locale bias toward the
/// global/English web rather than the domestic one.
pub const TECH_GLOBAL_WORDS: &[&str] = &[
    "intelligence artificielle",
    "chatgpt",
    "openai",
    "llm",
    "startup",
    "saas",
    "api",
    "crypto",
    "bitcoin",
    "ethereum",
    "blockchain",
    "cloud",
    "developpeur",
    "framework",
    "javascript",
    "python",
    "growth",
    "marketing digital",
    "seo",
];

/// Immediacy adverbs that flag a volatile topic on their own.
pub const IMMEDIACY_WORDS: &[&str] = &[
    "aujourd hui",
    "hier",
    "avant hier",
    "cette semaine",
    "ce soir",
    "ce matin",
    "actuellement",
    "en ce moment",
    "maintenant",
    "recemment",
    "ce week end",
];

/// Broader "go look it up" set: explicit web-search phrasing plus generic
/// actuality words. Feeds the separate `suggests_web_search` heuristic.
pub const WEB_HINT_WORDS: &[&str] = &[
    "google",
    "internet",
    "recherche",
    "cherche sur",
    "va voir",
    "regarde sur",
    "actualite",
    "actualites",
    "dernieres nouvelles",
    "quoi de neuf",
];

/// Salutations. A message is a greeting only when it is short AND leads with
/// one of these (see [`is_greeting`]).
pub const GREETING_WORDS: &[&str] = &[
    "salut", "bonjour", "bonsoir", "coucou", "hello", "hey", "slt", "bjr", "wesh",
];

/// "Answer my previous question" style utterances.
pub const FOLLOWUP_PHRASES: &[&str] = &[
    "reponds a ma question precedente",
    "ma question precedente",
    "reponds a ma derniere question",
    "ma question d avant",
    "ma question d abord",
    "tu n as pas repondu",
    "et ma question",
];

/// Explicit France mentions (used by the locale router's rule 6 guard).
pub const FRANCE_WORDS: &[&str] = &["france", "francais", "francaise"];

/// Token-boundary match of `term` (word or space-separated phrase) inside
/// scrubbed text. Substring semantics would let "abo" match "about"; padding
/// both sides with spaces keeps the tables honest.
fn has_term(scrubbed: &str, term: &str) -> bool {
    if scrubbed.is_empty() || term.is_empty() {
        return false;
    }
    let padded = format!(" {scrubbed} ");
    padded.contains(&format!(" {term} "))
}

fn has_any(scrubbed: &str, table: &[&str]) -> bool {
    table.iter().any(|t| has_term(scrubbed, t))
}

/// All 4-digit year tokens in the text, in order of appearance.
pub fn year_tokens(text: &str) -> Vec<i32> {
    scrub(text)
        .split_whitespace()
        .filter(|t| t.len() == 4 && t.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|t| t.parse::<i32>().ok())
        .filter(|y| (1900..=2100).contains(y))
        .collect()
}

pub fn is_price_question(text: &str) -> bool {
    has_any(&scrub(text), PRICE_WORDS)
}

pub fn is_product_or_service_question(text: &str) -> bool {
    has_any(&scrub(text), PRODUCT_WORDS)
}

pub fn is_person_in_role_question(text: &str) -> bool {
    has_any(&scrub(text), ROLE_WORDS)
}

/// Law vocabulary AND (recency OR government/France context). Both legs are
/// required: "qu'est-ce qu'une loi ?" is a definition, not a news question.
pub fn is_recent_law_or_politics_question(text: &str) -> bool {
    let s = scrub(text);
    has_any(&s, LAW_WORDS) && (has_any(&s, RECENCY_WORDS) || has_any(&s, GOV_CONTEXT_WORDS))
}

pub fn is_generic_current_affair_question(text: &str) -> bool {
    let s = scrub(text);
    has_any(&s, POLITICS_CRISIS_WORDS)
        || has_any(&s, RESULTS_WORDS)
        || has_any(&s, LAST_EVENT_PHRASES)
        || has_any(&s, WEATHER_WORDS)
        || has_any(&s, MACRO_WORDS)
}

pub fn is_sports_like_question(text: &str) -> bool {
    let s = scrub(text);
    has_any(&s, SPORT_WORDS) || detect_versus(text).is_some() || has_any(&s, FACED_PHRASES)
}

pub fn is_tech_or_global_info_question(text: &str) -> bool {
    let s = scrub(text);
    // "ia" is too short for the table (two-letter token), so it is special-cased.
    has_any(&s, TECH_GLOBAL_WORDS) || has_term(&s, "ia")
}

/// Combined volatility verdict: any category detector, an explicit year in
/// [2023, 2039], or an immediacy adverb.
pub fn is_volatile_topic(text: &str) -> bool {
    let s = scrub(text);
    is_price_question(text)
        || is_product_or_service_question(text)
        || is_person_in_role_question(text)
        || is_recent_law_or_politics_question(text)
        || is_generic_current_affair_question(text)
        || is_sports_like_question(text)
        || is_tech_or_global_info_question(text)
        || year_tokens(text).iter().any(|y| (2023..=2039).contains(y))
        || has_any(&s, IMMEDIACY_WORDS)
}

/// Broader, independent "the user wants the web" heuristic.
pub fn suggests_web_search(text: &str) -> bool {
    has_any(&scrub(text), WEB_HINT_WORDS)
}

/// A question about a date/event beyond the near-term horizon
/// (current year + 1). Searching for things that have not happened is
/// suppressed unconditionally by the decision layer.
pub fn is_future_question(text: &str, current_year: i32) -> bool {
    year_tokens(text).iter().any(|y| *y > current_year + 1)
}

/// Short salutation-only message. The search-decision layer must never flag
/// these as volatile.
pub fn is_greeting(text: &str) -> bool {
    let s = scrub(text);
    let tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() > 3 {
        return false;
    }
    GREETING_WORDS.contains(&tokens[0])
}

/// "Answer my previous question" follow-up trigger.
pub fn is_followup_trigger(text: &str) -> bool {
    let s = scrub(text);
    FOLLOWUP_PHRASES.iter().any(|p| s.contains(p))
}

pub fn mentions_france(text: &str) -> bool {
    has_any(&scrub(text), FRANCE_WORDS)
}

/// Detect an "X vs Y" / "X contre Y" duel pattern and return the two entity
/// strings (at most three tokens each side, nearest the marker).
pub fn detect_versus(text: &str) -> Option<(String, String)> {
    let s = scrub(text);
    for marker in [" vs ", " versus ", " contre ", " face a "] {
        let Some(idx) = s.find(marker) else {
            continue;
        };
        let left = &s[..idx];
        let right = &s[idx + marker.len()..];
        let a: Vec<&str> = left.split_whitespace().rev().take(3).collect();
        let a: Vec<&str> = a.into_iter().rev().collect();
        let b: Vec<&str> = right.split_whitespace().take(3).collect();
        let a = a.join(" ");
        let b = b.join(" ");
        if a.is_empty() || b.is_empty() {
            continue;
        }
        // Pure numbers on either side ("3 contre 1") are scores, not entities.
        if a.chars().all(|c| c.is_ascii_digit() || c == ' ')
            || b.chars().all(|c| c.is_ascii_digit() || c == ' ')
        {
            continue;
        }
        return Some((a, b));
    }
    None
}
