//! Search-locale routing: maps topic/country signals to the national version
//! of the search engine to query.
//!
//! The precedence ladder exists because naive country detection conflates
//! "the service is global" with "the user wants a global price". Rule order
//! is load-bearing; first match wins.

use crate::textprep::scrub;
use crate::topics;
use chatpipe_core::{ClassificationVerdict, SearchLocale};

/// Explicit country/region mentions. These override whatever the advisory
/// classifier guessed.
pub const COUNTRY_MARKERS: &[(&str, &[&str])] = &[
    (
        "usa",
        &[
            "usa",
            "etats unis",
            "amerique",
            "americain",
            "americaine",
            "new york",
            "washington",
        ],
    ),
    (
        "uk",
        &["royaume uni", "angleterre", "londres", "grande bretagne"],
    ),
    ("canada", &["canada", "canadien", "canadienne", "quebec", "montreal"]),
    ("switzerland", &["suisse", "geneve", "zurich", "lausanne"]),
    ("belgium", &["belgique", "belge", "bruxelles"]),
    ("spain", &["espagne", "espagnol", "espagnole", "madrid", "barcelone"]),
    ("germany", &["allemagne", "allemand", "allemande", "berlin", "munich"]),
    ("turkey", &["turquie", "turc", "turque", "istanbul", "ankara"]),
    ("italy", &["italie", "italien", "italienne", "rome", "milan"]),
    (
        "maghreb",
        &[
            "maroc",
            "algerie",
            "tunisie",
            "marocain",
            "algerien",
            "tunisien",
            "casablanca",
            "alger",
            "tunis",
        ],
    ),
];

/// French league/team mentions that pin the locale to France regardless of
/// other signals.
pub const FRENCH_LEAGUE_WORDS: &[&str] = &[
    "ligue 1",
    "ligue 2",
    "psg",
    "paris saint germain",
    "olympique de marseille",
    "olympique lyonnais",
    "saint etienne",
    "top 14",
    "pro d2",
    "equipe de france",
    "les bleus",
    "roland garros",
    "tour de france",
];

/// Global leagues and combat-sports organizations that pull toward the
/// English/US web.
pub const GLOBAL_LEAGUE_WORDS: &[&str] = &[
    "nba",
    "nfl",
    "mlb",
    "nhl",
    "ufc",
    "bellator",
    "premier league",
    "champions league",
    "liga",
    "bundesliga",
    "serie a",
    "super bowl",
    "wimbledon",
    "wwe",
];

/// Globally-known brands whose French price must not default to a US one.
pub const GLOBAL_BRAND_WORDS: &[&str] = &[
    "netflix",
    "spotify",
    "amazon prime",
    "prime video",
    "disney plus",
    "youtube premium",
    "apple",
    "icloud",
    "chatgpt",
    "xbox game pass",
    "playstation plus",
];

fn has_term(scrubbed: &str, term: &str) -> bool {
    format!(" {scrubbed} ").contains(&format!(" {term} "))
}

fn has_any(scrubbed: &str, table: &[&str]) -> bool {
    table.iter().any(|t| has_term(scrubbed, t))
}

/// Country label → locale triple. Unrecognized non-France countries fall back
/// to the French-language locale (a deliberate fallback, not a gap).
pub fn locale_for_country(country: &str) -> SearchLocale {
    let (language, interface_language, geo_code) = match country {
        "usa" => ("en", "en", "us"),
        "uk" => ("en", "en", "gb"),
        "canada" => ("fr", "fr", "ca"),
        "switzerland" => ("fr", "fr", "ch"),
        "belgium" => ("fr", "fr", "be"),
        "spain" => ("es", "es", "es"),
        "germany" => ("de", "de", "de"),
        "turkey" => ("tr", "tr", "tr"),
        "italy" => ("it", "it", "it"),
        "maghreb" => ("fr", "fr", "ma"),
        _ => ("fr", "fr", "fr"),
    };
    SearchLocale {
        language: language.to_string(),
        interface_language: interface_language.to_string(),
        geo_code: geo_code.to_string(),
        target_country: country.to_string(),
    }
}

fn explicit_country_mention(scrubbed: &str) -> Option<&'static str> {
    COUNTRY_MARKERS
        .iter()
        .find(|(_, markers)| has_any(scrubbed, markers))
        .map(|(country, _)| *country)
}

/// Map the question text plus the advisory verdict (country hint) to a search
/// locale. First match wins; see the rule comments.
pub fn route_locale(text: &str, verdict: Option<&ClassificationVerdict>) -> SearchLocale {
    let s = scrub(text);

    // 1. Explicit foreign-country mention outranks the classifier's guess.
    if let Some(country) = explicit_country_mention(&s) {
        return locale_for_country(country);
    }

    let classifier_country = verdict
        .map(|v| v.country.trim().to_ascii_lowercase())
        .filter(|c| !c.is_empty());
    let resolved_is_france = classifier_country.as_deref().map_or(true, |c| c == "france");

    // 2. Price question about a global brand, resolved to France: force the
    // French locale so a global brand does not default to a US price.
    if topics::is_price_question(text) && has_any(&s, GLOBAL_BRAND_WORDS) && resolved_is_france {
        return SearchLocale::french();
    }

    // 3. Domestic league/team mention pins France, whatever else fired.
    if has_any(&s, FRENCH_LEAGUE_WORDS) {
        return SearchLocale::french();
    }

    // 4. Global league or combat-sports organization.
    if has_any(&s, GLOBAL_LEAGUE_WORDS) {
        return SearchLocale::english_us();
    }

    // 5. Non-France classifier country goes through the fixed table.
    if let Some(country) = classifier_country {
        if country != "france" {
            return locale_for_country(&country);
        }
    }

    // 6. Globally-oriented domain without an explicit France mention biases
    // to the English/US web.
    if let Some(v) = verdict {
        use chatpipe_core::Domain;
        let global_domain = matches!(
            v.domain,
            Domain::TechProduct | Domain::Finance | Domain::Culture | Domain::CurrentAffairs
        );
        if global_domain && !topics::mentions_france(text) {
            return SearchLocale::english_us();
        }
    }

    // 7. Default: French locale, target country France.
    SearchLocale::french()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpipe_core::{Domain, Volatility};

    fn verdict(domain: Domain, country: &str) -> ClassificationVerdict {
        ClassificationVerdict {
            domain,
            needs_web: true,
            volatility: Volatility::Medium,
            country: country.to_string(),
        }
    }

    #[test]
    fn domestic_league_outranks_classifier_country_guess() {
        let v = verdict(Domain::Sports, "usa");
        let loc = route_locale("le classement de la Ligue 1", Some(&v));
        assert_eq!(loc, SearchLocale::french());
    }

    #[test]
    fn explicit_country_mention_overrides_classifier() {
        let v = verdict(Domain::CurrentAffairs, "france");
        let loc = route_locale("les élections en Allemagne", Some(&v));
        assert_eq!(loc.geo_code, "de");
        assert_eq!(loc.target_country, "germany");
    }

    #[test]
    fn global_brand_price_question_stays_french() {
        let v = verdict(Domain::TechProduct, "france");
        let loc = route_locale("combien coûte l'abonnement Netflix", Some(&v));
        assert_eq!(loc, SearchLocale::french());
        // Without the price signal, the tech domain biases global (rule 6).
        let loc = route_locale("qui a créé Netflix", Some(&v));
        assert_eq!(loc, SearchLocale::english_us());
    }

    #[test]
    fn global_league_mention_routes_to_english_us() {
        let loc = route_locale("le dernier combat UFC", None);
        assert_eq!(loc, SearchLocale::english_us());
    }

    #[test]
    fn unrecognized_country_falls_back_to_french_language() {
        let v = verdict(Domain::Other, "japon");
        let loc = route_locale("une question quelconque", Some(&v));
        assert_eq!(loc.language, "fr");
        assert_eq!(loc.target_country, "japon");
    }

    #[test]
    fn default_is_french_france() {
        assert_eq!(route_locale("bonjour", None), SearchLocale::french());
    }

    #[test]
    fn global_domain_with_explicit_france_stays_french() {
        let v = verdict(Domain::Finance, "france");
        let loc = route_locale("le taux du livret A en France", Some(&v));
        assert_eq!(loc, SearchLocale::french());
    }
}
