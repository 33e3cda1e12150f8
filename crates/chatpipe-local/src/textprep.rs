//! Minimal, deterministic text normalization helpers.
//!
//! Everything downstream (topic predicates, locale routing, scoring) matches
//! against the output of [`scrub`], so the policy here is intentionally lossy:
//! these strings are for matching only, never for display.

/// Lowercase + diacritics stripping.
///
/// Precomposed accented letters fold to their base letter; combining marks
/// (U+0300–U+036F) are dropped, so text that arrives in decomposed form
/// normalizes to the same output. Total: empty input yields empty output,
/// and the output is a fixpoint (`normalize(normalize(x)) == normalize(x)`).
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        // Lowercasing can itself produce combining marks (e.g. 'İ' → "i" +
        // U+0307), so the mark filter runs on the lowered output.
        for lc in ch.to_lowercase() {
            if ('\u{0300}'..='\u{036f}').contains(&lc) {
                continue;
            }
            match lc {
                'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => out.push('a'),
                'ç' => out.push('c'),
                'è' | 'é' | 'ê' | 'ë' => out.push('e'),
                'ì' | 'í' | 'î' | 'ï' => out.push('i'),
                'ñ' => out.push('n'),
                'ò' | 'ó' | 'ô' | 'õ' | 'ö' => out.push('o'),
                'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
                'ý' | 'ÿ' => out.push('y'),
                'œ' => out.push_str("oe"),
                'æ' => out.push_str("ae"),
                _ => out.push(lc),
            }
        }
    }
    out
}

/// Conservative "scrub" used for matching/search keys.
///
/// [`normalize`] plus a strict token separator policy: anything
/// non-alphanumeric becomes a single space. Apostrophes and hyphens split
/// tokens ("l'abonnement" → "l abonnement", "aujourd'hui" → "aujourd hui"),
/// which is what the keyword tables are written against.
pub fn scrub(s: &str) -> String {
    let s0 = normalize(s);
    let mut out = String::with_capacity(s0.len());
    let mut last_space = true;
    for ch in s0.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// French stopwords removed from keyword extraction. Tokens of length ≤ 2 are
/// dropped unconditionally, so two-letter function words are not listed.
pub const STOPWORDS_FR: &[&str] = &[
    "les", "des", "une", "dans", "pour", "avec", "sur", "est", "sont", "que", "qui", "quoi",
    "quel", "quelle", "quels", "quelles", "comment", "pourquoi", "quand", "combien", "mais",
    "donc", "alors", "cette", "ces", "ses", "son", "mon", "ton", "mes", "tes", "nos", "vos",
    "leur", "leurs", "par", "pas", "plus", "moins", "tres", "bien", "tout", "tous", "toute",
    "toutes", "fait", "faire", "peut", "peux", "veut", "veux", "etre", "avoir", "suis", "moi",
    "toi", "nous", "vous", "ils", "elle", "elles", "aux", "vers", "chez", "sans", "sous",
    "entre", "apres", "avant", "comme", "aussi", "cela", "ceci", "cet", "dis", "dit",
];

/// Extract matching keywords from a question: scrub, tokenize, drop stopwords
/// and tokens of length ≤ 2, dedup preserving first occurrence.
pub fn extract_keywords(s: &str) -> Vec<String> {
    let scrubbed = scrub(s);
    let mut out: Vec<String> = Vec::new();
    for tok in scrubbed.split_whitespace() {
        if tok.chars().count() <= 2 {
            continue;
        }
        if STOPWORDS_FR.contains(&tok) {
            continue;
        }
        if out.iter().any(|t| t == tok) {
            continue;
        }
        out.push(tok.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_strips_french_diacritics() {
        assert_eq!(normalize("Coûte"), "coute");
        assert_eq!(normalize("élément àçèô"), "element aceo");
        assert_eq!(normalize("œuvre"), "oeuvre");
    }

    #[test]
    fn normalize_drops_combining_marks() {
        // "e" + combining acute accent (decomposed form).
        assert_eq!(normalize("e\u{0301}le\u{0301}ment"), "element");
    }

    #[test]
    fn scrub_treats_punctuation_as_separators() {
        assert_eq!(
            scrub("Combien coûte l'abonnement Netflix ?"),
            "combien coute l abonnement netflix"
        );
        assert_eq!(scrub("aujourd'hui"), "aujourd hui");
        assert_eq!(scrub(""), "");
    }

    #[test]
    fn extract_keywords_drops_stopwords_and_short_tokens() {
        let kws = extract_keywords("Combien coûte l'abonnement Netflix par mois ?");
        assert_eq!(kws, vec!["coute", "abonnement", "netflix", "mois"]);
    }

    #[test]
    fn extract_keywords_dedups_preserving_first_occurrence() {
        let kws = extract_keywords("Netflix Netflix prix netflix");
        assert_eq!(kws, vec!["netflix", "prix"]);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in any::<String>()) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn scrub_is_idempotent_and_never_double_spaces(s in any::<String>()) {
            let once = scrub(&s);
            prop_assert_eq!(scrub(&once), once.clone());
            prop_assert!(!once.contains("  "), "double space in scrub={once:?}");
        }
    }
}
