//! Advisory model-assisted classification.
//!
//! Two independent calls over the [`ChatCompletion`] capability: a
//! domain/volatility classifier and an entity/intent router. Both are
//! best-effort refinements of the deterministic keyword path: any transport
//! failure, non-2xx, or unusable JSON degrades to
//! [`ClassificationUnavailable`], never an error. The decision layer treats
//! the keyword verdict as the safety net; the model may only ADD
//! search-worthiness, never subtract it.

use chatpipe_core::{
    ChatCompletion, ChatMessage, ClassificationUnavailable, ClassificationVerdict,
    CompletionOptions, Domain, Entity, EntityIntent, EntityType, LikelyDomain, Volatility,
};
use serde::Deserialize;
use tracing::debug;

const DOMAIN_CLASSIFIER_SYSTEM: &str = "\
Tu classifies des questions d'utilisateurs pour un assistant francophone.
Réponds UNIQUEMENT avec un objet JSON strict, sans texte autour, de la forme :
{\"domain\": \"...\", \"needs_web\": true|false, \"volatility\": \"high\"|\"medium\"|\"low\", \"country\": \"france\"|\"...\"}
domain est l'un de : tech_product, finance, sports, politics, culture, current_affairs, real_estate, entertainment, health, other.
needs_web est vrai si la réponse correcte peut changer avec le temps (prix, résultats, élus, lois, actualité).
country est \"france\" sauf si la question vise explicitement un autre pays.";

const ENTITY_ROUTER_SYSTEM: &str = "\
Tu extrais les entités d'une question, sans aucune catégorie imposée a priori.
Réponds UNIQUEMENT avec un objet JSON strict, sans texte autour, de la forme :
{\"entities\": [{\"text\": \"...\", \"type\": \"person\"|\"organization\"|\"location\"|\"other\"}], \"is_vs_pattern\": true|false, \"likely_domain\": \"sport\"|\"politics\"|\"business\"|\"entertainment\"|\"other\"}
is_vs_pattern est vrai si la question oppose deux entités (\"X vs Y\", \"X contre Y\").";

/// Pull the first balanced `{...}` object out of a completion, tolerating
/// models that wrap JSON in prose or code fences.
fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in s[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    domain: String,
    needs_web: bool,
    volatility: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    text: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    is_vs_pattern: bool,
    #[serde(default)]
    likely_domain: String,
}

async fn ask_structured(
    llm: &dyn ChatCompletion,
    system: &str,
    question: &str,
    timeout_ms: u64,
) -> Result<String, ClassificationUnavailable> {
    let messages = [ChatMessage::system(system), ChatMessage::user(question)];
    let opts = CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(300),
        timeout_ms,
        stream: false,
    };
    llm.complete(&messages, &opts)
        .await
        .map_err(|e| ClassificationUnavailable::new(e.to_string()))
}

/// Domain/volatility classification. Unusable output (unknown domain label,
/// malformed JSON, transport error) is reported as unavailable so callers
/// fall back to the keyword verdict alone.
pub async fn classify_domain(
    llm: &dyn ChatCompletion,
    question: &str,
    timeout_ms: u64,
) -> Result<ClassificationVerdict, ClassificationUnavailable> {
    let raw = ask_structured(llm, DOMAIN_CLASSIFIER_SYSTEM, question, timeout_ms).await?;
    let obj = extract_json_object(&raw)
        .ok_or_else(|| ClassificationUnavailable::new("no JSON object in response"))?;
    let parsed: RawVerdict = serde_json::from_str(obj)
        .map_err(|e| ClassificationUnavailable::new(format!("bad verdict JSON: {e}")))?;

    let domain = Domain::from_label(&parsed.domain)
        .ok_or_else(|| ClassificationUnavailable::new(format!("unknown domain {:?}", parsed.domain)))?;
    let volatility = Volatility::from_label(&parsed.volatility).ok_or_else(|| {
        ClassificationUnavailable::new(format!("unknown volatility {:?}", parsed.volatility))
    })?;
    let country = {
        let c = parsed.country.trim().to_ascii_lowercase();
        if c.is_empty() {
            "france".to_string()
        } else {
            c
        }
    };

    let verdict = ClassificationVerdict {
        domain,
        needs_web: parsed.needs_web,
        volatility,
        country,
    };
    debug!(
        domain = verdict.domain.as_str(),
        needs_web = verdict.needs_web,
        country = %verdict.country,
        "model classifier verdict"
    );
    Ok(verdict)
}

/// Entity/intent routing ("X vs Y" duel detection + likely domain).
pub async fn route_entities(
    llm: &dyn ChatCompletion,
    question: &str,
    timeout_ms: u64,
) -> Result<EntityIntent, ClassificationUnavailable> {
    let raw = ask_structured(llm, ENTITY_ROUTER_SYSTEM, question, timeout_ms).await?;
    let obj = extract_json_object(&raw)
        .ok_or_else(|| ClassificationUnavailable::new("no JSON object in response"))?;
    let parsed: RawIntent = serde_json::from_str(obj)
        .map_err(|e| ClassificationUnavailable::new(format!("bad intent JSON: {e}")))?;

    let entities = parsed
        .entities
        .into_iter()
        .filter(|e| !e.text.trim().is_empty())
        .map(|e| Entity {
            text: e.text.trim().to_string(),
            kind: match e.kind.trim().to_ascii_lowercase().as_str() {
                "person" | "personne" => EntityType::Person,
                "organization" | "organisation" => EntityType::Organization,
                "location" | "lieu" => EntityType::Location,
                _ => EntityType::Other,
            },
        })
        .collect();
    let likely_domain = match parsed.likely_domain.trim().to_ascii_lowercase().as_str() {
        "sport" | "sports" => LikelyDomain::Sport,
        "politics" | "politique" => LikelyDomain::Politics,
        "business" => LikelyDomain::Business,
        "entertainment" | "divertissement" => LikelyDomain::Entertainment,
        _ => LikelyDomain::Other,
    };

    Ok(EntityIntent {
        entities,
        is_vs_pattern: parsed.is_vs_pattern,
        likely_domain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpipe_core::{Error, Result};
    use std::sync::Mutex;

    /// Canned completion backend: pops responses front-to-back.
    struct FakeLlm {
        responses: Mutex<Vec<Result<String>>>,
    }

    impl FakeLlm {
        fn with(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatCompletion for FakeLlm {
        async fn complete(&self, _m: &[ChatMessage], _o: &CompletionOptions) -> Result<String> {
            let mut rs = self.responses.lock().unwrap();
            if rs.is_empty() {
                return Err(Error::Llm("fake exhausted".to_string()));
            }
            rs.remove(0)
        }
    }

    #[test]
    fn extract_json_object_tolerates_surrounding_prose() {
        let s = "Voici la réponse :\n```json\n{\"a\": {\"b\": 1}}\n```\nVoilà.";
        assert_eq!(extract_json_object(s), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("pas de json ici"), None);
        assert_eq!(extract_json_object("{\"unbalanced\": true"), None);
    }

    #[test]
    fn extract_json_object_ignores_braces_inside_strings() {
        let s = r#"{"text": "accolade } piégée", "ok": true}"#;
        assert_eq!(extract_json_object(s), Some(s));
    }

    #[tokio::test]
    async fn classify_domain_parses_a_strict_verdict() {
        let llm = FakeLlm::with(vec![Ok(r#"{"domain":"sports","needs_web":true,"volatility":"high","country":"france"}"#.to_string())]);
        let v = classify_domain(&llm, "le score du PSG", 1_000).await.unwrap();
        assert_eq!(v.domain, Domain::Sports);
        assert!(v.needs_web);
        assert_eq!(v.volatility, Volatility::High);
        assert_eq!(v.country, "france");
    }

    #[tokio::test]
    async fn classify_domain_is_unavailable_on_garbage_output() {
        let llm = FakeLlm::with(vec![Ok("désolé, je ne peux pas".to_string())]);
        let err = classify_domain(&llm, "q", 1_000).await.unwrap_err();
        assert!(err.reason.contains("no JSON object"), "reason={}", err.reason);
    }

    #[tokio::test]
    async fn classify_domain_is_unavailable_on_unknown_domain_label() {
        let llm = FakeLlm::with(vec![Ok(r#"{"domain":"astrologie","needs_web":false,"volatility":"low","country":"france"}"#.to_string())]);
        assert!(classify_domain(&llm, "q", 1_000).await.is_err());
    }

    #[tokio::test]
    async fn classify_domain_is_unavailable_on_transport_failure() {
        let llm = FakeLlm::with(vec![Err(Error::Llm("HTTP 500".to_string()))]);
        let err = classify_domain(&llm, "q", 1_000).await.unwrap_err();
        assert!(err.reason.contains("500"), "reason={}", err.reason);
    }

    #[tokio::test]
    async fn route_entities_parses_a_duel_pattern() {
        let llm = FakeLlm::with(vec![Ok(r#"{"entities":[{"text":"Dupont","type":"person"},{"text":"Ngannou","type":"person"}],"is_vs_pattern":true,"likely_domain":"sport"}"#.to_string())]);
        let intent = route_entities(&llm, "Dupont vs Ngannou", 1_000).await.unwrap();
        assert!(intent.is_vs_pattern);
        assert_eq!(intent.likely_domain, LikelyDomain::Sport);
        assert_eq!(intent.entities.len(), 2);
        assert_eq!(intent.entities[0].kind, EntityType::Person);
    }

    #[tokio::test]
    async fn route_entities_defaults_missing_fields() {
        let llm = FakeLlm::with(vec![Ok(r#"{"entities":[]}"#.to_string())]);
        let intent = route_entities(&llm, "q", 1_000).await.unwrap();
        assert!(!intent.is_vs_pattern);
        assert_eq!(intent.likely_domain, LikelyDomain::Other);
    }
}
