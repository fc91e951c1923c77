use serde::Serialize;

use crate::{refine::refine_reply, tfidf::SearchResult};

/// Confidence reported when no usable results exist.
const NO_MATCH_CONFIDENCE: f64 = 0.1;

/// Above this similarity the best answer is returned directly.
const DIRECT_ANSWER_THRESHOLD: f64 = 0.6;

/// Above this similarity (and below the direct threshold) multiple
/// solutions are offered.
const OPTIONS_THRESHOLD: f64 = 0.3;

/// Above this similarity a single tentative answer is offered.
const TENTATIVE_THRESHOLD: f64 = 0.2;

/// Maximum number of enumerated solutions in the options tier.
const MAX_OPTIONS: usize = 3;

/// Coarse classification of an incoming query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Greeting,
    Technical,
    PasswordReset,
    GeneralSupport,
}

impl QueryCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Technical => "technical",
            Self::PasswordReset => "password_reset",
            Self::GeneralSupport => "general_support",
        }
    }
}

/// A synthesized reply with its confidence and category.
#[derive(Debug, Clone)]
pub struct SynthesizedReply {
    pub reply: String,
    pub confidence: f64,
    pub category: QueryCategory,
}

const GREETING_KEYWORDS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];
const THANKS_KEYWORDS: &[&str] = &["thank you", "thanks", "appreciate"];
const GOODBYE_KEYWORDS: &[&str] = &["bye", "goodbye", "see you", "farewell"];
const STATUS_KEYWORDS: &[&str] = &["how are you", "are you there", "are you ok"];

/// Intercept conversational utterances before any retrieval happens.
///
/// Case-insensitive substring match against four fixed keyword groups. On a
/// match the canned reply carries confidence 1.0 and the `greeting`
/// category regardless of corpus contents.
pub fn small_talk(query: &str) -> Option<SynthesizedReply> {
    let lower = query.to_lowercase();
    let contains_any = |group: &[&str]| group.iter().any(|kw| lower.contains(kw));

    let reply = if contains_any(GREETING_KEYWORDS) {
        "Hello! I'm your support assistant. How can I help you today?"
    } else if contains_any(THANKS_KEYWORDS) {
        "You're welcome! Is there anything else I can help you with?"
    } else if contains_any(GOODBYE_KEYWORDS) {
        "Goodbye! Feel free to reach out if you need anything else."
    } else if contains_any(STATUS_KEYWORDS) {
        "I'm here and ready to help. What can I do for you?"
    } else {
        return None;
    };

    Some(SynthesizedReply {
        reply: reply.to_string(),
        confidence: 1.0,
        category: QueryCategory::Greeting,
    })
}

/// Classify a query by substring rules, in priority order.
pub fn categorize(query: &str) -> QueryCategory {
    let lower = query.to_lowercase();

    if ["password", "reset", "login"].iter().any(|kw| lower.contains(kw)) {
        QueryCategory::PasswordReset
    } else if ["error", "bug", "not working"].iter().any(|kw| lower.contains(kw)) {
        QueryCategory::Technical
    } else if GREETING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        QueryCategory::Greeting
    } else {
        QueryCategory::GeneralSupport
    }
}

/// Assemble the final reply from ranked results under the confidence
/// policy.
///
/// Tiers, best result first: direct answer above 0.6; enumerated options in
/// (0.3, 0.6] when more than one result exists; a tentative answer with a
/// clarification request in (0.2, 0.3]; otherwise a hedged reply. An empty
/// result set produces the generic no-information reply at confidence 0.1.
pub fn synthesize(query: &str, results: &[SearchResult]) -> SynthesizedReply {
    let category = categorize(query);

    let Some(best) = results.first() else {
        return SynthesizedReply {
            reply: "I couldn't find information about that in my knowledge base. \
                    Could you rephrase your question or add more detail?"
                .to_string(),
            confidence: NO_MATCH_CONFIDENCE,
            category,
        };
    };

    let reply = if best.similarity > DIRECT_ANSWER_THRESHOLD {
        refine_reply(&best.text)
    } else if best.similarity > OPTIONS_THRESHOLD && results.len() > 1 {
        let mut out = String::from("I found a few things that might help:\n");
        for (i, result) in results.iter().take(MAX_OPTIONS).enumerate() {
            out.push_str(&format!("\nSolution {}: {}\n", i + 1, refine_reply(&result.text)));
        }
        out.push_str("\nLet me know which of these fits your situation best.");
        out
    } else if best.similarity > TENTATIVE_THRESHOLD {
        format!(
            "{}\n\nIf that doesn't answer your question, could you give me a bit more detail?",
            refine_reply(&best.text)
        )
    } else {
        format!(
            "This may not be directly applicable, but here's the closest \
             information I have:\n\n{}",
            refine_reply(&best.text)
        )
    };

    SynthesizedReply {
        reply,
        confidence: best.similarity,
        category,
    }
}
