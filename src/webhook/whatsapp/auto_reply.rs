//! Keyword rules that pick the canned reply for an inbound text.

use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ReplyRule {
    #[display("greeting")]
    Greeting,
    #[display("pricing")]
    Pricing,
    #[display("hours")]
    Hours,
    #[display("help")]
    Help,
    #[display("fallback")]
    Fallback,
}

/// Rule selected for a message plus the text to send back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoReply {
    pub rule: ReplyRule,
    pub text: &'static str,
}

struct KeywordRule {
    rule: ReplyRule,
    keywords: &'static [&'static str],
    reply: &'static str,
}

/// Evaluated top to bottom, first match wins
const RULES: [KeywordRule; 4] = [
    KeywordRule {
        rule: ReplyRule::Greeting,
        keywords: &["hello", "hi", "hey", "hola"],
        reply: "Hello! Thanks for reaching out. How can we help you today?",
    },
    KeywordRule {
        rule: ReplyRule::Pricing,
        keywords: &["price", "prices", "pricing", "cost", "costs"],
        reply: "Our plans start at $10/month. Reply with the product you are interested in for a detailed quote.",
    },
    KeywordRule {
        rule: ReplyRule::Hours,
        keywords: &["hours", "open", "schedule"],
        reply: "We are available Monday to Friday, 9:00 to 18:00.",
    },
    KeywordRule {
        rule: ReplyRule::Help,
        keywords: &["help", "support"],
        reply: "Sure, tell us what you need and an agent will get back to you shortly.",
    },
];

const FALLBACK_REPLY: &str = "Thanks for your message! We received it and will get back to you soon.";

/// Picks a reply by case-insensitive keyword containment
pub fn select_reply(body: &str) -> AutoReply {
    let lowered = body.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|keyword| lowered.contains(*keyword)))
        .map(|rule| AutoReply {
            rule: rule.rule,
            text: rule.reply,
        })
        .unwrap_or(AutoReply {
            rule: ReplyRule::Fallback,
            text: FALLBACK_REPLY,
        })
}
