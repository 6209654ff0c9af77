//! Keyword guardrail applied to each inbound message before any model run.

/// Fixed notice rendered when a message is blocked.
pub const RESPECT_NOTICE: &str = "⚠️ Please keep the conversation respectful. Let's try again!";

const NEGATIVE_KEYWORDS: [&str; 4] = ["bad", "stupid", "hate", "useless"];

/// Returns true when the text contains any negative keyword.
///
/// Plain substring containment over the lower-cased input, so "badge" trips
/// "bad". The over-broad match is inherited behavior, kept as-is.
pub fn is_blocked(text: &str) -> bool {
    let lowered = text.to_lowercase();
    NEGATIVE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}
