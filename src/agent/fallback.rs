//! Canned answers used when the completion service cannot be reached.

pub const GREETING_REPLY: &str = "Hello! (offline mode)";
pub const DATE_REPLY: &str = "I can't check the real date in offline mode, but today is today. \
     (If you add Anthropic credits, I can answer normally.)";
pub const GENERIC_REPLY: &str = "Offline mode: I couldn't reach Anthropic (or credits are exhausted). \
     Try a simple arithmetic query like `2+3`, or run with a funded API key.";

pub fn offline_response(query: &str) -> &'static str {
    let query = query.trim().to_lowercase();
    if matches!(query.as_str(), "hi" | "hello" | "hey") {
        return GREETING_REPLY;
    }
    if query.contains("what day") && query.contains("today") {
        return DATE_REPLY;
    }
    GENERIC_REPLY
}
