//! Prompt templates for digest generation

/// Session digest prompt. `{conversation}` is replaced by `role: text` lines.
pub const SESSION_DIGEST_PROMPT: &str = r#"Summarize the following conversation into key points:

{conversation}

Provide a concise summary with 3-5 bullet points:"#;

/// Lifetime profile prompt. `{summaries}` is replaced by session digests
/// separated by blank lines.
pub const LIFETIME_DIGEST_PROMPT: &str = r#"Create a lifetime user profile summary from these session summaries:

{summaries}

Provide a concise user profile with key characteristics and preferences:"#;

pub fn session_digest_prompt(conversation: &str) -> String {
    SESSION_DIGEST_PROMPT.replace("{conversation}", conversation)
}

pub fn lifetime_digest_prompt(summaries: &str) -> String {
    LIFETIME_DIGEST_PROMPT.replace("{summaries}", summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_prompt_embeds_conversation() {
        let prompt = session_digest_prompt("user: hi\nassistant: hello");
        assert!(prompt.starts_with("Summarize the following conversation into key points:\n\n"));
        assert!(prompt.contains("user: hi\nassistant: hello\n\n"));
        assert!(prompt.ends_with("3-5 bullet points:"));
    }

    #[test]
    fn test_lifetime_prompt_embeds_summaries() {
        let prompt = lifetime_digest_prompt("- a\n\n- b");
        assert!(prompt.contains("session summaries:\n\n- a\n\n- b\n\n"));
    }
}
