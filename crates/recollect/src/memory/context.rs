//! Composite context assembly
//!
//! Sections appear in a fixed order and are separated by a blank line. Empty
//! sections are left out, except the current user message which is always
//! present.

use crate::memory::types::{ScoredEpisode, Turn};

#[derive(Debug, Default)]
pub struct ContextSections<'a> {
    pub primer: &'a str,
    pub lifetime_digest: Option<&'a str>,
    pub session_digest: Option<&'a str>,
    pub recent: &'a [Turn],
    pub message: &'a str,
    pub facts: &'a [ScoredEpisode],
}

impl ContextSections<'_> {
    pub fn assemble(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(6);

        if !self.primer.is_empty() {
            parts.push(self.primer.to_string());
        }

        if let Some(profile) = self.lifetime_digest.filter(|s| !s.is_empty()) {
            parts.push(format!("User Profile: {profile}"));
        }

        if let Some(context) = self.session_digest.filter(|s| !s.is_empty()) {
            parts.push(format!("Session Context: {context}"));
        }

        if !self.recent.is_empty() {
            let conversation = self
                .recent
                .iter()
                .map(Turn::render)
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("Recent conversation:\n{conversation}"));
        }

        parts.push(format!("User: {}", self.message));

        if !self.facts.is_empty() {
            let facts = self
                .facts
                .iter()
                .map(|s| format!("- {}", s.episode.fact))
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("Relevant facts:\n{facts}"));
        }

        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{Episode, Role};

    #[test]
    fn test_minimal_context() {
        let context = ContextSections {
            primer: "You are helpful.",
            message: "Hello",
            ..Default::default()
        };
        assert_eq!(context.assemble(), "You are helpful.\n\nUser: Hello");
    }

    #[test]
    fn test_full_context_order() {
        let recent = vec![
            Turn::new("u1", "s1", Role::User, "Hi"),
            Turn::new("u1", "s1", Role::Assistant, "Hello!"),
            Turn::new("u1", "s1", Role::User, "What food do I like?"),
        ];
        let facts = vec![ScoredEpisode {
            episode: Episode::new("u1", "s1", "I love spicy food".into(), 0.8, vec![]),
            similarity: 0.9,
        }];

        let context = ContextSections {
            primer: "Primer",
            lifetime_digest: Some("Enjoys cooking"),
            session_digest: Some("- greeted"),
            recent: &recent,
            message: "What food do I like?",
            facts: &facts,
        };

        assert_eq!(
            context.assemble(),
            "Primer\n\n\
             User Profile: Enjoys cooking\n\n\
             Session Context: - greeted\n\n\
             Recent conversation:\nuser: Hi\nassistant: Hello!\nuser: What food do I like?\n\n\
             User: What food do I like?\n\n\
             Relevant facts:\n- I love spicy food"
        );
    }

    #[test]
    fn test_empty_digests_are_omitted() {
        let context = ContextSections {
            primer: "",
            lifetime_digest: Some(""),
            session_digest: None,
            message: "x",
            ..Default::default()
        };
        assert_eq!(context.assemble(), "User: x");
    }
}
