//! Prompt phrasing around a context window.
//!
//! The full prompt states the question first, then the context lines, then
//! the question again so the model stays anchored on it after a long
//! context block:
//!
//! ```text
//! Answer the message from user alice: where do we meet?
//! Context:
//! bob 0: pizza tonight?
//! alice 1: where do we meet?
//!
//!
//! Message from user alice: where do we meet?
//! ```

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the asking user's name.
pub const USERNAME_PLACEHOLDER: &str = "{username}";
/// Placeholder replaced with the question text.
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// The phrasings used to frame a question, with `{username}` and
/// `{question}` placeholders. Override them to localize the bot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PromptTemplates {
    /// Used alone when there is no retrieved history.
    pub minimal: String,
    /// First line of the full prompt.
    pub header: String,
    /// Line introducing the context block.
    pub context_label: String,
    /// Restatement after the context block.
    pub trailer: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            minimal: "Answer the message from {username}: {question}".into(),
            header: "Answer the message from user {username}: {question}".into(),
            context_label: "Context:".into(),
            trailer: "Message from user {username}: {question}".into(),
        }
    }
}

impl PromptTemplates {
    /// Prompt for a question without any history.
    pub fn render_minimal(&self, username: &str, question: &str) -> String {
        fill(&self.minimal, username, question)
    }

    /// Prompt framing `lines` with the question before and after.
    pub fn render_full(&self, username: &str, question: &str, lines: &[String]) -> String {
        let mut out = fill(&self.header, username, question);
        out.push('\n');
        out.push_str(&self.context_label);
        out.push('\n');
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("\n\n");
        out.push_str(&fill(&self.trailer, username, question));
        out
    }
}

/// Substitute placeholders in one pass so that user-supplied text is never
/// itself scanned for placeholders.
fn fill(template: &str, username: &str, question: &str) -> String {
    template
        .split(QUESTION_PLACEHOLDER)
        .map(|part| part.replace(USERNAME_PLACEHOLDER, username))
        .collect::<Vec<_>>()
        .join(question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_prompt() {
        let t = PromptTemplates::default();
        assert_eq!(
            t.render_minimal("alice", "what's up?"),
            "Answer the message from alice: what's up?"
        );
    }

    #[test]
    fn full_prompt_repeats_question_around_context() {
        let t = PromptTemplates::default();
        let lines = vec!["alice 0: hi".to_string(), "bob 2: yo".to_string()];
        let prompt = t.render_full("carol", "who said yo?", &lines);
        assert_eq!(
            prompt,
            "Answer the message from user carol: who said yo?\n\
             Context:\n\
             alice 0: hi\n\
             bob 2: yo\n\
             \n\n\
             Message from user carol: who said yo?"
        );
    }

    #[test]
    fn placeholders_in_user_text_are_not_expanded() {
        let t = PromptTemplates::default();
        let prompt = t.render_minimal("{question}", "say {username}");
        assert_eq!(prompt, "Answer the message from {question}: say {username}");
    }

    #[test]
    fn custom_templates() {
        let t = PromptTemplates {
            minimal: "Ответь на сообщение от {username}: {question}".into(),
            ..Default::default()
        };
        assert_eq!(
            t.render_minimal("ivan", "привет"),
            "Ответь на сообщение от ivan: привет"
        );
    }

    #[test]
    fn deserializes_partial_overrides() {
        let t: PromptTemplates = serde_json::from_str(r#"{"context_label": "History:"}"#).unwrap();
        assert_eq!(t.context_label, "History:");
        assert_eq!(t.trailer, PromptTemplates::default().trailer);
    }
}
