//! Prompt templates for the explainer
//!
//! Only the most recent user message is embedded; earlier turns are not
//! replayed to the model.

use crate::conversation::Conversation;

/// Built-in instruction templates
pub mod builtin {
    /// Instructions preceding a JSON payload in JSON mode
    pub const JSON_EXPLAINER: &[&str] = &[
        "You are an API Response Explainer. Your job is to explain a JSON response in simple, beginner-friendly language.",
        "Rules: concise, clear, avoid jargon, call out assumptions, do not invent fields.",
        "Output format:",
        "- Summary",
        "- Fields (path, type, meaning, example)",
        "- Notes & pitfalls",
        "- Short example usage",
        "",
        "JSON to explain:",
    ];

    /// Instructions preceding a free-form question
    pub const ASSISTANT: &[&str] = &[
        "You are a helpful assistant focused on explaining APIs and JSON payloads in simple terms.",
        "Answer clearly and concisely. If unsure, say what extra info is needed.",
        "",
        "User message:",
    ];

    pub const JSON_OPEN: &str = "<json>";
    pub const JSON_CLOSE: &str = "</json>";
}

/// Build the model prompt for a conversation.
///
/// The user content is embedded verbatim.
pub fn build_prompt(conversation: &Conversation, json_mode: bool) -> String {
    let user_content = conversation.latest_user_content().unwrap_or("");

    let mut lines: Vec<&str> = Vec::new();
    if json_mode {
        lines.extend_from_slice(builtin::JSON_EXPLAINER);
        lines.push(builtin::JSON_OPEN);
        lines.push(user_content);
        lines.push(builtin::JSON_CLOSE);
    } else {
        lines.extend_from_slice(builtin::ASSISTANT);
        lines.push(user_content);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;

    fn between_markers(prompt: &str) -> &str {
        let start = prompt.find("<json>\n").unwrap() + "<json>\n".len();
        let end = prompt.rfind("\n</json>").unwrap();
        &prompt[start..end]
    }

    #[test]
    fn test_json_mode_embeds_content_verbatim() {
        let payload = "{\n  \"id\": 7,\n  \"tags\": [\"<b>\", \"\\u00e9\"]\n}  ";
        let conversation = Conversation::from(vec![Message::user(payload)]);

        let prompt = build_prompt(&conversation, true);
        assert!(prompt.starts_with("You are an API Response Explainer."));
        assert!(prompt.contains("- Notes & pitfalls\n"));
        assert_eq!(between_markers(&prompt), payload);
        assert!(prompt.ends_with("</json>"));
    }

    #[test]
    fn test_uses_latest_user_message_only() {
        let conversation = Conversation::from(vec![
            Message::user("{\"old\": true}"),
            Message::assistant("explained"),
            Message::user("{\"new\": true}"),
            Message::assistant(""),
        ]);

        let prompt = build_prompt(&conversation, true);
        assert_eq!(between_markers(&prompt), "{\"new\": true}");
        assert!(!prompt.contains("old"));
    }

    #[test]
    fn test_free_form_template() {
        let conversation = Conversation::from(vec![Message::user("What is a 204?")]);

        let prompt = build_prompt(&conversation, false);
        assert_eq!(
            prompt,
            "You are a helpful assistant focused on explaining APIs and JSON payloads in simple terms.\n\
             Answer clearly and concisely. If unsure, say what extra info is needed.\n\
             \n\
             User message:\n\
             What is a 204?"
        );
    }

    #[test]
    fn test_no_user_message_embeds_empty_content() {
        let conversation = Conversation::from(vec![Message::system("ignored")]);

        let prompt = build_prompt(&conversation, true);
        assert!(prompt.ends_with("<json>\n\n</json>"));

        let prompt = build_prompt(&Conversation::new(), false);
        assert!(prompt.ends_with("User message:\n"));
    }
}
