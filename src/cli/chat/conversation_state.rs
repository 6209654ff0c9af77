use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the transcript. Immutable once created; ordering is the turn
/// order fed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The transcript for one chat session.
///
/// Exactly one user message is appended per inbound turn. After a completed
/// run the whole transcript is replaced with the run's canonical history;
/// the replacement is authoritative, never a merge.
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn append_user(&mut self, text: &str) {
        self.messages.push(Message::user(text));
    }

    pub fn replace_with(&mut self, canonical_history: Vec<Message>) {
        self.messages = canonical_history;
    }

    pub fn current(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationState, Message, Role};

    #[test]
    fn starts_empty() {
        let conversation = ConversationState::new();
        assert!(conversation.current().is_empty());
    }

    #[test]
    fn append_user_preserves_turn_order() {
        let mut conversation = ConversationState::new();
        conversation.append_user("where is my order?");
        conversation.append_user("order 123 please");

        let messages = conversation.current();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "where is my order?");
        assert_eq!(messages[1].content, "order 123 please");
    }

    #[test]
    fn replace_with_is_wholesale() {
        let mut conversation = ConversationState::new();
        conversation.append_user("hello");

        let canonical = vec![
            Message::user("hello"),
            Message::assistant("Hi! How can I help?"),
        ];
        conversation.replace_with(canonical.clone());

        // The replacement is authoritative: no trace of the prior contents
        // beyond what the canonical history itself carries.
        assert_eq!(conversation.current(), canonical.as_slice());
    }

    #[test]
    fn clear_empties_the_transcript() {
        let mut conversation = ConversationState::new();
        conversation.append_user("hello");
        conversation.clear();
        assert!(conversation.current().is_empty());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let message = Message::assistant("hi");
        let encoded = serde_json::to_string(&message).unwrap();
        assert_eq!(encoded, r#"{"role":"assistant","content":"hi"}"#);
    }
}
