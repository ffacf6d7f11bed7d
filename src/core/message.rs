use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::id::unique_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Role string expected by the chat-completions wire format.
    pub fn to_api_role(self) -> &'static str {
        self.as_str()
    }

    pub fn is_user(self) -> bool {
        self == ChatRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == ChatRole::Assistant
    }
}

impl AsRef<str> for ChatRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for ChatRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            _ => Err(format!("invalid chat role: {value}")),
        }
    }
}

impl TryFrom<String> for ChatRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<ChatRole> for String {
    fn from(value: ChatRole) -> Self {
        value.as_str().to_string()
    }
}

/// One turn of a conversation. Messages are immutable once created; the
/// session appends new ones rather than editing history in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: unique_id("msg"),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_roles() {
        assert!(Message::user("hello").is_user());
        assert!(Message::assistant("hi").is_assistant());
    }

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(ChatRole::try_from("system").is_err());
        assert!(ChatRole::try_from("app/info").is_err());
    }

    #[test]
    fn messages_serialize_roles_as_strings() {
        let message = Message::user("kiln temperature is drifting");
        let json = serde_json::to_value(&message).expect("serialize");
        assert_eq!(json["role"], "user");

        let back: Message = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, message);
    }
}
