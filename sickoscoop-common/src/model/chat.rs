use crate::model::{
    Id, MissingWireField, first_present,
    user::{UserId, UserSummary},
};
use serde::{Deserialize, Serialize, de::IgnoredAny};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ConversationMarker;

pub type ConversationId = Id<ConversationMarker>;

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "WireConversation")]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<UserSummary>,
    pub last_message: Option<ChatMessage>,
    /// Text-only summary some listings send in place of a full last message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_preview: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub is_online: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "WireChatMessage")]
pub struct ChatMessage {
    pub sender_id: UserId,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireLastMessage {
    Message(ChatMessage),
    Preview(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireConversation {
    id: Option<ConversationId>,
    #[serde(rename = "_id")]
    object_id: Option<ConversationId>,
    #[serde(default)]
    participants: Vec<UserSummary>,
    last_message: Option<WireLastMessage>,
    last_message_preview: Option<String>,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    is_online: bool,
}

impl TryFrom<WireConversation> for Conversation {
    type Error = MissingWireField;

    fn try_from(wire: WireConversation) -> Result<Self, Self::Error> {
        let (last_message, preview) = match wire.last_message {
            Some(WireLastMessage::Message(message)) => (Some(message), None),
            Some(WireLastMessage::Preview(text)) => (None, Some(text)),
            Some(WireLastMessage::Other(_)) | None => (None, None),
        };

        Ok(Self {
            id: first_present("id", [wire.id, wire.object_id])?,
            participants: wire.participants,
            last_message,
            last_message_preview: preview.or(wire.last_message_preview),
            messages: wire.messages,
            is_online: wire.is_online,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChatMessage {
    sender_id: Option<UserId>,
    sender: Option<UserId>,
    content: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl TryFrom<WireChatMessage> for ChatMessage {
    type Error = MissingWireField;

    fn try_from(wire: WireChatMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            sender_id: first_present("senderId", [wire.sender_id, wire.sender])?,
            content: wire.content,
            created_at: wire.created_at,
        })
    }
}

impl Conversation {
    /// The explicit last message, or else the newest entry of the history.
    #[must_use]
    pub fn latest_message(&self) -> Option<&ChatMessage> {
        self.last_message.as_ref().or_else(|| self.messages.last())
    }

    /// Text to show in a conversation list.
    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        self.latest_message()
            .map(|message| message.content.as_str())
            .or(self.last_message_preview.as_deref())
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.last_message = Some(message.clone());
        self.last_message_preview = None;
        self.messages.push(message);
    }
}
