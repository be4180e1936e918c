use crate::{
    model::{Id, user::UserMarker},
    util::Timestamp,
};
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MessageMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Message {
    #[serde(rename = "idMessage")]
    pub id: Id<MessageMarker>,
    #[serde(rename = "senderID")]
    pub sender: Id<UserMarker>,
    #[serde(rename = "receiverID")]
    pub receiver: Id<UserMarker>,
    pub content: String,
    pub created_at: Timestamp,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateMessage {
    pub sender: Id<UserMarker>,
    pub receiver: Id<UserMarker>,
    pub content: String,
    pub created_at: Timestamp,
}

/// The latest message exchanged between two users, with both display names.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "senderID")]
    pub sender: Id<UserMarker>,
    pub sender_name: String,
    #[serde(rename = "receiverID")]
    pub receiver: Id<UserMarker>,
    pub receiver_name: String,
    pub last_message: String,
    #[serde(rename = "created_at")]
    pub created_at: Timestamp,
}
