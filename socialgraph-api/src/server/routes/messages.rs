use crate::server::{Result, ServerError, ServerRouter, json::Json, params, query::Query};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialgraph_common::{
    model::{
        Id,
        message::{Conversation, CreateMessage, Message, MessageMarker},
    },
    util::{Timestamp, lenient_string},
};
use socialgraph_db::store::Store;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_messages)
        .typed_post(send_message)
        .typed_get(get_conversations)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/messages", rejection(ServerError))]
struct MessagesPath();

#[derive(Deserialize)]
struct ThreadQuery {
    #[serde(default, rename = "senderID")]
    sender: String,
    #[serde(default, rename = "receiverID")]
    receiver: String,
}

async fn get_messages(
    MessagesPath(): MessagesPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<Vec<Message>>> {
    let sender = params::require_id("senderID", &query.sender)?;
    let receiver = params::require_id("receiverID", &query.receiver)?;

    let messages = store.list_messages(sender, receiver).await?;

    Ok(Json(messages))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/sendMessage", rejection(ServerError))]
struct SendMessagePath();

#[derive(Deserialize)]
struct SendMessageBody {
    #[serde(default, rename = "senderID", deserialize_with = "lenient_string")]
    sender: String,
    #[serde(default, rename = "receiverID", deserialize_with = "lenient_string")]
    receiver: String,
    #[serde(default, deserialize_with = "lenient_string")]
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageSent {
    message: &'static str,
    message_id: Id<MessageMarker>,
}

async fn send_message(
    SendMessagePath(): SendMessagePath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<MessageSent>> {
    let message = CreateMessage {
        sender: params::require_id("senderID", &body.sender)?,
        receiver: params::require_id("receiverID", &body.receiver)?,
        content: params::require("content", &body.content)?.to_owned(),
        created_at: Timestamp::now(),
    };

    let message_id = store.create_message(&message).await?;

    Ok(Json(MessageSent {
        message: "Message sent successfully",
        message_id,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/conversations", rejection(ServerError))]
struct ConversationsPath();

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default, rename = "userID")]
    user_id: String,
}

async fn get_conversations(
    ConversationsPath(): ConversationsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Conversation>>> {
    let user_id = params::require_id("userID", &query.user_id)?;
    let conversations = store.list_conversations(user_id).await?;

    Ok(Json(conversations))
}
