use crate::server::{Result, ServerError, ServerRouter, json::Json, params, query::Query};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialgraph_common::{
    model::{
        Id,
        comment::{Comment, CommentMarker, CreateComment},
    },
    util::{Timestamp, lenient_string},
};
use socialgraph_db::store::Store;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_comments)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments", rejection(ServerError))]
struct CommentsPath();

#[derive(Deserialize)]
struct CommentsQuery {
    #[serde(default, rename = "idPost")]
    post_id: String,
}

async fn get_comments(
    CommentsPath(): CommentsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<Vec<Comment>>> {
    let post_id = params::require_id("idPost", &query.post_id)?;
    let comments = store.list_comments(post_id).await?;

    Ok(Json(comments))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/addComment", rejection(ServerError))]
struct AddCommentPath();

#[derive(Deserialize)]
struct AddCommentBody {
    #[serde(default, rename = "postID", deserialize_with = "lenient_string")]
    post_id: String,
    #[serde(default, rename = "userID", deserialize_with = "lenient_string")]
    user_id: String,
    #[serde(default, rename = "contentText", deserialize_with = "lenient_string")]
    content_text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentCreated {
    message: &'static str,
    comment_id: Id<CommentMarker>,
}

async fn add_comment(
    AddCommentPath(): AddCommentPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<AddCommentBody>,
) -> Result<Json<CommentCreated>> {
    let comment = CreateComment {
        post: params::require_id("postID", &body.post_id)?,
        author: params::require_id("userID", &body.user_id)?,
        content_text: params::require("contentText", &body.content_text)?.to_owned(),
        created_at: Timestamp::now(),
    };

    let comment_id = store.create_comment(&comment).await?;

    Ok(Json(CommentCreated {
        message: "Comment added successfully",
        comment_id,
    }))
}
