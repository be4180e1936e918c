use crate::server::{
    Result, ServerError, ServerRouter, Toggled, json::Json, params, query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialgraph_common::{
    model::{post::Post, toggle::ToggleOutcome},
    util::lenient_string,
};
use socialgraph_db::store::Store;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(save_post)
        .typed_get(check_saved)
        .typed_get(get_saved_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/savePost", rejection(ServerError))]
struct SavePostPath();

#[derive(Deserialize)]
struct SavePostBody {
    #[serde(default, rename = "postID", deserialize_with = "lenient_string")]
    post_id: String,
    #[serde(default, rename = "userID", deserialize_with = "lenient_string")]
    user_id: String,
}

async fn save_post(
    SavePostPath(): SavePostPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<SavePostBody>,
) -> Result<Json<Toggled>> {
    let post_id = params::require_id("postID", &body.post_id)?;
    let user_id = params::require_id("userID", &body.user_id)?;

    let outcome = store.toggle_saved_post(post_id, user_id).await?;
    let message = match outcome {
        ToggleOutcome::Removed => "Post removed from saved posts",
        ToggleOutcome::Added | ToggleOutcome::Changed => "Post added to saved posts",
    };

    Ok(Json(Toggled { message, outcome }))
}

#[derive(Deserialize)]
struct PostUserQuery {
    #[serde(default, rename = "postID")]
    post_id: String,
    #[serde(default, rename = "userID")]
    user_id: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/checkPostSaved", rejection(ServerError))]
struct CheckSavedPath();

#[derive(Serialize)]
struct SavedStatus {
    saved: bool,
}

async fn check_saved(
    CheckSavedPath(): CheckSavedPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<PostUserQuery>,
) -> Result<Json<SavedStatus>> {
    let post_id = params::require_id("postID", &query.post_id)?;
    let user_id = params::require_id("userID", &query.user_id)?;

    let saved = store.is_post_saved(post_id, user_id).await?;

    Ok(Json(SavedStatus { saved }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/savedPosts", rejection(ServerError))]
struct SavedPostsPath();

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default, rename = "userID")]
    user_id: String,
}

async fn get_saved_posts(
    SavedPostsPath(): SavedPostsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Post>>> {
    let user_id = params::require_id("userID", &query.user_id)?;
    let posts = store.list_saved_posts(user_id).await?;

    Ok(Json(posts))
}
