use crate::server::{
    Result, SelfActionPolicy, ServerError, ServerRouter, Toggled, json::Json, params,
    query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socialgraph_common::model::{
    Id,
    post::PostMarker,
    reaction::{Polarity, Reaction, ReactionCounts},
    toggle::ToggleOutcome,
    user::UserMarker,
};
use socialgraph_db::store::Store;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(like)
        .typed_get(dislike)
        .typed_get(get_counts)
        .typed_get(get_user_reaction)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/like", rejection(ServerError))]
struct LikePath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/dislike", rejection(ServerError))]
struct DislikePath();

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReactQuery {
    #[serde(default)]
    post_id: String,
    #[serde(default)]
    user_id: String,
}

async fn like(
    LikePath(): LikePath,
    State(store): State<Arc<dyn Store>>,
    State(policy): State<SelfActionPolicy>,
    Query(query): Query<ReactQuery>,
) -> Result<Json<Toggled>> {
    react(&*store, policy, &query, Polarity::Like).await
}

async fn dislike(
    DislikePath(): DislikePath,
    State(store): State<Arc<dyn Store>>,
    State(policy): State<SelfActionPolicy>,
    Query(query): Query<ReactQuery>,
) -> Result<Json<Toggled>> {
    react(&*store, policy, &query, Polarity::Dislike).await
}

async fn react(
    store: &dyn Store,
    policy: SelfActionPolicy,
    query: &ReactQuery,
    polarity: Polarity,
) -> Result<Json<Toggled>> {
    let post_id: Id<PostMarker> = params::require_id("postId", &query.post_id)?;
    let user_id: Id<UserMarker> = params::require_id("userId", &query.user_id)?;

    let post = store
        .fetch_post(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;
    if store.fetch_user(user_id).await?.is_none() {
        return Err(ServerError::UserByIdNotFound(user_id));
    }
    if !policy.allow_self_reaction && post.author == user_id {
        return Err(ServerError::SelfActionForbidden(
            "Users may not react to their own posts",
        ));
    }

    let outcome = store.toggle_reaction(post_id, user_id, polarity).await?;
    debug!(%post_id, %user_id, ?polarity, ?outcome, "Toggled reaction");

    let message = match (polarity, outcome) {
        (Polarity::Like, ToggleOutcome::Added) => "Like added",
        (Polarity::Like, ToggleOutcome::Removed) => "Like removed",
        (Polarity::Like, ToggleOutcome::Changed) => "Changed from dislike to like",
        (Polarity::Dislike, ToggleOutcome::Added) => "Dislike added",
        (Polarity::Dislike, ToggleOutcome::Removed) => "Dislike removed",
        (Polarity::Dislike, ToggleOutcome::Changed) => "Changed from like to dislike",
    };

    Ok(Json(Toggled { message, outcome }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/likesDislikes", rejection(ServerError))]
struct CountsPath();

#[derive(Deserialize)]
struct CountsQuery {
    #[serde(default, rename = "idPost")]
    post_id: String,
}

async fn get_counts(
    CountsPath(): CountsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<CountsQuery>,
) -> Result<Json<ReactionCounts>> {
    let post_id = params::require_id("idPost", &query.post_id)?;
    let counts = store.count_reactions(post_id).await?;

    Ok(Json(counts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/userLikeDislike", rejection(ServerError))]
struct UserReactionPath();

#[derive(Deserialize)]
struct UserReactionQuery {
    #[serde(default, rename = "idPost")]
    post_id: String,
    #[serde(default, rename = "userID")]
    user_id: String,
}

async fn get_user_reaction(
    UserReactionPath(): UserReactionPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<UserReactionQuery>,
) -> Result<Json<Reaction>> {
    let post = params::require_id("idPost", &query.post_id)?;
    let user = params::require_id("userID", &query.user_id)?;

    let reaction = store
        .fetch_reaction(post, user)
        .await?
        .ok_or(ServerError::ReactionNotFound { post, user })?;

    Ok(Json(reaction))
}
