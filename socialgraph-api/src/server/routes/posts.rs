use crate::server::{
    Confirmation, Result, ServerError, ServerRouter, json::Json, params, query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialgraph_common::{
    model::{
        Id,
        post::{CreatePost, EditPost, Post, PostMarker, PostQuery},
    },
    util::{Timestamp, lenient_string},
};
use socialgraph_db::store::Store;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_posts)
        .typed_get(get_category_posts)
        .typed_get(get_post)
        .typed_get(get_user_posts)
        .typed_post(add_post)
        .typed_put(edit_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default)]
    offset: String,
}

async fn get_posts(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Post>>> {
    let query = PostQuery {
        category: None,
        offset: params::offset(&query.offset)?,
    };
    let posts = store.list_posts(&query).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/category", rejection(ServerError))]
struct CategoryPostsPath();

#[derive(Deserialize)]
struct CategoryPageQuery {
    #[serde(default)]
    category: String,
    #[serde(default)]
    offset: String,
}

async fn get_category_posts(
    CategoryPostsPath(): CategoryPostsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<CategoryPageQuery>,
) -> Result<Json<Vec<Post>>> {
    let category = params::require("category", &query.category)?;
    let post_query = PostQuery {
        category: Some(category.to_owned()),
        offset: params::offset(&query.offset)?,
    };

    let posts = store.list_posts(&post_query).await?;
    if posts.is_empty() {
        return Err(ServerError::NoPostsInCategory(query.category));
    }

    Ok(Json(posts))
}

#[derive(Deserialize)]
struct IdQuery {
    #[serde(default)]
    id: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/post", rejection(ServerError))]
struct PostPath();

async fn get_post(
    PostPath(): PostPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Post>> {
    let id = params::require_id("id", &query.id)?;
    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/user", rejection(ServerError))]
struct UserPostsPath();

async fn get_user_posts(
    UserPostsPath(): UserPostsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Vec<Post>>> {
    let user_id = params::require_id("id", &query.id)?;
    let posts = store.list_user_posts(user_id).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/addPost", rejection(ServerError))]
struct AddPostPath();

#[derive(Deserialize)]
struct AddPostBody {
    #[serde(default, deserialize_with = "lenient_string")]
    content_text: String,
    #[serde(default, rename = "imageURL", deserialize_with = "lenient_string")]
    image_url: String,
    #[serde(default, rename = "userID", deserialize_with = "lenient_string")]
    user_id: String,
    #[serde(default, rename = "categoryID", deserialize_with = "lenient_string")]
    category_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostCreated {
    message: &'static str,
    post_id: Id<PostMarker>,
}

async fn add_post(
    AddPostPath(): AddPostPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<AddPostBody>,
) -> Result<Json<PostCreated>> {
    params::require("content_text", &body.content_text)?;
    let post = CreatePost {
        author: params::require_id("userID", &body.user_id)?,
        category: params::optional_id("categoryID", &body.category_id)?,
        content_text: body.content_text,
        image_url: params::optional_text(body.image_url),
        created_at: Timestamp::now(),
    };

    let post_id = store.create_post(&post).await?;

    Ok(Json(PostCreated {
        message: "Post added successfully",
        post_id,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/editPost", rejection(ServerError))]
struct EditPostPath();

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditPostBody {
    #[serde(default, rename = "postID", deserialize_with = "lenient_string")]
    post_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    content_text: String,
    #[serde(default, rename = "imageURL", deserialize_with = "lenient_string")]
    image_url: String,
    #[serde(default, rename = "categoryID", deserialize_with = "lenient_string")]
    category_id: String,
}

async fn edit_post(
    EditPostPath(): EditPostPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<EditPostBody>,
) -> Result<Json<Confirmation>> {
    let post_id = params::require_id("postID", &body.post_id)?;
    params::require("contentText", &body.content_text)?;
    let edit = EditPost {
        category: params::optional_id("categoryID", &body.category_id)?,
        content_text: body.content_text,
        image_url: params::optional_text(body.image_url),
    };

    if !store.edit_post(post_id, &edit).await? {
        return Err(ServerError::PostByIdNotFound(post_id));
    }

    Ok(Json(Confirmation {
        message: "Post updated successfully",
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/deletePost", rejection(ServerError))]
struct DeletePostPath();

#[derive(Deserialize)]
struct DeletePostBody {
    #[serde(default, rename = "postID", deserialize_with = "lenient_string")]
    post_id: String,
}

async fn delete_post(
    DeletePostPath(): DeletePostPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<DeletePostBody>,
) -> Result<Json<Confirmation>> {
    let post_id = params::require_id("postID", &body.post_id)?;

    if !store.delete_post(post_id).await? {
        return Err(ServerError::PostByIdNotFound(post_id));
    }

    Ok(Json(Confirmation {
        message: "Post deleted successfully",
    }))
}
