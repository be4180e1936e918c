use crate::server::{
    Confirmation, Result, ServerError, ServerRouter, json::Json, params, query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socialgraph_common::{
    model::{
        auth::Password,
        user::{CreateUser, User, UserProfile},
    },
    util::lenient_string,
};
use socialgraph_db::store::Store;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_users)
        .typed_get(get_user)
        .typed_post(register)
        .typed_post(login)
        .typed_put(edit_user)
        .typed_post(update_password)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

async fn get_users(
    UsersPath(): UsersPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<User>>> {
    let users = store.list_users().await?;

    Ok(Json(users))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user", rejection(ServerError))]
struct UserPath();

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default)]
    id: String,
}

async fn get_user(
    UserPath(): UserPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<User>> {
    let id = params::require_id("id", &query.id)?;
    let user = store
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

/// Profile fields shared by registration and profile edits.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    #[serde(default, deserialize_with = "lenient_string")]
    username: String,
    #[serde(default, deserialize_with = "lenient_string")]
    display_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    email: String,
}

impl ProfileBody {
    fn into_profile(self) -> Result<UserProfile> {
        params::require("username", &self.username)?;
        params::require("displayName", &self.display_name)?;
        params::require("email", &self.email)?;

        Ok(UserProfile {
            username: self.username,
            display_name: self.display_name,
            email: self.email,
        })
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/register", rejection(ServerError))]
struct RegisterPath();

#[derive(Deserialize)]
struct RegisterBody {
    #[serde(flatten)]
    profile: ProfileBody,
    #[serde(default)]
    password: Password,
}

async fn register(
    RegisterPath(): RegisterPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<Confirmation>> {
    let profile = body.profile.into_profile()?;
    if body.password.is_empty() {
        return Err(ServerError::MissingField("password"));
    }

    let user = CreateUser {
        profile,
        password_hash: body.password.hash()?,
    };
    let user_id = store.create_user(&user).await?;
    debug!(%user_id, username = %user.profile.username, "Registered user");

    Ok(Json(Confirmation {
        message: "User registered successfully",
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login", rejection(ServerError))]
struct LoginPath();

#[derive(Deserialize)]
struct LoginBody {
    /// Username or email.
    #[serde(default, deserialize_with = "lenient_string")]
    username: String,
    #[serde(default)]
    password: Password,
}

async fn login(
    LoginPath(): LoginPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<User>> {
    params::require("username", &body.username)?;
    if body.password.is_empty() {
        return Err(ServerError::MissingField("password"));
    }

    let credentials = store
        .fetch_credentials(&body.username)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;
    if !credentials.password_hash.verify(&body.password) {
        return Err(ServerError::InvalidCredentials);
    }

    Ok(Json(credentials.user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/userEdit", rejection(ServerError))]
struct UserEditPath();

#[derive(Deserialize)]
struct UserEditBody {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(flatten)]
    profile: ProfileBody,
}

async fn edit_user(
    UserEditPath(): UserEditPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<UserEditBody>,
) -> Result<Json<User>> {
    let user_id = params::require_id("id", &body.id)?;
    let profile = body.profile.into_profile()?;

    let user = store
        .update_user(user_id, &profile)
        .await?
        .ok_or(ServerError::UserByIdNotFound(user_id))?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/updatePassword", rejection(ServerError))]
struct UpdatePasswordPath();

#[derive(Deserialize)]
struct UpdatePasswordBody {
    #[serde(default, rename = "userID", deserialize_with = "lenient_string")]
    user_id: String,
    #[serde(default)]
    password: Password,
}

async fn update_password(
    UpdatePasswordPath(): UpdatePasswordPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<UpdatePasswordBody>,
) -> Result<Json<Confirmation>> {
    let user_id = params::require_id("userID", &body.user_id)?;
    if body.password.is_empty() {
        return Err(ServerError::MissingField("password"));
    }

    let password_hash = body.password.hash()?;
    if !store.update_password(user_id, &password_hash).await? {
        return Err(ServerError::UserByIdNotFound(user_id));
    }

    Ok(Json(Confirmation {
        message: "Password updated successfully",
    }))
}
