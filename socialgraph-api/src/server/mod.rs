use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use serde::Serialize;
use socialgraph_common::model::{
    Id, InvalidIdError,
    auth::PasswordHashError,
    category::CategoryMarker,
    post::PostMarker,
    toggle::ToggleOutcome,
    user::UserMarker,
};
use socialgraph_db::store::{DbError, Store};
use std::{num::ParseIntError, sync::Arc};
use thiserror::Error;
use tracing::error;

mod json;
mod params;
mod query;
mod routes;
#[cfg(test)]
mod tests;

pub type ServerRouter = Router<ServerState>;

/// Whether users may act on themselves. Both default to allowed.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SelfActionPolicy {
    pub allow_self_subscription: bool,
    pub allow_self_reaction: bool,
}

impl Default for SelfActionPolicy {
    fn default() -> Self {
        Self {
            allow_self_subscription: true,
            allow_self_reaction: true,
        }
    }
}

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
    pub policy: SelfActionPolicy,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Invalid {field} format")]
    InvalidId {
        field: &'static str,
        source: InvalidIdError,
    },
    #[error("Invalid offset parameter")]
    InvalidOffset(#[source] ParseIntError),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("{0}")]
    SelfActionForbidden(&'static str),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Category with id {0} was not found.")]
    CategoryByIdNotFound(Id<CategoryMarker>),
    #[error("No posts found for the category {0:?}.")]
    NoPostsInCategory(String),
    #[error("User {user} has not liked/disliked post {post}.")]
    ReactionNotFound {
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    },
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::CategoryByIdNotFound(_)
            | ServerError::NoPostsInCategory(_)
            | ServerError::ReactionNotFound { .. }
            | ServerError::Database(DbError::MissingReference(_)) => StatusCode::NOT_FOUND,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::MissingField(_)
            | ServerError::InvalidId { .. }
            | ServerError::InvalidOffset(_)
            | ServerError::SelfActionForbidden(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::Database(DbError::Conflict(_)) => StatusCode::CONFLICT,
            ServerError::JsonResponse(_)
            | ServerError::PasswordHash(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client. Server-side failures stay in the log.
    fn public_message(&self) -> String {
        match self {
            ServerError::Database(DbError::Conflict(constraint))
                if constraint.starts_with("users_") =>
            {
                "User already exists".to_owned()
            }
            ServerError::Database(DbError::Conflict(_)) => {
                "The request conflicts with existing data.".to_owned()
            }
            ServerError::Database(DbError::MissingReference(_)) => {
                "A referenced user, post or category was not found.".to_owned()
            }
            _ if self.status().is_server_error() => "Internal server error".to_owned(),
            _ => self.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            error: self.public_message(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub struct Confirmation {
    pub message: &'static str,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub struct Toggled {
    pub message: &'static str,
    pub outcome: ToggleOutcome,
}
