use crate::model::{Id, auth::PasswordHash};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "idUser")]
    pub id: Id<UserMarker>,
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub email: String,
}

/// Publicly visible fields of a user, as set on registration and profile edit.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct UserProfile {
    pub username: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub profile: UserProfile,
    pub password_hash: PasswordHash,
}

/// A user together with their stored credential, used only for login.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: PasswordHash,
}
