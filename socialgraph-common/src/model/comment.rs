use crate::{
    model::{Id, post::PostMarker, user::UserMarker},
    util::Timestamp,
};
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Comment {
    #[serde(rename = "idComment")]
    pub id: Id<CommentMarker>,
    #[serde(rename = "idPost")]
    pub post: Id<PostMarker>,
    #[serde(rename = "idUser")]
    pub author: Id<UserMarker>,
    pub content_text: String,
    pub created_at: Timestamp,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub content_text: String,
    pub created_at: Timestamp,
}
