use crate::{
    model::{Id, category::CategoryMarker, user::UserMarker},
    util::Timestamp,
};
use serde::Serialize;

/// Rows per page of a post listing.
pub const POST_PAGE_SIZE: u32 = 10;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post joined with the name of its category.
///
/// `category` and `image_url` are empty strings when the post has none.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Post {
    #[serde(rename = "idPost")]
    pub id: Id<PostMarker>,
    pub content_text: String,
    pub created_at: Timestamp,
    #[serde(rename = "userID")]
    pub author: Id<UserMarker>,
    #[serde(rename = "categoryID")]
    pub category_id: Option<Id<CategoryMarker>>,
    pub category: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub content_text: String,
    pub image_url: Option<String>,
    pub category: Option<Id<CategoryMarker>>,
    pub created_at: Timestamp,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct EditPost {
    pub content_text: String,
    pub image_url: Option<String>,
    pub category: Option<Id<CategoryMarker>>,
}

/// Offset pagination over a post listing, optionally narrowed to one category name.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostQuery {
    pub category: Option<String>,
    pub offset: u32,
}
