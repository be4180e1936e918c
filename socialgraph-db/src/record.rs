use socialgraph_common::model::{
    ModelValidationError,
    auth::PasswordHash,
    category::Category,
    comment::Comment,
    message::{Conversation, Message},
    post::Post,
    reaction::{Polarity, Reaction},
    user::{User, UserCredentials},
};
use sqlx::FromRow;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A post row left-joined with its category's name.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub id: i64,
    pub content_text: String,
    pub created_at: String,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content_text: String,
    pub created_at: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct ReactionRecord {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub value: i16,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct MessageRecord {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct ConversationRecord {
    pub sender_id: i64,
    pub sender_name: String,
    pub receiver_id: i64,
    pub receiver_name: String,
    pub last_message: String,
    pub created_at: String,
}

impl From<UserRecord> for User {
    fn from(value: UserRecord) -> Self {
        Self {
            id: value.id.into(),
            username: value.username,
            display_name: value.display_name,
            email: value.email,
        }
    }
}

impl From<CredentialsRecord> for UserCredentials {
    fn from(value: CredentialsRecord) -> Self {
        Self {
            user: User {
                id: value.id.into(),
                username: value.username,
                display_name: value.display_name,
                email: value.email,
            },
            password_hash: PasswordHash::from_phc(value.password_hash),
        }
    }
}

impl From<CategoryRecord> for Category {
    fn from(value: CategoryRecord) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            description: value.description,
        }
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            content_text: value.content_text,
            created_at: value.created_at.parse()?,
            author: value.user_id.into(),
            category_id: value.category_id.map(Into::into),
            category: value.category_name.unwrap_or_default(),
            image_url: value.image_url.unwrap_or_default(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            post: value.post_id.into(),
            author: value.user_id.into(),
            content_text: value.content_text,
            created_at: value.created_at.parse()?,
        })
    }
}

impl TryFrom<ReactionRecord> for Reaction {
    type Error = ModelValidationError;

    fn try_from(value: ReactionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            post: value.post_id.into(),
            user: value.user_id.into(),
            polarity: Polarity::try_from(value.value)?,
        })
    }
}

impl TryFrom<MessageRecord> for Message {
    type Error = ModelValidationError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            sender: value.sender_id.into(),
            receiver: value.receiver_id.into(),
            content: value.content,
            created_at: value.created_at.parse()?,
        })
    }
}

impl TryFrom<ConversationRecord> for Conversation {
    type Error = ModelValidationError;

    fn try_from(value: ConversationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            sender: value.sender_id.into(),
            sender_name: value.sender_name,
            receiver: value.receiver_id.into(),
            receiver_name: value.receiver_name,
            last_message: value.last_message,
            created_at: value.created_at.parse()?,
        })
    }
}
