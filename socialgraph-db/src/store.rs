use async_trait::async_trait;
use socialgraph_common::model::{
    Id, ModelValidationError,
    auth::PasswordHash,
    category::{Category, CategoryMarker, CreateCategory},
    comment::{Comment, CommentMarker, CreateComment},
    message::{Conversation, CreateMessage, Message, MessageMarker},
    post::{CreatePost, EditPost, Post, PostMarker, PostQuery},
    reaction::{Polarity, Reaction, ReactionCounts},
    toggle::ToggleOutcome,
    user::{CreateUser, User, UserCredentials, UserMarker, UserProfile},
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Unique constraint {0} was violated")]
    Conflict(String),
    #[error("Foreign key constraint {0} was violated")]
    MissingReference(String),
    #[error("Inserting {0} did not produce a row")]
    InsertUnconfirmed(&'static str),
    #[error("Migrating the database failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_owned();
            if db_err.is_unique_violation() {
                return DbError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return DbError::MissingReference(constraint);
            }
        }

        DbError::Sqlx(err)
    }
}

/// Every read and write the service performs against the social graph.
///
/// Update and delete methods return `false`/`None` when no row matched.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;
    async fn fetch_credentials(&self, identifier: &str) -> Result<Option<UserCredentials>>;
    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>>;
    async fn update_user(
        &self,
        user_id: Id<UserMarker>,
        profile: &UserProfile,
    ) -> Result<Option<User>>;
    async fn update_password(
        &self,
        user_id: Id<UserMarker>,
        password_hash: &PasswordHash,
    ) -> Result<bool>;

    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn fetch_category(&self, category_id: Id<CategoryMarker>) -> Result<Option<Category>>;
    async fn create_category(&self, category: &CreateCategory) -> Result<Id<CategoryMarker>>;

    /// Newest first, one page of [`POST_PAGE_SIZE`](socialgraph_common::model::post::POST_PAGE_SIZE).
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;
    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;
    async fn list_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>>;
    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>>;
    async fn edit_post(&self, post_id: Id<PostMarker>, edit: &EditPost) -> Result<bool>;
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool>;

    async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>>;
    async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>>;

    async fn toggle_reaction(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        polarity: Polarity,
    ) -> Result<ToggleOutcome>;
    async fn fetch_reaction(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Reaction>>;
    async fn count_reactions(&self, post_id: Id<PostMarker>) -> Result<ReactionCounts>;

    async fn toggle_saved_post(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<ToggleOutcome>;
    async fn is_post_saved(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>)
    -> Result<bool>;
    async fn list_saved_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>>;

    async fn toggle_subscription(
        &self,
        subscriber: Id<UserMarker>,
        subscribed_to: Id<UserMarker>,
    ) -> Result<ToggleOutcome>;
    async fn is_subscribed(
        &self,
        subscriber: Id<UserMarker>,
        subscribed_to: Id<UserMarker>,
    ) -> Result<bool>;
    /// Users that `subscriber` is subscribed to.
    async fn list_subscriptions(&self, subscriber: Id<UserMarker>)
    -> Result<Vec<Id<UserMarker>>>;
    async fn count_subscribers(&self, user_id: Id<UserMarker>) -> Result<i64>;
    async fn count_subscriptions(&self, user_id: Id<UserMarker>) -> Result<i64>;

    /// Both directions between the two users, newest first.
    async fn list_messages(
        &self,
        first: Id<UserMarker>,
        second: Id<UserMarker>,
    ) -> Result<Vec<Message>>;
    async fn create_message(&self, message: &CreateMessage) -> Result<Id<MessageMarker>>;
    async fn list_conversations(&self, user_id: Id<UserMarker>) -> Result<Vec<Conversation>>;
}
