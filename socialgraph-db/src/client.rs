use crate::{
    record::{
        CategoryRecord, CommentRecord, ConversationRecord, CredentialsRecord, MessageRecord,
        PostRecord, ReactionRecord, UserRecord,
    },
    store::{DbError, Result, Store},
};
use async_trait::async_trait;
use socialgraph_common::model::{
    Id,
    auth::PasswordHash,
    category::{Category, CategoryMarker, CreateCategory},
    comment::{Comment, CommentMarker, CreateComment},
    message::{Conversation, CreateMessage, Message, MessageMarker},
    post::{CreatePost, EditPost, POST_PAGE_SIZE, Post, PostMarker, PostQuery},
    reaction::{Polarity, Reaction, ReactionCounts},
    toggle::ToggleOutcome,
    user::{CreateUser, User, UserCredentials, UserMarker, UserProfile},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use tracing::debug;

const POST_SELECT: &str = "
    SELECT
        posts.id,
        posts.content_text,
        posts.created_at,
        posts.user_id,
        posts.category_id,
        categories.name AS category_name,
        posts.image_url
    FROM
        posts LEFT JOIN categories ON posts.category_id = categories.id
";

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn collect_records<R, T>(records: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R>,
    DbError: From<T::Error>,
{
    records
        .into_iter()
        .map(|record| T::try_from(record).map_err(DbError::from))
        .collect()
}

#[async_trait]
impl Store for DbClient {
    async fn list_users(&self) -> Result<Vec<User>> {
        let records = query_as::<_, UserRecord>(
            "
            SELECT id, username, display_name, email
            FROM users
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(User::from).collect())
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT id, username, display_name, email
            FROM users
            WHERE id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::from))
    }

    async fn fetch_credentials(&self, identifier: &str) -> Result<Option<UserCredentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT id, username, display_name, email, password_hash
            FROM users
            WHERE username = $1 OR email = $1
            ORDER BY username = $1 DESC
            LIMIT 1
            ",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserCredentials::from))
    }

    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let id = query_scalar::<_, i64>(
            "
            INSERT INTO users (username, display_name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&user.profile.username)
        .bind(&user.profile.display_name)
        .bind(&user.profile.email)
        .bind(user.password_hash.as_phc())
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = id, "Created user");
        Ok(id.into())
    }

    async fn update_user(
        &self,
        user_id: Id<UserMarker>,
        profile: &UserProfile,
    ) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            UPDATE users
            SET username = $1, display_name = $2, email = $3
            WHERE id = $4
            RETURNING id, username, display_name, email
            ",
        )
        .bind(&profile.username)
        .bind(&profile.display_name)
        .bind(&profile.email)
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::from))
    }

    async fn update_password(
        &self,
        user_id: Id<UserMarker>,
        password_hash: &PasswordHash,
    ) -> Result<bool> {
        let result = query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash.as_phc())
            .bind(user_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let records = query_as::<_, CategoryRecord>(
            "SELECT id, name, description FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Category::from).collect())
    }

    async fn fetch_category(&self, category_id: Id<CategoryMarker>) -> Result<Option<Category>> {
        let record = query_as::<_, CategoryRecord>(
            "SELECT id, name, description FROM categories WHERE id = $1",
        )
        .bind(category_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Category::from))
    }

    async fn create_category(&self, category: &CreateCategory) -> Result<Id<CategoryMarker>> {
        let id = query_scalar::<_, i64>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.into())
    }

    async fn list_posts(&self, post_query: &PostQuery) -> Result<Vec<Post>> {
        let limit = i64::from(POST_PAGE_SIZE);
        let offset = i64::from(post_query.offset);

        let records = if let Some(category) = &post_query.category {
            let sql = format!(
                "{POST_SELECT}
                WHERE categories.name = $1
                ORDER BY posts.created_at DESC, posts.id DESC
                LIMIT $2 OFFSET $3"
            );
            query_as::<_, PostRecord>(&sql)
                .bind(category)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "{POST_SELECT}
                ORDER BY posts.created_at DESC, posts.id DESC
                LIMIT $1 OFFSET $2"
            );
            query_as::<_, PostRecord>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
        };

        collect_records(records)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE posts.id = $1");
        let record = query_as::<_, PostRecord>(&sql)
            .bind(post_id.get())
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn list_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let sql = format!(
            "{POST_SELECT}
            WHERE posts.user_id = $1
            ORDER BY posts.created_at DESC, posts.id DESC"
        );
        let records = query_as::<_, PostRecord>(&sql)
            .bind(user_id.get())
            .fetch_all(&self.pool)
            .await?;

        collect_records(records)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let id = query_scalar::<_, i64>(
            "
            INSERT INTO posts (content_text, image_url, created_at, user_id, category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&post.content_text)
        .bind(post.image_url.as_deref())
        .bind(post.created_at.to_string())
        .bind(post.author.get())
        .bind(post.category.map(Id::get))
        .fetch_one(&self.pool)
        .await?;

        debug!(post_id = id, author = %post.author, "Created post");
        Ok(id.into())
    }

    async fn edit_post(&self, post_id: Id<PostMarker>, edit: &EditPost) -> Result<bool> {
        let result = query(
            "
            UPDATE posts
            SET content_text = $1, image_url = $2, category_id = $3
            WHERE id = $4
            ",
        )
        .bind(&edit.content_text)
        .bind(edit.image_url.as_deref())
        .bind(edit.category.map(Id::get))
        .bind(post_id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts WHERE id = $1")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT id, post_id, user_id, content_text, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(post_id.get())
        .fetch_all(&self.pool)
        .await?;

        collect_records(records)
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>> {
        let id = query_scalar::<_, i64>(
            "
            INSERT INTO comments (post_id, user_id, content_text, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(comment.post.get())
        .bind(comment.author.get())
        .bind(&comment.content_text)
        .bind(comment.created_at.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::InsertUnconfirmed("comment"))?;

        Ok(id.into())
    }

    async fn toggle_reaction(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        polarity: Polarity,
    ) -> Result<ToggleOutcome> {
        let mut tx = self.pool.begin().await?;

        // Every reaction toggle on this post queues behind this row lock, so the
        // read below sees the committed state of the pair.
        query_scalar::<_, i64>("SELECT id FROM posts WHERE id = $1 FOR NO KEY UPDATE")
            .bind(post_id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::MissingReference("likes_dislikes_post_id_fkey".to_owned()))?;

        let existing = query_scalar::<_, i16>(
            "SELECT value FROM likes_dislikes WHERE post_id = $1 AND user_id = $2",
        )
        .bind(post_id.get())
        .bind(user_id.get())
        .fetch_optional(&mut *tx)
        .await?
        .map(Polarity::try_from)
        .transpose()
        .map_err(|err| DbError::Data(err.into()))?;

        let outcome = match existing {
            None => {
                query("INSERT INTO likes_dislikes (post_id, user_id, value) VALUES ($1, $2, $3)")
                    .bind(post_id.get())
                    .bind(user_id.get())
                    .bind(polarity.value())
                    .execute(&mut *tx)
                    .await?;
                ToggleOutcome::Added
            }
            Some(current) if current == polarity => {
                query("DELETE FROM likes_dislikes WHERE post_id = $1 AND user_id = $2")
                    .bind(post_id.get())
                    .bind(user_id.get())
                    .execute(&mut *tx)
                    .await?;
                ToggleOutcome::Removed
            }
            Some(_) => {
                query("UPDATE likes_dislikes SET value = $3 WHERE post_id = $1 AND user_id = $2")
                    .bind(post_id.get())
                    .bind(user_id.get())
                    .bind(polarity.value())
                    .execute(&mut *tx)
                    .await?;
                ToggleOutcome::Changed
            }
        };

        tx.commit().await?;

        debug!(%post_id, %user_id, ?polarity, ?outcome, "Toggled reaction");
        Ok(outcome)
    }

    async fn fetch_reaction(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Reaction>> {
        let record = query_as::<_, ReactionRecord>(
            "
            SELECT id, post_id, user_id, value
            FROM likes_dislikes
            WHERE post_id = $1 AND user_id = $2
            ",
        )
        .bind(post_id.get())
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let reaction = record.map(Reaction::try_from).transpose()?;
        Ok(reaction)
    }

    async fn count_reactions(&self, post_id: Id<PostMarker>) -> Result<ReactionCounts> {
        let (likes, dislikes) = query_as::<_, (i64, i64)>(
            "
            SELECT
                COUNT(*) FILTER (WHERE value = 1),
                COUNT(*) FILTER (WHERE value = -1)
            FROM likes_dislikes
            WHERE post_id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(ReactionCounts { likes, dislikes })
    }

    async fn toggle_saved_post(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<ToggleOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = query_scalar::<_, i64>(
            "
            INSERT INTO saved_posts (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(post_id.get())
        .bind(user_id.get())
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if inserted.is_some() {
            ToggleOutcome::Added
        } else {
            query("DELETE FROM saved_posts WHERE post_id = $1 AND user_id = $2")
                .bind(post_id.get())
                .bind(user_id.get())
                .execute(&mut *tx)
                .await?;
            ToggleOutcome::Removed
        };

        tx.commit().await?;

        debug!(%post_id, %user_id, ?outcome, "Toggled saved post");
        Ok(outcome)
    }

    async fn is_post_saved(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<bool> {
        let saved = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM saved_posts WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id.get())
        .bind(user_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn list_saved_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.id,
                posts.content_text,
                posts.created_at,
                posts.user_id,
                posts.category_id,
                categories.name AS category_name,
                posts.image_url
            FROM
                saved_posts
                JOIN posts ON saved_posts.post_id = posts.id
                LEFT JOIN categories ON posts.category_id = categories.id
            WHERE
                saved_posts.user_id = $1
            ORDER BY saved_posts.id DESC
            ",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        collect_records(records)
    }

    async fn toggle_subscription(
        &self,
        subscriber: Id<UserMarker>,
        subscribed_to: Id<UserMarker>,
    ) -> Result<ToggleOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = query_scalar::<_, i64>(
            "
            INSERT INTO subscriptions (subscriber_id, subscribed_to_id)
            VALUES ($1, $2)
            ON CONFLICT (subscriber_id, subscribed_to_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(subscriber.get())
        .bind(subscribed_to.get())
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if inserted.is_some() {
            ToggleOutcome::Added
        } else {
            query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND subscribed_to_id = $2")
                .bind(subscriber.get())
                .bind(subscribed_to.get())
                .execute(&mut *tx)
                .await?;
            ToggleOutcome::Removed
        };

        tx.commit().await?;

        debug!(%subscriber, %subscribed_to, ?outcome, "Toggled subscription");
        Ok(outcome)
    }

    async fn is_subscribed(
        &self,
        subscriber: Id<UserMarker>,
        subscribed_to: Id<UserMarker>,
    ) -> Result<bool> {
        let subscribed = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM subscriptions
                WHERE subscriber_id = $1 AND subscribed_to_id = $2
            )
            ",
        )
        .bind(subscriber.get())
        .bind(subscribed_to.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(subscribed)
    }

    async fn list_subscriptions(
        &self,
        subscriber: Id<UserMarker>,
    ) -> Result<Vec<Id<UserMarker>>> {
        let ids = query_scalar::<_, i64>(
            "SELECT subscribed_to_id FROM subscriptions WHERE subscriber_id = $1 ORDER BY id",
        )
        .bind(subscriber.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(Id::new).collect())
    }

    async fn count_subscribers(&self, user_id: Id<UserMarker>) -> Result<i64> {
        let count =
            query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions WHERE subscribed_to_id = $1")
                .bind(user_id.get())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn count_subscriptions(&self, user_id: Id<UserMarker>) -> Result<i64> {
        let count =
            query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                .bind(user_id.get())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn list_messages(
        &self,
        first: Id<UserMarker>,
        second: Id<UserMarker>,
    ) -> Result<Vec<Message>> {
        let records = query_as::<_, MessageRecord>(
            "
            SELECT id, sender_id, receiver_id, content, created_at
            FROM messages
            WHERE
                (sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(first.get())
        .bind(second.get())
        .fetch_all(&self.pool)
        .await?;

        collect_records(records)
    }

    async fn create_message(&self, message: &CreateMessage) -> Result<Id<MessageMarker>> {
        let id = query_scalar::<_, i64>(
            "
            INSERT INTO messages (sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(message.sender.get())
        .bind(message.receiver.get())
        .bind(&message.content)
        .bind(message.created_at.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::InsertUnconfirmed("message"))?;

        Ok(id.into())
    }

    async fn list_conversations(&self, user_id: Id<UserMarker>) -> Result<Vec<Conversation>> {
        let records = query_as::<_, ConversationRecord>(
            "
            WITH ranked AS (
                SELECT
                    messages.*,
                    ROW_NUMBER() OVER (
                        PARTITION BY
                            LEAST(sender_id, receiver_id),
                            GREATEST(sender_id, receiver_id)
                        ORDER BY created_at DESC, id DESC
                    ) AS recency
                FROM messages
                WHERE sender_id = $1 OR receiver_id = $1
            )
            SELECT
                ranked.sender_id,
                sender.display_name AS sender_name,
                ranked.receiver_id,
                receiver.display_name AS receiver_name,
                ranked.content AS last_message,
                ranked.created_at
            FROM
                ranked
                JOIN users sender ON ranked.sender_id = sender.id
                JOIN users receiver ON ranked.receiver_id = receiver.id
            WHERE ranked.recency = 1
            ORDER BY ranked.created_at DESC, ranked.id DESC
            ",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        collect_records(records)
    }
}
