//! A [`Store`] held entirely in process memory.
//!
//! Mirrors the constraints of the SQL schema (unique keys, foreign keys,
//! cascading post deletion) so that handlers behave the same against it as
//! against Postgres.

use crate::store::{DbError, Result, Store};
use async_trait::async_trait;
use socialgraph_common::{
    model::{
        Id,
        auth::PasswordHash,
        category::{Category, CategoryMarker, CreateCategory},
        comment::{Comment, CommentMarker, CreateComment},
        message::{Conversation, CreateMessage, Message, MessageMarker},
        post::{CreatePost, EditPost, POST_PAGE_SIZE, Post, PostMarker, PostQuery},
        reaction::{Polarity, Reaction, ReactionCounts},
        toggle::ToggleOutcome,
        user::{CreateUser, User, UserCredentials, UserMarker, UserProfile},
    },
    util::Timestamp,
};
use std::{
    cmp::Reverse,
    collections::{BTreeMap, btree_map::Entry},
};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
struct Table<Row> {
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl<Row> Default for Table<Row> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<Row> Table<Row> {
    fn insert(&mut self, row: Row) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row);
        id
    }

    fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    fn find(&self, mut predicate: impl FnMut(&Row) -> bool) -> Option<(i64, &Row)> {
        self.rows
            .iter()
            .find(|(_, row)| predicate(row))
            .map(|(id, row)| (*id, row))
    }
}

#[derive(Debug)]
struct UserRow {
    profile: UserProfile,
    password_hash: PasswordHash,
}

#[derive(Debug)]
struct PostRow {
    content_text: String,
    image_url: Option<String>,
    created_at: Timestamp,
    author: Id<UserMarker>,
    category: Option<Id<CategoryMarker>>,
}

#[derive(Debug)]
struct ReactionRow {
    post: Id<PostMarker>,
    user: Id<UserMarker>,
    polarity: Polarity,
}

#[derive(Debug)]
struct PairRow<Subject, Actor> {
    subject: Id<Subject>,
    actor: Id<Actor>,
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<UserRow>,
    categories: Table<CreateCategory>,
    posts: Table<PostRow>,
    comments: Table<CreateComment>,
    reactions: Table<ReactionRow>,
    saved_posts: Table<PairRow<PostMarker, UserMarker>>,
    subscriptions: Table<PairRow<UserMarker, UserMarker>>,
    messages: Table<CreateMessage>,
}

fn missing_reference(constraint: &str) -> DbError {
    DbError::MissingReference(constraint.to_owned())
}

impl Tables {
    fn user(&self, id: i64) -> Option<User> {
        self.users.rows.get(&id).map(|row| User {
            id: id.into(),
            username: row.profile.username.clone(),
            display_name: row.profile.display_name.clone(),
            email: row.profile.email.clone(),
        })
    }

    fn post(&self, id: i64) -> Option<Post> {
        let row = self.posts.rows.get(&id)?;
        let category = row
            .category
            .and_then(|category| self.categories.rows.get(&category.get()))
            .map(|category| category.name.clone())
            .unwrap_or_default();

        Some(Post {
            id: id.into(),
            content_text: row.content_text.clone(),
            created_at: row.created_at,
            author: row.author,
            category_id: row.category,
            category,
            image_url: row.image_url.clone().unwrap_or_default(),
        })
    }

    /// Post ids matching `predicate`, newest first.
    fn newest_posts(&self, mut predicate: impl FnMut(&PostRow) -> bool) -> Vec<i64> {
        let mut ids: Vec<(Timestamp, i64)> = self
            .posts
            .rows
            .iter()
            .filter(|(_, row)| predicate(row))
            .map(|(id, row)| (row.created_at, *id))
            .collect();
        ids.sort_by_key(|key| Reverse(*key));
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn ensure_user(&self, user_id: Id<UserMarker>, constraint: &str) -> Result<()> {
        if self.users.contains(user_id.get()) {
            Ok(())
        } else {
            Err(missing_reference(constraint))
        }
    }

    fn ensure_post(&self, post_id: Id<PostMarker>, constraint: &str) -> Result<()> {
        if self.posts.contains(post_id.get()) {
            Ok(())
        } else {
            Err(missing_reference(constraint))
        }
    }

    fn ensure_category(
        &self,
        category_id: Option<Id<CategoryMarker>>,
        constraint: &str,
    ) -> Result<()> {
        match category_id {
            Some(id) if !self.categories.contains(id.get()) => Err(missing_reference(constraint)),
            _ => Ok(()),
        }
    }

    fn ensure_unique_profile(&self, profile: &UserProfile, except: Option<i64>) -> Result<()> {
        for (id, row) in &self.users.rows {
            if Some(*id) == except {
                continue;
            }

            let constraint = if row.profile.username == profile.username {
                "users_username_key"
            } else if row.profile.display_name == profile.display_name {
                "users_display_name_key"
            } else if row.profile.email == profile.email {
                "users_email_key"
            } else {
                continue;
            };

            return Err(DbError::Conflict(constraint.to_owned()));
        }

        Ok(())
    }

    fn toggle_pair<Subject, Actor>(
        table: &mut Table<PairRow<Subject, Actor>>,
        subject: Id<Subject>,
        actor: Id<Actor>,
    ) -> ToggleOutcome {
        match table.find(|row| row.subject == subject && row.actor == actor) {
            Some((id, _)) => {
                table.rows.remove(&id);
                ToggleOutcome::Removed
            }
            None => {
                table.insert(PairRow { subject, actor });
                ToggleOutcome::Added
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .rows
            .keys()
            .filter_map(|id| tables.user(*id))
            .collect())
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.tables.lock().await.user(user_id.get()))
    }

    async fn fetch_credentials(&self, identifier: &str) -> Result<Option<UserCredentials>> {
        let tables = self.tables.lock().await;
        let found = tables
            .users
            .find(|row| row.profile.username == identifier)
            .or_else(|| tables.users.find(|row| row.profile.email == identifier));

        Ok(found.and_then(|(id, row)| {
            Some(UserCredentials {
                user: tables.user(id)?,
                password_hash: row.password_hash.clone(),
            })
        }))
    }

    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let mut tables = self.tables.lock().await;
        tables.ensure_unique_profile(&user.profile, None)?;

        let id = tables.users.insert(UserRow {
            profile: user.profile.clone(),
            password_hash: user.password_hash.clone(),
        });
        Ok(id.into())
    }

    async fn update_user(
        &self,
        user_id: Id<UserMarker>,
        profile: &UserProfile,
    ) -> Result<Option<User>> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains(user_id.get()) {
            return Ok(None);
        }
        tables.ensure_unique_profile(profile, Some(user_id.get()))?;

        if let Some(row) = tables.users.rows.get_mut(&user_id.get()) {
            row.profile = profile.clone();
        }
        Ok(tables.user(user_id.get()))
    }

    async fn update_password(
        &self,
        user_id: Id<UserMarker>,
        password_hash: &PasswordHash,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let Some(row) = tables.users.rows.get_mut(&user_id.get()) else {
            return Ok(false);
        };

        row.password_hash = password_hash.clone();
        Ok(true)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .rows
            .iter()
            .map(|(id, row)| Category {
                id: (*id).into(),
                name: row.name.clone(),
                description: row.description.clone(),
            })
            .collect())
    }

    async fn fetch_category(&self, category_id: Id<CategoryMarker>) -> Result<Option<Category>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .rows
            .get(&category_id.get())
            .map(|row| Category {
                id: category_id,
                name: row.name.clone(),
                description: row.description.clone(),
            }))
    }

    async fn create_category(&self, category: &CreateCategory) -> Result<Id<CategoryMarker>> {
        let id = self.tables.lock().await.categories.insert(category.clone());
        Ok(id.into())
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let tables = self.tables.lock().await;
        let category_name = |row: &PostRow| {
            row.category
                .and_then(|id| tables.categories.rows.get(&id.get()))
                .map(|category| category.name.as_str())
        };

        let ids = tables.newest_posts(|row| match &query.category {
            Some(name) => category_name(row) == Some(name.as_str()),
            None => true,
        });

        Ok(ids
            .into_iter()
            .skip(query.offset as usize)
            .take(POST_PAGE_SIZE as usize)
            .filter_map(|id| tables.post(id))
            .collect())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.tables.lock().await.post(post_id.get()))
    }

    async fn list_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let tables = self.tables.lock().await;
        let ids = tables.newest_posts(|row| row.author == user_id);
        Ok(ids.into_iter().filter_map(|id| tables.post(id)).collect())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let mut tables = self.tables.lock().await;
        tables.ensure_user(post.author, "posts_user_id_fkey")?;
        tables.ensure_category(post.category, "posts_category_id_fkey")?;

        let id = tables.posts.insert(PostRow {
            content_text: post.content_text.clone(),
            image_url: post.image_url.clone(),
            created_at: post.created_at,
            author: post.author,
            category: post.category,
        });
        Ok(id.into())
    }

    async fn edit_post(&self, post_id: Id<PostMarker>, edit: &EditPost) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.posts.contains(post_id.get()) {
            return Ok(false);
        }
        tables.ensure_category(edit.category, "posts_category_id_fkey")?;

        if let Some(row) = tables.posts.rows.get_mut(&post_id.get()) {
            row.content_text.clone_from(&edit.content_text);
            row.image_url.clone_from(&edit.image_url);
            row.category = edit.category;
        }
        Ok(true)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.posts.rows.remove(&post_id.get()).is_none() {
            return Ok(false);
        }

        tables.comments.rows.retain(|_, row| row.post != post_id);
        tables.reactions.rows.retain(|_, row| row.post != post_id);
        tables.saved_posts.rows.retain(|_, row| row.subject != post_id);
        Ok(true)
    }

    async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let tables = self.tables.lock().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .rows
            .iter()
            .filter(|(_, row)| row.post == post_id)
            .map(|(id, row)| Comment {
                id: (*id).into(),
                post: row.post,
                author: row.author,
                content_text: row.content_text.clone(),
                created_at: row.created_at,
            })
            .collect();
        comments.sort_by_key(|comment| (comment.created_at, comment.id));
        Ok(comments)
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>> {
        let mut tables = self.tables.lock().await;
        tables.ensure_post(comment.post, "comments_post_id_fkey")?;
        tables.ensure_user(comment.author, "comments_user_id_fkey")?;

        let id = tables.comments.insert(comment.clone());
        Ok(id.into())
    }

    async fn toggle_reaction(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        polarity: Polarity,
    ) -> Result<ToggleOutcome> {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .reactions
            .find(|row| row.post == post_id && row.user == user_id)
            .map(|(id, row)| (id, row.polarity));

        let outcome = match existing {
            None => {
                tables.ensure_post(post_id, "likes_dislikes_post_id_fkey")?;
                tables.ensure_user(user_id, "likes_dislikes_user_id_fkey")?;
                tables.reactions.insert(ReactionRow {
                    post: post_id,
                    user: user_id,
                    polarity,
                });
                ToggleOutcome::Added
            }
            Some((id, current)) if current == polarity => {
                tables.reactions.rows.remove(&id);
                ToggleOutcome::Removed
            }
            Some((id, _)) => {
                if let Some(row) = tables.reactions.rows.get_mut(&id) {
                    row.polarity = polarity;
                }
                ToggleOutcome::Changed
            }
        };

        Ok(outcome)
    }

    async fn fetch_reaction(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Reaction>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reactions
            .find(|row| row.post == post_id && row.user == user_id)
            .map(|(id, row)| Reaction {
                id: id.into(),
                post: row.post,
                user: row.user,
                polarity: row.polarity,
            }))
    }

    async fn count_reactions(&self, post_id: Id<PostMarker>) -> Result<ReactionCounts> {
        let tables = self.tables.lock().await;
        let mut counts = ReactionCounts::default();
        for row in tables.reactions.rows.values().filter(|row| row.post == post_id) {
            match row.polarity {
                Polarity::Like => counts.likes += 1,
                Polarity::Dislike => counts.dislikes += 1,
            }
        }
        Ok(counts)
    }

    async fn toggle_saved_post(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<ToggleOutcome> {
        let mut tables = self.tables.lock().await;
        let saved = tables
            .saved_posts
            .find(|row| row.subject == post_id && row.actor == user_id)
            .is_some();
        if !saved {
            tables.ensure_post(post_id, "saved_posts_post_id_fkey")?;
            tables.ensure_user(user_id, "saved_posts_user_id_fkey")?;
        }

        Ok(Tables::toggle_pair(&mut tables.saved_posts, post_id, user_id))
    }

    async fn is_post_saved(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .saved_posts
            .find(|row| row.subject == post_id && row.actor == user_id)
            .is_some())
    }

    async fn list_saved_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .saved_posts
            .rows
            .values()
            .rev()
            .filter(|row| row.actor == user_id)
            .filter_map(|row| tables.post(row.subject.get()))
            .collect())
    }

    async fn toggle_subscription(
        &self,
        subscriber: Id<UserMarker>,
        subscribed_to: Id<UserMarker>,
    ) -> Result<ToggleOutcome> {
        let mut tables = self.tables.lock().await;
        let subscribed = tables
            .subscriptions
            .find(|row| row.subject == subscriber && row.actor == subscribed_to)
            .is_some();
        if !subscribed {
            tables.ensure_user(subscriber, "subscriptions_subscriber_id_fkey")?;
            tables.ensure_user(subscribed_to, "subscriptions_subscribed_to_id_fkey")?;
        }

        Ok(Tables::toggle_pair(
            &mut tables.subscriptions,
            subscriber,
            subscribed_to,
        ))
    }

    async fn is_subscribed(
        &self,
        subscriber: Id<UserMarker>,
        subscribed_to: Id<UserMarker>,
    ) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .find(|row| row.subject == subscriber && row.actor == subscribed_to)
            .is_some())
    }

    async fn list_subscriptions(
        &self,
        subscriber: Id<UserMarker>,
    ) -> Result<Vec<Id<UserMarker>>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .rows
            .values()
            .filter(|row| row.subject == subscriber)
            .map(|row| row.actor)
            .collect())
    }

    async fn count_subscribers(&self, user_id: Id<UserMarker>) -> Result<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .subscriptions
            .rows
            .values()
            .filter(|row| row.actor == user_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn count_subscriptions(&self, user_id: Id<UserMarker>) -> Result<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .subscriptions
            .rows
            .values()
            .filter(|row| row.subject == user_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn list_messages(
        &self,
        first: Id<UserMarker>,
        second: Id<UserMarker>,
    ) -> Result<Vec<Message>> {
        let tables = self.tables.lock().await;
        let mut messages: Vec<Message> = tables
            .messages
            .rows
            .iter()
            .filter(|(_, row)| {
                (row.sender == first && row.receiver == second)
                    || (row.sender == second && row.receiver == first)
            })
            .map(|(id, row)| Message {
                id: (*id).into(),
                sender: row.sender,
                receiver: row.receiver,
                content: row.content.clone(),
                created_at: row.created_at,
            })
            .collect();
        messages.sort_by_key(|message| Reverse((message.created_at, message.id)));
        Ok(messages)
    }

    async fn create_message(&self, message: &CreateMessage) -> Result<Id<MessageMarker>> {
        let mut tables = self.tables.lock().await;
        tables.ensure_user(message.sender, "messages_sender_id_fkey")?;
        tables.ensure_user(message.receiver, "messages_receiver_id_fkey")?;

        let id = tables.messages.insert(message.clone());
        Ok(id.into())
    }

    async fn list_conversations(&self, user_id: Id<UserMarker>) -> Result<Vec<Conversation>> {
        let tables = self.tables.lock().await;

        // Latest message per unordered participant pair.
        let mut latest: BTreeMap<(Id<UserMarker>, Id<UserMarker>), (i64, &CreateMessage)> =
            BTreeMap::new();
        for (id, row) in &tables.messages.rows {
            if row.sender != user_id && row.receiver != user_id {
                continue;
            }

            let pair = (row.sender.min(row.receiver), row.sender.max(row.receiver));
            match latest.entry(pair) {
                Entry::Vacant(entry) => {
                    entry.insert((*id, row));
                }
                Entry::Occupied(mut entry) => {
                    let (current_id, current) = *entry.get();
                    if (row.created_at, *id) > (current.created_at, current_id) {
                        entry.insert((*id, row));
                    }
                }
            }
        }

        let mut ranked: Vec<(i64, &CreateMessage)> = latest.into_values().collect();
        ranked.sort_by_key(|(id, row)| Reverse((row.created_at, *id)));

        Ok(ranked
            .into_iter()
            .filter_map(|(_, row)| {
                Some(Conversation {
                    sender: row.sender,
                    sender_name: tables.user(row.sender.get())?.display_name,
                    receiver: row.receiver,
                    receiver_name: tables.user(row.receiver.get())?.display_name,
                    last_message: row.content.clone(),
                    created_at: row.created_at,
                })
            })
            .collect())
    }
}
