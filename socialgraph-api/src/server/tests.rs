use crate::server::{SelfActionPolicy, ServerError, ServerState, routes};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use socialgraph_common::{
    model::{
        Id,
        auth::PasswordHash,
        category::{CategoryMarker, CreateCategory},
        post::{CreatePost, PostMarker},
        user::{CreateUser, UserMarker, UserProfile},
    },
    util::Timestamp,
};
use socialgraph_db::{
    memory::MemoryStore,
    store::{DbError, Store},
};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_policy(SelfActionPolicy::default())
    }

    fn with_policy(policy: SelfActionPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = ServerState {
            store: store.clone(),
            policy,
        };

        Self {
            store,
            router: routes().with_state(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn json(&self, method: Method, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Inserts a user directly, skipping password hashing.
    async fn user(&self, name: &str) -> Id<UserMarker> {
        let user = CreateUser {
            profile: UserProfile {
                username: name.to_owned(),
                display_name: format!("{name} display"),
                email: format!("{name}@example.com"),
            },
            password_hash: PasswordHash::from_phc(String::new()),
        };
        self.store.create_user(&user).await.unwrap()
    }

    async fn category(&self, name: &str) -> Id<CategoryMarker> {
        let category = CreateCategory {
            name: name.to_owned(),
            description: format!("All about {name}"),
        };
        self.store.create_category(&category).await.unwrap()
    }

    async fn post(
        &self,
        author: Id<UserMarker>,
        category: Option<Id<CategoryMarker>>,
        content_text: &str,
    ) -> Id<PostMarker> {
        let post = CreatePost {
            author,
            content_text: content_text.to_owned(),
            image_url: None,
            category,
            created_at: Timestamp::now(),
        };
        self.store.create_post(&post).await.unwrap()
    }
}

#[tokio::test]
async fn like_twice_adds_then_removes() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let post = app.post(alice, None, "hello").await;
    let bob = app.user("bob").await;
    let uri = format!("/like?postId={post}&userId={bob}");

    let (status, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "added");
    assert_eq!(body["message"], "Like added");

    let (status, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "removed");

    let (status, _) = app
        .get(&format!("/userLikeDislike?idPost={post}&userID={bob}"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, counts) = app.get(&format!("/likesDislikes?idPost={post}")).await;
    assert_eq!(counts, json!({ "likes": 0, "dislikes": 0 }));
}

#[tokio::test]
async fn like_on_dislike_flips_polarity() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let post = app.post(alice, None, "hello").await;
    let bob = app.user("bob").await;

    let (_, body) = app
        .get(&format!("/dislike?postId={post}&userId={bob}"))
        .await;
    assert_eq!(body["outcome"], "added");

    let (status, body) = app.get(&format!("/like?postId={post}&userId={bob}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "changed");
    assert_eq!(body["message"], "Changed from dislike to like");

    let (_, reaction) = app
        .get(&format!("/userLikeDislike?idPost={post}&userID={bob}"))
        .await;
    assert_eq!(reaction["like"], 1);
    assert_eq!(reaction["idPost"], post.get());
    assert_eq!(reaction["idUser"], bob.get());

    let (_, counts) = app.get(&format!("/likesDislikes?idPost={post}")).await;
    assert_eq!(counts, json!({ "likes": 1, "dislikes": 0 }));
}

#[tokio::test]
async fn reacting_needs_existing_post_and_user() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let post = app.post(alice, None, "hello").await;

    let (status, _) = app.get(&format!("/like?postId=99&userId={alice}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/like?postId={post}&userId=99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn self_actions_follow_policy() {
    let permissive = TestApp::new();
    let alice = permissive.user("alice").await;
    let post = permissive.post(alice, None, "mine").await;

    let (status, _) = permissive
        .get(&format!("/like?postId={post}&userId={alice}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = permissive
        .get(&format!("/subscribe?subscribedToID={alice}&subscriberID={alice}"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let strict = TestApp::with_policy(SelfActionPolicy {
        allow_self_subscription: false,
        allow_self_reaction: false,
    });
    let alice = strict.user("alice").await;
    let post = strict.post(alice, None, "mine").await;

    let (status, _) = strict
        .get(&format!("/like?postId={post}&userId={alice}"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = strict
        .get(&format!("/subscribe?subscribedToID={alice}&subscriberID={alice}"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_login_and_duplicates() {
    let app = TestApp::new();
    let registration = json!({
        "username": "alice",
        "displayName": "Alice",
        "email": "alice@example.com",
        "password": "hunter2",
    });

    let (status, body) = app.json(Method::POST, "/register", &registration).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User registered successfully");

    let duplicate_email = json!({
        "username": "alice2",
        "displayName": "Alice Two",
        "email": "alice@example.com",
        "password": "hunter3",
    });
    let (status, body) = app.json(Method::POST, "/register", &duplicate_email).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, user) = app
        .json(
            Method::POST,
            "/login",
            &json!({ "username": "alice", "password": "hunter2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "alice");
    assert_eq!(user["displayName"], "Alice");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());

    let (status, _) = app
        .json(
            Method::POST,
            "/login",
            &json!({ "username": "alice@example.com", "password": "hunter2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (wrong_status, wrong_body) = app
        .json(
            Method::POST,
            "/login",
            &json!({ "username": "alice", "password": "wrong" }),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .json(
            Method::POST,
            "/login",
            &json!({ "username": "nobody", "password": "hunter2" }),
        )
        .await;
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "Invalid username or password");
}

#[tokio::test]
async fn register_with_empty_field_inserts_nothing() {
    let app = TestApp::new();

    let (status, body) = app
        .json(
            Method::POST,
            "/register",
            &json!({
                "username": "alice",
                "displayName": "",
                "email": "alice@example.com",
                "password": "hunter2",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "displayName is required");

    let (status, body) = app
        .json(
            Method::POST,
            "/register",
            &json!({ "username": "alice", "displayName": "Alice", "email": "a@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "password is required");

    let (_, users) = app.get("/users").await;
    assert_eq!(users, json!([]));
}

#[tokio::test]
async fn password_update_replaces_credential() {
    let app = TestApp::new();
    app.json(
        Method::POST,
        "/register",
        &json!({
            "username": "alice",
            "displayName": "Alice",
            "email": "alice@example.com",
            "password": "old",
        }),
    )
    .await;
    let (_, user) = app
        .json(
            Method::POST,
            "/login",
            &json!({ "username": "alice", "password": "old" }),
        )
        .await;

    let (status, _) = app
        .json(
            Method::POST,
            "/updatePassword",
            &json!({ "userID": user["idUser"], "password": "new" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::POST,
            "/login",
            &json!({ "username": "alice", "password": "old" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .json(
            Method::POST,
            "/login",
            &json!({ "username": "alice", "password": "new" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::POST,
            "/updatePassword",
            &json!({ "userID": "42", "password": "new" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_edit_returns_updated_user() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    app.user("bob").await;

    let (status, user) = app
        .json(
            Method::PUT,
            "/userEdit",
            &json!({
                "id": alice.to_string(),
                "username": "alicia",
                "displayName": "Alicia",
                "email": "alicia@example.com",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["idUser"], alice.get());
    assert_eq!(user["username"], "alicia");

    let (status, _) = app
        .json(
            Method::PUT,
            "/userEdit",
            &json!({
                "id": alice.to_string(),
                "username": "bob",
                "displayName": "Alicia",
                "email": "alicia@example.com",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .json(
            Method::PUT,
            "/userEdit",
            &json!({
                "id": "77",
                "username": "ghost",
                "displayName": "Ghost",
                "email": "ghost@example.com",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_listings_distinguish_empty_and_missing() {
    let app = TestApp::new();

    let (status, body) = app.get("/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app.get("/posts/category?category=news").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let alice = app.user("alice").await;
    let news = app.category("news").await;
    app.post(alice, Some(news), "breaking").await;
    app.post(alice, None, "uncategorized").await;

    let (status, posts) = app.get("/posts/category?category=news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posts.as_array().map(Vec::len), Some(1));
    assert_eq!(posts[0]["category"], "news");
    assert_eq!(posts[0]["categoryID"], news.get());

    let (_, posts) = app.get("/posts").await;
    assert_eq!(posts[0]["content_text"], "uncategorized");
    assert_eq!(posts[0]["category"], "");
    assert_eq!(posts[0]["categoryID"], Value::Null);
    assert_eq!(posts[0]["imageURL"], "");
}

#[tokio::test]
async fn posts_page_by_offset() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    for index in 0..12 {
        app.post(alice, None, &format!("post {index}")).await;
    }

    let (_, first) = app.get("/posts").await;
    let (_, second) = app.get("/posts?offset=10").await;
    assert_eq!(first.as_array().map(Vec::len), Some(10));
    assert_eq!(first[0]["content_text"], "post 11");
    assert_eq!(second.as_array().map(Vec::len), Some(2));
    assert_eq!(second[1]["content_text"], "post 0");

    let (status, _) = app.get("/posts?offset=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_edit_and_delete_post() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let news = app.category("news").await;

    let (status, created) = app
        .json(
            Method::POST,
            "/addPost",
            &json!({
                "content_text": "first",
                "imageURL": "https://img.example/1.png",
                "userID": alice.to_string(),
                "categoryID": "",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let post_id = created["postId"].clone();

    let (_, post) = app.get(&format!("/post?id={post_id}")).await;
    assert_eq!(post["content_text"], "first");
    assert_eq!(post["imageURL"], "https://img.example/1.png");
    assert_eq!(post["userID"], alice.get());

    let (status, _) = app
        .json(
            Method::PUT,
            "/editPost",
            &json!({
                "postID": post_id,
                "contentText": "edited",
                "imageURL": "",
                "categoryID": news.to_string(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, post) = app.get(&format!("/post?id={post_id}")).await;
    assert_eq!(post["content_text"], "edited");
    assert_eq!(post["category"], "news");
    assert_eq!(post["imageURL"], "");

    let (_, user_posts) = app.get(&format!("/posts/user?id={alice}")).await;
    assert_eq!(user_posts.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .json(Method::DELETE, "/deletePost", &json!({ "postID": post_id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/post?id={post_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .json(Method::DELETE, "/deletePost", &json!({ "postID": post_id }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_post_for_unknown_user_is_not_found() {
    let app = TestApp::new();

    let (status, _) = app
        .json(
            Method::POST,
            "/addPost",
            &json!({ "content_text": "orphan", "userID": "5" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_listed_oldest_first() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let post = app.post(alice, None, "hello").await;

    for text in ["first", "second"] {
        let (status, body) = app
            .json(
                Method::POST,
                "/addComment",
                &json!({ "postID": post.to_string(), "userID": alice.get(), "contentText": text }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["commentId"].is_i64());
    }

    let (_, comments) = app.get(&format!("/comments?idPost={post}")).await;
    assert_eq!(comments[0]["content_text"], "first");
    assert_eq!(comments[1]["content_text"], "second");
    assert_eq!(comments[0]["idUser"], alice.get());

    let (status, body) = app
        .json(
            Method::POST,
            "/addComment",
            &json!({ "postID": post.to_string(), "userID": alice.get(), "contentText": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "contentText is required");
}

#[tokio::test]
async fn categories_round_trip() {
    let app = TestApp::new();

    let (status, created) = app
        .json(
            Method::POST,
            "/addCategory",
            &json!({ "name": "music", "description": "Songs" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, category) = app
        .get(&format!("/category?categoryId={}", created["categoryId"]))
        .await;
    assert_eq!(category["name"], "music");
    assert_eq!(category["description"], "Songs");

    let (_, categories) = app.get("/categories").await;
    assert_eq!(categories.as_array().map(Vec::len), Some(1));

    let (status, _) = app.get("/category?categoryId=404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saving_twice_toggles_off() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let post = app.post(alice, None, "keep me").await;
    let save = json!({ "postID": post.to_string(), "userID": alice.to_string() });
    let check = format!("/checkPostSaved?postID={post}&userID={alice}");

    let (_, body) = app.json(Method::POST, "/savePost", &save).await;
    assert_eq!(body["outcome"], "added");
    let (_, status) = app.get(&check).await;
    assert_eq!(status, json!({ "saved": true }));

    let (_, saved) = app.get(&format!("/savedPosts?userID={alice}")).await;
    assert_eq!(saved[0]["idPost"], post.get());

    let (_, body) = app.json(Method::POST, "/savePost", &save).await;
    assert_eq!(body["outcome"], "removed");
    let (_, status) = app.get(&check).await;
    assert_eq!(status, json!({ "saved": false }));
}

#[tokio::test]
async fn subscriptions_toggle_and_count() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let subscribe = format!("/subscribe?subscribedToID={bob}&subscriberID={alice}");

    let (_, body) = app.get(&subscribe).await;
    assert_eq!(body["outcome"], "added");

    let (_, status) = app
        .get(&format!("/checkSubscription?subscribedToID={bob}&subscriberID={alice}"))
        .await;
    assert_eq!(status, json!({ "subscribed": true }));

    let (_, subscriptions) = app.get(&format!("/listOfSubscribers?userID={alice}")).await;
    assert_eq!(subscriptions, json!([bob.get()]));

    let (_, count) = app.get(&format!("/numberOfSubscribers?userID={bob}")).await;
    assert_eq!(count, json!({ "numberOfSubscribers": 1 }));
    let (_, count) = app.get(&format!("/numberOfSubscribeTo?userID={alice}")).await;
    assert_eq!(count, json!({ "numberOfSubscriptions": 1 }));

    let (_, body) = app.get(&subscribe).await;
    assert_eq!(body["outcome"], "removed");
    let (_, count) = app.get(&format!("/numberOfSubscribers?userID={bob}")).await;
    assert_eq!(count, json!({ "numberOfSubscribers": 0 }));
}

#[tokio::test]
async fn conversations_show_latest_message_per_counterpart() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let carol = app.user("carol").await;

    for (sender, receiver, content) in [
        (alice, bob, "hi bob"),
        (carol, alice, "hi alice"),
        (bob, alice, "hey alice"),
    ] {
        let (status, body) = app
            .json(
                Method::POST,
                "/sendMessage",
                &json!({
                    "senderID": sender.to_string(),
                    "receiverID": receiver.to_string(),
                    "content": content,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["messageId"].is_i64());
    }

    let (status, conversations) = app.get(&format!("/conversations?userID={alice}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(conversations.as_array().map(Vec::len), Some(2));
    assert_eq!(conversations[0]["lastMessage"], "hey alice");
    assert_eq!(conversations[0]["senderName"], "bob display");
    assert_eq!(conversations[1]["lastMessage"], "hi alice");
    assert_eq!(conversations[1]["senderID"], carol.get());

    let (_, thread) = app
        .get(&format!("/messages?senderID={alice}&receiverID={bob}"))
        .await;
    assert_eq!(thread[0]["content"], "hey alice");
    assert_eq!(thread[1]["content"], "hi bob");
}

#[tokio::test]
async fn bad_input_maps_to_client_errors() {
    let app = TestApp::new();

    let (status, body) = app.get("/post?id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "status": 400, "error": "Invalid id format" }));

    let (status, body) = app.get("/post").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "id is required");

    let (status, body) = app.get("/checkPostSaved?postID=1&userID=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid userID format");

    let request = Request::post("/addComment")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, _) = app.get("/user?id=3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn only_user_key_conflicts_report_existing_users() {
    let duplicate_email = ServerError::Database(DbError::Conflict("users_email_key".to_owned()));
    assert_eq!(duplicate_email.status(), StatusCode::CONFLICT);
    assert_eq!(duplicate_email.public_message(), "User already exists");

    let reaction_race =
        ServerError::Database(DbError::Conflict("likes_dislikes_post_user_key".to_owned()));
    assert_eq!(reaction_race.status(), StatusCode::CONFLICT);
    assert_ne!(reaction_race.public_message(), "User already exists");
}

#[test]
fn store_failures_hide_driver_details() {
    let failure = ServerError::Database(DbError::InsertUnconfirmed("comment"));

    assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failure.public_message(), "Internal server error");
    assert!(failure.to_string().contains("comment"));
}
