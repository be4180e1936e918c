use crate::server::{
    Result, SelfActionPolicy, ServerError, ServerRouter, Toggled, json::Json, params,
    query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialgraph_common::model::{Id, toggle::ToggleOutcome, user::UserMarker};
use socialgraph_db::store::Store;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(subscribe)
        .typed_get(check_subscription)
        .typed_get(list_subscriptions)
        .typed_get(count_subscribers)
        .typed_get(count_subscriptions)
}

#[derive(Deserialize)]
struct PairQuery {
    #[serde(default, rename = "subscribedToID")]
    subscribed_to: String,
    #[serde(default, rename = "subscriberID")]
    subscriber: String,
}

impl PairQuery {
    fn ids(&self) -> Result<(Id<UserMarker>, Id<UserMarker>)> {
        Ok((
            params::require_id("subscriberID", &self.subscriber)?,
            params::require_id("subscribedToID", &self.subscribed_to)?,
        ))
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/subscribe", rejection(ServerError))]
struct SubscribePath();

async fn subscribe(
    SubscribePath(): SubscribePath,
    State(store): State<Arc<dyn Store>>,
    State(policy): State<SelfActionPolicy>,
    Query(query): Query<PairQuery>,
) -> Result<Json<Toggled>> {
    let (subscriber, subscribed_to) = query.ids()?;
    if !policy.allow_self_subscription && subscriber == subscribed_to {
        return Err(ServerError::SelfActionForbidden(
            "Users may not subscribe to themselves",
        ));
    }

    let outcome = store.toggle_subscription(subscriber, subscribed_to).await?;
    debug!(%subscriber, %subscribed_to, ?outcome, "Toggled subscription");

    let message = match outcome {
        ToggleOutcome::Removed => "Unsubscribed successfully",
        ToggleOutcome::Added | ToggleOutcome::Changed => "Subscribed successfully",
    };

    Ok(Json(Toggled { message, outcome }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/checkSubscription", rejection(ServerError))]
struct CheckSubscriptionPath();

#[derive(Serialize)]
struct SubscriptionStatus {
    subscribed: bool,
}

async fn check_subscription(
    CheckSubscriptionPath(): CheckSubscriptionPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<PairQuery>,
) -> Result<Json<SubscriptionStatus>> {
    let (subscriber, subscribed_to) = query.ids()?;
    let subscribed = store.is_subscribed(subscriber, subscribed_to).await?;

    Ok(Json(SubscriptionStatus { subscribed }))
}

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default, rename = "userID")]
    user_id: String,
}

impl UserQuery {
    fn id(&self) -> Result<Id<UserMarker>> {
        params::require_id("userID", &self.user_id)
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/listOfSubscribers", rejection(ServerError))]
struct ListSubscriptionsPath();

/// Ids of the users the given user is subscribed to.
async fn list_subscriptions(
    ListSubscriptionsPath(): ListSubscriptionsPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Id<UserMarker>>>> {
    let subscriptions = store.list_subscriptions(query.id()?).await?;

    Ok(Json(subscriptions))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/numberOfSubscribers", rejection(ServerError))]
struct SubscriberCountPath();

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriberCount {
    number_of_subscribers: i64,
}

async fn count_subscribers(
    SubscriberCountPath(): SubscriberCountPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SubscriberCount>> {
    let number_of_subscribers = store.count_subscribers(query.id()?).await?;

    Ok(Json(SubscriberCount {
        number_of_subscribers,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/numberOfSubscribeTo", rejection(ServerError))]
struct SubscriptionCountPath();

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionCount {
    number_of_subscriptions: i64,
}

async fn count_subscriptions(
    SubscriptionCountPath(): SubscriptionCountPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SubscriptionCount>> {
    let number_of_subscriptions = store.count_subscriptions(query.id()?).await?;

    Ok(Json(SubscriptionCount {
        number_of_subscriptions,
    }))
}
