use crate::server::ServerRouter;

mod categories;
mod comments;
mod messages;
mod posts;
mod reactions;
mod saved;
mod subscriptions;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(users::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(categories::routes())
        .merge(reactions::routes())
        .merge(saved::routes())
        .merge(subscriptions::routes())
        .merge(messages::routes())
}
