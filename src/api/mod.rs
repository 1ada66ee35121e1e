//! API layer
//!
//! HTTP handlers for:
//! - Auth (register, login, refresh)
//! - Users, profiles and the follow graph
//! - Posts and interactions
//! - Notifications
//! - Metrics (Prometheus)

mod auth;
mod dto;
pub mod metrics;
mod notifications;
mod posts;
mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

pub use dto::*;
pub use metrics::metrics_router;

use crate::AppState;

/// Create the JSON API router, mounted under `/api`
///
/// Handlers that need a caller take the `CurrentUser` extractor; public
/// reads take `MaybeUser` so visibility can follow the viewer.
pub fn api_router() -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me));

    // `:user` is a username on profile/content routes and an ID on graph routes.
    let user_routes = Router::new()
        .route("/me", put(users::update_profile))
        .route("/me/avatar", put(users::update_avatar))
        .route("/:user", get(users::get_profile))
        .route("/:user/posts", get(users::user_posts))
        .route("/:user/replies", get(users::user_replies))
        .route("/:user/likes", get(users::user_likes))
        .route("/:user/followers", get(users::followers))
        .route("/:user/following", get(users::following))
        .route("/:user/follow-status", get(users::follow_status))
        .route("/:user/follow", post(users::follow).delete(users::unfollow));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/:id/replies", get(posts::get_replies))
        .route("/:id/like", post(posts::like_post).delete(posts::unlike_post))
        .route("/:id/liked", get(posts::has_liked))
        .route(
            "/:id/bookmark",
            post(posts::bookmark_post).delete(posts::unbookmark_post),
        )
        .route(
            "/:id/repost",
            post(posts::repost_post).delete(posts::unrepost_post),
        );

    let notification_routes = Router::new()
        .route("/", get(notifications::list))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", put(notifications::mark_all_read))
        .route("/:id/read", put(notifications::mark_read))
        .route("/:id", axum::routing::delete(notifications::delete));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/posts", post_routes)
        .route("/bookmarks", get(posts::get_bookmarks))
        .route("/follow-requests", get(users::follow_requests))
        .route(
            "/follow-requests/:id/accept",
            post(users::accept_follow_request),
        )
        .route(
            "/follow-requests/:id/reject",
            post(users::reject_follow_request),
        )
        .nest("/notifications", notification_routes)
}
