pub mod api;
pub mod auth;
pub mod comments;
pub mod posts;
pub mod rooms;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::middleware::auth_middleware;
use crate::websocket::ws_handler;
use crate::AppState;

pub fn create_routes(app_state: &AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/loginAdmin", post(auth::login_admin))
        .route("/join-room", post(rooms::join_room))
        // Section feed; shares the `:post_id` segment with the post routes
        .route("/posts/:post_id", get(posts::get_section_posts))
        .route("/posts/:post_id/comments", get(comments::get_post_comments))
        .route("/ws", get(ws_handler));

    let protected_routes = Router::new()
        .route("/user-profile", get(auth::user_profile))
        .route("/create-room", post(rooms::create_room))
        .route("/room/:room_id", delete(rooms::delete_room))
        .route("/posts", post(posts::create_post))
        .route("/posts/:post_id", delete(posts::delete_post))
        .route("/posts/:post_id/upvote", patch(posts::upvote_post).put(posts::upvote_post))
        .route("/posts/:post_id/comments", post(comments::create_comment))
        .route("/posts/:post_id/comments/:comment_id", delete(comments::delete_comment))
        .route("/posts/:post_id/comments/:comment_id/upvote", put(comments::upvote_comment))
        .route("/posts/:post_id/comments/:comment_id/reply", post(comments::reply_to_comment))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), auth_middleware));

    public_routes.merge(protected_routes)
}

/// The complete application: routes, CORS and state
pub fn create_app(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.cors_origins);

    create_routes(&app_state)
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(app_state)
}

/// Permissive when no origins are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ CORS: Ignoring invalid origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
