//! Route table.
//!
//! `/user/login` and `/user/register` are open; everything else passes the
//! session-check middleware. The upload route does its own multipart-borne
//! auth.

use crate::handlers::{history, push, upload, user};
use crate::middleware::session_check;
use crate::state::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    let open = Router::new()
        .route("/user/login", post(user::login))
        .route("/user/register", post(user::register))
        .route("/push/uploadImage", post(upload::upload_image));

    let protected = Router::new()
        .route("/user/checkAuth", post(user::check_auth))
        .route("/user/logout", post(user::logout))
        .route("/push/push", post(push::push))
        .route("/push/pushRoom", post(push::push_room))
        .route("/push/count", post(push::count))
        .route("/push/getRoomInfo", post(push::get_room_info))
        .route("/push/history/single", post(history::single_history))
        .route("/push/history/room", post(history::room_history))
        .route_layer(from_fn_with_state(state.clone(), session_check));

    open.merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
