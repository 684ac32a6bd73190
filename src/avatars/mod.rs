pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_avatar_bytes: usize) -> Router<AppState> {
    handlers::avatar_routes(max_avatar_bytes)
}
