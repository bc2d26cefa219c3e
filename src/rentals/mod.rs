use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod services;
pub mod validators;

pub fn router() -> Router<AppState> {
    handlers::rental_routes()
}
