use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateRentalRequest, PublicRental, RentalFull, RentalList, UpdateRentalRequest};
use super::services;
use crate::dto::{Message, Pagination};
use crate::error::AppResult;
use crate::extractors::{ValidJson, ValidPath, ValidQuery};
use crate::state::AppState;

pub fn rental_routes() -> Router<AppState> {
    Router::new()
        .route("/locacoes/", get(list_rentals).post(create_rental))
        .route("/locacoes", get(list_rentals).post(create_rental))
        .route(
            "/locacoes/:id",
            get(get_rental).put(update_rental).delete(delete_rental),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_rental(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateRentalRequest>,
) -> AppResult<(StatusCode, Json<RentalFull>)> {
    let view = services::create_rental(&state, &payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn list_rentals(
    State(state): State<AppState>,
    ValidQuery(p): ValidQuery<Pagination>,
) -> AppResult<Json<RentalList>> {
    let rentals = services::list_rentals(&state, p.page()?).await?;
    Ok(Json(RentalList {
        locacoes: rentals.into_iter().map(PublicRental::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_rental(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<RentalFull>> {
    Ok(Json(services::get_rental(&state, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_rental(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(payload): ValidJson<UpdateRentalRequest>,
) -> AppResult<Json<RentalFull>> {
    let view = services::update_rental(&state, id, payload.pickup_at, payload.price).await?;
    Ok(Json(view))
}

#[instrument(skip(state))]
pub async fn delete_rental(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<Message>> {
    services::delete_rental(&state, id).await?;
    Ok(Json(Message::new("Locacao deleted")))
}
