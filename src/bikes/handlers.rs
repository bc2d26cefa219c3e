use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{BikeList, CreateBikeRequest, PublicBike, UpdateBikeRequest};
use super::services;
use crate::dto::{Message, Pagination};
use crate::error::AppResult;
use crate::extractors::{ValidJson, ValidPath, ValidQuery};
use crate::state::AppState;

pub fn bike_routes() -> Router<AppState> {
    Router::new()
        .route("/bikes/", get(list_bikes).post(create_bike))
        .route("/bikes", get(list_bikes).post(create_bike))
        .route(
            "/bikes/:id",
            get(get_bike).put(update_bike).delete(delete_bike),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_bike(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateBikeRequest>,
) -> AppResult<(StatusCode, Json<PublicBike>)> {
    let bike = services::create_bike(&state, &payload).await?;
    Ok((StatusCode::CREATED, Json(bike.into())))
}

#[instrument(skip(state))]
pub async fn list_bikes(
    State(state): State<AppState>,
    ValidQuery(p): ValidQuery<Pagination>,
) -> AppResult<Json<BikeList>> {
    let bikes = services::list_bikes(&state, p.page()?).await?;
    Ok(Json(BikeList {
        bikes: bikes.into_iter().map(PublicBike::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_bike(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<PublicBike>> {
    Ok(Json(services::get_bike(&state, id).await?.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_bike(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(payload): ValidJson<UpdateBikeRequest>,
) -> AppResult<Json<PublicBike>> {
    Ok(Json(services::update_bike(&state, id, &payload).await?.into()))
}

#[instrument(skip(state))]
pub async fn delete_bike(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<Message>> {
    services::delete_bike(&state, id).await?;
    Ok(Json(Message::new("Bike deleted")))
}
