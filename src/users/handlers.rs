use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{PublicUser, UserList, UserRequest};
use super::services;
use crate::dto::{Message, Pagination};
use crate::error::AppResult;
use crate::extractors::{ValidJson, ValidPath, ValidQuery};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UserRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let user = services::create_user(&state, &payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    ValidQuery(p): ValidQuery<Pagination>,
) -> AppResult<Json<UserList>> {
    let users = services::list_users(&state, p.page()?).await?;
    Ok(Json(UserList {
        users: users.into_iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(services::get_user(&state, id).await?.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(payload): ValidJson<UserRequest>,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(services::update_user(&state, id, &payload).await?.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<Message>> {
    services::delete_user(&state, id).await?;
    Ok(Json(Message::new("User deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_hides_password() {
        let response = PublicUser {
            id: 7,
            name: "Ana".into(),
            phone: "11999990000".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["nome"], "Ana");
        assert_eq!(json["telefone"], "11999990000");
        assert!(json.get("senha").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
