use tracing::{info, instrument};

use super::dto::UserRequest;
use crate::db::{Page, User, UserFields};
use crate::error::{AppError, AppResult};
use crate::password::hash_password;
use crate::state::AppState;

fn fields(req: &UserRequest) -> AppResult<UserFields> {
    Ok(UserFields {
        name: req.name.trim().to_string(),
        phone: req.phone.clone(),
        password_hash: hash_password(&req.password)?,
    })
}

#[instrument(skip(st, req), fields(phone = %req.phone))]
pub async fn create_user(st: &AppState, req: &UserRequest) -> AppResult<User> {
    let mut session = st.store.session().await?;
    if session.user_by_phone(&req.phone).await?.is_some() {
        return Err(AppError::AlreadyExists("phone"));
    }
    let user = session.insert_user(&fields(req)?).await?;
    session.commit().await?;
    info!(user_id = user.id, "user created");
    Ok(user)
}

pub async fn list_users(st: &AppState, page: Page) -> AppResult<Vec<User>> {
    let mut session = st.store.session().await?;
    session.list_users(page).await
}

pub async fn get_user(st: &AppState, id: i64) -> AppResult<User> {
    let mut session = st.store.session().await?;
    session.user(id).await?.ok_or(AppError::NotFound("user"))
}

#[instrument(skip(st, req))]
pub async fn update_user(st: &AppState, id: i64, req: &UserRequest) -> AppResult<User> {
    let mut session = st.store.session().await?;
    if session.user(id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }
    if let Some(owner) = session.user_by_phone(&req.phone).await? {
        if owner.id != id {
            return Err(AppError::AlreadyExists("phone"));
        }
    }
    let user = session
        .update_user(id, &fields(req)?)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    session.commit().await?;
    info!(user_id = id, "user updated");
    Ok(user)
}

#[instrument(skip(st))]
pub async fn delete_user(st: &AppState, id: i64) -> AppResult<()> {
    let mut session = st.store.session().await?;
    if !session.delete_user(id).await? {
        return Err(AppError::NotFound("user"));
    }
    session.commit().await?;
    info!(user_id = id, "user deleted");
    Ok(())
}
