use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Boundary checks run on a request body after it deserializes.
pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

/// `Json<T>` that answers malformed bodies and failed [`Validate`] checks
/// with a 400 in the API's error shape.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            warn!(error = %rejection.body_text(), "rejected request body");
            AppError::validation(rejection.body_text())
        })?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// `Path<T>` whose rejection uses the API's error shape.
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query<T>` whose rejection uses the API's error shape.
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^[0-9]{8,15}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

pub(crate) fn require_text(field: &str, value: &str, max_chars: usize) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len == 0 || len > max_chars {
        return Err(AppError::validation(format!("invalid {field}")));
    }
    Ok(())
}

pub(crate) fn require_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("invalid preco"));
    }
    Ok(())
}
