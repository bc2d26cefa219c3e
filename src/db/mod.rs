//! Persistence access.
//!
//! Handlers never talk to a pool directly: they ask the injected [`Store`] for a
//! [`Session`], run their reads and writes through it and `commit` at the end.
//! A session that is dropped without `commit` discards its changes.

mod memory;
mod postgres;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::AppResult;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub password_hash: String, // argon2 PHC string, never exposed
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BikeSize {
    #[serde(alias = "pequeno")]
    Small,
    #[serde(alias = "medio")]
    Medium,
    #[serde(alias = "grande")]
    Large,
}

impl BikeSize {
    pub fn as_str(self) -> &'static str {
        match self {
            BikeSize::Small => "small",
            BikeSize::Medium => "medium",
            BikeSize::Large => "large",
        }
    }
}

impl fmt::Display for BikeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown bike size {0:?}")]
pub struct UnknownBikeSize(String);

impl FromStr for BikeSize {
    type Err = UnknownBikeSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" | "pequeno" => Ok(BikeSize::Small),
            "medium" | "medio" => Ok(BikeSize::Medium),
            "large" | "grande" => Ok(BikeSize::Large),
            other => Err(UnknownBikeSize(other.to_string())),
        }
    }
}

impl TryFrom<String> for BikeSize {
    type Error = UnknownBikeSize;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Bike {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub size: BikeSize,
    pub model: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Rental {
    pub id: i64,
    pub user_id: i64,
    pub bike_id: i64,
    pub pickup_at: PrimitiveDateTime,
    pub price: f64,
}

/// Mutable user fields; the password is already hashed.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct BikeFields {
    pub size: BikeSize,
    pub model: String,
    pub available: bool,
}

#[derive(Debug, Clone)]
pub struct NewRental {
    pub user_id: i64,
    pub bike_id: i64,
    pub pickup_at: PrimitiveDateTime,
    pub price: f64,
}

/// Offset/limit window over a table in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

/// Factory for per-request sessions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn session(&self) -> AppResult<Box<dyn Session>>;
}

/// One unit of work against the store.
///
/// Write methods enforce the uniqueness and referential constraints and report
/// violations as `AlreadyExists`, `Conflict` or `NotFound` errors, so a racing
/// request that slipped past a pre-check still gets a well-defined answer.
#[async_trait]
pub trait Session: Send {
    async fn user(&mut self, id: i64) -> AppResult<Option<User>>;
    async fn user_by_phone(&mut self, phone: &str) -> AppResult<Option<User>>;
    async fn list_users(&mut self, page: Page) -> AppResult<Vec<User>>;
    async fn insert_user(&mut self, fields: &UserFields) -> AppResult<User>;
    async fn update_user(&mut self, id: i64, fields: &UserFields) -> AppResult<Option<User>>;
    /// Returns `false` when no row matched. Rentals of the user go with it.
    async fn delete_user(&mut self, id: i64) -> AppResult<bool>;

    async fn bike(&mut self, id: i64) -> AppResult<Option<Bike>>;
    async fn bike_by_size_model(&mut self, size: BikeSize, model: &str) -> AppResult<Option<Bike>>;
    async fn list_bikes(&mut self, page: Page) -> AppResult<Vec<Bike>>;
    async fn insert_bike(&mut self, fields: &BikeFields) -> AppResult<Bike>;
    async fn update_bike(&mut self, id: i64, fields: &BikeFields) -> AppResult<Option<Bike>>;
    async fn delete_bike(&mut self, id: i64) -> AppResult<bool>;

    async fn rental(&mut self, id: i64) -> AppResult<Option<Rental>>;
    async fn list_rentals(&mut self, page: Page) -> AppResult<Vec<Rental>>;
    /// Rentals that share the bike or the user.
    async fn rentals_touching(&mut self, user_id: i64, bike_id: i64) -> AppResult<Vec<Rental>>;
    async fn insert_rental(&mut self, rental: &NewRental) -> AppResult<Rental>;
    async fn update_rental(
        &mut self,
        id: i64,
        pickup_at: PrimitiveDateTime,
        price: f64,
    ) -> AppResult<Option<Rental>>;
    async fn delete_rental(&mut self, id: i64) -> AppResult<bool>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
