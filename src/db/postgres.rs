use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;
use tracing::{debug, warn};

use super::{Bike, BikeFields, BikeSize, NewRental, Page, Rental, Session, Store, User, UserFields};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str = "id, name, phone, password_hash, created_at";
const BIKE_COLUMNS: &str = "id, size, model, available";
const RENTAL_COLUMNS: &str = "id, user_id, bike_id, pickup_at, price";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            warn!(error = %e, "migrations folder not found or migration failed; continuing");
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn session(&self) -> AppResult<Box<dyn Session>> {
        let tx = self.pool.begin().await.context("begin tx")?;
        Ok(Box::new(PgSession { tx }))
    }
}

/// Transaction-backed session; rolled back when dropped uncommitted.
struct PgSession {
    tx: Transaction<'static, Postgres>,
}

/// Translates constraint violations from a write into the domain taxonomy.
fn map_write_error(e: sqlx::Error, what: &'static str) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some("users_phone_key") => return AppError::AlreadyExists("phone"),
            Some("bikes_size_model_key") => return AppError::AlreadyExists("bike"),
            Some("rentals_bike_pickup_key") => return AppError::Conflict("date taken"),
            Some("rentals_user_bike_key") => return AppError::AlreadyExists("rental"),
            Some("rentals_user_id_fkey") => return AppError::NotFound("user"),
            Some("rentals_bike_id_fkey") => return AppError::NotFound("bike"),
            _ => {}
        }
    }
    AppError::Internal(anyhow::Error::new(e).context(what))
}

#[async_trait]
impl Session for PgSession {
    async fn user(&mut self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("select user")?;
        Ok(user)
    }

    async fn user_by_phone(&mut self, phone: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(&mut *self.tx)
        .await
        .context("select user by phone")?;
        Ok(user)
    }

    async fn list_users(&mut self, page: Page) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&mut *self.tx)
        .await
        .context("list users")?;
        Ok(rows)
    }

    async fn insert_user(&mut self, fields: &UserFields) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, phone, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&fields.name)
        .bind(&fields.phone)
        .bind(&fields.password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, "insert user"))
    }

    async fn update_user(&mut self, id: i64, fields: &UserFields) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = $2, phone = $3, password_hash = $4
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.phone)
        .bind(&fields.password_hash)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, "update user"))
    }

    async fn delete_user(&mut self, id: i64) -> AppResult<bool> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("delete user")?;
        Ok(done.rows_affected() > 0)
    }

    async fn bike(&mut self, id: i64) -> AppResult<Option<Bike>> {
        let bike = sqlx::query_as::<_, Bike>(&format!(
            "SELECT {BIKE_COLUMNS} FROM bikes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("select bike")?;
        Ok(bike)
    }

    async fn bike_by_size_model(&mut self, size: BikeSize, model: &str) -> AppResult<Option<Bike>> {
        let bike = sqlx::query_as::<_, Bike>(&format!(
            "SELECT {BIKE_COLUMNS} FROM bikes WHERE size = $1 AND model = $2"
        ))
        .bind(size.as_str())
        .bind(model)
        .fetch_optional(&mut *self.tx)
        .await
        .context("select bike by size/model")?;
        Ok(bike)
    }

    async fn list_bikes(&mut self, page: Page) -> AppResult<Vec<Bike>> {
        let rows = sqlx::query_as::<_, Bike>(&format!(
            "SELECT {BIKE_COLUMNS} FROM bikes ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&mut *self.tx)
        .await
        .context("list bikes")?;
        Ok(rows)
    }

    async fn insert_bike(&mut self, fields: &BikeFields) -> AppResult<Bike> {
        sqlx::query_as::<_, Bike>(&format!(
            r#"
            INSERT INTO bikes (size, model, available)
            VALUES ($1, $2, $3)
            RETURNING {BIKE_COLUMNS}
            "#
        ))
        .bind(fields.size.as_str())
        .bind(&fields.model)
        .bind(fields.available)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, "insert bike"))
    }

    async fn update_bike(&mut self, id: i64, fields: &BikeFields) -> AppResult<Option<Bike>> {
        sqlx::query_as::<_, Bike>(&format!(
            r#"
            UPDATE bikes
               SET size = $2, model = $3, available = $4
             WHERE id = $1
            RETURNING {BIKE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(fields.size.as_str())
        .bind(&fields.model)
        .bind(fields.available)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, "update bike"))
    }

    async fn delete_bike(&mut self, id: i64) -> AppResult<bool> {
        let done = sqlx::query("DELETE FROM bikes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("delete bike")?;
        Ok(done.rows_affected() > 0)
    }

    async fn rental(&mut self, id: i64) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("select rental")?;
        Ok(rental)
    }

    async fn list_rentals(&mut self, page: Page) -> AppResult<Vec<Rental>> {
        let rows = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&mut *self.tx)
        .await
        .context("list rentals")?;
        Ok(rows)
    }

    async fn rentals_touching(&mut self, user_id: i64, bike_id: i64) -> AppResult<Vec<Rental>> {
        let rows = sqlx::query_as::<_, Rental>(&format!(
            r#"
            SELECT {RENTAL_COLUMNS}
              FROM rentals
             WHERE bike_id = $1 OR user_id = $2
             ORDER BY id
            "#
        ))
        .bind(bike_id)
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .context("select rentals by user/bike")?;
        debug!(user_id, bike_id, count = rows.len(), "loaded related rentals");
        Ok(rows)
    }

    async fn insert_rental(&mut self, rental: &NewRental) -> AppResult<Rental> {
        sqlx::query_as::<_, Rental>(&format!(
            r#"
            INSERT INTO rentals (user_id, bike_id, pickup_at, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {RENTAL_COLUMNS}
            "#
        ))
        .bind(rental.user_id)
        .bind(rental.bike_id)
        .bind(rental.pickup_at)
        .bind(rental.price)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, "insert rental"))
    }

    async fn update_rental(
        &mut self,
        id: i64,
        pickup_at: PrimitiveDateTime,
        price: f64,
    ) -> AppResult<Option<Rental>> {
        sqlx::query_as::<_, Rental>(&format!(
            r#"
            UPDATE rentals
               SET pickup_at = $2, price = $3
             WHERE id = $1
            RETURNING {RENTAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(pickup_at)
        .bind(price)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, "update rental"))
    }

    async fn delete_rental(&mut self, id: i64) -> AppResult<bool> {
        let done = sqlx::query("DELETE FROM rentals WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("delete rental")?;
        Ok(done.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.context("commit tx")?;
        Ok(())
    }
}
