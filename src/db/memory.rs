use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Bike, BikeFields, BikeSize, NewRental, Page, Rental, Session, Store, User, UserFields};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    bikes: BTreeMap<i64, Bike>,
    rentals: BTreeMap<i64, Rental>,
    last_user_id: i64,
    last_bike_id: i64,
    last_rental_id: i64,
}

/// Process-local store with the same constraints as the SQL schema.
///
/// Each session holds the lock for its whole lifetime and works on a staged
/// copy of the tables, so sessions are serialized and uncommitted work is
/// dropped with the session.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn session(&self) -> AppResult<Box<dyn Session>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemorySession { guard, staged }))
    }
}

struct MemorySession {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

fn window<T: Clone>(rows: &BTreeMap<i64, T>, page: Page) -> Vec<T> {
    rows.values()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .cloned()
        .collect()
}

impl Tables {
    fn phone_taken(&self, phone: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.phone == phone && Some(u.id) != except)
    }

    fn bike_taken(&self, size: BikeSize, model: &str, except: Option<i64>) -> bool {
        self.bikes
            .values()
            .any(|b| b.size == size && b.model == model && Some(b.id) != except)
    }

    fn check_rental_keys(
        &self,
        user_id: i64,
        bike_id: i64,
        pickup_at: PrimitiveDateTime,
        except: Option<i64>,
    ) -> AppResult<()> {
        let others = self.rentals.values().filter(|r| Some(r.id) != except);
        for r in others {
            if r.bike_id == bike_id && r.pickup_at == pickup_at {
                return Err(AppError::Conflict("date taken"));
            }
            if r.user_id == user_id && r.bike_id == bike_id {
                return Err(AppError::AlreadyExists("rental"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn user(&mut self, id: i64) -> AppResult<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn user_by_phone(&mut self, phone: &str) -> AppResult<Option<User>> {
        Ok(self.staged.users.values().find(|u| u.phone == phone).cloned())
    }

    async fn list_users(&mut self, page: Page) -> AppResult<Vec<User>> {
        Ok(window(&self.staged.users, page))
    }

    async fn insert_user(&mut self, fields: &UserFields) -> AppResult<User> {
        if self.staged.phone_taken(&fields.phone, None) {
            return Err(AppError::AlreadyExists("phone"));
        }
        self.staged.last_user_id += 1;
        let user = User {
            id: self.staged.last_user_id,
            name: fields.name.clone(),
            phone: fields.phone.clone(),
            password_hash: fields.password_hash.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.staged.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&mut self, id: i64, fields: &UserFields) -> AppResult<Option<User>> {
        if !self.staged.users.contains_key(&id) {
            return Ok(None);
        }
        if self.staged.phone_taken(&fields.phone, Some(id)) {
            return Err(AppError::AlreadyExists("phone"));
        }
        let Some(user) = self.staged.users.get_mut(&id) else {
            return Ok(None);
        };
        user.name = fields.name.clone();
        user.phone = fields.phone.clone();
        user.password_hash = fields.password_hash.clone();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&mut self, id: i64) -> AppResult<bool> {
        if self.staged.users.remove(&id).is_none() {
            return Ok(false);
        }
        self.staged.rentals.retain(|_, r| r.user_id != id);
        Ok(true)
    }

    async fn bike(&mut self, id: i64) -> AppResult<Option<Bike>> {
        Ok(self.staged.bikes.get(&id).cloned())
    }

    async fn bike_by_size_model(&mut self, size: BikeSize, model: &str) -> AppResult<Option<Bike>> {
        Ok(self
            .staged
            .bikes
            .values()
            .find(|b| b.size == size && b.model == model)
            .cloned())
    }

    async fn list_bikes(&mut self, page: Page) -> AppResult<Vec<Bike>> {
        Ok(window(&self.staged.bikes, page))
    }

    async fn insert_bike(&mut self, fields: &BikeFields) -> AppResult<Bike> {
        if self.staged.bike_taken(fields.size, &fields.model, None) {
            return Err(AppError::AlreadyExists("bike"));
        }
        self.staged.last_bike_id += 1;
        let bike = Bike {
            id: self.staged.last_bike_id,
            size: fields.size,
            model: fields.model.clone(),
            available: fields.available,
        };
        self.staged.bikes.insert(bike.id, bike.clone());
        Ok(bike)
    }

    async fn update_bike(&mut self, id: i64, fields: &BikeFields) -> AppResult<Option<Bike>> {
        if !self.staged.bikes.contains_key(&id) {
            return Ok(None);
        }
        if self.staged.bike_taken(fields.size, &fields.model, Some(id)) {
            return Err(AppError::AlreadyExists("bike"));
        }
        let Some(bike) = self.staged.bikes.get_mut(&id) else {
            return Ok(None);
        };
        bike.size = fields.size;
        bike.model = fields.model.clone();
        bike.available = fields.available;
        Ok(Some(bike.clone()))
    }

    async fn delete_bike(&mut self, id: i64) -> AppResult<bool> {
        if self.staged.bikes.remove(&id).is_none() {
            return Ok(false);
        }
        self.staged.rentals.retain(|_, r| r.bike_id != id);
        Ok(true)
    }

    async fn rental(&mut self, id: i64) -> AppResult<Option<Rental>> {
        Ok(self.staged.rentals.get(&id).cloned())
    }

    async fn list_rentals(&mut self, page: Page) -> AppResult<Vec<Rental>> {
        Ok(window(&self.staged.rentals, page))
    }

    async fn rentals_touching(&mut self, user_id: i64, bike_id: i64) -> AppResult<Vec<Rental>> {
        Ok(self
            .staged
            .rentals
            .values()
            .filter(|r| r.user_id == user_id || r.bike_id == bike_id)
            .cloned()
            .collect())
    }

    async fn insert_rental(&mut self, rental: &NewRental) -> AppResult<Rental> {
        if !self.staged.users.contains_key(&rental.user_id) {
            return Err(AppError::NotFound("user"));
        }
        if !self.staged.bikes.contains_key(&rental.bike_id) {
            return Err(AppError::NotFound("bike"));
        }
        self.staged
            .check_rental_keys(rental.user_id, rental.bike_id, rental.pickup_at, None)?;
        self.staged.last_rental_id += 1;
        let row = Rental {
            id: self.staged.last_rental_id,
            user_id: rental.user_id,
            bike_id: rental.bike_id,
            pickup_at: rental.pickup_at,
            price: rental.price,
        };
        self.staged.rentals.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_rental(
        &mut self,
        id: i64,
        pickup_at: PrimitiveDateTime,
        price: f64,
    ) -> AppResult<Option<Rental>> {
        let Some(current) = self.staged.rentals.get(&id).cloned() else {
            return Ok(None);
        };
        self.staged
            .check_rental_keys(current.user_id, current.bike_id, pickup_at, Some(id))?;
        let updated = Rental {
            pickup_at,
            price,
            ..current
        };
        self.staged.rentals.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_rental(&mut self, id: i64) -> AppResult<bool> {
        Ok(self.staged.rentals.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemorySession { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
