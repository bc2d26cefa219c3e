//! Business rules checked before a rental is inserted.
//!
//! Everything here works on records that were already loaded; nothing touches
//! the store.

use time::PrimitiveDateTime;

use crate::db::{Bike, Rental, User};
use crate::error::{AppError, AppResult};

pub fn user_exists(user: Option<User>) -> AppResult<User> {
    user.ok_or(AppError::NotFound("user"))
}

pub fn bike_exists(bike: Option<Bike>) -> AppResult<Bike> {
    bike.ok_or(AppError::NotFound("bike"))
}

pub fn bike_available(bike: &Bike) -> bool {
    bike.available
}

/// Exact pickup-time equality; rentals carry no duration to overlap against.
pub fn has_date_conflict(bike_id: i64, pickup_at: PrimitiveDateTime, rentals: &[Rental]) -> bool {
    rentals
        .iter()
        .any(|r| r.bike_id == bike_id && r.pickup_at == pickup_at)
}

/// Any earlier rental of this bike by this user, whatever its date.
pub fn has_duplicate_rental(user_id: i64, bike_id: i64, rentals: &[Rental]) -> bool {
    rentals
        .iter()
        .any(|r| r.user_id == user_id && r.bike_id == bike_id)
}
