use anyhow::anyhow;
use time::PrimitiveDateTime;
use tracing::{info, instrument, warn, Instrument};

use super::dto::{CreateRentalRequest, RentalFull};
use super::validators::{
    bike_available, bike_exists, has_date_conflict, has_duplicate_rental, user_exists,
};
use crate::db::{BikeSize, NewRental, Page, Rental, Session};
use crate::error::{AppError, AppResult};
use crate::notify::e164;
use crate::state::AppState;
use crate::timestamp;

#[instrument(skip(st, req), fields(user_id = req.user_id, bike_id = req.bike_id))]
pub async fn create_rental(st: &AppState, req: &CreateRentalRequest) -> AppResult<RentalFull> {
    let mut session = st.store.session().await?;

    let user = user_exists(session.user(req.user_id).await?)?;
    let bike = bike_exists(session.bike(req.bike_id).await?)?;
    if !bike_available(&bike) {
        warn!("bike is unavailable");
        return Err(AppError::Conflict("bike rented"));
    }

    let related = session.rentals_touching(user.id, bike.id).await?;
    if has_date_conflict(bike.id, req.pickup_at, &related) {
        warn!(pickup_at = %timestamp::format(req.pickup_at), "pickup slot taken");
        return Err(AppError::Conflict("date taken"));
    }
    if has_duplicate_rental(user.id, bike.id, &related) {
        warn!("user already rented this bike");
        return Err(AppError::AlreadyExists("rental"));
    }

    // the unique keys on rentals re-check both rules if another request raced us
    let rental = session
        .insert_rental(&NewRental {
            user_id: user.id,
            bike_id: bike.id,
            pickup_at: req.pickup_at,
            price: req.price,
        })
        .await?;
    session.commit().await?;
    info!(rental_id = rental.id, "rental created");

    let view = RentalFull::compose(&rental, &user, &bike);
    send_confirmation(st, &view);
    Ok(view)
}

pub async fn list_rentals(st: &AppState, page: Page) -> AppResult<Vec<Rental>> {
    let mut session = st.store.session().await?;
    session.list_rentals(page).await
}

#[instrument(skip(st))]
pub async fn get_rental(st: &AppState, id: i64) -> AppResult<RentalFull> {
    let mut session = st.store.session().await?;
    let rental = session.rental(id).await?.ok_or(AppError::NotFound("rental"))?;
    compose(&mut *session, &rental).await
}

/// Overwrites pickup time and price only; the creation rules are not re-run.
#[instrument(skip(st))]
pub async fn update_rental(
    st: &AppState,
    id: i64,
    pickup_at: PrimitiveDateTime,
    price: f64,
) -> AppResult<RentalFull> {
    let mut session = st.store.session().await?;
    if session.rental(id).await?.is_none() {
        return Err(AppError::NotFound("rental"));
    }
    let rental = session
        .update_rental(id, pickup_at, price)
        .await?
        .ok_or(AppError::NotFound("rental"))?;
    let view = compose(&mut *session, &rental).await?;
    session.commit().await?;
    info!(rental_id = id, "rental updated");
    Ok(view)
}

#[instrument(skip(st))]
pub async fn delete_rental(st: &AppState, id: i64) -> AppResult<()> {
    let mut session = st.store.session().await?;
    if !session.delete_rental(id).await? {
        return Err(AppError::NotFound("rental"));
    }
    session.commit().await?;
    info!(rental_id = id, "rental deleted");
    Ok(())
}

/// Joins the live user and bike rows; both must exist under the foreign keys.
async fn compose(session: &mut dyn Session, rental: &Rental) -> AppResult<RentalFull> {
    let user = session.user(rental.user_id).await?.ok_or_else(|| {
        anyhow!("rental {} references missing user {}", rental.id, rental.user_id)
    })?;
    let bike = session.bike(rental.bike_id).await?.ok_or_else(|| {
        anyhow!("rental {} references missing bike {}", rental.id, rental.bike_id)
    })?;
    Ok(RentalFull::compose(rental, &user, &bike))
}

/// Detached send; failures are logged and never reach the caller.
fn send_confirmation(st: &AppState, view: &RentalFull) {
    let notifier = st.notifier.clone();
    let phone = e164(&st.config.country_code, &view.user_phone);
    let message = confirmation_message(view);
    let rental_id = view.id;
    tokio::spawn(
        async move {
            match notifier.send(&message, &phone).await {
                Ok(()) => info!(rental_id, "rental confirmation sent"),
                Err(e) => warn!(error = %e, rental_id, "rental confirmation failed"),
            }
        }
        .in_current_span(),
    );
}

fn size_label(size: BikeSize) -> &'static str {
    match size {
        BikeSize::Small => "pequeno",
        BikeSize::Medium => "medio",
        BikeSize::Large => "grande",
    }
}

/// Whole amounts keep one decimal (`25.0`), others print as-is (`25.5`).
fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.1}")
    } else {
        price.to_string()
    }
}

pub fn confirmation_message(view: &RentalFull) -> String {
    format!(
        "Olá {} sua locação foi confirmada!\n\
         ---------------------------|\n\
         Bicicleta: {}\n\
         Tamanho: {}\n\
         ---------------------------|\n\
         Data: {}\n\
         Valor: R${}",
        view.user_name,
        view.bike_model,
        size_label(view.bike_size),
        timestamp::format_short(view.pickup_at),
        format_price(view.price),
    )
}
