use tracing::{info, instrument};

use super::dto::{CreateBikeRequest, UpdateBikeRequest};
use crate::db::{Bike, BikeFields, Page};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[instrument(skip(st, req), fields(size = %req.size, model = %req.model))]
pub async fn create_bike(st: &AppState, req: &CreateBikeRequest) -> AppResult<Bike> {
    let model = req.model.trim();
    let mut session = st.store.session().await?;
    if session.bike_by_size_model(req.size, model).await?.is_some() {
        return Err(AppError::AlreadyExists("bike"));
    }
    let bike = session
        .insert_bike(&BikeFields {
            size: req.size,
            model: model.to_string(),
            available: true,
        })
        .await?;
    session.commit().await?;
    info!(bike_id = bike.id, "bike created");
    Ok(bike)
}

pub async fn list_bikes(st: &AppState, page: Page) -> AppResult<Vec<Bike>> {
    let mut session = st.store.session().await?;
    session.list_bikes(page).await
}

pub async fn get_bike(st: &AppState, id: i64) -> AppResult<Bike> {
    let mut session = st.store.session().await?;
    session.bike(id).await?.ok_or(AppError::NotFound("bike"))
}

#[instrument(skip(st, req))]
pub async fn update_bike(st: &AppState, id: i64, req: &UpdateBikeRequest) -> AppResult<Bike> {
    let model = req.model.trim();
    let mut session = st.store.session().await?;
    if session.bike(id).await?.is_none() {
        return Err(AppError::NotFound("bike"));
    }
    if let Some(twin) = session.bike_by_size_model(req.size, model).await? {
        if twin.id != id {
            return Err(AppError::AlreadyExists("bike"));
        }
    }
    let bike = session
        .update_bike(
            id,
            &BikeFields {
                size: req.size,
                model: model.to_string(),
                available: req.available,
            },
        )
        .await?
        .ok_or(AppError::NotFound("bike"))?;
    session.commit().await?;
    info!(bike_id = id, available = bike.available, "bike updated");
    Ok(bike)
}

#[instrument(skip(st))]
pub async fn delete_bike(st: &AppState, id: i64) -> AppResult<()> {
    let mut session = st.store.session().await?;
    if !session.delete_bike(id).await? {
        return Err(AppError::NotFound("bike"));
    }
    session.commit().await?;
    info!(bike_id = id, "bike deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BikeSize;

    fn req(size: BikeSize, model: &str) -> CreateBikeRequest {
        CreateBikeRequest {
            size,
            model: model.into(),
        }
    }

    #[tokio::test]
    async fn new_bikes_are_available() {
        let st = AppState::fake();
        let bike = create_bike(&st, &req(BikeSize::Medium, "Caloi10")).await.unwrap();
        assert!(bike.available);
        assert_eq!(get_bike(&st, bike.id).await.unwrap(), bike);
    }

    #[tokio::test]
    async fn size_and_model_pair_is_unique() {
        let st = AppState::fake();
        create_bike(&st, &req(BikeSize::Medium, "Caloi10")).await.unwrap();
        let err = create_bike(&st, &req(BikeSize::Medium, "Caloi10")).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists("bike")));
        // same model in another size is a different bike
        create_bike(&st, &req(BikeSize::Large, "Caloi10")).await.unwrap();
    }

    #[tokio::test]
    async fn update_replaces_all_fields() {
        let st = AppState::fake();
        let bike = create_bike(&st, &req(BikeSize::Small, "Sense")).await.unwrap();
        let updated = update_bike(
            &st,
            bike.id,
            &UpdateBikeRequest {
                size: BikeSize::Large,
                model: "Sense Pro".into(),
                available: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.size, BikeSize::Large);
        assert_eq!(updated.model, "Sense Pro");
        assert!(!updated.available);
    }

    #[tokio::test]
    async fn missing_bike_is_not_found() {
        let st = AppState::fake();
        assert!(matches!(get_bike(&st, 3).await, Err(AppError::NotFound("bike"))));
        assert!(matches!(delete_bike(&st, 3).await, Err(AppError::NotFound("bike"))));
    }
}
