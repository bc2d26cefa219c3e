use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::db::{Bike, BikeSize, Rental, User};
use crate::error::AppResult;
use crate::extractors::{require_price, Validate};

#[derive(Debug, Deserialize)]
pub struct CreateRentalRequest {
    pub user_id: i64,
    pub bike_id: i64,
    #[serde(rename = "data_retirada", with = "crate::timestamp")]
    pub pickup_at: PrimitiveDateTime,
    #[serde(rename = "preco")]
    pub price: f64,
}

impl Validate for CreateRentalRequest {
    fn validate(&self) -> AppResult<()> {
        require_price(self.price)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRentalRequest {
    #[serde(rename = "data_retirada", with = "crate::timestamp")]
    pub pickup_at: PrimitiveDateTime,
    #[serde(rename = "preco")]
    pub price: f64,
}

impl Validate for UpdateRentalRequest {
    fn validate(&self) -> AppResult<()> {
        require_price(self.price)
    }
}

/// Rental joined with the display fields of its user and bike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalFull {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "user_nome")]
    pub user_name: String,
    #[serde(rename = "user_telefone")]
    pub user_phone: String,
    pub bike_id: i64,
    #[serde(rename = "bike_tamanho")]
    pub bike_size: BikeSize,
    #[serde(rename = "bike_modelo")]
    pub bike_model: String,
    #[serde(rename = "data_retirada", with = "crate::timestamp")]
    pub pickup_at: PrimitiveDateTime,
    #[serde(rename = "preco")]
    pub price: f64,
}

impl RentalFull {
    pub fn compose(rental: &Rental, user: &User, bike: &Bike) -> Self {
        Self {
            id: rental.id,
            user_id: rental.user_id,
            user_name: user.name.clone(),
            user_phone: user.phone.clone(),
            bike_id: rental.bike_id,
            bike_size: bike.size,
            bike_model: bike.model.clone(),
            pickup_at: rental.pickup_at,
            price: rental.price,
        }
    }
}

/// Compact projection used by the list endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicRental {
    pub id: i64,
    pub user_id: i64,
    pub bike_id: i64,
    #[serde(rename = "data_retirada", with = "crate::timestamp")]
    pub pickup_at: PrimitiveDateTime,
    #[serde(rename = "preco")]
    pub price: f64,
}

impl From<Rental> for PublicRental {
    fn from(r: Rental) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            bike_id: r.bike_id,
            pickup_at: r.pickup_at,
            price: r.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RentalList {
    pub locacoes: Vec<PublicRental>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn create_request_uses_wire_names() {
        let req: CreateRentalRequest = serde_json::from_str(
            r#"{"user_id":1,"bike_id":2,"data_retirada":"2025-01-01T10:00","preco":25.0}"#,
        )
        .unwrap();
        assert_eq!(req.pickup_at, datetime!(2025-01-01 10:00));
        assert_eq!(req.price, 25.0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn negative_price_fails_validation() {
        let req = UpdateRentalRequest {
            pickup_at: datetime!(2025-01-01 10:00),
            price: -3.0,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn full_view_serializes_denormalized_fields() {
        let view = RentalFull {
            id: 1,
            user_id: 2,
            user_name: "Ana".into(),
            user_phone: "11999990000".into(),
            bike_id: 3,
            bike_size: BikeSize::Medium,
            bike_model: "Caloi10".into(),
            pickup_at: datetime!(2025-01-01 10:00),
            price: 25.0,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["user_nome"], "Ana");
        assert_eq!(json["user_telefone"], "11999990000");
        assert_eq!(json["bike_tamanho"], "medium");
        assert_eq!(json["bike_modelo"], "Caloi10");
        assert_eq!(json["data_retirada"], "2025-01-01T10:00:00");
        assert_eq!(json["preco"], 25.0);
    }
}
